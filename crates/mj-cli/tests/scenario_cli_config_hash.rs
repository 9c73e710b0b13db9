use predicates::prelude::*;
use std::io::Write;

fn yaml_file(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let p = dir.path().join(name);
    let mut f = std::fs::File::create(&p).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    p.to_string_lossy().to_string()
}

/// `mj config-hash` prints the same hash the library computes.
#[allow(deprecated)]
#[test]
fn config_hash_matches_library_hash() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let base = yaml_file(
        &dir,
        "base.yaml",
        "shop:\n  name: Jardines del Sur\nshipping:\n  flat_fee_cents: 500\n",
    );
    let prod = yaml_file(&dir, "prod.yaml", "shop:\n  mode: PROD\n");

    let expected = mj_config::load_layered_yaml(&[base.as_str(), prod.as_str()])?;

    let mut cmd = assert_cmd::Command::cargo_bin("mj")?;
    cmd.args(["config-hash", &base, &prod]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "config_hash={}",
            expected.config_hash
        )))
        .stdout(predicate::str::contains("\"mode\":\"PROD\""));

    Ok(())
}

#[allow(deprecated)]
#[test]
fn secret_literal_is_refused_without_echo() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let bad = yaml_file(
        &dir,
        "bad.yaml",
        "mail:\n  relay_key_env: sk_live_abcdef0123456789\n",
    );

    let mut cmd = assert_cmd::Command::cargo_bin("mj")?;
    cmd.args(["config-hash", &bad]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("sk_live_abcdef0123456789").not());

    Ok(())
}

#[allow(deprecated)]
#[test]
fn unused_keys_warn_by_default_and_fail_with_strict() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let typo = yaml_file(&dir, "typo.yaml", "shiping:\n  flat_fee_cents: 900\n");

    let mut warn = assert_cmd::Command::cargo_bin("mj")?;
    warn.args(["config-hash", &typo]);
    warn.assert()
        .success()
        .stderr(predicate::str::contains("unused_key=/shiping/flat_fee_cents"));

    let mut strict = assert_cmd::Command::cargo_bin("mj")?;
    strict.args(["config-hash", "--strict", &typo]);
    strict
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));

    Ok(())
}
