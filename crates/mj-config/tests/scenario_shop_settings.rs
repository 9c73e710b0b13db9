//! Typed shop settings, unused-key lint, secret resolution and file loading.

use std::io::Write;

use mj_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, resolve_secrets,
    ShopConfig, UnusedKeyPolicy,
};

#[test]
fn empty_config_yields_runnable_defaults() {
    let c = load_layered_yaml_from_strings(&[]).unwrap();
    let shop = c.shop().unwrap();
    assert_eq!(shop, ShopConfig::default());

    let policy = shop.shipping_policy();
    assert_eq!(policy.free_threshold_cents, 5_000);
    assert_eq!(policy.flat_fee_cents, 500);
    assert!(!policy.pickup_address.is_empty());
}

#[test]
fn overrides_flow_into_the_shipping_policy() {
    let c = load_layered_yaml_from_strings(&[r#"
shipping:
  free_threshold_cents: 7500
  pickup_address: "Avenida de la Palmera 1, 41013 Sevilla"
"#])
    .unwrap();
    let p = c.shop().unwrap().shipping_policy();
    assert_eq!(p.free_threshold_cents, 7_500);
    assert_eq!(p.flat_fee_cents, 500);
    assert_eq!(p.pickup_address, "Avenida de la Palmera 1, 41013 Sevilla");
}

#[test]
fn negative_fee_is_invalid() {
    let c = load_layered_yaml_from_strings(&["shipping:\n  flat_fee_cents: -1\n"]).unwrap();
    let err = c.shop().unwrap_err();
    assert!(format!("{err:#}").contains("CONFIG_INVALID"));
}

#[test]
fn tracking_url_joins_base_without_double_slash() {
    let mut shop = ShopConfig::default();
    shop.shop.public_base_url = "https://tienda.example/".to_string();
    assert_eq!(
        shop.tracking_url(42, "abc"),
        "https://tienda.example/tracking/42/abc"
    );
}

#[test]
fn unused_keys_warn_or_fail() {
    let c = load_layered_yaml_from_strings(&[r#"
shop:
  name: "x"
shiping:
  flat_fee_cents: 100
"#])
    .unwrap();

    let report = report_unused_keys(&c.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(report.unused_leaf_pointers, vec!["/shiping/flat_fee_cents"]);

    let err = report_unused_keys(&c.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(format!("{err}").contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn prod_requires_admin_token() {
    let mut shop = ShopConfig::default();
    shop.shop.mode = "PROD".to_string();
    shop.admin.token_env = "MJ_TEST_ADMIN_TOKEN_ABSENT_4f1c".to_string();

    let err = resolve_secrets(&shop).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("SECRETS_MISSING"));
    assert!(msg.contains("MJ_TEST_ADMIN_TOKEN_ABSENT_4f1c"));
}

#[test]
fn dev_resolves_optional_secrets_and_redacts_debug() {
    std::env::set_var("MJ_TEST_ADMIN_TOKEN_PRESENT_9a2e", "  s3cr3t-admin  ");

    let mut shop = ShopConfig::default();
    shop.admin.token_env = "MJ_TEST_ADMIN_TOKEN_PRESENT_9a2e".to_string();
    shop.mail.relay_url_env = "MJ_TEST_RELAY_URL_ABSENT_77d0".to_string();

    let s = resolve_secrets(&shop).unwrap();
    assert_eq!(s.admin_token.as_deref(), Some("s3cr3t-admin"));
    assert!(s.mail_relay_url.is_none());

    let dbg = format!("{s:?}");
    assert!(!dbg.contains("s3cr3t-admin"));
    assert!(dbg.contains("<REDACTED>"));
}

#[test]
fn unknown_mode_is_rejected() {
    let mut shop = ShopConfig::default();
    shop.shop.mode = "STAGING".to_string();
    assert!(format!("{}", resolve_secrets(&shop).unwrap_err()).contains("SECRETS_UNKNOWN_MODE"));
}

#[test]
fn layered_files_load_in_order() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    writeln!(base, "shop:\n  name: \"Base\"\n  mode: \"DEV\"").unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    writeln!(overlay, "shop:\n  name: \"Overlay\"").unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();

    let c = load_layered_yaml(&[&base_path, &overlay_path]).unwrap();
    assert_eq!(c.config_json["shop"]["name"], "Overlay");
    assert_eq!(c.config_json["shop"]["mode"], "DEV");

    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err}").contains("failed to read yaml path"));
}
