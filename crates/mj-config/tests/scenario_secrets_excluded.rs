//! Literal secrets must never live in YAML; only env var names do.

use mj_config::load_layered_yaml_from_strings;

const YAML_WITH_ENV_NAMES: &str = r#"
mail:
  relay_url_env: "MJ_MAIL_RELAY_URL"
  relay_key_env: "MJ_MAIL_RELAY_KEY"
admin:
  token_env: "MJ_ADMIN_TOKEN"
"#;

const YAML_WITH_SENDGRID_KEY: &str = r#"
mail:
  relay_key_env: "SG.abcdefghijklmnop.qrstuvwxyz"
"#;

const YAML_SECRET_IN_ARRAY: &str = r#"
webhooks:
  - url: "https://example.com"
    token: "sk-proj-realtoken123"
"#;

#[test]
fn env_var_names_load_fine() {
    let c = load_layered_yaml_from_strings(&[YAML_WITH_ENV_NAMES]).unwrap();
    assert_eq!(c.config_json["admin"]["token_env"], "MJ_ADMIN_TOKEN");
}

#[test]
fn literal_secret_is_refused_without_echoing_it() {
    let err = load_layered_yaml_from_strings(&[YAML_WITH_SENDGRID_KEY]).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("CONFIG_SECRET_DETECTED"), "got: {msg}");
    assert!(msg.contains("/mail/relay_key_env"));
    assert!(!msg.contains("SG.abcdefghijklmnop"));
}

#[test]
fn secrets_nested_in_arrays_are_found() {
    let err = load_layered_yaml_from_strings(&[YAML_SECRET_IN_ARRAY]).unwrap_err();
    assert!(format!("{err}").contains("/webhooks/0/token"));
}

#[test]
fn secret_in_overlay_is_refused() {
    let err =
        load_layered_yaml_from_strings(&[YAML_WITH_ENV_NAMES, YAML_WITH_SENDGRID_KEY]).unwrap_err();
    assert!(format!("{err}").contains("CONFIG_SECRET_DETECTED"));
}
