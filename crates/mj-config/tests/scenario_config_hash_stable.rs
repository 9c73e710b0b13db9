//! Config hash stability
//!
//! GREEN when:
//! - loading the same docs twice yields the same hash
//! - key order inside YAML does not change the hash
//! - overlays change the hash and override base values

use mj_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
shop:
  name: "Mundo Jardín"
  mode: "DEV"
shipping:
  free_threshold_cents: 5000
  flat_fee_cents: 500
"#;

const BASE_YAML_REORDERED: &str = r#"
shipping:
  flat_fee_cents: 500
  free_threshold_cents: 5000
shop:
  mode: "DEV"
  name: "Mundo Jardín"
"#;

const OVERLAY_YAML: &str = r#"
shop:
  mode: "PROD"
shipping:
  flat_fee_cents: 695
"#;

#[test]
fn same_input_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn overlay_overrides_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(base.config_hash, merged.config_hash);
    assert_eq!(merged.config_json["shop"]["mode"], "PROD");
    assert_eq!(merged.config_json["shop"]["name"], "Mundo Jardín");
    assert_eq!(merged.config_json["shipping"]["flat_fee_cents"], 695);
    assert_eq!(merged.config_json["shipping"]["free_threshold_cents"], 5000);
}
