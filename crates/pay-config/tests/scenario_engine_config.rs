//! Scenario: Engine config extraction
//!
//! GREEN when:
//! - an empty document yields page_size 100 and a 30 s call timeout;
//! - zero page size, zero timeout and duplicate connectors are refused;
//! - configured assets are merged over the built-in table.

use std::time::Duration;

use pay_config::{load_layered_yaml_from_strings, EngineConfig};

fn engine(docs: &[&str]) -> anyhow::Result<EngineConfig> {
    EngineConfig::from_loaded(&load_layered_yaml_from_strings(docs)?)
}

#[test]
fn defaults_apply_to_an_empty_document() {
    let cfg = engine(&["{}"]).unwrap();
    assert_eq!(cfg.sync.page_size, 100);
    assert_eq!(cfg.sync.call_timeout(), Duration::from_secs(30));
    assert!(cfg.connectors.is_empty());
}

#[test]
fn zero_page_size_is_refused() {
    let err = engine(&["sync:\n  page_size: 0\n"]).unwrap_err();
    assert!(err.to_string().contains("page_size"));
}

#[test]
fn zero_timeout_is_refused() {
    assert!(engine(&["sync:\n  call_timeout_ms: 0\n"]).is_err());
}

#[test]
fn duplicate_connector_is_refused() {
    let doc = r#"
connectors:
  - provider: wise
    name: gbp
  - provider: wise
    name: gbp
"#;
    let err = engine(&[doc]).unwrap_err();
    assert!(err.to_string().contains("configured twice"));
}

#[test]
fn unknown_sync_key_is_a_schema_error() {
    let err = engine(&["sync:\n  page_sise: 10\n"]).unwrap_err();
    assert!(format!("{err:#}").contains("CONFIG_INVALID"));
}

#[test]
fn connector_defaults_and_asset_overlay() {
    let doc = r#"
assets:
  USDC: 6
connectors:
  - provider: kraken
    name: spot
"#;
    let cfg = engine(&[doc]).unwrap();
    assert_eq!(cfg.connectors[0].polling_period(), Duration::from_secs(120));
    assert!(cfg.connectors[0].config.is_null());

    let table = cfg.asset_table();
    assert_eq!(table.scale_of("USDC"), Some(6));
    assert_eq!(table.scale_of("USD"), Some(2));
}
