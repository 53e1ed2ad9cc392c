use port_core::config::{FlowConfig, DEFAULT_CHUNK_ROWS};
use port_core::error::PortError;

#[test]
fn missing_fields_fall_back_to_defaults() {
    let config = FlowConfig::from_toml_str("session_id = \"abc\"").expect("config");
    assert_eq!(config.session_id, "abc");
    assert_eq!(config.chunk_rows, DEFAULT_CHUNK_ROWS);
    assert_eq!(config.tracking_key(), "abc-tracking");

    let config = FlowConfig::from_toml_str("").expect("empty config");
    assert_eq!(config, FlowConfig::default());
}

#[test]
fn invalid_values_are_rejected() {
    let err = FlowConfig::from_toml_str("chunk_rows = 0").expect_err("zero rows");
    assert!(matches!(err, PortError::InvalidChunkSize(0)));

    let err = FlowConfig::from_toml_str("session_id = \"  \"").expect_err("blank session");
    assert!(matches!(err, PortError::Config(_)));

    let err = FlowConfig::from_toml_str("chunk_rows = \"many\"").expect_err("wrong type");
    assert!(matches!(err, PortError::Toml(_)));
}
