use pretty_assertions::assert_eq;
use tessel_config::{ConfigError, InferenceConfig, LoggingConfig, TesselConfig};

#[test]
fn empty_document_uses_defaults() {
    let config = TesselConfig::load_from_str("").unwrap();
    assert_eq!(config, TesselConfig::default());
    assert_eq!(config.inference.implicit_receivers, vec!["it".to_string()]);
    assert!(config.inference.property_access);
    assert!(config.inference.diagnostics);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn sections_override_individual_fields() {
    let config = TesselConfig::load_from_str(
        r#"
[inference]
implicit_receivers = ["it", "self"]
property_access = false

[logging]
level = "debug"
json = true
"#,
    )
    .unwrap();

    assert_eq!(
        config.inference,
        InferenceConfig {
            implicit_receivers: vec!["it".into(), "self".into()],
            property_access: false,
            diagnostics: true,
        }
    );
    assert_eq!(
        config.logging,
        LoggingConfig {
            level: "debug".into(),
            json: true,
        }
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let err = TesselConfig::load_from_str("[inference]\nimplicit_reciever = []\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
}

#[test]
fn missing_file_reports_path() {
    let err = TesselConfig::load_from_path("/nonexistent/tessel.toml").unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert_eq!(path, "/nonexistent/tessel.toml"),
        other => panic!("unexpected error: {other:?}"),
    }
}
