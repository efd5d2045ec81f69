//! Tests for the shipped configuration file

use derlg::config::AppConfig;
use std::path::Path;

fn shipped_config() -> AppConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/derlg.yaml");
    AppConfig::from_yaml_file(path).expect("config/derlg.yaml should parse")
}

#[test]
fn test_shipped_config_is_valid() {
    let config = shipped_config();
    assert!(config.validate().is_ok());
}

#[test]
fn test_shipped_config_matches_defaults() {
    let shipped = shipped_config();
    let defaults = AppConfig::default();

    assert_eq!(shipped.server.port, defaults.server.port);
    assert_eq!(shipped.pricing.tax_rate, defaults.pricing.tax_rate);
    assert_eq!(
        shipped.pricing.deposit_percentage,
        defaults.pricing.deposit_percentage
    );
    assert_eq!(
        shipped.pricing.modification_cutoff_hours,
        defaults.pricing.modification_cutoff_hours
    );
    assert_eq!(shipped.currency.usd_to_khr, defaults.currency.usd_to_khr);
    assert_eq!(shipped.rate_limit.auth_requests, defaults.rate_limit.auth_requests);
    assert_eq!(shipped.logging.filter, defaults.logging.filter);
}

#[test]
fn test_shipped_config_has_no_database_or_secret() {
    let config = shipped_config();
    assert!(config.database.url.is_none());
    assert!(config.payments.webhook_secret.is_none());
    assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
}

#[test]
fn test_invalid_deposit_range_is_rejected() {
    let config = AppConfig::from_yaml_str(
        r#"
pricing:
  min_deposit_percentage: 80
  max_deposit_percentage: 70
"#,
    )
    .unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_malformed_yaml_is_a_parse_error() {
    let err = AppConfig::from_yaml_str("server: [unclosed").unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}
