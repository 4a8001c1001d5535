//! Engine config: JSON loading, defaults and validation.

use debtrisk_core::{config::EmployeeKeyPolicy, AgingError, EngineConfig};
use rust_decimal_macros::dec;

// ── Tests ────────────────────────────────────────────────────────────────────

/// Missing fields take their defaults.
#[test]
fn partial_json_fills_defaults() {
    let json = r#"{ "tolerance": "0.5", "employee_key": "display_manager" }"#;
    let config = EngineConfig::from_json(json).unwrap();
    assert_eq!(config.tolerance, dec!(0.5));
    assert_eq!(config.employee_key, EmployeeKeyPolicy::DisplayManager);
    assert_eq!(config.default_group, "Unclassified");
    assert!(config.aliases.total_debt.iter().any(|a| a == "du_no"));
}

/// Malformed JSON is a serialization error.
#[test]
fn malformed_json_is_serialization_error() {
    let err = EngineConfig::from_json("{ not json").unwrap_err();
    assert!(matches!(err, AgingError::Serialization(_)), "got {err:?}");
}

/// Validation rejects a negative tolerance and a colliding segment id.
#[test]
fn invalid_values_are_rejected() {
    let err = EngineConfig::from_json(r#"{ "tolerance": "-1" }"#).unwrap_err();
    assert!(matches!(err, AgingError::Config { .. }), "got {err:?}");

    let err = EngineConfig::from_json(r#"{ "fallback_segment": "state" }"#).unwrap_err();
    assert!(matches!(err, AgingError::Config { .. }), "got {err:?}");
}

/// A missing file is reported with its path.
#[test]
fn load_reports_missing_path() {
    let err = EngineConfig::load("/nonexistent/engine.json").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/engine.json"), "got {err}");
}
