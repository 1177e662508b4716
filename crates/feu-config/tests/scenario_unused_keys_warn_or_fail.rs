//! Scenario: unused-key guard
//!
//! 1) Unused keys are reported under Warn without error.
//! 2) Fail turns them into an error naming the surface.
//! 3) Keys under consumed prefixes are never flagged.
//! 4) `/daemon/bind_addr` is consumed by the daemon only.

use feu_config::{
    load_layered_yaml_from_strings, report_unused_keys, ConfigSurface, UnusedKeyPolicy,
};

const YAML: &str = r#"
compliance:
  lcv_mj_per_t: "41000"
  targets:
    - from_year: 2025
      reduction_pct: "2"
daemon:
  bind_addr: "127.0.0.1:9000"
legacy:
  target_intensity: "89.3368"
"#;

#[test]
fn warn_reports_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report =
        report_unused_keys(ConfigSurface::Daemon, &loaded.config_json, UnusedKeyPolicy::Warn)
            .unwrap();

    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/legacy/target_intensity".to_string()]
    );
    assert_eq!(report.surface, "DAEMON");
}

#[test]
fn fail_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(ConfigSurface::Daemon, &loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "{err}");
    assert!(err.contains("surface=DAEMON"), "{err}");
}

#[test]
fn cli_does_not_consume_daemon_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report =
        report_unused_keys(ConfigSurface::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)
            .unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/daemon/bind_addr".to_string(),
            "/legacy/target_intensity".to_string()
        ]
    );
}

#[test]
fn consumed_only_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&[r#"
compliance:
  ledger_scope: same_year
database:
  max_connections: 4
"#])
    .unwrap();
    let report =
        report_unused_keys(ConfigSurface::Cli, &loaded.config_json, UnusedKeyPolicy::Fail)
            .unwrap();
    assert!(report.is_clean());
}
