//! Command handler modules for feu-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod compliance;

use std::sync::Arc;

use anyhow::{Context, Result};
use feu_compliance::ComplianceService;
use feu_config::{ConfigSurface, LoadedConfig, UnusedKeyPolicy};
use feu_db::PgStore;
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load the layered config: explicit `--config` paths win, otherwise the
/// `FEU_CONFIG` env list, otherwise built-in defaults.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let cfg = if paths.is_empty() {
        feu_config::load_from_env()?
    } else {
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        feu_config::load_layered_yaml(&refs)?
    };

    let report = feu_config::report_unused_keys(
        ConfigSurface::Cli,
        &cfg.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has unused keys");
    }
    Ok(cfg)
}

/// Connect using the database settings named by the config.
pub async fn connect(cfg: &LoadedConfig) -> Result<PgPool> {
    let db = feu_config::resolve_database_settings(&cfg.config_json)?;
    feu_db::connect(&db.url, db.max_connections).await
}

/// Postgres-backed compliance service under the configured policy.
pub async fn service(cfg: &LoadedConfig) -> Result<ComplianceService> {
    let policy = feu_config::compliance_policy_from_config(&cfg.config_json)?;
    let pool = connect(cfg).await?;
    Ok(ComplianceService::new(Arc::new(PgStore::new(pool)), policy))
}

/// `load_config` + `service` in one step.
pub async fn service_from(config_paths: &[String]) -> Result<ComplianceService> {
    let cfg = load_config(config_paths)?;
    service(&cfg).await
}

/// Pretty-print any serializable value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize output failed")?;
    println!("{s}");
    Ok(())
}
