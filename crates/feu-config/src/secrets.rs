//! Database settings resolved through env var names.
//!
//! Config YAML stores only the NAME of the variable holding the connection
//! URL (`/database/url_env`, default `FEU_DATABASE_URL`), never the URL
//! itself. Resolution happens once at startup; errors mention the variable
//! name, never its value. `Debug` output redacts the URL.

use anyhow::{bail, Result};
use serde_json::Value;

pub const DEFAULT_DATABASE_URL_ENV: &str = "FEU_DATABASE_URL";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
pub struct DatabaseSettings {
    /// Name of the env var the URL came from.
    pub url_env: String,
    pub url: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url_env", &self.url_env)
            .field("url", &"<REDACTED>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Name of the env var holding the database URL.
pub fn database_url_env_name(config_json: &Value) -> String {
    read_str_at(config_json, "/database/url_env")
        .unwrap_or_else(|| DEFAULT_DATABASE_URL_ENV.to_string())
}

/// Resolve the database URL and pool size.
///
/// # Errors
/// `SECRETS_MISSING` naming the variable when it is unset or blank;
/// `CONFIG_INVALID` when `/database/max_connections` is not a positive
/// integer.
pub fn resolve_database_settings(config_json: &Value) -> Result<DatabaseSettings> {
    let url_env = database_url_env_name(config_json);

    let max_connections = match config_json.pointer("/database/max_connections") {
        None => DEFAULT_MAX_CONNECTIONS,
        Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) if n > 0 => n,
            _ => bail!("CONFIG_INVALID /database/max_connections: expected a positive integer"),
        },
    };

    let Some(url) = resolve_env(&url_env) else {
        bail!("SECRETS_MISSING: required env var '{url_env}' (database url) is not set or empty");
    };

    Ok(DatabaseSettings {
        url_env,
        url,
        max_connections,
    })
}
