//! Request and response types for all feu-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use feu_compliance::{Gco2e, RouteFilter};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    /// "memory" | "postgres"
    pub backend: String,
    pub uptime_secs: u64,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// snake_case error kind, e.g. "negative_balance"; "internal" for 500s.
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesQuery {
    pub vessel_type: Option<String>,
    pub fuel_type: Option<String>,
    pub year: Option<i32>,
}

impl From<RoutesQuery> for RouteFilter {
    fn from(q: RoutesQuery) -> Self {
        RouteFilter {
            vessel_type: q.vessel_type,
            fuel_type: q.fuel_type,
            year: q.year,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearQuery {
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteYearQuery {
    pub route_id: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsQuery {
    pub route_id: String,
    pub year: Option<i32>,
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineRequest {
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankRequest {
    pub route_id: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub route_id: String,
    pub year: i32,
    /// gCO₂e, decimal string.
    pub amount: Gco2e,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRequest {
    pub year: i32,
    pub members: Vec<String>,
}
