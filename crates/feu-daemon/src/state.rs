//! Shared runtime state for feu-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The compliance service
//! is already cheaply cloneable; the bus fans ledger and pool events out to
//! SSE subscribers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use feu_compliance::{BankEntry, ComplianceService, EntryKind, Gco2e, PoolRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    /// A ledger row was appended.
    Ledger {
        entry_id: i64,
        route_id: String,
        year: i32,
        kind: EntryKind,
        amount: Gco2e,
        created_at: DateTime<Utc>,
    },
    /// A pool was aggregated and recorded.
    Pool {
        pool_id: Uuid,
        year: i32,
        valid: bool,
        total_adjusted_cb: Gco2e,
        members: usize,
    },
    /// The baseline route of a year moved.
    Baseline {
        route_id: String,
        year: i32,
    },
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Ledger { .. } => "ledger",
            BusMsg::Pool { .. } => "pool",
            BusMsg::Baseline { .. } => "baseline",
        }
    }
}

impl From<&BankEntry> for BusMsg {
    fn from(e: &BankEntry) -> Self {
        BusMsg::Ledger {
            entry_id: e.id,
            route_id: e.route_id.clone(),
            year: e.year,
            kind: e.kind,
            amount: e.amount,
            created_at: e.created_at,
        }
    }
}

impl From<&PoolRecord> for BusMsg {
    fn from(p: &PoolRecord) -> Self {
        BusMsg::Pool {
            pool_id: p.pool_id,
            year: p.year,
            valid: p.outcome.valid,
            total_adjusted_cb: p.outcome.total_adjusted_cb,
            members: p.outcome.allocations.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub service: ComplianceService,
    /// Hash of the effective layered config, if one was loaded.
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(service: ComplianceService) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "feu-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            service,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Best-effort publish; no subscribers is not an error.
    pub fn publish(&self, msg: BusMsg) {
        let _ = self.bus.send(msg);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
