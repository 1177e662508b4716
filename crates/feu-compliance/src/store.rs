//! Persistence capability consumed by [`ComplianceService`](crate::ComplianceService).
//!
//! Two collaborators sit behind one trait: the route catalogue
//! (lookup / list / set-baseline) and the ledger (query-by-route / append).
//! Everything is read-mostly; the three mutations have atomicity contracts:
//!
//! - `set_baseline` clears every baseline flag of the year and sets the
//!   target's flag as one unit. Afterwards exactly one route of the year is
//!   the baseline.
//! - `bank_surplus_atomic` / `apply_banked_atomic` serialize per route:
//!   lock route, recompute balance, run the banking decision, append, commit.
//!   Two concurrent calls for the same route never both decide on the same
//!   pre-write ledger.
//!
//! [`MemStore`] is the in-process implementation (tests, demos). The
//! Postgres implementation lives in `feu-db`.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    banking::{approve_apply, approve_bank},
    calculator::compute_balance,
    error::ComplianceError,
    pool::PoolOutcome,
    quantity::Gco2e,
    target::CompliancePolicy,
    types::{BankEntry, ComplianceResult, NewBankEntry, Route, RouteFilter},
};

/// A persisted pool: the computed outcome plus its storage identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub pool_id: Uuid,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: PoolOutcome,
}

/// Result of an approved ledger mutation: the balance the decision was made
/// on, and the row that was appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerWrite {
    pub before: ComplianceResult,
    pub entry: BankEntry,
}

#[async_trait::async_trait]
pub trait ComplianceStore: Send + Sync {
    /// Short name for logs ("memory", "postgres").
    fn backend_name(&self) -> &'static str;

    async fn fetch_route(&self, route_id: &str, year: i32) -> Result<Option<Route>>;

    /// Routes matching `filter`, ordered by `(year, route_id)`.
    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>>;

    /// Atomically make `(route_id, year)` the only baseline of its year.
    ///
    /// Fails with [`ComplianceError::RouteNotFound`] and changes nothing if
    /// the route does not exist.
    async fn set_baseline(&self, route_id: &str, year: i32) -> Result<Route>;

    /// Every ledger row recorded under `route_id` (all years), oldest first.
    async fn ledger_for_route(&self, route_id: &str) -> Result<Vec<BankEntry>>;

    /// Serialized "recompute, approve, append" for banking surplus.
    async fn bank_surplus_atomic(
        &self,
        route_id: &str,
        year: i32,
        policy: &CompliancePolicy,
    ) -> Result<LedgerWrite>;

    /// Serialized "recompute, approve, append" for drawing banked surplus down.
    async fn apply_banked_atomic(
        &self,
        route_id: &str,
        year: i32,
        amount: Gco2e,
        policy: &CompliancePolicy,
    ) -> Result<LedgerWrite>;

    async fn record_pool(&self, year: i32, outcome: &PoolOutcome) -> Result<PoolRecord>;
}

// ---------------------------------------------------------------------------
// MemStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemInner {
    routes: BTreeMap<(i32, String), Route>,
    ledger: Vec<BankEntry>,
    pools: Vec<PoolRecord>,
    last_entry_id: i64,
}

impl MemInner {
    fn route(&self, route_id: &str, year: i32) -> Result<&Route, ComplianceError> {
        self.routes
            .get(&(year, route_id.to_string()))
            .ok_or_else(|| ComplianceError::RouteNotFound {
                route_id: route_id.to_string(),
                year,
            })
    }

    fn append(&mut self, approved: NewBankEntry) -> BankEntry {
        self.last_entry_id += 1;
        let entry = approved.into_entry(self.last_entry_id, Utc::now());
        self.ledger.push(entry.clone());
        entry
    }

    /// Recompute + decide + append while the caller holds the lock.
    fn guarded_write<F>(
        &mut self,
        route_id: &str,
        year: i32,
        policy: &CompliancePolicy,
        decide: F,
    ) -> Result<LedgerWrite>
    where
        F: FnOnce(&ComplianceResult) -> Result<NewBankEntry, ComplianceError>,
    {
        let route = self.route(route_id, year)?;
        let before = compute_balance(route, &self.ledger, policy)?;
        let approved = decide(&before)?;
        let entry = self.append(approved);
        Ok(LedgerWrite { before, entry })
    }
}

/// In-memory store. One mutex guards routes, ledger and pools together, so
/// every mutation is trivially serialized.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemInner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-loaded with routes.
    ///
    /// Baseline flags are taken as given; call
    /// [`ComplianceStore::set_baseline`] afterwards if the input may carry
    /// more than one per year.
    pub fn with_routes<I: IntoIterator<Item = Route>>(routes: I) -> Self {
        let mut inner = MemInner::default();
        for r in routes {
            inner.routes.insert((r.year, r.route_id.clone()), r);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Insert or replace a route. Replacing keeps ledger history intact.
    pub async fn upsert_route(&self, route: Route) {
        let mut g = self.inner.lock().await;
        g.routes.insert((route.year, route.route_id.clone()), route);
    }

    pub async fn pools(&self) -> Vec<PoolRecord> {
        self.inner.lock().await.pools.clone()
    }

    pub async fn ledger_len(&self) -> usize {
        self.inner.lock().await.ledger.len()
    }
}

#[async_trait::async_trait]
impl ComplianceStore for MemStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_route(&self, route_id: &str, year: i32) -> Result<Option<Route>> {
        let g = self.inner.lock().await;
        Ok(g.routes.get(&(year, route_id.to_string())).cloned())
    }

    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>> {
        let g = self.inner.lock().await;
        // Keyed by (year, route_id), so iteration order is the listing order.
        Ok(g.routes.values().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn set_baseline(&self, route_id: &str, year: i32) -> Result<Route> {
        let mut g = self.inner.lock().await;
        g.route(route_id, year)?;

        for r in g.routes.values_mut().filter(|r| r.year == year) {
            r.is_baseline = r.route_id == route_id;
        }
        Ok(g.route(route_id, year)?.clone())
    }

    async fn ledger_for_route(&self, route_id: &str) -> Result<Vec<BankEntry>> {
        let g = self.inner.lock().await;
        Ok(g
            .ledger
            .iter()
            .filter(|e| e.route_id == route_id)
            .cloned()
            .collect())
    }

    async fn bank_surplus_atomic(
        &self,
        route_id: &str,
        year: i32,
        policy: &CompliancePolicy,
    ) -> Result<LedgerWrite> {
        let mut g = self.inner.lock().await;
        g.guarded_write(route_id, year, policy, approve_bank)
    }

    async fn apply_banked_atomic(
        &self,
        route_id: &str,
        year: i32,
        amount: Gco2e,
        policy: &CompliancePolicy,
    ) -> Result<LedgerWrite> {
        let mut g = self.inner.lock().await;
        g.guarded_write(route_id, year, policy, |r| approve_apply(r, amount))
    }

    async fn record_pool(&self, year: i32, outcome: &PoolOutcome) -> Result<PoolRecord> {
        let record = PoolRecord {
            pool_id: Uuid::new_v4(),
            year,
            created_at: Utc::now(),
            outcome: outcome.clone(),
        };
        self.inner.lock().await.pools.push(record.clone());
        Ok(record)
    }
}
