//! Operation surface consumed by the HTTP daemon and the CLI.
//!
//! `ComplianceService` combines a [`ComplianceStore`] with the active
//! [`CompliancePolicy`]. Read operations fetch the route and its ledger and
//! run the pure calculator; mutations are delegated to the store's atomic
//! methods so serialization stays with the persistence collaborator.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    calculator::compute_balance,
    comparison::{compare_to_baseline, RouteComparison},
    error::ComplianceError,
    pool::{aggregate_pool, ensure_pool_size, PoolMemberInput},
    quantity::Gco2e,
    store::{ComplianceStore, LedgerWrite, PoolRecord},
    target::CompliancePolicy,
    types::{BankEntry, ComplianceResult, Route, RouteFilter},
};

#[derive(Clone)]
pub struct ComplianceService {
    store: Arc<dyn ComplianceStore>,
    policy: Arc<CompliancePolicy>,
}

impl ComplianceService {
    pub fn new(store: Arc<dyn ComplianceStore>, policy: CompliancePolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    async fn require_route(&self, route_id: &str, year: i32) -> Result<Route> {
        self.store
            .fetch_route(route_id, year)
            .await?
            .ok_or_else(|| {
                ComplianceError::RouteNotFound {
                    route_id: route_id.to_string(),
                    year,
                }
                .into()
            })
    }

    // -----------------------------------------------------------------------
    // Compliance balance
    // -----------------------------------------------------------------------

    /// Raw and adjusted balance of `(route_id, year)` against the live ledger.
    pub async fn compute_balance(&self, route_id: &str, year: i32) -> Result<ComplianceResult> {
        let route = self.require_route(route_id, year).await?;
        let entries = self.store.ledger_for_route(route_id).await?;
        Ok(compute_balance(&route, &entries, &self.policy)?)
    }

    /// Balances of every route recorded for `year`, in listing order.
    pub async fn adjusted_balances(&self, year: i32) -> Result<Vec<ComplianceResult>> {
        let routes = self.store.list_routes(&RouteFilter::for_year(year)).await?;
        let mut out = Vec::with_capacity(routes.len());
        for route in &routes {
            let entries = self.store.ledger_for_route(&route.route_id).await?;
            out.push(compute_balance(route, &entries, &self.policy)?);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Banking
    // -----------------------------------------------------------------------

    /// Bank the route's positive raw balance. Each call is a distinct ledger
    /// transaction; calling twice banks twice.
    pub async fn bank_surplus(&self, route_id: &str, year: i32) -> Result<BankEntry> {
        match self
            .store
            .bank_surplus_atomic(route_id, year, &self.policy)
            .await
        {
            Ok(LedgerWrite { before, entry }) => {
                info!(
                    route_id,
                    year,
                    entry_id = entry.id,
                    amount = %entry.amount,
                    net_banked_before = %before.net_banked,
                    "banked surplus"
                );
                Ok(entry)
            }
            Err(e) => {
                log_rejection("bank", route_id, year, &e);
                Err(e)
            }
        }
    }

    /// Draw `amount` down from the route's banked surplus.
    pub async fn apply_banked(&self, route_id: &str, year: i32, amount: Gco2e) -> Result<BankEntry> {
        match self
            .store
            .apply_banked_atomic(route_id, year, amount, &self.policy)
            .await
        {
            Ok(LedgerWrite { before, entry }) => {
                info!(
                    route_id,
                    year,
                    entry_id = entry.id,
                    amount = %entry.amount,
                    net_banked_before = %before.net_banked,
                    "applied banked surplus"
                );
                Ok(entry)
            }
            Err(e) => {
                log_rejection("apply", route_id, year, &e);
                Err(e)
            }
        }
    }

    /// Ledger rows for `route_id`, optionally restricted to one year.
    pub async fn bank_records(&self, route_id: &str, year: Option<i32>) -> Result<Vec<BankEntry>> {
        let mut rows = self.store.ledger_for_route(route_id).await?;
        if let Some(y) = year {
            rows.retain(|e| e.year == y);
        }
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Pooling
    // -----------------------------------------------------------------------

    /// Aggregate the adjusted balances of `route_ids` (all in `year`) and
    /// record the outcome.
    pub async fn create_pool(&self, year: i32, route_ids: &[String]) -> Result<PoolRecord> {
        ensure_pool_size(route_ids.len())?;

        let mut seen = BTreeSet::new();
        for id in route_ids {
            if !seen.insert(id.as_str()) {
                return Err(ComplianceError::DuplicateMember {
                    route_id: id.clone(),
                }
                .into());
            }
        }

        let mut members = Vec::with_capacity(route_ids.len());
        for id in route_ids {
            let result = self.compute_balance(id, year).await?;
            members.push(PoolMemberInput::from(&result));
        }

        let outcome = aggregate_pool(&members)?;
        let record = self
            .store
            .record_pool(year, &outcome)
            .await
            .context("record_pool failed")?;

        info!(
            pool_id = %record.pool_id,
            year,
            members = members.len(),
            total = %outcome.total_adjusted_cb,
            valid = outcome.valid,
            "pool created"
        );
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Route catalogue
    // -----------------------------------------------------------------------

    pub async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>> {
        self.store.list_routes(filter).await
    }

    pub async fn set_baseline(&self, route_id: &str, year: i32) -> Result<Route> {
        let route = self.store.set_baseline(route_id, year).await?;
        info!(route_id, year, "baseline set");
        Ok(route)
    }

    /// Non-baseline routes of `year` compared to its baseline route.
    pub async fn comparison(&self, year: i32) -> Result<Vec<RouteComparison>> {
        let routes = self.store.list_routes(&RouteFilter::for_year(year)).await?;
        Ok(compare_to_baseline(&routes, year, &self.policy.schedule)?)
    }
}

fn log_rejection(op: &str, route_id: &str, year: i32, err: &anyhow::Error) {
    match err.downcast_ref::<ComplianceError>() {
        Some(domain) => warn!(op, route_id, year, kind = domain.kind(), "rejected: {domain}"),
        None => warn!(op, route_id, year, "failed: {err:#}"),
    }
}
