//! Postgres-backed [`ComplianceStore`].
//!
//! Ledger mutations run as one transaction each:
//! lock every `routes` row of the route id (`FOR UPDATE`), read the ledger,
//! recompute the balance, run the banking decision, insert, commit.
//! A rejected decision drops the transaction, which rolls it back.
//!
//! All rows of the id are locked, not just the requested year, because the
//! net banked sum may span years (see `LedgerScope::AllYears`).

use anyhow::{Context, Result};
use feu_compliance::{
    approve_apply, approve_bank, compute_balance, ComplianceError, ComplianceResult,
    CompliancePolicy, ComplianceStore, Gco2e, LedgerWrite, NewBankEntry, PoolOutcome, PoolRecord,
    Route, RouteFilter,
};
use sqlx::PgPool;

use crate::route_from_row;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn guarded_write<F>(
        &self,
        route_id: &str,
        year: i32,
        policy: &CompliancePolicy,
        decide: F,
    ) -> Result<LedgerWrite>
    where
        F: FnOnce(&ComplianceResult) -> Result<NewBankEntry, ComplianceError> + Send,
    {
        let mut tx = self.pool.begin().await.context("ledger write begin failed")?;

        let rows = sqlx::query(&format!(
            "select {} from routes where route_id = $1 order by year for update",
            crate::ROUTE_COLUMNS
        ))
        .bind(route_id)
        .fetch_all(&mut *tx)
        .await
        .context("ledger write route lock failed")?;

        let mut route: Option<Route> = None;
        for row in &rows {
            let r = route_from_row(row)?;
            if r.year == year {
                route = Some(r);
            }
        }
        let route = route.ok_or_else(|| ComplianceError::RouteNotFound {
            route_id: route_id.to_string(),
            year,
        })?;

        let entries = crate::ledger_for_route(&mut *tx, route_id).await?;
        let before = compute_balance(&route, &entries, policy)?;
        let approved = decide(&before)?;
        let entry = crate::insert_bank_entry(&mut *tx, approved).await?;

        tx.commit().await.context("ledger write commit failed")?;
        Ok(LedgerWrite { before, entry })
    }
}

#[async_trait::async_trait]
impl ComplianceStore for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_route(&self, route_id: &str, year: i32) -> Result<Option<Route>> {
        crate::fetch_route(&self.pool, route_id, year).await
    }

    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>> {
        crate::list_routes(&self.pool, filter).await
    }

    async fn set_baseline(&self, route_id: &str, year: i32) -> Result<Route> {
        crate::set_baseline(&self.pool, route_id, year).await
    }

    async fn ledger_for_route(&self, route_id: &str) -> Result<Vec<feu_compliance::BankEntry>> {
        let mut conn = self.pool.acquire().await.context("acquire failed")?;
        crate::ledger_for_route(&mut *conn, route_id).await
    }

    async fn bank_surplus_atomic(
        &self,
        route_id: &str,
        year: i32,
        policy: &CompliancePolicy,
    ) -> Result<LedgerWrite> {
        self.guarded_write(route_id, year, policy, approve_bank).await
    }

    async fn apply_banked_atomic(
        &self,
        route_id: &str,
        year: i32,
        amount: Gco2e,
        policy: &CompliancePolicy,
    ) -> Result<LedgerWrite> {
        self.guarded_write(route_id, year, policy, move |r| approve_apply(r, amount))
            .await
    }

    async fn record_pool(&self, year: i32, outcome: &PoolOutcome) -> Result<PoolRecord> {
        crate::insert_pool(&self.pool, year, outcome).await
    }
}
