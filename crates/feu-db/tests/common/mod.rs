//! Shared helpers for the Postgres scenario tests.
//!
//! Every test works in its own reporting year (derived from a fresh UUID)
//! with route ids suffixed by that year, so tests can share one database and
//! run in parallel without touching each other's baselines or ledgers.

#![allow(dead_code)]

use std::sync::Arc;

use feu_compliance::{CompliancePolicy, ComplianceService, Route};
use feu_db::PgStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

/// `None` (after printing SKIP) when FEU_DATABASE_URL is unset.
pub async fn pool_or_skip() -> anyhow::Result<Option<PgPool>> {
    let url = match std::env::var(feu_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: FEU_DATABASE_URL not set");
            return Ok(None);
        }
    };
    let pool = feu_db::connect(&url, 4).await?;
    feu_db::migrate(&pool).await?;
    Ok(Some(pool))
}

/// A year no other test will pick.
pub fn isolated_year() -> i32 {
    let n = Uuid::new_v4().as_u128() % 900_000;
    3_000 + n as i32
}

/// Default FuelEU policy; its 2025 step also covers [`isolated_year`].
pub fn policy() -> CompliancePolicy {
    CompliancePolicy::fueleu_default()
}

pub fn route(id: &str, year: i32, ghg: Decimal, fuel_t: Decimal) -> Route {
    Route {
        route_id: format!("{id}-{year}"),
        vessel_type: "Container".to_string(),
        fuel_type: "HFO".to_string(),
        year,
        ghg_intensity: ghg,
        fuel_consumption_t: fuel_t,
        distance_km: dec!(12000),
        total_emissions_t: dec!(4500),
        is_baseline: false,
    }
}

pub async fn insert_routes(pool: &PgPool, routes: &[Route]) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;
    for r in routes {
        feu_db::upsert_route(&mut conn, r).await?;
    }
    Ok(())
}

pub fn service(pool: &PgPool) -> ComplianceService {
    ComplianceService::new(Arc::new(PgStore::new(pool.clone())), policy())
}

pub async fn ledger_rows(pool: &PgPool, route_id: &str) -> anyhow::Result<i64> {
    let (n,): (i64,) =
        sqlx::query_as("select count(*)::bigint from bank_entries where route_id = $1")
            .bind(route_id)
            .fetch_one(pool)
            .await?;
    Ok(n)
}
