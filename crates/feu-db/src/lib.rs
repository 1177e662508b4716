use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use feu_compliance::{
    BankEntry, ComplianceError, EntryKind, Gco2e, NewBankEntry, PoolOutcome, PoolRecord, Route,
    RouteFilter,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

mod seed;
mod store;

pub use seed::{read_routes_csv, seed_routes_from_csv, RouteCsvRow, SeedReport};
pub use store::PgStore;

pub const ENV_DB_URL: &str = "FEU_DATABASE_URL";

/// Connect to Postgres using FEU_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 10).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_routes_table: bool,
    pub routes: i64,
    pub bank_entries: i64,
    pub pools: i64,
}

/// Connectivity + schema presence + row counts. Counts are 0 before the
/// first migration.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='routes'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    if !exists {
        return Ok(DbStatus {
            ok: one == 1,
            has_routes_table: false,
            routes: 0,
            bank_entries: 0,
            pools: 0,
        });
    }

    let (routes, bank_entries, pools): (i64, i64, i64) = sqlx::query_as(
        r#"
        select
          (select count(*) from routes)::bigint,
          (select count(*) from bank_entries)::bigint,
          (select count(*) from pools)::bigint
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status count query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_routes_table: true,
        routes,
        bank_entries,
        pools,
    })
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

const ROUTE_COLUMNS: &str = "route_id, year, vessel_type, fuel_type, ghg_intensity, \
     fuel_consumption_t, distance_km, total_emissions_t, is_baseline";

fn route_from_row(row: &PgRow) -> Result<Route> {
    Ok(Route {
        route_id: row.try_get("route_id").context("routes.route_id")?,
        year: row.try_get("year").context("routes.year")?,
        vessel_type: row.try_get("vessel_type").context("routes.vessel_type")?,
        fuel_type: row.try_get("fuel_type").context("routes.fuel_type")?,
        ghg_intensity: row.try_get("ghg_intensity").context("routes.ghg_intensity")?,
        fuel_consumption_t: row
            .try_get("fuel_consumption_t")
            .context("routes.fuel_consumption_t")?,
        distance_km: row.try_get("distance_km").context("routes.distance_km")?,
        total_emissions_t: row
            .try_get("total_emissions_t")
            .context("routes.total_emissions_t")?,
        is_baseline: row.try_get("is_baseline").context("routes.is_baseline")?,
    })
}

/// Insert or replace a route's attributes. The baseline flag is NOT touched
/// on update; it only moves through [`set_baseline`].
pub async fn upsert_route(conn: &mut PgConnection, route: &Route) -> Result<()> {
    sqlx::query(
        r#"
        insert into routes (
          route_id, year, vessel_type, fuel_type, ghg_intensity,
          fuel_consumption_t, distance_km, total_emissions_t, is_baseline
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, false)
        on conflict (route_id, year) do update set
          vessel_type = excluded.vessel_type,
          fuel_type = excluded.fuel_type,
          ghg_intensity = excluded.ghg_intensity,
          fuel_consumption_t = excluded.fuel_consumption_t,
          distance_km = excluded.distance_km,
          total_emissions_t = excluded.total_emissions_t
        "#,
    )
    .bind(&route.route_id)
    .bind(route.year)
    .bind(&route.vessel_type)
    .bind(&route.fuel_type)
    .bind(route.ghg_intensity)
    .bind(route.fuel_consumption_t)
    .bind(route.distance_km)
    .bind(route.total_emissions_t)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("upsert_route failed: {}", route.key()))?;
    Ok(())
}

pub async fn fetch_route(pool: &PgPool, route_id: &str, year: i32) -> Result<Option<Route>> {
    let row = sqlx::query(&format!(
        "select {ROUTE_COLUMNS} from routes where route_id = $1 and year = $2"
    ))
    .bind(route_id)
    .bind(year)
    .fetch_optional(pool)
    .await
    .context("fetch_route failed")?;

    row.as_ref().map(route_from_row).transpose()
}

/// Routes matching `filter`, ordered by `(year, route_id)`.
pub async fn list_routes(pool: &PgPool, filter: &RouteFilter) -> Result<Vec<Route>> {
    let rows = sqlx::query(&format!(
        r#"
        select {ROUTE_COLUMNS}
        from routes
        where ($1::text is null or vessel_type = $1)
          and ($2::text is null or fuel_type = $2)
          and ($3::integer is null or year = $3)
        order by year asc, route_id asc
        "#
    ))
    .bind(filter.vessel_type.as_deref())
    .bind(filter.fuel_type.as_deref())
    .bind(filter.year)
    .fetch_all(pool)
    .await
    .context("list_routes failed")?;

    rows.iter().map(route_from_row).collect()
}

/// Make `(route_id, year)` the only baseline of its year, in one transaction.
///
/// Fails with [`ComplianceError::RouteNotFound`] (rolled back, nothing
/// changed) when the route does not exist.
pub async fn set_baseline(pool: &PgPool, route_id: &str, year: i32) -> Result<Route> {
    let mut tx = pool.begin().await.context("set_baseline begin failed")?;
    let route = set_baseline_in(&mut *tx, route_id, year).await?;
    tx.commit().await.context("set_baseline commit failed")?;
    Ok(route)
}

/// Baseline move on a caller-owned connection; the caller commits.
///
/// Meant to run inside a transaction so the clear and the set land together.
pub async fn set_baseline_in(conn: &mut PgConnection, route_id: &str, year: i32) -> Result<Route> {
    // Lock the whole year so two concurrent moves serialize.
    sqlx::query("select route_id from routes where year = $1 for update")
        .bind(year)
        .fetch_all(&mut *conn)
        .await
        .context("set_baseline lock failed")?;

    sqlx::query("update routes set is_baseline = false where year = $1 and is_baseline")
        .bind(year)
        .execute(&mut *conn)
        .await
        .context("set_baseline clear failed")?;

    let row = sqlx::query(&format!(
        "update routes set is_baseline = true where route_id = $1 and year = $2 \
         returning {ROUTE_COLUMNS}"
    ))
    .bind(route_id)
    .bind(year)
    .fetch_optional(&mut *conn)
    .await;

    let row = match row {
        Ok(Some(r)) => r,
        Ok(None) => {
            return Err(ComplianceError::RouteNotFound {
                route_id: route_id.to_string(),
                year,
            }
            .into())
        }
        Err(e) => {
            if is_unique_constraint_violation(&e, "uq_routes_one_baseline_per_year") {
                return Err(anyhow::anyhow!("baseline already set concurrently for {year}"));
            }
            return Err(anyhow::Error::new(e).context("set_baseline update failed"));
        }
    };

    route_from_row(&row)
}

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

fn entry_from_row(row: &PgRow) -> Result<BankEntry> {
    let kind: String = row.try_get("kind").context("bank_entries.kind")?;
    let amount: Decimal = row.try_get("amount").context("bank_entries.amount")?;
    Ok(BankEntry {
        id: row.try_get("id").context("bank_entries.id")?,
        route_id: row.try_get("route_id").context("bank_entries.route_id")?,
        year: row.try_get("year").context("bank_entries.year")?,
        kind: EntryKind::parse(&kind)
            .with_context(|| format!("bank_entries.kind: unknown value '{kind}'"))?,
        amount: Gco2e::new(amount),
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .context("bank_entries.created_at")?,
    })
}

/// Every ledger row of `route_id` (all years), oldest first.
pub async fn ledger_for_route(conn: &mut PgConnection, route_id: &str) -> Result<Vec<BankEntry>> {
    let rows = sqlx::query(
        r#"
        select id, route_id, year, kind, amount, created_at
        from bank_entries
        where route_id = $1
        order by id asc
        "#,
    )
    .bind(route_id)
    .fetch_all(&mut *conn)
    .await
    .context("ledger_for_route failed")?;

    rows.iter().map(entry_from_row).collect()
}

/// Append one approved ledger row and return it with its assigned identity.
pub async fn insert_bank_entry(conn: &mut PgConnection, approved: NewBankEntry) -> Result<BankEntry> {
    let row = sqlx::query(
        r#"
        insert into bank_entries (route_id, year, kind, amount)
        values ($1, $2, $3, $4)
        returning id, created_at
        "#,
    )
    .bind(approved.route_id())
    .bind(approved.year())
    .bind(approved.kind().as_str())
    .bind(approved.amount().raw())
    .fetch_one(&mut *conn)
    .await
    .context("insert_bank_entry failed")?;

    let id: i64 = row.try_get("id")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(approved.into_entry(id, created_at))
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

/// Persist a computed pool and its members in one transaction.
pub async fn insert_pool(pool: &PgPool, year: i32, outcome: &PoolOutcome) -> Result<PoolRecord> {
    let pool_id = Uuid::new_v4();
    let mut tx = pool.begin().await.context("insert_pool begin failed")?;

    let (created_at,): (DateTime<Utc>,) = sqlx::query_as(
        r#"
        insert into pools (pool_id, year, total_adjusted_cb, valid)
        values ($1, $2, $3, $4)
        returning created_at
        "#,
    )
    .bind(pool_id)
    .bind(year)
    .bind(outcome.total_adjusted_cb.raw())
    .bind(outcome.valid)
    .fetch_one(&mut *tx)
    .await
    .context("insert pools row failed")?;

    for (position, a) in outcome.allocations.iter().enumerate() {
        let position = i32::try_from(position).context("pool member position overflow")?;
        sqlx::query(
            r#"
            insert into pool_members (pool_id, position, route_id, cb_before, cb_after)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(pool_id)
        .bind(position)
        .bind(&a.route_id)
        .bind(a.before.raw())
        .bind(a.after.raw())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert pool_members row failed: {}", a.route_id))?;
    }

    tx.commit().await.context("insert_pool commit failed")?;

    Ok(PoolRecord {
        pool_id,
        year,
        created_at,
        outcome: outcome.clone(),
    })
}

/// Number of stored pools for `year`.
pub async fn count_pools(pool: &PgPool, year: i32) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("select count(*)::bigint from pools where year = $1")
        .bind(year)
        .fetch_one(pool)
        .await
        .context("count_pools failed")?;
    Ok(n)
}
