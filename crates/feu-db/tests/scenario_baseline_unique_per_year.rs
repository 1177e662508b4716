//! DB-backed baseline scenarios. Skipped if FEU_DATABASE_URL is unset.
//!
//! 1. `set_baseline` leaves exactly one flagged route in the year.
//! 2. An unknown route fails and the previous baseline survives.
//! 3. The partial unique index refuses a second flag written directly.

mod common;

use feu_compliance::{ComplianceError, RouteFilter};
use rust_decimal_macros::dec;

async fn baselines(pool: &sqlx::PgPool, year: i32) -> anyhow::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "select route_id from routes where year = $1 and is_baseline order by route_id",
    )
    .bind(year)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[tokio::test]
async fn moving_the_baseline_keeps_one() -> anyhow::Result<()> {
    let Some(pool) = common::pool_or_skip().await? else {
        return Ok(());
    };
    let year = common::isolated_year();
    let a = common::route("A", year, dec!(91.0), dec!(5000));
    let b = common::route("B", year, dec!(88.0), dec!(4800));
    common::insert_routes(&pool, &[a.clone(), b.clone()]).await?;
    let svc = common::service(&pool);

    svc.set_baseline(&a.route_id, year).await?;
    assert_eq!(baselines(&pool, year).await?, vec![a.route_id.clone()]);

    let moved = svc.set_baseline(&b.route_id, year).await?;
    assert!(moved.is_baseline);
    assert_eq!(baselines(&pool, year).await?, vec![b.route_id.clone()]);

    let listed = svc.list_routes(&RouteFilter::for_year(year)).await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed.iter().filter(|r| r.is_baseline).count(), 1);

    let err = svc.set_baseline("MISSING", year).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ComplianceError>(),
        Some(ComplianceError::RouteNotFound { .. })
    ));
    assert_eq!(baselines(&pool, year).await?, vec![b.route_id.clone()]);

    let cmp = svc.comparison(year).await?;
    assert_eq!(cmp.len(), 1);
    assert_eq!(cmp[0].route_id, a.route_id);
    assert_eq!(cmp[0].percent_diff, Some(dec!(3.4091)));
    Ok(())
}

#[tokio::test]
async fn index_rejects_second_flag() -> anyhow::Result<()> {
    let Some(pool) = common::pool_or_skip().await? else {
        return Ok(());
    };
    let year = common::isolated_year();
    let a = common::route("A", year, dec!(91.0), dec!(5000));
    let b = common::route("B", year, dec!(88.0), dec!(4800));
    common::insert_routes(&pool, &[a.clone(), b.clone()]).await?;
    feu_db::set_baseline(&pool, &a.route_id, year).await?;

    let res = sqlx::query("update routes set is_baseline = true where route_id = $1 and year = $2")
        .bind(&b.route_id)
        .bind(year)
        .execute(&pool)
        .await;
    let err = res.expect_err("second baseline must violate the partial unique index");
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.code().as_deref(), Some("23505"));
    assert_eq!(db_err.constraint(), Some("uq_routes_one_baseline_per_year"));
    Ok(())
}
