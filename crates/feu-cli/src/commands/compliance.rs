//! Route, balance, banking and pooling commands.
//!
//! Each handler calls one [`ComplianceService`] operation and prints its
//! result as JSON. Domain rejections surface as the process error.

use anyhow::Result;
use feu_compliance::{ComplianceService, Gco2e, RouteFilter};
use rust_decimal::Decimal;

use super::print_json;

pub async fn routes_list(svc: &ComplianceService, filter: RouteFilter) -> Result<()> {
    let routes = svc.list_routes(&filter).await?;
    print_json(&routes)
}

pub async fn routes_baseline(svc: &ComplianceService, route_id: &str, year: i32) -> Result<()> {
    let route = svc.set_baseline(route_id, year).await?;
    println!("baseline_route_id={} year={}", route.route_id, route.year);
    Ok(())
}

pub async fn routes_compare(svc: &ComplianceService, year: i32) -> Result<()> {
    let rows = svc.comparison(year).await?;
    print_json(&rows)
}

pub async fn cb(svc: &ComplianceService, route_id: &str, year: i32) -> Result<()> {
    let result = svc.compute_balance(route_id, year).await?;
    print_json(&result)
}

pub async fn adjusted_cb(svc: &ComplianceService, year: i32) -> Result<()> {
    let results = svc.adjusted_balances(year).await?;
    print_json(&results)
}

pub async fn bank(svc: &ComplianceService, route_id: &str, year: i32) -> Result<()> {
    let entry = svc.bank_surplus(route_id, year).await?;
    println!("entry_id={} kind={} amount={}", entry.id, entry.kind.as_str(), entry.amount);
    Ok(())
}

pub async fn apply(svc: &ComplianceService, route_id: &str, year: i32, amount: Decimal) -> Result<()> {
    let entry = svc.apply_banked(route_id, year, Gco2e::new(amount)).await?;
    println!("entry_id={} kind={} amount={}", entry.id, entry.kind.as_str(), entry.amount);
    Ok(())
}

pub async fn records(svc: &ComplianceService, route_id: &str, year: Option<i32>) -> Result<()> {
    let rows = svc.bank_records(route_id, year).await?;
    print_json(&rows)
}

pub async fn pool(svc: &ComplianceService, year: i32, members: &[String]) -> Result<()> {
    let record = svc.create_pool(year, members).await?;
    print_json(&record)
}
