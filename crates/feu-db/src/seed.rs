//! CSV -> routes seeding.
//!
//! Header:
//! `route_id,vessel_type,fuel_type,year,ghg_intensity,fuel_consumption_t,distance_km,total_emissions_t,is_baseline`
//!
//! All rows are validated before anything is written. Attribute upserts and
//! the baseline moves for rows flagged `is_baseline` share one transaction,
//! so a failing row leaves the table as it was.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use feu_compliance::Route;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct RouteCsvRow {
    pub route_id: String,
    pub vessel_type: String,
    pub fuel_type: String,
    pub year: i32,
    // Decimal columns are kept as text until parsed so no value passes
    // through a binary float.
    pub ghg_intensity: String,
    pub fuel_consumption_t: String,
    pub distance_km: String,
    pub total_emissions_t: String,
    pub is_baseline: bool,
}

impl RouteCsvRow {
    fn into_route(self, line: usize) -> Result<Route> {
        Ok(Route {
            ghg_intensity: non_negative(&self.ghg_intensity, "ghg_intensity", line)?,
            fuel_consumption_t: non_negative(&self.fuel_consumption_t, "fuel_consumption_t", line)?,
            distance_km: non_negative(&self.distance_km, "distance_km", line)?,
            total_emissions_t: non_negative(&self.total_emissions_t, "total_emissions_t", line)?,
            route_id: self.route_id,
            vessel_type: self.vessel_type,
            fuel_type: self.fuel_type,
            year: self.year,
            is_baseline: self.is_baseline,
        })
    }
}

fn non_negative(raw: &str, name: &str, line: usize) -> Result<Decimal> {
    let v = Decimal::from_str(raw.trim())
        .with_context(|| format!("routes csv line {line}: {name} '{raw}' is not a decimal"))?;
    if v < Decimal::ZERO {
        bail!("routes csv line {line}: {name} must be >= 0, got {v}");
    }
    Ok(v)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub rows_read: u64,
    pub routes_upserted: u64,
    /// `(route_id, year)` of every baseline that was set.
    pub baselines_set: Vec<(String, i32)>,
}

/// Parse and validate a routes CSV without touching the database.
pub fn read_routes_csv<R: std::io::Read>(reader: R) -> Result<Vec<Route>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut out = Vec::new();
    let mut seen: BTreeSet<(String, i32)> = BTreeSet::new();
    let mut baseline_years: BTreeSet<i32> = BTreeSet::new();

    for (i, rec) in rdr.deserialize::<RouteCsvRow>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = rec.with_context(|| format!("routes csv line {line}: deserialize failed"))?;

        if row.route_id.trim().is_empty() {
            bail!("routes csv line {line}: empty route_id");
        }
        if !seen.insert((row.route_id.clone(), row.year)) {
            bail!(
                "routes csv line {line}: duplicate route {}@{}",
                row.route_id,
                row.year
            );
        }
        if row.is_baseline && !baseline_years.insert(row.year) {
            bail!(
                "routes csv line {line}: second baseline for year {}",
                row.year
            );
        }
        out.push(row.into_route(line)?);
    }
    Ok(out)
}

pub async fn seed_routes_from_csv(pool: &PgPool, path: &Path) -> Result<SeedReport> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open routes csv failed: {}", path.display()))?;
    let routes = read_routes_csv(file)?;

    let mut tx = pool.begin().await.context("seed begin failed")?;
    for r in &routes {
        crate::upsert_route(&mut *tx, r).await?;
    }

    let mut baselines_set = Vec::new();
    for r in routes.iter().filter(|r| r.is_baseline) {
        crate::set_baseline_in(&mut *tx, &r.route_id, r.year).await?;
        baselines_set.push((r.route_id.clone(), r.year));
    }
    tx.commit().await.context("seed commit failed")?;

    let report = SeedReport {
        rows_read: routes.len() as u64,
        routes_upserted: routes.len() as u64,
        baselines_set,
    };
    info!(
        path = %path.display(),
        routes = report.routes_upserted,
        baselines = report.baselines_set.len(),
        "routes seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "route_id,vessel_type,fuel_type,year,ghg_intensity,fuel_consumption_t,distance_km,total_emissions_t,is_baseline\n";

    #[test]
    fn shipped_seed_parses() {
        let raw = include_str!("../seed/routes.csv");
        let routes = read_routes_csv(raw.as_bytes()).unwrap();
        assert_eq!(routes.len(), 5);
        assert_eq!(routes[1].route_id, "R002");
        assert_eq!(routes[1].ghg_intensity, dec!(88.0));
        assert_eq!(routes.iter().filter(|r| r.is_baseline).count(), 1);
    }

    #[test]
    fn duplicate_key_rejected() {
        let csv = format!(
            "{HEADER}R1,Tanker,MGO,2025,90,100,1,1,false\nR1,Tanker,MGO,2025,91,100,1,1,false\n"
        );
        let err = read_routes_csv(csv.as_bytes()).unwrap_err().to_string();
        assert!(err.contains("line 3"), "{err}");
        assert!(err.contains("duplicate"), "{err}");
    }

    #[test]
    fn same_id_in_two_years_is_fine() {
        let csv = format!(
            "{HEADER}R1,Tanker,MGO,2025,90,100,1,1,true\nR1,Tanker,MGO,2026,91,100,1,1,true\n"
        );
        assert_eq!(read_routes_csv(csv.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn two_baselines_in_one_year_rejected() {
        let csv = format!(
            "{HEADER}R1,Tanker,MGO,2025,90,100,1,1,true\nR2,Tanker,MGO,2025,91,100,1,1,true\n"
        );
        let err = read_routes_csv(csv.as_bytes()).unwrap_err().to_string();
        assert!(err.contains("second baseline"), "{err}");
    }

    #[test]
    fn negative_fuel_rejected() {
        let csv = format!("{HEADER}R1,Tanker,MGO,2025,90,-1,1,1,false\n");
        let err = read_routes_csv(csv.as_bytes()).unwrap_err().to_string();
        assert!(err.contains("fuel_consumption_t"), "{err}");
    }
}
