//! Baseline comparison view: every route of a year against that year's
//! baseline route and target.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{error::ComplianceError, target::TargetSchedule, types::Route};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteComparison {
    pub route_id: String,
    pub vessel_type: String,
    pub fuel_type: String,
    pub year: i32,
    pub baseline_route_id: String,
    pub baseline_intensity: Decimal,
    pub ghg_intensity: Decimal,
    /// `(ghg / baseline − 1) × 100`, rounded to 4 dp. `None` when the
    /// baseline intensity is zero or the ratio leaves `Decimal` range.
    pub percent_diff: Option<Decimal>,
    pub target_intensity: Decimal,
    /// `ghg_intensity ≤ target_intensity`.
    pub compliant: bool,
}

/// Compare the non-baseline routes of `year` to its baseline.
///
/// `routes` may contain other years; they are ignored.
pub fn compare_to_baseline(
    routes: &[Route],
    year: i32,
    schedule: &TargetSchedule,
) -> Result<Vec<RouteComparison>, ComplianceError> {
    let baseline = routes
        .iter()
        .find(|r| r.year == year && r.is_baseline)
        .ok_or(ComplianceError::BaselineNotSet { year })?;
    let target = schedule.target_for(year)?;

    let out = routes
        .iter()
        .filter(|r| r.year == year && !r.is_baseline)
        .map(|r| RouteComparison {
            route_id: r.route_id.clone(),
            vessel_type: r.vessel_type.clone(),
            fuel_type: r.fuel_type.clone(),
            year,
            baseline_route_id: baseline.route_id.clone(),
            baseline_intensity: baseline.ghg_intensity,
            ghg_intensity: r.ghg_intensity,
            percent_diff: percent_diff(r.ghg_intensity, baseline.ghg_intensity),
            target_intensity: target,
            compliant: r.ghg_intensity <= target,
        })
        .collect();
    Ok(out)
}

fn percent_diff(value: Decimal, baseline: Decimal) -> Option<Decimal> {
    let ratio = value.checked_div(baseline)?;
    let pct = ratio
        .checked_sub(Decimal::ONE)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(pct.round_dp(4))
}
