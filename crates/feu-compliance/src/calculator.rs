//! Compliance-balance calculator.
//!
//! Pure and deterministic: no IO, no clock, no shared state. Two calls with
//! the same route, ledger rows and policy return identical results.

use rust_decimal::Decimal;

use crate::{
    error::ComplianceError,
    quantity::Gco2e,
    target::{CompliancePolicy, LedgerScope},
    types::{BankEntry, ComplianceResult, Route},
};

/// Energy in scope: `fuel_consumption_t × lcv`, in MJ. `None` on overflow.
pub fn energy_in_scope(fuel_consumption_t: Decimal, lcv_mj_per_t: Decimal) -> Option<Decimal> {
    fuel_consumption_t.checked_mul(lcv_mj_per_t)
}

/// Σ banked − Σ applied over the entries that belong to `route`.
///
/// Rows recorded under another route id never count. Under
/// [`LedgerScope::SameYear`] rows stamped with another year are skipped too.
/// `None` on overflow.
pub fn net_banked<'a, I>(route: &Route, entries: I, scope: LedgerScope) -> Option<Gco2e>
where
    I: IntoIterator<Item = &'a BankEntry>,
{
    Gco2e::checked_sum(
        entries
            .into_iter()
            .filter(|e| e.route_id == route.route_id)
            .filter(|e| match scope {
                LedgerScope::AllYears => true,
                LedgerScope::SameYear => e.year == route.year,
            })
            .map(BankEntry::signed_amount),
    )
}

/// Compute the raw and adjusted compliance balance of one route.
///
/// Fails when the schedule has no target for the route's year, or with
/// [`ComplianceError::BalanceOverflow`] when any intermediate figure leaves
/// `Decimal` range.
pub fn compute_balance(
    route: &Route,
    entries: &[BankEntry],
    policy: &CompliancePolicy,
) -> Result<ComplianceResult, ComplianceError> {
    let target = policy.schedule.target_for(route.year)?;
    let overflow = || ComplianceError::BalanceOverflow {
        route_id: route.route_id.clone(),
        year: route.year,
    };

    let energy_mj =
        energy_in_scope(route.fuel_consumption_t, policy.lcv_mj_per_t).ok_or_else(overflow)?;
    let cb_raw =
        Gco2e::from_intensity_gap(target, route.ghg_intensity, energy_mj).ok_or_else(overflow)?;
    let net = net_banked(route, entries, policy.ledger_scope).ok_or_else(overflow)?;
    let cb_adjusted = cb_raw.checked_add(net).ok_or_else(overflow)?;

    Ok(ComplianceResult {
        route_id: route.route_id.clone(),
        year: route.year,
        target_intensity: target,
        energy_mj,
        cb_raw,
        net_banked: net,
        cb_adjusted,
    })
}
