//! Banking policy: decides which ledger row, if any, a request may append.
//!
//! The decision functions are pure. Stores call them between "lock route"
//! and "append row" so the check and the write see the same ledger.

use crate::{
    error::ComplianceError,
    quantity::Gco2e,
    types::{ComplianceResult, EntryKind, NewBankEntry},
};

/// Approve banking the route's surplus.
///
/// Only the raw balance counts: a route may not re-bank a figure that
/// already includes banked amounts. The approved amount is `cb_raw`.
pub fn approve_bank(result: &ComplianceResult) -> Result<NewBankEntry, ComplianceError> {
    if !result.cb_raw.is_positive() {
        return Err(ComplianceError::NegativeBalance {
            route_id: result.route_id.clone(),
            year: result.year,
            cb_raw: result.cb_raw,
        });
    }
    NewBankEntry::new(
        result.route_id.clone(),
        result.year,
        EntryKind::Banked,
        result.cb_raw,
    )
}

/// Approve drawing `amount` down from the route's net banked surplus.
pub fn approve_apply(
    result: &ComplianceResult,
    amount: Gco2e,
) -> Result<NewBankEntry, ComplianceError> {
    if !amount.is_positive() {
        return Err(ComplianceError::InvalidAmount { amount });
    }
    if amount > result.net_banked {
        return Err(ComplianceError::InsufficientBanked {
            route_id: result.route_id.clone(),
            requested: amount,
            available: result.net_banked,
        });
    }
    NewBankEntry::new(result.route_id.clone(), result.year, EntryKind::Applied, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn result(cb_raw: Gco2e, net_banked: Gco2e) -> ComplianceResult {
        ComplianceResult {
            route_id: "R002".to_string(),
            year: 2025,
            target_intensity: dec!(89.3368),
            energy_mj: dec!(196800000),
            cb_raw,
            net_banked,
            cb_adjusted: cb_raw + net_banked,
        }
    }

    #[test]
    fn positive_raw_balance_is_banked_in_full() {
        let r = result(Gco2e::new(dec!(263082240)), Gco2e::new(dec!(10)));
        let e = approve_bank(&r).unwrap();
        assert_eq!(e.kind(), EntryKind::Banked);
        // raw, not adjusted
        assert_eq!(e.amount(), Gco2e::new(dec!(263082240)));
        assert_eq!(e.route_id(), "R002");
        assert_eq!(e.year(), 2025);
    }

    #[test]
    fn zero_raw_balance_is_rejected() {
        let err = approve_bank(&result(Gco2e::ZERO, Gco2e::ZERO)).unwrap_err();
        assert_eq!(err.kind(), "negative_balance");
    }

    #[test]
    fn negative_raw_balance_rejected_even_with_banked_history() {
        let r = result(Gco2e::new(dec!(-5)), Gco2e::new(dec!(1000)));
        assert!(r.cb_adjusted.is_positive());
        let err = approve_bank(&r).unwrap_err();
        assert!(matches!(err, ComplianceError::NegativeBalance { .. }));
    }

    #[test]
    fn apply_within_available_surplus() {
        let r = result(Gco2e::new(dec!(-50)), Gco2e::new(dec!(100)));
        let e = approve_apply(&r, Gco2e::new(dec!(100))).unwrap();
        assert_eq!(e.kind(), EntryKind::Applied);
        assert_eq!(e.amount(), Gco2e::new(dec!(100)));
    }

    #[test]
    fn apply_more_than_available_rejected() {
        let r = result(Gco2e::ZERO, Gco2e::new(dec!(100)));
        let err = approve_apply(&r, Gco2e::new(dec!(100.01))).unwrap_err();
        assert_eq!(
            err,
            ComplianceError::InsufficientBanked {
                route_id: "R002".to_string(),
                requested: Gco2e::new(dec!(100.01)),
                available: Gco2e::new(dec!(100)),
            }
        );
    }

    #[test]
    fn apply_non_positive_amount_rejected() {
        let r = result(Gco2e::ZERO, Gco2e::new(dec!(100)));
        assert_eq!(
            approve_apply(&r, Gco2e::ZERO).unwrap_err().kind(),
            "invalid_amount"
        );
    }
}
