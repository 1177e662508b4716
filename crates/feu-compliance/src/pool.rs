//! Pool aggregator.
//!
//! Sums members' adjusted balances into a pool verdict and produces a
//! display-oriented reallocation:
//!
//! 1. `total = Σ cb_adjusted`; the pool is valid when `total ≥ 0`.
//! 2. Members are listed by descending adjusted balance (stable on ties).
//! 3. `after = before`, except a deficit member of a valid pool, which is
//!    shown as absorbed (`after = 0`).
//!
//! The reallocation does not conserve the total: zeroed deficits are not
//! charged against any surplus member. Callers that need a conserving
//! redistribution must not read `after` as one.
//!
//! The aggregator does not enforce a minimum size; callers check
//! [`ensure_pool_size`] first.

use serde::{Deserialize, Serialize};

use crate::{error::ComplianceError, quantity::Gco2e, types::ComplianceResult};

/// Smallest pool a caller may request.
pub const MIN_POOL_MEMBERS: usize = 2;

/// One member's pre-pool position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMemberInput {
    pub route_id: String,
    pub cb_adjusted: Gco2e,
}

impl PoolMemberInput {
    pub fn new(route_id: impl Into<String>, cb_adjusted: Gco2e) -> Self {
        Self {
            route_id: route_id.into(),
            cb_adjusted,
        }
    }
}

impl From<&ComplianceResult> for PoolMemberInput {
    fn from(r: &ComplianceResult) -> Self {
        Self::new(r.route_id.clone(), r.cb_adjusted)
    }
}

/// One member's balance before and after pooling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAllocation {
    pub route_id: String,
    pub before: Gco2e,
    pub after: Gco2e,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOutcome {
    pub total_adjusted_cb: Gco2e,
    pub valid: bool,
    /// Ordered by descending `before`.
    pub allocations: Vec<PoolAllocation>,
}

/// Reject pool requests smaller than [`MIN_POOL_MEMBERS`].
pub fn ensure_pool_size(supplied: usize) -> Result<(), ComplianceError> {
    if supplied < MIN_POOL_MEMBERS {
        return Err(ComplianceError::InsufficientMembers {
            supplied,
            required: MIN_POOL_MEMBERS,
        });
    }
    Ok(())
}

/// Fails with [`ComplianceError::PoolTotalOverflow`] when the total leaves
/// `Decimal` range.
pub fn aggregate_pool(members: &[PoolMemberInput]) -> Result<PoolOutcome, ComplianceError> {
    let total = Gco2e::checked_sum(members.iter().map(|m| m.cb_adjusted)).ok_or(
        ComplianceError::PoolTotalOverflow {
            members: members.len(),
        },
    )?;
    let valid = total.is_non_negative();

    let mut ordered: Vec<&PoolMemberInput> = members.iter().collect();
    ordered.sort_by(|a, b| b.cb_adjusted.cmp(&a.cb_adjusted));

    let allocations = ordered
        .into_iter()
        .map(|m| {
            let after = if valid && m.cb_adjusted.is_negative() {
                Gco2e::ZERO
            } else {
                m.cb_adjusted
            };
            PoolAllocation {
                route_id: m.route_id.clone(),
                before: m.cb_adjusted,
                after,
            }
        })
        .collect();

    Ok(PoolOutcome {
        total_adjusted_cb: total,
        valid,
        allocations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn m(id: &str, cb: rust_decimal::Decimal) -> PoolMemberInput {
        PoolMemberInput::new(id, Gco2e::new(cb))
    }

    #[test]
    fn total_overflow_is_an_error() {
        let err = aggregate_pool(&[
            m("A", rust_decimal::Decimal::MAX),
            m("B", rust_decimal::Decimal::MAX),
        ])
        .unwrap_err();
        assert_eq!(err, ComplianceError::PoolTotalOverflow { members: 2 });
    }

    #[test]
    fn valid_pool_zeroes_deficits_only() {
        let out = aggregate_pool(&[m("R003", dec!(-2000000)), m("R002", dec!(5000000))]).unwrap();

        assert_eq!(out.total_adjusted_cb, Gco2e::new(dec!(3000000)));
        assert!(out.valid);
        assert_eq!(
            out.allocations,
            vec![
                PoolAllocation {
                    route_id: "R002".to_string(),
                    before: Gco2e::new(dec!(5000000)),
                    after: Gco2e::new(dec!(5000000)),
                },
                PoolAllocation {
                    route_id: "R003".to_string(),
                    before: Gco2e::new(dec!(-2000000)),
                    after: Gco2e::ZERO,
                },
            ]
        );
    }

    #[test]
    fn invalid_pool_keeps_every_balance() {
        let out =
            aggregate_pool(&[m("A", dec!(1000)), m("B", dec!(-1500)), m("C", dec!(-1))]).unwrap();
        assert!(!out.valid);
        assert_eq!(out.total_adjusted_cb, Gco2e::new(dec!(-501)));
        assert!(out.allocations.iter().all(|a| a.after == a.before));
    }

    #[test]
    fn zero_total_is_valid() {
        let out = aggregate_pool(&[m("A", dec!(10)), m("B", dec!(-10))]).unwrap();
        assert!(out.valid);
        assert_eq!(out.allocations[1].after, Gco2e::ZERO);
    }

    #[test]
    fn ordering_is_descending_and_stable_on_ties() {
        let out = aggregate_pool(&[
            m("low", dec!(-3)),
            m("tie1", dec!(7)),
            m("high", dec!(9)),
            m("tie2", dec!(7)),
        ])
        .unwrap();
        let ids: Vec<&str> = out.allocations.iter().map(|a| a.route_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "tie1", "tie2", "low"]);
    }

    #[test]
    fn size_guard() {
        assert!(ensure_pool_size(2).is_ok());
        assert_eq!(
            ensure_pool_size(1).unwrap_err(),
            ComplianceError::InsufficientMembers {
                supplied: 1,
                required: 2
            }
        );
    }

    #[test]
    fn allocation_does_not_conserve_total() {
        let out = aggregate_pool(&[m("A", dec!(5)), m("B", dec!(-2))]).unwrap();
        let after_total: Gco2e = out.allocations.iter().map(|a| a.after).sum();
        assert_eq!(after_total, Gco2e::new(dec!(5)));
        assert_ne!(after_total, out.total_adjusted_cb);
    }
}
