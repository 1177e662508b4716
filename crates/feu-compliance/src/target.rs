//! Yearly GHG-intensity targets and the policy values the calculator reads.
//!
//! The target is a step function of the reporting year: each
//! [`TargetStep`] says "from this year on, the target is the reference
//! intensity reduced by this percentage". A year earlier than the first step
//! has no target at all and is rejected, so one year's figure is never
//! silently applied to another period.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ComplianceError;

/// FuelEU reference intensity, gCO₂e/MJ.
pub fn fueleu_reference_intensity() -> Decimal {
    Decimal::new(9116, 2)
}

/// Lower calorific value applied to every fuel, MJ per tonne.
pub fn default_lcv_mj_per_t() -> Decimal {
    Decimal::new(41_000, 0)
}

/// One reduction step of the schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetStep {
    pub from_year: i32,
    /// Percent reduction from the reference intensity, in `[0, 100]`.
    pub reduction_pct: Decimal,
}

/// Invalid schedule definitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    NonPositiveReference { reference: Decimal },
    Empty,
    DuplicateYear { year: i32 },
    ReductionOutOfRange { from_year: i32, reduction_pct: Decimal },
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveReference { reference } => {
                write!(f, "reference intensity must be > 0, got {reference}")
            }
            Self::Empty => write!(f, "target schedule must have at least one step"),
            Self::DuplicateYear { year } => {
                write!(f, "target schedule has more than one step for {year}")
            }
            Self::ReductionOutOfRange {
                from_year,
                reduction_pct,
            } => write!(
                f,
                "reduction_pct must be within [0, 100], got {reduction_pct} for {from_year}"
            ),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Validated, year-ordered target schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TargetSchedule {
    reference_intensity: Decimal,
    steps: Vec<TargetStep>,
}

impl TargetSchedule {
    pub fn new(reference_intensity: Decimal, mut steps: Vec<TargetStep>) -> Result<Self, ScheduleError> {
        if reference_intensity <= Decimal::ZERO {
            return Err(ScheduleError::NonPositiveReference {
                reference: reference_intensity,
            });
        }
        if steps.is_empty() {
            return Err(ScheduleError::Empty);
        }
        for s in &steps {
            if s.reduction_pct < Decimal::ZERO || s.reduction_pct > Decimal::ONE_HUNDRED {
                return Err(ScheduleError::ReductionOutOfRange {
                    from_year: s.from_year,
                    reduction_pct: s.reduction_pct,
                });
            }
        }
        steps.sort_by_key(|s| s.from_year);
        if let Some(w) = steps.windows(2).find(|w| w[0].from_year == w[1].from_year) {
            return Err(ScheduleError::DuplicateYear {
                year: w[0].from_year,
            });
        }
        Ok(Self {
            reference_intensity,
            steps,
        })
    }

    /// Schedule with the 2025 step only: 91.16 reduced by 2 % = 89.3368.
    pub fn fueleu_default() -> Self {
        Self {
            reference_intensity: fueleu_reference_intensity(),
            steps: vec![TargetStep {
                from_year: 2025,
                reduction_pct: Decimal::TWO,
            }],
        }
    }

    pub fn reference_intensity(&self) -> Decimal {
        self.reference_intensity
    }

    pub fn steps(&self) -> &[TargetStep] {
        &self.steps
    }

    /// Target intensity (gCO₂e/MJ) in force for `year`.
    pub fn target_for(&self, year: i32) -> Result<Decimal, ComplianceError> {
        let step = self
            .steps
            .iter()
            .rev()
            .find(|s| s.from_year <= year)
            .ok_or(ComplianceError::TargetNotConfigured { year })?;
        let factor = Decimal::ONE - step.reduction_pct / Decimal::ONE_HUNDRED;
        Ok(self.reference_intensity * factor)
    }
}

/// Which ledger rows count toward a route's net banked balance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerScope {
    /// Every entry recorded under the route id, whatever its year.
    #[default]
    AllYears,
    /// Only entries stamped with the route's own year.
    SameYear,
}

impl LedgerScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerScope::AllYears => "all_years",
            LedgerScope::SameYear => "same_year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "all_years" => Some(LedgerScope::AllYears),
            "same_year" => Some(LedgerScope::SameYear),
            _ => None,
        }
    }
}

/// Everything the calculator needs besides the route and its ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompliancePolicy {
    pub schedule: TargetSchedule,
    pub lcv_mj_per_t: Decimal,
    pub ledger_scope: LedgerScope,
}

impl CompliancePolicy {
    pub fn fueleu_default() -> Self {
        Self {
            schedule: TargetSchedule::fueleu_default(),
            lcv_mj_per_t: default_lcv_mj_per_t(),
            ledger_scope: LedgerScope::AllYears,
        }
    }
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self::fueleu_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_2025_target() {
        let s = TargetSchedule::fueleu_default();
        assert_eq!(s.target_for(2025).unwrap(), dec!(89.3368));
    }

    #[test]
    fn later_years_use_latest_effective_step() {
        let s = TargetSchedule::new(
            dec!(91.16),
            vec![
                TargetStep {
                    from_year: 2030,
                    reduction_pct: dec!(6),
                },
                TargetStep {
                    from_year: 2025,
                    reduction_pct: dec!(2),
                },
            ],
        )
        .unwrap();
        assert_eq!(s.target_for(2027).unwrap(), dec!(89.3368));
        assert_eq!(s.target_for(2030).unwrap(), dec!(85.6904));
        assert_eq!(s.target_for(2034).unwrap(), dec!(85.6904));
    }

    #[test]
    fn year_before_first_step_is_rejected() {
        let err = TargetSchedule::fueleu_default().target_for(2024).unwrap_err();
        assert_eq!(err, ComplianceError::TargetNotConfigured { year: 2024 });
    }

    #[test]
    fn duplicate_years_rejected() {
        let step = TargetStep {
            from_year: 2025,
            reduction_pct: dec!(2),
        };
        let err = TargetSchedule::new(dec!(91.16), vec![step.clone(), step]).unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateYear { year: 2025 });
    }

    #[test]
    fn reduction_out_of_range_rejected() {
        let err = TargetSchedule::new(
            dec!(91.16),
            vec![TargetStep {
                from_year: 2050,
                reduction_pct: dec!(120),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::ReductionOutOfRange { .. }));
    }

    #[test]
    fn ledger_scope_parse() {
        assert_eq!(LedgerScope::parse("same_year"), Some(LedgerScope::SameYear));
        assert_eq!(LedgerScope::parse(" all_years "), Some(LedgerScope::AllYears));
        assert_eq!(LedgerScope::parse("yearly"), None);
    }
}
