//! Typed extraction of the compliance policy from the merged config JSON.
//!
//! ```yaml
//! compliance:
//!   reference_intensity: "91.16"
//!   lcv_mj_per_t: "41000"
//!   ledger_scope: all_years
//!   targets:
//!     - { from_year: 2025, reduction_pct: "2" }
//!     - { from_year: 2030, reduction_pct: "6" }
//! ```
//!
//! Every key is optional; absent keys fall back to
//! [`CompliancePolicy::fueleu_default`]. Present keys are validated strictly.

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use feu_compliance::{CompliancePolicy, LedgerScope, TargetSchedule, TargetStep};
use rust_decimal::Decimal;
use serde_json::Value;

const REFERENCE_PTR: &str = "/compliance/reference_intensity";
const LCV_PTR: &str = "/compliance/lcv_mj_per_t";
const TARGETS_PTR: &str = "/compliance/targets";
const SCOPE_PTR: &str = "/compliance/ledger_scope";

pub fn compliance_policy_from_config(config_json: &Value) -> Result<CompliancePolicy> {
    let defaults = CompliancePolicy::fueleu_default();

    let reference = match config_json.pointer(REFERENCE_PTR) {
        Some(v) => decimal_at(v, REFERENCE_PTR)?,
        None => defaults.schedule.reference_intensity(),
    };

    let steps = match config_json.pointer(TARGETS_PTR) {
        Some(v) => parse_steps(v)?,
        None => defaults.schedule.steps().to_vec(),
    };

    let schedule = TargetSchedule::new(reference, steps)
        .map_err(|e| anyhow!("CONFIG_INVALID {TARGETS_PTR}: {e}"))?;

    let lcv_mj_per_t = match config_json.pointer(LCV_PTR) {
        Some(v) => {
            let lcv = decimal_at(v, LCV_PTR)?;
            if lcv <= Decimal::ZERO {
                bail!("CONFIG_INVALID {LCV_PTR}: must be > 0, got {lcv}");
            }
            lcv
        }
        None => defaults.lcv_mj_per_t,
    };

    let ledger_scope = match config_json.pointer(SCOPE_PTR) {
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| anyhow!("CONFIG_INVALID {SCOPE_PTR}: expected a string"))?;
            LedgerScope::parse(s).ok_or_else(|| {
                anyhow!("CONFIG_INVALID {SCOPE_PTR}: expected all_years | same_year, got '{s}'")
            })?
        }
        None => defaults.ledger_scope,
    };

    Ok(CompliancePolicy {
        schedule,
        lcv_mj_per_t,
        ledger_scope,
    })
}

fn parse_steps(v: &Value) -> Result<Vec<TargetStep>> {
    let arr = v
        .as_array()
        .ok_or_else(|| anyhow!("CONFIG_INVALID {TARGETS_PTR}: expected a list"))?;

    arr.iter()
        .enumerate()
        .map(|(i, step)| {
            let ptr = format!("{TARGETS_PTR}/{i}");
            let from_year = step
                .get("from_year")
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow!("CONFIG_INVALID {ptr}/from_year: expected an integer"))?;
            let from_year = i32::try_from(from_year)
                .with_context(|| format!("CONFIG_INVALID {ptr}/from_year: out of range"))?;
            let pct = step
                .get("reduction_pct")
                .ok_or_else(|| anyhow!("CONFIG_INVALID {ptr}/reduction_pct: missing"))?;
            Ok(TargetStep {
                from_year,
                reduction_pct: decimal_at(pct, &format!("{ptr}/reduction_pct"))?,
            })
        })
        .collect()
}

/// Decimals are expected as strings; plain YAML numbers are accepted too and
/// read back through their textual form so no binary float value is kept.
fn decimal_at(v: &Value, ptr: &str) -> Result<Decimal> {
    let text = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => bail!("CONFIG_INVALID {ptr}: expected a decimal string"),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .with_context(|| format!("CONFIG_INVALID {ptr}: '{text}' is not a decimal"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;
    use rust_decimal_macros::dec;

    fn policy(yaml: &str) -> Result<CompliancePolicy> {
        let loaded = load_layered_yaml_from_strings(&[yaml])?;
        compliance_policy_from_config(&loaded.config_json)
    }

    #[test]
    fn empty_config_is_fueleu_default() {
        assert_eq!(policy("{}").unwrap(), CompliancePolicy::fueleu_default());
    }

    #[test]
    fn numeric_and_string_decimals_agree() {
        let a = policy("compliance: { lcv_mj_per_t: \"41000.0\" }").unwrap();
        let b = policy("compliance: { lcv_mj_per_t: 41000 }").unwrap();
        assert_eq!(a.lcv_mj_per_t, b.lcv_mj_per_t);
        assert_eq!(a.lcv_mj_per_t, dec!(41000));
    }

    #[test]
    fn yaml_float_keeps_its_decimal_text() {
        let p = policy("compliance: { reference_intensity: 91.16 }").unwrap();
        assert_eq!(p.schedule.reference_intensity(), dec!(91.16));
    }

    #[test]
    fn bad_scope_names_the_pointer() {
        let err = policy("compliance: { ledger_scope: yearly }").unwrap_err();
        assert!(err.to_string().contains("/compliance/ledger_scope"), "{err}");
    }

    #[test]
    fn non_positive_lcv_rejected() {
        let err = policy("compliance: { lcv_mj_per_t: \"0\" }").unwrap_err();
        assert!(err.to_string().contains("CONFIG_INVALID"), "{err}");
    }

    #[test]
    fn step_without_year_rejected() {
        let err = policy("compliance: { targets: [ { reduction_pct: \"2\" } ] }").unwrap_err();
        assert!(err.to_string().contains("/compliance/targets/0/from_year"), "{err}");
    }
}
