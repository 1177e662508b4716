//! feu-compliance
//!
//! FuelEU Maritime compliance core:
//! - Compliance balance: `(target(year) − ghg_intensity) × fuel × LCV`
//! - Adjusted balance: raw balance plus the route's net banked ledger sum
//! - Banking policy: only a strictly positive raw balance may be banked
//! - Pool aggregation: validity verdict and display reallocation
//! - Baseline comparison per reporting year
//!
//! The calculator, banking decisions, pool aggregator and comparison are pure
//! (no IO, no clock). [`ComplianceService`] wires them to a
//! [`ComplianceStore`].

mod error;
mod quantity;
mod types;

pub mod banking;
pub mod calculator;
pub mod comparison;
pub mod pool;
pub mod service;
pub mod store;
pub mod target;

pub use banking::{approve_apply, approve_bank};
pub use calculator::{compute_balance, energy_in_scope, net_banked};
pub use comparison::{compare_to_baseline, RouteComparison};
pub use error::ComplianceError;
pub use pool::{
    aggregate_pool, ensure_pool_size, PoolAllocation, PoolMemberInput, PoolOutcome,
    MIN_POOL_MEMBERS,
};
pub use quantity::Gco2e;
pub use service::ComplianceService;
pub use store::{ComplianceStore, LedgerWrite, MemStore, PoolRecord};
pub use target::{
    default_lcv_mj_per_t, fueleu_reference_intensity, CompliancePolicy, LedgerScope,
    ScheduleError, TargetSchedule, TargetStep,
};
pub use types::{
    BankEntry, ComplianceResult, EntryKind, NewBankEntry, Route, RouteFilter, RouteKey,
};
