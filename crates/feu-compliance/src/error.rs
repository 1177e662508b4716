//! Typed domain failures.
//!
//! Every rejection the compliance core can raise is one variant here. I/O
//! layers carry these inside `anyhow::Error`; the HTTP layer recovers them
//! with `downcast_ref::<ComplianceError>()` and maps [`ComplianceError::kind`]
//! to a status code.

use crate::quantity::Gco2e;

/// All domain rejections surfaced by the compliance core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplianceError {
    /// No route record matches `(route_id, year)`.
    RouteNotFound { route_id: String, year: i32 },
    /// Banking requires a strictly positive raw compliance balance.
    NegativeBalance {
        route_id: String,
        year: i32,
        cb_raw: Gco2e,
    },
    /// Pools need at least two members.
    InsufficientMembers { supplied: usize, required: usize },
    /// The same route was listed twice in one pool request.
    DuplicateMember { route_id: String },
    /// The target schedule has no entry effective for `year`.
    TargetNotConfigured { year: i32 },
    /// No route is flagged as the baseline for `year`.
    BaselineNotSet { year: i32 },
    /// Draw-down exceeds the route's net banked surplus.
    InsufficientBanked {
        route_id: String,
        requested: Gco2e,
        available: Gco2e,
    },
    /// Draw-down amount must be strictly positive.
    InvalidAmount { amount: Gco2e },
    /// Ledger amounts are recorded as non-negative magnitudes.
    NegativeAmount { amount: Gco2e },
    /// The route's energy, balance or net banked sum exceeds `Decimal` range.
    BalanceOverflow { route_id: String, year: i32 },
    /// The pool total exceeds `Decimal` range.
    PoolTotalOverflow { members: usize },
}

impl ComplianceError {
    /// Stable snake_case identifier, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RouteNotFound { .. } => "route_not_found",
            Self::NegativeBalance { .. } => "negative_balance",
            Self::InsufficientMembers { .. } => "insufficient_members",
            Self::DuplicateMember { .. } => "duplicate_member",
            Self::TargetNotConfigured { .. } => "target_not_configured",
            Self::BaselineNotSet { .. } => "baseline_not_set",
            Self::InsufficientBanked { .. } => "insufficient_banked",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::NegativeAmount { .. } => "negative_amount",
            Self::BalanceOverflow { .. } => "balance_overflow",
            Self::PoolTotalOverflow { .. } => "pool_total_overflow",
        }
    }

    /// `true` for "the thing you asked about does not exist" failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RouteNotFound { .. } | Self::BaselineNotSet { .. }
        )
    }
}

impl std::fmt::Display for ComplianceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RouteNotFound { route_id, year } => {
                write!(f, "route not found: route_id={route_id} year={year}")
            }
            Self::NegativeBalance {
                route_id,
                year,
                cb_raw,
            } => write!(
                f,
                "cannot bank non-positive compliance balance: route_id={route_id} year={year} cb_raw={cb_raw}"
            ),
            Self::InsufficientMembers { supplied, required } => write!(
                f,
                "pool requires at least {required} members, got {supplied}"
            ),
            Self::DuplicateMember { route_id } => {
                write!(f, "route listed more than once in pool: {route_id}")
            }
            Self::TargetNotConfigured { year } => {
                write!(f, "no GHG intensity target configured for year {year}")
            }
            Self::BaselineNotSet { year } => write!(f, "no baseline route set for year {year}"),
            Self::InsufficientBanked {
                route_id,
                requested,
                available,
            } => write!(
                f,
                "insufficient banked surplus: route_id={route_id} requested={requested} available={available}"
            ),
            Self::InvalidAmount { amount } => {
                write!(f, "amount must be > 0, got {amount}")
            }
            Self::NegativeAmount { amount } => {
                write!(f, "ledger amount must be >= 0, got {amount}")
            }
            Self::BalanceOverflow { route_id, year } => write!(
                f,
                "compliance balance out of range: route_id={route_id} year={year}"
            ),
            Self::PoolTotalOverflow { members } => {
                write!(f, "pool total out of range over {members} members")
            }
        }
    }
}

impl std::error::Error for ComplianceError {}
