use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{error::ComplianceError, quantity::Gco2e};

/// A vessel voyage record for one reporting year.
///
/// `(route_id, year)` is the identity; at most one route per year carries
/// `is_baseline = true`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub vessel_type: String,
    pub fuel_type: String,
    pub year: i32,
    /// gCO₂e per MJ.
    pub ghg_intensity: Decimal,
    /// Tonnes of fuel burned.
    pub fuel_consumption_t: Decimal,
    pub distance_km: Decimal,
    /// Informational only; not used by the balance formula.
    pub total_emissions_t: Decimal,
    pub is_baseline: bool,
}

impl Route {
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.route_id.clone(), self.year)
    }
}

/// `(route_id, year)` identity of a route.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub route_id: String,
    pub year: i32,
}

impl RouteKey {
    pub fn new(route_id: impl Into<String>, year: i32) -> Self {
        Self {
            route_id: route_id.into(),
            year,
        }
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.route_id, self.year)
    }
}

/// Optional filters for route listings. `None` means "any".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFilter {
    pub vessel_type: Option<String>,
    pub fuel_type: Option<String>,
    pub year: Option<i32>,
}

impl RouteFilter {
    pub fn for_year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn matches(&self, route: &Route) -> bool {
        self.vessel_type
            .as_deref()
            .map_or(true, |v| v == route.vessel_type)
            && self
                .fuel_type
                .as_deref()
                .map_or(true, |f| f == route.fuel_type)
            && self.year.map_or(true, |y| y == route.year)
    }
}

/// Ledger transaction kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Banked,
    Applied,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Banked => "banked",
            EntryKind::Applied => "applied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "banked" => Some(EntryKind::Banked),
            "applied" => Some(EntryKind::Applied),
            _ => None,
        }
    }
}

/// One persisted ledger row. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEntry {
    pub id: i64,
    pub route_id: String,
    pub year: i32,
    pub kind: EntryKind,
    /// Always a non-negative magnitude; `kind` carries the direction.
    pub amount: Gco2e,
    pub created_at: DateTime<Utc>,
}

impl BankEntry {
    /// Signed contribution to the route's net banked balance.
    pub fn signed_amount(&self) -> Gco2e {
        match self.kind {
            EntryKind::Banked => self.amount,
            EntryKind::Applied => -self.amount,
        }
    }
}

/// A ledger row that has been approved but not yet stored.
///
/// The store assigns `id` and `created_at` on append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBankEntry {
    route_id: String,
    year: i32,
    kind: EntryKind,
    amount: Gco2e,
}

impl NewBankEntry {
    pub fn new(
        route_id: impl Into<String>,
        year: i32,
        kind: EntryKind,
        amount: Gco2e,
    ) -> Result<Self, ComplianceError> {
        if amount.is_negative() {
            return Err(ComplianceError::NegativeAmount { amount });
        }
        Ok(Self {
            route_id: route_id.into(),
            year,
            kind,
            amount,
        })
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn amount(&self) -> Gco2e {
        self.amount
    }

    /// Materialize with store-assigned identity.
    pub fn into_entry(self, id: i64, created_at: DateTime<Utc>) -> BankEntry {
        BankEntry {
            id,
            route_id: self.route_id,
            year: self.year,
            kind: self.kind,
            amount: self.amount,
            created_at,
        }
    }
}

/// Computed compliance view of one route. Never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub route_id: String,
    pub year: i32,
    /// gCO₂e/MJ target applied for `year`.
    pub target_intensity: Decimal,
    /// Energy in scope, MJ.
    pub energy_mj: Decimal,
    pub cb_raw: Gco2e,
    /// Σ banked − Σ applied over the route's ledger entries.
    pub net_banked: Gco2e,
    /// `cb_raw + net_banked`.
    pub cb_adjusted: Gco2e,
}
