//! Shared fleet fixture for the scenario tests.
//!
//! 2025 balances at target 89.3368 gCO₂e/MJ, LCV 41 000 MJ/t:
//!
//! | route | ghg  | fuel t | cb_raw        |
//! |-------|------|--------|---------------|
//! | R001  | 91.0 | 5000   | −340 956 000  |
//! | R002  | 88.0 | 4800   | +263 082 240  |
//! | R003  | 93.5 | 5100   | −870 525 120  |
//! | R004  | 89.2 | 4900   | +27 483 120   |
//! | R005  | 90.5 | 4950   | −236 071 440  |

#![allow(dead_code)]

use std::sync::Arc;

use feu_compliance::{CompliancePolicy, ComplianceService, MemStore, Route};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn route(
    id: &str,
    vessel: &str,
    fuel: &str,
    year: i32,
    ghg: Decimal,
    fuel_t: Decimal,
    baseline: bool,
) -> Route {
    Route {
        route_id: id.to_string(),
        vessel_type: vessel.to_string(),
        fuel_type: fuel.to_string(),
        year,
        ghg_intensity: ghg,
        fuel_consumption_t: fuel_t,
        distance_km: dec!(12000),
        total_emissions_t: dec!(4500),
        is_baseline: baseline,
    }
}

pub fn fleet_2025() -> Vec<Route> {
    vec![
        route("R001", "Container", "HFO", 2025, dec!(91.0), dec!(5000), true),
        route("R002", "BulkCarrier", "LNG", 2025, dec!(88.0), dec!(4800), false),
        route("R003", "Tanker", "MGO", 2025, dec!(93.5), dec!(5100), false),
        route("R004", "RoRo", "HFO", 2025, dec!(89.2), dec!(4900), false),
        route("R005", "Container", "LNG", 2025, dec!(90.5), dec!(4950), false),
    ]
}

pub fn service_with(routes: Vec<Route>, policy: CompliancePolicy) -> (Arc<MemStore>, ComplianceService) {
    let store = Arc::new(MemStore::with_routes(routes));
    let svc = ComplianceService::new(store.clone(), policy);
    (store, svc)
}

pub fn fleet_service() -> (Arc<MemStore>, ComplianceService) {
    service_with(fleet_2025(), CompliancePolicy::fueleu_default())
}
