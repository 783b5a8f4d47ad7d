//! In-memory reference tables consumed by the scenario resolver.

use std::collections::BTreeMap;

use crate::error::PlanError;
use crate::plan::types::ChargingType;
use crate::site::Site;

/// Number of hourly values in a demand profile baseline.
pub const HOURS_PER_DAY: usize = 24;

/// Row of the planning-scenarios table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningScenario {
    /// Human-readable scenario name (e.g. `"Public Places"`).
    pub name: String,
    /// Site category code selected by this scenario (e.g. `"PP"`).
    pub code: String,
    /// Vehicle/charger types deployed under this scenario.
    pub charger_types: Vec<String>,
}

/// Row of the charger catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargerSpec {
    /// Vehicle type key (e.g. `"2W"`, `"4WF"`).
    pub vehicle_type: String,
    /// Charger model compatible with the vehicle type.
    pub compatible_charger: String,
    /// Capex per charger as published, either a number or a `"low-high"` range.
    pub capex_range: String,
    /// Charging power (kW).
    pub power_kw: f64,
    /// Annual maintenance cost per charger (currency).
    pub annual_maintenance: f64,
    /// Session length for opportunity charging (hours).
    pub opportunity_hours: f64,
    /// Session length for destination charging (hours).
    pub destination_hours: f64,
}

impl ChargerSpec {
    /// Session length for the given charging type (hours).
    pub fn charging_hours(&self, charging_type: ChargingType) -> f64 {
        match charging_type {
            ChargingType::Opportunity => self.opportunity_hours,
            ChargingType::Destination => self.destination_hours,
        }
    }

    /// Lower bound of the published capex range.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Configuration` if the range does not start with a number.
    pub fn capex_lower_bound(&self) -> Result<f64, PlanError> {
        let low = self.capex_range.split('-').next().unwrap_or_default().trim();
        low.parse::<f64>().map_err(|_| {
            PlanError::config(format!(
                "charger \"{}\": capex \"{}\" is not a number or range",
                self.vehicle_type, self.capex_range
            ))
        })
    }
}

/// Chargers per bundle for one charger model at one site category.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargerAllocation {
    /// Charger model (matches [`ChargerSpec::compatible_charger`]).
    pub charger: String,
    /// Planning scenario name the count applies to.
    pub site_category: String,
    /// Number of chargers in one bundle.
    pub chargers: u32,
}

/// Hourly traffic or parking profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandProfile {
    pub name: String,
    /// 24 hourly baseline values.
    pub hourly: Vec<f64>,
    /// Share of the baseline per vehicle class (`"2W"`, `"3W"`, `"4W"`, `"Bus"`).
    pub vehicle_fractions: BTreeMap<String, f64>,
    /// Holiday traffic as a fraction of working-day traffic.
    pub holiday_percentage: Option<f64>,
    /// Share of vehicles seeking a fast charge.
    pub fast_charging: Option<f64>,
    /// Share of vehicles seeking a slow charge.
    pub slow_charging: Option<f64>,
}

/// Grid transformer location.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAsset {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// All reference tables for one planning area.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub scenarios: Vec<PlanningScenario>,
    pub chargers: Vec<ChargerSpec>,
    pub allocations: Vec<ChargerAllocation>,
    /// Traffic profiles in file order; the first one is the fallback.
    pub traffic_profiles: Vec<DemandProfile>,
    /// Parking profiles in file order; the first one is the fallback.
    pub parking_profiles: Vec<DemandProfile>,
}

impl ReferenceTables {
    /// Looks up a planning scenario by name, ignoring case and surrounding blanks.
    pub fn scenario(&self, name: &str) -> Option<&PlanningScenario> {
        let wanted = name.trim();
        self.scenarios
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(wanted))
    }

    /// Catalog row for a vehicle type.
    pub fn charger(&self, vehicle_type: &str) -> Option<&ChargerSpec> {
        self.chargers.iter().find(|c| c.vehicle_type == vehicle_type)
    }

    /// Chargers per bundle for a charger model under a planning scenario.
    pub fn chargers_per_bundle(&self, charger: &str, scenario_name: &str) -> Option<u32> {
        let wanted = scenario_name.trim();
        self.allocations
            .iter()
            .find(|a| a.charger == charger && a.site_category.trim().eq_ignore_ascii_case(wanted))
            .map(|a| a.chargers)
    }

    /// Demand profiles driving the given charging type.
    pub fn profiles(&self, charging_type: ChargingType) -> &[DemandProfile] {
        match charging_type {
            ChargingType::Opportunity => &self.traffic_profiles,
            ChargingType::Destination => &self.parking_profiles,
        }
    }
}

/// Everything the planner needs for one planning area.
#[derive(Debug, Clone, Default)]
pub struct PlanningInputs {
    pub tables: ReferenceTables,
    /// Sites in input order; `Site::id` is the index into this vector.
    pub sites: Vec<Site>,
    pub grid: Vec<GridAsset>,
}
