//! Scenario parameter resolution.
//!
//! Turns the reference tables and run configuration into one immutable
//! [`ScenarioParameters`] per charging type. Everything the evaluator needs is
//! resolved here, so the consolidation engine never touches raw tables.

use std::collections::BTreeMap;

use tracing::info;

use crate::config::{MarginPropagation, PlannerConfig};
use crate::data::tables::{DemandProfile, HOURS_PER_DAY, ReferenceTables};
use crate::error::PlanError;
use crate::plan::types::ChargingType;
use crate::site::Site;

const DAYS_PER_YEAR: f64 = 365.0;

/// Hourly traffic fractions for one demand profile at one charger's timeslot resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTraffic {
    /// Profile name from the profile table.
    pub profile: String,
    /// Working-day traffic fraction per timeslot.
    pub working: Vec<f64>,
    /// Holiday traffic fraction per timeslot.
    pub holiday: Vec<f64>,
    /// Probability that a passing vehicle charges, per timeslot.
    ///
    /// The profile's own `fast_charging`/`slow_charging` rows override the
    /// run-level shares.
    pub charging_probability: Vec<f64>,
}

/// Resolved parameters for one charger type deployed under the scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargerParameters {
    /// Vehicle type key (e.g. `"4WS"`).
    pub vehicle_type: String,
    /// Compatible charger model.
    pub charger: String,
    /// Capex per charger (currency).
    pub capex: f64,
    /// Charging power (kW).
    pub power_kw: f64,
    /// Annual maintenance per charger (currency).
    pub maintenance: f64,
    /// Session length (hours).
    pub charging_hours: f64,
    /// Sessions per charger per day, `24 / charging_hours`.
    pub timeslots: usize,
    /// Chargers in one bundle at the scenario's site category.
    pub chargers_per_bundle: u32,
    /// Energy tariff margin per kWh, per timeslot.
    pub energy_tariff: Vec<f64>,
    /// Traffic fractions per profile, in profile-table order.
    pub traffic: Vec<ProfileTraffic>,
}

impl ChargerParameters {
    /// Traffic fractions for a named profile, falling back to the first profile.
    pub fn traffic_for(&self, profile: Option<&str>) -> Option<&ProfileTraffic> {
        profile
            .and_then(|name| self.traffic.iter().find(|t| t.profile == name))
            .or_else(|| self.traffic.first())
    }

    /// Energy delivered by one charging session (kWh).
    pub fn session_kwh(&self) -> f64 {
        self.power_kw * self.charging_hours
    }
}

/// Per-site parameters, keyed by [`Site::id`].
#[derive(Debug, Clone, PartialEq)]
pub struct SiteParameters {
    pub site_id: usize,
    /// Cabling cost per km of transformer distance.
    pub cabling_cost: f64,
    /// Area available for chargers (sqm).
    pub available_area: f64,
    /// Annual energy demand (kWh).
    pub annual_demand: f64,
    /// Baseline margin per year (currency).
    pub baseline_margin: f64,
    /// Kiosk margin applied to the site (currency per year).
    pub kiosk_margin: f64,
}

/// Immutable parameter bundle for one charging type.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParameters {
    pub charging_type: ChargingType,
    /// Planning scenario name as configured.
    pub scenario_name: String,
    /// Site category code the scenario selects.
    pub scenario_code: String,
    /// One entry per charger type of the scenario, in table order.
    pub chargers: Vec<ChargerParameters>,
    /// One entry per scenario site, in site order.
    pub sites: Vec<SiteParameters>,
    /// EV conversion rate by analysis year.
    pub conversion: BTreeMap<u32, f64>,
    pub years_of_analysis: Vec<u32>,
    /// Hoarding capex per eligible site.
    pub hoarding_capex: f64,
    /// Kiosk capex per eligible site.
    pub kiosk_capex: f64,
}

impl ScenarioParameters {
    /// Resolves parameters for `charging_type` from the reference tables.
    ///
    /// `sites` is the full linked site table; only sites whose category
    /// matches the scenario code receive per-site parameters.
    ///
    /// # Errors
    ///
    /// - `PlanError::Configuration` for an unknown scenario name, a missing
    ///   catalog or allocation row, an unparseable capex, a missing vehicle
    ///   fraction, or a timeslot count that does not divide the day evenly.
    /// - `PlanError::Domain` for a charger with a non-positive session length.
    pub fn resolve(
        tables: &ReferenceTables,
        sites: &[Site],
        charging_type: ChargingType,
        config: &PlannerConfig,
    ) -> Result<Self, PlanError> {
        let scenario_name = config.run.planning_scenario.trim();
        let scenario = tables.scenario(scenario_name).ok_or_else(|| {
            PlanError::config(format!("unknown planning scenario \"{scenario_name}\""))
        })?;

        let profiles = tables.profiles(charging_type);
        if profiles.is_empty() {
            return Err(PlanError::config(format!("no demand profiles for {charging_type}")));
        }
        let energy_margin = config.margin.energy_tariff_margin;

        let mut chargers = Vec::with_capacity(scenario.charger_types.len());
        for vehicle_type in &scenario.charger_types {
            let catalog = tables.charger(vehicle_type).ok_or_else(|| {
                PlanError::config(format!("charger type \"{vehicle_type}\" is not in the catalog"))
            })?;
            let chargers_per_bundle = tables
                .chargers_per_bundle(&catalog.compatible_charger, &scenario.name)
                .ok_or_else(|| {
                    PlanError::config(format!(
                        "no charger count for \"{}\" at \"{}\"",
                        catalog.compatible_charger, scenario.name
                    ))
                })?;
            let capex = match config.costs.capex.get(vehicle_type) {
                Some(c) => *c,
                None => catalog.capex_lower_bound()?,
            };
            let charging_hours = catalog.charging_hours(charging_type);
            let timeslots = timeslots_for(vehicle_type, charging_hours)?;
            let class = vehicle_class(vehicle_type);

            let traffic = profiles
                .iter()
                .map(|p| profile_traffic(p, &class, timeslots, config))
                .collect::<Result<Vec<_>, _>>()?;

            chargers.push(ChargerParameters {
                vehicle_type: vehicle_type.clone(),
                charger: catalog.compatible_charger.clone(),
                capex,
                power_kw: catalog.power_kw,
                maintenance: catalog.annual_maintenance,
                charging_hours,
                timeslots,
                chargers_per_bundle,
                energy_tariff: vec![energy_margin; timeslots],
                traffic,
            });
        }

        let in_scenario: Vec<&Site> = sites
            .iter()
            .filter(|s| s.category == scenario.code)
            .collect();
        let baseline_margin = config.margin.margin_percentage
            * config.margin.margin_rate_per_kwh
            * HOURS_PER_DAY as f64
            * DAYS_PER_YEAR;
        let first_kiosk = in_scenario.first().map(|s| s.kiosk_margin).unwrap_or_default();
        let site_params = in_scenario
            .iter()
            .map(|s| SiteParameters {
                site_id: s.id,
                cabling_cost: config.costs.cabling_cost,
                available_area: config.demand.available_area,
                annual_demand: config.demand.annual_demand,
                baseline_margin,
                kiosk_margin: match config.margin.propagation {
                    MarginPropagation::PerSite => s.kiosk_margin,
                    MarginPropagation::FirstSite => first_kiosk,
                },
            })
            .collect();

        let d = &config.demand;
        let conversion = [(1, d.year1_conversion), (2, d.year2_conversion), (3, d.year3_conversion)]
            .into_iter()
            .collect();

        let params = Self {
            charging_type,
            scenario_name: scenario.name.clone(),
            scenario_code: scenario.code.clone(),
            chargers,
            sites: site_params,
            conversion,
            years_of_analysis: d.years_of_analysis.clone(),
            hoarding_capex: config.costs.hoarding_cost,
            kiosk_capex: config.costs.kiosk_cost,
        };
        info!(
            charging_type = %charging_type,
            scenario = %params.scenario_code,
            charger_types = params.chargers.len(),
            sites = params.sites.len(),
            "scenario parameters resolved"
        );
        Ok(params)
    }

    /// Per-site parameters for a site id.
    pub fn site(&self, site_id: usize) -> Option<&SiteParameters> {
        self.sites.iter().find(|p| p.site_id == site_id)
    }

    /// EV conversion rate for an analysis year.
    ///
    /// Years past the last configured one keep the highest configured rate.
    pub fn conversion_rate(&self, year: u32) -> f64 {
        self.conversion
            .get(&year)
            .copied()
            .unwrap_or_else(|| self.conversion.values().copied().fold(0.0, f64::max))
    }
}

/// Vehicle class a charger type draws its traffic share from.
///
/// `3W*` and `4W*` variants collapse onto `3W` and `4W`.
pub fn vehicle_class(vehicle_type: &str) -> String {
    if vehicle_type.starts_with("3W") {
        "3W".to_string()
    } else if vehicle_type.starts_with("4W") {
        "4W".to_string()
    } else {
        vehicle_type.to_string()
    }
}

/// Resamples a 24-hour profile to `timeslots` values.
///
/// More slots repeat each hour; fewer slots keep every n-th hour.
///
/// # Errors
///
/// Returns `PlanError::Configuration` when the slot count and the profile
/// length do not divide evenly.
pub fn resample_profile(values: &[f64], timeslots: usize) -> Result<Vec<f64>, PlanError> {
    let n = values.len();
    let uneven = || {
        PlanError::config(format!(
            "cannot resample a {n}-value profile to {timeslots} timeslots"
        ))
    };
    if n == 0 || timeslots == 0 {
        return Err(uneven());
    }
    if timeslots >= n {
        if timeslots % n != 0 {
            return Err(uneven());
        }
        let repeat = timeslots / n;
        Ok(values
            .iter()
            .flat_map(|v| std::iter::repeat_n(*v, repeat))
            .collect())
    } else {
        if n % timeslots != 0 {
            return Err(uneven());
        }
        Ok(values.iter().step_by(n / timeslots).copied().collect())
    }
}

fn timeslots_for(vehicle_type: &str, hours: f64) -> Result<usize, PlanError> {
    if hours.is_nan() || hours <= 0.0 {
        return Err(PlanError::domain(format!(
            "charger \"{vehicle_type}\" has charging duration {hours} h"
        )));
    }
    let slots = HOURS_PER_DAY as f64 / hours;
    if (slots - slots.round()).abs() > 1e-9 || slots.round() < 1.0 {
        return Err(PlanError::config(format!(
            "charger \"{vehicle_type}\": {hours} h sessions do not divide the day into whole timeslots"
        )));
    }
    Ok(slots.round() as usize)
}

fn profile_traffic(
    profile: &DemandProfile,
    class: &str,
    timeslots: usize,
    config: &PlannerConfig,
) -> Result<ProfileTraffic, PlanError> {
    let fraction = profile.vehicle_fractions.get(class).copied().ok_or_else(|| {
        PlanError::config(format!(
            "profile \"{}\" has no \"{class}\" vehicle fraction",
            profile.name
        ))
    })?;
    let holiday_pct = profile
        .holiday_percentage
        .unwrap_or(config.demand.holiday_percentage);
    let hourly: Vec<f64> = profile.hourly.iter().map(|v| round2(v * fraction)).collect();
    let working = resample_profile(&hourly, timeslots)?;
    let holiday = working.iter().map(|v| round2(v * holiday_pct)).collect();
    let fast = profile.fast_charging.unwrap_or(config.demand.fast_charging);
    let slow = profile.slow_charging.unwrap_or(config.demand.slow_charging);
    Ok(ProfileTraffic {
        profile: profile.name.clone(),
        working,
        holiday,
        charging_probability: vec![fast + slow; timeslots],
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
