//! Reference evaluator: per-site utilization and cost from timeslot capacity.
//!
//! Utilization is served sessions over installed session capacity; capex adds
//! transformer cabling and, for eligible sites, hoarding and kiosk capex.

use crate::error::EvaluationError;
use crate::eval::Evaluator;
use crate::plan::params::{ChargerParameters, ScenarioParameters, SiteParameters};
use crate::plan::types::{ChargingType, EvaluationResult};
use crate::site::Site;

const DAYS_PER_YEAR: f64 = 365.0;
const WORKING_SHARE: f64 = 5.0 / 7.0;
const HOLIDAY_SHARE: f64 = 2.0 / 7.0;

/// Deterministic timeslot capacity model.
///
/// Each charger serves at most one session per timeslot. Arrivals per slot
/// are the site's vehicle demand scaled by the profile's traffic fraction,
/// the profile's charging probability and the year's EV conversion rate; whatever
/// exceeds the installed chargers goes unserviced. Working days weigh 5/7 and
/// holidays 2/7 of the year, and yearly figures are averaged over the
/// analysis years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityEvaluator {
    /// Multiplier on arrivals; below 1 models drivers giving up on a queue.
    pub backoff_factor: f64,
}

impl Default for CapacityEvaluator {
    fn default() -> Self {
        Self {
            backoff_factor: 1.0,
        }
    }
}

/// Yearly totals for one charger type at one site.
#[derive(Debug, Default, Clone, Copy)]
struct SlotTotals {
    arrivals: f64,
    served: f64,
    /// Tariff margin earned on the served energy.
    tariff_margin: f64,
}

impl CapacityEvaluator {
    /// Creates an evaluator with the given arrival multiplier.
    pub fn new(backoff_factor: f64) -> Self {
        Self { backoff_factor }
    }

    fn charger_totals(
        &self,
        params: &ScenarioParameters,
        charger: &ChargerParameters,
        site: &Site,
        installed: f64,
    ) -> Result<SlotTotals, EvaluationError> {
        let ct = params.charging_type;
        let traffic = charger
            .traffic_for(site.demand_profile(ct))
            .ok_or_else(|| {
                EvaluationError::new(format!(
                    "charger \"{}\" has no traffic profile for site \"{}\"",
                    charger.vehicle_type, site.name
                ))
            })?;
        let demand = site.vehicle_demand(ct);
        let session_kwh = charger.session_kwh();

        let mut totals = SlotTotals::default();
        for &year in &params.years_of_analysis {
            let conversion = params.conversion_rate(year) * self.backoff_factor;
            for (day, share) in [(&traffic.working, WORKING_SHARE), (&traffic.holiday, HOLIDAY_SHARE)] {
                let days = DAYS_PER_YEAR * share;
                for (k, fraction) in day.iter().enumerate() {
                    let probability = traffic.charging_probability.get(k).copied().unwrap_or_default();
                    let tariff = charger.energy_tariff.get(k).copied().unwrap_or_default();
                    let arrivals = demand * fraction * probability * conversion;
                    let served = arrivals.min(installed);
                    totals.arrivals += arrivals * days;
                    totals.served += served * days;
                    totals.tariff_margin += served * session_kwh * tariff * days;
                }
            }
        }

        let years = params.years_of_analysis.len() as f64;
        totals.arrivals /= years;
        totals.served /= years;
        totals.tariff_margin /= years;
        Ok(totals)
    }

    fn evaluate_site(
        &self,
        params: &ScenarioParameters,
        site: &Site,
        site_params: &SiteParameters,
    ) -> Result<EvaluationResult, EvaluationError> {
        let ct: ChargingType = params.charging_type;
        let bundles = f64::from(site.bundles(ct));

        let (mut capacity, mut arrivals, mut served, mut tariff_margin) = (0.0, 0.0, 0.0, 0.0);
        let (mut capex, mut opex) = (0.0, 0.0);
        for charger in &params.chargers {
            let installed = bundles * f64::from(charger.chargers_per_bundle);
            let totals = self.charger_totals(params, charger, site, installed)?;
            capacity += installed * charger.timeslots as f64 * DAYS_PER_YEAR;
            arrivals += totals.arrivals;
            served += totals.served;
            tariff_margin += totals.tariff_margin;
            capex += installed * charger.capex;
            opex += installed * charger.maintenance;
        }

        capex += site_params.cabling_cost * site.transformer.distance_km;
        let mut margin = tariff_margin + site_params.baseline_margin;
        if site.hoarding_kiosk {
            capex += params.hoarding_capex + params.kiosk_capex;
            margin += site.hoarding_margin + site_params.kiosk_margin;
        }

        let utilization = if capacity > 0.0 { served / capacity } else { 0.0 };
        let unserviced = if arrivals > 0.0 {
            (arrivals - served) / arrivals
        } else {
            0.0
        };

        Ok(EvaluationResult {
            utilization: utilization.clamp(0.0, 1.0),
            unserviced: unserviced.clamp(0.0, 1.0),
            capex,
            opex,
            margin,
            max_vehicles: capacity,
            estimated_vehicles: served,
        })
    }
}

impl Evaluator for CapacityEvaluator {
    fn evaluate(
        &self,
        params: &ScenarioParameters,
        sites: &[Site],
    ) -> Result<Vec<EvaluationResult>, EvaluationError> {
        if params.years_of_analysis.is_empty() {
            return Err(EvaluationError::new("no analysis years configured"));
        }
        sites
            .iter()
            .map(|site| {
                let site_params = params.site(site.id).ok_or_else(|| {
                    EvaluationError::new(format!(
                        "site \"{}\" has no parameters in scenario {}",
                        site.name, params.scenario_code
                    ))
                })?;
                self.evaluate_site(params, site, site_params)
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "capacity"
    }
}
