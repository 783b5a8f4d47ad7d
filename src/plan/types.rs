//! Core pipeline types: charging types, stages, evaluation rows and reports.

use std::fmt;

use serde::Serialize;

/// Charging regime planned independently for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChargingType {
    /// Short top-up sessions driven by passing traffic.
    #[serde(rename = "opportunity_charging")]
    Opportunity,
    /// Long-dwell sessions driven by parking occupancy.
    #[serde(rename = "destination_charging")]
    Destination,
}

impl ChargingType {
    /// Both charging types in planning order.
    pub const ALL: [ChargingType; 2] = [ChargingType::Opportunity, ChargingType::Destination];

    /// Stable label used in file names and logs.
    pub fn label(self) -> &'static str {
        match self {
            ChargingType::Opportunity => "opportunity_charging",
            ChargingType::Destination => "destination_charging",
        }
    }
}

impl fmt::Display for ChargingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline stage that produced an evaluation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// First evaluation of every site in the scenario category.
    Initial,
    /// Re-evaluation after cluster consolidation.
    Cluster,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Initial => "initial",
            Stage::Cluster => "cluster",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Evaluator output for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// Fraction of charging capacity used (0.0 to 1.0).
    pub utilization: f64,
    /// Fraction of demand the site cannot serve (0.0 to 1.0).
    pub unserviced: f64,
    /// Up-front capital expenditure (currency).
    pub capex: f64,
    /// Operating expenditure (currency per year).
    pub opex: f64,
    /// Margin earned (currency per year).
    pub margin: f64,
    /// Vehicles the site could serve at full utilization (per year).
    pub max_vehicles: f64,
    /// Vehicles the site is estimated to serve (per year).
    pub estimated_vehicles: f64,
}

impl EvaluationResult {
    /// Returns `true` when both fractions are finite and inside `[0, 1]`.
    pub fn fractions_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.utilization) && (0.0..=1.0).contains(&self.unserviced)
    }
}

/// Aggregate statistics for one stage of one charging type.
///
/// Currency totals are raw; crore scaling happens in the export layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub charging_type: ChargingType,
    pub stage: Stage,
    /// Sites evaluated in this stage.
    pub site_count: usize,
    /// Sites in the input table, before category filtering.
    pub total_sites: usize,
    /// Sum of site capex (currency).
    pub capex: f64,
    /// Sum of site opex (currency per year).
    pub opex: f64,
    /// Sum of site margin (currency per year).
    pub margin: f64,
    /// Utilization threshold the confirmed count was taken at.
    pub cluster_threshold: f64,
    /// Sites with utilization strictly above `cluster_threshold`.
    pub confirmed: usize,
}

impl StageReport {
    /// Site count rendered as `"n/total"`.
    pub fn site_count_label(&self) -> String {
        format!("{}/{}", self.site_count, self.total_sites)
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | sites={} capex={:.0} opex={:.0} margin={:.0} confirmed(>{:.3})={}",
            self.charging_type,
            self.stage,
            self.site_count_label(),
            self.capex,
            self.opex,
            self.margin,
            self.cluster_threshold,
            self.confirmed,
        )
    }
}
