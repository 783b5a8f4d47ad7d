//! TOML-based run configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::context::CancelToken;
use crate::plan::engine::PlannerOptions;

/// Top-level run configuration parsed from TOML.
///
/// All fields have defaults matching the public-places planning run. Load
/// from TOML with [`PlannerConfig::from_toml_file`] or use
/// [`PlannerConfig::public_places`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
    /// Scenario selection and consolidation switches.
    #[serde(default)]
    pub run: RunConfig,
    /// Demand conversion and analysis horizon.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Capex overrides and fixed site costs.
    #[serde(default)]
    pub costs: CostConfig,
    /// Margin model parameters.
    #[serde(default)]
    pub margin: MarginConfig,
    /// Reference evaluator tuning.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

/// Scenario selection and consolidation switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Planning scenario name as listed in the scenarios table.
    pub planning_scenario: String,
    /// Whether low-utilization sites are consolidated by clustering.
    pub cluster: bool,
    /// Utilization fraction at or below which a site becomes a clustering candidate.
    pub cluster_th: f64,
    /// Keep the clustering dendrogram for export.
    pub keep_dendrogram: bool,
    /// Plan both charging types concurrently.
    pub parallel: bool,
    /// Abort the run after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            planning_scenario: "Public Places".to_string(),
            cluster: true,
            cluster_th: 0.04,
            keep_dendrogram: true,
            parallel: false,
            timeout_secs: None,
        }
    }
}

/// Demand conversion and analysis horizon.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Analysis years (1-based).
    pub years_of_analysis: Vec<u32>,
    /// Share of vehicles converted to EV in year 1 (0.0-1.0).
    pub year1_conversion: f64,
    /// Share of vehicles converted to EV in year 2 (0.0-1.0).
    pub year2_conversion: f64,
    /// Share of vehicles converted to EV in year 3 (0.0-1.0).
    pub year3_conversion: f64,
    /// Holiday traffic as a fraction of working-day traffic (0.0-1.0).
    pub holiday_percentage: f64,
    /// Share of vehicles seeking a fast charge (0.0-1.0).
    pub fast_charging: f64,
    /// Share of vehicles seeking a slow charge (0.0-1.0).
    pub slow_charging: f64,
    /// Area available per site (sqm).
    pub available_area: f64,
    /// Annual demand per site (kWh).
    pub annual_demand: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            years_of_analysis: vec![1, 2, 3],
            year1_conversion: 0.02,
            year2_conversion: 0.05,
            year3_conversion: 0.10,
            holiday_percentage: 0.3,
            fast_charging: 0.3,
            slow_charging: 0.15,
            available_area: 50.0,
            annual_demand: 1500.0,
        }
    }
}

/// Capex overrides and fixed site costs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    /// Per-charger capex keyed by vehicle type; replaces the catalog value.
    pub capex: BTreeMap<String, f64>,
    /// Cabling cost per km of transformer distance.
    pub cabling_cost: f64,
    /// Hoarding capex per eligible site.
    pub hoarding_cost: f64,
    /// Kiosk capex per eligible site.
    pub kiosk_cost: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        let capex = [
            ("2W", 2_500.0),
            ("3WS", 112_000.0),
            ("4WS", 250_000.0),
            ("4WF", 1_500_000.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            capex,
            cabling_cost: 500_000.0,
            hoarding_cost: 900_000.0,
            kiosk_cost: 180_000.0,
        }
    }
}

/// How kiosk margins are assigned to sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginPropagation {
    /// Every site uses its own kiosk margin.
    #[default]
    PerSite,
    /// Every site uses the first scenario site's kiosk margin.
    FirstSite,
}

/// Margin model parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarginConfig {
    /// Share of the energy rate retained as baseline margin (0.0-1.0).
    pub margin_percentage: f64,
    /// Energy rate the baseline margin is taken from (per kWh).
    pub margin_rate_per_kwh: f64,
    /// Margin on the energy tariff (per kWh).
    pub energy_tariff_margin: f64,
    /// Kiosk margin assignment.
    pub propagation: MarginPropagation,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            margin_percentage: 0.25,
            margin_rate_per_kwh: 3.5,
            energy_tariff_margin: 5.5,
            propagation: MarginPropagation::PerSite,
        }
    }
}

/// Reference evaluator tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Scales arrivals down (< 1) or up (> 1) to model queue back-off.
    pub backoff_factor: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            backoff_factor: 1.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"run.cluster_th"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl PlannerConfig {
    /// Returns the public-places planning run.
    pub fn public_places() -> Self {
        Self::default()
    }

    /// Returns the fleet-hub preset: long dwell, higher conversion, no consolidation.
    pub fn fleet_hubs() -> Self {
        Self {
            run: RunConfig {
                planning_scenario: "Fleet Hubs".to_string(),
                cluster: false,
                ..RunConfig::default()
            },
            demand: DemandConfig {
                year1_conversion: 0.10,
                year2_conversion: 0.20,
                year3_conversion: 0.30,
                ..DemandConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the bus-depot preset.
    pub fn bus_depots() -> Self {
        let mut costs = CostConfig::default();
        costs.capex.insert("Bus".to_string(), 2_500_000.0);
        Self {
            run: RunConfig {
                planning_scenario: "Bus Depots".to_string(),
                cluster_th: 0.10,
                ..RunConfig::default()
            },
            costs,
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["public_places", "fleet_hubs", "bus_depots"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "public_places" => Ok(Self::public_places()),
            "fleet_hubs" => Ok(Self::fleet_hubs()),
            "bus_depots" => Ok(Self::bus_depots()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Engine options derived from the `[run]` section.
    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            cluster: self.run.cluster,
            cluster_threshold: self.run.cluster_th,
            keep_dendrogram: self.run.keep_dendrogram,
            parallel: self.run.parallel,
        }
    }

    /// Cancellation token honouring `run.timeout_secs`.
    pub fn cancel_token(&self) -> CancelToken {
        match self.run.timeout_secs {
            Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
            None => CancelToken::new(),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut fraction = |field: &str, value: f64| {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must be in [0.0, 1.0]".into(),
                });
            }
        };

        let r = &self.run;
        fraction("run.cluster_th", r.cluster_th);

        let d = &self.demand;
        fraction("demand.year1_conversion", d.year1_conversion);
        fraction("demand.year2_conversion", d.year2_conversion);
        fraction("demand.year3_conversion", d.year3_conversion);
        fraction("demand.holiday_percentage", d.holiday_percentage);
        fraction("demand.fast_charging", d.fast_charging);
        fraction("demand.slow_charging", d.slow_charging);
        fraction("margin.margin_percentage", self.margin.margin_percentage);

        if r.planning_scenario.trim().is_empty() {
            errors.push(ConfigError {
                field: "run.planning_scenario".into(),
                message: "must not be empty".into(),
            });
        }
        if r.timeout_secs == Some(0) {
            errors.push(ConfigError {
                field: "run.timeout_secs".into(),
                message: "must be > 0 when set".into(),
            });
        }
        if d.years_of_analysis.is_empty() {
            errors.push(ConfigError {
                field: "demand.years_of_analysis".into(),
                message: "must list at least one year".into(),
            });
        }
        if d.years_of_analysis.contains(&0) {
            errors.push(ConfigError {
                field: "demand.years_of_analysis".into(),
                message: "years are 1-based".into(),
            });
        }
        if d.fast_charging + d.slow_charging > 1.0 {
            errors.push(ConfigError {
                field: "demand.fast_charging".into(),
                message: "fast_charging + slow_charging must be <= 1.0".into(),
            });
        }

        let c = &self.costs;
        for (vehicle, capex) in &c.capex {
            if *capex < 0.0 {
                errors.push(ConfigError {
                    field: format!("costs.capex.{vehicle}"),
                    message: "must be >= 0".into(),
                });
            }
        }
        for (field, value) in [
            ("costs.cabling_cost", c.cabling_cost),
            ("costs.hoarding_cost", c.hoarding_cost),
            ("costs.kiosk_cost", c.kiosk_cost),
            ("margin.margin_rate_per_kwh", self.margin.margin_rate_per_kwh),
            ("margin.energy_tariff_margin", self.margin.energy_tariff_margin),
        ] {
            if value < 0.0 {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must be >= 0".into(),
                });
            }
        }

        if self.evaluator.backoff_factor <= 0.0 {
            errors.push(ConfigError {
                field: "evaluator.backoff_factor".into(),
                message: "must be > 0".into(),
            });
        }

        errors
    }
}
