//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use evci_planner::data::{
    ChargerAllocation, ChargerSpec, DemandProfile, GridAsset, PlanningInputs, PlanningScenario,
    ReferenceTables,
};
use evci_planner::error::EvaluationError;
use evci_planner::eval::Evaluator;
use evci_planner::plan::{ChargingType, EvaluationResult, ScenarioParameters};
use evci_planner::site::{Site, TransformerLink};

/// Utilization of sites that clear the default 0.04 threshold.
pub const CONFIRMED_UTILIZATION: f64 = 0.30;
/// Utilization of clustering candidates.
pub const CANDIDATE_UTILIZATION: f64 = 0.02;

/// Flat hourly profile with the given vehicle-class fractions.
pub fn flat_profile(name: &str, classes: &[(&str, f64)]) -> DemandProfile {
    DemandProfile {
        name: name.to_string(),
        hourly: vec![0.05; 24],
        vehicle_fractions: classes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        holiday_percentage: None,
        fast_charging: None,
        slow_charging: None,
    }
}

/// Reference tables with a "Public Places" (PP) and a "Bus Depots" (BD) scenario.
pub fn reference_tables() -> ReferenceTables {
    ReferenceTables {
        scenarios: vec![
            PlanningScenario {
                name: "Public Places".to_string(),
                code: "PP".to_string(),
                charger_types: vec!["2W".to_string(), "4WS".to_string()],
            },
            PlanningScenario {
                name: "Bus Depots".to_string(),
                code: "BD".to_string(),
                charger_types: vec!["Bus".to_string()],
            },
        ],
        chargers: vec![
            ChargerSpec {
                vehicle_type: "2W".to_string(),
                compatible_charger: "LEV AC".to_string(),
                capex_range: "2500-3500".to_string(),
                power_kw: 3.3,
                annual_maintenance: 500.0,
                opportunity_hours: 1.0,
                destination_hours: 3.0,
            },
            ChargerSpec {
                vehicle_type: "4WS".to_string(),
                compatible_charger: "CCS2".to_string(),
                capex_range: "250000-300000".to_string(),
                power_kw: 30.0,
                annual_maintenance: 25_000.0,
                opportunity_hours: 0.5,
                destination_hours: 2.0,
            },
            ChargerSpec {
                vehicle_type: "Bus".to_string(),
                compatible_charger: "CCS2 240".to_string(),
                capex_range: "2500000".to_string(),
                power_kw: 240.0,
                annual_maintenance: 150_000.0,
                opportunity_hours: 1.0,
                destination_hours: 4.0,
            },
        ],
        allocations: vec![
            ChargerAllocation {
                charger: "LEV AC".to_string(),
                site_category: "Public Places".to_string(),
                chargers: 4,
            },
            ChargerAllocation {
                charger: "CCS2".to_string(),
                site_category: "Public Places".to_string(),
                chargers: 2,
            },
            ChargerAllocation {
                charger: "CCS2 240".to_string(),
                site_category: "Bus Depots".to_string(),
                chargers: 2,
            },
        ],
        traffic_profiles: vec![flat_profile(
            "urban",
            &[("2W", 0.6), ("3W", 0.1), ("4W", 0.25), ("Bus", 0.05)],
        )],
        parking_profiles: vec![flat_profile(
            "mall",
            &[("2W", 0.5), ("3W", 0.0), ("4W", 0.45), ("Bus", 0.05)],
        )],
    }
}

/// Site in category `category` at `(lat, lon)`.
pub fn site(id: usize, category: &str, lat: f64, lon: f64) -> Site {
    Site {
        id,
        name: format!("Site {id}"),
        latitude: lat,
        longitude: lon,
        category: category.to_string(),
        opportunity_bundles: 1,
        destination_bundles: 1,
        peak_traffic: 300.0,
        parking_lot_size: 80.0,
        recommendation_year: 1,
        hoarding_kiosk: id % 2 == 0,
        hoarding_margin: 12_000.0,
        kiosk_margin: 6_000.0,
        traffic_profile: None,
        parking_profile: None,
        transformer: TransformerLink::default(),
    }
}

/// Ten "PP" sites: 0, 3 and 8 are busy; 1, 2, 5, 7 sit within a few hundred
/// metres of each other near (15.50, 73.80), as do 4, 6, 9 near (15.60, 73.90).
pub fn ten_public_places() -> Vec<Site> {
    vec![
        site(0, "PP", 15.40, 73.70),
        site(1, "PP", 15.500, 73.800),
        site(2, "PP", 15.502, 73.801),
        site(3, "PP", 15.45, 73.95),
        site(4, "PP", 15.600, 73.900),
        site(5, "PP", 15.501, 73.803),
        site(6, "PP", 15.602, 73.902),
        site(7, "PP", 15.503, 73.802),
        site(8, "PP", 15.70, 73.75),
        site(9, "PP", 15.601, 73.899),
    ]
}

/// Ids of the busy sites in [`ten_public_places`].
pub const BUSY: [usize; 3] = [0, 3, 8];

/// Two transformers, one per candidate cluster.
pub fn grid() -> Vec<GridAsset> {
    vec![
        GridAsset {
            name: "TR-North".to_string(),
            latitude: 15.61,
            longitude: 73.90,
        },
        GridAsset {
            name: "TR-South".to_string(),
            latitude: 15.49,
            longitude: 73.80,
        },
    ]
}

pub fn planning_inputs(sites: Vec<Site>, grid: Vec<GridAsset>) -> PlanningInputs {
    PlanningInputs {
        tables: reference_tables(),
        sites,
        grid,
    }
}

/// Evaluator returning a fixed utilization per site id and recording every call.
pub struct ScriptedEvaluator {
    utilization: BTreeMap<usize, f64>,
    calls: Mutex<Vec<(ChargingType, Vec<usize>)>>,
}

impl ScriptedEvaluator {
    pub fn new(utilization: BTreeMap<usize, f64>) -> Self {
        Self {
            utilization,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Busy ids get [`CONFIRMED_UTILIZATION`], every other id [`CANDIDATE_UTILIZATION`].
    pub fn with_busy(ids: usize, busy: &[usize]) -> Self {
        Self::new(
            (0..ids)
                .map(|id| {
                    let u = if busy.contains(&id) {
                        CONFIRMED_UTILIZATION
                    } else {
                        CANDIDATE_UTILIZATION
                    };
                    (id, u)
                })
                .collect(),
        )
    }

    /// Site ids of every call for one charging type, in call order.
    pub fn calls_for(&self, charging_type: ChargingType) -> Vec<Vec<usize>> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter(|(ct, _)| *ct == charging_type)
                    .map(|(_, ids)| ids.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(
        &self,
        params: &ScenarioParameters,
        sites: &[Site],
    ) -> Result<Vec<EvaluationResult>, EvaluationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((params.charging_type, sites.iter().map(|s| s.id).collect()));
        }
        sites
            .iter()
            .map(|s| {
                let utilization = self
                    .utilization
                    .get(&s.id)
                    .copied()
                    .ok_or_else(|| EvaluationError::new(format!("no script for site {}", s.id)))?;
                Ok(EvaluationResult {
                    utilization,
                    unserviced: 1.0 - utilization,
                    capex: 1_000_000.0,
                    opex: 50_000.0,
                    margin: 200_000.0 * utilization,
                    max_vehicles: 1000.0,
                    estimated_vehicles: 1000.0 * utilization,
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Writes a complete planning area for the fixtures above into `dir`.
pub fn write_planning_area(dir: &Path, sites: &[Site], grid: &[GridAsset]) -> std::io::Result<()> {
    fs::write(
        dir.join("planning_scenarios.csv"),
        "site_category,scenario_code,charger_types\n\
         Public Places,PP,\"2W,4WS\"\n\
         Bus Depots,BD,Bus\n",
    )?;
    fs::write(
        dir.join("charger_details.csv"),
        "vehicle_type,compatible_charger,capex_per_charger,charging_power_kw,annual_maintenance,opportunity_hours,destination_hours\n\
         2W,LEV AC,2500-3500,3.3,500,1,3\n\
         4WS,CCS2,250000-300000,30,25000,0.5,2\n\
         Bus,CCS2 240,2500000,240,150000,1,4\n",
    )?;
    fs::write(
        dir.join("chargers_site_categories.csv"),
        "charger,site_category,chargers\n\
         LEV AC,Public Places,4\n\
         CCS2,Public Places,2\n\
         CCS2 240,Bus Depots,2\n",
    )?;

    let profile_csv = |name: &str, classes: &[(&str, f64)]| {
        let mut out = String::from("profile,field,value\n");
        for h in 0..24 {
            out.push_str(&format!("{name},{h},0.05\n"));
        }
        for (class, fraction) in classes {
            out.push_str(&format!("{name},{class},{fraction}\n"));
        }
        out
    };
    fs::write(
        dir.join("traffic_profiles.csv"),
        profile_csv("urban", &[("2W", 0.6), ("3W", 0.1), ("4W", 0.25), ("Bus", 0.05)]),
    )?;
    fs::write(
        dir.join("parking_profiles.csv"),
        profile_csv("mall", &[("2W", 0.5), ("3W", 0.0), ("4W", 0.45), ("Bus", 0.05)]),
    )?;

    let mut sites_csv = String::from(
        "name,latitude,longitude,category,opportunity_bundles,destination_bundles,peak_traffic,parking_lot_size,recommendation_year,hoarding_kiosk,hoarding_margin,kiosk_margin,traffic_profile,parking_profile\n",
    );
    for s in sites {
        sites_csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            s.name,
            s.latitude,
            s.longitude,
            s.category,
            s.opportunity_bundles,
            s.destination_bundles,
            s.peak_traffic,
            s.parking_lot_size,
            s.recommendation_year,
            u8::from(s.hoarding_kiosk),
            s.hoarding_margin,
            s.kiosk_margin,
            s.traffic_profile.as_deref().unwrap_or(""),
            s.parking_profile.as_deref().unwrap_or(""),
        ));
    }
    fs::write(dir.join("sites.csv"), sites_csv)?;

    let mut grid_csv = String::from("name,latitude,longitude\n");
    for g in grid {
        grid_csv.push_str(&format!("{},{},{}\n", g.name, g.latitude, g.longitude));
    }
    fs::write(dir.join("grid.csv"), grid_csv)?;
    Ok(())
}
