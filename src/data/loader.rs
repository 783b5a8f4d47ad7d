//! CSV loading for a planning area directory.
//!
//! A planning area is a directory holding one CSV file per table:
//!
//! | File | Columns |
//! |------|---------|
//! | `planning_scenarios.csv` | `site_category,scenario_code,charger_types` |
//! | `charger_details.csv` | `vehicle_type,compatible_charger,capex_per_charger,charging_power_kw,annual_maintenance,opportunity_hours,destination_hours` |
//! | `chargers_site_categories.csv` | `charger,site_category,chargers` |
//! | `traffic_profiles.csv`, `parking_profiles.csv` | `profile,field,value` |
//! | `sites.csv` | `name,latitude,longitude,category,opportunity_bundles,destination_bundles,peak_traffic,parking_lot_size,recommendation_year,hoarding_kiosk,hoarding_margin,kiosk_margin,traffic_profile,parking_profile` |
//! | `grid.csv` | `name,latitude,longitude` |
//!
//! Profile `field` values `0`..`23` are hourly baseline values;
//! `holiday_percentage`, `fast_charging` and `slow_charging` are scalar
//! settings; any other field is a vehicle-class fraction.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::tables::{
    ChargerAllocation, ChargerSpec, DemandProfile, GridAsset, HOURS_PER_DAY, PlanningInputs,
    PlanningScenario, ReferenceTables,
};
use crate::error::PlanError;
use crate::site::{Site, TransformerLink};

pub const SCENARIOS_FILE: &str = "planning_scenarios.csv";
pub const CHARGERS_FILE: &str = "charger_details.csv";
pub const ALLOCATIONS_FILE: &str = "chargers_site_categories.csv";
pub const TRAFFIC_FILE: &str = "traffic_profiles.csv";
pub const PARKING_FILE: &str = "parking_profiles.csv";
pub const SITES_FILE: &str = "sites.csv";
pub const GRID_FILE: &str = "grid.csv";

/// Every file a planning area directory must contain.
pub const REQUIRED_FILES: &[&str] = &[
    SCENARIOS_FILE,
    CHARGERS_FILE,
    ALLOCATIONS_FILE,
    TRAFFIC_FILE,
    PARKING_FILE,
    SITES_FILE,
    GRID_FILE,
];

#[derive(Debug, Deserialize)]
struct ScenarioRow {
    site_category: String,
    scenario_code: String,
    charger_types: String,
}

#[derive(Debug, Deserialize)]
struct ChargerRow {
    vehicle_type: String,
    compatible_charger: String,
    capex_per_charger: String,
    charging_power_kw: f64,
    annual_maintenance: f64,
    opportunity_hours: f64,
    destination_hours: f64,
}

#[derive(Debug, Deserialize)]
struct AllocationRow {
    charger: String,
    site_category: String,
    chargers: u32,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    profile: String,
    field: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct SiteRow {
    name: String,
    latitude: f64,
    longitude: f64,
    category: String,
    opportunity_bundles: u32,
    destination_bundles: u32,
    peak_traffic: f64,
    parking_lot_size: f64,
    recommendation_year: u32,
    hoarding_kiosk: u8,
    hoarding_margin: f64,
    kiosk_margin: f64,
    traffic_profile: Option<String>,
    parking_profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GridRow {
    name: String,
    latitude: f64,
    longitude: f64,
}

/// Returns the required files missing from `dir`.
pub fn missing_files(dir: &Path) -> Vec<&'static str> {
    REQUIRED_FILES
        .iter()
        .copied()
        .filter(|f| !dir.join(f).is_file())
        .collect()
}

/// Loads every table of a planning area directory.
///
/// # Errors
///
/// Returns `PlanError::DataIntegrity` if a file is missing, a column is
/// absent, a required value is empty or unparseable, a profile is incomplete,
/// or a site references an unknown profile.
pub fn load_planning_area(dir: &Path) -> Result<PlanningInputs, PlanError> {
    let missing = missing_files(dir);
    if !missing.is_empty() {
        return Err(PlanError::integrity(format!(
            "\"{}\" is missing {}",
            dir.display(),
            missing.join(", ")
        )));
    }

    let scenarios = read_rows::<ScenarioRow>(dir, SCENARIOS_FILE)?
        .into_iter()
        .map(|r| PlanningScenario {
            name: r.site_category,
            code: r.scenario_code,
            charger_types: r
                .charger_types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        })
        .collect();

    let chargers = read_rows::<ChargerRow>(dir, CHARGERS_FILE)?
        .into_iter()
        .map(|r| ChargerSpec {
            vehicle_type: r.vehicle_type,
            compatible_charger: r.compatible_charger,
            capex_range: r.capex_per_charger,
            power_kw: r.charging_power_kw,
            annual_maintenance: r.annual_maintenance,
            opportunity_hours: r.opportunity_hours,
            destination_hours: r.destination_hours,
        })
        .collect();

    let allocations = read_rows::<AllocationRow>(dir, ALLOCATIONS_FILE)?
        .into_iter()
        .map(|r| ChargerAllocation {
            charger: r.charger,
            site_category: r.site_category,
            chargers: r.chargers,
        })
        .collect();

    let traffic_profiles = collect_profiles(TRAFFIC_FILE, read_rows(dir, TRAFFIC_FILE)?)?;
    let parking_profiles = collect_profiles(PARKING_FILE, read_rows(dir, PARKING_FILE)?)?;

    let sites: Vec<Site> = read_rows::<SiteRow>(dir, SITES_FILE)?
        .into_iter()
        .enumerate()
        .map(|(id, r)| Site {
            id,
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
            category: r.category,
            opportunity_bundles: r.opportunity_bundles,
            destination_bundles: r.destination_bundles,
            peak_traffic: r.peak_traffic,
            parking_lot_size: r.parking_lot_size,
            recommendation_year: r.recommendation_year,
            hoarding_kiosk: r.hoarding_kiosk != 0,
            hoarding_margin: r.hoarding_margin,
            kiosk_margin: r.kiosk_margin,
            traffic_profile: r.traffic_profile.filter(|p| !p.trim().is_empty()),
            parking_profile: r.parking_profile.filter(|p| !p.trim().is_empty()),
            transformer: TransformerLink::default(),
        })
        .collect();

    let grid: Vec<GridAsset> = read_rows::<GridRow>(dir, GRID_FILE)?
        .into_iter()
        .map(|r| GridAsset {
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect();

    let inputs = PlanningInputs {
        tables: ReferenceTables {
            scenarios,
            chargers,
            allocations,
            traffic_profiles,
            parking_profiles,
        },
        sites,
        grid,
    };
    check_profile_references(&inputs)?;

    info!(
        dir = %dir.display(),
        sites = inputs.sites.len(),
        grid_assets = inputs.grid.len(),
        "planning area loaded"
    );
    Ok(inputs)
}

fn read_rows<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, PlanError> {
    let path = dir.join(file);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|e| PlanError::integrity(format!("{file}: {e}")))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.map_err(|e| PlanError::integrity(format!("{file}: {e}")))?);
    }
    debug!(file, rows = rows.len(), "table read");
    Ok(rows)
}

/// Groups long-format profile rows into profiles, preserving first-seen order.
fn collect_profiles(file: &str, rows: Vec<ProfileRow>) -> Result<Vec<DemandProfile>, PlanError> {
    let mut order: Vec<String> = Vec::new();
    let mut hourly: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    let mut profiles: BTreeMap<String, DemandProfile> = BTreeMap::new();

    for row in rows {
        let profile = profiles.entry(row.profile.clone()).or_insert_with(|| {
            order.push(row.profile.clone());
            DemandProfile {
                name: row.profile.clone(),
                hourly: Vec::new(),
                vehicle_fractions: BTreeMap::new(),
                holiday_percentage: None,
                fast_charging: None,
                slow_charging: None,
            }
        });
        let hours = hourly
            .entry(row.profile.clone())
            .or_insert_with(|| vec![None; HOURS_PER_DAY]);

        match row.field.as_str() {
            "holiday_percentage" => profile.holiday_percentage = Some(row.value),
            "fast_charging" => profile.fast_charging = Some(row.value),
            "slow_charging" => profile.slow_charging = Some(row.value),
            field => match field.parse::<usize>() {
                Ok(h) if h < HOURS_PER_DAY => hours[h] = Some(row.value),
                Ok(h) => {
                    return Err(PlanError::integrity(format!(
                        "{file}: profile \"{}\" has hour {h} outside 0..{HOURS_PER_DAY}",
                        row.profile
                    )));
                }
                Err(_) => {
                    profile.vehicle_fractions.insert(field.to_string(), row.value);
                }
            },
        }
    }

    if order.is_empty() {
        return Err(PlanError::integrity(format!("{file}: no profiles defined")));
    }

    let mut out = Vec::with_capacity(order.len());
    for name in order {
        let Some(mut profile) = profiles.remove(&name) else {
            continue;
        };
        let hours = hourly.remove(&name).unwrap_or_default();
        let missing: Vec<String> = hours
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(h, _)| h.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PlanError::integrity(format!(
                "{file}: profile \"{name}\" is missing hours {}",
                missing.join(",")
            )));
        }
        profile.hourly = hours.into_iter().flatten().collect();
        out.push(profile);
    }
    Ok(out)
}

/// Every profile a site names must exist in the matching profile table.
fn check_profile_references(inputs: &PlanningInputs) -> Result<(), PlanError> {
    let known = |profiles: &[DemandProfile], name: &str| profiles.iter().any(|p| p.name == name);
    let mut unknown = Vec::new();
    for site in &inputs.sites {
        if let Some(p) = &site.traffic_profile {
            if !known(&inputs.tables.traffic_profiles, p) {
                unknown.push(format!("{} -> traffic \"{p}\"", site.name));
            }
        }
        if let Some(p) = &site.parking_profile {
            if !known(&inputs.tables.parking_profiles, p) {
                unknown.push(format!("{} -> parking \"{p}\"", site.name));
            }
        }
    }
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(PlanError::integrity(format!(
            "sites reference unknown profiles: {}",
            unknown.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(profile: &str, field: &str, value: f64) -> ProfileRow {
        ProfileRow {
            profile: profile.to_string(),
            field: field.to_string(),
            value,
        }
    }

    fn full_day(profile: &str) -> Vec<ProfileRow> {
        (0..HOURS_PER_DAY)
            .map(|h| row(profile, &h.to_string(), h as f64))
            .collect()
    }

    #[test]
    fn profiles_keep_file_order_and_split_fields() {
        let mut rows = full_day("highway");
        rows.extend(full_day("city"));
        rows.push(row("city", "2W", 0.6));
        rows.push(row("city", "holiday_percentage", 0.3));
        rows.push(row("highway", "fast_charging", 0.2));

        let profiles = collect_profiles("t.csv", rows).ok().unwrap_or_default();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "highway");
        assert_eq!(profiles[0].fast_charging, Some(0.2));
        assert_eq!(profiles[1].hourly.len(), HOURS_PER_DAY);
        assert_eq!(profiles[1].hourly[5], 5.0);
        assert_eq!(profiles[1].vehicle_fractions.get("2W"), Some(&0.6));
        assert_eq!(profiles[1].holiday_percentage, Some(0.3));
    }

    #[test]
    fn incomplete_profile_is_rejected() {
        let mut rows = full_day("city");
        rows.remove(7);
        let err = collect_profiles("t.csv", rows);
        assert!(matches!(err, Err(PlanError::DataIntegrity(ref m)) if m.contains("hours 7")));
    }

    #[test]
    fn hour_out_of_range_is_rejected() {
        let mut rows = full_day("city");
        rows.push(row("city", "24", 1.0));
        assert!(matches!(
            collect_profiles("t.csv", rows),
            Err(PlanError::DataIntegrity(_))
        ));
    }

    #[test]
    fn empty_profile_table_is_rejected() {
        assert!(collect_profiles("t.csv", Vec::new()).is_err());
    }
}
