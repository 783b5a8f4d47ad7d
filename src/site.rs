//! Candidate charging sites and their grid linkage.

use serde::Serialize;

use crate::plan::types::ChargingType;

/// Nearest grid transformer attached to a site.
///
/// `name`, `latitude` and `longitude` are `None` when the grid table was empty;
/// `distance_km` is then `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformerLink {
    /// Transformer name from the grid table.
    pub name: Option<String>,
    /// Transformer latitude (WGS84 degrees).
    pub latitude: Option<f64>,
    /// Transformer longitude (WGS84 degrees).
    pub longitude: Option<f64>,
    /// Planar distance from the site to the transformer (km).
    pub distance_km: f64,
}

/// One candidate physical site.
///
/// Sites are never mutated during a run. Each pipeline stage produces a new
/// `Vec<Site>`; the stable `id` (row index in the input table) ties a site to
/// its per-site scenario parameters across stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    /// Row index in the sites table.
    pub id: usize,
    /// Site name.
    pub name: String,
    /// Latitude (WGS84 degrees).
    pub latitude: f64,
    /// Longitude (WGS84 degrees).
    pub longitude: f64,
    /// Site category code (e.g. `"PP"` for public places).
    pub category: String,
    /// Charger bundles installed for opportunity charging.
    pub opportunity_bundles: u32,
    /// Charger bundles installed for destination charging.
    pub destination_bundles: u32,
    /// Peak hourly vehicle count passing the site.
    pub peak_traffic: f64,
    /// Parking lot size in vehicles.
    pub parking_lot_size: f64,
    /// Year in which the site is recommended for commissioning.
    pub recommendation_year: u32,
    /// Whether the site may host a hoarding and a kiosk.
    pub hoarding_kiosk: bool,
    /// Annual hoarding margin (currency).
    pub hoarding_margin: f64,
    /// Annual kiosk margin (currency).
    pub kiosk_margin: f64,
    /// Traffic profile used for opportunity charging.
    pub traffic_profile: Option<String>,
    /// Parking profile used for destination charging.
    pub parking_profile: Option<String>,
    /// Nearest grid transformer.
    pub transformer: TransformerLink,
}

impl Site {
    /// Charger bundles installed for the given charging type.
    pub fn bundles(&self, charging_type: ChargingType) -> u32 {
        match charging_type {
            ChargingType::Opportunity => self.opportunity_bundles,
            ChargingType::Destination => self.destination_bundles,
        }
    }

    /// Vehicle demand driving the given charging type: peak traffic for
    /// opportunity charging, parking lot size for destination charging.
    pub fn vehicle_demand(&self, charging_type: ChargingType) -> f64 {
        match charging_type {
            ChargingType::Opportunity => self.peak_traffic,
            ChargingType::Destination => self.parking_lot_size,
        }
    }

    /// Name of the demand profile for the given charging type, if any.
    pub fn demand_profile(&self, charging_type: ChargingType) -> Option<&str> {
        match charging_type {
            ChargingType::Opportunity => self.traffic_profile.as_deref(),
            ChargingType::Destination => self.parking_profile.as_deref(),
        }
    }

    /// Returns a copy of this site linked to `transformer`.
    pub fn with_transformer(&self, transformer: TransformerLink) -> Self {
        Self {
            transformer,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_site() -> Site {
        Site {
            id: 0,
            name: "Market Square".to_string(),
            latitude: 15.49,
            longitude: 73.82,
            category: "PP".to_string(),
            opportunity_bundles: 2,
            destination_bundles: 1,
            peak_traffic: 400.0,
            parking_lot_size: 60.0,
            recommendation_year: 1,
            hoarding_kiosk: true,
            hoarding_margin: 10_000.0,
            kiosk_margin: 5_000.0,
            traffic_profile: Some("city".to_string()),
            parking_profile: None,
            transformer: TransformerLink::default(),
        }
    }

    #[test]
    fn per_charging_type_accessors() {
        let site = make_site();
        assert_eq!(site.bundles(ChargingType::Opportunity), 2);
        assert_eq!(site.bundles(ChargingType::Destination), 1);
        assert_eq!(site.vehicle_demand(ChargingType::Opportunity), 400.0);
        assert_eq!(site.vehicle_demand(ChargingType::Destination), 60.0);
        assert_eq!(site.demand_profile(ChargingType::Opportunity), Some("city"));
        assert_eq!(site.demand_profile(ChargingType::Destination), None);
    }

    #[test]
    fn with_transformer_leaves_original_untouched() {
        let site = make_site();
        let linked = site.with_transformer(TransformerLink {
            name: Some("TR-7".to_string()),
            latitude: Some(15.5),
            longitude: Some(73.8),
            distance_km: 1.2,
        });
        assert_eq!(site.transformer, TransformerLink::default());
        assert_eq!(linked.transformer.name.as_deref(), Some("TR-7"));
        assert_eq!(linked.name, site.name);
    }
}
