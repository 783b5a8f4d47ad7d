//! Nearest-transformer linking for candidate sites.

use tracing::{debug, warn};

use super::projection::LocalProjection;
use crate::data::tables::GridAsset;
use crate::error::PlanError;
use crate::site::{Site, TransformerLink};

/// Links every site to its nearest grid transformer.
///
/// Distances are measured in a local planar projection centred on all site
/// and grid points. Ties go to the transformer listed first. With an empty
/// grid table every site gets a zero distance and no transformer identity.
///
/// # Errors
///
/// Returns `PlanError::DataIntegrity` if any site or grid coordinate is not
/// finite, or if no projection can be centred on the inputs.
pub fn link_transformers(sites: &[Site], grid: &[GridAsset]) -> Result<Vec<Site>, PlanError> {
    for s in sites {
        if !(s.latitude.is_finite() && s.longitude.is_finite()) {
            return Err(PlanError::integrity(format!(
                "site \"{}\" has non-finite coordinates",
                s.name
            )));
        }
    }
    for g in grid {
        if !(g.latitude.is_finite() && g.longitude.is_finite()) {
            return Err(PlanError::integrity(format!(
                "transformer \"{}\" has non-finite coordinates",
                g.name
            )));
        }
    }

    if grid.is_empty() {
        warn!(
            sites = sites.len(),
            "grid table is empty; sites linked with zero transformer distance"
        );
        return Ok(sites
            .iter()
            .map(|s| s.with_transformer(TransformerLink::default()))
            .collect());
    }

    let points = sites
        .iter()
        .map(|s| (s.latitude, s.longitude))
        .chain(grid.iter().map(|g| (g.latitude, g.longitude)));
    let Some(projection) = LocalProjection::centred_on(points) else {
        return Err(PlanError::integrity(
            "no coordinates to centre the transformer projection on",
        ));
    };
    let projected: Vec<(f64, f64)> = grid
        .iter()
        .map(|g| projection.project(g.latitude, g.longitude))
        .collect();

    let linked = sites
        .iter()
        .map(|s| {
            let (sx, sy) = projection.project(s.latitude, s.longitude);
            let mut best = 0_usize;
            let mut best_m = f64::INFINITY;
            for (i, (gx, gy)) in projected.iter().enumerate() {
                let d = (sx - gx).hypot(sy - gy);
                if d < best_m {
                    best = i;
                    best_m = d;
                }
            }
            let asset = &grid[best];
            debug!(site = %s.name, transformer = %asset.name, distance_m = best_m, "linked");
            s.with_transformer(TransformerLink {
                name: Some(asset.name.clone()),
                latitude: Some(asset.latitude),
                longitude: Some(asset.longitude),
                distance_km: best_m / 1e3,
            })
        })
        .collect();
    Ok(linked)
}
