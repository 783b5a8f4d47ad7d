//! Stage report aggregation.

use crate::plan::types::{ChargingType, EvaluationResult, Stage, StageReport};

/// Sums one stage's evaluation rows into a [`StageReport`].
///
/// `total_sites` is the size of the unfiltered site table, so the site count
/// reads as a share of every site in the planning area. A site counts as
/// confirmed when its utilization is strictly above `cluster_threshold`.
pub fn aggregate(
    charging_type: ChargingType,
    stage: Stage,
    results: &[EvaluationResult],
    total_sites: usize,
    cluster_threshold: f64,
) -> StageReport {
    StageReport {
        charging_type,
        stage,
        site_count: results.len(),
        total_sites,
        capex: results.iter().map(|r| r.capex).sum(),
        opex: results.iter().map(|r| r.opex).sum(),
        margin: results.iter().map(|r| r.margin).sum(),
        cluster_threshold,
        confirmed: results
            .iter()
            .filter(|r| r.utilization > cluster_threshold)
            .count(),
    }
}
