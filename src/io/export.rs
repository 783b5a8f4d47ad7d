//! CSV and JSON export of stage tables, run summaries and dendrograms.
//!
//! The core keeps currency in raw units; crore scaling happens only here.

use std::io::Write;

use serde::Serialize;

use crate::error::PlanError;
use crate::plan::cluster::Dendrogram;
use crate::plan::engine::StageOutcome;
use crate::plan::types::{ChargingType, EvaluationResult, Stage, StageReport};
use crate::plan::PlanOutcome;
use crate::site::Site;

/// Currency units per crore.
pub const CRORE: f64 = 1e7;

/// Column header for stage tables.
const STAGE_HEADER: &str = "name,latitude,longitude,category,bundles,recommendation_year,\
                            transformer,transformer_latitude,transformer_longitude,distance_km,\
                            utilization,unserviced,capex,opex,margin,max_vehicles,estimated_vehicles";

/// Column header for the run summary.
const SUMMARY_HEADER: &str =
    "charging_type,stage,no_site,capex_cr,opex_cr,margin_cr,confirmed_utilization";

/// File name for one stage table, e.g. `initial_opportunity_charging_analysis.csv`.
pub fn stage_file_name(stage: Stage, charging_type: ChargingType, extension: &str) -> String {
    format!("{stage}_{charging_type}_analysis.{extension}")
}

/// File name for a charging type's dendrogram.
pub fn dendrogram_file_name(charging_type: ChargingType) -> String {
    format!("dendrogram_{charging_type}.json")
}

/// Writes one stage as CSV: site columns followed by evaluator columns.
///
/// # Errors
///
/// Returns `PlanError::Csv` if writing fails.
pub fn write_stage_csv(stage: &StageOutcome, writer: impl Write) -> Result<(), PlanError> {
    let ct = stage.report.charging_type;
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(STAGE_HEADER.split(',').map(str::trim))?;

    let opt = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
    for (s, r) in stage.sites.iter().zip(&stage.results) {
        wtr.write_record(&[
            s.name.clone(),
            format!("{:.6}", s.latitude),
            format!("{:.6}", s.longitude),
            s.category.clone(),
            s.bundles(ct).to_string(),
            s.recommendation_year.to_string(),
            s.transformer.name.clone().unwrap_or_default(),
            opt(s.transformer.latitude),
            opt(s.transformer.longitude),
            format!("{:.3}", s.transformer.distance_km),
            format!("{:.4}", r.utilization),
            format!("{:.4}", r.unserviced),
            format!("{:.2}", r.capex),
            format!("{:.2}", r.opex),
            format!("{:.2}", r.margin),
            format!("{:.2}", r.max_vehicles),
            format!("{:.2}", r.estimated_vehicles),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct StageRecord<'a> {
    #[serde(flatten)]
    site: &'a Site,
    #[serde(flatten)]
    result: &'a EvaluationResult,
}

/// Writes one stage as a JSON array of records.
///
/// # Errors
///
/// Returns `PlanError::Json` if serialization fails, or `PlanError::Io` if
/// the writer cannot be flushed.
pub fn write_stage_json(stage: &StageOutcome, mut writer: impl Write) -> Result<(), PlanError> {
    let records: Vec<StageRecord<'_>> = stage
        .sites
        .iter()
        .zip(&stage.results)
        .map(|(site, result)| StageRecord { site, result })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(())
}

/// Amount in crore, rounded to two decimals.
pub fn to_crore(amount: f64) -> f64 {
    (amount / CRORE * 100.0).round() / 100.0
}

/// Confirmed-site label, e.g. `"4%: 3"` for three sites above a 0.04 threshold.
///
/// The percentage is truncated, not rounded.
pub fn confirmed_label(report: &StageReport) -> String {
    format!(
        "{}%: {}",
        (report.cluster_threshold * 100.0).trunc() as i64,
        report.confirmed
    )
}

/// Writes every stage report of a run as the summary table.
///
/// # Errors
///
/// Returns `PlanError::Csv` if writing fails.
pub fn write_summary_csv(outcome: &PlanOutcome, writer: impl Write) -> Result<(), PlanError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SUMMARY_HEADER.split(','))?;

    for report in outcome.reports() {
        wtr.write_record(&[
            report.charging_type.to_string(),
            report.stage.to_string(),
            report.site_count_label(),
            format!("{:.2}", to_crore(report.capex)),
            format!("{:.2}", to_crore(report.opex)),
            format!("{:.2}", to_crore(report.margin)),
            confirmed_label(report),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes a dendrogram as JSON.
///
/// # Errors
///
/// Returns `PlanError::Json` if serialization fails, or `PlanError::Io` if
/// the writer cannot be flushed.
pub fn write_dendrogram_json(
    dendrogram: &Dendrogram,
    mut writer: impl Write,
) -> Result<(), PlanError> {
    serde_json::to_writer_pretty(&mut writer, dendrogram)?;
    writer.flush()?;
    Ok(())
}
