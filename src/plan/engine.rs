//! Site consolidation engine: the per-charging-type pipeline.
//!
//! ```text
//! InitialEval -> ThresholdSplit -> (ClusterMerge -> FinalEval) -> Done
//! ```
//!
//! Every transition is logged and checks the run's cancellation token. The
//! engine never mutates a site; each stage builds a new site list.

use std::fmt;

use tracing::{debug, info};

use super::cluster::{CLUSTER_DISTANCE_CUTOFF, Dendrogram, flat_clusters, representatives};
use super::params::ScenarioParameters;
use super::report::aggregate;
use super::types::{ChargingType, EvaluationResult, Stage, StageReport};
use crate::context::RunContext;
use crate::error::{EvaluationError, PlanError};
use crate::eval::Evaluator;
use crate::site::Site;

/// Switches shared by both charging types of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerOptions {
    /// Consolidate low-utilization sites by clustering.
    pub cluster: bool,
    /// Utilization at or below which a site becomes a clustering candidate.
    pub cluster_threshold: f64,
    /// Keep the dendrogram in the outcome for export.
    pub keep_dendrogram: bool,
    /// Plan both charging types concurrently.
    pub parallel: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            cluster: true,
            cluster_threshold: 0.04,
            keep_dendrogram: true,
            parallel: false,
        }
    }
}

/// Pipeline state for one charging type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    InitialEval,
    ThresholdSplit,
    ClusterMerge,
    FinalEval,
    Done,
}

impl PipelineState {
    pub fn label(self) -> &'static str {
        match self {
            PipelineState::InitialEval => "initial evaluation",
            PipelineState::ThresholdSplit => "threshold split",
            PipelineState::ClusterMerge => "cluster merge",
            PipelineState::FinalEval => "final evaluation",
            PipelineState::Done => "done",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sites, evaluator rows and report of one stage; `results[i]` belongs to `sites[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: Stage,
    pub sites: Vec<Site>,
    pub results: Vec<EvaluationResult>,
    pub report: StageReport,
}

/// Everything one charging type produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingTypeOutcome {
    pub charging_type: ChargingType,
    pub initial: StageOutcome,
    /// Present only when clustering ran.
    pub cluster: Option<StageOutcome>,
    /// Sites above the utilization threshold after the initial evaluation.
    pub confirmed: Vec<Site>,
    /// Confirmed sites followed by cluster representatives.
    pub final_sites: Vec<Site>,
    /// Present when clustering ran and dendrograms are kept.
    pub dendrogram: Option<Dendrogram>,
}

/// Runs the consolidation pipeline against an evaluator.
///
/// Generic over `E: Evaluator` for static dispatch; `?Sized` also admits
/// `dyn Evaluator`.
pub struct ConsolidationEngine<'a, E: Evaluator + ?Sized> {
    evaluator: &'a E,
    options: PlannerOptions,
}

impl<'a, E: Evaluator + ?Sized> ConsolidationEngine<'a, E> {
    pub fn new(evaluator: &'a E, options: PlannerOptions) -> Self {
        Self { evaluator, options }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Plans one charging type.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Run identity and cancellation token
    /// * `params` - Resolved parameters for the charging type
    /// * `sites` - Full linked site table; filtered here to the scenario category
    ///
    /// # Errors
    ///
    /// - `PlanError::Domain` if no site belongs to the scenario category.
    /// - `PlanError::Evaluation` if the evaluator fails or returns rows that
    ///   are misaligned or out of range.
    /// - `PlanError::Clustering` or `PlanError::Cancelled` from consolidation.
    pub fn run(
        &self,
        ctx: &RunContext,
        params: &ScenarioParameters,
        sites: &[Site],
    ) -> Result<ChargingTypeOutcome, PlanError> {
        let ct = params.charging_type;
        let th = self.options.cluster_threshold;
        let total = sites.len();

        self.enter(ctx, ct, PipelineState::InitialEval)?;
        let scenario_sites: Vec<Site> = sites
            .iter()
            .filter(|s| s.category == params.scenario_code)
            .cloned()
            .collect();
        if scenario_sites.is_empty() {
            return Err(PlanError::domain(format!(
                "no sites in category \"{}\" for {ct}",
                params.scenario_code
            )));
        }
        let initial = self.stage(params, Stage::Initial, scenario_sites, total)?;

        self.enter(ctx, ct, PipelineState::ThresholdSplit)?;
        let mut confirmed = Vec::new();
        let mut candidates = Vec::new();
        for (site, row) in initial.sites.iter().zip(&initial.results) {
            if row.utilization > th {
                confirmed.push(site.clone());
            } else {
                candidates.push(site.clone());
            }
        }
        debug!(
            run_id = %ctx.run_id,
            charging_type = %ct,
            confirmed = confirmed.len(),
            candidates = candidates.len(),
            "threshold split"
        );

        if !self.options.cluster || candidates.is_empty() {
            self.enter(ctx, ct, PipelineState::Done)?;
            return Ok(ChargingTypeOutcome {
                charging_type: ct,
                initial,
                cluster: None,
                final_sites: confirmed.clone(),
                confirmed,
                dendrogram: None,
            });
        }

        self.enter(ctx, ct, PipelineState::ClusterMerge)?;
        let (kept, dendrogram) = if candidates.len() == 1 {
            (candidates, None)
        } else {
            let points: Vec<(f64, f64)> =
                candidates.iter().map(|s| (s.latitude, s.longitude)).collect();
            let (labels, dendrogram) = flat_clusters(&points, CLUSTER_DISTANCE_CUTOFF, &ctx.cancel)?;
            let kept = representatives(&labels)
                .into_iter()
                .map(|i| candidates[i].clone())
                .collect::<Vec<_>>();
            (kept, Some(dendrogram))
        };
        debug!(
            run_id = %ctx.run_id,
            charging_type = %ct,
            representatives = kept.len(),
            "candidates consolidated"
        );

        let final_sites: Vec<Site> = confirmed.iter().cloned().chain(kept).collect();

        self.enter(ctx, ct, PipelineState::FinalEval)?;
        let cluster = self.stage(params, Stage::Cluster, final_sites.clone(), total)?;

        self.enter(ctx, ct, PipelineState::Done)?;
        Ok(ChargingTypeOutcome {
            charging_type: ct,
            initial,
            cluster: Some(cluster),
            confirmed,
            final_sites,
            dendrogram: dendrogram.filter(|_| self.options.keep_dendrogram),
        })
    }

    fn enter(
        &self,
        ctx: &RunContext,
        charging_type: ChargingType,
        state: PipelineState,
    ) -> Result<(), PlanError> {
        debug!(run_id = %ctx.run_id, %charging_type, %state, "pipeline state");
        if state == PipelineState::Done {
            return Ok(());
        }
        ctx.cancel.check(state.label())
    }

    /// Evaluates `sites` and aggregates the stage report.
    fn stage(
        &self,
        params: &ScenarioParameters,
        stage: Stage,
        sites: Vec<Site>,
        total_sites: usize,
    ) -> Result<StageOutcome, PlanError> {
        let results = self.evaluate(params, &sites)?;
        let report = aggregate(
            params.charging_type,
            stage,
            &results,
            total_sites,
            self.options.cluster_threshold,
        );
        info!(evaluator = self.evaluator.name(), "{report}");
        Ok(StageOutcome {
            stage,
            sites,
            results,
            report,
        })
    }

    /// Calls the evaluator and checks row alignment and fraction ranges.
    fn evaluate(
        &self,
        params: &ScenarioParameters,
        sites: &[Site],
    ) -> Result<Vec<EvaluationResult>, PlanError> {
        let results = self.evaluator.evaluate(params, sites)?;
        if results.len() != sites.len() {
            return Err(EvaluationError::new(format!(
                "{} returned {} rows for {} sites",
                self.evaluator.name(),
                results.len(),
                sites.len()
            ))
            .into());
        }
        if let Some((site, row)) = sites
            .iter()
            .zip(&results)
            .find(|(_, r)| !r.fractions_in_range())
        {
            return Err(EvaluationError::new(format!(
                "site \"{}\": utilization {} / unserviced {} outside [0, 1]",
                site.name, row.utilization, row.unserviced
            ))
            .into());
        }
        Ok(results)
    }
}
