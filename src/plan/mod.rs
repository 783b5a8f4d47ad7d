//! Planning pipeline: parameter resolution, consolidation and reporting.

/// Complete-linkage clustering of candidate sites.
pub mod cluster;
pub mod engine;
/// Scenario parameter resolution from reference tables.
pub mod params;
pub mod report;
pub mod types;

pub use engine::{ChargingTypeOutcome, ConsolidationEngine, PlannerOptions, StageOutcome};
pub use params::ScenarioParameters;
pub use types::{ChargingType, EvaluationResult, Stage, StageReport};

use tracing::info;

use crate::config::PlannerConfig;
use crate::context::RunContext;
use crate::data::PlanningInputs;
use crate::error::PlanError;
use crate::eval::Evaluator;
use crate::geo::link_transformers;

/// Result of a complete run: one outcome per charging type, in
/// [`ChargingType::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub run_id: String,
    pub outcomes: Vec<ChargingTypeOutcome>,
}

impl PlanOutcome {
    /// Outcome for one charging type.
    pub fn get(&self, charging_type: ChargingType) -> Option<&ChargingTypeOutcome> {
        self.outcomes.iter().find(|o| o.charging_type == charging_type)
    }

    /// Every stage report of the run, initial before cluster per charging type.
    pub fn reports(&self) -> Vec<&StageReport> {
        self.outcomes
            .iter()
            .flat_map(|o| std::iter::once(&o.initial.report).chain(o.cluster.as_ref().map(|c| &c.report)))
            .collect()
    }
}

/// Plans both charging types of a planning area.
pub struct Planner<'a, E: Evaluator + ?Sized> {
    evaluator: &'a E,
    config: &'a PlannerConfig,
}

impl<'a, E: Evaluator + ?Sized> Planner<'a, E> {
    pub fn new(evaluator: &'a E, config: &'a PlannerConfig) -> Self {
        Self { evaluator, config }
    }

    /// Links transformers, resolves parameters for both charging types and
    /// runs the consolidation engine on each.
    ///
    /// Parameters for both charging types are resolved before the first
    /// evaluator call, so configuration errors never cost an evaluation.
    /// The outcome is all-or-nothing: any error discards every result. In
    /// parallel mode a failing charging type cancels `ctx.cancel`, so the
    /// other one stops at its next checkpoint.
    ///
    /// # Errors
    ///
    /// Returns the first `PlanError` raised by any step.
    pub fn run(&self, ctx: &RunContext, inputs: &PlanningInputs) -> Result<PlanOutcome, PlanError> {
        ctx.cancel.check("transformer linking")?;
        let sites = link_transformers(&inputs.sites, &inputs.grid)?;

        let [opportunity, destination] = ChargingType::ALL.map(|ct| {
            ScenarioParameters::resolve(&inputs.tables, &sites, ct, self.config)
        });
        let (opportunity, destination) = (opportunity?, destination?);

        let engine = ConsolidationEngine::new(self.evaluator, self.config.planner_options());
        let outcomes = if engine.options().parallel {
            let run = |params: &ScenarioParameters| {
                let outcome = engine.run(ctx, params, &sites);
                if outcome.is_err() {
                    ctx.cancel.cancel();
                }
                outcome
            };
            let (first, second) = rayon::join(|| run(&opportunity), || run(&destination));
            match (first, second) {
                (Ok(first), Ok(second)) => vec![first, second],
                // report the root failure over the sibling's cancellation
                (Err(e), Err(PlanError::Cancelled(_)))
                | (Err(PlanError::Cancelled(_)), Err(e))
                | (Err(e), Ok(_))
                | (Ok(_), Err(e)) => return Err(e),
                (Err(e), Err(_)) => return Err(e),
            }
        } else {
            vec![
                engine.run(ctx, &opportunity, &sites)?,
                engine.run(ctx, &destination, &sites)?,
            ]
        };

        info!(
            run_id = %ctx.run_id,
            analysis_id = ?ctx.analysis_id,
            final_sites = ?outcomes.iter().map(|o| o.final_sites.len()).collect::<Vec<_>>(),
            "plan complete"
        );
        Ok(PlanOutcome {
            run_id: ctx.run_id.clone(),
            outcomes,
        })
    }
}
