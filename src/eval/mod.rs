//! Site evaluation models.

/// Timeslot capacity model used by the command-line planner.
pub mod capacity;

pub use capacity::CapacityEvaluator;

use crate::error::EvaluationError;
use crate::plan::params::ScenarioParameters;
use crate::plan::types::EvaluationResult;
use crate::site::Site;

/// Scores a list of sites under one charging type's parameters.
///
/// Implementations must be pure and deterministic: the same parameters and
/// sites always give the same rows. The planner may call an evaluator from
/// two threads at once (one per charging type), hence the `Sync` bound.
pub trait Evaluator: Sync {
    /// Returns one row per site, in the order of `sites`.
    ///
    /// # Arguments
    ///
    /// * `params` - Resolved parameters for the charging type being planned
    /// * `sites` - Sites to score; every site has an entry in `params.sites`
    ///
    /// # Errors
    ///
    /// Any failure is reported as an opaque [`EvaluationError`] and ends the run.
    fn evaluate(
        &self,
        params: &ScenarioParameters,
        sites: &[Site],
    ) -> Result<Vec<EvaluationResult>, EvaluationError>;

    /// Human-readable model name for logs.
    fn name(&self) -> &'static str;
}
