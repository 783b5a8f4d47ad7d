//! Error taxonomy for the planning pipeline.
//!
//! Every variant is fatal to the enclosing run: the planner never catches a
//! stage failure and continues, and nothing is handed to persistence once an
//! error has been raised.

use thiserror::Error;

/// Opaque failure reported by an [`Evaluator`](crate::eval::Evaluator).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EvaluationError {
    /// Human-readable failure description.
    pub message: String,
}

impl EvaluationError {
    /// Creates an evaluation error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while loading inputs, resolving parameters or running the
/// consolidation pipeline.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Unresolvable scenario name, missing reference row, bad resampling ratio.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Missing input file or column, disallowed empty value.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
    /// Zero-duration charger, empty site set for a scenario.
    #[error("domain error: {0}")]
    Domain(String),
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    /// Non-finite coordinates or a degenerate distance matrix.
    #[error("clustering failed: {0}")]
    Clustering(String),
    /// The run's cancellation token fired or its deadline passed.
    #[error("run cancelled before {0}")]
    Cancelled(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity(message.into())
    }

    pub(crate) fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }
}
