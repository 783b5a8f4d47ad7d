//! Export and persistence of planning results.

/// CSV/JSON writers for stage tables, summaries and dendrograms.
pub mod export;
pub mod sink;

pub use sink::{DirectorySink, PlanSink};
