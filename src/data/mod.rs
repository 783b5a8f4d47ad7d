//! Reference tables and planning-area loading.

/// CSV loader for planning area directories.
pub mod loader;
pub mod tables;

pub use loader::load_planning_area;
pub use tables::{
    ChargerAllocation, ChargerSpec, DemandProfile, GridAsset, PlanningInputs, PlanningScenario,
    ReferenceTables,
};
