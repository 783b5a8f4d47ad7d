//! EV charging infrastructure planner.
//!
//! Evaluates candidate charging sites for a planning scenario, consolidates
//! low-utilization sites by spatial clustering and exports the results.

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod eval;
pub mod geo;
pub mod io;
pub mod plan;
pub mod site;
