//! Spatial helpers: planar projection and transformer linking.

pub mod linker;
pub mod projection;

pub use linker::link_transformers;
pub use projection::LocalProjection;
