#![deny(missing_docs)]

//! Local trace model for density-density CT-HYB configurations.

/// Density-density interaction matrices.
pub mod interaction;
/// Segment-based local trace configuration.
pub mod local;

pub use interaction::InteractionMatrix;
pub use local::LocalConfig;
