#![deny(missing_docs)]

//! Hybridization determinant model over a discrete bath.

/// Discrete bath and its hybridization function.
pub mod bath;
/// Per-orbital hybridization determinants.
pub mod hybridization;

pub use bath::DiscreteBath;
pub use hybridization::HybConfig;
