#![deny(missing_docs)]
#![doc = "Core traits, segment geometry and error types shared by the CT-HYB crates."]

pub mod errors;
mod hash;
pub mod rng;
pub mod segment;

pub use errors::{ErrorInfo, HybError};
pub use hash::canonical_hash;
pub use rng::{derive_substream_seed, RngHandle};
pub use segment::{circular_distance, wrap_time, OrbitalSegments, Segment, SegmentUpdate};

/// Weight-bearing half of a factorized CT-HYB configuration.
///
/// The local trace model and the hybridization determinant model both
/// implement this trait. The sampler multiplies their ratios, so an
/// implementation only has to be consistent with its own `full_weight`.
pub trait SegmentConfiguration {
    /// Recomputes the weight of the current configuration from scratch.
    ///
    /// Debug and consistency checks only; the sampler never calls this on the
    /// hot path.
    fn full_weight(&self) -> f64;

    /// Ratio `w(after) / w(before)` for applying `update` to the current state.
    ///
    /// Returns [`HybError::Numeric`] when the ratio is undefined (zero or
    /// non-finite current weight) and [`HybError::Segment`] when the update does
    /// not match the configuration. Must not mutate the configuration.
    fn weight_ratio(&self, update: &SegmentUpdate) -> Result<f64, HybError>;

    /// Commits `update`. On error the configuration is left unchanged.
    fn apply(&mut self, update: &SegmentUpdate) -> Result<(), HybError>;
}

/// Read access to the segment sets a configuration holds.
pub trait SegmentLayout {
    /// Inverse temperature.
    fn beta(&self) -> f64;

    /// Segment set of every orbital, in orbital order.
    fn orbitals(&self) -> &[OrbitalSegments];

    /// Number of orbitals.
    fn n_orbitals(&self) -> usize {
        self.orbitals().len()
    }

    /// Total number of segments over all orbitals.
    fn total_order(&self) -> usize {
        self.orbitals().iter().map(OrbitalSegments::len).sum()
    }
}
