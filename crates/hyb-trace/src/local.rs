use std::fmt;

use hyb_core::errors::ErrorInfo;
use hyb_core::{HybError, OrbitalSegments, Segment, SegmentConfiguration, SegmentLayout, SegmentUpdate};

use crate::interaction::InteractionMatrix;

/// Local trace configuration of a density-density impurity.
///
/// The weight of a segment configuration is
/// `exp(sum_i mu_i L_i - sum_{i<j} U_ij O_ij)` where `L_i` is the occupied
/// time of orbital `i` and `O_ij` the time both `i` and `j` are occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalConfig {
    beta: f64,
    mu: Vec<f64>,
    interaction: InteractionMatrix,
    orbitals: Vec<OrbitalSegments>,
}

impl LocalConfig {
    /// Creates the empty configuration for the given couplings.
    pub fn new(beta: f64, mu: Vec<f64>, interaction: InteractionMatrix) -> Result<Self, HybError> {
        if mu.len() != interaction.n_orbitals() {
            return Err(HybError::Config(
                ErrorInfo::new(
                    "local-shape-mismatch",
                    "chemical potential and interaction matrix disagree on the orbital count",
                )
                .with_context("mu", mu.len().to_string())
                .with_context("interaction", interaction.n_orbitals().to_string()),
            ));
        }
        let orbitals = (0..mu.len()).map(|_| OrbitalSegments::new(beta)).collect();
        Ok(Self {
            beta,
            mu,
            interaction,
            orbitals,
        })
    }

    /// Density-density interaction matrix.
    pub fn interaction(&self) -> &InteractionMatrix {
        &self.interaction
    }

    /// Logarithm of the local weight, recomputed from scratch.
    pub fn log_weight(&self) -> f64 {
        self.log_weight_of(&self.orbitals)
    }

    fn log_weight_of(&self, orbitals: &[OrbitalSegments]) -> f64 {
        let mut exponent = 0.0;
        for (i, orbital) in orbitals.iter().enumerate() {
            exponent += self.mu[i] * orbital.total_length();
            for (j, other) in orbitals.iter().enumerate().skip(i + 1) {
                let u = self.interaction.get(i, j);
                if u != 0.0 {
                    exponent -= u * orbital.overlap(other);
                }
            }
        }
        exponent
    }

    /// Exponent gained by occupying `interval` in `orbital`.
    fn occupation_exponent(&self, orbital: usize, interval: &Segment) -> f64 {
        let mut exponent = self.mu[orbital] * interval.length(self.beta);
        for (j, other) in self.orbitals.iter().enumerate() {
            if j == orbital {
                continue;
            }
            let u = self.interaction.get(orbital, j);
            if u != 0.0 {
                exponent -= u * other.overlap_with(interval);
            }
        }
        exponent
    }

    fn log_ratio(&self, update: &SegmentUpdate) -> Result<f64, HybError> {
        let changed = update.preview(&self.orbitals)?;
        let exponent = match *update {
            SegmentUpdate::ToggleZeroState { orbital } => {
                let mut exponent = self.mu[orbital] * self.beta;
                for (j, other) in self.orbitals.iter().enumerate() {
                    if j != orbital {
                        exponent -= self.interaction.get(orbital, j) * other.total_length();
                    }
                }
                if self.orbitals[orbital].is_full_line() {
                    -exponent
                } else {
                    exponent
                }
            }
            SegmentUpdate::InsertSegment { orbital, segment }
            | SegmentUpdate::RemoveAntiSegment { orbital, segment } => {
                self.occupation_exponent(orbital, &segment)
            }
            SegmentUpdate::RemoveSegment { orbital, segment }
            | SegmentUpdate::InsertAntiSegment { orbital, segment } => {
                -self.occupation_exponent(orbital, &segment)
            }
            SegmentUpdate::SwapOrbitals { .. } | SegmentUpdate::GlobalFlip => {
                let mut orbitals = self.orbitals.clone();
                for (index, orbital) in changed {
                    orbitals[index] = orbital;
                }
                self.log_weight_of(&orbitals) - self.log_weight()
            }
        };
        Ok(exponent)
    }
}

impl SegmentConfiguration for LocalConfig {
    fn full_weight(&self) -> f64 {
        self.log_weight().exp()
    }

    fn weight_ratio(&self, update: &SegmentUpdate) -> Result<f64, HybError> {
        let ratio = self.log_ratio(update)?.exp();
        if !ratio.is_finite() {
            return Err(HybError::Numeric(
                ErrorInfo::new("local-ratio-overflow", "local weight ratio is not finite")
                    .with_context("ratio", ratio.to_string()),
            ));
        }
        Ok(ratio)
    }

    fn apply(&mut self, update: &SegmentUpdate) -> Result<(), HybError> {
        update.apply_to(&mut self.orbitals)
    }
}

impl SegmentLayout for LocalConfig {
    fn beta(&self) -> f64 {
        self.beta
    }

    fn orbitals(&self) -> &[OrbitalSegments] {
        &self.orbitals
    }
}

impl fmt::Display for LocalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "local configuration (beta = {})", self.beta)?;
        for (index, orbital) in self.orbitals.iter().enumerate() {
            writeln!(f, "  orbital {index}: {orbital}")?;
        }
        write!(f, "  log weight: {}", self.log_weight())
    }
}
