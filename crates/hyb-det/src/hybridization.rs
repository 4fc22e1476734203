use std::fmt;

use hyb_core::errors::ErrorInfo;
use hyb_core::{HybError, OrbitalSegments, SegmentConfiguration, SegmentLayout, SegmentUpdate};
use nalgebra::DMatrix;

use crate::bath::DiscreteBath;

/// Hybridization determinant configuration.
///
/// Every orbital couples to its own copy of the same discrete bath. The
/// weight of orbital `i` is `det F_i` with
/// `(F_i)_ab = F(t_end_a - t_start_b)`, negated when the last segment wraps
/// so that time ordering of the operators is restored. Weights of the
/// current orbitals are cached and refreshed on every commit.
#[derive(Debug, Clone, PartialEq)]
pub struct HybConfig {
    bath: DiscreteBath,
    orbitals: Vec<OrbitalSegments>,
    weights: Vec<f64>,
}

impl HybConfig {
    /// Creates the empty configuration with `n_orbitals` orbitals.
    pub fn new(n_orbitals: usize, bath: DiscreteBath) -> Self {
        let orbitals = (0..n_orbitals)
            .map(|_| OrbitalSegments::new(bath.beta()))
            .collect();
        Self {
            bath,
            orbitals,
            weights: vec![1.0; n_orbitals],
        }
    }

    /// The bath every orbital couples to.
    pub fn bath(&self) -> &DiscreteBath {
        &self.bath
    }

    /// Cached determinant weight of every orbital.
    pub fn orbital_weights(&self) -> &[f64] {
        &self.weights
    }

    /// Hybridization matrix of a segment set (rows: segment ends, columns: starts).
    pub fn hybridization_matrix(&self, orbital: &OrbitalSegments) -> DMatrix<f64> {
        let segments = orbital.segments();
        DMatrix::from_fn(segments.len(), segments.len(), |a, b| {
            self.bath.evaluate(segments[a].t_end - segments[b].t_start)
        })
    }

    /// Weight of a single orbital, recomputed from its segments.
    pub fn orbital_weight(&self, orbital: &OrbitalSegments) -> f64 {
        if orbital.is_empty() {
            return 1.0;
        }
        let det = self.hybridization_matrix(orbital).determinant();
        if orbital.wraps() {
            -det
        } else {
            det
        }
    }
}

impl SegmentConfiguration for HybConfig {
    fn full_weight(&self) -> f64 {
        self.orbitals
            .iter()
            .map(|orbital| self.orbital_weight(orbital))
            .product()
    }

    fn weight_ratio(&self, update: &SegmentUpdate) -> Result<f64, HybError> {
        let changed = update.preview(&self.orbitals)?;
        let mut old = 1.0;
        let mut new = 1.0;
        for (index, orbital) in &changed {
            old *= self.weights[*index];
            new *= self.orbital_weight(orbital);
        }
        if old == 0.0 || !old.is_finite() {
            return Err(HybError::Numeric(
                ErrorInfo::new("degenerate-weight", "hybridization weight of the current state is degenerate")
                    .with_context("weight", old.to_string()),
            ));
        }
        let ratio = new / old;
        if !ratio.is_finite() {
            return Err(HybError::Numeric(
                ErrorInfo::new("degenerate-weight", "hybridization weight ratio is not finite")
                    .with_context("ratio", ratio.to_string()),
            ));
        }
        Ok(ratio)
    }

    fn apply(&mut self, update: &SegmentUpdate) -> Result<(), HybError> {
        update.apply_to(&mut self.orbitals)?;
        for index in update.touched_orbitals(self.orbitals.len()) {
            self.weights[index] = self.orbital_weight(&self.orbitals[index]);
        }
        Ok(())
    }
}

impl SegmentLayout for HybConfig {
    fn beta(&self) -> f64 {
        self.bath.beta()
    }

    fn orbitals(&self) -> &[OrbitalSegments] {
        &self.orbitals
    }
}

impl fmt::Display for HybConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hybridization configuration (beta = {})", self.bath.beta())?;
        for (index, orbital) in self.orbitals.iter().enumerate() {
            writeln!(f, "  orbital {index}: {orbital} det = {}", self.weights[index])?;
        }
        Ok(())
    }
}
