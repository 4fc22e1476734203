use hyb_core::errors::ErrorInfo;
use hyb_core::HybError;
use serde::{Deserialize, Serialize};

/// Symmetric density-density interaction matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionMatrix {
    n_orbitals: usize,
    values: Vec<f64>,
}

impl InteractionMatrix {
    /// Builds the Kanamori density-density matrix for spin-orbital pairs.
    ///
    /// Orbitals `2b` and `2b + 1` are the two spin components of band `b`.
    /// Opposite spins in the same band interact with `u`, opposite spins in
    /// different bands with `u_prime`, equal spins in different bands with
    /// `u_prime - j`.
    pub fn kanamori(n_orbitals: usize, u: f64, u_prime: f64, j: f64) -> Self {
        let mut values = vec![0.0; n_orbitals * n_orbitals];
        for a in 0..n_orbitals {
            for b in 0..n_orbitals {
                if a == b {
                    continue;
                }
                let same_band = a / 2 == b / 2;
                let same_spin = a % 2 == b % 2;
                values[a * n_orbitals + b] = match (same_band, same_spin) {
                    (true, _) => u,
                    (false, false) => u_prime,
                    (false, true) => u_prime - j,
                };
            }
        }
        Self { n_orbitals, values }
    }

    /// Builds the matrix from explicit rows. Rows must form a symmetric square matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, HybError> {
        let n_orbitals = rows.len();
        let mut values = Vec::with_capacity(n_orbitals * n_orbitals);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != n_orbitals {
                return Err(HybError::Config(
                    ErrorInfo::new("u-matrix-shape", "U_MATRIX must be square")
                        .with_context("row", index.to_string())
                        .with_context("len", row.len().to_string()),
                ));
            }
            values.extend_from_slice(row);
        }
        for a in 0..n_orbitals {
            for b in (a + 1)..n_orbitals {
                let (upper, lower) = (values[a * n_orbitals + b], values[b * n_orbitals + a]);
                if (upper - lower).abs() > 1e-12 * upper.abs().max(lower.abs()).max(1.0) {
                    return Err(HybError::Config(
                        ErrorInfo::new("u-matrix-asymmetric", "U_MATRIX must be symmetric")
                            .with_context("row", a.to_string())
                            .with_context("column", b.to_string()),
                    ));
                }
            }
            values[a * n_orbitals + a] = 0.0;
        }
        Ok(Self { n_orbitals, values })
    }

    /// Number of orbitals the matrix couples.
    pub fn n_orbitals(&self) -> usize {
        self.n_orbitals
    }

    /// Interaction between orbitals `a` and `b` (zero on the diagonal).
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[a * self.n_orbitals + b]
    }
}
