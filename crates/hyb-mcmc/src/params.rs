use std::fs;
use std::path::Path;

use hyb_core::errors::ErrorInfo;
use hyb_core::HybError;
use hyb_det::DiscreteBath;
use hyb_trace::InteractionMatrix;
use serde::{Deserialize, Serialize};

use crate::measure::MeasurementChannels;
use crate::schedule::{MoveSchedule, MoveWeights};

/// Master seed used when `SEED` is not given.
pub const DEFAULT_SEED: u64 = 42;

/// Simulation parameters, keyed by their ALPS names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Inverse temperature; imaginary time runs over `[0, BETA)`.
    #[serde(rename = "BETA")]
    pub beta: f64,
    /// Sweeps discarded before measuring.
    #[serde(rename = "THERMALIZATION")]
    pub thermalization: u64,
    /// Sweep budget after thermalization.
    #[serde(rename = "SWEEPS")]
    pub sweeps: u64,
    /// Number of spin-orbitals.
    #[serde(rename = "N_ORBITALS")]
    pub n_orbitals: usize,
    /// Kernel invocations per unit of work.
    #[serde(rename = "N_MEAS")]
    pub n_meas: u64,
    /// Wall-clock budget per worker, in seconds.
    #[serde(rename = "MAX_TIME", default = "default_max_time")]
    pub max_time: u64,
    /// Enables the orbital swap move.
    #[serde(rename = "SPINFLIP", default)]
    pub spin_flip: bool,
    /// Enables the global pair flip move.
    #[serde(rename = "GLOBALFLIP", default)]
    pub global_flip: bool,
    /// Imaginary-time measurements.
    #[serde(rename = "MEASURE_time", default)]
    pub measure_time: bool,
    /// Matsubara-frequency measurements.
    #[serde(rename = "MEASURE_freq", default)]
    pub measure_freq: bool,
    /// Legendre-coefficient measurements.
    #[serde(rename = "MEASURE_legendre", default)]
    pub measure_legendre: bool,
    /// Static density-density correlator.
    #[serde(rename = "MEASURE_nn", default)]
    pub measure_nn: bool,
    /// Density-density correlator in imaginary time.
    #[serde(rename = "MEASURE_nnt", default)]
    pub measure_nnt: bool,
    /// Density-density correlator in bosonic frequencies.
    #[serde(rename = "MEASURE_nnw", default)]
    pub measure_nnw: bool,
    /// Two-particle Green's function.
    #[serde(rename = "MEASURE_g2w", default)]
    pub measure_g2w: bool,
    /// Two-particle H correlator.
    #[serde(rename = "MEASURE_h2w", default)]
    pub measure_h2w: bool,
    /// Occupation-sector statistics.
    #[serde(rename = "MEASURE_sector_statistics", default)]
    pub measure_sector_statistics: bool,
    /// Fermionic Matsubara frequencies.
    #[serde(rename = "N_MATSUBARA", default)]
    pub n_matsubara: Option<u32>,
    /// Legendre coefficients.
    #[serde(rename = "N_LEGENDRE", default)]
    pub n_legendre: Option<u32>,
    /// Time points of the density-density correlator.
    #[serde(rename = "N_nn", default)]
    pub n_nn: Option<u32>,
    /// Bosonic Matsubara frequencies.
    #[serde(rename = "N_W", default)]
    pub n_bosonic: Option<u32>,
    /// Fermionic frequencies of two-particle measurements.
    #[serde(rename = "N_w2", default)]
    pub n_w2: Option<u32>,
    /// Imaginary-time grid points.
    #[serde(rename = "N_TAU", default)]
    pub n_tau: Option<u32>,
    /// Length of the per-orbital expansion order histogram.
    #[serde(rename = "N_HISTOGRAM_ORDERS", default = "default_histogram_orders")]
    pub n_histogram_orders: usize,
    /// Requests vertex evaluation from the two-particle measurements.
    #[serde(rename = "COMPUTE_VERTEX", default)]
    pub compute_vertex: bool,
    /// Startup and measurement diagnostics.
    #[serde(rename = "VERBOSE", default = "default_verbose")]
    pub verbose: bool,
    /// Chemical potential applied to every orbital.
    #[serde(rename = "MU", default)]
    pub mu: f64,
    /// Per-orbital chemical potential; overrides `MU`.
    #[serde(rename = "MU_VECTOR", default)]
    pub mu_vector: Option<Vec<f64>>,
    /// Intra-band interaction.
    #[serde(rename = "U", default)]
    pub u: f64,
    /// Inter-band interaction.
    #[serde(rename = "Uprime", default)]
    pub u_prime: f64,
    /// Hund's coupling of the density-density interaction.
    #[serde(rename = "J", default)]
    pub j: f64,
    /// Explicit interaction matrix; overrides `U`, `Uprime` and `J`.
    #[serde(rename = "U_MATRIX", default)]
    pub u_matrix: Option<Vec<Vec<f64>>>,
    /// Bath level energies.
    #[serde(rename = "BATH_LEVELS", default = "default_bath_levels")]
    pub bath_levels: Vec<f64>,
    /// Bath hoppings, one per level.
    #[serde(rename = "BATH_HOPPINGS", default = "default_bath_hoppings")]
    pub bath_hoppings: Vec<f64>,
    /// Master RNG seed.
    #[serde(rename = "SEED", default = "default_seed")]
    pub seed: u64,
    /// Move selection weights.
    #[serde(rename = "MOVE_WEIGHTS", default)]
    pub move_weights: MoveWeights,
}

fn default_max_time() -> u64 {
    60
}

fn default_histogram_orders() -> usize {
    200
}

fn default_verbose() -> bool {
    true
}

fn default_bath_levels() -> Vec<f64> {
    vec![0.0]
}

fn default_bath_hoppings() -> Vec<f64> {
    vec![1.0]
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            beta: 10.0,
            thermalization: 100,
            sweeps: 1000,
            n_orbitals: 2,
            n_meas: 10,
            max_time: default_max_time(),
            spin_flip: false,
            global_flip: false,
            measure_time: false,
            measure_freq: false,
            measure_legendre: false,
            measure_nn: false,
            measure_nnt: false,
            measure_nnw: false,
            measure_g2w: false,
            measure_h2w: false,
            measure_sector_statistics: false,
            n_matsubara: None,
            n_legendre: None,
            n_nn: None,
            n_bosonic: None,
            n_w2: None,
            n_tau: None,
            n_histogram_orders: default_histogram_orders(),
            compute_vertex: false,
            verbose: default_verbose(),
            mu: 0.0,
            mu_vector: None,
            u: 0.0,
            u_prime: 0.0,
            j: 0.0,
            u_matrix: None,
            bath_levels: default_bath_levels(),
            bath_hoppings: default_bath_hoppings(),
            seed: default_seed(),
            move_weights: MoveWeights::default(),
        }
    }
}

impl SimulationParams {
    /// Parses parameters from a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, HybError> {
        serde_yaml::from_str(text).map_err(|err| {
            HybError::Serde(
                ErrorInfo::new("params-parse", err.to_string())
                    .with_hint("parameter keys use their ALPS names, e.g. BETA, N_MEAS"),
            )
        })
    }

    /// Loads parameters from a YAML file.
    pub fn load(path: &Path) -> Result<Self, HybError> {
        let text = fs::read_to_string(path).map_err(|err| {
            HybError::Serde(
                ErrorInfo::new("params-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Checks the parameter set. The first violated rule is reported.
    pub fn validate(&self) -> Result<(), HybError> {
        self.validate_measurements()?;
        self.validate_model()?;
        MoveSchedule::new(&self.move_weights, self.spin_flip, self.global_flip)?;
        Ok(())
    }

    fn validate_measurements(&self) -> Result<(), HybError> {
        if self.measure_freq && self.n_matsubara.is_none() {
            return Err(missing(
                "N_MATSUBARA",
                "please specify parameter N_MATSUBARA for # of Matsubara frequencies to be measured",
            ));
        }
        if self.measure_legendre && self.n_legendre.is_none() {
            return Err(missing(
                "N_LEGENDRE",
                "please specify parameter N_LEGENDRE for # of Legendre coefficients to be measured",
            ));
        }
        if self.measure_legendre && self.n_matsubara.is_none() {
            return Err(missing(
                "N_MATSUBARA",
                "please specify parameter N_MATSUBARA for # of Matsubara frequencies",
            ));
        }
        if self.measure_nnt && self.n_nn.is_none() {
            return Err(missing(
                "N_nn",
                "please specify the parameter N_nn for # of imaginary time points for the density-density correlator",
            ));
        }
        if self.measure_nnw && self.n_bosonic.is_none() {
            return Err(missing(
                "N_W",
                "please specify the parameter N_W for # of bosonic frequencies for the density-density correlator",
            ));
        }
        if self.measure_g2w || self.measure_h2w {
            let Some(n_w2) = self.n_w2 else {
                return Err(missing(
                    "N_w2",
                    "please specify the parameter N_w2 for # of fermionic Matsubara frequencies for two-particle functions",
                ));
            };
            if self.n_bosonic.is_none() {
                return Err(missing(
                    "N_W",
                    "please specify the parameter N_W for # of bosonic Matsubara frequencies for two-particle functions",
                ));
            }
            if n_w2 % 2 != 0 {
                return Err(HybError::Config(
                    ErrorInfo::new("n-w2-odd", "parameter N_w2 must be even")
                        .with_context("parameter", "N_w2")
                        .with_context("value", n_w2.to_string()),
                ));
            }
        }
        if self.compute_vertex {
            if !self.measure_freq {
                return Err(HybError::Config(
                    ErrorInfo::new(
                        "vertex-requires-freq",
                        "frequency measurement is required for computing the vertex, please set MEASURE_freq=1",
                    )
                    .with_context("parameter", "MEASURE_freq"),
                ));
            }
            if !(self.measure_g2w || self.measure_h2w) {
                return Err(HybError::Config(
                    ErrorInfo::new(
                        "vertex-requires-two-particle",
                        "at least one two-particle quantity is required for computing the vertex, set MEASURE_g2w=1 or MEASURE_h2w=1",
                    )
                    .with_context("parameter", "MEASURE_g2w"),
                ));
            }
            let required = i64::from(self.n_w2.unwrap_or(0)) / 2
                + i64::from(self.n_bosonic.unwrap_or(0))
                - 1;
            let available = i64::from(self.n_matsubara.unwrap_or(0));
            if available < required {
                return Err(HybError::Config(
                    ErrorInfo::new(
                        "vertex-n-matsubara",
                        "for computing the vertex, N_MATSUBARA must be at least N_w2/2+N_W-1",
                    )
                    .with_context("parameter", "N_MATSUBARA")
                    .with_context("value", available.to_string())
                    .with_context("required", required.to_string()),
                ));
            }
        }
        Ok(())
    }

    fn validate_model(&self) -> Result<(), HybError> {
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(HybError::Config(
                ErrorInfo::new("beta-invalid", "BETA must be finite and positive")
                    .with_context("value", self.beta.to_string()),
            ));
        }
        if self.n_orbitals == 0 {
            return Err(HybError::config(
                "n-orbitals-zero",
                "N_ORBITALS must be at least 1",
            ));
        }
        if self.n_meas == 0 {
            return Err(HybError::config("n-meas-zero", "N_MEAS must be at least 1"));
        }
        if let Some(mu) = &self.mu_vector {
            if mu.len() != self.n_orbitals {
                return Err(HybError::Config(
                    ErrorInfo::new("mu-vector-length", "MU_VECTOR needs one entry per orbital")
                        .with_context("len", mu.len().to_string())
                        .with_context("n_orbitals", self.n_orbitals.to_string()),
                ));
            }
        }
        self.interaction()?;
        self.bath()?;
        Ok(())
    }

    /// Chemical potential of every orbital.
    pub fn mu_values(&self) -> Vec<f64> {
        match &self.mu_vector {
            Some(mu) => mu.clone(),
            None => vec![self.mu; self.n_orbitals],
        }
    }

    /// Interaction matrix from `U_MATRIX`, or built from `U`, `Uprime` and `J`.
    pub fn interaction(&self) -> Result<InteractionMatrix, HybError> {
        match &self.u_matrix {
            Some(rows) => {
                let matrix = InteractionMatrix::from_rows(rows)?;
                if matrix.n_orbitals() != self.n_orbitals {
                    return Err(HybError::Config(
                        ErrorInfo::new("u-matrix-shape", "U_MATRIX must be N_ORBITALS x N_ORBITALS")
                            .with_context("rows", matrix.n_orbitals().to_string())
                            .with_context("n_orbitals", self.n_orbitals.to_string()),
                    ));
                }
                Ok(matrix)
            }
            None => Ok(InteractionMatrix::kanamori(
                self.n_orbitals,
                self.u,
                self.u_prime,
                self.j,
            )),
        }
    }

    /// Discrete bath described by `BATH_LEVELS` and `BATH_HOPPINGS`.
    pub fn bath(&self) -> Result<DiscreteBath, HybError> {
        DiscreteBath::new(
            self.beta,
            self.bath_levels.clone(),
            self.bath_hoppings.clone(),
        )
    }

    /// Startup lines naming the explicit model inputs in use.
    pub fn input_announcements(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(rows) = &self.u_matrix {
            lines.push(format!(
                "reading U matrix from U_MATRIX ({} x {})",
                rows.len(),
                rows.first().map_or(0, Vec::len)
            ));
        }
        if let Some(mu) = &self.mu_vector {
            lines.push(format!("reading MU vector from MU_VECTOR ({} entries)", mu.len()));
        }
        lines
    }

    /// Measurement channels and their companion sizes.
    pub fn channels(&self) -> MeasurementChannels {
        MeasurementChannels::from_params(self)
    }
}

fn missing(parameter: &str, message: &str) -> HybError {
    HybError::Config(
        ErrorInfo::new(
            format!("missing-{}", parameter.to_lowercase().replace('_', "-")),
            message,
        )
        .with_context("parameter", parameter),
    )
}
