use hyb_core::errors::ErrorInfo;
use hyb_core::HybError;
use serde::{Deserialize, Serialize};

/// Discrete bath of levels `eps_p` coupled with hoppings `V_p`.
///
/// The hybridization function is
/// `F(tau) = sum_p V_p^2 exp(-eps_p (beta - tau)) / (1 + exp(-beta eps_p))`
/// for `0 <= tau < beta`, continued antiperiodically to negative times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteBath {
    beta: f64,
    levels: Vec<f64>,
    hoppings: Vec<f64>,
}

impl DiscreteBath {
    /// Creates a bath. Levels and hoppings must pair up one to one.
    pub fn new(beta: f64, levels: Vec<f64>, hoppings: Vec<f64>) -> Result<Self, HybError> {
        if !(beta.is_finite() && beta > 0.0) {
            return Err(HybError::Config(
                ErrorInfo::new("bath-beta", "bath requires a finite positive BETA")
                    .with_context("beta", beta.to_string()),
            ));
        }
        if levels.is_empty() || levels.len() != hoppings.len() {
            return Err(HybError::Config(
                ErrorInfo::new(
                    "bath-shape",
                    "BATH_LEVELS and BATH_HOPPINGS must be non-empty and of equal length",
                )
                .with_context("levels", levels.len().to_string())
                .with_context("hoppings", hoppings.len().to_string()),
            ));
        }
        Ok(Self {
            beta,
            levels,
            hoppings,
        })
    }

    /// Inverse temperature.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Evaluates `F(tau)` for `tau` in `(-beta, beta)`.
    pub fn evaluate(&self, tau: f64) -> f64 {
        if tau < 0.0 {
            return -self.evaluate(tau + self.beta);
        }
        self.levels
            .iter()
            .zip(&self.hoppings)
            .map(|(&eps, &v)| v * v * propagator(eps, tau, self.beta))
            .sum()
    }
}

// Both branches keep every exponent non-positive.
fn propagator(eps: f64, tau: f64, beta: f64) -> f64 {
    if eps >= 0.0 {
        (-eps * (beta - tau)).exp() / (1.0 + (-beta * eps).exp())
    } else {
        (eps * tau).exp() / (1.0 + (beta * eps).exp())
    }
}
