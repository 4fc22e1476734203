//! Deterministic RNG wrapper and seed-derivation helpers.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Deterministic RNG handle used by every Monte Carlo worker.
///
/// A thin wrapper around `StdRng`. Each worker seeds its handle from the
/// master seed and its pool rank via [`derive_substream_seed`], which hashes
/// `(master_seed, substream_id)` with SipHash-1-3 under fixed zero keys. The
/// rule is stable across platforms, so a worker's chain is reproducible from
/// `(SEED, rank)` alone.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws a uniform variate in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws a uniform variate in `[0, upper)`.
    pub fn uniform_below(&mut self, upper: f64) -> f64 {
        self.uniform() * upper
    }

    /// Draws a uniform variate in `(0, upper]`.
    ///
    /// Segment lengths use this form so that a proposal never produces a
    /// zero-length interval.
    pub fn uniform_open_below(&mut self, upper: f64) -> f64 {
        (1.0 - self.uniform()) * upper
    }

    /// Draws a uniform index in `0..len`. `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Returns a mutable reference to the underlying RNG for distribution sampling.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
