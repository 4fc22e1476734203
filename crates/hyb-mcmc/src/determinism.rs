use hyb_core::derive_substream_seed;

/// Seed of the Markov chain run by worker `rank`.
pub fn worker_seed(master_seed: u64, rank: usize) -> u64 {
    derive_substream_seed(master_seed, rank as u64)
}
