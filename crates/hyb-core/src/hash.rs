use sha2::{Digest, Sha256};

use crate::segment::OrbitalSegments;

/// Computes the canonical structural hash of a segment configuration.
///
/// Times are hashed by their IEEE-754 bit patterns, so two configurations
/// hash equal only if every endpoint is bit-identical.
pub fn canonical_hash(orbitals: &[OrbitalSegments]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((orbitals.len() as u64).to_le_bytes());
    for orbital in orbitals {
        hasher.update(orbital.beta().to_bits().to_le_bytes());
        if orbital.is_full_line() {
            hasher.update(b"full");
        } else {
            hasher.update(b"segments");
        }
        hasher.update((orbital.len() as u64).to_le_bytes());
        for segment in orbital.segments() {
            hasher.update(segment.t_start.to_bits().to_le_bytes());
            hasher.update(segment.t_end.to_bits().to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}
