//! Deterministic RNG streams for synthetic backfill.
//!
//! A master seed is expanded into one sub-seed per source via BLAKE3, so the
//! three extractors draw from independent streams and produce the same rows
//! whether they run sequentially or concurrently.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Per-source RNG derivation from a single master seed.
#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive the sub-seed for a named source.
    pub fn sub_seed(&self, source: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(source.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Seeded StdRng for a named source.
    pub fn rng_for(&self, source: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(source))
    }
}

/// RNG for a source: seeded when a master seed is configured, otherwise from entropy.
pub fn source_rng(seed: Option<u64>, source: &str) -> StdRng {
    match seed {
        Some(seed) => SeedHierarchy::new(seed).rng_for(source),
        None => StdRng::from_entropy(),
    }
}
