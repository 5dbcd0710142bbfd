//! Session seed - the root of all randomness in a session.
//!
//! Each concern (catalog, composer, threat rolls) draws from its own
//! stream so that, for example, an extra threat roll never shifts the scene
//! layout of the same seed.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Generator used for every seeded stream in the crate
pub type SceneRng = Xoshiro256PlusPlus;

/// Independent randomness streams within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RngStream {
    Catalog,
    Composer,
    Threat,
    Containers,
}

impl RngStream {
    fn tag(&self) -> &'static [u8] {
        match self {
            Self::Catalog => b"catalog",
            Self::Composer => b"composer",
            Self::Threat => b"threat",
            Self::Containers => b"containers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSeed {
    pub seed: u64,
}

impl Default for SessionSeed {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl SessionSeed {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Deterministic stream hash from session seed and stream tag
    pub fn stream_hash(&self, stream: RngStream) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(stream.tag());
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[0..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng(&self, stream: RngStream) -> SceneRng {
        SceneRng::seed_from_u64(self.stream_hash(stream))
    }
}
