//! Key sampling helpers distinguishing reproducible and fresh keys.
//!
//! Reproducible keys come from a caller-provided seed and label through
//! BLAKE3, feeding the digest into `ChaCha20Rng`. Fresh keys draw from the
//! OS-backed `OsRng`.

use blake3::Hasher;
use rand::Rng;
use rand::rngs::OsRng;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};

use crate::field::PHI_ORDER;

/// Convenience alias for the OS-backed RNG used for fresh keys.
pub type SecureRng = OsRng;

pub fn secure_rng() -> SecureRng {
    OsRng
}

/// Uniform key in `[1, 2^32)`. Larger exponents only alias these.
pub fn random_key<R: CryptoRng + RngCore>(rng: &mut R) -> u64 {
    rng.gen_range(1..PHI_ORDER)
}

pub fn secure_key() -> u64 {
    random_key(&mut secure_rng())
}

/// Deterministic RNG bound to a seed and a label.
pub fn derive_key_rng(seed: &[u8], label: &[u8]) -> ChaCha20Rng {
    let mut hasher = Hasher::new();
    hasher.update(b"fore::key-seed");
    hasher.update(seed);
    hasher.update(label);
    let digest = hasher.finalize();
    let mut seed_material = [0u8; 32];
    seed_material.copy_from_slice(&digest.as_bytes()[..32]);
    ChaCha20Rng::from_seed(seed_material)
}

/// Reproducible exponent for `(seed, label)`.
pub fn derive_key(seed: &[u8], label: &[u8]) -> u64 {
    random_key(&mut derive_key_rng(seed, label))
}
