//! Field-encoded buffers with keyed alignment.
//!
//! Raw bytes are packed into elements of `GF((2^31 - 1)^2)`, mixed by a
//! sign-flip transform and masked by a key-derived power of `φ`. Only a key
//! holder can open a scoped, plaintext-form view of a stored buffer.
//!
//! The masking is a single scalar per key and preserves element ratios. It
//! should **not** be relied on for confidentiality.

pub mod alignment;
pub mod buffer;
pub mod error;
pub mod field;
pub mod persist;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod signature;
pub mod transform;
pub mod versioning;

pub use crate::alignment::AlignmentFactor;
pub use crate::buffer::{Buffer, decode, encode, encoded_len, try_decode};
pub use crate::error::ForeError;
pub use crate::field::{
    ExtensionParams, FieldElement, GROUP_ORDER, P, PHI_ORDER, check_irreducible,
    ensure_field_invariant, exp, exp_inverse, mul_ext,
};
pub use crate::rng::{derive_key, secure_key};
pub use crate::scheduler::{Chunk, ChunkScheduler, DispatchSummary, SchedulerParams};
pub use crate::session::{AlignedView, Session};
pub use crate::signature::SignatureCapability;
#[cfg(feature = "signature")]
pub use crate::signature::{BufferSignature, KeyedDigestSigner};
pub use crate::transform::{binary_transform, inverse_binary_transform};
pub use crate::versioning::*;
