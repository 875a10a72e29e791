use std::fmt;

use log::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::alignment::AlignmentFactor;
use crate::buffer::{Buffer, decode_elements, encode, try_decode_elements};
use crate::error::ForeError;
use crate::field::{FieldElement, PHI_ORDER, ensure_field_invariant};
use crate::rng::secure_key;
use crate::scheduler::{ChunkScheduler, SchedulerParams};
use crate::transform::{binary_transform, flip_at, inverse_binary_transform};

/// Key holder for stored buffers. Immutable once initialized; the cached
/// factor is shared read-only by every operation.
#[derive(Clone)]
pub struct Session {
    exponent: u64,
    factor: AlignmentFactor,
    scheduler: ChunkScheduler,
}

impl Session {
    /// Accepts keys in `[1, 2^32)`, one per distinct alignment factor.
    /// Anything outside that range is rejected as `InvalidKey`.
    pub fn initialize(key: i64) -> Result<Self, ForeError> {
        match u64::try_from(key) {
            Ok(exponent) if (1..PHI_ORDER).contains(&exponent) => Self::from_exponent(exponent),
            _ => Err(ForeError::InvalidKey {
                reason: "key must lie in [1, 2^32)",
            }),
        }
    }

    /// Accepts any exponent and reduces it modulo the order of `φ`, so
    /// congruent exponents open the same session.
    pub fn from_exponent(exponent: u64) -> Result<Self, ForeError> {
        ensure_field_invariant()?;
        let exponent = exponent % PHI_ORDER;
        let factor = AlignmentFactor::derive(exponent);
        if factor.is_identity() {
            return Err(ForeError::InvalidKey {
                reason: "key yields the identity alignment factor",
            });
        }
        let scheduler = ChunkScheduler::default();
        debug!(
            "session initialized workers={} min_chunk={} target_chunk={}",
            scheduler.params().workers,
            scheduler.params().min_chunk_len,
            scheduler.params().target_chunk_len
        );
        Ok(Self {
            exponent,
            factor,
            scheduler,
        })
    }

    /// Fresh session from the OS RNG, returned with its key.
    pub fn generate() -> Result<(Self, u64), ForeError> {
        let key = secure_key();
        Ok((Self::from_exponent(key)?, key))
    }

    pub fn with_scheduler(mut self, params: SchedulerParams) -> Self {
        self.scheduler = ChunkScheduler::new(params);
        self
    }

    pub fn scheduler(&self) -> &ChunkScheduler {
        &self.scheduler
    }

    pub fn alignment_factor(&self) -> FieldElement {
        self.factor.forward()
    }

    /// 32 bytes bound to this key and `context`, for collaborators that need
    /// key material without the exponent itself.
    pub fn derive_subkey(&self, context: &str) -> Zeroizing<[u8; 32]> {
        let mut material = self.exponent.to_le_bytes();
        let key = Zeroizing::new(blake3::derive_key(context, &material));
        material.zeroize();
        key
    }

    pub fn encode(&self, raw: &[u8]) -> Buffer {
        encode(raw)
    }

    /// Encode followed by [`Session::to_stored_form`].
    pub fn store(&self, raw: &[u8]) -> Buffer {
        self.to_stored_form(encode(raw))
    }

    /// Binary transform, then masking. The only representation that may be
    /// persisted or handed out.
    pub fn to_stored_form(&self, mut buffer: Buffer) -> Buffer {
        let data = buffer.as_mut_slice();
        if binary_transform(data, &self.scheduler).is_none() {
            return buffer;
        }
        let summary = self.factor.mask(data, &self.scheduler);
        if let Some(summary) = summary {
            debug!(
                "stored form elements={} chunks={}",
                summary.elements, summary.chunks
            );
        }
        buffer
    }

    /// Opens a transient plaintext-form view of `buffer` for `op`. The
    /// buffer is returned to stored form on every exit path, including a
    /// panic inside `op`.
    pub fn with_aligned_view<R, F>(&self, buffer: &mut Buffer, op: F) -> R
    where
        F: FnOnce(&mut AlignedView<'_>) -> R,
    {
        let guard = AlignedGuard::open(self, buffer);
        let mut view = AlignedView {
            elements: guard.buffer.as_mut_slice(),
        };
        op(&mut view)
    }

    /// Plaintext bytes of a stored buffer, leaving it in stored form.
    pub fn reconstruct(&self, buffer: &mut Buffer) -> Vec<u8> {
        self.with_aligned_view(buffer, |view| view.decode())
    }

    pub fn try_reconstruct(&self, buffer: &mut Buffer) -> Result<Vec<u8>, ForeError> {
        self.with_aligned_view(buffer, |view| view.try_decode())
    }

    /// Writes `value` at `position` directly in stored form, without
    /// unmasking the rest of the buffer.
    pub fn edit_stored(
        &self,
        buffer: &mut Buffer,
        position: usize,
        value: FieldElement,
    ) -> Result<(), ForeError> {
        let len = buffer.len();
        let slot = buffer
            .as_mut_slice()
            .get_mut(position)
            .ok_or(ForeError::OutOfRange { position, len })?;
        *slot = self.factor.mask_value(&flip_at(position, &value));
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.exponent.zeroize();
    }
}

struct AlignedGuard<'a> {
    session: &'a Session,
    buffer: &'a mut Buffer,
}

impl<'a> AlignedGuard<'a> {
    fn open(session: &'a Session, buffer: &'a mut Buffer) -> Self {
        let data = buffer.as_mut_slice();
        session.factor.unmask(data, &session.scheduler);
        inverse_binary_transform(data, &session.scheduler);
        debug!("aligned view opened elements={}", buffer.len());
        Self { session, buffer }
    }
}

impl Drop for AlignedGuard<'_> {
    fn drop(&mut self) {
        let data = self.buffer.as_mut_slice();
        binary_transform(data, &self.session.scheduler);
        self.session.factor.mask(data, &self.session.scheduler);
        debug!("aligned view closed elements={}", self.buffer.len());
    }
}

/// Plaintext-form access to a buffer, valid only inside
/// [`Session::with_aligned_view`].
pub struct AlignedView<'a> {
    elements: &'a mut [FieldElement],
}

impl AlignedView<'_> {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<FieldElement> {
        self.elements.get(position).copied()
    }

    pub fn as_slice(&self) -> &[FieldElement] {
        self.elements
    }

    /// Replaces one element. Out-of-range positions leave the view untouched.
    pub fn edit_at(&mut self, position: usize, new_value: FieldElement) -> Result<(), ForeError> {
        let len = self.elements.len();
        let slot = self
            .elements
            .get_mut(position)
            .ok_or(ForeError::OutOfRange { position, len })?;
        *slot = new_value;
        Ok(())
    }

    pub fn decode(&self) -> Vec<u8> {
        decode_elements(self.elements)
    }

    pub fn try_decode(&self) -> Result<Vec<u8>, ForeError> {
        try_decode_elements(self.elements)
    }
}
