//! Binary sign-flip mixing: every element at an odd absolute index is negated.
//!
//! The map is an involution, so the same pass serves as its own inverse.
//! Parity always comes from the element's offset in the whole buffer, never
//! from its offset within a dispatched chunk.

use crate::field::FieldElement;
use crate::scheduler::{ChunkScheduler, DispatchSummary};

#[inline]
pub fn flip_at(index: usize, value: &FieldElement) -> FieldElement {
    if index & 1 == 1 { value.neg() } else { *value }
}

pub fn binary_transform(
    data: &mut [FieldElement],
    scheduler: &ChunkScheduler,
) -> Option<DispatchSummary> {
    scheduler.for_each_indexed(data, |index, value| *value = flip_at(index, value))
}

pub fn inverse_binary_transform(
    data: &mut [FieldElement],
    scheduler: &ChunkScheduler,
) -> Option<DispatchSummary> {
    binary_transform(data, scheduler)
}
