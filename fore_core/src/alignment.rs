//! Keyed multiplicative masking of element sequences.
//!
//! A key `k` yields the factor `F = φ^k`. Masking multiplies every element of
//! a buffer by `F`; unmasking multiplies by `φ^(-k)`. One scalar covers the
//! whole buffer, so the ratio of any two masked elements equals the ratio of
//! their plaintexts: `F·m1 / F·m2 = m1 / m2`.

use zeroize::Zeroize;

use crate::field::{FieldElement, exp, exp_inverse, mul_ext, reduce_exponent};
use crate::scheduler::{ChunkScheduler, DispatchSummary};

/// Alignment factor `φ^k` with its inverse, derived once per key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentFactor {
    forward: FieldElement,
    inverse: FieldElement,
}

impl AlignmentFactor {
    pub fn derive(exponent: u64) -> Self {
        let k = reduce_exponent(exponent);
        Self {
            forward: exp(FieldElement::PHI, k),
            inverse: exp_inverse(FieldElement::PHI, k),
        }
    }

    pub fn forward(&self) -> FieldElement {
        self.forward
    }

    pub fn inverse(&self) -> FieldElement {
        self.inverse
    }

    pub fn is_identity(&self) -> bool {
        self.forward == FieldElement::ONE
    }

    pub fn mask_value(&self, value: &FieldElement) -> FieldElement {
        mul_ext(value, &self.forward)
    }

    pub fn unmask_value(&self, value: &FieldElement) -> FieldElement {
        mul_ext(value, &self.inverse)
    }

    /// Multiplies every element by `F`. `None` for an empty slice.
    pub fn mask(
        &self,
        data: &mut [FieldElement],
        scheduler: &ChunkScheduler,
    ) -> Option<DispatchSummary> {
        scale_all(data, &self.forward, scheduler)
    }

    /// Multiplies every element by `F^-1`. `None` for an empty slice.
    pub fn unmask(
        &self,
        data: &mut [FieldElement],
        scheduler: &ChunkScheduler,
    ) -> Option<DispatchSummary> {
        scale_all(data, &self.inverse, scheduler)
    }
}

impl Drop for AlignmentFactor {
    fn drop(&mut self) {
        self.forward.zeroize();
        self.inverse.zeroize();
    }
}

fn scale_all(
    data: &mut [FieldElement],
    factor: &FieldElement,
    scheduler: &ChunkScheduler,
) -> Option<DispatchSummary> {
    scheduler.for_each_chunk(data, |_, slice| {
        for value in slice.iter_mut() {
            *value = mul_ext(value, factor);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{GROUP_ORDER, P};
    use crate::scheduler::SchedulerParams;
    use proptest::prelude::*;

    fn sample(len: usize) -> Vec<FieldElement> {
        (0..len as u32)
            .map(|i| FieldElement::new(i.wrapping_mul(40503) ^ 0xABCD, i.rotate_left(7)))
            .collect()
    }

    #[test]
    fn known_factor_for_key_12345() {
        let factor = AlignmentFactor::derive(12345);
        assert_eq!(factor.forward(), FieldElement::new(489482394, 1453044987));
        assert_eq!(factor.inverse(), FieldElement::new(204956266, 1453044987));
        let product = mul_ext(&factor.forward(), &factor.inverse());
        assert_eq!(product, FieldElement::ONE);
    }

    #[test]
    fn derivation_is_deterministic_and_reduced() {
        assert_eq!(AlignmentFactor::derive(777), AlignmentFactor::derive(777));
        assert_eq!(
            AlignmentFactor::derive(777),
            AlignmentFactor::derive(777 + GROUP_ORDER)
        );
        assert!(AlignmentFactor::derive(0).is_identity());
        assert!(!AlignmentFactor::derive(1).is_identity());
    }

    #[test]
    fn mask_then_unmask_restores() {
        let factor = AlignmentFactor::derive(0xDEADBEEF);
        let scheduler = ChunkScheduler::default();
        let original = sample(2048);
        let mut data = original.clone();
        factor.mask(&mut data, &scheduler).unwrap();
        assert_ne!(data, original);
        factor.unmask(&mut data, &scheduler).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn masking_preserves_ratios() {
        let factor = AlignmentFactor::derive(4242);
        let m1 = FieldElement::new(11, 3);
        let m2 = FieldElement::new(5, 9);
        let c1 = factor.mask_value(&m1);
        let c2 = factor.mask_value(&m2);
        let masked_ratio = c1.mul(&c2.inverse().unwrap());
        let plain_ratio = m1.mul(&m2.inverse().unwrap());
        assert_eq!(masked_ratio, plain_ratio);
    }

    #[test]
    fn empty_is_noop() {
        let factor = AlignmentFactor::derive(9);
        let scheduler = ChunkScheduler::default();
        let mut data: Vec<FieldElement> = Vec::new();
        assert!(factor.mask(&mut data, &scheduler).is_none());
        assert!(factor.unmask(&mut data, &scheduler).is_none());
    }

    #[test]
    fn chunk_count_independent() {
        let factor = AlignmentFactor::derive(31337);
        let original = sample(5000);
        let outputs: Vec<_> = [1usize, 4, 64]
            .iter()
            .map(|&count| {
                let params = SchedulerParams::default().with_chunk_count(count);
                let scheduler = ChunkScheduler::new(params);
                let mut data = original.clone();
                let summary = factor.mask(&mut data, &scheduler).unwrap();
                assert_eq!(summary.chunks, count);
                data
            })
            .collect();
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[0], outputs[2]);
    }

    proptest! {
        #[test]
        fn round_trip_any_key(
            key in any::<u64>(),
            values in prop::collection::vec((0..P, 0..P), 1..64),
        ) {
            let factor = AlignmentFactor::derive(key);
            let original: Vec<_> = values
                .into_iter()
                .map(|(a, b)| FieldElement::new(a, b))
                .collect();
            let mut data = original.clone();
            let scheduler = ChunkScheduler::new(SchedulerParams::default().with_chunk_count(3));
            factor.mask(&mut data, &scheduler);
            factor.unmask(&mut data, &scheduler);
            prop_assert_eq!(data, original);
        }
    }
}
