//! Byte packing into field elements.
//!
//! Each element carries six bytes: bytes `0..3` little-endian in `a`, bytes
//! `3..6` in `b`, so every component stays below `2^24 < p`. Input is always
//! padded with `n` bytes, `1 <= n <= 6`, to a multiple of six. Pad bytes are
//! zero except the last, which holds `n`. Encoding `L` bytes therefore
//! produces `L / 6 + 1` elements.

use zeroize::Zeroize;

use crate::error::ForeError;
use crate::field::FieldElement;

pub const BYTES_PER_COMPONENT: usize = 3;
pub const BYTES_PER_ELEMENT: usize = 2 * BYTES_PER_COMPONENT;
const COMPONENT_MASK: u32 = (1 << (8 * BYTES_PER_COMPONENT)) - 1;

/// Ordered, fixed-length sequence of field elements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buffer {
    elements: Vec<FieldElement>,
}

impl Buffer {
    pub fn from_elements(elements: Vec<FieldElement>) -> Self {
        Self { elements }
    }

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
        &self.elements
    }

    /// Mutable element access. The length cannot change through a slice.
    pub fn as_mut_slice(&mut self) -> &mut [FieldElement] {
        &mut self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldElement> + '_ {
        self.elements.iter()
    }

    pub fn into_elements(mut self) -> Vec<FieldElement> {
        std::mem::take(&mut self.elements)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.elements.zeroize();
    }
}

impl From<Vec<FieldElement>> for Buffer {
    fn from(elements: Vec<FieldElement>) -> Self {
        Self::from_elements(elements)
    }
}

pub fn encoded_len(raw_len: usize) -> usize {
    raw_len / BYTES_PER_ELEMENT + 1
}

pub fn encode(raw: &[u8]) -> Buffer {
    let pad = BYTES_PER_ELEMENT - raw.len() % BYTES_PER_ELEMENT;
    let mut elements = Vec::with_capacity(encoded_len(raw.len()));
    let mut blocks = raw.chunks_exact(BYTES_PER_ELEMENT);
    for block in blocks.by_ref() {
        elements.push(pack(block));
    }
    let mut tail = [0u8; BYTES_PER_ELEMENT];
    let rest = blocks.remainder();
    tail[..rest.len()].copy_from_slice(rest);
    tail[BYTES_PER_ELEMENT - 1] = pad as u8;
    elements.push(pack(&tail));
    tail.zeroize();
    Buffer::from_elements(elements)
}

/// Total inverse of [`encode`]. Components are truncated to 24 bits and a
/// trailing pad is stripped when its length byte is plausible, so a buffer
/// that was not produced by `encode` still yields bytes.
pub fn decode(buffer: &Buffer) -> Vec<u8> {
    decode_elements(buffer.as_slice())
}

pub fn decode_elements(elements: &[FieldElement]) -> Vec<u8> {
    let mut out = unpack_all(elements);
    if let Some(&last) = out.last() {
        let pad = last as usize;
        if (1..=BYTES_PER_ELEMENT).contains(&pad) && pad <= out.len() {
            out.truncate(out.len() - pad);
        }
    }
    out
}

/// Strict inverse of [`encode`]: rejects anything `encode` cannot produce.
pub fn try_decode(buffer: &Buffer) -> Result<Vec<u8>, ForeError> {
    try_decode_elements(buffer.as_slice())
}

pub fn try_decode_elements(elements: &[FieldElement]) -> Result<Vec<u8>, ForeError> {
    if elements.is_empty() {
        return Err(ForeError::MalformedEncoding("missing padding element"));
    }
    if elements
        .iter()
        .any(|e| e.a() > COMPONENT_MASK || e.b() > COMPONENT_MASK)
    {
        return Err(ForeError::MalformedEncoding("component exceeds 24 bits"));
    }
    let mut out = unpack_all(elements);
    let pad = out[out.len() - 1] as usize;
    if !(1..=BYTES_PER_ELEMENT).contains(&pad) {
        return Err(ForeError::MalformedEncoding("invalid pad length"));
    }
    let body = out.len() - pad;
    if out[body..out.len() - 1].iter().any(|&byte| byte != 0) {
        return Err(ForeError::MalformedEncoding("non-zero pad bytes"));
    }
    out.truncate(body);
    Ok(out)
}

fn pack(block: &[u8]) -> FieldElement {
    let a = u32::from_le_bytes([block[0], block[1], block[2], 0]);
    let b = u32::from_le_bytes([block[3], block[4], block[5], 0]);
    FieldElement::new(a, b)
}

fn unpack_all(elements: &[FieldElement]) -> Vec<u8> {
    let mut out = Vec::with_capacity(elements.len() * BYTES_PER_ELEMENT);
    for element in elements {
        let a = (element.a() & COMPONENT_MASK).to_le_bytes();
        let b = (element.b() & COMPONENT_MASK).to_le_bytes();
        out.extend_from_slice(&a[..BYTES_PER_COMPONENT]);
        out.extend_from_slice(&b[..BYTES_PER_COMPONENT]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hello_packs_into_one_element() {
        let buffer = encode(b"HELLO");
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get(0), Some(FieldElement::new(4998472, 85836)));
        assert_eq!(decode(&buffer), b"HELLO");
        assert_eq!(try_decode(&buffer).unwrap(), b"HELLO");
    }

    #[test]
    fn lengths_follow_padding_rule() {
        for len in 0..40usize {
            let raw = vec![0xA5u8; len];
            let buffer = encode(&raw);
            assert_eq!(buffer.len(), encoded_len(len));
            assert_eq!(try_decode(&buffer).unwrap(), raw);
        }
        // full pad block for aligned input
        let buffer = encode(b"sixsix");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(1), Some(FieldElement::new(0, 6 << 16)));
    }

    #[test]
    fn empty_input_encodes_to_pad_block() {
        let buffer = encode(b"");
        assert_eq!(buffer.len(), 1);
        assert!(decode(&buffer).is_empty());
        assert!(try_decode(&buffer).unwrap().is_empty());
    }

    #[test]
    fn strict_decode_rejects_garbage() {
        let wide = Buffer::from_elements(vec![FieldElement::new(1 << 24, 0)]);
        assert!(matches!(
            try_decode(&wide),
            Err(ForeError::MalformedEncoding(_))
        ));
        let bad_len = Buffer::from_elements(vec![FieldElement::new(0, 7 << 16)]);
        assert!(try_decode(&bad_len).is_err());
        let dirty_pad = Buffer::from_elements(vec![FieldElement::new(0, (3 << 16) | 1)]);
        assert!(try_decode(&dirty_pad).is_err());
        assert!(try_decode(&Buffer::default()).is_err());
        assert!(decode(&Buffer::default()).is_empty());
    }

    #[test]
    fn lenient_decode_is_total() {
        let garbage = Buffer::from_elements(vec![FieldElement::new(u32::MAX, u32::MAX); 3]);
        let bytes = decode(&garbage);
        assert!(bytes.len() <= 18);
    }

    proptest! {
        #[test]
        fn encode_decode_exact(raw in prop::collection::vec(any::<u8>(), 0..512)) {
            let buffer = encode(&raw);
            prop_assert_eq!(buffer.len(), encoded_len(raw.len()));
            prop_assert_eq!(decode(&buffer), raw.clone());
            prop_assert_eq!(try_decode(&buffer).unwrap(), raw);
        }
    }
}
