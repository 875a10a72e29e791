//! Stored-buffer persistence.
//!
//! Binary layout, all little-endian:
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 4    | magic `b"FORE"`                |
//! | 4      | 2    | format version                 |
//! | 6      | 2    | reserved, zero                 |
//! | 8      | 8    | element count `n`              |
//! | 16     | 8·n  | `n` pairs of `(a: u32, b: u32)` |

use std::io::{Read, Write};

use log::debug;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::buffer::Buffer;
use crate::error::ForeError;
use crate::field::FieldElement;
use crate::versioning::{STORED_BUFFER_VERSION, check_version, expect_version};

pub const MAGIC: [u8; 4] = *b"FORE";
pub const HEADER_BYTES: usize = 16;
pub const ELEMENT_WIRE_BYTES: usize = 8;

pub fn to_bytes(buffer: &Buffer) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_BYTES + buffer.len() * ELEMENT_WIRE_BYTES);
    out.extend_from_slice(&header(buffer.len()));
    for element in buffer.iter() {
        out.extend_from_slice(&element.a().to_le_bytes());
        out.extend_from_slice(&element.b().to_le_bytes());
    }
    out
}

pub fn from_bytes(bytes: &[u8]) -> Result<Buffer, ForeError> {
    if bytes.len() < HEADER_BYTES {
        return Err(ForeError::CorruptStoredBuffer("truncated header"));
    }
    let (head, body) = bytes.split_at(HEADER_BYTES);
    let count = parse_header(head)?;
    let expected = payload_len(count)?;
    if body.len() != expected {
        return Err(ForeError::CorruptStoredBuffer("payload length mismatch"));
    }
    decode_pairs(body)
}

pub fn write_to<W: Write>(buffer: &Buffer, writer: &mut W) -> Result<(), ForeError> {
    writer.write_all(&header(buffer.len()))?;
    for element in buffer.iter() {
        writer.write_all(&element.a().to_le_bytes())?;
        writer.write_all(&element.b().to_le_bytes())?;
    }
    writer.flush()?;
    debug!("persisted stored buffer elements={}", buffer.len());
    Ok(())
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<Buffer, ForeError> {
    let mut head = [0u8; HEADER_BYTES];
    reader.read_exact(&mut head).map_err(truncated)?;
    let count = parse_header(&head)?;
    let expected = payload_len(count)?;
    let mut body = Vec::new();
    reader.take(expected as u64).read_to_end(&mut body)?;
    if body.len() != expected {
        return Err(ForeError::CorruptStoredBuffer("truncated payload"));
    }
    let buffer = decode_pairs(&body)?;
    debug!("loaded stored buffer elements={}", buffer.len());
    Ok(buffer)
}

fn truncated(err: std::io::Error) -> ForeError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ForeError::CorruptStoredBuffer("truncated header")
    } else {
        ForeError::Io(err)
    }
}

fn header(count: usize) -> [u8; HEADER_BYTES] {
    let mut head = [0u8; HEADER_BYTES];
    head[..4].copy_from_slice(&MAGIC);
    head[4..6].copy_from_slice(&STORED_BUFFER_VERSION.to_le_bytes());
    head[8..16].copy_from_slice(&(count as u64).to_le_bytes());
    head
}

fn parse_header(head: &[u8]) -> Result<usize, ForeError> {
    if head[..4] != MAGIC {
        return Err(ForeError::CorruptStoredBuffer("bad magic"));
    }
    let version = u16::from_le_bytes([head[4], head[5]]);
    check_version(version, STORED_BUFFER_VERSION, "StoredBuffer")?;
    if head[6] != 0 || head[7] != 0 {
        return Err(ForeError::CorruptStoredBuffer("reserved bytes set"));
    }
    let mut count = [0u8; 8];
    count.copy_from_slice(&head[8..16]);
    usize::try_from(u64::from_le_bytes(count))
        .map_err(|_| ForeError::CorruptStoredBuffer("element count overflows"))
}

fn payload_len(count: usize) -> Result<usize, ForeError> {
    count
        .checked_mul(ELEMENT_WIRE_BYTES)
        .ok_or(ForeError::CorruptStoredBuffer("element count overflows"))
}

fn decode_pairs(body: &[u8]) -> Result<Buffer, ForeError> {
    let elements = body
        .chunks_exact(ELEMENT_WIRE_BYTES)
        .map(|pair| {
            let a = u32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]);
            let b = u32::from_le_bytes([pair[4], pair[5], pair[6], pair[7]]);
            FieldElement::try_from_canonical(a, b)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Buffer::from_elements(elements))
}

impl Serialize for Buffer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Buffer", 2)?;
        state.serialize_field("version", &STORED_BUFFER_VERSION)?;
        state.serialize_field("elements", self.as_slice())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Buffer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            version: u16,
            elements: Vec<FieldElement>,
        }
        let helper = Helper::deserialize(deserializer)?;
        expect_version::<D::Error>(helper.version, STORED_BUFFER_VERSION, "Buffer")?;
        Ok(Buffer::from_elements(helper.elements))
    }
}
