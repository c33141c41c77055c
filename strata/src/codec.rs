//! The wire format used to hand literals and matches to and from the batch executor.
//!
//! Everything is little-endian and length-prefixed:
//!
//! ```text
//! u32 path count
//!   u32 path length, path bytes (UTF-8)
//!   u32 record count
//!     records
//! ```
//!
//! A literal record is a `u32` length followed by the bytes, a match record is
//! `u64 offset, u64 length`.

use std::collections::BTreeMap;

use crate::{
    error::StrataError,
    resolver::{
        MatchResult,
        PositionsByPath,
    },
};

/// The literals of every object, keyed by object path
pub type LiteralsByPath = BTreeMap<String, Vec<Vec<u8>>>;

/// Anything that can be stored as a record in a path map
pub trait Record: Sized {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), StrataError>;
    fn decode(input: &mut Decoder<'_>) -> Result<Self, StrataError>;
}

fn length_prefix(len: usize) -> Result<u32, StrataError> {
    u32::try_from(len).map_err(|_| StrataError::Encode(format!("{len} does not fit into a u32 length prefix")))
}

fn put_u32(out: &mut Vec<u8>, len: usize) -> Result<(), StrataError> {
    out.extend_from_slice(&length_prefix(len)?.to_le_bytes());
    Ok(())
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), StrataError> {
    put_u32(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

pub struct Decoder<'a> {
    input: &'a [u8],
    cursor: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            cursor: 0,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StrataError> {
        let end = self.cursor.checked_add(len).filter(|x| *x <= self.input.len()).ok_or_else(|| StrataError::Decode(format!("truncated input: need {} bytes at offset {}", len, self.cursor)))?;
        let ret = &self.input[self.cursor..end];
        self.cursor = end;
        Ok(ret)
    }

    pub fn u32(&mut self) -> Result<u32, StrataError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn u64(&mut self) -> Result<u64, StrataError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], StrataError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == self.input.len()
    }
}

impl Record for Vec<u8> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), StrataError> {
        put_bytes(out, self)
    }

    fn decode(input: &mut Decoder<'_>) -> Result<Self, StrataError> {
        Ok(input.bytes()?.to_vec())
    }
}

impl Record for MatchResult {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), StrataError> {
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.length.to_le_bytes());
        Ok(())
    }

    fn decode(input: &mut Decoder<'_>) -> Result<Self, StrataError> {
        Ok(MatchResult {
            offset: input.u64()?,
            length: input.u64()?,
        })
    }
}

pub fn encode_map<R: Record>(map: &BTreeMap<String, Vec<R>>) -> Result<Vec<u8>, StrataError> {
    let mut out = Vec::new();
    put_u32(&mut out, map.len())?;

    for (path, records) in map {
        put_bytes(&mut out, path.as_bytes())?;
        put_u32(&mut out, records.len())?;

        for record in records {
            record.encode(&mut out)?;
        }
    }

    Ok(out)
}

pub fn decode_map<R: Record>(input: &[u8]) -> Result<BTreeMap<String, Vec<R>>, StrataError> {
    let mut decoder = Decoder::new(input);
    let mut ret = BTreeMap::<String, Vec<R>>::new();

    for _ in 0..decoder.u32()? {
        let path = std::str::from_utf8(decoder.bytes()?).map_err(|_| StrataError::Decode("path is not valid UTF-8".to_string()))?.to_string();
        let count = decoder.u32()?;
        let records = ret.entry(path).or_default();

        for _ in 0..count {
            records.push(R::decode(&mut decoder)?);
        }
    }

    if !decoder.is_empty() {
        return Err(StrataError::Decode("trailing bytes after the last path".to_string()));
    }

    Ok(ret)
}

pub fn encode_literals(literals: &LiteralsByPath) -> Result<Vec<u8>, StrataError> {
    encode_map(literals)
}

pub fn decode_literals(input: &[u8]) -> Result<LiteralsByPath, StrataError> {
    decode_map(input)
}

pub fn encode_positions(positions: &PositionsByPath) -> Result<Vec<u8>, StrataError> {
    encode_map(positions)
}

pub fn decode_positions(input: &[u8]) -> Result<PositionsByPath, StrataError> {
    decode_map(input)
}
