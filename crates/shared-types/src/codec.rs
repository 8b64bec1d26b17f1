//! # Wire Codec
//!
//! Little-endian primitive encoding and the versioned envelope that frames
//! every persisted structure.
//!
//! ## Envelope Layout
//!
//! ```text
//! [u8 struct_v][u8 compat_v][u32 LE payload_len][payload ...]
//! ```
//!
//! A reader accepts any envelope whose `compat_v` does not exceed the
//! version it understands. Payload bytes it does not consume (fields added
//! by a newer writer) are skipped, so older readers keep working.

use std::collections::HashSet;
use std::hash::Hash;

use bytes::{Buf, BufMut};
use tracing::trace;

use crate::errors::DecodeError;

/// Size of the envelope header in bytes.
pub const ENVELOPE_HEADER_LEN: usize = 6;

/// A value with a stable binary encoding.
pub trait Encode {
    /// Append the encoded form of `self` to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// A value that can be rebuilt from its [`Encode`] form.
pub trait Decode: Sized {
    /// Decode a value from the front of `buf`, advancing it past the bytes
    /// consumed.
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decode a value from a complete buffer. Trailing bytes are ignored.
    fn from_bytes(mut bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode(&mut bytes)
    }
}

/// Write an envelope around whatever `body` appends to `buf`.
pub fn encode_envelope<F>(buf: &mut Vec<u8>, struct_v: u8, compat_v: u8, body: F)
where
    F: FnOnce(&mut Vec<u8>),
{
    buf.put_u8(struct_v);
    buf.put_u8(compat_v);
    let len_pos = buf.len();
    buf.put_u32_le(0);

    body(buf);

    let len = (buf.len() - len_pos - 4) as u32;
    buf[len_pos..len_pos + 4].copy_from_slice(&len.to_le_bytes());
}

/// Read an envelope and hand its payload to `body`.
///
/// `body` receives the writer's `struct_v` and a cursor bounded to the
/// payload; it cannot read past the envelope. `buf` is advanced past the
/// whole envelope whether or not `body` consumed every payload byte.
pub fn decode_envelope<'a, T, F>(
    buf: &mut &'a [u8],
    what: &'static str,
    supported_v: u8,
    body: F,
) -> Result<T, DecodeError>
where
    F: FnOnce(u8, &mut &'a [u8]) -> Result<T, DecodeError>,
{
    let struct_v = get_u8(buf, what)?;
    let compat_v = get_u8(buf, what)?;
    if compat_v > supported_v {
        return Err(DecodeError::UnsupportedVersion {
            what,
            compat: compat_v,
            supported: supported_v,
        });
    }
    let len = get_u32(buf, what)? as usize;
    ensure_remaining(buf, len, what)?;

    let data: &'a [u8] = *buf;
    let (mut payload, rest) = data.split_at(len);
    let value = body(struct_v, &mut payload)?;
    if !payload.is_empty() {
        trace!(what, struct_v, skipped = payload.len(), "skipping unread envelope payload");
    }
    *buf = rest;
    Ok(value)
}

fn ensure_remaining(buf: &[u8], needed: usize, what: &'static str) -> Result<(), DecodeError> {
    if buf.len() < needed {
        return Err(DecodeError::InsufficientData {
            what,
            needed,
            remaining: buf.len(),
        });
    }
    Ok(())
}

pub fn get_u8(buf: &mut &[u8], what: &'static str) -> Result<u8, DecodeError> {
    ensure_remaining(buf, 1, what)?;
    Ok(buf.get_u8())
}

pub fn get_u16(buf: &mut &[u8], what: &'static str) -> Result<u16, DecodeError> {
    ensure_remaining(buf, 2, what)?;
    Ok(buf.get_u16_le())
}

pub fn get_u32(buf: &mut &[u8], what: &'static str) -> Result<u32, DecodeError> {
    ensure_remaining(buf, 4, what)?;
    Ok(buf.get_u32_le())
}

pub fn get_u64(buf: &mut &[u8], what: &'static str) -> Result<u64, DecodeError> {
    ensure_remaining(buf, 8, what)?;
    Ok(buf.get_u64_le())
}

pub fn get_i64(buf: &mut &[u8], what: &'static str) -> Result<i64, DecodeError> {
    ensure_remaining(buf, 8, what)?;
    Ok(buf.get_i64_le())
}

pub fn get_bool(buf: &mut &[u8], what: &'static str) -> Result<bool, DecodeError> {
    Ok(get_u8(buf, what)? != 0)
}

/// Read a `[u32 len][bytes]` blob.
pub fn get_bytes(buf: &mut &[u8], what: &'static str) -> Result<Vec<u8>, DecodeError> {
    let len = get_u32(buf, what)? as usize;
    ensure_remaining(buf, len, what)?;
    let out = buf[..len].to_vec();
    buf.advance(len);
    Ok(out)
}

/// Read a `[u32 len][utf-8 bytes]` string.
pub fn get_string(buf: &mut &[u8], what: &'static str) -> Result<String, DecodeError> {
    String::from_utf8(get_bytes(buf, what)?).map_err(|_| DecodeError::InvalidUtf8 { what })
}

pub fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.put_u32_le(bytes.len() as u32);
    buf.put_slice(bytes);
}

pub fn put_string(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

/// Read an element count and reject counts that could not possibly fit in
/// the remaining bytes, given that each element occupies at least
/// `min_elem_len` bytes.
pub fn get_count(
    buf: &mut &[u8],
    what: &'static str,
    min_elem_len: usize,
) -> Result<usize, DecodeError> {
    let count = get_u32(buf, what)? as usize;
    if count.saturating_mul(min_elem_len.max(1)) > buf.len() {
        return Err(DecodeError::malformed(format!(
            "{what}: {count} elements cannot fit in {} bytes",
            buf.len()
        )));
    }
    Ok(count)
}

impl Encode for u32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(*self);
    }
}

impl Decode for u32 {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        get_u32(buf, "u32")
    }
}

impl Encode for u64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u64_le(*self);
    }
}

impl Decode for u64 {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        get_u64(buf, "u64")
    }
}

/// Sets are `[u32 n][n elements]` in iteration order.
impl<T: Encode> Encode for HashSet<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.len() as u32);
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: Decode + Eq + Hash> Decode for HashSet<T> {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        let count = get_count(buf, "set", 1)?;
        let mut set = HashSet::with_capacity(count);
        for _ in 0..count {
            set.insert(T::decode(buf)?);
        }
        Ok(set)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.len() as u32);
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        let count = get_count(buf, "vec", 1)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(T::decode(buf)?);
        }
        Ok(out)
    }
}
