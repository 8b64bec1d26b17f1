//! Hash functions for the Bloom filter
//!
//! Hit sets insert the object's 32-bit placement hash, so the filter needs k
//! independent functions of a `u32`. Each function is the same AP-style mixer
//! keyed by a different salt; salts are derived from the filter seed with
//! MurmurHash3 so a decoder can regenerate them from `(salt_count, seed)`.

use std::io::Cursor;

/// Seed substituted when the configured seed is zero.
pub const DEFAULT_SEED: u64 = 0xA5A5_A5A5;

/// Hash a byte string with 32-bit MurmurHash3.
pub fn murmur_hash(element: &[u8], seed: u32) -> u32 {
    let mut cursor = Cursor::new(element);
    murmur3::murmur3_32(&mut cursor, seed).unwrap_or(0)
}

/// Salted mixer applied to a 32-bit value, one byte at a time.
pub fn hash_ap(value: u32, salt: u32) -> u32 {
    let mut hash = salt;
    hash ^= (hash << 7) ^ ((value & 0xff00_0000) >> 24).wrapping_mul(hash >> 3);
    hash ^= !((hash << 11).wrapping_add(((value & 0x00ff_0000) >> 16) ^ (hash >> 5)));
    hash ^= (hash << 7) ^ ((value & 0x0000_ff00) >> 8).wrapping_mul(hash >> 3);
    hash ^= !((hash << 11).wrapping_add((value & 0x0000_00ff) ^ (hash >> 5)));
    hash
}

/// Seed actually used for salt generation.
pub fn effective_seed(seed: u64) -> u64 {
    if seed == 0 {
        DEFAULT_SEED
    } else {
        seed
    }
}

/// Derive `count` distinct, non-zero salts from `seed`.
///
/// Deterministic: the same `(count, seed)` always yields the same salts.
pub fn generate_salts(count: usize, seed: u64) -> Vec<u32> {
    let seed = effective_seed(seed);
    let folded = (seed as u32) ^ ((seed >> 32) as u32);

    let mut salts = Vec::with_capacity(count);
    let mut counter: u32 = 0;
    while salts.len() < count {
        let salt = murmur_hash(&counter.to_le_bytes(), folded);
        counter = counter.wrapping_add(1);
        if salt != 0 && !salts.contains(&salt) {
            salts.push(salt);
        }
    }
    salts
}
