//! Compressible Bloom filter
//!
//! INVARIANTS:
//! - INVARIANT-1: No false negatives - if inserted, contains() MUST return true,
//!   before and after any number of compressions.
//! - INVARIANT-2: approx_unique_element_count() <= element_count()
//!
//! The filter stores 32-bit values (object placement hashes). Compression
//! folds the byte table onto a prefix of itself with OR; every lookup reduces
//! its bit index modulo each table size in the compression history, which
//! lands on exactly the bit the fold moved the original bit to.

use bitvec::prelude::*;
use bytes::BufMut;
use serde_json::{json, Value};
use shared_types::codec::{
    decode_envelope, encode_envelope, get_bytes, get_count, get_u64, put_bytes, Decode, Encode,
};
use shared_types::DecodeError;
use tracing::debug;

use super::hash_functions::{effective_seed, generate_salts, hash_ap};
use super::parameters::{
    calculate_optimal_parameters, estimate_cardinality, MAX_HASH_COUNT, MAX_TABLE_SIZE,
};

const BLOOM_STRUCT_V: u8 = 2;
const COMPRESSIBLE_STRUCT_V: u8 = 2;

/// Bloom filter over `u32` values whose table can be shrunk after the fact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressibleBloomFilter {
    /// Bit table; its length is always `table_size() * 8`
    bits: BitVec<u8, Lsb0>,
    /// One salt per hash function
    salts: Vec<u32>,
    /// Every insert call, duplicates included
    insert_count: u64,
    /// Unique inserts the filter was sized for
    target_element_count: u64,
    /// Seed the salts were derived from (never zero)
    random_seed: u64,
    /// Table size in bytes: the original size, then one entry per compression
    size_list: Vec<usize>,
}

impl CompressibleBloomFilter {
    /// Create a filter sized for `expected_elements` unique inserts at
    /// `false_positive_rate`.
    pub fn new(expected_elements: u64, false_positive_rate: f64, seed: u64) -> Self {
        let params = calculate_optimal_parameters(expected_elements, false_positive_rate);
        let random_seed = effective_seed(seed);

        Self {
            bits: bitvec![u8, Lsb0; 0; params.table_size * 8],
            salts: generate_salts(params.hash_count, random_seed),
            insert_count: 0,
            target_element_count: expected_elements,
            random_seed,
            size_list: vec![params.table_size],
        }
    }

    fn bit_index(&self, salted: u32) -> usize {
        let mut index = salted as usize;
        for &size in &self.size_list {
            index %= size << 3;
        }
        index
    }

    /// Insert a value
    ///
    /// After insertion, `contains(value)` is guaranteed to return true.
    pub fn insert(&mut self, value: u32) {
        for i in 0..self.salts.len() {
            let index = self.bit_index(hash_ap(value, self.salts[i]));
            self.bits.set(index, true);
        }
        self.insert_count += 1;
    }

    /// Test if a value might be in the filter
    ///
    /// Returns:
    /// - `true` if the value might be in the set (could be false positive)
    /// - `false` if the value is definitely NOT in the set
    pub fn contains(&self, value: u32) -> bool {
        self.salts
            .iter()
            .all(|&salt| self.bits[self.bit_index(hash_ap(value, salt))])
    }

    /// Raw insert counter
    pub fn element_count(&self) -> u64 {
        self.insert_count
    }

    /// Cardinality estimate from the fraction of set bits, never above the
    /// raw insert count
    pub fn approx_unique_element_count(&self) -> u64 {
        let estimate = estimate_cardinality(self.bits_set(), self.bits.len(), self.salts.len());
        if estimate.is_finite() {
            (estimate.round() as u64).min(self.insert_count)
        } else {
            self.insert_count
        }
    }

    /// Fraction of bits set, in `[0, 1]`
    pub fn density(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.bits_set() as f64 / self.bits.len() as f64
    }

    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Current table size in bytes
    pub fn table_size(&self) -> usize {
        self.bits.len() / 8
    }

    /// Table size in bytes before any compression
    pub fn original_table_size(&self) -> usize {
        self.size_list.first().copied().unwrap_or(0)
    }

    pub fn size_list(&self) -> &[usize] {
        &self.size_list
    }

    pub fn hash_count(&self) -> usize {
        self.salts.len()
    }

    pub fn target_element_count(&self) -> u64 {
        self.target_element_count
    }

    pub fn seed(&self) -> u64 {
        self.random_seed
    }

    /// Shrink the table to `target_percent` of its current size.
    ///
    /// Returns false, leaving the filter untouched, when the percentage is
    /// outside `(0, 100)` or the resulting size would be zero or unchanged.
    pub fn compress(&mut self, target_percent: f64) -> bool {
        if !(target_percent > 0.0 && target_percent < 100.0) {
            return false;
        }
        let original = self.table_size();
        let new_size = (original as f64 * target_percent / 100.0) as usize;
        if new_size == 0 || new_size >= original {
            return false;
        }

        let raw = self.bits.as_raw_slice();
        let mut folded = raw[..new_size].to_vec();
        for (i, byte) in raw[new_size..].iter().enumerate() {
            folded[i % new_size] |= *byte;
        }

        debug!(
            from_bytes = original,
            to_bytes = new_size,
            target_percent,
            "compressed bloom filter"
        );

        self.bits = BitVec::from_vec(folded);
        self.size_list.push(new_size);
        true
    }

    /// Structured view for diagnostic dumps
    pub fn dump(&self) -> Value {
        json!({
            "salt_count": self.salts.len(),
            "table_size": self.table_size(),
            "insert_count": self.insert_count,
            "target_element_count": self.target_element_count,
            "random_seed": self.random_seed,
            "salt_table": self.salts,
            "bit_table": self.bits.as_raw_slice(),
            "table_sizes": self.size_list,
        })
    }
}

impl Encode for CompressibleBloomFilter {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_envelope(buf, COMPRESSIBLE_STRUCT_V, COMPRESSIBLE_STRUCT_V, |b| {
            encode_envelope(b, BLOOM_STRUCT_V, BLOOM_STRUCT_V, |b| {
                b.put_u64_le(self.salts.len() as u64);
                b.put_u64_le(self.insert_count);
                b.put_u64_le(self.target_element_count);
                b.put_u64_le(self.random_seed);
                put_bytes(b, self.bits.as_raw_slice());
            });
            b.put_u32_le(self.size_list.len() as u32);
            for &size in &self.size_list {
                b.put_u64_le(size as u64);
            }
        });
    }
}

impl Decode for CompressibleBloomFilter {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "compressible_bloom_filter", COMPRESSIBLE_STRUCT_V, |_, p| {
            let (salt_count, insert_count, target_element_count, random_seed, table) =
                decode_envelope(p, "bloom_filter", BLOOM_STRUCT_V, |_, p| {
                    Ok((
                        get_u64(p, "bloom_filter.salt_count")?,
                        get_u64(p, "bloom_filter.insert_count")?,
                        get_u64(p, "bloom_filter.target_element_count")?,
                        get_u64(p, "bloom_filter.random_seed")?,
                        get_bytes(p, "bloom_filter.bit_table")?,
                    ))
                })?;

            let n = get_count(p, "bloom_filter.size_list", 8)?;
            let mut size_list = Vec::with_capacity(n);
            for _ in 0..n {
                size_list.push(get_u64(p, "bloom_filter.size_list")? as usize);
            }

            if salt_count == 0 || salt_count >= MAX_HASH_COUNT as u64 {
                return Err(DecodeError::malformed(format!(
                    "bloom filter salt count {salt_count} out of range"
                )));
            }
            if table.is_empty() {
                return Err(DecodeError::malformed("bloom filter has an empty bit table"));
            }
            if size_list.is_empty() {
                size_list.push(table.len());
            }
            let shrinking = size_list.windows(2).all(|w| w[0] > w[1]);
            let in_range = size_list.iter().all(|&s| s > 0 && s <= MAX_TABLE_SIZE);
            if !shrinking || !in_range || size_list.last() != Some(&table.len()) {
                return Err(DecodeError::malformed(format!(
                    "bloom filter size history {:?} is inconsistent with table size {}",
                    size_list,
                    table.len()
                )));
            }
            let random_seed = effective_seed(random_seed);

            Ok(CompressibleBloomFilter {
                bits: BitVec::from_vec(table),
                salts: generate_salts(salt_count as usize, random_seed),
                insert_count,
                target_element_count,
                random_seed,
                size_list,
            })
        })
    }
}
