//! Bloom hit set
//!
//! Inserts the object's 32-bit placement hash into a
//! [`CompressibleBloomFilter`]. Objects with colliding hashes are
//! indistinguishable.

use serde_json::{json, Value};
use shared_types::codec::{decode_envelope, encode_envelope, Decode, Encode};
use shared_types::{DecodeError, ObjectId};
use tracing::trace;

use super::bloom_filter::CompressibleBloomFilter;
use super::params::BloomParams;

const STRUCT_V: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomHitSet {
    filter: CompressibleBloomFilter,
}

impl BloomHitSet {
    /// Size a filter for `target_size` unique inserts at `false_positive`.
    pub fn new(target_size: u64, false_positive: f64, seed: u64) -> Self {
        Self {
            filter: CompressibleBloomFilter::new(target_size, false_positive, seed),
        }
    }

    pub fn from_params(params: &BloomParams) -> Self {
        Self::new(params.target_size, params.false_positive, params.seed)
    }

    pub fn insert(&mut self, oid: &ObjectId) {
        self.filter.insert(oid.hash);
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.filter.contains(oid.hash)
    }

    pub fn insert_count(&self) -> u64 {
        self.filter.element_count()
    }

    pub fn approx_unique_insert_count(&self) -> u64 {
        self.filter.approx_unique_element_count()
    }

    /// Shrink the table once the interval is over.
    ///
    /// Targets twice the current density, so a filter that ended up at most
    /// half full loses the slack it did not use.
    pub fn optimize(&mut self) {
        let pc = self.filter.density() * 2.0 * 100.0;
        if pc < 100.0 {
            self.filter.compress(pc);
        } else {
            trace!(density = self.filter.density(), "bloom hit set too dense to compress");
        }
    }

    pub fn filter(&self) -> &CompressibleBloomFilter {
        &self.filter
    }

    pub fn dump(&self) -> Value {
        json!({ "bloom_filter": self.filter.dump() })
    }
}

impl Encode for BloomHitSet {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_envelope(buf, STRUCT_V, STRUCT_V, |b| self.filter.encode(b));
    }
}

impl Decode for BloomHitSet {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "bloom_hit_set", STRUCT_V, |_, p| {
            Ok(Self {
                filter: CompressibleBloomFilter::decode(p)?,
            })
        })
    }
}
