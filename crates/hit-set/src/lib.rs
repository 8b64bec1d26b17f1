//! # Hit Sets
//!
//! Per-interval object access tracking for a tiered object store.
//!
//! A storage daemon opens a hit set at the start of each interval, inserts the
//! identity of every object it serves, and persists the hit set when the
//! interval closes. A tiering agent later decodes the persisted hit sets and
//! asks `contains()` to decide what to promote or evict.
//!
//! ## Tracking Strategies
//!
//! - `explicit_hash`: exact set of 32-bit placement hashes
//! - `explicit_object`: exact set of full object identities
//! - `bloom`: compressible Bloom filter over placement hashes; no false
//!   negatives, bounded false positives, `optimize()` folds away unused space
//!
//! ## Invariants
//!
//! - **INVARIANT-1**: `insert_count() >= approx_unique_insert_count()`
//! - **INVARIANT-2**: No false negatives - if inserted, contains() MUST return true
//! - **INVARIANT-3**: Unknown type tags on the wire are malformed input, never a panic
//!
//! ## Usage Example
//!
//! ```
//! use hit_set::{BloomParams, HitSet, Params};
//! use shared_types::codec::{Decode, Encode};
//! use shared_types::ObjectId;
//!
//! let params = Params::Bloom(BloomParams::new(0.01, 1000, 0));
//! let mut hits = HitSet::from_params(&params);
//!
//! let oid = ObjectId::from_name(1, "rbd_data.1234");
//! hits.insert(&oid);
//! hits.optimize();
//!
//! let restored = HitSet::from_bytes(&hits.to_bytes()).unwrap();
//! assert!(restored.contains(&oid));
//! ```

pub mod domain;
pub mod error;

// Re-exports for convenience
pub use domain::{
    BloomHitSet, BloomParams, CompressibleBloomFilter, ExplicitHashHitSet, ExplicitHashParams,
    ExplicitObjectHitSet, ExplicitObjectParams, HitSet, HitSetConfig, HitSetConfigBuilder,
    HitSetImpl, HitSetType, ImplParams, Params, ParamsDecoder,
};
pub use error::{ConfigError, DecodeError};
