//! Domain Layer - hit set tracking
//!
//! This layer contains:
//! - The `HitSet` container and its tracking strategies
//! - Strategy parameters and their decoder
//! - The compressible Bloom filter and its sizing math
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod bloom_filter;
pub mod bloom_hit_set;
pub mod config;
pub mod explicit;
pub mod hash_functions;
pub mod hit_set;
pub mod params;
pub mod parameters;
pub mod types;

pub use bloom_filter::CompressibleBloomFilter;
pub use bloom_hit_set::BloomHitSet;
pub use config::{HitSetConfig, HitSetConfigBuilder};
pub use explicit::{ExplicitHashHitSet, ExplicitObjectHitSet};
pub use hit_set::{HitSet, HitSetImpl};
pub use params::{
    BloomParams, ExplicitHashParams, ExplicitObjectParams, ImplParams, Params, ParamsDecoder,
    MAX_ENCODABLE_FPP,
};
pub use parameters::{calculate_optimal_parameters, BloomFilterParams};
pub use types::HitSetType;
