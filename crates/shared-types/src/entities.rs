//! # Core Domain Entities
//!
//! The object identity used as the key for hit tracking, placement and
//! modification logs.
//!
//! An [`ObjectId`] names one object (or one snapshot clone of it) inside a
//! pool. It is totally ordered in placement order: objects that land in the
//! same placement group sort next to each other because the hash is compared
//! bit-reversed.

use std::cmp::Ordering;
use std::fmt;
use std::io::Cursor;

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::codec::{
    decode_envelope, encode_envelope, get_bool, get_i64, get_string, get_u32, get_u64, put_string,
    Decode, Encode,
};
use crate::errors::DecodeError;

/// Snapshot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapId(pub u64);

impl SnapId {
    /// The head object (not a snapshot clone).
    pub const NOSNAP: SnapId = SnapId(u64::MAX - 1);
    /// The snapshot directory pseudo-object.
    pub const SNAPDIR: SnapId = SnapId(u64::MAX);
}

impl Default for SnapId {
    fn default() -> Self {
        SnapId::NOSNAP
    }
}

impl fmt::Display for SnapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SnapId::NOSNAP => write!(f, "head"),
            SnapId::SNAPDIR => write!(f, "snapdir"),
            SnapId(n) => write!(f, "{n:x}"),
        }
    }
}

/// Identity of a stored object.
///
/// Equality covers every field. The 32-bit `hash` is what placement and
/// hash-based hit tracking key on; two distinct objects may share it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ObjectId {
    /// Object name.
    pub name: String,
    /// Locator key; empty means "use the name".
    pub key: String,
    /// Snapshot this identity refers to.
    pub snap: SnapId,
    /// Placement hash.
    pub hash: u32,
    /// Sorts after every real object in the pool when set.
    pub max: bool,
    /// Namespace within the pool.
    pub namespace: String,
    /// Pool id.
    pub pool: i64,
}

impl ObjectId {
    pub const STRUCT_V: u8 = 4;
    pub const COMPAT_V: u8 = 3;

    /// Build an identity with an explicit placement hash.
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        snap: SnapId,
        hash: u32,
        pool: i64,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            snap,
            hash,
            max: false,
            namespace: namespace.into(),
            pool,
        }
    }

    /// Build the head identity of `name` in `pool`, deriving the placement
    /// hash from the name.
    pub fn from_name(pool: i64, name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = name_hash(&name);
        Self::new(name, "", SnapId::NOSNAP, hash, pool, "")
    }

    /// The identity that sorts after every object of `pool`.
    pub fn max_in_pool(pool: i64) -> Self {
        Self {
            max: true,
            pool,
            ..Self::default()
        }
    }

    /// Key used for placement ordering.
    pub fn effective_key(&self) -> &str {
        if self.key.is_empty() {
            &self.name
        } else {
            &self.key
        }
    }

    /// Hash with its bits reversed; adjacent values share a hash prefix.
    pub fn bitwise_key(&self) -> u32 {
        self.hash.reverse_bits()
    }

    pub fn is_head(&self) -> bool {
        self.snap == SnapId::NOSNAP
    }

    /// Structured view for diagnostic dumps.
    pub fn dump(&self) -> Value {
        json!({
            "oid": self.name,
            "key": self.key,
            "snapid": self.snap.0,
            "hash": self.hash,
            "max": self.max,
            "pool": self.pool,
            "namespace": self.namespace,
        })
    }
}

/// 32-bit MurmurHash3 of an object name.
pub fn name_hash(name: &str) -> u32 {
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_32(&mut Cursor::new(name.as_bytes()), 0).unwrap_or(0)
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max
            .cmp(&other.max)
            .then_with(|| self.pool.cmp(&other.pool))
            .then_with(|| self.bitwise_key().cmp(&other.bitwise_key()))
            .then_with(|| self.namespace.cmp(&other.namespace))
            .then_with(|| self.effective_key().cmp(other.effective_key()))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.snap.cmp(&other.snap))
            // keeps Ord consistent with Eq when only the locator differs
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max {
            return write!(f, "{}:MAX", self.pool);
        }
        write!(
            f,
            "{}:{:08x}:{}:{}:{}:{}",
            self.pool, self.bitwise_key(), self.namespace, self.key, self.name, self.snap
        )
    }
}

impl Encode for ObjectId {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_envelope(buf, Self::STRUCT_V, Self::COMPAT_V, |b| {
            put_string(b, &self.key);
            put_string(b, &self.name);
            b.put_u64_le(self.snap.0);
            b.put_u32_le(self.hash);
            b.put_u8(self.max as u8);
            put_string(b, &self.namespace);
            b.put_i64_le(self.pool);
        });
    }
}

impl Decode for ObjectId {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "object_id", Self::STRUCT_V, |_, p| {
            Ok(ObjectId {
                key: get_string(p, "object_id.key")?,
                name: get_string(p, "object_id.name")?,
                snap: SnapId(get_u64(p, "object_id.snap")?),
                hash: get_u32(p, "object_id.hash")?,
                max: get_bool(p, "object_id.max")?,
                namespace: get_string(p, "object_id.namespace")?,
                pool: get_i64(p, "object_id.pool")?,
            })
        })
    }
}
