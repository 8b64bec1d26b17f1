//! Explicit hit sets
//!
//! Both variants keep every key they saw, so membership and the unique count
//! are exact. [`ExplicitHashHitSet`] keys on the 32-bit placement hash (two
//! objects sharing a hash are one entry); [`ExplicitObjectHitSet`] keys on the
//! full identity.

use std::collections::HashSet;

use bytes::BufMut;
use serde_json::{json, Value};
use shared_types::codec::{decode_envelope, encode_envelope, get_u64, Decode, Encode};
use shared_types::{DecodeError, ObjectId};

const STRUCT_V: u8 = 1;

/// Every element was inserted at least once.
fn check_count(count: u64, unique: usize) -> Result<(), DecodeError> {
    if count < unique as u64 {
        return Err(DecodeError::malformed(format!(
            "explicit hit set insert count {count} is below its {unique} elements"
        )));
    }
    Ok(())
}

/// Enumerates the placement hashes of hit objects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExplicitHashHitSet {
    count: u64,
    hits: HashSet<u32>,
}

impl ExplicitHashHitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, oid: &ObjectId) {
        self.hits.insert(oid.hash);
        self.count += 1;
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.hits.contains(&oid.hash)
    }

    pub fn insert_count(&self) -> u64 {
        self.count
    }

    pub fn approx_unique_insert_count(&self) -> u64 {
        self.hits.len() as u64
    }

    pub fn dump(&self) -> Value {
        json!({
            "insert_count": self.count,
            "hash_set": self.hits.iter().collect::<Vec<_>>(),
        })
    }
}

impl Encode for ExplicitHashHitSet {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_envelope(buf, STRUCT_V, STRUCT_V, |b| {
            b.put_u64_le(self.count);
            self.hits.encode(b);
        });
    }
}

impl Decode for ExplicitHashHitSet {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "explicit_hash_hit_set", STRUCT_V, |_, p| {
            let count = get_u64(p, "explicit_hash_hit_set.count")?;
            let hits = HashSet::decode(p)?;
            check_count(count, hits.len())?;
            Ok(Self { count, hits })
        })
    }
}

/// Enumerates the full identities of hit objects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExplicitObjectHitSet {
    count: u64,
    hits: HashSet<ObjectId>,
}

impl ExplicitObjectHitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, oid: &ObjectId) {
        if !self.hits.contains(oid) {
            self.hits.insert(oid.clone());
        }
        self.count += 1;
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.hits.contains(oid)
    }

    pub fn insert_count(&self) -> u64 {
        self.count
    }

    pub fn approx_unique_insert_count(&self) -> u64 {
        self.hits.len() as u64
    }

    pub fn dump(&self) -> Value {
        json!({
            "insert_count": self.count,
            "set": self.hits.iter().map(ObjectId::dump).collect::<Vec<_>>(),
        })
    }
}

impl Encode for ExplicitObjectHitSet {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_envelope(buf, STRUCT_V, STRUCT_V, |b| {
            b.put_u64_le(self.count);
            self.hits.encode(b);
        });
    }
}

impl Decode for ExplicitObjectHitSet {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "explicit_object_hit_set", STRUCT_V, |_, p| {
            let count = get_u64(p, "explicit_object_hit_set.count")?;
            let hits = HashSet::decode(p)?;
            check_count(count, hits.len())?;
            Ok(Self { count, hits })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SnapId;

    fn oid(name: &str, hash: u32) -> ObjectId {
        ObjectId::new(name, "", SnapId::NOSNAP, hash, 1, "")
    }

    #[test]
    fn test_hash_set_collisions_collapse() {
        let mut set = ExplicitHashHitSet::new();
        set.insert(&oid("a", 5));
        set.insert(&oid("b", 5));
        set.insert(&oid("c", 6));

        assert_eq!(set.insert_count(), 3);
        assert_eq!(set.approx_unique_insert_count(), 2);
        // colliding hash reports membership for an object never inserted
        assert!(set.contains(&oid("never", 5)));
        assert!(!set.contains(&oid("never", 7)));
    }

    #[test]
    fn test_object_set_distinguishes_colliding_hashes() {
        let mut set = ExplicitObjectHitSet::new();
        set.insert(&oid("a", 5));
        set.insert(&oid("b", 5));
        set.insert(&oid("a", 5));

        assert_eq!(set.insert_count(), 3);
        assert_eq!(set.approx_unique_insert_count(), 2);
        assert!(!set.contains(&oid("never", 5)));
    }

    #[test]
    fn test_hash_set_roundtrip() {
        let mut set = ExplicitHashHitSet::new();
        for (name, hash) in [("", 0), ("asdf", 123), ("qwer", 456), ("asdf", 123)] {
            set.insert(&oid(name, hash));
        }
        let restored = ExplicitHashHitSet::from_bytes(&set.to_bytes()).unwrap();
        assert_eq!(restored, set);
        assert_eq!(restored.insert_count(), 4);
    }

    #[test]
    fn test_object_set_roundtrip() {
        let mut set = ExplicitObjectHitSet::new();
        set.insert(&ObjectId::default());
        set.insert(&oid("asdf", 123));
        set.insert(&oid("qwer", 456));
        let restored = ExplicitObjectHitSet::from_bytes(&set.to_bytes()).unwrap();
        assert_eq!(restored, set);
    }

    #[test]
    fn test_decode_rejects_count_below_elements() {
        let mut buf = Vec::new();
        encode_envelope(&mut buf, 1, 1, |b| {
            b.put_u64_le(0);
            [1u32, 2, 3].into_iter().collect::<HashSet<_>>().encode(b);
        });
        assert!(ExplicitHashHitSet::from_bytes(&buf).unwrap_err().is_malformed());

        let mut buf = Vec::new();
        encode_envelope(&mut buf, 1, 1, |b| {
            b.put_u64_le(1);
            [oid("a", 1), oid("b", 2)].into_iter().collect::<HashSet<_>>().encode(b);
        });
        assert!(ExplicitObjectHitSet::from_bytes(&buf).unwrap_err().is_malformed());
    }

    #[test]
    fn test_dump_lists_every_element() {
        let mut set = ExplicitHashHitSet::new();
        set.insert(&oid("a", 1));
        set.insert(&oid("b", 2));
        let dump = set.dump();
        assert_eq!(dump["insert_count"], 2);
        assert_eq!(dump["hash_set"].as_array().unwrap().len(), 2);

        let mut objects = ExplicitObjectHitSet::new();
        objects.insert(&oid("a", 1));
        assert_eq!(objects.dump()["set"][0]["oid"], "a");
    }
}
