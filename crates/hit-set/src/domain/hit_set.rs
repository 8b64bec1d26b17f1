//! Hit set container
//!
//! A [`HitSet`] owns at most one tracking strategy and forwards every
//! operation to it. The strategy is chosen at construction (from a type tag
//! or from [`Params`]) or by decoding a persisted hit set, whose leading tag
//! names it.
//!
//! INVARIANTS:
//! - INVARIANT-1: `insert_count() >= approx_unique_insert_count()`
//! - INVARIANT-2: A failed decode leaves the hit set empty, never half-built.
//! - INVARIANT-3: Bloom hit sets have no false negatives, before and after
//!   `optimize()`.

use bytes::BufMut;
use serde_json::{json, Value};
use shared_types::codec::{decode_envelope, encode_envelope, get_u8, Decode, Encode};
use shared_types::{DecodeError, ObjectId, SnapId};
use tracing::{debug, warn};

use super::bloom_hit_set::BloomHitSet;
use super::explicit::{ExplicitHashHitSet, ExplicitObjectHitSet};
use super::params::{BloomParams, Params};
use super::types::HitSetType;

const STRUCT_V: u8 = 1;

/// The tracking strategy owned by a [`HitSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HitSetImpl {
    ExplicitHash(ExplicitHashHitSet),
    ExplicitObject(ExplicitObjectHitSet),
    Bloom(BloomHitSet),
}

impl HitSetImpl {
    pub fn get_type(&self) -> HitSetType {
        match self {
            HitSetImpl::ExplicitHash(_) => HitSetType::ExplicitHash,
            HitSetImpl::ExplicitObject(_) => HitSetType::ExplicitObject,
            HitSetImpl::Bloom(_) => HitSetType::Bloom,
        }
    }

    pub fn insert(&mut self, oid: &ObjectId) {
        match self {
            HitSetImpl::ExplicitHash(s) => s.insert(oid),
            HitSetImpl::ExplicitObject(s) => s.insert(oid),
            HitSetImpl::Bloom(s) => s.insert(oid),
        }
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        match self {
            HitSetImpl::ExplicitHash(s) => s.contains(oid),
            HitSetImpl::ExplicitObject(s) => s.contains(oid),
            HitSetImpl::Bloom(s) => s.contains(oid),
        }
    }

    pub fn insert_count(&self) -> u64 {
        match self {
            HitSetImpl::ExplicitHash(s) => s.insert_count(),
            HitSetImpl::ExplicitObject(s) => s.insert_count(),
            HitSetImpl::Bloom(s) => s.insert_count(),
        }
    }

    pub fn approx_unique_insert_count(&self) -> u64 {
        match self {
            HitSetImpl::ExplicitHash(s) => s.approx_unique_insert_count(),
            HitSetImpl::ExplicitObject(s) => s.approx_unique_insert_count(),
            HitSetImpl::Bloom(s) => s.approx_unique_insert_count(),
        }
    }

    /// Only Bloom hit sets have anything to optimize.
    pub fn optimize(&mut self) {
        if let HitSetImpl::Bloom(s) = self {
            s.optimize();
        }
    }

    pub fn dump(&self) -> Value {
        match self {
            HitSetImpl::ExplicitHash(s) => s.dump(),
            HitSetImpl::ExplicitObject(s) => s.dump(),
            HitSetImpl::Bloom(s) => s.dump(),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            HitSetImpl::ExplicitHash(s) => s.encode(buf),
            HitSetImpl::ExplicitObject(s) => s.encode(buf),
            HitSetImpl::Bloom(s) => s.encode(buf),
        }
    }
}

/// Record of which objects were accessed during one interval.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HitSet {
    imp: Option<HitSetImpl>,
}

impl HitSet {
    /// An empty hit set (type "none").
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh hit set of `ty` with default parameters.
    pub fn with_type(ty: HitSetType) -> Self {
        Self::from_params(&Params::new(ty))
    }

    /// A fresh hit set from a raw wire tag.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not a known hit set type.
    pub fn from_type_code(code: u8) -> Self {
        match HitSetType::from_code(code) {
            Some(ty) => Self::with_type(ty),
            None => panic!("unknown hit set type code {code}"),
        }
    }

    /// A fresh hit set configured by `params`.
    pub fn from_params(params: &Params) -> Self {
        let imp = match params {
            Params::None => None,
            Params::ExplicitHash(_) => Some(HitSetImpl::ExplicitHash(ExplicitHashHitSet::new())),
            Params::ExplicitObject(_) => {
                Some(HitSetImpl::ExplicitObject(ExplicitObjectHitSet::new()))
            }
            Params::Bloom(p) => Some(HitSetImpl::Bloom(BloomHitSet::from_params(p))),
        };
        debug!(hit_set_type = params.get_type_name(), "created hit set");
        Self { imp }
    }

    pub fn from_impl(imp: HitSetImpl) -> Self {
        Self { imp: Some(imp) }
    }

    pub fn is_empty(&self) -> bool {
        self.imp.is_none()
    }

    pub fn get_impl(&self) -> Option<&HitSetImpl> {
        self.imp.as_ref()
    }

    pub fn get_type(&self) -> HitSetType {
        self.imp
            .as_ref()
            .map(HitSetImpl::get_type)
            .unwrap_or(HitSetType::None)
    }

    pub fn get_type_name(&self) -> &'static str {
        self.get_type().name()
    }

    /// Record an access to `oid`.
    ///
    /// # Panics
    ///
    /// Panics on an empty hit set.
    pub fn insert(&mut self, oid: &ObjectId) {
        match self.imp.as_mut() {
            Some(imp) => imp.insert(oid),
            None => panic!("insert on an empty hit set"),
        }
    }

    /// Whether `oid` was (probably, for Bloom) accessed.
    ///
    /// # Panics
    ///
    /// Panics on an empty hit set.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        match self.imp.as_ref() {
            Some(imp) => imp.contains(oid),
            None => panic!("contains on an empty hit set"),
        }
    }

    /// Every insert call so far, duplicates included. 0 when empty.
    pub fn insert_count(&self) -> u64 {
        self.imp.as_ref().map_or(0, HitSetImpl::insert_count)
    }

    /// Distinct objects inserted (estimated for Bloom). 0 when empty.
    pub fn approx_unique_insert_count(&self) -> u64 {
        self.imp
            .as_ref()
            .map_or(0, HitSetImpl::approx_unique_insert_count)
    }

    /// Shrink internal state once the interval is closed.
    pub fn optimize(&mut self) {
        if let Some(imp) = self.imp.as_mut() {
            imp.optimize();
        }
    }

    /// Decode into `self`, replacing whatever it held.
    ///
    /// On error `self` is left empty.
    pub fn decode_from(&mut self, buf: &mut &[u8]) -> Result<(), DecodeError> {
        self.imp = None;
        match HitSet::decode(buf) {
            Ok(decoded) => {
                *self = decoded;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to decode hit set");
                Err(err)
            }
        }
    }

    pub fn dump(&self) -> Value {
        let mut out = json!({ "type": self.get_type_name() });
        if let (Some(imp), Some(fields)) = (self.imp.as_ref(), out.as_object_mut()) {
            if let Value::Object(variant) = imp.dump() {
                fields.extend(variant);
            }
        }
        out
    }

    /// One hit set of each type, each non-empty one with three inserts.
    pub fn generate_test_instances() -> Vec<HitSet> {
        let oids = [
            ObjectId::default(),
            ObjectId::new("asdf", "", SnapId::NOSNAP, 123, 0, ""),
            ObjectId::new("qwer", "", SnapId::NOSNAP, 456, 0, ""),
        ];

        let mut out = vec![HitSet::new()];
        for params in [
            Params::Bloom(BloomParams::new(0.1, 10, 1)),
            Params::new(HitSetType::ExplicitHash),
            Params::new(HitSetType::ExplicitObject),
        ] {
            let mut hit_set = HitSet::from_params(&params);
            for oid in &oids {
                hit_set.insert(oid);
            }
            out.push(hit_set);
        }
        out
    }
}

impl From<HitSetImpl> for HitSet {
    fn from(imp: HitSetImpl) -> Self {
        Self::from_impl(imp)
    }
}

impl Encode for HitSet {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_envelope(buf, STRUCT_V, STRUCT_V, |b| {
            b.put_u8(self.get_type().code());
            if let Some(imp) = &self.imp {
                imp.encode(b);
            }
        });
    }
}

impl Decode for HitSet {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "hit_set", STRUCT_V, |_, p| {
            let tag = get_u8(p, "hit_set.type")?;
            let ty = HitSetType::from_code(tag).ok_or_else(|| {
                DecodeError::malformed(format!("unrecognized hit set type {tag}"))
            })?;
            let imp = match ty {
                HitSetType::None => None,
                HitSetType::ExplicitHash => {
                    Some(HitSetImpl::ExplicitHash(ExplicitHashHitSet::decode(p)?))
                }
                HitSetType::ExplicitObject => {
                    Some(HitSetImpl::ExplicitObject(ExplicitObjectHitSet::decode(p)?))
                }
                HitSetType::Bloom => Some(HitSetImpl::Bloom(BloomHitSet::decode(p)?)),
            };
            debug!(hit_set_type = ty.name(), "decoded hit set");
            Ok(HitSet { imp })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(name: &str, hash: u32) -> ObjectId {
        ObjectId::new(name, "", SnapId::NOSNAP, hash, 0, "")
    }

    #[test]
    fn test_new_is_none() {
        let hit_set = HitSet::new();
        assert!(hit_set.is_empty());
        assert_eq!(hit_set.get_type(), HitSetType::None);
        assert_eq!(hit_set.get_type_name(), "none");
        assert_eq!(hit_set.insert_count(), 0);
        assert_eq!(hit_set.approx_unique_insert_count(), 0);
    }

    #[test]
    fn test_with_type_matches_type() {
        for ty in HitSetType::ALL {
            assert_eq!(HitSet::with_type(ty).get_type(), ty);
        }
        assert_eq!(HitSet::from_type_code(2).get_type(), HitSetType::ExplicitObject);
    }

    #[test]
    #[should_panic(expected = "unknown hit set type code")]
    fn test_from_unknown_type_code_panics() {
        HitSet::from_type_code(4);
    }

    #[test]
    #[should_panic(expected = "insert on an empty hit set")]
    fn test_insert_on_empty_panics() {
        HitSet::new().insert(&oid("a", 1));
    }

    #[test]
    #[should_panic(expected = "contains on an empty hit set")]
    fn test_contains_on_empty_panics() {
        HitSet::new().contains(&oid("a", 1));
    }

    #[test]
    fn test_optimize_on_empty_is_noop() {
        let mut hit_set = HitSet::new();
        hit_set.optimize();
        assert!(hit_set.is_empty());
    }

    #[test]
    fn test_from_impl() {
        let hit_set: HitSet = HitSetImpl::ExplicitHash(ExplicitHashHitSet::new()).into();
        assert_eq!(hit_set.get_type(), HitSetType::ExplicitHash);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = HitSet::with_type(HitSetType::ExplicitObject);
        original.insert(&oid("a", 1));
        let mut copy = original.clone();
        copy.insert(&oid("b", 2));

        assert_eq!(original.insert_count(), 1);
        assert_eq!(copy.insert_count(), 2);
        assert!(!original.contains(&oid("b", 2)));
    }

    #[test]
    fn test_roundtrip_test_instances() {
        for hit_set in HitSet::generate_test_instances() {
            let restored = HitSet::from_bytes(&hit_set.to_bytes()).unwrap();
            assert_eq!(restored, hit_set, "roundtrip failed for {}", hit_set.get_type_name());
        }
    }

    #[test]
    fn test_none_encoding_is_bare_tag() {
        assert_eq!(HitSet::new().to_bytes(), vec![1, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_tag_is_malformed() {
        let mut buf = Vec::new();
        encode_envelope(&mut buf, 1, 1, |b| b.put_u8(7));
        assert!(HitSet::from_bytes(&buf).unwrap_err().is_malformed());
    }

    #[test]
    fn test_failed_decode_resets_to_none() {
        let mut hit_set = HitSet::with_type(HitSetType::ExplicitHash);
        hit_set.insert(&oid("a", 1));

        let mut buf = Vec::new();
        encode_envelope(&mut buf, 1, 1, |b| b.put_u8(250));

        assert!(hit_set.decode_from(&mut buf.as_slice()).is_err());
        assert!(hit_set.is_empty());
    }

    #[test]
    fn test_truncated_variant_payload_fails() {
        let mut hit_set = HitSet::with_type(HitSetType::ExplicitObject);
        hit_set.insert(&oid("a", 1));
        let mut bytes = hit_set.to_bytes();
        bytes.truncate(bytes.len() - 4);

        assert!(HitSet::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_insert_count_below_unique_is_malformed() {
        let mut buf = Vec::new();
        encode_envelope(&mut buf, 1, 1, |b| {
            b.put_u8(HitSetType::ExplicitHash.code());
            encode_envelope(b, 1, 1, |b| {
                b.put_u64_le(0);
                b.put_u32_le(3);
                for hash in [10u32, 20, 30] {
                    b.put_u32_le(hash);
                }
            });
        });

        let mut hit_set = HitSet::with_type(HitSetType::ExplicitHash);
        let err = hit_set.decode_from(&mut buf.as_slice()).unwrap_err();
        assert!(err.is_malformed());
        assert!(hit_set.is_empty());
    }

    #[test]
    fn test_dump_merges_variant_fields() {
        let mut hit_set = HitSet::with_type(HitSetType::ExplicitHash);
        hit_set.insert(&oid("a", 9));
        let dump = hit_set.dump();

        assert_eq!(dump["type"], "explicit_hash");
        assert_eq!(dump["insert_count"], 1);
        assert_eq!(dump["hash_set"], json!([9]));

        let bloom = HitSet::with_type(HitSetType::Bloom).dump();
        assert_eq!(bloom["type"], "bloom");
        assert!(bloom["bloom_filter"].is_object());

        assert_eq!(HitSet::new().dump(), json!({ "type": "none" }));
    }
}
