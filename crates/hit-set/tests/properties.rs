//! # Property Tests
//!
//! Counting, membership and codec properties over random object streams.

use std::collections::HashSet as StdHashSet;

use hit_set::{BloomParams, HitSet, HitSetType, Params};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared_types::codec::{Decode, Encode};
use shared_types::{ObjectId, SnapId};

fn arb_oid() -> impl Strategy<Value = ObjectId> {
    ("[a-z]{0,6}", any::<u32>(), 0i64..4).prop_map(|(name, hash, pool)| {
        ObjectId::new(name, "", SnapId::NOSNAP, hash, pool, "")
    })
}

fn random_oids(seed: u64, n: usize) -> Vec<ObjectId> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let name: String = (0..8).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
            ObjectId::from_name(rng.gen_range(0..8), name)
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_insert_count_is_call_count(oids in prop::collection::vec(arb_oid(), 0..64)) {
        for ty in [HitSetType::ExplicitHash, HitSetType::ExplicitObject, HitSetType::Bloom] {
            let mut hit_set = HitSet::with_type(ty);
            for oid in &oids {
                hit_set.insert(oid);
            }
            prop_assert_eq!(hit_set.insert_count(), oids.len() as u64);
            prop_assert!(hit_set.approx_unique_insert_count() <= hit_set.insert_count());
        }
    }

    #[test]
    fn prop_explicit_unique_count_is_exact(oids in prop::collection::vec(arb_oid(), 0..64)) {
        let mut by_hash = HitSet::with_type(HitSetType::ExplicitHash);
        let mut by_object = HitSet::with_type(HitSetType::ExplicitObject);
        for oid in &oids {
            by_hash.insert(oid);
            by_object.insert(oid);
        }

        let hashes: StdHashSet<u32> = oids.iter().map(|o| o.hash).collect();
        let objects: StdHashSet<&ObjectId> = oids.iter().collect();
        prop_assert_eq!(by_hash.approx_unique_insert_count(), hashes.len() as u64);
        prop_assert_eq!(by_object.approx_unique_insert_count(), objects.len() as u64);
    }

    #[test]
    fn prop_bloom_has_no_false_negatives(
        oids in prop::collection::vec(arb_oid(), 1..200),
        target in 1u64..500,
        fpp_micro in 1u16..=u16::MAX,
        seed in any::<u64>(),
        rounds in 0usize..4,
    ) {
        let fpp = f64::from(fpp_micro) / 1e6;
        let mut hit_set = HitSet::from_params(&Params::Bloom(BloomParams::new(fpp, target, seed)));
        for oid in &oids {
            hit_set.insert(oid);
        }
        for _ in 0..rounds {
            hit_set.optimize();
        }
        let restored = HitSet::from_bytes(&hit_set.to_bytes()).unwrap();
        for oid in &oids {
            prop_assert!(hit_set.contains(oid));
            prop_assert!(restored.contains(oid));
        }
    }

    #[test]
    fn prop_fpp_fixed_point_roundtrip(fpp_micro in 0u16..=u16::MAX, target in any::<u64>()) {
        let fpp = f64::from(fpp_micro) / 1e6;
        let params = Params::Bloom(BloomParams::new(fpp, target, 0));
        let restored = Params::from_bytes(&params.to_bytes()).unwrap();
        let got = restored.get_as::<BloomParams>().unwrap();
        prop_assert!((got.false_positive - fpp).abs() < 1e-6);
        prop_assert_eq!(got.target_size, target);
    }

    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = HitSet::from_bytes(&bytes);
        let _ = Params::from_bytes(&bytes);
    }
}

#[test]
fn test_bloom_false_positive_rate_near_target() {
    let target = 0.01;
    let mut hit_set = HitSet::from_params(&Params::Bloom(BloomParams::new(target, 2000, 0)));
    for oid in random_oids(1, 2000) {
        hit_set.insert(&oid);
    }

    let probes = random_oids(2, 20_000);
    let hits = probes.iter().filter(|oid| hit_set.contains(oid)).count();
    let actual = hits as f64 / probes.len() as f64;

    // allow 3x statistical tolerance; probes may collide with inserted names
    assert!(actual <= target * 3.0, "actual FPR {actual} vs target {target}");
}
