//! Hit set parameters
//!
//! [`Params`] is the configuration half of a hit set: it names the tracking
//! strategy and carries that strategy's tunables. It is persisted alongside
//! pool metadata, so it has its own tagged encoding; [`ParamsDecoder`] reads
//! one without knowing the tag in advance.
//!
//! INVARIANTS:
//! - `Params::get_type()` always matches the variant held.
//! - `get_as::<T>()` is `Some` iff the live variant is `T::TYPE`.
//! - A failed decode never leaves a half-built value behind.

use std::fmt;

use bytes::BufMut;
use serde_json::{json, Value};
use shared_types::codec::{
    decode_envelope, encode_envelope, get_u16, get_u64, get_u8, Decode, Encode,
};
use shared_types::DecodeError;
use tracing::{debug, warn};

use super::types::HitSetType;

const STRUCT_V: u8 = 1;
const IMPL_STRUCT_V: u8 = 1;

/// Scale of the fixed-point false positive rate on the wire.
pub const FPP_SCALE: f64 = 1_000_000.0;

/// Largest false positive rate the wire format can carry.
pub const MAX_ENCODABLE_FPP: f64 = u16::MAX as f64 / FPP_SCALE;

/// Per-strategy parameter types, addressable through [`Params::get_as`].
pub trait ImplParams: Sized {
    const TYPE: HitSetType;

    fn downcast(params: &Params) -> Option<&Self>;

    fn downcast_mut(params: &mut Params) -> Option<&mut Self>;
}

/// Explicit hash sets have nothing to tune.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExplicitHashParams;

/// Explicit object sets have nothing to tune.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExplicitObjectParams;

/// Bloom hit set sizing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomParams {
    /// Target false positive rate at `target_size` unique inserts
    pub false_positive: f64,
    /// Unique inserts the filter is sized for
    pub target_size: u64,
    /// Seed for the filter's salts (0 selects the default)
    pub seed: u64,
}

impl BloomParams {
    pub fn new(false_positive: f64, target_size: u64, seed: u64) -> Self {
        Self {
            false_positive,
            target_size,
            seed,
        }
    }

    /// Wire form of the false positive rate: millionths, saturating at
    /// [`MAX_ENCODABLE_FPP`].
    pub fn fpp_micro(&self) -> u16 {
        (self.false_positive * FPP_SCALE).round() as u16
    }

    pub fn set_fpp(&mut self, false_positive: f64) {
        self.false_positive = false_positive;
    }

    pub fn get_fpp(&self) -> f64 {
        self.false_positive
    }

    fn dump(&self) -> Value {
        json!({
            "false_positive_probability": self.false_positive,
            "target_size": self.target_size,
            "seed": self.seed,
        })
    }
}

impl Default for BloomParams {
    fn default() -> Self {
        Self::new(0.0, 0, 0)
    }
}

impl Encode for BloomParams {
    fn encode(&self, buf: &mut Vec<u8>) {
        if self.false_positive > MAX_ENCODABLE_FPP {
            warn!(
                fpp = self.false_positive,
                max = MAX_ENCODABLE_FPP,
                "bloom false positive rate saturates on encode"
            );
        }
        encode_envelope(buf, IMPL_STRUCT_V, IMPL_STRUCT_V, |b| {
            b.put_u16_le(self.fpp_micro());
            b.put_u64_le(self.target_size);
            b.put_u64_le(self.seed);
        });
    }
}

impl Decode for BloomParams {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "bloom_params", IMPL_STRUCT_V, |_, p| {
            let micro = get_u16(p, "bloom_params.fpp")?;
            Ok(Self {
                false_positive: f64::from(micro) / FPP_SCALE,
                target_size: get_u64(p, "bloom_params.target_size")?,
                seed: get_u64(p, "bloom_params.seed")?,
            })
        })
    }
}

fn encode_empty(buf: &mut Vec<u8>) {
    encode_envelope(buf, IMPL_STRUCT_V, IMPL_STRUCT_V, |_| {});
}

fn decode_empty(buf: &mut &[u8], what: &'static str) -> Result<(), DecodeError> {
    decode_envelope(buf, what, IMPL_STRUCT_V, |_, _| Ok(()))
}

impl Encode for ExplicitHashParams {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_empty(buf);
    }
}

impl Decode for ExplicitHashParams {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_empty(buf, "explicit_hash_params").map(|_| Self)
    }
}

impl Encode for ExplicitObjectParams {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_empty(buf);
    }
}

impl Decode for ExplicitObjectParams {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_empty(buf, "explicit_object_params").map(|_| Self)
    }
}

/// Configuration for one tracking strategy
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    ExplicitHash(ExplicitHashParams),
    ExplicitObject(ExplicitObjectParams),
    Bloom(BloomParams),
}

impl Params {
    /// Default parameters for `ty`.
    pub fn new(ty: HitSetType) -> Self {
        match ty {
            HitSetType::None => Params::None,
            HitSetType::ExplicitHash => Params::ExplicitHash(ExplicitHashParams),
            HitSetType::ExplicitObject => Params::ExplicitObject(ExplicitObjectParams),
            HitSetType::Bloom => Params::Bloom(BloomParams::default()),
        }
    }

    pub fn create_copy(other: &Params) -> Params {
        other.clone()
    }

    pub fn get_type(&self) -> HitSetType {
        match self {
            Params::None => HitSetType::None,
            Params::ExplicitHash(_) => HitSetType::ExplicitHash,
            Params::ExplicitObject(_) => HitSetType::ExplicitObject,
            Params::Bloom(_) => HitSetType::Bloom,
        }
    }

    pub fn get_type_name(&self) -> &'static str {
        self.get_type().name()
    }

    /// Typed view of the strategy parameters, if they are a `T`.
    pub fn get_as<T: ImplParams>(&self) -> Option<&T> {
        T::downcast(self)
    }

    pub fn get_as_mut<T: ImplParams>(&mut self) -> Option<&mut T> {
        T::downcast_mut(self)
    }

    fn impl_dump(&self) -> Option<Value> {
        match self {
            Params::None => None,
            Params::ExplicitHash(_) | Params::ExplicitObject(_) => Some(json!({})),
            Params::Bloom(p) => Some(p.dump()),
        }
    }

    pub fn dump(&self) -> Value {
        let mut out = json!({ "type": self.get_type_name() });
        if let Some(impl_params) = self.impl_dump() {
            out["impl_params"] = impl_params;
        }
        out
    }

    /// Parameters worth exercising in codec tests.
    pub fn generate_test_instances() -> Vec<Params> {
        vec![
            Params::None,
            Params::ExplicitHash(ExplicitHashParams),
            Params::ExplicitObject(ExplicitObjectParams),
            Params::Bloom(BloomParams::new(0.01, 1000, 0)),
            Params::Bloom(BloomParams::new(0.05, 20_000, 7)),
        ]
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "params type: {}", self.get_type_name())?;
        match self {
            Params::None => Ok(()),
            Params::ExplicitHash(_) | Params::ExplicitObject(_) => write!(f, " impl params {{}}"),
            Params::Bloom(p) => write!(
                f,
                " impl params {{fpp: {}, target_size: {}, seed: {}}}",
                p.false_positive, p.target_size, p.seed
            ),
        }
    }
}

impl Encode for Params {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_envelope(buf, STRUCT_V, STRUCT_V, |b| {
            b.put_u8(self.get_type().code());
            match self {
                Params::None => {}
                Params::ExplicitHash(p) => p.encode(b),
                Params::ExplicitObject(p) => p.encode(b),
                Params::Bloom(p) => p.encode(b),
            }
        });
    }
}

impl Decode for Params {
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        decode_envelope(buf, "params", STRUCT_V, |_, p| {
            let tag = get_u8(p, "params.type")?;
            let ty = HitSetType::from_code(tag).ok_or_else(|| {
                debug!(tag, "rejecting params with unknown type");
                DecodeError::malformed(format!("unrecognized hit set params type {tag}"))
            })?;
            Ok(match ty {
                HitSetType::None => Params::None,
                HitSetType::ExplicitHash => Params::ExplicitHash(ExplicitHashParams::decode(p)?),
                HitSetType::ExplicitObject => {
                    Params::ExplicitObject(ExplicitObjectParams::decode(p)?)
                }
                HitSetType::Bloom => Params::Bloom(BloomParams::decode(p)?),
            })
        })
    }
}

impl ImplParams for ExplicitHashParams {
    const TYPE: HitSetType = HitSetType::ExplicitHash;

    fn downcast(params: &Params) -> Option<&Self> {
        match params {
            Params::ExplicitHash(p) => Some(p),
            _ => None,
        }
    }

    fn downcast_mut(params: &mut Params) -> Option<&mut Self> {
        match params {
            Params::ExplicitHash(p) => Some(p),
            _ => None,
        }
    }
}

impl ImplParams for ExplicitObjectParams {
    const TYPE: HitSetType = HitSetType::ExplicitObject;

    fn downcast(params: &Params) -> Option<&Self> {
        match params {
            Params::ExplicitObject(p) => Some(p),
            _ => None,
        }
    }

    fn downcast_mut(params: &mut Params) -> Option<&mut Self> {
        match params {
            Params::ExplicitObject(p) => Some(p),
            _ => None,
        }
    }
}

impl ImplParams for BloomParams {
    const TYPE: HitSetType = HitSetType::Bloom;

    fn downcast(params: &Params) -> Option<&Self> {
        match params {
            Params::Bloom(p) => Some(p),
            _ => None,
        }
    }

    fn downcast_mut(params: &mut Params) -> Option<&mut Self> {
        match params {
            Params::Bloom(p) => Some(p),
            _ => None,
        }
    }
}

/// Reads a [`Params`] of any type from the wire and hands it out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamsDecoder {
    params: Option<Params>,
}

impl ParamsDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Take ownership of the decoded params, leaving the decoder empty.
    pub fn extract(&mut self) -> Option<Params> {
        self.params.take()
    }

    /// Replace the held params; the previous value is dropped.
    pub fn reset(&mut self, params: Params) {
        self.params = Some(params);
    }

    pub fn get_type(&self) -> HitSetType {
        self.params
            .as_ref()
            .map(Params::get_type)
            .unwrap_or(HitSetType::None)
    }

    /// Decode params into this decoder. On failure the decoder is empty.
    pub fn decode(&mut self, buf: &mut &[u8]) -> Result<(), DecodeError> {
        self.params = None;
        let params = Params::decode(buf)?;
        self.params = Some(params);
        Ok(())
    }

    pub fn dump(&self) -> Value {
        match &self.params {
            Some(params) => params.dump(),
            None => Params::None.dump(),
        }
    }

    pub fn generate_test_instances() -> Vec<ParamsDecoder> {
        let mut out = vec![ParamsDecoder::new()];
        out.extend(Params::generate_test_instances().into_iter().map(|p| ParamsDecoder {
            params: Some(p),
        }));
        out
    }
}

/// An empty decoder encodes as `Params::None`.
impl Encode for ParamsDecoder {
    fn encode(&self, buf: &mut Vec<u8>) {
        match &self.params {
            Some(params) => params.encode(buf),
            None => Params::None.encode(buf),
        }
    }
}
