//! Hit set configuration and validation
//!
//! # Example
//!
//! ```
//! use hit_set::{HitSetConfigBuilder, HitSetType};
//!
//! let config = HitSetConfigBuilder::new()
//!     .hit_set_type(HitSetType::Bloom)
//!     .false_positive_rate(0.01)
//!     .target_size(50_000)
//!     .build()
//!     .expect("valid config");
//!
//! let params = config.to_params();
//! assert_eq!(params.get_type(), HitSetType::Bloom);
//! ```

use std::env;

use serde::{Deserialize, Serialize};

use super::params::{
    BloomParams, ExplicitHashParams, ExplicitObjectParams, Params, MAX_ENCODABLE_FPP,
};
use super::types::HitSetType;
use crate::error::ConfigError;

pub const ENV_TYPE: &str = "HITSET_TYPE";
pub const ENV_FPP: &str = "HITSET_FPP";
pub const ENV_TARGET_SIZE: &str = "HITSET_TARGET_SIZE";
pub const ENV_SEED: &str = "HITSET_SEED";

/// Largest Bloom target accepted. At the tightest encodable rate this still
/// sizes a table under `MAX_TABLE_SIZE`.
pub const MAX_TARGET_SIZE: u64 = 100_000_000;

/// Pool-level hit set configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitSetConfig {
    /// Tracking strategy
    pub hit_set_type: HitSetType,
    /// Bloom only: false positive rate at `target_size` inserts
    pub false_positive_rate: f64,
    /// Bloom only: unique inserts expected per interval
    pub target_size: u64,
    /// Bloom only: salt seed (0 selects the default)
    pub seed: u64,
}

impl Default for HitSetConfig {
    fn default() -> Self {
        Self {
            hit_set_type: HitSetType::Bloom,
            false_positive_rate: 0.05,
            target_size: 1000,
            seed: 0,
        }
    }
}

impl HitSetConfig {
    /// Load from `HITSET_*` environment variables; unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_TYPE) {
            config.hit_set_type = v.trim().parse()?;
        }
        if let Some(v) = lookup(ENV_FPP) {
            config.false_positive_rate = parse_var(ENV_FPP, v)?;
        }
        if let Some(v) = lookup(ENV_TARGET_SIZE) {
            config.target_size = parse_var(ENV_TARGET_SIZE, v)?;
        }
        if let Some(v) = lookup(ENV_SEED) {
            config.seed = parse_var(ENV_SEED, v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the Bloom settings. Other types ignore them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hit_set_type != HitSetType::Bloom {
            return Ok(());
        }

        // wire format stores millionths in a u16
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate <= MAX_ENCODABLE_FPP) {
            return Err(ConfigError::InvalidFPR {
                fpr: self.false_positive_rate,
                max: MAX_ENCODABLE_FPP,
            });
        }

        if self.target_size == 0 || self.target_size > MAX_TARGET_SIZE {
            return Err(ConfigError::InvalidTargetSize {
                size: self.target_size,
                max: MAX_TARGET_SIZE,
            });
        }

        Ok(())
    }

    /// Parameters for a fresh hit set of the configured type.
    pub fn to_params(&self) -> Params {
        match self.hit_set_type {
            HitSetType::None => Params::None,
            HitSetType::ExplicitHash => Params::ExplicitHash(ExplicitHashParams),
            HitSetType::ExplicitObject => Params::ExplicitObject(ExplicitObjectParams),
            HitSetType::Bloom => Params::Bloom(BloomParams::new(
                self.false_positive_rate,
                self.target_size,
                self.seed,
            )),
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

/// Builder for HitSetConfig with validation
#[derive(Default)]
pub struct HitSetConfigBuilder {
    hit_set_type: Option<HitSetType>,
    false_positive_rate: Option<f64>,
    target_size: Option<u64>,
    seed: Option<u64>,
}

impl HitSetConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit_set_type(mut self, ty: HitSetType) -> Self {
        self.hit_set_type = Some(ty);
        self
    }

    /// Set the Bloom false positive rate (must be in (0, 0.065535])
    pub fn false_positive_rate(mut self, fpr: f64) -> Self {
        self.false_positive_rate = Some(fpr);
        self
    }

    pub fn target_size(mut self, size: u64) -> Self {
        self.target_size = Some(size);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the HitSetConfig, validating all parameters
    pub fn build(self) -> Result<HitSetConfig, ConfigError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation
    pub fn build_unchecked(self) -> HitSetConfig {
        let defaults = HitSetConfig::default();

        HitSetConfig {
            hit_set_type: self.hit_set_type.unwrap_or(defaults.hit_set_type),
            false_positive_rate: self.false_positive_rate.unwrap_or(defaults.false_positive_rate),
            target_size: self.target_size.unwrap_or(defaults.target_size),
            seed: self.seed.unwrap_or(defaults.seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = HitSetConfig::default();
        assert_eq!(config.hit_set_type, HitSetType::Bloom);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_fpr_out_of_range() {
        for fpr in [0.0, -0.1, 0.07, 0.5, f64::NAN] {
            let config = HitSetConfig {
                false_positive_rate: fpr,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidFPR { .. })),
                "fpr {fpr} should be rejected"
            );
        }
    }

    #[test]
    fn test_validation_accepts_edge_of_wire_range() {
        let config = HitSetConfig {
            false_positive_rate: MAX_ENCODABLE_FPP,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_target() {
        let config = HitSetConfig {
            target_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTargetSize { size: 0, .. })
        ));
    }

    #[test]
    fn test_validation_rejects_huge_target() {
        let config = HitSetConfig {
            target_size: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTargetSize { size: u64::MAX, max: MAX_TARGET_SIZE })
        ));

        let config = HitSetConfig {
            target_size: MAX_TARGET_SIZE,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_types_ignore_bloom_settings() {
        let config = HitSetConfig {
            hit_set_type: HitSetType::ExplicitObject,
            false_positive_rate: 0.9,
            target_size: 0,
            seed: 0,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.to_params(), Params::ExplicitObject(ExplicitObjectParams));
    }

    #[test]
    fn test_builder_uses_defaults() {
        let config = HitSetConfigBuilder::new()
            .false_positive_rate(0.01)
            .build()
            .expect("Should use defaults for other fields");

        let defaults = HitSetConfig::default();
        assert_eq!(config.hit_set_type, defaults.hit_set_type);
        assert_eq!(config.target_size, defaults.target_size);
        assert_eq!(config.false_positive_rate, 0.01);
    }

    #[test]
    fn test_builder_rejects_invalid_fpr() {
        let result = HitSetConfigBuilder::new().false_positive_rate(0.2).build();
        assert!(matches!(result, Err(ConfigError::InvalidFPR { .. })));

        // unchecked lets it through
        let config = HitSetConfigBuilder::new().false_positive_rate(0.2).build_unchecked();
        assert_eq!(config.false_positive_rate, 0.2);
    }

    #[test]
    fn test_to_params_bloom() {
        let config = HitSetConfigBuilder::new()
            .false_positive_rate(0.02)
            .target_size(500)
            .seed(9)
            .build()
            .unwrap();

        let params = config.to_params();
        let bloom = params.get_as::<BloomParams>().unwrap();
        assert_eq!(bloom.false_positive, 0.02);
        assert_eq!(bloom.target_size, 500);
        assert_eq!(bloom.seed, 9);
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let config = HitSetConfig::from_lookup(lookup(&[
            (ENV_TYPE, "bloom"),
            (ENV_FPP, "0.01"),
            (ENV_TARGET_SIZE, " 2000 "),
            (ENV_SEED, "42"),
        ]))
        .unwrap();

        assert_eq!(config.hit_set_type, HitSetType::Bloom);
        assert_eq!(config.false_positive_rate, 0.01);
        assert_eq!(config.target_size, 2000);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = HitSetConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HitSetConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = HitSetConfig::from_lookup(lookup(&[(ENV_TYPE, "cuckoo")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownType("cuckoo".to_string()));

        let err = HitSetConfig::from_lookup(lookup(&[(ENV_TARGET_SIZE, "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_TARGET_SIZE, .. }));

        let err = HitSetConfig::from_lookup(lookup(&[(ENV_FPP, "0.3")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFPR { .. }));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = HitSetConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"hit_set_type\":\"bloom\""));
        let back: HitSetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
