//! Hit set type tags
//!
//! The tag travels on the wire ahead of every `HitSet` and `Params` payload,
//! so its numeric values are fixed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which tracking strategy a `HitSet` or `Params` holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HitSetType {
    #[default]
    None = 0,
    ExplicitHash = 1,
    ExplicitObject = 2,
    Bloom = 3,
}

impl HitSetType {
    pub const ALL: [HitSetType; 4] = [
        HitSetType::None,
        HitSetType::ExplicitHash,
        HitSetType::ExplicitObject,
        HitSetType::Bloom,
    ];

    /// Map a wire tag to a type; `None` for tags outside the known set.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HitSetType::None),
            1 => Some(HitSetType::ExplicitHash),
            2 => Some(HitSetType::ExplicitObject),
            3 => Some(HitSetType::Bloom),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            HitSetType::None => "none",
            HitSetType::ExplicitHash => "explicit_hash",
            HitSetType::ExplicitObject => "explicit_object",
            HitSetType::Bloom => "bloom",
        }
    }
}

impl fmt::Display for HitSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HitSetType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HitSetType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ConfigError::UnknownType(s.to_string()))
    }
}
