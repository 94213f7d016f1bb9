use crate::bloom::config::{MAX_FIELD_VALUE, validate_error_rate};
use crate::error::{BloomError, BloomResult};
use crate::storage::StorageKind;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// How fast each new generation grows relative to the previous one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMode {
    /// Doubles capacity per generation; less memory for small sets.
    #[default]
    Small,
    /// Quadruples capacity per generation; fewer generations for big sets.
    Large,
}

impl GrowthMode {
    pub fn ratio(self) -> usize {
        match self {
            GrowthMode::Small => 2,
            GrowthMode::Large => 4,
        }
    }

    pub fn from_ratio(ratio: usize) -> Option<Self> {
        match ratio {
            2 => Some(GrowthMode::Small),
            4 => Some(GrowthMode::Large),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct ScalableBloomFilterConfig {
    /// Capacity of the first generation
    #[builder(default = "100")]
    pub initial_capacity: usize,

    /// Bound on the false positive rate of the whole chain
    #[builder(default = "0.001")]
    pub error_rate: f64,

    /// Capacity growth between generations
    #[builder(default = "GrowthMode::Small")]
    pub mode: GrowthMode,

    /// Error rate tightening between generations (0.0 to 1.0, exclusive)
    #[builder(default = "0.9")]
    pub decay_ratio: f64,

    /// Storage variant; `None` picks the storage type's default
    #[builder(default, setter(strip_option))]
    pub storage: Option<StorageKind>,
}

impl Default for ScalableBloomFilterConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 100,
            error_rate: 0.001,
            mode: GrowthMode::Small,
            decay_ratio: 0.9,
            storage: None,
        }
    }
}

impl ScalableBloomFilterConfig {
    pub fn validate(&self) -> BloomResult<()> {
        if self.initial_capacity == 0 {
            return Err(BloomError::InvalidConfig(
                "Initial capacity must be > 0".into(),
            ));
        }
        if self.initial_capacity > MAX_FIELD_VALUE {
            return Err(BloomError::InvalidConfig(format!(
                "Initial capacity must be <= {MAX_FIELD_VALUE}"
            )));
        }
        validate_error_rate(self.error_rate)?;
        if !(self.decay_ratio > 0.0 && self.decay_ratio < 1.0) {
            return Err(BloomError::InvalidConfig(format!(
                "Decay ratio must be between 0 and 1, got {}",
                self.decay_ratio
            )));
        }
        Ok(())
    }

    /// Error rate of generation 0. Generation `i` gets this times
    /// `decay_ratio^i`, so the rates of all generations sum to at most
    /// `error_rate`.
    pub fn initial_error_rate(&self) -> f64 {
        self.error_rate * (1.0 - self.decay_ratio)
    }
}
