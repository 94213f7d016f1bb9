use crate::error::{BloomError, BloomResult};
use crate::hash::{optimal_bits_per_slice, optimal_num_slices};
use crate::storage::StorageKind;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Largest capacity, count or slice width the persistence format can carry.
pub const MAX_FIELD_VALUE: usize = u32::MAX as usize;

#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct BloomFilterConfig {
    /// Maximum number of distinct items
    #[builder(default = "1_000")]
    pub capacity: usize,

    /// Target false positive rate (0.0 to 1.0, exclusive)
    #[builder(default = "0.001")]
    pub error_rate: f64,

    /// Storage variant; `None` picks the storage type's default
    #[builder(default, setter(strip_option))]
    pub storage: Option<StorageKind>,
}

impl BloomFilterConfig {
    pub fn new(capacity: usize, error_rate: f64) -> Self {
        Self {
            capacity,
            error_rate,
            storage: None,
        }
    }

    pub fn validate(&self) -> BloomResult<()> {
        if self.capacity == 0 {
            return Err(BloomError::InvalidConfig(
                "Capacity must be > 0".into(),
            ));
        }
        if self.capacity > MAX_FIELD_VALUE {
            return Err(BloomError::InvalidConfig(format!(
                "Capacity must be <= {MAX_FIELD_VALUE}"
            )));
        }
        validate_error_rate(self.error_rate)
    }
}

pub(crate) fn validate_error_rate(error_rate: f64) -> BloomResult<()> {
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(BloomError::InvalidConfig(format!(
            "Error rate must be between 0 and 1, got {error_rate}"
        )));
    }
    Ok(())
}

/// Dimensions derived from a [`BloomFilterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomParams {
    pub num_slices: usize,
    pub bits_per_slice: usize,
    pub num_bits: usize,
}

impl BloomParams {
    pub fn new(num_slices: usize, bits_per_slice: usize) -> BloomResult<Self> {
        if num_slices == 0 || bits_per_slice == 0 {
            return Err(BloomError::InvalidConfig(
                "Slices and bits per slice must be > 0".into(),
            ));
        }
        if num_slices > MAX_FIELD_VALUE || bits_per_slice > MAX_FIELD_VALUE {
            return Err(BloomError::InvalidConfig(format!(
                "Filter dimensions too large: {num_slices} slices of {bits_per_slice} bits"
            )));
        }
        let num_bits = num_slices.checked_mul(bits_per_slice).ok_or_else(|| {
            BloomError::InvalidConfig(format!(
                "Filter dimensions overflow: {num_slices} x {bits_per_slice}"
            ))
        })?;

        Ok(Self {
            num_slices,
            bits_per_slice,
            num_bits,
        })
    }

    /// Bits actually allocated: `num_bits` rounded up to a whole byte.
    pub fn storage_bits(&self) -> usize {
        self.storage_bytes() * 8
    }

    pub fn storage_bytes(&self) -> usize {
        self.num_bits.div_ceil(8)
    }
}

impl TryFrom<&BloomFilterConfig> for BloomParams {
    type Error = BloomError;

    fn try_from(config: &BloomFilterConfig) -> BloomResult<Self> {
        config.validate()?;
        let num_slices = optimal_num_slices(config.error_rate);
        let bits_per_slice =
            optimal_bits_per_slice(config.capacity, config.error_rate, num_slices);
        Self::new(num_slices, bits_per_slice)
    }
}
