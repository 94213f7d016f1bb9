use super::{BloomFilterConfig, BloomParams, FilterStats, MembershipFilter};
use crate::error::{BloomError, BloomResult};
use crate::hash::{BloomKey, DigestKind, HashScheme};
use crate::storage::{BitArrayStorage, Storage, StorageKind};
use serde::{Deserialize, Serialize};

/// Fixed-capacity partitioned Bloom filter.
///
/// The bit array is split into `num_slices` slices and every key sets
/// exactly one bit per slice. Adding more than `capacity` distinct items is
/// refused with [`BloomError::CapacityExhausted`]; use
/// [`crate::ScalableBloomFilter`] when the number of items is not known up
/// front.
#[derive(Clone, Debug)]
pub struct BloomFilter<S: Storage = BitArrayStorage> {
    pub(crate) config: BloomFilterConfig,
    pub(crate) params: BloomParams,
    hasher: HashScheme,
    pub(crate) storage: S,
    pub(crate) count: usize,
}

/// Point-in-time description of a filter, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub capacity: usize,
    pub error_rate: f64,
    pub count: usize,
    pub num_slices: usize,
    pub bits_per_slice: usize,
    pub num_bits: usize,
    pub storage: StorageKind,
    pub digest: DigestKind,
    pub fill_ratio: f64,
    pub estimated_error_rate: f64,
}

impl BloomFilter<BitArrayStorage> {
    /// Bit-packed filter for `capacity` items at `error_rate`.
    pub fn with_capacity(capacity: usize, error_rate: f64) -> BloomResult<Self> {
        Self::new(BloomFilterConfig::new(capacity, error_rate))
    }
}

impl<S: Storage> BloomFilter<S> {
    pub fn new(mut config: BloomFilterConfig) -> BloomResult<Self> {
        let params = BloomParams::try_from(&config)?;
        let kind = config.storage.unwrap_or(S::DEFAULT_KIND);
        let storage = S::allocate(kind, params.storage_bits())?;
        config.storage = Some(kind);

        Ok(Self::from_parts(config, params, storage, 0))
    }

    pub(crate) fn from_parts(
        config: BloomFilterConfig,
        params: BloomParams,
        storage: S,
        count: usize,
    ) -> Self {
        Self {
            hasher: HashScheme::new(params.num_slices, params.bits_per_slice),
            config,
            params,
            storage,
            count,
        }
    }

    pub fn config(&self) -> &BloomFilterConfig {
        &self.config
    }

    pub fn params(&self) -> &BloomParams {
        &self.params
    }

    pub fn num_slices(&self) -> usize {
        self.params.num_slices
    }

    pub fn bits_per_slice(&self) -> usize {
        self.params.bits_per_slice
    }

    pub fn num_bits(&self) -> usize {
        self.params.num_bits
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    pub fn hash_scheme(&self) -> &HashScheme {
        &self.hasher
    }

    /// Bit positions `key` maps to in this filter.
    pub fn positions<K: BloomKey + ?Sized>(&self, key: &K) -> Vec<usize> {
        self.hasher.key_positions(key)
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.config.capacity
    }

    /// Share of bits currently set.
    pub fn fill_ratio(&self) -> f64 {
        self.storage.count_ones() as f64 / self.params.num_bits as f64
    }

    /// False positive probability implied by the current fill ratio.
    pub fn estimated_error_rate(&self) -> f64 {
        self.fill_ratio().powi(self.params.num_slices as i32)
    }

    /// Clears every bit and resets the item count; dimensions are kept.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.count = 0;
    }

    pub fn copy(&self) -> Self {
        Self {
            config: self.config.clone(),
            params: self.params,
            hasher: self.hasher.clone(),
            storage: self.storage.copy(),
            count: self.count,
        }
    }

    /// Filter holding the keys of both operands. The resulting count is the
    /// larger of the two counts, a lower bound on the true cardinality.
    pub fn union(&self, other: &Self) -> BloomResult<Self> {
        self.ensure_compatible(other)?;
        let storage = self.storage.union(&other.storage)?;
        Ok(self.with_storage(storage, self.count.max(other.count)))
    }

    /// Filter holding the keys present in both operands (plus the false
    /// positives of each).
    pub fn intersection(&self, other: &Self) -> BloomResult<Self> {
        self.ensure_compatible(other)?;
        let storage = self.storage.intersection(&other.storage)?;
        Ok(self.with_storage(storage, self.count.max(other.count)))
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self.ensure_compatible(other).is_ok()
    }

    fn ensure_compatible(&self, other: &Self) -> BloomResult<()> {
        if self.config.capacity != other.config.capacity {
            return Err(BloomError::ParameterMismatch(format!(
                "capacity {} vs {}",
                self.config.capacity, other.config.capacity
            )));
        }
        if self.config.error_rate != other.config.error_rate {
            return Err(BloomError::ParameterMismatch(format!(
                "error rate {} vs {}",
                self.config.error_rate, other.config.error_rate
            )));
        }
        if self.params != other.params {
            return Err(BloomError::ParameterMismatch(format!(
                "{} slices of {} bits vs {} slices of {} bits",
                self.params.num_slices,
                self.params.bits_per_slice,
                other.params.num_slices,
                other.params.bits_per_slice
            )));
        }
        if self.storage.kind() != other.storage.kind() {
            return Err(BloomError::TypeMismatch {
                left: self.storage.kind(),
                right: other.storage.kind(),
            });
        }
        Ok(())
    }

    fn with_storage(&self, storage: S, count: usize) -> Self {
        Self {
            config: self.config.clone(),
            params: self.params,
            hasher: self.hasher.clone(),
            storage,
            count,
        }
    }

    pub fn summary(&self) -> FilterSummary {
        FilterSummary {
            capacity: self.config.capacity,
            error_rate: self.config.error_rate,
            count: self.count,
            num_slices: self.params.num_slices,
            bits_per_slice: self.params.bits_per_slice,
            num_bits: self.params.num_bits,
            storage: self.storage.kind(),
            digest: self.hasher.digest_kind(),
            fill_ratio: self.fill_ratio(),
            estimated_error_rate: self.estimated_error_rate(),
        }
    }
}

impl<S: Storage> MembershipFilter for BloomFilter<S> {
    fn add<K: BloomKey + ?Sized>(&mut self, key: &K) -> BloomResult<bool> {
        let positions = self.hasher.key_positions(key);
        if positions.iter().all(|&pos| self.storage.get(pos)) {
            return Ok(true);
        }
        if self.is_full() {
            return Err(BloomError::CapacityExhausted {
                capacity: self.config.capacity,
            });
        }
        for pos in positions {
            self.storage.set(pos);
        }
        self.count += 1;
        Ok(false)
    }

    fn contains<K: BloomKey + ?Sized>(&self, key: &K) -> bool {
        self.hasher
            .key_positions(key)
            .into_iter()
            .all(|pos| self.storage.get(pos))
    }
}

impl<S: Storage> FilterStats for BloomFilter<S> {
    fn capacity(&self) -> usize {
        self.config.capacity
    }

    fn error_rate(&self) -> f64 {
        self.config.error_rate
    }

    fn len(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BoolVecStorage;

    #[test]
    fn test_dimensions() {
        let filter = BloomFilter::with_capacity(100, 0.001).unwrap();
        assert_eq!(filter.num_slices(), 10);
        assert_eq!(filter.bits_per_slice(), 144);
        assert_eq!(filter.num_bits(), 1440);
        assert_eq!(filter.storage().num_bits(), 1440);
        assert_eq!(filter.storage_kind(), StorageKind::BitArray);
        assert_eq!(filter.hash_scheme().digest_kind(), DigestKind::Sha384);
    }

    #[test]
    fn test_storage_is_byte_aligned() {
        let filter = BloomFilter::with_capacity(10, 0.5).unwrap();
        assert_eq!(filter.num_slices(), 1);
        assert_eq!(filter.num_bits(), 15);
        assert_eq!(filter.storage().num_bits(), 16);
    }

    #[test]
    fn test_add_reports_duplicates_without_counting() {
        let mut filter = BloomFilter::with_capacity(10, 0.01).unwrap();
        assert!(!filter.add("a").unwrap());
        assert!(filter.add("a").unwrap());
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_capacity_is_a_hard_ceiling() {
        let mut filter = BloomFilter::with_capacity(3, 0.001).unwrap();
        for key in ["a", "b", "c"] {
            filter.add(key).unwrap();
        }
        assert!(filter.is_full());
        let before = filter.storage().clone();
        let fresh = (0..)
            .map(|i| format!("fresh-{i}"))
            .find(|key| !filter.contains(key.as_str()))
            .unwrap();
        let err = filter.add(fresh.as_str()).unwrap_err();
        assert!(matches!(err, BloomError::CapacityExhausted { capacity: 3 }));
        assert_eq!(filter.len(), 3);
        assert_eq!(filter.storage(), &before);
        // Known members are still accepted at capacity.
        assert!(filter.add("b").unwrap());
    }

    #[test]
    fn test_explicit_storage_kind_must_match_type() {
        let config = BloomFilterConfig {
            storage: Some(StorageKind::BoolVec),
            ..BloomFilterConfig::new(10, 0.01)
        };
        assert!(BloomFilter::<BitArrayStorage>::new(config.clone()).is_err());
        let filter = BloomFilter::<BoolVecStorage>::new(config).unwrap();
        assert_eq!(filter.storage_kind(), StorageKind::BoolVec);
    }

    #[test]
    fn test_clear_and_copy() {
        let mut filter = BloomFilter::with_capacity(10, 0.01).unwrap();
        filter.add("x").unwrap();
        let copy = filter.copy();
        filter.clear();
        assert!(filter.is_empty());
        assert!(!filter.contains("x"));
        assert!(copy.contains("x"));
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn test_summary() {
        let mut filter = BloomFilter::with_capacity(100, 0.01).unwrap();
        filter.add_all(0..50u32).unwrap();
        let summary = filter.summary();
        assert_eq!(summary.count, 50);
        assert_eq!(summary.num_slices, 7);
        assert!(summary.fill_ratio > 0.0 && summary.fill_ratio < 1.0);
        assert!(summary.estimated_error_rate < 0.01);
    }
}
