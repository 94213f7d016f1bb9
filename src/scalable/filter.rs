use super::{GrowthMode, ScalableBloomFilterConfig};
use crate::bloom::config::MAX_FIELD_VALUE;
use crate::bloom::{
    BloomFilter, BloomFilterConfig, FilterStats, FilterSummary, MembershipFilter,
};
use crate::error::{BloomError, BloomResult};
use crate::hash::BloomKey;
use crate::storage::{BitArrayStorage, Storage, StorageKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Bloom filter that grows as items arrive.
///
/// Items go into the newest generation until it reaches its capacity; then a
/// new generation is appended with `mode.ratio()` times the capacity and a
/// `decay_ratio` times tighter error rate. Queries check every generation.
/// Older generations are never written again.
#[derive(Clone, Debug)]
pub struct ScalableBloomFilter<S: Storage = BitArrayStorage> {
    pub(crate) config: ScalableBloomFilterConfig,
    pub(crate) filters: Vec<BloomFilter<S>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalableSummary {
    pub initial_capacity: usize,
    pub error_rate: f64,
    pub mode: GrowthMode,
    pub decay_ratio: f64,
    pub capacity: usize,
    pub count: usize,
    pub generations: Vec<FilterSummary>,
}

impl ScalableBloomFilter<BitArrayStorage> {
    /// Bit-packed filter with default capacity and error rate.
    pub fn with_mode(mode: GrowthMode) -> BloomResult<Self> {
        Self::new(ScalableBloomFilterConfig {
            mode,
            ..ScalableBloomFilterConfig::default()
        })
    }
}

impl<S: Storage> ScalableBloomFilter<S> {
    pub fn new(mut config: ScalableBloomFilterConfig) -> BloomResult<Self> {
        config.validate()?;
        config.storage = Some(config.storage.unwrap_or(S::DEFAULT_KIND));

        let mut filter = Self {
            config,
            filters: Vec::new(),
        };
        filter.grow()?;
        Ok(filter)
    }

    pub(crate) fn from_parts(
        config: ScalableBloomFilterConfig,
        filters: Vec<BloomFilter<S>>,
    ) -> Self {
        Self { config, filters }
    }

    pub fn config(&self) -> &ScalableBloomFilterConfig {
        &self.config
    }

    pub fn mode(&self) -> GrowthMode {
        self.config.mode
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.config.storage.unwrap_or(S::DEFAULT_KIND)
    }

    /// Generations, oldest first.
    pub fn generations(&self) -> &[BloomFilter<S>] {
        &self.filters
    }

    pub fn num_generations(&self) -> usize {
        self.filters.len()
    }

    fn next_generation_config(&self) -> BloomFilterConfig {
        let storage = Some(self.storage_kind());
        match self.filters.last() {
            None => BloomFilterConfig {
                capacity: self.config.initial_capacity,
                error_rate: self.config.initial_error_rate(),
                storage,
            },
            Some(last) => BloomFilterConfig {
                capacity: last
                    .capacity()
                    .saturating_mul(self.config.mode.ratio())
                    .min(MAX_FIELD_VALUE),
                error_rate: last.error_rate() * self.config.decay_ratio,
                storage,
            },
        }
    }

    fn grow(&mut self) -> BloomResult<()> {
        let config = self.next_generation_config();
        let generation = BloomFilter::<S>::new(config)?;
        debug!(
            generation = self.filters.len(),
            capacity = generation.capacity(),
            error_rate = generation.error_rate(),
            num_bits = generation.num_bits(),
            "Appending scalable filter generation"
        );
        self.filters.push(generation);
        Ok(())
    }

    /// Chain holding the keys of both operands. Both chains must have been
    /// built with the same parameters and have the same number of
    /// generations.
    pub fn union(&self, other: &Self) -> BloomResult<Self> {
        if self.storage_kind() != other.storage_kind() {
            return Err(BloomError::TypeMismatch {
                left: self.storage_kind(),
                right: other.storage_kind(),
            });
        }
        if self.config != other.config {
            return Err(BloomError::ParameterMismatch(format!(
                "scalable config {:?} vs {:?}",
                self.config, other.config
            )));
        }
        if self.filters.len() != other.filters.len() {
            return Err(BloomError::ParameterMismatch(format!(
                "{} generations vs {}",
                self.filters.len(),
                other.filters.len()
            )));
        }

        let filters = self
            .filters
            .iter()
            .zip(&other.filters)
            .enumerate()
            .map(|(generation, (left, right))| {
                trace!(generation, "Merging scalable filter generation");
                left.union(right)
            })
            .collect::<BloomResult<Vec<_>>>()?;

        Ok(Self::from_parts(self.config.clone(), filters))
    }

    pub fn summary(&self) -> ScalableSummary {
        ScalableSummary {
            initial_capacity: self.config.initial_capacity,
            error_rate: self.config.error_rate,
            mode: self.config.mode,
            decay_ratio: self.config.decay_ratio,
            capacity: self.capacity(),
            count: self.len(),
            generations: self.filters.iter().map(BloomFilter::summary).collect(),
        }
    }
}

impl<S: Storage> MembershipFilter for ScalableBloomFilter<S> {
    fn add<K: BloomKey + ?Sized>(&mut self, key: &K) -> BloomResult<bool> {
        if self.contains(key) {
            return Ok(true);
        }
        if self.filters.last().is_none_or(BloomFilter::is_full) {
            self.grow()?;
        }
        let active = self.filters.len() - 1;
        self.filters[active].add(key)
    }

    fn contains<K: BloomKey + ?Sized>(&self, key: &K) -> bool {
        // Newest generations are the largest, so they are checked first.
        self.filters.iter().rev().any(|filter| filter.contains(key))
    }
}

impl<S: Storage> FilterStats for ScalableBloomFilter<S> {
    fn capacity(&self) -> usize {
        self.filters.iter().map(FilterStats::capacity).sum()
    }

    fn error_rate(&self) -> f64 {
        self.config.error_rate
    }

    fn len(&self) -> usize {
        self.filters.iter().map(FilterStats::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_generation_uses_tightened_rate() {
        let filter = ScalableBloomFilter::with_mode(GrowthMode::Small).unwrap();
        assert_eq!(filter.num_generations(), 1);
        let first = &filter.generations()[0];
        assert_eq!(first.capacity(), 100);
        assert!((first.error_rate() - 0.0001).abs() < 1e-12);
    }

    #[test]
    fn test_generation_parameters_follow_growth() {
        let config = ScalableBloomFilterConfig {
            initial_capacity: 10,
            mode: GrowthMode::Large,
            ..ScalableBloomFilterConfig::default()
        };
        let mut filter = ScalableBloomFilter::<BitArrayStorage>::new(config)
            .unwrap();
        filter.add_all(0..500u32).unwrap();

        let generations = filter.generations();
        assert!(generations.len() >= 3);
        let base = generations[0].error_rate();
        for (i, generation) in generations.iter().enumerate() {
            assert_eq!(generation.capacity(), 10 * 4usize.pow(i as u32));
            let expected = base * 0.9f64.powi(i as i32);
            assert!((generation.error_rate() - expected).abs() < 1e-12);
        }
        for sealed in &generations[..generations.len() - 1] {
            assert!(sealed.is_full());
        }
    }

    #[test]
    fn test_stats_sum_generations() {
        let config = ScalableBloomFilterConfig {
            initial_capacity: 4,
            ..ScalableBloomFilterConfig::default()
        };
        let mut filter = ScalableBloomFilter::<BitArrayStorage>::new(config)
            .unwrap();
        let added = filter.add_all((0..20u32).map(|i| format!("k{i}"))).unwrap();
        assert_eq!(filter.len(), added);
        let capacity: usize =
            filter.generations().iter().map(|g| g.capacity()).sum();
        assert_eq!(filter.capacity(), capacity);
        assert_eq!(filter.summary().generations.len(), filter.num_generations());
    }
}
