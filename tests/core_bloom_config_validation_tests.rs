use sliced_bloom_rs::{
    BloomError, BloomFilter, BloomFilterConfig, BloomFilterConfigBuilder,
    BloomParams, GrowthMode, ScalableBloomFilter, ScalableBloomFilterConfig,
    ScalableBloomFilterConfigBuilder, StorageKind,
};

#[cfg(test)]
mod capacity_validation_tests {
    use super::*;

    #[test]
    fn test_zero_capacity_fails() {
        let config = BloomFilterConfigBuilder::default()
            .capacity(0)
            .error_rate(0.01)
            .build()
            .unwrap();

        let result = config.validate();
        assert!(result.is_err());
        match result.unwrap_err() {
            BloomError::InvalidConfig(msg) => {
                assert!(msg.contains("Capacity must be > 0"));
            }
            _ => panic!("Expected InvalidConfig error for zero capacity"),
        }
        assert!(matches!(
            BloomFilter::<sliced_bloom_rs::BitArrayStorage>::new(config),
            Err(BloomError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_minimum_valid_capacity() {
        let config = BloomFilterConfigBuilder::default()
            .capacity(1)
            .error_rate(0.01)
            .build()
            .unwrap();
        assert!(config.validate().is_ok());

        let params = BloomParams::try_from(&config).unwrap();
        assert_eq!(params.num_slices, 7);
        assert!(params.bits_per_slice >= 1);
    }

    #[test]
    fn test_capacity_above_format_limit_fails() {
        let config = BloomFilterConfig::new(u32::MAX as usize + 1, 0.5);
        assert!(matches!(
            config.validate(),
            Err(BloomError::InvalidConfig(_))
        ));
    }
}

#[cfg(test)]
mod error_rate_validation_tests {
    use super::*;

    #[test]
    fn test_out_of_range_error_rates_fail() {
        for error_rate in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let config = BloomFilterConfig::new(100, error_rate);
            match config.validate() {
                Err(BloomError::InvalidConfig(msg)) => {
                    assert!(msg.contains("Error rate must be between 0 and 1"));
                }
                other => panic!("Expected InvalidConfig for {error_rate}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_boundary_error_rates_succeed() {
        for error_rate in [1e-9, 0.5, 0.999] {
            let config = BloomFilterConfig::new(100, error_rate);
            assert!(config.validate().is_ok(), "{error_rate} should be valid");
        }
    }
}

#[cfg(test)]
mod builder_defaults_tests {
    use super::*;

    #[test]
    fn test_bloom_builder_defaults() {
        let config = BloomFilterConfigBuilder::default().build().unwrap();
        assert_eq!(config.capacity, 1_000);
        assert_eq!(config.error_rate, 0.001);
        assert_eq!(config.storage, None);
    }

    #[test]
    fn test_storage_choice_is_recorded() {
        let config = BloomFilterConfigBuilder::default()
            .storage(StorageKind::BoolVec)
            .build()
            .unwrap();
        let filter =
            BloomFilter::<sliced_bloom_rs::AnyStorage>::new(config).unwrap();
        assert_eq!(filter.storage_kind(), StorageKind::BoolVec);
        assert_eq!(filter.config().storage, Some(StorageKind::BoolVec));
    }

    #[test]
    fn test_scalable_builder_defaults() {
        let config = ScalableBloomFilterConfigBuilder::default().build().unwrap();
        assert_eq!(config, ScalableBloomFilterConfig::default());
        assert_eq!(config.initial_capacity, 100);
        assert_eq!(config.error_rate, 0.001);
        assert_eq!(config.mode, GrowthMode::Small);
        assert_eq!(config.decay_ratio, 0.9);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ScalableBloomFilterConfigBuilder::default()
            .mode(GrowthMode::Large)
            .storage(StorageKind::BitArray)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"large\""));
        assert!(json.contains("\"bit_array\""));
        let back: ScalableBloomFilterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

#[cfg(test)]
mod scalable_validation_tests {
    use super::*;

    #[test]
    fn test_invalid_decay_ratio_fails() {
        for decay_ratio in [0.0, 1.0, 1.2, -0.5] {
            let config = ScalableBloomFilterConfigBuilder::default()
                .decay_ratio(decay_ratio)
                .build()
                .unwrap();
            assert!(matches!(
                ScalableBloomFilter::<sliced_bloom_rs::BitArrayStorage>::new(
                    config
                ),
                Err(BloomError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_zero_initial_capacity_fails() {
        let config = ScalableBloomFilterConfigBuilder::default()
            .initial_capacity(0)
            .build()
            .unwrap();
        match config.validate() {
            Err(BloomError::InvalidConfig(msg)) => {
                assert!(msg.contains("Initial capacity must be > 0"));
            }
            other => panic!("Expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_growth_ratio_mapping() {
        assert_eq!(GrowthMode::Small.ratio(), 2);
        assert_eq!(GrowthMode::Large.ratio(), 4);
        assert_eq!(GrowthMode::from_ratio(4), Some(GrowthMode::Large));
        assert_eq!(GrowthMode::from_ratio(3), None);
    }
}
