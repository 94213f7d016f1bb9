//! Scalable Bloom filter: a growing chain of fixed-capacity generations
pub mod config;
pub mod filter;

pub use config::{
    GrowthMode, ScalableBloomFilterConfig, ScalableBloomFilterConfigBuilder,
    ScalableBloomFilterConfigBuilderError,
};
pub use filter::{ScalableBloomFilter, ScalableSummary};
