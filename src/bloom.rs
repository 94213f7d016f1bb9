//! Fixed-capacity partitioned Bloom filter
pub mod config;
pub mod filter;
pub mod traits;

pub use config::{
    BloomFilterConfig, BloomFilterConfigBuilder, BloomFilterConfigBuilderError,
    BloomParams,
};
pub use filter::{BloomFilter, FilterSummary};
pub use traits::{FilterStats, MembershipFilter};
