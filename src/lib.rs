//! Partitioned ("sliced") Bloom filters with pluggable bit storage.
//!
//! HowTo:
//!    * Slices: a filter for `capacity` items at false positive rate `e` holds
//!      k = ceil(log2(1/e)) slices of b bits each, and every key sets exactly
//!      one bit per slice.
//!    * Hashing: a key's bytes are fed to a salted cryptographic digest (MD5
//!      up to SHA-512, picked by how many hash bits the filter needs) and the
//!      digest output is cut into k words, one per slice.
//!    * Storage: bits live behind the [`Storage`] trait. [`BitArrayStorage`]
//!      packs them, [`BoolVecStorage`] keeps one `bool` per bit, and
//!      [`AnyStorage`] picks either at runtime.
//!
//! Growth:
//!     * [`BloomFilter`] refuses new items once `capacity` is reached.
//!     * [`ScalableBloomFilter`] appends a larger, tighter generation instead,
//!       so its false positive rate stays bounded however many items arrive.
//!
//! Persistence:
//!     * Both filters write a big-endian header followed by the raw storage
//!       bytes (see [`codec`]). The storage variant is chosen on read.
//!
//! ```
//! use sliced_bloom_rs::{BloomFilter, MembershipFilter};
//!
//! let mut filter = BloomFilter::with_capacity(1_000, 0.001)?;
//! filter.add("apple")?;
//! assert!(filter.contains("apple"));
//!
//! let restored = BloomFilter::<sliced_bloom_rs::BitArrayStorage>::from_bytes(
//!     &filter.to_bytes()?,
//! )?;
//! assert!(restored.contains("apple"));
//! # Ok::<(), sliced_bloom_rs::BloomError>(())
//! ```
pub mod bloom;
pub mod codec;
pub mod common;
mod error;
pub mod hash;
pub mod scalable;
pub mod storage;

pub use bloom::{
    BloomFilter, BloomFilterConfig, BloomFilterConfigBuilder,
    BloomFilterConfigBuilderError, BloomParams, FilterStats, FilterSummary,
    MembershipFilter,
};
pub use common::{bits2hr, bytes2hr};
pub use error::{BloomError, BloomResult};
pub use hash::{
    BloomKey, DigestKind, HashScheme, optimal_bits_per_slice,
    optimal_num_slices,
};
pub use scalable::{
    GrowthMode, ScalableBloomFilter, ScalableBloomFilterConfig,
    ScalableBloomFilterConfigBuilder, ScalableBloomFilterConfigBuilderError,
    ScalableSummary,
};
pub use storage::{
    AnyStorage, BitArrayStorage, BoolVecStorage, Storage, StorageKind,
};
