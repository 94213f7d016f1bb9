//! Key hashing and filter sizing.
//!
//! A filter with `num_slices` (k) slices of `bits_per_slice` (b) bits maps a
//! key to exactly one bit in each slice. The indexes are drawn from a salted
//! cryptographic digest of the key: the smallest digest in the family whose
//! output covers `k` words is used, and additional salted invocations are
//! made when even the widest digest is too short.
use digest::Digest;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::borrow::Cow;
use std::fmt;

/// Slices at or above this width draw 8-byte words from the digest.
const WIDE_SLICE_BITS: u64 = 1 << 31;

/// Digest families available to [`HashScheme`], ordered by output width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestKind {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestKind {
    pub fn output_bytes(self) -> usize {
        match self {
            DigestKind::Md5 => 16,
            DigestKind::Sha1 => 20,
            DigestKind::Sha256 => 32,
            DigestKind::Sha384 => 48,
            DigestKind::Sha512 => 64,
        }
    }

    /// Smallest digest whose output holds `needed_bits` bits, falling back
    /// to the widest one.
    pub fn for_output_bits(needed_bits: u64) -> Self {
        if needed_bits > 384 {
            DigestKind::Sha512
        } else if needed_bits > 256 {
            DigestKind::Sha384
        } else if needed_bits > 160 {
            DigestKind::Sha256
        } else if needed_bits > 128 {
            DigestKind::Sha1
        } else {
            DigestKind::Md5
        }
    }

    fn salted(self, counter: u32) -> SaltedDigest {
        let seed = counter.to_le_bytes();
        match self {
            DigestKind::Md5 => {
                SaltedDigest::Md5(Md5::new_with_prefix(Md5::digest(seed)))
            }
            DigestKind::Sha1 => {
                SaltedDigest::Sha1(Sha1::new_with_prefix(Sha1::digest(seed)))
            }
            DigestKind::Sha256 => SaltedDigest::Sha256(
                Sha256::new_with_prefix(Sha256::digest(seed)),
            ),
            DigestKind::Sha384 => SaltedDigest::Sha384(
                Sha384::new_with_prefix(Sha384::digest(seed)),
            ),
            DigestKind::Sha512 => SaltedDigest::Sha512(
                Sha512::new_with_prefix(Sha512::digest(seed)),
            ),
        }
    }
}

/// Digest state that has already absorbed its salt. Hashing a key clones the
/// state, so the salt is paid for once per filter, not once per key.
#[derive(Clone)]
enum SaltedDigest {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

fn finish<D: Digest + Clone>(state: &D, key: &[u8]) -> Vec<u8> {
    state.clone().chain_update(key).finalize().to_vec()
}

impl SaltedDigest {
    fn digest(&self, key: &[u8]) -> Vec<u8> {
        match self {
            SaltedDigest::Md5(state) => finish(state, key),
            SaltedDigest::Sha1(state) => finish(state, key),
            SaltedDigest::Sha256(state) => finish(state, key),
            SaltedDigest::Sha384(state) => finish(state, key),
            SaltedDigest::Sha512(state) => finish(state, key),
        }
    }
}

/// Deterministic mapping from keys to `num_slices` bit positions, one per
/// slice of `bits_per_slice` bits.
#[derive(Clone)]
pub struct HashScheme {
    num_slices: usize,
    bits_per_slice: usize,
    word_bytes: usize,
    digest_kind: DigestKind,
    salts: Vec<SaltedDigest>,
}

impl HashScheme {
    /// Both arguments must be non-zero.
    pub fn new(num_slices: usize, bits_per_slice: usize) -> Self {
        let word_bytes = if bits_per_slice as u64 >= WIDE_SLICE_BITS {
            8
        } else {
            4
        };
        let needed_bits = 8 * (num_slices * word_bytes) as u64;
        let digest_kind = DigestKind::for_output_bits(needed_bits);
        let words_per_digest = digest_kind.output_bytes() / word_bytes;
        let num_salts = num_slices.div_ceil(words_per_digest);
        let salts = (0..num_salts as u32)
            .map(|counter| digest_kind.salted(counter))
            .collect();

        Self {
            num_slices,
            bits_per_slice,
            word_bytes,
            digest_kind,
            salts,
        }
    }

    pub fn digest_kind(&self) -> DigestKind {
        self.digest_kind
    }

    /// Number of digest invocations per key.
    pub fn num_salts(&self) -> usize {
        self.salts.len()
    }

    pub fn num_slices(&self) -> usize {
        self.num_slices
    }

    pub fn bits_per_slice(&self) -> usize {
        self.bits_per_slice
    }

    /// Absolute bit positions for an already encoded key, in slice order.
    /// Position `i` always falls inside slice `i`.
    pub fn positions(&self, key: &[u8]) -> Vec<usize> {
        let slice_bits = self.bits_per_slice as u64;
        let mut positions = Vec::with_capacity(self.num_slices);

        for salt in &self.salts {
            let output = salt.digest(key);
            for word in output.chunks_exact(self.word_bytes) {
                if positions.len() == self.num_slices {
                    return positions;
                }
                let value = self.read_word(word);
                let offset = positions.len() * self.bits_per_slice;
                positions.push(offset + (value % slice_bits) as usize);
            }
        }
        positions
    }

    /// Positions for any [`BloomKey`].
    pub fn key_positions<K: BloomKey + ?Sized>(&self, key: &K) -> Vec<usize> {
        self.positions(&key.key_bytes())
    }

    fn read_word(&self, word: &[u8]) -> u64 {
        let mut buf = [0u8; 8];
        buf[..word.len()].copy_from_slice(word);
        u64::from_le_bytes(buf)
    }
}

impl fmt::Debug for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashScheme")
            .field("num_slices", &self.num_slices)
            .field("bits_per_slice", &self.bits_per_slice)
            .field("word_bytes", &self.word_bytes)
            .field("digest_kind", &self.digest_kind)
            .field("num_salts", &self.salts.len())
            .finish()
    }
}

/// Something that can be stored in a filter.
///
/// Text is hashed as UTF-8, integers as their decimal representation and
/// byte buffers as-is, so `"42"` and `42u32` are the same key.
pub trait BloomKey {
    fn key_bytes(&self) -> Cow<'_, [u8]>;
}

impl BloomKey for str {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl BloomKey for String {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl BloomKey for [u8] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl BloomKey for Vec<u8> {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl<const N: usize> BloomKey for [u8; N] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl BloomKey for char {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        let mut buf = [0u8; 4];
        Cow::Owned(self.encode_utf8(&mut buf).as_bytes().to_vec())
    }
}

impl<K: BloomKey + ?Sized> BloomKey for &K {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        (**self).key_bytes()
    }
}

macro_rules! impl_bloom_key_for_integers {
    ($($ty:ty),*) => {
        $(
            impl BloomKey for $ty {
                fn key_bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_string().into_bytes())
                }
            }
        )*
    };
}

impl_bloom_key_for_integers!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize
);

/// Number of slices `k = ceil(log2(1 / error_rate))`, at least 1.
pub fn optimal_num_slices(error_rate: f64) -> usize {
    ((1.0 / error_rate).log2().ceil() as usize).max(1)
}

/// Bits per slice `b = ceil(n * |ln p| / (k * ln(2)^2))`, at least 1.
pub fn optimal_bits_per_slice(
    capacity: usize,
    error_rate: f64,
    num_slices: usize,
) -> usize {
    let ln2 = std::f64::consts::LN_2;
    let bits = (capacity as f64 * error_rate.ln().abs())
        / (num_slices as f64 * ln2 * ln2);
    (bits.ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_digest_selection_by_width() {
        // 4-byte words: k * 32 bits are needed.
        assert_eq!(HashScheme::new(4, 100).digest_kind(), DigestKind::Md5);
        assert_eq!(HashScheme::new(5, 100).digest_kind(), DigestKind::Sha1);
        assert_eq!(HashScheme::new(8, 100).digest_kind(), DigestKind::Sha256);
        assert_eq!(HashScheme::new(12, 100).digest_kind(), DigestKind::Sha384);
        assert_eq!(HashScheme::new(20, 100).digest_kind(), DigestKind::Sha512);

        // 8-byte words once slices reach 2^31 bits.
        let wide = 1usize << 31;
        assert_eq!(HashScheme::new(2, wide).digest_kind(), DigestKind::Md5);
        assert_eq!(HashScheme::new(3, wide).digest_kind(), DigestKind::Sha256);
    }

    #[test]
    fn test_salts_cover_all_slices() {
        assert_eq!(HashScheme::new(4, 100).num_salts(), 1);
        assert_eq!(HashScheme::new(16, 100).num_salts(), 1);
        assert_eq!(HashScheme::new(17, 100).num_salts(), 2);
        assert_eq!(HashScheme::new(40, 100).num_salts(), 3);
        assert_eq!(HashScheme::new(40, 100).positions(b"key").len(), 40);
    }

    #[test]
    fn test_positions_fall_in_their_slice() {
        let scheme = HashScheme::new(10, 144);
        for i in 0..500u32 {
            let positions = scheme.key_positions(&i);
            assert_eq!(positions.len(), 10);
            for (slice, pos) in positions.iter().enumerate() {
                assert!(*pos >= slice * 144 && *pos < (slice + 1) * 144);
            }
        }
    }

    #[test]
    fn test_positions_are_deterministic() {
        let a = HashScheme::new(7, 1000);
        let b = HashScheme::new(7, 1000);
        assert_eq!(a.positions(b"hello"), b.positions(b"hello"));
        assert_ne!(a.positions(b"hello"), a.positions(b"world"));
    }

    #[test]
    fn test_positions_spread_over_slice() {
        let scheme = HashScheme::new(1, 64);
        let hit: HashSet<usize> = (0..2000u32)
            .map(|i| scheme.key_positions(&i)[0])
            .collect();
        assert!(hit.len() > 60, "only {} of 64 bits reached", hit.len());
    }

    #[test]
    fn test_key_encoding() {
        assert_eq!("42".key_bytes(), 42u32.key_bytes());
        assert_eq!((-7i64).key_bytes().as_ref(), b"-7");
        assert_eq!('é'.key_bytes().as_ref(), "é".as_bytes());
        assert_eq!(vec![1u8, 2].key_bytes().as_ref(), &[1u8, 2]);
        assert_eq!(String::from("abc").key_bytes().as_ref(), b"abc");
    }

    #[test]
    fn test_sizing_math() {
        assert_eq!(optimal_num_slices(0.001), 10);
        assert_eq!(optimal_num_slices(0.01), 7);
        assert_eq!(optimal_num_slices(0.5), 1);
        assert_eq!(optimal_num_slices(0.9), 1);

        // 100 * ln(1000) / (10 * ln2^2) = 143.78...
        assert_eq!(optimal_bits_per_slice(100, 0.001, 10), 144);
        assert_eq!(optimal_bits_per_slice(1, 0.9, 1), 1);
    }
}
