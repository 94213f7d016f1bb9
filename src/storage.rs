//! Bit storage backends.
//!
//! A filter owns exactly one [`Storage`]. Every backend exposes the same
//! capability set, so the filter code (and the test suite) is agnostic to
//! how bits are actually kept. Bit `i` lives in byte `i / 8` at position
//! `i % 8`, least significant bit first.
use crate::error::{BloomError, BloomResult};
use bitvec::{bitvec, order::Lsb0, vec::BitVec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying a storage variant. Set algebra is only defined between
/// storages carrying the same tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    BitArray,
    BoolVec,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::BitArray => write!(f, "bit_array"),
            StorageKind::BoolVec => write!(f, "bool_vec"),
        }
    }
}

pub trait Storage: Clone + fmt::Debug {
    /// Variant produced when the caller does not ask for a specific one.
    const DEFAULT_KIND: StorageKind;

    /// Creates an all-clear storage of `num_bits` bits of the given variant.
    fn allocate(kind: StorageKind, num_bits: usize) -> BloomResult<Self>;

    /// Rebuilds a storage of the given variant from [`Storage::to_bytes`]
    /// output. The result always holds `8 * bytes.len()` bits.
    fn decode(kind: StorageKind, bytes: &[u8]) -> BloomResult<Self>;

    fn kind(&self) -> StorageKind;

    fn num_bits(&self) -> usize;

    fn clear(&mut self);

    /// Panics if `index >= num_bits()`.
    fn get(&self, index: usize) -> bool;

    /// Panics if `index >= num_bits()`.
    fn set(&mut self, index: usize);

    fn copy(&self) -> Self {
        self.clone()
    }

    fn union(&self, other: &Self) -> BloomResult<Self>;

    fn intersection(&self, other: &Self) -> BloomResult<Self>;

    /// Packs the bits little-endian into `ceil(num_bits / 8)` bytes; pad bits
    /// in the last byte are zero.
    fn to_bytes(&self) -> Vec<u8>;

    fn count_ones(&self) -> usize;
}

fn ensure_kind(expected: StorageKind, requested: StorageKind) -> BloomResult<()> {
    if expected != requested {
        return Err(BloomError::TypeMismatch {
            left: expected,
            right: requested,
        });
    }
    Ok(())
}

fn ensure_same_len(left: usize, right: usize) -> BloomResult<()> {
    if left != right {
        return Err(BloomError::LengthMismatch { left, right });
    }
    Ok(())
}

/// Bit-packed storage, one bit per position.
#[derive(Clone, PartialEq, Eq)]
pub struct BitArrayStorage {
    bits: BitVec<u8, Lsb0>,
}

impl BitArrayStorage {
    pub fn new(num_bits: usize) -> Self {
        Self {
            bits: bitvec![u8, Lsb0; 0; num_bits],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bits: BitVec::from_slice(bytes),
        }
    }

    fn combine(&self, other: &Self, op: impl Fn(u8, u8) -> u8) -> BloomResult<Self> {
        ensure_same_len(self.bits.len(), other.bits.len())?;
        let mut bits = self.bits.clone();
        for (dst, src) in bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *dst = op(*dst, *src);
        }
        Ok(Self { bits })
    }
}

impl fmt::Debug for BitArrayStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BitArrayStorage {{ num_bits: {}, ones: {} }}",
            self.bits.len(),
            self.bits.count_ones()
        )
    }
}

impl Storage for BitArrayStorage {
    const DEFAULT_KIND: StorageKind = StorageKind::BitArray;

    fn allocate(kind: StorageKind, num_bits: usize) -> BloomResult<Self> {
        ensure_kind(Self::DEFAULT_KIND, kind)?;
        Ok(Self::new(num_bits))
    }

    fn decode(kind: StorageKind, bytes: &[u8]) -> BloomResult<Self> {
        ensure_kind(Self::DEFAULT_KIND, kind)?;
        Ok(Self::from_bytes(bytes))
    }

    fn kind(&self) -> StorageKind {
        StorageKind::BitArray
    }

    fn num_bits(&self) -> usize {
        self.bits.len()
    }

    fn clear(&mut self) {
        self.bits.fill(false);
    }

    fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    fn set(&mut self, index: usize) {
        self.bits.set(index, true);
    }

    fn union(&self, other: &Self) -> BloomResult<Self> {
        self.combine(other, |a, b| a | b)
    }

    fn intersection(&self, other: &Self) -> BloomResult<Self> {
        self.combine(other, |a, b| a & b)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bits = self.bits.clone();
        bits.set_uninitialized(false);
        bits.into_vec()
    }

    fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }
}

/// One `bool` per position. Slow and large, but trivially correct; used as
/// the reference the packed backend is checked against.
#[derive(Clone, PartialEq, Eq)]
pub struct BoolVecStorage {
    bits: Vec<bool>,
}

impl BoolVecStorage {
    pub fn new(num_bits: usize) -> Self {
        Self {
            bits: vec![false; num_bits],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bits = bytes
            .iter()
            .flat_map(|byte| (0..8).map(move |shift| (byte >> shift) & 1 == 1))
            .collect();
        Self { bits }
    }

    fn combine(
        &self,
        other: &Self,
        op: impl Fn(bool, bool) -> bool,
    ) -> BloomResult<Self> {
        ensure_same_len(self.bits.len(), other.bits.len())?;
        let bits = self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(&a, &b)| op(a, b))
            .collect();
        Ok(Self { bits })
    }
}

impl fmt::Debug for BoolVecStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoolVecStorage {{ num_bits: {}, ones: {} }}",
            self.bits.len(),
            self.count_ones()
        )
    }
}

impl Storage for BoolVecStorage {
    const DEFAULT_KIND: StorageKind = StorageKind::BoolVec;

    fn allocate(kind: StorageKind, num_bits: usize) -> BloomResult<Self> {
        ensure_kind(Self::DEFAULT_KIND, kind)?;
        Ok(Self::new(num_bits))
    }

    fn decode(kind: StorageKind, bytes: &[u8]) -> BloomResult<Self> {
        ensure_kind(Self::DEFAULT_KIND, kind)?;
        Ok(Self::from_bytes(bytes))
    }

    fn kind(&self) -> StorageKind {
        StorageKind::BoolVec
    }

    fn num_bits(&self) -> usize {
        self.bits.len()
    }

    fn clear(&mut self) {
        self.bits.fill(false);
    }

    fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    fn set(&mut self, index: usize) {
        self.bits[index] = true;
    }

    fn union(&self, other: &Self) -> BloomResult<Self> {
        self.combine(other, |a, b| a || b)
    }

    fn intersection(&self, other: &Self) -> BloomResult<Self> {
        self.combine(other, |a, b| a && b)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (shift, &bit)| acc | ((bit as u8) << shift))
            })
            .collect()
    }

    fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }
}

/// Storage whose variant is picked at runtime, e.g. from a command line flag
/// or alongside a persisted filter. Mixing variants in set algebra is
/// rejected with [`BloomError::TypeMismatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnyStorage {
    BitArray(BitArrayStorage),
    BoolVec(BoolVecStorage),
}

impl AnyStorage {
    pub fn new(kind: StorageKind, num_bits: usize) -> Self {
        match kind {
            StorageKind::BitArray => {
                AnyStorage::BitArray(BitArrayStorage::new(num_bits))
            }
            StorageKind::BoolVec => {
                AnyStorage::BoolVec(BoolVecStorage::new(num_bits))
            }
        }
    }

    pub fn from_bytes(kind: StorageKind, bytes: &[u8]) -> Self {
        match kind {
            StorageKind::BitArray => {
                AnyStorage::BitArray(BitArrayStorage::from_bytes(bytes))
            }
            StorageKind::BoolVec => {
                AnyStorage::BoolVec(BoolVecStorage::from_bytes(bytes))
            }
        }
    }
}

impl Storage for AnyStorage {
    const DEFAULT_KIND: StorageKind = StorageKind::BitArray;

    fn allocate(kind: StorageKind, num_bits: usize) -> BloomResult<Self> {
        Ok(Self::new(kind, num_bits))
    }

    fn decode(kind: StorageKind, bytes: &[u8]) -> BloomResult<Self> {
        Ok(Self::from_bytes(kind, bytes))
    }

    fn kind(&self) -> StorageKind {
        match self {
            AnyStorage::BitArray(_) => StorageKind::BitArray,
            AnyStorage::BoolVec(_) => StorageKind::BoolVec,
        }
    }

    fn num_bits(&self) -> usize {
        match self {
            AnyStorage::BitArray(s) => s.num_bits(),
            AnyStorage::BoolVec(s) => s.num_bits(),
        }
    }

    fn clear(&mut self) {
        match self {
            AnyStorage::BitArray(s) => s.clear(),
            AnyStorage::BoolVec(s) => s.clear(),
        }
    }

    fn get(&self, index: usize) -> bool {
        match self {
            AnyStorage::BitArray(s) => s.get(index),
            AnyStorage::BoolVec(s) => s.get(index),
        }
    }

    fn set(&mut self, index: usize) {
        match self {
            AnyStorage::BitArray(s) => s.set(index),
            AnyStorage::BoolVec(s) => s.set(index),
        }
    }

    fn union(&self, other: &Self) -> BloomResult<Self> {
        match (self, other) {
            (AnyStorage::BitArray(a), AnyStorage::BitArray(b)) => {
                a.union(b).map(AnyStorage::BitArray)
            }
            (AnyStorage::BoolVec(a), AnyStorage::BoolVec(b)) => {
                a.union(b).map(AnyStorage::BoolVec)
            }
            _ => Err(BloomError::TypeMismatch {
                left: self.kind(),
                right: other.kind(),
            }),
        }
    }

    fn intersection(&self, other: &Self) -> BloomResult<Self> {
        match (self, other) {
            (AnyStorage::BitArray(a), AnyStorage::BitArray(b)) => {
                a.intersection(b).map(AnyStorage::BitArray)
            }
            (AnyStorage::BoolVec(a), AnyStorage::BoolVec(b)) => {
                a.intersection(b).map(AnyStorage::BoolVec)
            }
            _ => Err(BloomError::TypeMismatch {
                left: self.kind(),
                right: other.kind(),
            }),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            AnyStorage::BitArray(s) => s.to_bytes(),
            AnyStorage::BoolVec(s) => s.to_bytes(),
        }
    }

    fn count_ones(&self) -> usize {
        match self {
            AnyStorage::BitArray(s) => s.count_ones(),
            AnyStorage::BoolVec(s) => s.count_ones(),
        }
    }
}
