//! Binary persistence format.
//!
//! A fixed filter is written as a 24 byte header followed by the raw storage
//! bytes:
//!
//! ```text
//! error_rate      f64  big-endian
//! num_slices      u32  big-endian
//! bits_per_slice  u32  big-endian
//! capacity        u32  big-endian
//! count           u32  big-endian
//! storage         ceil(num_slices * bits_per_slice / 8) bytes
//! ```
//!
//! A scalable filter is written as a 28 byte header (growth ratio, decay
//! ratio, initial capacity, error rate, generation count) followed by every
//! generation in the format above, oldest first.
//!
//! The storage variant is not part of the stream; the reader picks it.
use crate::bloom::config::validate_error_rate;
use crate::bloom::{BloomFilter, BloomFilterConfig, BloomParams};
use crate::error::{BloomError, BloomResult};
use crate::scalable::{GrowthMode, ScalableBloomFilter, ScalableBloomFilterConfig};
use crate::storage::{Storage, StorageKind};
use std::io::{self, Read, Write};
use tracing::debug;

pub const FILTER_HEADER_LEN: usize = 24;
pub const SCALABLE_HEADER_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq)]
struct FilterHeader {
    error_rate: f64,
    num_slices: u32,
    bits_per_slice: u32,
    capacity: u32,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScalableHeader {
    growth_ratio: u32,
    decay_ratio: f64,
    initial_capacity: u32,
    error_rate: f64,
    generations: u32,
}

fn to_u32(value: usize, field: &str) -> BloomResult<u32> {
    u32::try_from(value).map_err(|_| {
        BloomError::InvalidConfig(format!(
            "{field} {value} does not fit the persistence format"
        ))
    })
}

fn read_exact<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &str,
) -> BloomResult<()> {
    let expected = buf.len();
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => BloomError::Decode(format!(
            "Truncated {what}: expected {expected} bytes"
        )),
        _ => BloomError::Io(e),
    })
}

fn be_u32(buf: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    u32::from_be_bytes(word)
}

fn be_f64(buf: &[u8], at: usize) -> f64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[at..at + 8]);
    f64::from_be_bytes(word)
}

impl FilterHeader {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = [0u8; FILTER_HEADER_LEN];
        buf[0..8].copy_from_slice(&self.error_rate.to_be_bytes());
        buf[8..12].copy_from_slice(&self.num_slices.to_be_bytes());
        buf[12..16].copy_from_slice(&self.bits_per_slice.to_be_bytes());
        buf[16..20].copy_from_slice(&self.capacity.to_be_bytes());
        buf[20..24].copy_from_slice(&self.count.to_be_bytes());
        writer.write_all(&buf)
    }

    fn read_from<R: Read>(reader: &mut R) -> BloomResult<Self> {
        let mut buf = [0u8; FILTER_HEADER_LEN];
        read_exact(reader, &mut buf, "filter header")?;
        Ok(Self {
            error_rate: be_f64(&buf, 0),
            num_slices: be_u32(&buf, 8),
            bits_per_slice: be_u32(&buf, 12),
            capacity: be_u32(&buf, 16),
            count: be_u32(&buf, 20),
        })
    }
}

impl ScalableHeader {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = [0u8; SCALABLE_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.growth_ratio.to_be_bytes());
        buf[4..12].copy_from_slice(&self.decay_ratio.to_be_bytes());
        buf[12..16].copy_from_slice(&self.initial_capacity.to_be_bytes());
        buf[16..24].copy_from_slice(&self.error_rate.to_be_bytes());
        buf[24..28].copy_from_slice(&self.generations.to_be_bytes());
        writer.write_all(&buf)
    }

    fn read_from<R: Read>(reader: &mut R) -> BloomResult<Self> {
        let mut buf = [0u8; SCALABLE_HEADER_LEN];
        read_exact(reader, &mut buf, "scalable filter header")?;
        Ok(Self {
            growth_ratio: be_u32(&buf, 0),
            decay_ratio: be_f64(&buf, 4),
            initial_capacity: be_u32(&buf, 12),
            error_rate: be_f64(&buf, 16),
            generations: be_u32(&buf, 24),
        })
    }
}

/// Decodes from a byte slice and insists every byte was consumed.
fn decode_all<T>(
    bytes: &[u8],
    decode: impl FnOnce(&mut &[u8]) -> BloomResult<T>,
) -> BloomResult<T> {
    let mut rest = bytes;
    let value = decode(&mut rest)?;
    if !rest.is_empty() {
        return Err(BloomError::Decode(format!(
            "{} trailing bytes after filter",
            rest.len()
        )));
    }
    Ok(value)
}

impl<S: Storage> BloomFilter<S> {
    /// Size of this filter's encoding in bytes.
    pub fn encoded_len(&self) -> usize {
        FILTER_HEADER_LEN + self.params.storage_bytes()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> BloomResult<()> {
        let header = FilterHeader {
            error_rate: self.config.error_rate,
            num_slices: to_u32(self.params.num_slices, "num_slices")?,
            bits_per_slice: to_u32(self.params.bits_per_slice, "bits_per_slice")?,
            capacity: to_u32(self.config.capacity, "capacity")?,
            count: to_u32(self.count, "count")?,
        };
        header.write_to(writer)?;
        writer.write_all(&self.storage.to_bytes())?;
        Ok(())
    }

    pub fn to_bytes(&self) -> BloomResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Reads one filter into the storage type's default variant.
    pub fn read_from<R: Read>(reader: &mut R) -> BloomResult<Self> {
        Self::read_from_kind(reader, S::DEFAULT_KIND)
    }

    pub fn read_from_kind<R: Read>(
        reader: &mut R,
        kind: StorageKind,
    ) -> BloomResult<Self> {
        let header = FilterHeader::read_from(reader)?;

        validate_error_rate(header.error_rate)
            .map_err(|e| BloomError::Decode(e.to_string()))?;
        let params = BloomParams::new(
            header.num_slices as usize,
            header.bits_per_slice as usize,
        )
        .map_err(|e| BloomError::Decode(e.to_string()))?;
        if header.capacity == 0 {
            return Err(BloomError::Decode("Capacity is zero".into()));
        }
        if header.count > header.capacity {
            return Err(BloomError::Decode(format!(
                "Count {} exceeds capacity {}",
                header.count, header.capacity
            )));
        }

        // Read through `take` so a corrupt header cannot force a huge
        // allocation before the stream runs dry.
        let expected = params.storage_bytes();
        let mut bytes = Vec::new();
        reader.by_ref().take(expected as u64).read_to_end(&mut bytes)?;
        if bytes.len() != expected {
            return Err(BloomError::Decode(format!(
                "Truncated storage: expected {expected} bytes, got {}",
                bytes.len()
            )));
        }
        let storage = S::decode(kind, &bytes)?;

        debug!(
            capacity = header.capacity,
            count = header.count,
            num_slices = header.num_slices,
            bits_per_slice = header.bits_per_slice,
            storage = %kind,
            "Decoded bloom filter"
        );

        let config = BloomFilterConfig {
            capacity: header.capacity as usize,
            error_rate: header.error_rate,
            storage: Some(kind),
        };
        Ok(Self::from_parts(
            config,
            params,
            storage,
            header.count as usize,
        ))
    }

    pub fn from_bytes(bytes: &[u8]) -> BloomResult<Self> {
        Self::from_bytes_kind(bytes, S::DEFAULT_KIND)
    }

    pub fn from_bytes_kind(bytes: &[u8], kind: StorageKind) -> BloomResult<Self> {
        decode_all(bytes, |reader| Self::read_from_kind(reader, kind))
    }
}

impl<S: Storage> ScalableBloomFilter<S> {
    pub fn encoded_len(&self) -> usize {
        SCALABLE_HEADER_LEN
            + self
                .filters
                .iter()
                .map(BloomFilter::encoded_len)
                .sum::<usize>()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> BloomResult<()> {
        let header = ScalableHeader {
            growth_ratio: to_u32(self.config.mode.ratio(), "growth_ratio")?,
            decay_ratio: self.config.decay_ratio,
            initial_capacity: to_u32(
                self.config.initial_capacity,
                "initial_capacity",
            )?,
            error_rate: self.config.error_rate,
            generations: to_u32(self.filters.len(), "generations")?,
        };
        header.write_to(writer)?;
        for filter in &self.filters {
            filter.write_to(writer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> BloomResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> BloomResult<Self> {
        Self::read_from_kind(reader, S::DEFAULT_KIND)
    }

    pub fn read_from_kind<R: Read>(
        reader: &mut R,
        kind: StorageKind,
    ) -> BloomResult<Self> {
        let header = ScalableHeader::read_from(reader)?;

        let mode = GrowthMode::from_ratio(header.growth_ratio as usize)
            .ok_or_else(|| {
                BloomError::Decode(format!(
                    "Unknown growth ratio {}",
                    header.growth_ratio
                ))
            })?;
        let config = ScalableBloomFilterConfig {
            initial_capacity: header.initial_capacity as usize,
            error_rate: header.error_rate,
            mode,
            decay_ratio: header.decay_ratio,
            storage: Some(kind),
        };
        config
            .validate()
            .map_err(|e| BloomError::Decode(e.to_string()))?;
        if header.generations == 0 {
            return Err(BloomError::Decode(
                "Scalable filter has no generations".into(),
            ));
        }

        let filters = (0..header.generations)
            .map(|_| BloomFilter::read_from_kind(reader, kind))
            .collect::<BloomResult<Vec<_>>>()?;

        debug!(
            generations = filters.len(),
            mode = ?mode,
            storage = %kind,
            "Decoded scalable bloom filter"
        );

        Ok(Self::from_parts(config, filters))
    }

    pub fn from_bytes(bytes: &[u8]) -> BloomResult<Self> {
        Self::from_bytes_kind(bytes, S::DEFAULT_KIND)
    }

    pub fn from_bytes_kind(bytes: &[u8], kind: StorageKind) -> BloomResult<Self> {
        decode_all(bytes, |reader| Self::read_from_kind(reader, kind))
    }
}
