//! Construction-time settings for [`crate::BitFilter`].
//!
//! None of these settings are part of the durable format: a serialized filter
//! is only its storage bytes, and a decoded filter takes the config it is
//! decoded with.
//!
//! ```
//! use bitfilter_rs::{BitFilterConfig, GrowthPolicy};
//!
//! let config = BitFilterConfig::builder()
//!     .initial_bits(1 << 16)
//!     .growth(GrowthPolicy::Doubling)
//!     .compression_level(9)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.initial_bits, 65536);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{DEFAULT_COMPRESSION_LEVEL, ZlibCodec};

/// The number of bits a filter is pre-sized to when no size is given.
pub const DEFAULT_INITIAL_BITS: usize = 10_000;

/// The highest level zlib supports.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigErr {
    #[error("compression level {0} is out of range 0..=9")]
    CompressionLevel(u32),
}

/// How storage grows when a bit beyond `capacity` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Append exactly the bytes needed to hold the new bit. After `set(bit)`
    /// on a filter that had to grow, `capacity == (bit / 8 + 1) * 8`.
    #[default]
    Exact,

    /// At least double the byte length. Capacity runs ahead of the highest
    /// set bit, so fewer `set` calls take the growth path.
    Doubling,
}

impl GrowthPolicy {
    /// Returns the new byte length for storage that currently holds `current`
    /// bytes and must hold at least `needed`. Assumes `needed > current`.
    #[inline]
    pub(crate) fn grow(self, current: usize, needed: usize) -> usize {
        match self {
            GrowthPolicy::Exact => needed,
            GrowthPolicy::Doubling => needed.max(current.saturating_mul(2)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitFilterConfig {
    /// Bits to pre-allocate, rounded up to a whole byte.
    pub initial_bits: usize,
    pub growth: GrowthPolicy,
    /// zlib level (0-9) used by `encode_to_bytes`.
    pub compression_level: u32,
}

impl Default for BitFilterConfig {
    fn default() -> Self {
        Self {
            initial_bits: DEFAULT_INITIAL_BITS,
            growth: GrowthPolicy::Exact,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl BitFilterConfig {
    pub fn builder() -> BitFilterConfigBuilder {
        BitFilterConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigErr> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(ConfigErr::CompressionLevel(self.compression_level));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn codec(&self) -> ZlibCodec {
        ZlibCodec::new(self.compression_level)
    }
}

#[derive(Debug, Default, Clone)]
pub struct BitFilterConfigBuilder {
    config: BitFilterConfig,
}

impl BitFilterConfigBuilder {
    pub fn initial_bits(mut self, bits: usize) -> Self {
        self.config.initial_bits = bits;
        self
    }

    pub fn growth(mut self, growth: GrowthPolicy) -> Self {
        self.config.growth = growth;
        self
    }

    pub fn compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    pub fn build(self) -> Result<BitFilterConfig, ConfigErr> {
        self.config.validate()?;
        Ok(self.config)
    }
}
