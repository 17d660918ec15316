//! A growable bitset backed by a byte array, with zlib-compressed serialization.
//!
//! ## Key Features:
//!
//! - **Byte-addressed storage**: bit `i` lives in byte `i / 8` at offset `i % 8`,
//!   least significant bit first. The raw storage is exactly the serialized
//!   payload, so filters written elsewhere in this layout load unchanged.
//!
//! - **Growth on write**: setting a bit past the end grows storage to fit it.
//!   Reads and deletes past the end never allocate.
//!
//! - **Compressed encoding**: [`BitFilter::encode_to_bytes`] produces a zlib
//!   stream of the storage bytes; [`BitFilter::from_bytes`] inverts it.
//!
//! This is not a probabilistic membership filter. Callers map their own keys
//! to bit indices.

mod bitfilter;
mod codec;
mod config;
mod iter;
mod shared;
mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use bitfilter::BitFilter;
pub use codec::{Codec, DEFAULT_COMPRESSION_LEVEL, DecodeErr, ZlibCodec};
pub use config::{
    BitFilterConfig, BitFilterConfigBuilder, ConfigErr, DEFAULT_INITIAL_BITS, GrowthPolicy,
    MAX_COMPRESSION_LEVEL,
};
pub use shared::SharedBitFilter;
pub use traits::{BitRead, BitWrite};
