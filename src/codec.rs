use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use flate2::{Compression, Decompress, DecompressError, FlushDecompress, Status, write::ZlibEncoder};
use thiserror::Error;

/// The zlib level used when none is configured.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Turns the raw storage bytes of a filter into a durable buffer and back.
pub trait Codec {
    fn encode<B: BufMut>(&self, raw: &[u8], out: &mut B);

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, DecodeErr>;

    fn encode_to_bytes(&self, raw: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(raw.len() / 4 + 16);
        self.encode(raw, &mut out);
        out.freeze()
    }
}

#[derive(Debug, Error)]
pub enum DecodeErr {
    #[error("invalid zlib stream: {0}")]
    Invalid(#[from] DecompressError),

    #[error("zlib stream ended before its trailer")]
    Truncated,

    #[error("{count} unexpected bytes after the end of the zlib stream")]
    TrailingBytes { count: usize },
}

/// A zlib (RFC 1950) codec: 2-byte header, DEFLATE body, Adler-32 trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibCodec {
    level: u32,
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self { level: DEFAULT_COMPRESSION_LEVEL }
    }
}

impl ZlibCodec {
    /// Levels above 9 are clamped by `flate2`; callers going through
    /// [`crate::BitFilterConfig`] get them rejected up front.
    pub const fn new(level: u32) -> Self {
        Self { level }
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Codec for ZlibCodec {
    fn encode<B: BufMut>(&self, raw: &[u8], out: &mut B) {
        let mut encoder = ZlibEncoder::new(out.writer(), Compression::new(self.level));
        encoder
            .write_all(raw)
            .expect("writing into an in-memory buffer is infallible");
        encoder
            .finish()
            .expect("writing into an in-memory buffer is infallible");
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, DecodeErr> {
        let mut inflate = Decompress::new(true);
        let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(64));

        loop {
            let consumed = inflate.total_in() as usize;
            let produced = inflate.total_out();
            // Finish can't resume once the output buffer fills up
            let status =
                inflate.decompress_vec(&data[consumed..], &mut out, FlushDecompress::None)?;

            if status == Status::StreamEnd {
                break;
            }
            if out.len() == out.capacity() {
                // the output buffer is the bottleneck, give it room and retry
                out.reserve(out.capacity());
                continue;
            }
            let stalled = inflate.total_in() as usize == consumed && inflate.total_out() == produced;
            if stalled || inflate.total_in() as usize == data.len() {
                return Err(DecodeErr::Truncated);
            }
        }

        let count = data.len() - inflate.total_in() as usize;
        if count > 0 {
            return Err(DecodeErr::TrailingBytes { count });
        }
        Ok(out)
    }
}
