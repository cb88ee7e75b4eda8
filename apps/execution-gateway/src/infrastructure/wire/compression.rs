//! Body compression.

use std::fmt;

use super::WireError;

/// Upper bound on a decompressed body (16 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// Compresses serialized payloads before they are sealed.
pub trait Compressor: Send + Sync + fmt::Debug {
    /// Algorithm name for logs.
    fn name(&self) -> &'static str;

    /// Compress a payload.
    fn compress(&self, data: &[u8]) -> Vec<u8>;

    /// Restore a payload.
    ///
    /// # Errors
    ///
    /// Returns error if the data is corrupt or inflates past the limit.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, WireError>;
}

/// Pass-through compressor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn name(&self) -> &'static str {
        "none"
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, WireError> {
        Ok(data.to_vec())
    }
}

/// LZ4 block compression with a little-endian `u32` size prefix.
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor {
    max_decompressed_size: usize,
}

impl Lz4Compressor {
    /// Create a compressor that refuses bodies inflating past `max_decompressed_size`.
    #[must_use]
    pub const fn new(max_decompressed_size: usize) -> Self {
        Self {
            max_decompressed_size,
        }
    }
}

impl Default for Lz4Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECOMPRESSED_SIZE)
    }
}

impl Compressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        lz4_flex::compress_prepend_size(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, WireError> {
        let Some(prefix) = data.get(..4) else {
            return Err(WireError::Decompression {
                message: format!("body of {} bytes has no size prefix", data.len()),
            });
        };
        let declared = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if declared > self.max_decompressed_size {
            return Err(WireError::Decompression {
                message: format!(
                    "declared size {declared} exceeds limit {}",
                    self.max_decompressed_size
                ),
            });
        }

        lz4_flex::decompress_size_prepended(data).map_err(|e| WireError::Decompression {
            message: e.to_string(),
        })
    }
}
