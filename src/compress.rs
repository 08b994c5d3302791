use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::{AseError, Result};

/// Injectable zlib capability.
///
/// Cel and tileset payload decoders take this as a parameter instead of
/// calling a compression library directly, so callers can swap in their own
/// provider. [`Flate2Compression`] is the default, backed by `flate2`.
pub trait Compression {
    /// Inflate a zlib stream.
    fn inflate(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    /// Deflate raw bytes into a zlib stream.
    fn deflate(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Default [`Compression`] provider backed by `flate2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flate2Compression;

impl Compression for Flate2Compression {
    fn inflate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(bytes);
        let mut buffer = Vec::new();
        decoder
            .read_to_end(&mut buffer)
            .map_err(|e| AseError::DecompressionFailed(e.to_string()))?;
        Ok(buffer)
    }

    fn deflate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(bytes)
            .and_then(|_| encoder.finish())
            .map_err(|e| AseError::CompressionFailed(e.to_string()))
    }
}

pub(crate) static DEFAULT_COMPRESSION: Flate2Compression = Flate2Compression;
