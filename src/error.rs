use std::string::FromUtf8Error;

use thiserror::Error;

/// Everything that can go wrong while decoding or encoding an Aseprite file.
///
/// Variants carry the byte offset, frame index or chunk type where the
/// problem was observed, when that information is available at the failure
/// site.
#[derive(Debug, Error)]
pub enum AseError {
    /// A file or frame magic number did not match.
    #[error("bad {kind} magic at offset {offset:#x}: expected {expected:#06x}, got {actual:#06x}")]
    BadMagic {
        /// Which magic failed: `"file"` or `"frame"`.
        kind: &'static str,
        /// Byte offset of the magic word.
        offset: usize,
        /// The magic the format requires.
        expected: u16,
        /// The magic actually read.
        actual: u16,
    },

    /// A read went past the end of the input buffer.
    #[error("read of {len} bytes at offset {offset:#x} is out of bounds (buffer ends at {end:#x})")]
    OutOfBounds {
        /// Offset the read started at.
        offset: usize,
        /// Number of bytes the read wanted.
        len: usize,
        /// End of the readable region.
        end: usize,
    },

    /// A declared chunk size is inconsistent with its payload, or a chunk
    /// cannot be re-emitted from the data at hand.
    #[error("bad chunk size: {message}")]
    BadChunkSize {
        /// Description of the inconsistency.
        message: String,
    },

    /// The header color depth is not one of 8, 16 or 32.
    #[error("unsupported color depth: {0}")]
    UnsupportedColorDepth(u16),

    /// A cel chunk used an unknown variant tag.
    #[error("invalid cel type: {0}")]
    InvalidCelType(u16),

    /// A layer chunk used an unknown layer type.
    #[error("invalid layer type: {0}")]
    InvalidLayerType(u16),

    /// A layer chunk used an unknown blend mode.
    #[error("invalid blend mode: {0}")]
    InvalidBlendMode(u16),

    /// The compression capability failed to inflate a payload.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// The compression capability failed to deflate a payload.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// A linked cel points at a frame with no matching cel, or out of range.
    #[error("invalid linked cel: frame {frame}, layer {layer}")]
    InvalidLinkedCel {
        /// Frame index the link points at.
        frame: usize,
        /// Layer the linking cel lives on.
        layer: u16,
    },

    /// A tilemap cel references a tileset id that does not exist, or a
    /// tileset was asked for pixels without embedded tile data.
    #[error("missing tileset {0}")]
    MissingTileset(u32),

    /// A tile lookup fell outside `[base_index, base_index + tile_count)`.
    #[error("tile index {index} outside [{base}, {base} + {count})")]
    TileIndexOutOfBounds {
        /// The requested tile index.
        index: u32,
        /// The tileset's base index.
        base: i16,
        /// The tileset's tile count.
        count: u32,
    },

    /// A length-prefixed string was not valid UTF-8.
    #[error("string at offset {offset:#x} is not valid UTF-8")]
    InvalidString {
        /// Offset of the string's length prefix.
        offset: usize,
        /// The underlying conversion error.
        source: FromUtf8Error,
    },

    /// A string is too long for its u16 length prefix.
    #[error("string of {len} bytes exceeds the 65535-byte wire limit")]
    StringTooLong {
        /// Byte length of the offending string.
        len: usize,
    },

    /// Preserved-mode encoding was requested for a frame that carries no
    /// preserved chunk list.
    #[error("frame {frame} has no preserved chunk list")]
    MissingChunkList {
        /// Index of the frame.
        frame: usize,
    },

    /// Context wrapper: the error occurred while processing a chunk.
    #[error("in frame {frame}, chunk type {chunk_type:#06x}: {source}")]
    InChunk {
        /// Frame the chunk belongs to.
        frame: usize,
        /// Wire type code of the chunk.
        chunk_type: u16,
        /// The underlying error.
        source: Box<AseError>,
    },
}

impl AseError {
    /// Wrap the error with the frame and chunk it was encountered in.
    pub(crate) fn in_chunk(self, frame: usize, chunk_type: u16) -> AseError {
        match self {
            // Already carries its context.
            AseError::InChunk { .. } => self,
            other => AseError::InChunk {
                frame,
                chunk_type,
                source: Box::new(other),
            },
        }
    }
}
