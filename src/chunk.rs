use crate::{AseError, Result};

/// Chunk header: u32 size (inclusive of the header) + u16 type code.
pub(crate) const CHUNK_HEADER_SIZE: usize = 6;

/// The chunk kinds this codec understands, addressed by their wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkType {
    OldPalette04,
    OldPalette11,
    Layer,
    Cel,
    CelExtra,
    ColorProfile,
    ExternalFiles,
    Tags,
    Palette,
    UserData,
    Slice,
    Tileset,
}

impl ChunkType {
    pub(crate) fn from_code(code: u16) -> Option<ChunkType> {
        match code {
            0x0004 => Some(ChunkType::OldPalette04),
            0x0011 => Some(ChunkType::OldPalette11),
            0x2004 => Some(ChunkType::Layer),
            0x2005 => Some(ChunkType::Cel),
            0x2006 => Some(ChunkType::CelExtra),
            0x2007 => Some(ChunkType::ColorProfile),
            0x2008 => Some(ChunkType::ExternalFiles),
            0x2018 => Some(ChunkType::Tags),
            0x2019 => Some(ChunkType::Palette),
            0x2020 => Some(ChunkType::UserData),
            0x2022 => Some(ChunkType::Slice),
            0x2023 => Some(ChunkType::Tileset),
            _ => None,
        }
    }

    pub(crate) fn code(self) -> u16 {
        match self {
            ChunkType::OldPalette04 => 0x0004,
            ChunkType::OldPalette11 => 0x0011,
            ChunkType::Layer => 0x2004,
            ChunkType::Cel => 0x2005,
            ChunkType::CelExtra => 0x2006,
            ChunkType::ColorProfile => 0x2007,
            ChunkType::ExternalFiles => 0x2008,
            ChunkType::Tags => 0x2018,
            ChunkType::Palette => 0x2019,
            ChunkType::UserData => 0x2020,
            ChunkType::Slice => 0x2022,
            ChunkType::Tileset => 0x2023,
        }
    }
}

/// A chunk kept as raw payload bytes: either a type this codec does not
/// know, or a known chunk preserved for byte-exact re-emission. The payload
/// excludes the 6-byte chunk header, which is re-framed on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Wire type code.
    pub chunk_type: u16,
    /// Payload bytes after the chunk header.
    pub data: Vec<u8>,
}

/// One entry of a frame's preserved chunk list.
///
/// Decoding with `preserve_chunks` produces only [`FrameChunk::Raw`]
/// entries. The typed variants reference into the decoded model and let a
/// caller splice re-encoded chunks into an otherwise preserved stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameChunk {
    /// Re-frame these raw bytes verbatim.
    Raw(RawChunk),
    /// Re-encode `file.layers[i]`.
    Layer(usize),
    /// Re-encode this frame's `cels[i]`, with its cel-extra and user data.
    Cel(usize),
    /// Re-encode the color profile.
    ColorProfile,
    /// Re-encode the external files chunk.
    ExternalFiles,
    /// Re-encode the palette.
    Palette,
    /// Re-encode the tags chunk with per-tag user data.
    Tags,
    /// Re-encode `file.slices[i]`.
    Slice(usize),
    /// Re-encode `file.tilesets[i]` with its user data.
    Tileset(usize),
    /// Re-encode the sprite-level user data.
    SpriteUserData,
}

pub(crate) fn check_chunk_size(chunk_size: u32, frame_remaining: usize) -> Result<()> {
    if (chunk_size as usize) < CHUNK_HEADER_SIZE {
        return Err(AseError::BadChunkSize {
            message: format!(
                "chunk size {} is smaller than the {}-byte chunk header",
                chunk_size, CHUNK_HEADER_SIZE
            ),
        });
    }
    if chunk_size as usize - CHUNK_HEADER_SIZE > frame_remaining {
        return Err(AseError::BadChunkSize {
            message: format!(
                "chunk of size {} overruns its frame ({} bytes left)",
                chunk_size, frame_remaining
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in [
            0x0004, 0x0011, 0x2004, 0x2005, 0x2006, 0x2007, 0x2008, 0x2018, 0x2019, 0x2020,
            0x2022, 0x2023,
        ] {
            let ty = ChunkType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
        assert_eq!(ChunkType::from_code(0x2016), None); // deprecated mask chunk
        assert_eq!(ChunkType::from_code(0x9999), None);
    }

    #[test]
    fn undersized_chunk_is_rejected() {
        assert!(check_chunk_size(5, 100).is_err());
        assert!(check_chunk_size(6, 0).is_ok());
        assert!(check_chunk_size(20, 10).is_err());
    }
}
