use bitflags::bitflags;

use crate::compress::Compression;
use crate::file::PixelFormat;
use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::writer::AseWriter;
use crate::{AseError, Result};

bitflags! {
    /// Tileset flag word.
    pub struct TilesetFlags: u32 {
        /// An external-file link follows the name.
        const LINKS_EXTERNAL_FILE = 0x0001;
        /// An embedded compressed tile strip follows.
        const FILE_INCLUDES_TILES = 0x0002;
        /// Tilemaps using this tileset treat tile id 0 as the empty tile.
        const EMPTY_TILE_IS_ID_ZERO = 0x0004;
    }
}

/// Link from a tileset to a tileset in an external file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalTilesetRef {
    pub external_file_id: u32,
    pub tileset_id: u32,
}

/// The embedded tile strip: all tiles stacked vertically, zlib-compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetPixels {
    pub(crate) zlib: Vec<u8>,
    pub(crate) decoded: Option<Vec<u8>>,
}

impl TilesetPixels {
    /// The original zlib payload, if still held.
    pub fn compressed_bytes(&self) -> Option<&[u8]> {
        if self.zlib.is_empty() {
            None
        } else {
            Some(&self.zlib)
        }
    }

    /// Decoded strip bytes without forcing a decode.
    pub fn decoded_pixels(&self) -> Option<&[u8]> {
        self.decoded.as_deref()
    }

    /// Forget the original zlib payload, keeping only decoded pixels.
    pub(crate) fn drop_compressed(&mut self) {
        if self.decoded.is_some() {
            self.zlib.clear();
        }
    }
}

/// An indexed collection of equally-sized pixel tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub id: u32,
    pub flags: TilesetFlags,
    pub tile_count: u32,
    pub tile_width: u16,
    pub tile_height: u16,
    /// Number shown in the UI for the first tile; data indices are not
    /// affected. Typically 1.
    pub base_index: i16,
    pub name: String,
    pub external_file: Option<ExternalTilesetRef>,
    /// Embedded tile strip, when flag bit 1 is set.
    pub pixels: Option<TilesetPixels>,
    pub user_data: Option<UserData>,
    /// Per-tile user data, attached by adjacency after the tileset's own.
    pub tile_user_data: Vec<UserData>,
}

impl Tileset {
    /// Bytes of one tile at the given pixel format.
    pub fn tile_bytes(&self, pixel_format: PixelFormat) -> usize {
        self.tile_width as usize * self.tile_height as usize * pixel_format.bytes_per_pixel()
    }

    /// Inflate the embedded tile strip, caching the result.
    pub fn strip_pixels(
        &mut self,
        pixel_format: PixelFormat,
        compression: &dyn Compression,
    ) -> Result<&[u8]> {
        let expected = self.tile_bytes(pixel_format) * self.tile_count as usize;
        let id = self.id;
        let pixels = match self.pixels {
            Some(ref mut pixels) => pixels,
            None => return Err(AseError::MissingTileset(id)),
        };
        if pixels.decoded.is_none() {
            let out = compression.inflate(&pixels.zlib)?;
            if out.len() != expected {
                return Err(AseError::BadChunkSize {
                    message: format!(
                        "tileset strip inflates to {} bytes, header says {}",
                        out.len(),
                        expected
                    ),
                });
            }
            pixels.decoded = Some(out);
        }
        match pixels.decoded {
            Some(ref out) => Ok(out),
            None => unreachable!(),
        }
    }

    /// Pixels of a single tile. The index is checked against
    /// `[base_index, base_index + tile_count)`.
    pub fn tile_pixels(
        &mut self,
        index: u32,
        pixel_format: PixelFormat,
        compression: &dyn Compression,
    ) -> Result<&[u8]> {
        let base = self.base_index.max(0) as u32;
        if index < base || index >= base + self.tile_count {
            return Err(AseError::TileIndexOutOfBounds {
                index,
                base: self.base_index,
                count: self.tile_count,
            });
        }
        let tile_bytes = self.tile_bytes(pixel_format);
        let offset = (index - base) as usize * tile_bytes;
        let strip = self.strip_pixels(pixel_format, compression)?;
        Ok(&strip[offset..offset + tile_bytes])
    }
}

pub(crate) fn parse_tileset_chunk(reader: &mut AseReader<'_>) -> Result<Tileset> {
    let id = reader.dword()?;
    let flags = TilesetFlags {
        bits: reader.dword()?,
    };
    let tile_count = reader.dword()?;
    let tile_width = reader.word()?;
    let tile_height = reader.word()?;
    let base_index = reader.short()?;
    reader.skip(14)?;
    let name = reader.string()?;
    let external_file = if flags.contains(TilesetFlags::LINKS_EXTERNAL_FILE) {
        Some(ExternalTilesetRef {
            external_file_id: reader.dword()?,
            tileset_id: reader.dword()?,
        })
    } else {
        None
    };
    let pixels = if flags.contains(TilesetFlags::FILE_INCLUDES_TILES) {
        let compressed_length = reader.dword()? as usize;
        Some(TilesetPixels {
            zlib: reader.take_bytes(compressed_length)?,
            decoded: None,
        })
    } else {
        None
    };
    Ok(Tileset {
        id,
        flags,
        tile_count,
        tile_width,
        tile_height,
        base_index,
        name,
        external_file,
        pixels,
        user_data: None,
        tile_user_data: Vec::new(),
    })
}

pub(crate) fn encode_tileset_chunk(
    tileset: &Tileset,
    compression: &dyn Compression,
) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    let mut flags = tileset.flags;
    // The flag word is kept consistent with the optional tails actually
    // present.
    flags.set(
        TilesetFlags::LINKS_EXTERNAL_FILE,
        tileset.external_file.is_some(),
    );
    flags.set(TilesetFlags::FILE_INCLUDES_TILES, tileset.pixels.is_some());
    w.dword(tileset.id);
    w.dword(flags.bits());
    w.dword(tileset.tile_count);
    w.word(tileset.tile_width);
    w.word(tileset.tile_height);
    w.short(tileset.base_index);
    w.zeros(14);
    w.string(&tileset.name)?;
    if let Some(link) = tileset.external_file {
        w.dword(link.external_file_id);
        w.dword(link.tileset_id);
    }
    if let Some(ref pixels) = tileset.pixels {
        let zlib = match pixels.compressed_bytes() {
            Some(zlib) => zlib.to_vec(),
            None => match pixels.decoded_pixels() {
                Some(raw) => compression.deflate(raw)?,
                None => {
                    return Err(AseError::BadChunkSize {
                        message: "tileset strip has neither zlib bytes nor decoded pixels"
                            .to_owned(),
                    })
                }
            },
        };
        w.dword(zlib.len() as u32);
        w.bytes(&zlib);
    }
    Ok(w.into_bytes())
}
