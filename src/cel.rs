use crate::compress::Compression;
use crate::file::{AsepriteFile, PixelFormat};
use crate::reader::AseReader;
use crate::tilemap::{self, TileBitmasks, TilemapData};
use crate::user_data::UserData;
use crate::writer::AseWriter;
use crate::{AseError, Result};

const CEL_TYPE_RAW: u16 = 0;
const CEL_TYPE_LINKED: u16 = 1;
const CEL_TYPE_COMPRESSED_IMAGE: u16 = 2;
const CEL_TYPE_COMPRESSED_TILEMAP: u16 = 3;

/// The pixel contribution of one layer on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Cel {
    /// Index of the layer this cel belongs to.
    pub layer_index: u16,
    pub x: i16,
    pub y: i16,
    pub opacity: u8,
    /// Draw order within the layer; 0 keeps the layer order.
    pub z_index: i16,
    pub content: CelContent,
    pub extra: Option<CelExtra>,
    pub user_data: Option<UserData>,
}

/// The variant-specific part of a cel.
#[derive(Debug, Clone, PartialEq)]
pub enum CelContent {
    /// Raw or zlib-compressed pixels; the image's compression state decides
    /// the wire variant.
    Image(ImageData),
    /// The pixels live in the cel at the same layer of an earlier frame.
    Linked(u16),
    /// Packed tile indices into the layer's tileset.
    Tilemap(TilemapData),
}

/// Pixel payload of an image cel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    pub(crate) pixels: PixelSource,
}

/// Where an image cel's pixel bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PixelSource {
    /// Wire variant 0: pixels stored uncompressed.
    Uncompressed(Vec<u8>),
    /// Wire variant 2: a zlib stream plus the lazily decoded cache.
    Zlib {
        data: Vec<u8>,
        decoded: Option<Vec<u8>>,
    },
}

impl ImageData {
    /// A raw-pixel image (wire variant 0).
    pub fn from_raw_pixels(width: u16, height: u16, pixels: Vec<u8>) -> ImageData {
        ImageData {
            width,
            height,
            pixels: PixelSource::Uncompressed(pixels),
        }
    }

    /// A compressed image (wire variant 2) from an existing zlib stream.
    pub fn from_zlib(width: u16, height: u16, zlib: Vec<u8>) -> ImageData {
        ImageData {
            width,
            height,
            pixels: PixelSource::Zlib {
                data: zlib,
                decoded: None,
            },
        }
    }

    /// True for the compressed wire variant.
    pub fn is_compressed(&self) -> bool {
        matches!(self.pixels, PixelSource::Zlib { .. })
    }

    /// The original zlib payload, if this is a compressed cel that still
    /// holds it.
    pub fn compressed_bytes(&self) -> Option<&[u8]> {
        match self.pixels {
            PixelSource::Zlib { ref data, .. } if !data.is_empty() => Some(data),
            _ => None,
        }
    }

    /// Pixel bytes without forcing a decode.
    pub fn decoded_pixels(&self) -> Option<&[u8]> {
        match self.pixels {
            PixelSource::Uncompressed(ref pixels) => Some(pixels),
            PixelSource::Zlib { ref decoded, .. } => decoded.as_deref(),
        }
    }

    /// Pixel bytes, inflating and caching on first access. The decoded
    /// length must equal `width * height * bytes_per_pixel`.
    pub fn pixels(
        &mut self,
        pixel_format: PixelFormat,
        compression: &dyn Compression,
    ) -> Result<&[u8]> {
        let expected =
            self.width as usize * self.height as usize * pixel_format.bytes_per_pixel();
        match self.pixels {
            PixelSource::Uncompressed(ref pixels) => Ok(pixels),
            PixelSource::Zlib {
                ref data,
                ref mut decoded,
            } => {
                if decoded.is_none() {
                    let out = compression.inflate(data)?;
                    if out.len() != expected {
                        return Err(AseError::BadChunkSize {
                            message: format!(
                                "cel pixels inflate to {} bytes, dimensions say {}",
                                out.len(),
                                expected
                            ),
                        });
                    }
                    *decoded = Some(out);
                }
                match decoded {
                    Some(pixels) => Ok(pixels),
                    None => unreachable!(),
                }
            }
        }
    }

    /// Forget the original zlib stream, keeping only decoded pixels. The
    /// cel stays a compressed-variant cel; encoding re-deflates.
    pub(crate) fn drop_compressed(&mut self) {
        if let PixelSource::Zlib {
            ref mut data,
            ref decoded,
        } = self.pixels
        {
            if decoded.is_some() {
                data.clear();
            }
        }
    }

    /// Replace the pixel bytes. For a compressed cel the stale zlib stream
    /// is dropped, so encoding re-deflates the new pixels.
    pub fn set_pixels(&mut self, pixels: Vec<u8>) {
        match self.pixels {
            PixelSource::Uncompressed(ref mut old) => *old = pixels,
            PixelSource::Zlib {
                ref mut data,
                ref mut decoded,
            } => {
                data.clear();
                *decoded = Some(pixels);
            }
        }
    }
}

/// Precise sub-pixel placement from a cel-extra chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CelExtra {
    /// Precise offset and size, present when flag bit 0 is set. All values
    /// are 16.16 fixed point on the wire.
    pub precise_bounds: Option<PreciseBounds>,
}

/// Sub-pixel cel bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreciseBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub(crate) fn parse_cel_chunk(reader: &mut AseReader<'_>) -> Result<Cel> {
    let layer_index = reader.word()?;
    let x = reader.short()?;
    let y = reader.short()?;
    let opacity = reader.byte()?;
    let cel_type = reader.word()?;
    let z_index = reader.short()?;
    reader.skip(5)?;

    let content = match cel_type {
        CEL_TYPE_RAW => {
            let width = reader.word()?;
            let height = reader.word()?;
            // The payload runs to the chunk end; the declared dimensions
            // are checked against it later, not trusted to bound the read.
            let pixels = reader.take_rest();
            CelContent::Image(ImageData::from_raw_pixels(width, height, pixels))
        }
        CEL_TYPE_LINKED => CelContent::Linked(reader.word()?),
        CEL_TYPE_COMPRESSED_IMAGE => {
            let width = reader.word()?;
            let height = reader.word()?;
            let zlib = reader.take_rest();
            CelContent::Image(ImageData::from_zlib(width, height, zlib))
        }
        CEL_TYPE_COMPRESSED_TILEMAP => {
            let width = reader.word()?;
            let height = reader.word()?;
            let bits_per_tile = reader.word()?;
            let bitmasks = TileBitmasks::parse(reader)?;
            reader.skip(10)?;
            let zlib = reader.take_rest();
            CelContent::Tilemap(TilemapData {
                width,
                height,
                bits_per_tile,
                bitmasks,
                zlib,
                decoded: None,
            })
        }
        other => return Err(AseError::InvalidCelType(other)),
    };

    Ok(Cel {
        layer_index,
        x,
        y,
        opacity,
        z_index,
        content,
        extra: None,
        user_data: None,
    })
}

pub(crate) fn encode_cel_chunk(cel: &Cel, compression: &dyn Compression) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    w.word(cel.layer_index);
    w.short(cel.x);
    w.short(cel.y);
    w.byte(cel.opacity);
    let type_mark = w.mark();
    w.word(0); // cel type, patched below
    w.short(cel.z_index);
    w.zeros(5);

    let cel_type = match cel.content {
        CelContent::Image(ref image) => {
            w.word(image.width);
            w.word(image.height);
            match image.pixels {
                PixelSource::Uncompressed(ref pixels) => {
                    w.bytes(pixels);
                    CEL_TYPE_RAW
                }
                PixelSource::Zlib {
                    ref data,
                    ref decoded,
                } => {
                    if !data.is_empty() {
                        // Unmodified cel: re-emit the original stream.
                        w.bytes(data);
                    } else {
                        match decoded {
                            Some(pixels) => w.bytes(&compression.deflate(pixels)?),
                            None => {
                                return Err(AseError::BadChunkSize {
                                    message: "compressed cel has neither zlib bytes nor \
                                              decoded pixels"
                                        .to_owned(),
                                })
                            }
                        }
                    }
                    CEL_TYPE_COMPRESSED_IMAGE
                }
            }
        }
        CelContent::Linked(frame) => {
            w.word(frame);
            CEL_TYPE_LINKED
        }
        CelContent::Tilemap(ref tilemap) => {
            w.word(tilemap.width);
            w.word(tilemap.height);
            w.word(tilemap.bits_per_tile);
            w.dword(tilemap.bitmasks.tile_id);
            w.dword(tilemap.bitmasks.x_flip);
            w.dword(tilemap.bitmasks.y_flip);
            w.dword(tilemap.bitmasks.rotate_90cw);
            w.zeros(10);
            if let Some(zlib) = tilemap.compressed_bytes() {
                w.bytes(zlib);
            } else {
                match tilemap.decoded_tiles() {
                    Some(tiles) => {
                        let packed =
                            tilemap::pack_tiles(tiles, tilemap.bits_per_tile, &tilemap.bitmasks);
                        w.bytes(&compression.deflate(&packed)?);
                    }
                    None => {
                        return Err(AseError::BadChunkSize {
                            message: "tilemap cel has neither zlib bytes nor decoded tiles"
                                .to_owned(),
                        })
                    }
                }
            }
            CEL_TYPE_COMPRESSED_TILEMAP
        }
    };
    w.patch_word(type_mark, cel_type);
    Ok(w.into_bytes())
}

pub(crate) fn parse_cel_extra_chunk(reader: &mut AseReader<'_>) -> Result<CelExtra> {
    let flags = reader.dword()?;
    let x = reader.fixed()?;
    let y = reader.fixed()?;
    let width = reader.fixed()?;
    let height = reader.fixed()?;
    reader.skip(16)?;
    let precise_bounds = if flags & 1 != 0 {
        Some(PreciseBounds {
            x,
            y,
            width,
            height,
        })
    } else {
        None
    };
    Ok(CelExtra { precise_bounds })
}

pub(crate) fn encode_cel_extra_chunk(extra: &CelExtra) -> Vec<u8> {
    let mut w = AseWriter::new();
    match extra.precise_bounds {
        Some(bounds) => {
            w.dword(1);
            w.fixed(bounds.x);
            w.fixed(bounds.y);
            w.fixed(bounds.width);
            w.fixed(bounds.height);
        }
        None => {
            w.dword(0);
            w.zeros(16);
        }
    }
    w.zeros(16);
    w.into_bytes()
}

/// Follow a linked cel to the cel that owns the pixels.
///
/// Non-linked cels are returned as-is. Chains are tolerated; a hop count
/// above the frame count means a reference cycle and fails like a missing
/// target.
pub fn resolve_linked_cel<'a>(file: &'a AsepriteFile, cel: &'a Cel) -> Result<&'a Cel> {
    let mut current = cel;
    let mut hops = 0;
    while let CelContent::Linked(frame_index) = current.content {
        let layer = current.layer_index;
        let missing = AseError::InvalidLinkedCel {
            frame: frame_index as usize,
            layer,
        };
        hops += 1;
        if hops > file.frames.len() {
            return Err(missing);
        }
        let frame = match file.frames.get(frame_index as usize) {
            Some(frame) => frame,
            None => return Err(missing),
        };
        current = match frame.cels.iter().find(|c| c.layer_index == layer) {
            Some(cel) => cel,
            None => return Err(missing),
        };
    }
    Ok(current)
}
