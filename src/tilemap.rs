use crate::compress::Compression;
use crate::reader::AseReader;
use crate::{AseError, Result};

/// The four disjoint bitmasks that carve a packed tile value into its id
/// and orientation bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBitmasks {
    pub tile_id: u32,
    pub x_flip: u32,
    pub y_flip: u32,
    pub rotate_90cw: u32,
}

impl TileBitmasks {
    /// The masks Aseprite writes for 32-bit tiles.
    pub const DEFAULT: TileBitmasks = TileBitmasks {
        tile_id: 0x1FFF_FFFF,
        x_flip: 0x2000_0000,
        y_flip: 0x4000_0000,
        rotate_90cw: 0x8000_0000,
    };

    pub(crate) fn parse(reader: &mut AseReader<'_>) -> Result<TileBitmasks> {
        Ok(TileBitmasks {
            tile_id: reader.dword()?,
            x_flip: reader.dword()?,
            y_flip: reader.dword()?,
            rotate_90cw: reader.dword()?,
        })
    }
}

/// One cell of a tilemap: a tileset index plus orientation bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub id: u32,
    pub x_flip: bool,
    pub y_flip: bool,
    pub rotate_90cw: bool,
}

impl Tile {
    /// Split a packed value with the given masks.
    pub fn unpack(bits: u32, masks: &TileBitmasks) -> Tile {
        Tile {
            id: bits & masks.tile_id,
            x_flip: bits & masks.x_flip != 0,
            y_flip: bits & masks.y_flip != 0,
            rotate_90cw: bits & masks.rotate_90cw != 0,
        }
    }

    /// Inverse of [`unpack`](Tile::unpack) for values within the masks.
    pub fn pack(&self, masks: &TileBitmasks) -> u32 {
        let mut bits = self.id & masks.tile_id;
        if self.x_flip {
            bits |= masks.x_flip;
        }
        if self.y_flip {
            bits |= masks.y_flip;
        }
        if self.rotate_90cw {
            bits |= masks.rotate_90cw;
        }
        bits
    }
}

/// The payload of a compressed-tilemap cel.
///
/// The zlib bytes are the wire truth; the decoded tile array is a cache
/// filled on first access. Replacing the tiles drops the zlib bytes so the
/// encoder knows to re-deflate.
#[derive(Debug, Clone, PartialEq)]
pub struct TilemapData {
    /// Width in tiles.
    pub width: u16,
    /// Height in tiles.
    pub height: u16,
    /// 8, 16 or 32 bits per packed tile value.
    pub bits_per_tile: u16,
    pub bitmasks: TileBitmasks,
    pub(crate) zlib: Vec<u8>,
    pub(crate) decoded: Option<Vec<Tile>>,
}

impl TilemapData {
    /// Tile count the payload must inflate to.
    fn expected_tiles(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The original zlib payload, if the cel still holds it.
    pub fn compressed_bytes(&self) -> Option<&[u8]> {
        if self.zlib.is_empty() {
            None
        } else {
            Some(&self.zlib)
        }
    }

    /// Decoded tiles without forcing a decode.
    pub fn decoded_tiles(&self) -> Option<&[Tile]> {
        self.decoded.as_deref()
    }

    /// Inflate and unpack the tile array, caching the result. Repeated
    /// calls return the cached tiles.
    pub fn tiles(&mut self, compression: &dyn Compression) -> Result<&[Tile]> {
        if self.decoded.is_none() {
            let bytes = compression.inflate(&self.zlib)?;
            let tiles = unpack_tiles(&bytes, self.bits_per_tile, &self.bitmasks)?;
            if tiles.len() != self.expected_tiles() {
                return Err(AseError::BadChunkSize {
                    message: format!(
                        "tilemap payload holds {} tiles, dimensions say {}",
                        tiles.len(),
                        self.expected_tiles()
                    ),
                });
            }
            self.decoded = Some(tiles);
        }
        match self.decoded {
            Some(ref tiles) => Ok(tiles),
            None => unreachable!(),
        }
    }

    /// Forget the original zlib payload, keeping only decoded tiles.
    pub(crate) fn drop_compressed(&mut self) {
        if self.decoded.is_some() {
            self.zlib.clear();
        }
    }

    /// Replace the tile array. The stale zlib payload is dropped; encoding
    /// will re-serialize and deflate the new tiles.
    pub fn set_tiles(&mut self, tiles: Vec<Tile>) {
        self.zlib.clear();
        self.decoded = Some(tiles);
    }

    /// Tile at `(x, y)`, if decoded and in range.
    pub fn tile(&self, x: u16, y: u16) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.decoded.as_ref().and_then(|tiles| tiles.get(index))
    }
}

/// Decode packed little-endian tile values at the given width.
pub(crate) fn unpack_tiles(
    bytes: &[u8],
    bits_per_tile: u16,
    masks: &TileBitmasks,
) -> Result<Vec<Tile>> {
    let step = match bits_per_tile {
        8 => 1,
        16 => 2,
        32 => 4,
        other => {
            return Err(AseError::BadChunkSize {
                message: format!("unsupported bits per tile: {}", other),
            })
        }
    };
    if bytes.len() % step != 0 {
        return Err(AseError::BadChunkSize {
            message: format!(
                "tilemap payload of {} bytes is not a multiple of {}-byte tiles",
                bytes.len(),
                step
            ),
        });
    }
    let tiles = bytes
        .chunks_exact(step)
        .map(|chunk| {
            let bits = match step {
                1 => chunk[0] as u32,
                2 => u16::from_le_bytes([chunk[0], chunk[1]]) as u32,
                _ => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            };
            Tile::unpack(bits, masks)
        })
        .collect();
    Ok(tiles)
}

/// Serialize tiles back to packed little-endian values.
pub(crate) fn pack_tiles(tiles: &[Tile], bits_per_tile: u16, masks: &TileBitmasks) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(tiles.len() * (bits_per_tile as usize / 8));
    for tile in tiles {
        let bits = tile.pack(masks);
        match bits_per_tile {
            8 => bytes.push(bits as u8),
            16 => bytes.extend_from_slice(&(bits as u16).to_le_bytes()),
            _ => bytes.extend_from_slice(&bits.to_le_bytes()),
        }
    }
    bytes
}
