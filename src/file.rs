use crate::cel::{resolve_linked_cel, Cel, CelContent};
use crate::chunk::{FrameChunk, RawChunk};
use crate::color_profile::ColorProfile;
use crate::compress::Compression;
use crate::external_file::ExternalFile;
use crate::layer::{Layer, LayerHierarchy};
use crate::palette::Palette;
use crate::slice::Slice;
use crate::tags::Tag;
use crate::tilemap::{Tile, TileBitmasks};
use crate::tileset::Tileset;
use crate::user_data::UserData;
use crate::{AseError, Result};

/// File magic of the 128-byte header.
pub(crate) const FILE_MAGIC: u16 = 0xA5E0;
/// Magic of every 16-byte frame header.
pub(crate) const FRAME_MAGIC: u16 = 0xF1FA;

/// Pixel format of the sprite, derived from the header color depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Red, green, blue, and alpha with 8 bits each.
    Rgba,
    /// 8 bit value and 8 bit alpha.
    Grayscale,
    /// One palette index per pixel. `transparent_color_index` marks the
    /// transparent entry in non-background layers.
    Indexed {
        #[allow(missing_docs)]
        transparent_color_index: u8,
    },
}

impl PixelFormat {
    /// Number of bytes to store one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Grayscale => 2,
            PixelFormat::Indexed { .. } => 1,
        }
    }

    pub(crate) fn from_color_depth(depth: u16, transparent_color_index: u8) -> Result<PixelFormat> {
        match depth {
            8 => Ok(PixelFormat::Indexed {
                transparent_color_index,
            }),
            16 => Ok(PixelFormat::Grayscale),
            32 => Ok(PixelFormat::Rgba),
            other => Err(AseError::UnsupportedColorDepth(other)),
        }
    }
}

/// The 128-byte file header. The self-referential file size is not stored;
/// it is recomputed and back-patched on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Magic as read from the wire; anything but `0xA5E0` only survives a
    /// non-strict decode.
    pub magic: u16,
    /// Declared frame count. `frames.len()` is authoritative after decode.
    pub frame_count: u16,
    /// Sprite width in pixels.
    pub width: u16,
    /// Sprite height in pixels.
    pub height: u16,
    /// Bits per pixel: 8 (indexed), 16 (grayscale) or 32 (RGBA).
    pub color_depth: u16,
    /// Header flag word (bit 0: layer opacity has valid value).
    pub flags: u32,
    /// Deprecated global frame time in milliseconds; still used as the
    /// fallback for frames with a zero duration.
    pub speed: u16,
    /// Palette entry that counts as transparent in indexed sprites.
    pub transparent_index: u8,
    /// Declared number of colors (0 means 256 for old files).
    pub color_count: u16,
    /// Pixel aspect ratio numerator; 0 together with `pixel_height` 0 means
    /// square pixels.
    pub pixel_width: u8,
    /// Pixel aspect ratio denominator.
    pub pixel_height: u8,
    pub grid_x: i16,
    pub grid_y: i16,
    /// Grid cell width, 0 when there is no grid.
    pub grid_width: u16,
    pub grid_height: u16,
}

impl Header {
    /// A header for a new RGBA sprite of the given size.
    pub fn new(width: u16, height: u16) -> Header {
        Header {
            magic: FILE_MAGIC,
            frame_count: 0,
            width,
            height,
            color_depth: 32,
            flags: 1,
            speed: 100,
            transparent_index: 0,
            color_count: 0,
            pixel_width: 1,
            pixel_height: 1,
            grid_x: 0,
            grid_y: 0,
            grid_width: 16,
            grid_height: 16,
        }
    }

    /// The pixel format implied by the color depth.
    pub fn pixel_format(&self) -> Result<PixelFormat> {
        PixelFormat::from_color_depth(self.color_depth, self.transparent_index)
    }
}

/// One animation frame: a duration plus the cels contributed by the layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Display duration in milliseconds.
    pub duration_ms: u16,
    /// Cels in chunk order.
    pub cels: Vec<Cel>,
    /// The frame's chunk list as decoded, kept when `preserve_chunks` was
    /// set. Drives preserved-mode encoding.
    pub chunks: Option<Vec<FrameChunk>>,
}

impl Frame {
    /// A frame with the given duration and no cels.
    pub fn new(duration_ms: u16) -> Frame {
        Frame {
            duration_ms,
            cels: Vec::new(),
            chunks: None,
        }
    }

    /// The cel on `layer`, if any.
    pub fn cel(&self, layer: u16) -> Option<&Cel> {
        self.cels.iter().find(|c| c.layer_index == layer)
    }
}

/// A decoded Aseprite file.
///
/// The aggregate owns everything; entities reference each other only by
/// index or id, never by pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct AsepriteFile {
    pub header: Header,
    pub frames: Vec<Frame>,
    /// Layers flattened from chunk order (back to front, groups before
    /// their children).
    pub layers: Vec<Layer>,
    pub tags: Vec<Tag>,
    pub slices: Vec<Slice>,
    pub palette: Option<Palette>,
    /// Tilesets in chunk order; ids are looked up with
    /// [`tileset_by_id`](AsepriteFile::tileset_by_id).
    pub tilesets: Vec<Tileset>,
    pub color_profile: Option<ColorProfile>,
    pub external_files: Vec<ExternalFile>,
    /// Sprite-level user data.
    pub user_data: Option<UserData>,
    /// Chunks of types this codec does not know, preserved verbatim in
    /// encounter order.
    pub unknown_chunks: Vec<RawChunk>,
}

impl AsepriteFile {
    /// An empty sprite with the given header.
    pub fn new(header: Header) -> AsepriteFile {
        AsepriteFile {
            header,
            frames: Vec::new(),
            layers: Vec::new(),
            tags: Vec::new(),
            slices: Vec::new(),
            palette: None,
            tilesets: Vec::new(),
            color_profile: None,
            external_files: Vec::new(),
            user_data: None,
            unknown_chunks: Vec::new(),
        }
    }

    /// Decode with default options.
    pub fn decode(bytes: &[u8]) -> Result<AsepriteFile> {
        crate::parse::decode(bytes, &crate::parse::DecodeOptions::default())
    }

    /// Encode with default options (auto mode).
    pub fn encode(&self) -> Result<Vec<u8>> {
        crate::encode::encode(self, &crate::encode::EncodeOptions::default())
    }

    pub fn width(&self) -> usize {
        self.header.width as usize
    }

    pub fn height(&self) -> usize {
        self.header.height as usize
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn pixel_format(&self) -> Result<PixelFormat> {
        self.header.pixel_format()
    }

    /// Lowest-index layer with the given name.
    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Lowest-index tag with the given name.
    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn slice_by_name(&self, name: &str) -> Option<&Slice> {
        self.slices.iter().find(|s| s.name == name)
    }

    pub fn tileset_by_id(&self, id: u32) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.id == id)
    }

    /// Materialize the layer tree from the flat vector.
    pub fn layer_hierarchy(&self) -> LayerHierarchy {
        LayerHierarchy::build(&self.layers)
    }

    /// Follow a linked cel to the cel that owns the pixels.
    pub fn resolve_linked_cel<'a>(&'a self, cel: &'a Cel) -> Result<&'a Cel> {
        resolve_linked_cel(self, cel)
    }
}

/// Decoded pixels of one cel.
#[derive(Debug)]
pub struct CelPixels<'a> {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Bits per pixel, from the header color depth.
    pub color_depth: u16,
    /// `width * height * color_depth / 8` bytes, row-major.
    pub pixels: &'a [u8],
}

/// Decode the pixels of the cel at `frames[frame].cels[cel]`, following
/// linked cels and caching the inflated buffer inside the owning cel.
pub fn decode_cel_pixels<'a>(
    file: &'a mut AsepriteFile,
    frame: usize,
    cel: usize,
    compression: &dyn Compression,
) -> Result<CelPixels<'a>> {
    let pixel_format = file.header.pixel_format()?;
    let color_depth = file.header.color_depth;

    // Resolve the link target to indices first, then re-borrow mutably.
    let (frame, cel) = resolve_linked_cel_indices(file, frame, cel)?;
    let cel = &mut file.frames[frame].cels[cel];
    match cel.content {
        CelContent::Image(ref mut image) => {
            let (width, height) = (image.width, image.height);
            let pixels = image.pixels(pixel_format, compression)?;
            Ok(CelPixels {
                width,
                height,
                color_depth,
                pixels,
            })
        }
        CelContent::Tilemap(_) => Err(AseError::InvalidCelType(3)),
        // resolve_linked_cel never returns a linked cel.
        CelContent::Linked(_) => Err(AseError::InvalidCelType(1)),
    }
}

/// Index form of [`resolve_linked_cel`], for callers that need to mutate
/// the resolved cel afterwards.
fn resolve_linked_cel_indices(
    file: &AsepriteFile,
    frame: usize,
    cel: usize,
) -> Result<(usize, usize)> {
    let mut frame_index = frame;
    let mut cel_index = cel;
    let mut hops = 0;
    loop {
        let current = file
            .frames
            .get(frame_index)
            .and_then(|f| f.cels.get(cel_index))
            .ok_or(AseError::InvalidLinkedCel {
                frame: frame_index,
                layer: 0,
            })?;
        let target = match current.content {
            CelContent::Linked(target) => target as usize,
            _ => return Ok((frame_index, cel_index)),
        };
        let layer = current.layer_index;
        let missing = AseError::InvalidLinkedCel {
            frame: target,
            layer,
        };
        hops += 1;
        if hops > file.frames.len() {
            return Err(missing);
        }
        let target_frame = match file.frames.get(target) {
            Some(f) => f,
            None => return Err(missing),
        };
        cel_index = match target_frame.cels.iter().position(|c| c.layer_index == layer) {
            Some(i) => i,
            None => return Err(missing),
        };
        frame_index = target;
    }
}

/// Decoded view of a tilemap cel.
#[derive(Debug)]
pub struct TilemapView<'a> {
    /// Width in tiles.
    pub width: u16,
    /// Height in tiles.
    pub height: u16,
    /// The masks the tile values were unpacked with.
    pub masks: TileBitmasks,
    /// `width * height` tiles, row-major.
    pub tiles: &'a [Tile],
}

/// Decode a tilemap cel's tile array, caching it inside the cel. Fails with
/// [`AseError::InvalidCelType`] when the cel is not a tilemap.
pub fn decode_tilemap<'a>(
    cel: &'a mut Cel,
    compression: &dyn Compression,
) -> Result<TilemapView<'a>> {
    match cel.content {
        CelContent::Tilemap(ref mut tilemap) => {
            let (width, height, masks) = (tilemap.width, tilemap.height, tilemap.bitmasks);
            let tiles = tilemap.tiles(compression)?;
            Ok(TilemapView {
                width,
                height,
                masks,
                tiles,
            })
        }
        CelContent::Image(_) => Err(AseError::InvalidCelType(0)),
        CelContent::Linked(_) => Err(AseError::InvalidCelType(1)),
    }
}

/// The tileset a tilemap cel draws from, looked up through its layer's
/// tileset reference.
pub fn tileset_for_cel<'a>(file: &'a AsepriteFile, cel: &Cel) -> Result<&'a Tileset> {
    let layer = file
        .layers
        .get(cel.layer_index as usize)
        .ok_or(AseError::MissingTileset(u32::MAX))?;
    match layer.layer_type {
        crate::layer::LayerType::Tilemap { tileset_index } => file
            .tilesets
            .get(tileset_index as usize)
            .ok_or(AseError::MissingTileset(tileset_index)),
        _ => Err(AseError::MissingTileset(u32::MAX)),
    }
}
