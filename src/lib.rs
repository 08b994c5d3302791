#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Decode and re-encode [Aseprite](https://www.aseprite.org/) files ([file
format specification][spec]). This library reads the binary `.aseprite`
container into a typed model and writes the model back, faithfully enough
that chunks it does not understand survive the round trip byte for byte.

Rendering is out of scope: cels hand out raw pixel bytes (inflated on
demand), and compositing them into images is left to the caller.

[spec]: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md

# Basic usage

## Decode

```no_run
use asewire::AsepriteFile;

# fn main() -> asewire::Result<()> {
# let bytes: Vec<u8> = Vec::new();
let ase = AsepriteFile::decode(&bytes)?;

println!("Size: {}x{}", ase.width(), ase.height());
println!("Frames: {}", ase.num_frames());
println!("Layers: {}", ase.num_layers());
# Ok(())
# }
```

## Round trip

Decoding keeps each frame's chunk list by default, so an unmodified file
re-encodes through the same chunks:

```no_run
use asewire::AsepriteFile;

# fn main() -> asewire::Result<()> {
# let bytes: Vec<u8> = Vec::new();
let ase = AsepriteFile::decode(&bytes)?;
let out = ase.encode()?;
# Ok(())
# }
```

For a normalized stream instead, encode with
[`EncodeMode::Canonical`]; unknown chunks are still carried over.

## Pixels

Compressed cels stay compressed until asked. [`decode_cel_pixels`] inflates
through the pluggable [`Compression`] capability and caches the result in
the cel:

```no_run
use asewire::{decode_cel_pixels, AsepriteFile, Flate2Compression};

# fn main() -> asewire::Result<()> {
# let bytes: Vec<u8> = Vec::new();
let mut ase = AsepriteFile::decode(&bytes)?;
let pixels = decode_cel_pixels(&mut ase, 0, 0, &Flate2Compression)?;
println!("{}x{} @ {} bpp", pixels.width, pixels.height, pixels.color_depth);
# Ok(())
# }
```

*/

pub(crate) mod attach;
pub(crate) mod cel;
pub(crate) mod chunk;
pub(crate) mod color_profile;
pub(crate) mod compress;
pub(crate) mod encode;
pub(crate) mod error;
pub(crate) mod external_file;
pub(crate) mod file;
pub(crate) mod layer;
pub(crate) mod palette;
pub(crate) mod parse;
pub(crate) mod reader;
pub(crate) mod slice;
pub(crate) mod tags;
#[cfg(test)]
mod tests;
pub(crate) mod tilemap;
pub(crate) mod tileset;
pub(crate) mod user_data;
pub(crate) mod validate;
pub(crate) mod writer;

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, AseError>;

pub use cel::{Cel, CelContent, CelExtra, ImageData, PreciseBounds};
pub use chunk::{FrameChunk, RawChunk};
pub use color_profile::{ColorProfile, ColorProfileType};
pub use compress::{Compression, Flate2Compression};
pub use encode::{encode, EncodeMode, EncodeOptions};
pub use error::AseError;
pub use external_file::{ExternalFile, ExternalFileType};
pub use file::{
    decode_cel_pixels, decode_tilemap, tileset_for_cel, AsepriteFile, CelPixels, Frame, Header,
    PixelFormat, TilemapView,
};
pub use layer::{BlendMode, Layer, LayerFlags, LayerHierarchy, LayerType};
pub use palette::{Palette, PaletteEntry};
pub use parse::{decode, DecodeOptions, ImageDecode};
pub use slice::{Slice, SliceFlags, SliceKey};
pub use tags::{AnimationDirection, Playback, Repeat, Tag};
pub use tilemap::{Tile, TileBitmasks, TilemapData};
pub use tileset::{ExternalTilesetRef, Tileset, TilesetFlags, TilesetPixels};
pub use user_data::{ExtensionProperties, PropertyValue, UserData};
pub use validate::{validate, IssueCode, Location, Severity, ValidationIssue};
