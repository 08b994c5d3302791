use crate::cel;
use crate::chunk::{ChunkType, FrameChunk, CHUNK_HEADER_SIZE};
use crate::color_profile;
use crate::compress::{Compression, DEFAULT_COMPRESSION};
use crate::external_file;
use crate::file::{AsepriteFile, FRAME_MAGIC};
use crate::layer;
use crate::palette;
use crate::slice;
use crate::tags;
use crate::tileset;
use crate::user_data::{self, UserData};
use crate::writer::AseWriter;
use crate::{AseError, Result};

/// Which chunk stream the encoder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeMode {
    /// Re-frame each frame's preserved chunk list; byte-exact for files
    /// decoded with `preserve_chunks`.
    Preserved,
    /// Ignore preserved chunks and emit the model in a fixed order.
    Canonical,
    /// Preserved when the first frame carries a chunk list, else canonical.
    #[default]
    Auto,
}

/// Options for [`encode`].
#[derive(Default)]
pub struct EncodeOptions {
    pub mode: EncodeMode,
    /// Also emit a legacy palette chunk (0x0004) before the modern one in
    /// canonical mode, for pre-1.2 consumers.
    pub write_legacy_palette_chunks: bool,
    /// Override the zlib provider used for modified compressed payloads.
    pub compression: Option<Box<dyn Compression>>,
}

/// Encode the model back to wire bytes.
pub fn encode(file: &AsepriteFile, options: &EncodeOptions) -> Result<Vec<u8>> {
    let compression: &dyn Compression = match options.compression {
        Some(ref boxed) => boxed.as_ref(),
        None => &DEFAULT_COMPRESSION,
    };
    let preserved = match options.mode {
        EncodeMode::Preserved => true,
        EncodeMode::Canonical => false,
        EncodeMode::Auto => file
            .frames
            .first()
            .map(|f| f.chunks.is_some())
            .unwrap_or(false),
    };

    let mut w = AseWriter::new();
    let size_mark = w.mark();
    write_header(&mut w, file);

    for (frame_index, frame) in file.frames.iter().enumerate() {
        let chunks = if preserved {
            preserved_frame_chunks(file, frame_index, compression)?
        } else {
            canonical_frame_chunks(file, frame_index, options, compression)?
        };
        write_frame(&mut w, frame.duration_ms, &chunks);
    }

    w.patch_dword(size_mark, w.len() as u32);
    Ok(w.into_bytes())
}

fn write_header(w: &mut AseWriter, file: &AsepriteFile) {
    let header = &file.header;
    w.dword(0); // file size, patched at the end
    w.word(header.magic);
    w.word(file.frames.len() as u16);
    w.word(header.width);
    w.word(header.height);
    w.word(header.color_depth);
    w.dword(header.flags);
    w.word(header.speed);
    w.zeros(8);
    w.byte(header.transparent_index);
    w.zeros(3);
    w.word(header.color_count);
    w.byte(header.pixel_width);
    w.byte(header.pixel_height);
    w.short(header.grid_x);
    w.short(header.grid_y);
    w.word(header.grid_width);
    w.word(header.grid_height);
    w.zeros(84);
}

fn write_frame(w: &mut AseWriter, duration_ms: u16, chunks: &[(u16, Vec<u8>)]) {
    let frame_start = w.mark();
    w.dword(0); // frame size, patched below
    w.word(FRAME_MAGIC);
    // A count that fits goes in the old field; otherwise the old field
    // saturates and the new field carries it.
    if chunks.len() <= 0xFFFE {
        w.word(chunks.len() as u16);
    } else {
        w.word(0xFFFF);
    }
    w.word(duration_ms);
    w.zeros(2);
    if chunks.len() <= 0xFFFE {
        w.dword(0);
    } else {
        w.dword(chunks.len() as u32);
    }
    for (chunk_code, payload) in chunks {
        w.dword((payload.len() + CHUNK_HEADER_SIZE) as u32);
        w.word(*chunk_code);
        w.bytes(payload);
    }
    let frame_size = (w.len() - frame_start) as u32;
    w.patch_dword(frame_start, frame_size);
}

type ChunkList = Vec<(u16, Vec<u8>)>;

fn preserved_frame_chunks(
    file: &AsepriteFile,
    frame_index: usize,
    compression: &dyn Compression,
) -> Result<ChunkList> {
    let frame = &file.frames[frame_index];
    let entries = frame.chunks.as_ref().ok_or(AseError::MissingChunkList {
        frame: frame_index,
    })?;
    let mut chunks: ChunkList = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            FrameChunk::Raw(raw) => chunks.push((raw.chunk_type, raw.data.clone())),
            FrameChunk::Layer(i) => {
                let layer = file.layers.get(*i).ok_or_else(|| AseError::BadChunkSize {
                    message: format!("preserved chunk references missing layer {}", i),
                })?;
                chunks.push((ChunkType::Layer.code(), layer::encode_layer_chunk(layer)?));
                push_user_data_chunk(&mut chunks, layer.user_data.as_ref())?;
            }
            FrameChunk::Cel(i) => {
                let cel = frame.cels.get(*i).ok_or_else(|| AseError::BadChunkSize {
                    message: format!("preserved chunk references missing cel {}", i),
                })?;
                push_cel_chunks(&mut chunks, cel, compression)?;
            }
            FrameChunk::ColorProfile => {
                if let Some(ref profile) = file.color_profile {
                    chunks.push((
                        ChunkType::ColorProfile.code(),
                        color_profile::encode_color_profile_chunk(profile),
                    ));
                }
            }
            FrameChunk::ExternalFiles => {
                if !file.external_files.is_empty() {
                    chunks.push((
                        ChunkType::ExternalFiles.code(),
                        external_file::encode_external_files_chunk(&file.external_files)?,
                    ));
                }
            }
            FrameChunk::Palette => {
                if let Some(ref palette) = file.palette {
                    chunks.push((
                        ChunkType::Palette.code(),
                        palette::encode_palette_chunk(palette)?,
                    ));
                }
            }
            FrameChunk::Tags => push_tags_chunks(&mut chunks, file)?,
            FrameChunk::Slice(i) => {
                let slice = file.slices.get(*i).ok_or_else(|| AseError::BadChunkSize {
                    message: format!("preserved chunk references missing slice {}", i),
                })?;
                chunks.push((ChunkType::Slice.code(), slice::encode_slice_chunk(slice)?));
                push_user_data_chunk(&mut chunks, slice.user_data.as_ref())?;
            }
            FrameChunk::Tileset(i) => {
                let tileset =
                    file.tilesets.get(*i).ok_or_else(|| AseError::BadChunkSize {
                        message: format!("preserved chunk references missing tileset {}", i),
                    })?;
                push_tileset_chunks(&mut chunks, tileset, compression)?;
            }
            FrameChunk::SpriteUserData => {
                push_user_data_chunk(&mut chunks, file.user_data.as_ref())?;
            }
        }
    }
    Ok(chunks)
}

/// The canonical chunk order: for the first frame all sprite-wide chunks
/// (sprite user data, layers, profile, external files, palette, tags,
/// slices, tilesets, unknown chunks), then for every frame its cels.
///
/// Sprite-level user data leads the frame: it is the only position where
/// the attachment cursor has no other candidate, so it reads back as
/// sprite-level. Anywhere later it would attach to the preceding entity.
fn canonical_frame_chunks(
    file: &AsepriteFile,
    frame_index: usize,
    options: &EncodeOptions,
    compression: &dyn Compression,
) -> Result<ChunkList> {
    let mut chunks: ChunkList = Vec::new();
    if frame_index == 0 {
        push_user_data_chunk(&mut chunks, file.user_data.as_ref())?;
        for layer in &file.layers {
            chunks.push((ChunkType::Layer.code(), layer::encode_layer_chunk(layer)?));
            push_user_data_chunk(&mut chunks, layer.user_data.as_ref())?;
        }
        if let Some(ref profile) = file.color_profile {
            chunks.push((
                ChunkType::ColorProfile.code(),
                color_profile::encode_color_profile_chunk(profile),
            ));
        }
        if !file.external_files.is_empty() {
            chunks.push((
                ChunkType::ExternalFiles.code(),
                external_file::encode_external_files_chunk(&file.external_files)?,
            ));
        }
        if let Some(ref palette) = file.palette {
            if options.write_legacy_palette_chunks {
                chunks.push((
                    ChunkType::OldPalette04.code(),
                    palette::encode_old_palette_chunk(palette),
                ));
            }
            chunks.push((
                ChunkType::Palette.code(),
                palette::encode_palette_chunk(palette)?,
            ));
        }
        push_tags_chunks(&mut chunks, file)?;
        for slice in &file.slices {
            chunks.push((ChunkType::Slice.code(), slice::encode_slice_chunk(slice)?));
            push_user_data_chunk(&mut chunks, slice.user_data.as_ref())?;
        }
        for tileset in &file.tilesets {
            push_tileset_chunks(&mut chunks, tileset, compression)?;
        }
        for raw in &file.unknown_chunks {
            chunks.push((raw.chunk_type, raw.data.clone()));
        }
    }
    for cel in &file.frames[frame_index].cels {
        push_cel_chunks(&mut chunks, cel, compression)?;
    }
    Ok(chunks)
}

fn push_user_data_chunk(chunks: &mut ChunkList, user_data: Option<&UserData>) -> Result<()> {
    if let Some(ud) = user_data {
        chunks.push((
            ChunkType::UserData.code(),
            user_data::encode_user_data_chunk(ud)?,
        ));
    }
    Ok(())
}

fn push_cel_chunks(
    chunks: &mut ChunkList,
    cel: &crate::cel::Cel,
    compression: &dyn Compression,
) -> Result<()> {
    chunks.push((ChunkType::Cel.code(), cel::encode_cel_chunk(cel, compression)?));
    if let Some(ref extra) = cel.extra {
        chunks.push((ChunkType::CelExtra.code(), cel::encode_cel_extra_chunk(extra)));
    }
    push_user_data_chunk(chunks, cel.user_data.as_ref())?;
    Ok(())
}

/// The tags chunk plus the per-tag user-data sequence. The decode cursor
/// attaches user data to tags strictly in order, so tags without user data
/// that precede a tag with some get an empty placeholder chunk; trailing
/// tags without user data get nothing.
fn push_tags_chunks(chunks: &mut ChunkList, file: &AsepriteFile) -> Result<()> {
    if file.tags.is_empty() {
        return Ok(());
    }
    chunks.push((ChunkType::Tags.code(), tags::encode_tags_chunk(&file.tags)?));
    let last_with_data = file.tags.iter().rposition(|t| t.user_data.is_some());
    if let Some(last) = last_with_data {
        let empty = UserData::default();
        for tag in &file.tags[..=last] {
            let ud = tag.user_data.as_ref().unwrap_or(&empty);
            chunks.push((
                ChunkType::UserData.code(),
                user_data::encode_user_data_chunk(ud)?,
            ));
        }
    }
    Ok(())
}

/// A tileset chunk plus its user-data sequence. The decode cursor reads the
/// first user-data chunk as the tileset's own, then one per tile, so the
/// tileset slot gets an empty placeholder whenever tile user data follows.
fn push_tileset_chunks(
    chunks: &mut ChunkList,
    tileset: &crate::tileset::Tileset,
    compression: &dyn Compression,
) -> Result<()> {
    chunks.push((
        ChunkType::Tileset.code(),
        tileset::encode_tileset_chunk(tileset, compression)?,
    ));
    let has_tile_data = tileset.tile_user_data.iter().any(|ud| !ud.is_empty());
    match (tileset.user_data.as_ref(), has_tile_data) {
        (Some(ud), _) => chunks.push((
            ChunkType::UserData.code(),
            user_data::encode_user_data_chunk(ud)?,
        )),
        (None, true) => chunks.push((
            ChunkType::UserData.code(),
            user_data::encode_user_data_chunk(&UserData::default())?,
        )),
        (None, false) => {}
    }
    if has_tile_data {
        let last = tileset
            .tile_user_data
            .iter()
            .rposition(|ud| !ud.is_empty())
            .unwrap_or(0);
        for ud in &tileset.tile_user_data[..=last] {
            chunks.push((
                ChunkType::UserData.code(),
                user_data::encode_user_data_chunk(ud)?,
            ));
        }
    }
    Ok(())
}
