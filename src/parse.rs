use log::{debug, warn};

use crate::attach::{AttachmentState, CelHandle, UserDataSlot};
use crate::chunk::{check_chunk_size, ChunkType, FrameChunk, RawChunk, CHUNK_HEADER_SIZE};
use crate::compress::DEFAULT_COMPRESSION;
use crate::file::{AsepriteFile, Frame, Header, FILE_MAGIC, FRAME_MAGIC};
use crate::palette::{self, OldPalettePacket};
use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::{cel, color_profile, external_file, layer, slice, tags, tileset, user_data};
use crate::{AseError, Result};

/// How far to take image payloads during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageDecode {
    /// Keep compressed payloads untouched.
    #[default]
    None,
    /// Check declared dimensions against uncompressed payload sizes, but
    /// leave compressed payloads untouched.
    Metadata,
    /// Inflate every image, tilemap and tileset payload eagerly.
    Pixels,
}

/// Options for [`decode`].
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Keep every chunk's raw bytes in its frame's chunk list, enabling
    /// byte-preserving re-encoding.
    pub preserve_chunks: bool,
    /// Keep original zlib payloads inside cels and tilesets so an
    /// unmodified file re-emits them verbatim. Turning this off only takes
    /// effect together with [`ImageDecode::Pixels`].
    pub preserve_compressed: bool,
    /// Eager vs lazy image decoding.
    pub decode_images: ImageDecode,
    /// Fail on bad magics and color depths. Turning this off records the
    /// observed values and keeps parsing; meant for recovery tooling.
    pub strict: bool,
}

impl Default for DecodeOptions {
    fn default() -> DecodeOptions {
        DecodeOptions {
            preserve_chunks: true,
            preserve_compressed: true,
            decode_images: ImageDecode::None,
            strict: true,
        }
    }
}

struct ParseInfo {
    file: AsepriteFile,
    attach: AttachmentState,
    old_palette_runs: Vec<Vec<OldPalettePacket>>,
    saw_new_palette: bool,
}

/// Decode a complete `.aseprite` byte slice into the typed model.
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> Result<AsepriteFile> {
    let mut reader = AseReader::new(bytes);
    let header = parse_header(&mut reader, options)?;
    let frame_count = header.frame_count;
    let speed = header.speed;

    let mut info = ParseInfo {
        file: AsepriteFile::new(header),
        attach: AttachmentState::new(),
        old_palette_runs: Vec::new(),
        saw_new_palette: false,
    };

    for frame_index in 0..frame_count as usize {
        parse_frame(&mut reader, frame_index, speed, options, &mut info)?;
    }

    // Legacy files carry only old palette chunks; replay them.
    if !info.saw_new_palette && !info.old_palette_runs.is_empty() {
        info.file.palette = Some(palette::synthesize_palette(&info.old_palette_runs));
    }

    match options.decode_images {
        ImageDecode::None => {}
        ImageDecode::Metadata => check_image_metadata(&info.file)?,
        ImageDecode::Pixels => decode_all_images(&mut info.file, options)?,
    }

    Ok(info.file)
}

fn parse_header(reader: &mut AseReader<'_>, options: &DecodeOptions) -> Result<Header> {
    let _file_size = reader.dword()?;
    let magic_offset = reader.pos();
    let magic = reader.word()?;
    if magic != FILE_MAGIC {
        if options.strict {
            return Err(AseError::BadMagic {
                kind: "file",
                offset: magic_offset,
                expected: FILE_MAGIC,
                actual: magic,
            });
        }
        warn!(
            "file magic {:#06x} does not match {:#06x}, continuing (strict=false)",
            magic, FILE_MAGIC
        );
    }
    let frame_count = reader.word()?;
    let width = reader.word()?;
    let height = reader.word()?;
    let color_depth = reader.word()?;
    let flags = reader.dword()?;
    let speed = reader.word()?;
    reader.skip(8)?;
    let transparent_index = reader.byte()?;
    reader.skip(3)?;
    let color_count = reader.word()?;
    let pixel_width = reader.byte()?;
    let pixel_height = reader.byte()?;
    let grid_x = reader.short()?;
    let grid_y = reader.short()?;
    let grid_width = reader.word()?;
    let grid_height = reader.word()?;
    reader.skip(84)?;

    if options.strict {
        if let Err(err) = crate::file::PixelFormat::from_color_depth(color_depth, transparent_index)
        {
            return Err(err);
        }
    }

    Ok(Header {
        magic,
        frame_count,
        width,
        height,
        color_depth,
        flags,
        speed,
        transparent_index,
        color_count,
        pixel_width,
        pixel_height,
        grid_x,
        grid_y,
        grid_width,
        grid_height,
    })
}

fn parse_frame(
    reader: &mut AseReader<'_>,
    frame_index: usize,
    speed: u16,
    options: &DecodeOptions,
    info: &mut ParseInfo,
) -> Result<()> {
    let frame_start = reader.pos();
    let frame_size = reader.dword()? as usize;
    let magic_offset = reader.pos();
    let magic = reader.word()?;
    if magic != FRAME_MAGIC {
        if options.strict {
            return Err(AseError::BadMagic {
                kind: "frame",
                offset: magic_offset,
                expected: FRAME_MAGIC,
                actual: magic,
            });
        }
        warn!(
            "frame {} magic {:#06x} does not match {:#06x}, continuing (strict=false)",
            frame_index, magic, FRAME_MAGIC
        );
    }
    let old_chunk_count = reader.word()?;
    let duration_ms = reader.word()?;
    reader.skip(2)?;
    let new_chunk_count = reader.dword()?;

    // Pre-1.2 files set only the old field; modern files saturate it and
    // put the real count in the new field.
    let chunk_count = if new_chunk_count != 0 && old_chunk_count == 0xFFFF {
        new_chunk_count
    } else {
        old_chunk_count as u32
    };

    let mut frame = Frame::new(if duration_ms == 0 { speed } else { duration_ms });
    if options.preserve_chunks {
        frame.chunks = Some(Vec::with_capacity(chunk_count as usize));
    }
    info.file.frames.push(frame);

    for _ in 0..chunk_count {
        let chunk_start = reader.pos();
        let chunk_size = reader.dword()?;
        let chunk_code = reader.word()?;
        let frame_remaining = (frame_start + frame_size).saturating_sub(chunk_start);
        check_chunk_size(chunk_size, frame_remaining.saturating_sub(CHUNK_HEADER_SIZE))
            .map_err(|e| e.in_chunk(frame_index, chunk_code))?;
        let payload_len = chunk_size as usize - CHUNK_HEADER_SIZE;
        // The sub-reader advances the frame cursor past the chunk
        // immediately, so a codec that misreads cannot derail the frame.
        let mut payload = reader.sub_reader(payload_len)?;
        dispatch_chunk(&mut payload, chunk_code, frame_index, options, info)
            .map_err(|e| e.in_chunk(frame_index, chunk_code))?;
    }

    // Trailing bytes after the declared chunks belong to the frame; skip
    // to its declared end.
    reader.seek(frame_start + frame_size)?;
    Ok(())
}

fn dispatch_chunk(
    reader: &mut AseReader<'_>,
    chunk_code: u16,
    frame_index: usize,
    options: &DecodeOptions,
    info: &mut ParseInfo,
) -> Result<()> {
    if options.preserve_chunks {
        let raw = RawChunk {
            chunk_type: chunk_code,
            data: preview_rest(reader),
        };
        if let Some(ref mut chunks) = info.file.frames[frame_index].chunks {
            chunks.push(FrameChunk::Raw(raw));
        }
    }

    let chunk_type = match ChunkType::from_code(chunk_code) {
        Some(ty) => ty,
        None => {
            debug!(
                "preserving unknown chunk type {:#06x} in frame {}",
                chunk_code, frame_index
            );
            info.file.unknown_chunks.push(RawChunk {
                chunk_type: chunk_code,
                data: reader.take_rest(),
            });
            return Ok(());
        }
    };

    match chunk_type {
        ChunkType::Layer => {
            let layer = layer::parse_layer_chunk(reader)?;
            info.file.layers.push(layer);
            info.attach.on_layer(info.file.layers.len() - 1);
        }
        ChunkType::Cel => {
            let cel = cel::parse_cel_chunk(reader)?;
            let cels = &mut info.file.frames[frame_index].cels;
            cels.push(cel);
            info.attach.on_cel(CelHandle {
                frame: frame_index,
                cel: cels.len() - 1,
            });
        }
        ChunkType::CelExtra => {
            let extra = cel::parse_cel_extra_chunk(reader)?;
            match info.attach.on_cel_extra() {
                Some(handle) => {
                    info.file.frames[handle.frame].cels[handle.cel].extra = Some(extra);
                }
                None => debug!("cel-extra chunk with no preceding cel, dropped"),
            }
        }
        ChunkType::ColorProfile => {
            info.file.color_profile = Some(color_profile::parse_color_profile_chunk(reader)?);
            info.attach.on_neutral();
        }
        ChunkType::ExternalFiles => {
            let files = external_file::parse_external_files_chunk(reader)?;
            info.file.external_files.extend(files);
            info.attach.on_neutral();
        }
        ChunkType::Tags => {
            let tags = tags::parse_tags_chunk(reader)?;
            if frame_index != 0 {
                debug!("tags chunk outside frame 0");
            }
            let first = info.file.tags.len();
            let count = tags.len();
            info.file.tags.extend(tags);
            info.attach.on_tags(first, count);
        }
        ChunkType::Palette => {
            let parsed = palette::parse_palette_chunk(reader)?;
            info.saw_new_palette = true;
            match info.file.palette {
                Some(ref mut existing) => existing.merge(parsed),
                None => info.file.palette = Some(parsed),
            }
            info.attach.on_neutral();
        }
        ChunkType::OldPalette04 | ChunkType::OldPalette11 => {
            let packets = palette::parse_old_palette_chunk(reader)?;
            info.old_palette_runs.push(packets);
            info.attach.on_neutral();
        }
        ChunkType::UserData => {
            let user_data = user_data::parse_user_data_chunk(reader)?;
            apply_user_data(info, frame_index, user_data);
        }
        ChunkType::Slice => {
            let slice = slice::parse_slice_chunk(reader)?;
            info.file.slices.push(slice);
            info.attach.on_slice(info.file.slices.len() - 1);
        }
        ChunkType::Tileset => {
            let tileset = tileset::parse_tileset_chunk(reader)?;
            info.file.tilesets.push(tileset);
            info.attach.on_tileset(info.file.tilesets.len() - 1);
        }
    }
    Ok(())
}

fn apply_user_data(info: &mut ParseInfo, frame_index: usize, user_data: UserData) {
    let slot = info.attach.on_user_data(frame_index);
    // Empty user data is a cursor placeholder, not content.
    if user_data.is_empty() {
        return;
    }
    let file = &mut info.file;
    match slot {
        UserDataSlot::Layer(i) => file.layers[i].user_data = Some(user_data),
        UserDataSlot::Cel(handle) => {
            file.frames[handle.frame].cels[handle.cel].user_data = Some(user_data)
        }
        UserDataSlot::Slice(i) => file.slices[i].user_data = Some(user_data),
        UserDataSlot::Tag(i) => file.tags[i].user_data = Some(user_data),
        UserDataSlot::Tileset(i) => file.tilesets[i].user_data = Some(user_data),
        UserDataSlot::TilesetTile { tileset, tile } => {
            let slots = &mut file.tilesets[tileset].tile_user_data;
            if slots.len() <= tile {
                slots.resize(tile + 1, UserData::default());
            }
            slots[tile] = user_data;
        }
        UserDataSlot::Sprite => file.user_data = Some(user_data),
        UserDataSlot::Discard => {
            debug!("user-data chunk in frame {} has no target", frame_index)
        }
    }
}

/// Copy the remaining payload without consuming the reader.
fn preview_rest(reader: &AseReader<'_>) -> Vec<u8> {
    reader.peek_rest().to_vec()
}

/// Verify that uncompressed payload sizes match their declared dimensions,
/// without touching compressed data.
fn check_image_metadata(file: &AsepriteFile) -> Result<()> {
    let pixel_format = file.header.pixel_format()?;
    for frame in &file.frames {
        for cel in &frame.cels {
            if let crate::cel::CelContent::Image(ref image) = cel.content {
                if let Some(pixels) = image.decoded_pixels() {
                    let expected = image.width as usize
                        * image.height as usize
                        * pixel_format.bytes_per_pixel();
                    if pixels.len() != expected {
                        return Err(AseError::BadChunkSize {
                            message: format!(
                                "raw cel holds {} pixel bytes, dimensions say {}",
                                pixels.len(),
                                expected
                            ),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Eagerly inflate every compressed payload, honoring
/// `preserve_compressed`.
fn decode_all_images(file: &mut AsepriteFile, options: &DecodeOptions) -> Result<()> {
    let pixel_format = file.header.pixel_format()?;
    for frame in &mut file.frames {
        for cel in &mut frame.cels {
            match cel.content {
                crate::cel::CelContent::Image(ref mut image) => {
                    image.pixels(pixel_format, &DEFAULT_COMPRESSION)?;
                    if !options.preserve_compressed {
                        image.drop_compressed();
                    }
                }
                crate::cel::CelContent::Tilemap(ref mut tilemap) => {
                    tilemap.tiles(&DEFAULT_COMPRESSION)?;
                    if !options.preserve_compressed {
                        tilemap.drop_compressed();
                    }
                }
                crate::cel::CelContent::Linked(_) => {}
            }
        }
    }
    for tileset in &mut file.tilesets {
        if tileset.pixels.is_some() {
            tileset.strip_pixels(pixel_format, &DEFAULT_COMPRESSION)?;
            if !options.preserve_compressed {
                if let Some(ref mut pixels) = tileset.pixels {
                    pixels.drop_compressed();
                }
            }
        }
    }
    Ok(())
}
