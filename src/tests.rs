use crate::cel::{Cel, CelContent, ImageData};
use crate::chunk::FrameChunk;
use crate::compress::{Compression, Flate2Compression};
use crate::encode::{encode, EncodeMode, EncodeOptions};
use crate::file::{decode_cel_pixels, decode_tilemap, AsepriteFile, Frame, Header, PixelFormat};
use crate::layer::{BlendMode, Layer, LayerFlags, LayerType};
use crate::parse::{decode, DecodeOptions, ImageDecode};
use crate::slice::{Slice, SliceFlags, SliceKey};
use crate::tags::{AnimationDirection, Tag};
use crate::tilemap::{Tile, TileBitmasks, TilemapData};
use crate::user_data::{ExtensionProperties, PropertyValue, UserData};
use crate::writer::AseWriter;
use crate::AseError;

fn canonical() -> EncodeOptions {
    EncodeOptions {
        mode: EncodeMode::Canonical,
        ..EncodeOptions::default()
    }
}

fn preserved() -> EncodeOptions {
    EncodeOptions {
        mode: EncodeMode::Preserved,
        ..EncodeOptions::default()
    }
}

fn simple_layer(name: &str) -> Layer {
    Layer {
        flags: LayerFlags::VISIBLE | LayerFlags::EDITABLE,
        layer_type: LayerType::Normal,
        child_level: 0,
        blend_mode: BlendMode::Normal,
        opacity: 255,
        name: name.to_owned(),
        user_data: None,
    }
}

fn raw_cel(layer: u16, width: u16, height: u16, fill: [u8; 4]) -> Cel {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for _ in 0..width as usize * height as usize {
        pixels.extend_from_slice(&fill);
    }
    Cel {
        layer_index: layer,
        x: 0,
        y: 0,
        opacity: 255,
        z_index: 0,
        content: CelContent::Image(ImageData::from_raw_pixels(width, height, pixels)),
        extra: None,
        user_data: None,
    }
}

fn text_ud(text: &str) -> UserData {
    UserData {
        text: Some(text.to_owned()),
        color: None,
        properties: Vec::new(),
    }
}

/// Hand-build the minimal file of scenario 1: a 16x16 RGBA sprite, one
/// 100 ms frame, one layer, one 4x4 raw cel filled with opaque red.
fn minimal_file_bytes() -> Vec<u8> {
    let mut layer = AseWriter::new();
    layer.word(0x0003); // visible | editable
    layer.word(0); // normal layer
    layer.word(0); // child level
    layer.word(0);
    layer.word(0);
    layer.word(0); // blend normal
    layer.byte(255);
    layer.zeros(3);
    layer.string("Layer 1").unwrap();
    let layer = layer.into_bytes();

    let mut cel = AseWriter::new();
    cel.word(0); // layer 0
    cel.short(0);
    cel.short(0);
    cel.byte(255);
    cel.word(0); // raw cel
    cel.short(0); // z-index
    cel.zeros(5);
    cel.word(4);
    cel.word(4);
    for _ in 0..16 {
        cel.bytes(&[255, 0, 0, 255]);
    }
    let cel = cel.into_bytes();

    let mut w = AseWriter::new();
    let file_size = w.mark();
    w.dword(0);
    w.word(0xA5E0);
    w.word(1); // frames
    w.word(16);
    w.word(16);
    w.word(32); // RGBA
    w.dword(1);
    w.word(100); // speed
    w.zeros(8);
    w.byte(0);
    w.zeros(3);
    w.word(0);
    w.byte(1);
    w.byte(1);
    w.short(0);
    w.short(0);
    w.word(16);
    w.word(16);
    w.zeros(84);
    assert_eq!(w.len(), 128);

    let frame_start = w.mark();
    w.dword(0);
    w.word(0xF1FA);
    w.word(2); // two chunks, old field
    w.word(100); // duration
    w.zeros(2);
    w.dword(0);
    for payload in [&layer, &cel] {
        w.dword((payload.len() + 6) as u32);
        w.word(if payload == &layer { 0x2004 } else { 0x2005 });
        w.bytes(payload);
    }
    let frame_size = (w.len() - frame_start) as u32;
    w.patch_dword(frame_start, frame_size);
    w.patch_dword(file_size, w.len() as u32);
    w.into_bytes()
}

#[test]
fn minimal_file_decodes() {
    let bytes = minimal_file_bytes();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.width(), 16);
    assert_eq!(ase.height(), 16);
    assert_eq!(ase.num_frames(), 1);
    assert_eq!(ase.num_layers(), 1);
    assert_eq!(ase.layers[0].name, "Layer 1");
    assert_eq!(ase.frames[0].duration_ms, 100);
    assert_eq!(ase.pixel_format().unwrap(), PixelFormat::Rgba);
    match ase.frames[0].cels[0].content {
        CelContent::Image(ref image) => {
            assert_eq!((image.width, image.height), (4, 4));
            assert!(!image.is_compressed());
            assert_eq!(image.decoded_pixels().unwrap().len(), 64);
        }
        ref other => panic!("expected raw image cel, got {:?}", other),
    }
}

#[test]
fn minimal_file_survives_preserved_round_trip() {
    let bytes = minimal_file_bytes();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    // Auto mode picks preserved because the chunk lists are present.
    let out = ase.encode().unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn zero_duration_falls_back_to_header_speed() {
    let mut bytes = minimal_file_bytes();
    // Frame duration sits 8 bytes into the frame header at offset 128.
    bytes[128 + 8] = 0;
    bytes[128 + 9] = 0;
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.frames[0].duration_ms, 100); // header speed
}

#[test]
fn new_chunk_count_wins_only_when_old_saturated() {
    let mut bytes = minimal_file_bytes();
    // old count = 0xFFFF, new count = 2: the new field is authoritative.
    bytes[128 + 6] = 0xFF;
    bytes[128 + 7] = 0xFF;
    bytes[128 + 12] = 2;
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.num_layers(), 1);
    assert_eq!(ase.frames[0].cels.len(), 1);

    // Both fields set but old not saturated: the old field wins.
    let mut bytes = minimal_file_bytes();
    bytes[128 + 12] = 1; // new says one chunk, old still says two
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.num_layers(), 1);
    assert_eq!(ase.frames[0].cels.len(), 1);
}

#[test]
fn strict_rejects_bad_magic_and_depth() {
    let mut bytes = minimal_file_bytes();
    bytes[4] = 0x00; // break the file magic
    match AsepriteFile::decode(&bytes) {
        Err(AseError::BadMagic {
            kind: "file",
            offset: 4,
            ..
        }) => {}
        other => panic!("expected BadMagic, got {:?}", other),
    }

    let mut bytes = minimal_file_bytes();
    bytes[12] = 12; // color depth 12
    assert!(matches!(
        AsepriteFile::decode(&bytes),
        Err(AseError::UnsupportedColorDepth(12))
    ));
}

#[test]
fn non_strict_records_the_magic_and_continues() {
    let mut bytes = minimal_file_bytes();
    bytes[4] = 0x00;
    let options = DecodeOptions {
        strict: false,
        ..DecodeOptions::default()
    };
    let ase = decode(&bytes, &options).unwrap();
    assert_eq!(ase.header.magic, 0x0000);
    assert_eq!(ase.num_layers(), 1);
}

fn two_frame_linked_file() -> AsepriteFile {
    let mut header = Header::new(8, 8);
    header.frame_count = 2;
    let mut file = AsepriteFile::new(header);
    file.layers.push(simple_layer("Layer 1"));
    let mut frame0 = Frame::new(50);
    frame0.cels.push(raw_cel(0, 2, 2, [0, 255, 0, 255]));
    let mut frame1 = Frame::new(50);
    frame1.cels.push(Cel {
        layer_index: 0,
        x: 0,
        y: 0,
        opacity: 255,
        z_index: 0,
        content: CelContent::Linked(0),
        extra: None,
        user_data: None,
    });
    file.frames.push(frame0);
    file.frames.push(frame1);
    file
}

#[test]
fn linked_cel_resolves_and_round_trips() {
    let file = two_frame_linked_file();
    let bytes = encode(&file, &canonical()).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();

    assert!(matches!(
        ase.frames[0].cels[0].content,
        CelContent::Image(_)
    ));
    assert!(matches!(
        ase.frames[1].cels[0].content,
        CelContent::Linked(0)
    ));
    let resolved = ase.resolve_linked_cel(&ase.frames[1].cels[0]).unwrap();
    assert!(std::ptr::eq(resolved, &ase.frames[0].cels[0]));

    // Pixel access through the link lands on frame 0's data.
    let mut ase = ase;
    let pixels = decode_cel_pixels(&mut ase, 1, 0, &Flate2Compression).unwrap();
    assert_eq!(pixels.pixels.chunks(4).next().unwrap(), &[0, 255, 0, 255]);
}

#[test]
fn tag_user_data_attaches_by_cursor() {
    // Scenario: three tags, then two user-data chunks; later a third.
    let mut file = AsepriteFile::new({
        let mut h = Header::new(4, 4);
        h.frame_count = 1;
        h
    });
    file.layers.push(simple_layer("l"));
    file.frames.push(Frame::new(100));
    for name in ["a", "b", "c"] {
        file.tags.push(Tag {
            name: name.to_owned(),
            from_frame: 0,
            to_frame: 0,
            direction: AnimationDirection::Forward,
            repeat: 0,
            color: [0; 3],
            user_data: None,
        });
    }
    file.tags[0].user_data = Some(text_ud("first"));
    file.tags[1].user_data = Some(text_ud("second"));
    let bytes = encode(&file, &canonical()).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.tags[0].user_data, Some(text_ud("first")));
    assert_eq!(ase.tags[1].user_data, Some(text_ud("second")));
    assert_eq!(ase.tags[2].user_data, None);

    // With the third tag annotated as well, the cursor reaches slot 2.
    let mut file = file;
    file.tags[2].user_data = Some(text_ud("third"));
    let bytes = encode(&file, &canonical()).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.tags[2].user_data, Some(text_ud("third")));
}

#[test]
fn gapped_tag_user_data_round_trips() {
    // Only the last tag has user data; the cursor still lands on it thanks
    // to empty placeholder chunks.
    let mut file = AsepriteFile::new({
        let mut h = Header::new(4, 4);
        h.frame_count = 1;
        h
    });
    file.layers.push(simple_layer("l"));
    file.frames.push(Frame::new(100));
    for name in ["a", "b", "c"] {
        file.tags.push(Tag {
            name: name.to_owned(),
            from_frame: 0,
            to_frame: 0,
            direction: AnimationDirection::Forward,
            repeat: 0,
            color: [0; 3],
            user_data: None,
        });
    }
    file.tags[2].user_data = Some(text_ud("only"));
    let bytes = encode(&file, &canonical()).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.tags[0].user_data, None);
    assert_eq!(ase.tags[1].user_data, None);
    assert_eq!(ase.tags[2].user_data, Some(text_ud("only")));
}

#[test]
fn sprite_user_data_on_frame_zero() {
    let mut file = AsepriteFile::new({
        let mut h = Header::new(4, 4);
        h.frame_count = 1;
        h
    });
    file.layers.push(simple_layer("l"));
    file.frames.push(Frame::new(100));
    file.user_data = Some(UserData {
        text: Some("sprite".to_owned()),
        color: Some([9, 8, 7, 6]),
        properties: vec![ExtensionProperties {
            extension_id: 0,
            properties: vec![("answer".to_owned(), PropertyValue::Int32(42))],
        }],
    });
    let bytes = encode(&file, &canonical()).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.user_data, file.user_data);
}

fn rich_file() -> AsepriteFile {
    let comp = Flate2Compression;
    let mut header = Header::new(32, 32);
    header.frame_count = 2;
    let mut file = AsepriteFile::new(header);

    file.layers.push(simple_layer("bg"));
    file.layers.push(Layer {
        layer_type: LayerType::Group,
        name: "group".to_owned(),
        ..simple_layer("group")
    });
    file.layers.push(Layer {
        child_level: 1,
        name: "fg".to_owned(),
        user_data: Some(text_ud("front")),
        ..simple_layer("fg")
    });
    file.layers.push(Layer {
        layer_type: LayerType::Tilemap { tileset_index: 0 },
        name: "map".to_owned(),
        ..simple_layer("map")
    });

    let mut frame0 = Frame::new(120);
    frame0.cels.push(raw_cel(0, 4, 4, [1, 2, 3, 4]));
    let pixels = vec![0x55_u8; 2 * 2 * 4];
    frame0.cels.push(Cel {
        layer_index: 2,
        x: 3,
        y: -1,
        opacity: 200,
        z_index: 1,
        content: CelContent::Image(ImageData::from_zlib(
            2,
            2,
            comp.deflate(&pixels).unwrap(),
        )),
        extra: None,
        user_data: Some(text_ud("cel")),
    });
    let tiles = vec![
        Tile {
            id: 1,
            ..Tile::default()
        },
        Tile {
            id: 2,
            x_flip: true,
            ..Tile::default()
        },
        Tile {
            id: 0,
            ..Tile::default()
        },
        Tile {
            id: 3,
            rotate_90cw: true,
            ..Tile::default()
        },
    ];
    let packed = crate::tilemap::pack_tiles(&tiles, 32, &TileBitmasks::DEFAULT);
    frame0.cels.push(Cel {
        layer_index: 3,
        x: 0,
        y: 0,
        opacity: 255,
        z_index: 0,
        content: CelContent::Tilemap(TilemapData {
            width: 2,
            height: 2,
            bits_per_tile: 32,
            bitmasks: TileBitmasks::DEFAULT,
            zlib: comp.deflate(&packed).unwrap(),
            decoded: None,
        }),
        extra: None,
        user_data: None,
    });
    let mut frame1 = Frame::new(80);
    frame1.cels.push(Cel {
        layer_index: 0,
        x: 0,
        y: 0,
        opacity: 255,
        z_index: 0,
        content: CelContent::Linked(0),
        extra: None,
        user_data: None,
    });
    file.frames.push(frame0);
    file.frames.push(frame1);

    file.tags.push(Tag {
        name: "loop".to_owned(),
        from_frame: 0,
        to_frame: 1,
        direction: AnimationDirection::PingPong,
        repeat: 3,
        color: [10, 20, 30],
        user_data: Some(text_ud("tag")),
    });

    file.slices.push(Slice {
        name: "hitbox".to_owned(),
        flags: SliceFlags::PIVOT,
        keys: vec![SliceKey {
            from_frame: 0,
            origin: (1, 1),
            size: (8, 8),
            slice9: None,
            pivot: Some((4, 4)),
        }],
        user_data: None,
    });

    let strip = vec![0xAB_u8; 8 * 8 * 4 * 2];
    file.tilesets.push(crate::tileset::Tileset {
        id: 0,
        flags: crate::tileset::TilesetFlags::EMPTY_TILE_IS_ID_ZERO
            | crate::tileset::TilesetFlags::FILE_INCLUDES_TILES,
        tile_count: 2,
        tile_width: 8,
        tile_height: 8,
        base_index: 1,
        name: "tiles".to_owned(),
        external_file: None,
        pixels: Some(crate::tileset::TilesetPixels {
            zlib: comp.deflate(&strip).unwrap(),
            decoded: None,
        }),
        user_data: Some(text_ud("tileset")),
        tile_user_data: vec![text_ud("tile0"), text_ud("tile1")],
    });

    file.palette = Some(crate::palette::Palette {
        declared_size: 2,
        first_index: 0,
        entries: vec![
            crate::palette::PaletteEntry {
                red: 0,
                green: 0,
                blue: 0,
                alpha: 255,
                name: None,
            },
            crate::palette::PaletteEntry {
                red: 255,
                green: 255,
                blue: 255,
                alpha: 255,
                name: Some("white".to_owned()),
            },
        ],
    });

    file.color_profile = Some(crate::color_profile::ColorProfile {
        profile_type: crate::color_profile::ColorProfileType::Srgb,
        flags: 0,
        fixed_gamma: None,
    });

    file.external_files.push(crate::external_file::ExternalFile {
        id: 1,
        file_type: crate::external_file::ExternalFileType::Tileset,
        filename: "shared.aseprite".to_owned(),
    });

    file.user_data = Some(text_ud("sprite"));
    file
}

/// Strip decode-side artifacts (preserved chunk lists) for model equality.
fn forget_chunk_lists(mut file: AsepriteFile) -> AsepriteFile {
    for frame in &mut file.frames {
        frame.chunks = None;
    }
    file
}

#[test]
fn canonical_round_trip_preserves_the_model() {
    let file = rich_file();
    let bytes = encode(&file, &canonical()).unwrap();
    let decoded = forget_chunk_lists(AsepriteFile::decode(&bytes).unwrap());

    assert_eq!(decoded.header.width, file.header.width);
    assert_eq!(decoded.header.color_depth, file.header.color_depth);
    assert_eq!(decoded.layers, file.layers);
    assert_eq!(decoded.tags, file.tags);
    assert_eq!(decoded.slices, file.slices);
    assert_eq!(decoded.palette, file.palette);
    assert_eq!(decoded.color_profile, file.color_profile);
    assert_eq!(decoded.external_files, file.external_files);
    assert_eq!(decoded.user_data, file.user_data);
    assert_eq!(decoded.tilesets, file.tilesets);
    assert_eq!(decoded.frames.len(), file.frames.len());
    for (got, want) in decoded.frames.iter().zip(&file.frames) {
        assert_eq!(got.duration_ms, want.duration_ms);
        assert_eq!(got.cels, want.cels);
    }
}

#[test]
fn canonical_encode_is_idempotent() {
    let file = rich_file();
    let once = encode(&file, &canonical()).unwrap();
    let decoded = AsepriteFile::decode(&once).unwrap();
    let twice = encode(&decoded, &canonical()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn preserved_mode_is_byte_identical() {
    let bytes = encode(&rich_file(), &canonical()).unwrap();
    let decoded = AsepriteFile::decode(&bytes).unwrap();
    let out = encode(&decoded, &preserved()).unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn preserved_mode_requires_chunk_lists() {
    let file = rich_file(); // built in memory, no chunk lists
    assert!(matches!(
        encode(&file, &preserved()),
        Err(AseError::MissingChunkList { frame: 0 })
    ));
    // Auto mode falls back to canonical for the same file.
    assert!(encode(&file, &EncodeOptions::default()).is_ok());
}

#[test]
fn unknown_chunks_survive_verbatim() {
    let mut bytes = minimal_file_bytes();
    // Append an unknown chunk (type 0x2099) to the only frame.
    let extra_payload = [0xCA_u8, 0xFE, 0xBA, 0xBE, 0x00];
    let mut chunk = Vec::new();
    chunk.extend_from_slice(&((extra_payload.len() + 6) as u32).to_le_bytes());
    chunk.extend_from_slice(&0x2099_u16.to_le_bytes());
    chunk.extend_from_slice(&extra_payload);
    bytes.extend_from_slice(&chunk);
    // Patch file size, frame size and chunk count.
    let new_file_size = bytes.len() as u32;
    bytes[0..4].copy_from_slice(&new_file_size.to_le_bytes());
    let frame_size = u32::from_le_bytes([bytes[128], bytes[129], bytes[130], bytes[131]])
        + chunk.len() as u32;
    bytes[128..132].copy_from_slice(&frame_size.to_le_bytes());
    bytes[128 + 6] = 3; // three chunks now

    let ase = AsepriteFile::decode(&bytes).unwrap();
    assert_eq!(ase.unknown_chunks.len(), 1);
    assert_eq!(ase.unknown_chunks[0].chunk_type, 0x2099);
    assert_eq!(ase.unknown_chunks[0].data, extra_payload);

    // Preserved re-encode reproduces the input bytes.
    let out = encode(&ase, &preserved()).unwrap();
    assert_eq!(out, bytes);

    // Canonical re-encode still carries the unknown chunk.
    let out = encode(&ase, &canonical()).unwrap();
    let again = AsepriteFile::decode(&out).unwrap();
    assert_eq!(again.unknown_chunks, ase.unknown_chunks);
}

#[test]
fn old_palette_only_file_synthesizes_palette() {
    // A file whose only palette information is a legacy chunk.
    let mut old = AseWriter::new();
    old.word(1); // one packet
    old.byte(0);
    old.byte(2); // two colors
    old.bytes(&[10, 20, 30]);
    old.bytes(&[40, 50, 60]);
    let old = old.into_bytes();

    let mut w = AseWriter::new();
    let file_size = w.mark();
    w.dword(0);
    w.word(0xA5E0);
    w.word(1);
    w.word(4);
    w.word(4);
    w.word(8); // indexed
    w.dword(1);
    w.word(100);
    w.zeros(8);
    w.byte(0);
    w.zeros(3);
    w.word(2);
    w.byte(1);
    w.byte(1);
    w.zeros(8);
    w.zeros(84);
    let frame_start = w.mark();
    w.dword(0);
    w.word(0xF1FA);
    w.word(1);
    w.word(100);
    w.zeros(2);
    w.dword(0);
    w.dword((old.len() + 6) as u32);
    w.word(0x0004);
    w.bytes(&old);
    let frame_size = (w.len() - frame_start) as u32;
    w.patch_dword(frame_start, frame_size);
    w.patch_dword(file_size, w.len() as u32);

    let ase = AsepriteFile::decode(&w.into_bytes()).unwrap();
    let palette = ase.palette.as_ref().unwrap();
    assert_eq!(palette.entries.len(), 2);
    assert!(palette.entries.iter().all(|e| e.alpha == 255));
    assert_eq!(
        (palette.entries[1].red, palette.entries[1].green, palette.entries[1].blue),
        (40, 50, 60)
    );
}

#[test]
fn modern_palette_wins_over_legacy_chunks() {
    let mut file = AsepriteFile::new({
        let mut h = Header::new(4, 4);
        h.frame_count = 1;
        h
    });
    file.layers.push(simple_layer("l"));
    file.frames.push(Frame::new(100));
    file.palette = Some(crate::palette::Palette {
        declared_size: 1,
        first_index: 0,
        entries: vec![crate::palette::PaletteEntry {
            red: 1,
            green: 2,
            blue: 3,
            alpha: 77,
            name: None,
        }],
    });
    let options = EncodeOptions {
        mode: EncodeMode::Canonical,
        write_legacy_palette_chunks: true,
        ..EncodeOptions::default()
    };
    let bytes = encode(&file, &options).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    // The legacy chunk was emitted too, but the modern chunk is the source
    // of truth: the alpha survives.
    assert_eq!(ase.palette.as_ref().unwrap().entries[0].alpha, 77);
}

#[test]
fn eager_pixel_decode() {
    let file = rich_file();
    let bytes = encode(&file, &canonical()).unwrap();
    let options = DecodeOptions {
        decode_images: ImageDecode::Pixels,
        ..DecodeOptions::default()
    };
    let ase = decode(&bytes, &options).unwrap();
    for cel in &ase.frames[0].cels {
        match cel.content {
            CelContent::Image(ref image) => assert!(image.decoded_pixels().is_some()),
            CelContent::Tilemap(ref map) => assert!(map.decoded_tiles().is_some()),
            CelContent::Linked(_) => {}
        }
    }

    // Without preservation the zlib payloads are gone but encoding still
    // works by re-deflating.
    let options = DecodeOptions {
        decode_images: ImageDecode::Pixels,
        preserve_compressed: false,
        ..DecodeOptions::default()
    };
    let ase = decode(&bytes, &options).unwrap();
    let out = encode(&ase, &canonical()).unwrap();
    let again = AsepriteFile::decode(&out).unwrap();
    assert_eq!(forget_chunk_lists(again).layers, file.layers);
}

#[test]
fn tilemap_view_decodes_tiles() {
    let file = rich_file();
    let bytes = encode(&file, &canonical()).unwrap();
    let mut ase = AsepriteFile::decode(&bytes).unwrap();
    let cel = &mut ase.frames[0].cels[2];
    let view = decode_tilemap(cel, &Flate2Compression).unwrap();
    assert_eq!((view.width, view.height), (2, 2));
    assert_eq!(view.tiles.len(), 4);
    assert_eq!(view.tiles[1].id, 2);
    assert!(view.tiles[1].x_flip);
    assert!(view.tiles[3].rotate_90cw);

    // Not a tilemap cel.
    let cel = &mut ase.frames[0].cels[0];
    assert!(matches!(
        decode_tilemap(cel, &Flate2Compression),
        Err(AseError::InvalidCelType(0))
    ));
}

#[test]
fn cel_extra_attaches_to_its_cel() {
    let mut file = two_frame_linked_file();
    file.frames[0].cels[0].extra = Some(crate::cel::CelExtra {
        precise_bounds: Some(crate::cel::PreciseBounds {
            x: 0.5,
            y: 0.25,
            width: 2.0,
            height: 2.0,
        }),
    });
    let bytes = encode(&file, &canonical()).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    let extra = ase.frames[0].cels[0].extra.unwrap();
    let bounds = extra.precise_bounds.unwrap();
    assert_eq!(bounds.x, 0.5);
    assert_eq!(bounds.width, 2.0);
    assert!(ase.frames[1].cels[0].extra.is_none());
}

#[test]
fn validation_flags_decoded_problems() {
    let mut file = two_frame_linked_file();
    file.frames[1].cels[0].content = CelContent::Linked(1); // self-link
    let bytes = encode(&file, &canonical()).unwrap();
    let ase = AsepriteFile::decode(&bytes).unwrap();
    let issues = crate::validate::validate(&ase);
    assert!(issues
        .iter()
        .any(|i| i.code == crate::validate::IssueCode::LinkedCelNotEarlier));
}

#[test]
fn preserved_chunk_list_accepts_typed_entries() {
    // Decode, then swap the raw cel chunk of frame 0 for a typed reference
    // and change the model; preserved encoding picks up the edit.
    let bytes = minimal_file_bytes();
    let mut ase = AsepriteFile::decode(&bytes).unwrap();
    ase.frames[0].cels[0].opacity = 128;
    let chunks = ase.frames[0].chunks.as_mut().unwrap();
    // Entry 1 is the cel chunk (entry 0 is the layer).
    chunks[1] = FrameChunk::Cel(0);
    let out = encode(&ase, &preserved()).unwrap();
    let again = AsepriteFile::decode(&out).unwrap();
    assert_eq!(again.frames[0].cels[0].opacity, 128);
    assert_eq!(again.layers, ase.layers);
}
