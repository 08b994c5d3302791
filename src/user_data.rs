use bitflags::bitflags;
use uuid::Uuid;

use crate::reader::AseReader;
use crate::writer::AseWriter;
use crate::{AseError, Result};

bitflags! {
    struct UserDataFlags: u32 {
        const HAS_TEXT = 0x0001;
        const HAS_COLOR = 0x0002;
        const HAS_PROPERTIES = 0x0004;
    }
}

/// Optional metadata attached to a layer, cel, tag, slice, tileset, tile or
/// the sprite itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    /// Free-form text.
    pub text: Option<String>,
    /// RGBA color.
    pub color: Option<[u8; 4]>,
    /// Extension property blocks, in wire order.
    pub properties: Vec<ExtensionProperties>,
}

impl UserData {
    /// True when no field is set. Empty user data is not attached during
    /// decode and canonical encode only emits it as a cursor placeholder.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.color.is_none() && self.properties.is_empty()
    }
}

/// One extension block of the properties sub-format.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionProperties {
    /// Identifies the extension the properties belong to (0 = user sprite
    /// data).
    pub extension_id: u32,
    /// Named values, in wire order.
    pub properties: Vec<(String, PropertyValue)>,
}

/// A heterogeneous property value, one arm per wire type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    /// Stored excess-128 on the wire: raw byte minus 128.
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    /// 16.16 fixed point.
    Fixed(f64),
    Float(f32),
    Double(f64),
    String(String),
    Point(i32, i32),
    Size(i32, i32),
    Rect(i32, i32, i32, i32),
    /// Homogeneous or heterogeneous list. Encoding writes a shared element
    /// tag when all elements agree, otherwise element type 0 with a tag per
    /// element.
    Vector(Vec<PropertyValue>),
    /// Nested properties map.
    Properties(Vec<(String, PropertyValue)>),
    Uuid(Uuid),
    /// Forward-compat placeholder for a type tag this codec does not know.
    /// Holds the remaining raw bytes of the chunk so it can be re-emitted
    /// verbatim.
    Raw {
        /// The unknown wire type tag.
        type_code: u16,
        /// The preserved value bytes.
        bytes: Vec<u8>,
    },
}

const TYPE_NULL: u16 = 0x0000;
const TYPE_BOOL: u16 = 0x0001;
const TYPE_INT8: u16 = 0x0002;
const TYPE_UINT8: u16 = 0x0003;
const TYPE_INT16: u16 = 0x0004;
const TYPE_UINT16: u16 = 0x0005;
const TYPE_INT32: u16 = 0x0006;
const TYPE_UINT32: u16 = 0x0007;
const TYPE_INT64: u16 = 0x0008;
const TYPE_UINT64: u16 = 0x0009;
const TYPE_FIXED: u16 = 0x000A;
const TYPE_FLOAT: u16 = 0x000B;
const TYPE_DOUBLE: u16 = 0x000C;
const TYPE_STRING: u16 = 0x000D;
const TYPE_POINT: u16 = 0x000E;
const TYPE_SIZE: u16 = 0x000F;
const TYPE_RECT: u16 = 0x0010;
const TYPE_VECTOR: u16 = 0x0011;
const TYPE_PROPERTIES: u16 = 0x0012;
const TYPE_UUID: u16 = 0x0013;

impl PropertyValue {
    fn type_code(&self) -> u16 {
        match self {
            PropertyValue::Null => TYPE_NULL,
            PropertyValue::Bool(_) => TYPE_BOOL,
            PropertyValue::Int8(_) => TYPE_INT8,
            PropertyValue::Uint8(_) => TYPE_UINT8,
            PropertyValue::Int16(_) => TYPE_INT16,
            PropertyValue::Uint16(_) => TYPE_UINT16,
            PropertyValue::Int32(_) => TYPE_INT32,
            PropertyValue::Uint32(_) => TYPE_UINT32,
            PropertyValue::Int64(_) => TYPE_INT64,
            PropertyValue::Uint64(_) => TYPE_UINT64,
            PropertyValue::Fixed(_) => TYPE_FIXED,
            PropertyValue::Float(_) => TYPE_FLOAT,
            PropertyValue::Double(_) => TYPE_DOUBLE,
            PropertyValue::String(_) => TYPE_STRING,
            PropertyValue::Point(..) => TYPE_POINT,
            PropertyValue::Size(..) => TYPE_SIZE,
            PropertyValue::Rect(..) => TYPE_RECT,
            PropertyValue::Vector(_) => TYPE_VECTOR,
            PropertyValue::Properties(_) => TYPE_PROPERTIES,
            PropertyValue::Uuid(_) => TYPE_UUID,
            PropertyValue::Raw { type_code, .. } => *type_code,
        }
    }
}

pub(crate) fn parse_user_data_chunk(reader: &mut AseReader<'_>) -> Result<UserData> {
    let flags = UserDataFlags {
        bits: reader.dword()?,
    };
    let text = if flags.contains(UserDataFlags::HAS_TEXT) {
        Some(reader.string()?)
    } else {
        None
    };
    let color = if flags.contains(UserDataFlags::HAS_COLOR) {
        let mut rgba = [0_u8; 4];
        for c in rgba.iter_mut() {
            *c = reader.byte()?;
        }
        Some(rgba)
    } else {
        None
    };
    let properties = if flags.contains(UserDataFlags::HAS_PROPERTIES) {
        parse_extension_blocks(reader)?
    } else {
        Vec::new()
    };
    Ok(UserData {
        text,
        color,
        properties,
    })
}

fn parse_extension_blocks(reader: &mut AseReader<'_>) -> Result<Vec<ExtensionProperties>> {
    let block_count = reader.dword()?;
    let mut blocks = Vec::with_capacity(block_count as usize);
    for _ in 0..block_count {
        let extension_id = reader.dword()?;
        let properties = parse_property_records(reader)?;
        blocks.push(ExtensionProperties {
            extension_id,
            properties,
        });
        // An unknown type tag swallows the rest of the chunk; stop cleanly.
        if reader.is_empty() && ends_in_raw(&blocks) {
            break;
        }
    }
    Ok(blocks)
}

fn parse_property_records(reader: &mut AseReader<'_>) -> Result<Vec<(String, PropertyValue)>> {
    let count = reader.dword()?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = reader.string()?;
        let type_code = reader.word()?;
        let value = parse_value(reader, type_code)?;
        let stop = matches!(value, PropertyValue::Raw { .. });
        records.push((name, value));
        if stop {
            break;
        }
    }
    Ok(records)
}

fn ends_in_raw(blocks: &[ExtensionProperties]) -> bool {
    blocks
        .last()
        .and_then(|b| b.properties.last())
        .map(|(_, v)| matches!(v, PropertyValue::Raw { .. }))
        .unwrap_or(false)
}

fn parse_value(reader: &mut AseReader<'_>, type_code: u16) -> Result<PropertyValue> {
    let value = match type_code {
        TYPE_NULL => PropertyValue::Null,
        TYPE_BOOL => PropertyValue::Bool(reader.byte()? != 0),
        TYPE_INT8 => PropertyValue::Int8((reader.byte()? as i16 - 128) as i8),
        TYPE_UINT8 => PropertyValue::Uint8(reader.byte()?),
        TYPE_INT16 => PropertyValue::Int16(reader.short()?),
        TYPE_UINT16 => PropertyValue::Uint16(reader.word()?),
        TYPE_INT32 => PropertyValue::Int32(reader.long()?),
        TYPE_UINT32 => PropertyValue::Uint32(reader.dword()?),
        TYPE_INT64 => PropertyValue::Int64(reader.long64()?),
        TYPE_UINT64 => PropertyValue::Uint64(reader.qword()?),
        TYPE_FIXED => PropertyValue::Fixed(reader.fixed()?),
        TYPE_FLOAT => PropertyValue::Float(reader.float()?),
        TYPE_DOUBLE => PropertyValue::Double(reader.double()?),
        TYPE_STRING => PropertyValue::String(reader.string()?),
        TYPE_POINT => PropertyValue::Point(reader.long()?, reader.long()?),
        TYPE_SIZE => PropertyValue::Size(reader.long()?, reader.long()?),
        TYPE_RECT => PropertyValue::Rect(
            reader.long()?,
            reader.long()?,
            reader.long()?,
            reader.long()?,
        ),
        TYPE_VECTOR => {
            let count = reader.dword()?;
            let element_type = reader.word()?;
            let mut elements = Vec::with_capacity(count as usize);
            for _ in 0..count {
                // Element type 0 means every element carries its own tag.
                let tag = if element_type == 0 {
                    reader.word()?
                } else {
                    element_type
                };
                let element = parse_value(reader, tag)?;
                let stop = matches!(element, PropertyValue::Raw { .. });
                elements.push(element);
                if stop {
                    break;
                }
            }
            PropertyValue::Vector(elements)
        }
        TYPE_PROPERTIES => PropertyValue::Properties(parse_property_records(reader)?),
        TYPE_UUID => PropertyValue::Uuid(reader.uuid()?),
        unknown => PropertyValue::Raw {
            type_code: unknown,
            bytes: reader.take_rest(),
        },
    };
    Ok(value)
}

pub(crate) fn encode_user_data_chunk(user_data: &UserData) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    let mut flags = UserDataFlags::empty();
    if user_data.text.is_some() {
        flags |= UserDataFlags::HAS_TEXT;
    }
    if user_data.color.is_some() {
        flags |= UserDataFlags::HAS_COLOR;
    }
    if !user_data.properties.is_empty() {
        flags |= UserDataFlags::HAS_PROPERTIES;
    }
    w.dword(flags.bits());
    if let Some(ref text) = user_data.text {
        w.string(text)?;
    }
    if let Some(color) = user_data.color {
        w.bytes(&color);
    }
    if !user_data.properties.is_empty() {
        w.dword(user_data.properties.len() as u32);
        for block in &user_data.properties {
            w.dword(block.extension_id);
            encode_property_records(&mut w, &block.properties)?;
        }
    }
    Ok(w.into_bytes())
}

fn encode_property_records(
    w: &mut AseWriter,
    records: &[(String, PropertyValue)],
) -> Result<()> {
    w.dword(records.len() as u32);
    for (name, value) in records {
        w.string(name)?;
        w.word(value.type_code());
        encode_value(w, value)?;
    }
    Ok(())
}

fn encode_value(w: &mut AseWriter, value: &PropertyValue) -> Result<()> {
    match value {
        PropertyValue::Null => {}
        PropertyValue::Bool(b) => w.byte(*b as u8),
        PropertyValue::Int8(v) => w.byte((*v as i16 + 128) as u8),
        PropertyValue::Uint8(v) => w.byte(*v),
        PropertyValue::Int16(v) => w.short(*v),
        PropertyValue::Uint16(v) => w.word(*v),
        PropertyValue::Int32(v) => w.long(*v),
        PropertyValue::Uint32(v) => w.dword(*v),
        PropertyValue::Int64(v) => w.long64(*v),
        PropertyValue::Uint64(v) => w.qword(*v),
        PropertyValue::Fixed(v) => w.fixed(*v),
        PropertyValue::Float(v) => w.float(*v),
        PropertyValue::Double(v) => w.double(*v),
        PropertyValue::String(s) => w.string(s)?,
        PropertyValue::Point(x, y) => {
            w.long(*x);
            w.long(*y);
        }
        PropertyValue::Size(width, height) => {
            w.long(*width);
            w.long(*height);
        }
        PropertyValue::Rect(x, y, width, height) => {
            w.long(*x);
            w.long(*y);
            w.long(*width);
            w.long(*height);
        }
        PropertyValue::Vector(elements) => {
            w.dword(elements.len() as u32);
            let shared_tag = homogeneous_tag(elements);
            w.word(shared_tag.unwrap_or(0));
            for element in elements {
                if shared_tag.is_none() {
                    w.word(element.type_code());
                }
                encode_value(w, element)?;
            }
        }
        PropertyValue::Properties(records) => encode_property_records(w, records)?,
        PropertyValue::Uuid(id) => w.uuid(id),
        PropertyValue::Raw { type_code, bytes } => {
            if bytes.is_empty() {
                return Err(AseError::BadChunkSize {
                    message: format!(
                        "cannot re-emit unknown property type {:#06x} without raw bytes",
                        type_code
                    ),
                });
            }
            w.bytes(bytes);
        }
    }
    Ok(())
}

fn homogeneous_tag(elements: &[PropertyValue]) -> Option<u16> {
    let first = elements.first()?.type_code();
    // Tag 0 would read back as "heterogeneous", so a vector of Nulls also
    // takes the per-element path.
    if first != 0 && elements.iter().all(|e| e.type_code() == first) {
        Some(first)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(user_data: &UserData) -> UserData {
        let bytes = encode_user_data_chunk(user_data).unwrap();
        let mut reader = AseReader::new(&bytes);
        parse_user_data_chunk(&mut reader).unwrap()
    }

    #[test]
    fn text_and_color() {
        let ud = UserData {
            text: Some("hello".to_owned()),
            color: Some([1, 2, 3, 4]),
            properties: Vec::new(),
        };
        assert_eq!(round_trip(&ud), ud);
    }

    #[test]
    fn scalar_properties_round_trip() {
        let ud = UserData {
            text: None,
            color: None,
            properties: vec![ExtensionProperties {
                extension_id: 0,
                properties: vec![
                    ("null".into(), PropertyValue::Null),
                    ("flag".into(), PropertyValue::Bool(true)),
                    ("i8".into(), PropertyValue::Int8(-5)),
                    ("u8".into(), PropertyValue::Uint8(200)),
                    ("i16".into(), PropertyValue::Int16(-3000)),
                    ("u16".into(), PropertyValue::Uint16(60000)),
                    ("i32".into(), PropertyValue::Int32(-70000)),
                    ("u32".into(), PropertyValue::Uint32(4_000_000_000)),
                    ("i64".into(), PropertyValue::Int64(-(1 << 40))),
                    ("u64".into(), PropertyValue::Uint64(1 << 60)),
                    ("fixed".into(), PropertyValue::Fixed(1.5)),
                    ("float".into(), PropertyValue::Float(0.25)),
                    ("double".into(), PropertyValue::Double(-2.5)),
                    ("string".into(), PropertyValue::String("abc".into())),
                    ("point".into(), PropertyValue::Point(1, -2)),
                    ("size".into(), PropertyValue::Size(10, 20)),
                    ("rect".into(), PropertyValue::Rect(1, 2, 3, 4)),
                    (
                        "uuid".into(),
                        PropertyValue::Uuid(
                            Uuid::parse_str("0102030405060708090a0b0c0d0e0f10").unwrap(),
                        ),
                    ),
                ],
            }],
        };
        assert_eq!(round_trip(&ud), ud);
    }

    #[test]
    fn int8_is_excess_128_on_the_wire() {
        let ud = UserData {
            properties: vec![ExtensionProperties {
                extension_id: 0,
                properties: vec![("v".into(), PropertyValue::Int8(-128))],
            }],
            ..UserData::default()
        };
        let bytes = encode_user_data_chunk(&ud).unwrap();
        // flags(4) + block count(4) + ext id(4) + prop count(4)
        // + name(2+1) + tag(2) = 21 bytes before the value byte.
        assert_eq!(bytes[21], 0);
        assert_eq!(round_trip(&ud), ud);
    }

    #[test]
    fn homogeneous_vector_shares_its_tag() {
        let ud = UserData {
            properties: vec![ExtensionProperties {
                extension_id: 7,
                properties: vec![(
                    "v".into(),
                    PropertyValue::Vector(vec![
                        PropertyValue::Uint16(1),
                        PropertyValue::Uint16(2),
                        PropertyValue::Uint16(3),
                    ]),
                )],
            }],
            ..UserData::default()
        };
        let bytes = encode_user_data_chunk(&ud).unwrap();
        assert_eq!(round_trip(&ud), ud);
        // Heterogeneous vector is one byte per element bigger per tag.
        let hetero = UserData {
            properties: vec![ExtensionProperties {
                extension_id: 7,
                properties: vec![(
                    "v".into(),
                    PropertyValue::Vector(vec![
                        PropertyValue::Uint16(1),
                        PropertyValue::Uint32(2),
                        PropertyValue::Uint16(3),
                    ]),
                )],
            }],
            ..UserData::default()
        };
        let hetero_bytes = encode_user_data_chunk(&hetero).unwrap();
        assert_eq!(round_trip(&hetero), hetero);
        assert!(hetero_bytes.len() > bytes.len());
    }

    #[test]
    fn nested_properties_round_trip() {
        let ud = UserData {
            properties: vec![ExtensionProperties {
                extension_id: 0,
                properties: vec![(
                    "outer".into(),
                    PropertyValue::Properties(vec![
                        ("inner".into(), PropertyValue::Bool(false)),
                        (
                            "deep".into(),
                            PropertyValue::Properties(vec![(
                                "leaf".into(),
                                PropertyValue::Int32(9),
                            )]),
                        ),
                    ]),
                )],
            }],
            ..UserData::default()
        };
        assert_eq!(round_trip(&ud), ud);
    }

    #[test]
    fn unknown_type_tag_is_preserved_raw() {
        // Hand-build a chunk with an unknown tag 0x00FF followed by opaque
        // bytes.
        let mut w = AseWriter::new();
        w.dword(UserDataFlags::HAS_PROPERTIES.bits());
        w.dword(1); // one extension block
        w.dword(0); // extension id
        w.dword(2); // claims two properties
        w.string("weird").unwrap();
        w.word(0x00FF);
        w.bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let bytes = w.into_bytes();

        let mut reader = AseReader::new(&bytes);
        let ud = parse_user_data_chunk(&mut reader).unwrap();
        let (name, value) = &ud.properties[0].properties[0];
        assert_eq!(name, "weird");
        assert_eq!(
            value,
            &PropertyValue::Raw {
                type_code: 0x00FF,
                bytes: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }
        );

        // Re-encoding emits the raw bytes verbatim (the record count shrinks
        // to what was actually decoded).
        let encoded = encode_user_data_chunk(&ud).unwrap();
        assert!(encoded.ends_with(&[0xDE, 0xAD, 0xBE, 0xEF]));
    }

    #[test]
    fn raw_without_bytes_fails_to_encode() {
        let ud = UserData {
            properties: vec![ExtensionProperties {
                extension_id: 0,
                properties: vec![(
                    "v".into(),
                    PropertyValue::Raw {
                        type_code: 0x0100,
                        bytes: Vec::new(),
                    },
                )],
            }],
            ..UserData::default()
        };
        assert!(matches!(
            encode_user_data_chunk(&ud),
            Err(AseError::BadChunkSize { .. })
        ));
    }
}
