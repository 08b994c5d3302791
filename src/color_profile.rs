use crate::reader::AseReader;
use crate::writer::AseWriter;
use crate::{AseError, Result};

/// The color space the sprite's pixel values live in.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorProfile {
    pub profile_type: ColorProfileType,
    pub flags: u16,
    /// Fixed gamma, present when flag bit 0 is set.
    pub fixed_gamma: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorProfileType {
    /// No profile; treat pixels as-is.
    None,
    Srgb,
    /// An embedded ICC profile blob, preserved verbatim.
    EmbeddedIcc(Vec<u8>),
}

pub(crate) fn parse_color_profile_chunk(reader: &mut AseReader<'_>) -> Result<ColorProfile> {
    let type_code = reader.word()?;
    let flags = reader.word()?;
    let gamma = reader.fixed()?;
    reader.skip(8)?;
    let profile_type = match type_code {
        0x0000 => ColorProfileType::None,
        0x0001 => ColorProfileType::Srgb,
        0x0002 => {
            let length = reader.dword()? as usize;
            ColorProfileType::EmbeddedIcc(reader.take_bytes(length)?)
        }
        other => {
            return Err(AseError::BadChunkSize {
                message: format!("unknown color profile type: {}", other),
            })
        }
    };
    let fixed_gamma = if flags & 1 != 0 { Some(gamma) } else { None };
    Ok(ColorProfile {
        profile_type,
        flags,
        fixed_gamma,
    })
}

pub(crate) fn encode_color_profile_chunk(profile: &ColorProfile) -> Vec<u8> {
    let mut w = AseWriter::new();
    let type_code = match profile.profile_type {
        ColorProfileType::None => 0x0000,
        ColorProfileType::Srgb => 0x0001,
        ColorProfileType::EmbeddedIcc(_) => 0x0002,
    };
    w.word(type_code);
    let mut flags = profile.flags;
    if profile.fixed_gamma.is_some() {
        flags |= 1;
    } else {
        flags &= !1;
    }
    w.word(flags);
    w.fixed(profile.fixed_gamma.unwrap_or(0.0));
    w.zeros(8);
    if let ColorProfileType::EmbeddedIcc(ref blob) = profile.profile_type {
        w.dword(blob.len() as u32);
        w.bytes(blob);
    }
    w.into_bytes()
}
