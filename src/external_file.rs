use crate::reader::AseReader;
use crate::writer::AseWriter;
use crate::Result;

/// A file referenced by name from this sprite (external palettes, tilesets
/// or extension property names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFile {
    pub id: u32,
    pub file_type: ExternalFileType,
    pub filename: String,
}

/// What an external file provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalFileType {
    Palette,
    Tileset,
    /// Extension name for properties.
    Properties,
    TileManagement,
    /// Unrecognized type byte, preserved for round trips.
    Unknown(u8),
}

impl ExternalFileType {
    fn from_code(code: u8) -> ExternalFileType {
        match code {
            0 => ExternalFileType::Palette,
            1 => ExternalFileType::Tileset,
            2 => ExternalFileType::Properties,
            3 => ExternalFileType::TileManagement,
            other => ExternalFileType::Unknown(other),
        }
    }

    fn code(self) -> u8 {
        match self {
            ExternalFileType::Palette => 0,
            ExternalFileType::Tileset => 1,
            ExternalFileType::Properties => 2,
            ExternalFileType::TileManagement => 3,
            ExternalFileType::Unknown(code) => code,
        }
    }
}

pub(crate) fn parse_external_files_chunk(reader: &mut AseReader<'_>) -> Result<Vec<ExternalFile>> {
    let count = reader.dword()?;
    reader.skip(8)?;
    let mut files = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id = reader.dword()?;
        let file_type = ExternalFileType::from_code(reader.byte()?);
        reader.skip(7)?;
        let filename = reader.string()?;
        files.push(ExternalFile {
            id,
            file_type,
            filename,
        });
    }
    Ok(files)
}

pub(crate) fn encode_external_files_chunk(files: &[ExternalFile]) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    w.dword(files.len() as u32);
    w.zeros(8);
    for file in files {
        w.dword(file.id);
        w.byte(file.file_type.code());
        w.zeros(7);
        w.string(&file.filename)?;
    }
    Ok(w.into_bytes())
}
