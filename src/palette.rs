use crate::reader::AseReader;
use crate::writer::AseWriter;
use crate::{AseError, Result};

/// The sprite palette, unified from modern (0x2019) and legacy (0x0004 /
/// 0x0011) chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// The chunk's declared total palette size.
    pub declared_size: u32,
    /// Index of the first entry; the last index is
    /// `first_index + entries.len() - 1`.
    pub first_index: u32,
    pub entries: Vec<PaletteEntry>,
}

/// One palette color.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaletteEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
    pub name: Option<String>,
}

impl Palette {
    pub fn last_index(&self) -> u32 {
        self.first_index + self.entries.len().saturating_sub(1) as u32
    }

    /// Entry by absolute palette index.
    pub fn entry(&self, index: u32) -> Option<&PaletteEntry> {
        index
            .checked_sub(self.first_index)
            .and_then(|i| self.entries.get(i as usize))
    }

    /// Merge another palette chunk into this one: its `[first, last]` range
    /// overwrites ours, growing the entry table as needed.
    pub(crate) fn merge(&mut self, other: Palette) {
        if other.first_index < self.first_index {
            let pad = (self.first_index - other.first_index) as usize;
            let mut entries = vec![PaletteEntry::default(); pad];
            entries.append(&mut self.entries);
            self.entries = entries;
            self.first_index = other.first_index;
        }
        let offset = (other.first_index - self.first_index) as usize;
        let needed = offset + other.entries.len();
        if self.entries.len() < needed {
            self.entries.resize(needed, PaletteEntry::default());
        }
        for (i, entry) in other.entries.into_iter().enumerate() {
            self.entries[offset + i] = entry;
        }
        self.declared_size = self.declared_size.max(other.declared_size);
    }
}

pub(crate) fn parse_palette_chunk(reader: &mut AseReader<'_>) -> Result<Palette> {
    let declared_size = reader.dword()?;
    let first_index = reader.dword()?;
    let last_index = reader.dword()?;
    reader.skip(8)?;
    if last_index < first_index {
        return Err(AseError::BadChunkSize {
            message: format!(
                "palette indices out of order: first={} last={}",
                first_index, last_index
            ),
        });
    }
    let count = last_index - first_index + 1;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let flags = reader.word()?;
        let red = reader.byte()?;
        let green = reader.byte()?;
        let blue = reader.byte()?;
        let alpha = reader.byte()?;
        let name = if flags & 1 != 0 {
            Some(reader.string()?)
        } else {
            None
        };
        entries.push(PaletteEntry {
            red,
            green,
            blue,
            alpha,
            name,
        });
    }
    Ok(Palette {
        declared_size,
        first_index,
        entries,
    })
}

pub(crate) fn encode_palette_chunk(palette: &Palette) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    w.dword(palette.declared_size.max(palette.entries.len() as u32));
    w.dword(palette.first_index);
    w.dword(palette.last_index());
    w.zeros(8);
    for entry in &palette.entries {
        w.word(entry.name.is_some() as u16);
        w.byte(entry.red);
        w.byte(entry.green);
        w.byte(entry.blue);
        w.byte(entry.alpha);
        if let Some(ref name) = entry.name {
            w.string(name)?;
        }
    }
    Ok(w.into_bytes())
}

/// One packet of a legacy palette chunk: skip some write positions, then a
/// run of RGB colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OldPalettePacket {
    pub skip: u8,
    pub colors: Vec<[u8; 3]>,
}

/// Both legacy chunk types (0x0004 and 0x0011) share this shape; the 4-bit
/// vs 6-bit distinction does not matter here.
pub(crate) fn parse_old_palette_chunk(reader: &mut AseReader<'_>) -> Result<Vec<OldPalettePacket>> {
    let packet_count = reader.word()?;
    let mut packets = Vec::with_capacity(packet_count as usize);
    for _ in 0..packet_count {
        let skip = reader.byte()?;
        let declared = reader.byte()?;
        // A zero count means 256 colors.
        let count = if declared == 0 { 256 } else { declared as usize };
        let mut colors = Vec::with_capacity(count);
        for _ in 0..count {
            colors.push([reader.byte()?, reader.byte()?, reader.byte()?]);
        }
        packets.push(OldPalettePacket { skip, colors });
    }
    Ok(packets)
}

/// Emit a palette as a single legacy packet run (first 256 entries).
pub(crate) fn encode_old_palette_chunk(palette: &Palette) -> Vec<u8> {
    let mut w = AseWriter::new();
    let entries = &palette.entries[..palette.entries.len().min(256)];
    if entries.is_empty() {
        // A zero count byte would mean 256 colors; emit no packets instead.
        w.word(0);
        return w.into_bytes();
    }
    w.word(1);
    w.byte(0); // no skipped positions
    w.byte(if entries.len() == 256 {
        0
    } else {
        entries.len() as u8
    });
    for entry in entries {
        w.byte(entry.red);
        w.byte(entry.green);
        w.byte(entry.blue);
    }
    w.into_bytes()
}

/// Replay legacy palette packets into a modern palette. Every emitted entry
/// is fully opaque.
pub(crate) fn synthesize_palette(packet_runs: &[Vec<OldPalettePacket>]) -> Palette {
    let mut colors: Vec<PaletteEntry> = Vec::new();
    for packets in packet_runs {
        let mut index = 0_usize;
        for packet in packets {
            index += packet.skip as usize;
            for rgb in &packet.colors {
                if colors.len() <= index {
                    colors.resize(index + 1, PaletteEntry::default());
                }
                colors[index] = PaletteEntry {
                    red: rgb[0],
                    green: rgb[1],
                    blue: rgb[2],
                    alpha: 255,
                    name: None,
                };
                index += 1;
            }
        }
    }
    Palette {
        declared_size: colors.len() as u32,
        first_index: 0,
        entries: colors,
    }
}
