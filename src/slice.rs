use bitflags::bitflags;

use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::writer::AseWriter;
use crate::Result;

bitflags! {
    /// Which optional fields every key of the slice carries.
    pub struct SliceFlags: u32 {
        const NINE_PATCH = 0x0001;
        const PIVOT = 0x0002;
    }
}

/// A named region of the sprite, animated as a step function over frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub name: String,
    pub flags: SliceFlags,
    /// Keys sorted by `from_frame` ascending.
    pub keys: Vec<SliceKey>,
    pub user_data: Option<UserData>,
}

/// One keyframe of a slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceKey {
    /// The key applies from this frame until the next key.
    pub from_frame: u32,
    pub origin: (i32, i32),
    pub size: (u32, u32),
    /// 9-patch center rectangle, relative to the slice origin.
    pub slice9: Option<(i32, i32, u32, u32)>,
    pub pivot: Option<(i32, i32)>,
}

impl Slice {
    /// The key in effect at `frame`: the one with the greatest `from_frame`
    /// not past it. A key established at frame `k` applies to every later
    /// frame until another key is set.
    pub fn key_for_frame(&self, frame: u32) -> Option<&SliceKey> {
        self.key_index_for_frame(frame).map(|i| &self.keys[i])
    }

    /// Index form of [`key_for_frame`](Slice::key_for_frame).
    pub fn key_index_for_frame(&self, frame: u32) -> Option<usize> {
        self.keys.iter().rposition(|k| k.from_frame <= frame)
    }
}

pub(crate) fn parse_slice_chunk(reader: &mut AseReader<'_>) -> Result<Slice> {
    let key_count = reader.dword()?;
    let flags = SliceFlags {
        bits: reader.dword()?,
    };
    reader.skip(4)?;
    let name = reader.string()?;
    let mut keys = Vec::with_capacity(key_count as usize);
    for _ in 0..key_count {
        let from_frame = reader.dword()?;
        let origin = (reader.long()?, reader.long()?);
        let size = (reader.dword()?, reader.dword()?);
        let slice9 = if flags.contains(SliceFlags::NINE_PATCH) {
            Some((
                reader.long()?,
                reader.long()?,
                reader.dword()?,
                reader.dword()?,
            ))
        } else {
            None
        };
        let pivot = if flags.contains(SliceFlags::PIVOT) {
            Some((reader.long()?, reader.long()?))
        } else {
            None
        };
        keys.push(SliceKey {
            from_frame,
            origin,
            size,
            slice9,
            pivot,
        });
    }
    Ok(Slice {
        name,
        flags,
        keys,
        user_data: None,
    })
}

pub(crate) fn encode_slice_chunk(slice: &Slice) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    w.dword(slice.keys.len() as u32);
    w.dword(slice.flags.bits());
    w.zeros(4);
    w.string(&slice.name)?;
    for key in &slice.keys {
        w.dword(key.from_frame);
        w.long(key.origin.0);
        w.long(key.origin.1);
        w.dword(key.size.0);
        w.dword(key.size.1);
        if slice.flags.contains(SliceFlags::NINE_PATCH) {
            let (x, y, width, height) = key.slice9.unwrap_or((0, 0, 0, 0));
            w.long(x);
            w.long(y);
            w.dword(width);
            w.dword(height);
        }
        if slice.flags.contains(SliceFlags::PIVOT) {
            let (x, y) = key.pivot.unwrap_or((0, 0));
            w.long(x);
            w.long(y);
        }
    }
    Ok(w.into_bytes())
}
