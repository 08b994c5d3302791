use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::writer::AseWriter;
use crate::{AseError, Result};

/// A tag groups a run of frames for playback.
///
/// Ranges may overlap and names are not guaranteed unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    /// First frame included in the tag.
    pub from_frame: u16,
    /// Last frame included in the tag.
    pub to_frame: u16,
    pub direction: AnimationDirection,
    /// Number of times the range plays; 0 means forever.
    pub repeat: u16,
    /// Legacy tag color (RGB).
    pub color: [u8; 3],
    pub user_data: Option<UserData>,
}

/// How a tag's frames are ordered during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationDirection {
    /// `from, from+1, ..., to`.
    Forward,
    /// `to, to-1, ..., from`.
    Reverse,
    /// Forward, then back down with both endpoints played once per cycle.
    PingPong,
    /// Reverse, then back up with both endpoints played once per cycle.
    PingPongReverse,
}

impl AnimationDirection {
    fn from_code(code: u8) -> Result<AnimationDirection> {
        match code {
            0 => Ok(AnimationDirection::Forward),
            1 => Ok(AnimationDirection::Reverse),
            2 => Ok(AnimationDirection::PingPong),
            3 => Ok(AnimationDirection::PingPongReverse),
            other => Err(AseError::BadChunkSize {
                message: format!("unknown animation direction: {}", other),
            }),
        }
    }

    fn code(self) -> u8 {
        match self {
            AnimationDirection::Forward => 0,
            AnimationDirection::Reverse => 1,
            AnimationDirection::PingPong => 2,
            AnimationDirection::PingPongReverse => 3,
        }
    }
}

/// How often a playback sequence repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Loop forever (wire value 0).
    Infinite,
    /// Play the sequence this many times.
    Times(u16),
}

/// One resolved playback cycle of a tag, plus its repeat policy. The repeat
/// is metadata; the frame list holds a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    pub frames: Vec<u16>,
    pub repeat: Repeat,
}

impl Tag {
    /// Resolve the tag to the ordered frame indices of one playback cycle.
    ///
    /// Ping-pong directions exclude the endpoint that would play twice at
    /// the turn, so a `0..=2` ping-pong yields `0,1,2,1`.
    pub fn playback(&self) -> Playback {
        let (from, to) = (self.from_frame, self.to_frame);
        let mut frames: Vec<u16> = Vec::new();
        if from <= to {
            match self.direction {
                AnimationDirection::Forward => frames.extend(from..=to),
                AnimationDirection::Reverse => frames.extend((from..=to).rev()),
                AnimationDirection::PingPong => {
                    frames.extend(from..=to);
                    frames.extend((from + 1..to).rev());
                }
                AnimationDirection::PingPongReverse => {
                    frames.extend((from..=to).rev());
                    frames.extend(from + 1..to);
                }
            }
        }
        Playback {
            frames,
            repeat: match self.repeat {
                0 => Repeat::Infinite,
                n => Repeat::Times(n),
            },
        }
    }
}

pub(crate) fn parse_tags_chunk(reader: &mut AseReader<'_>) -> Result<Vec<Tag>> {
    let count = reader.word()?;
    reader.skip(8)?;
    let mut tags = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let from_frame = reader.word()?;
        let to_frame = reader.word()?;
        let direction = AnimationDirection::from_code(reader.byte()?)?;
        let repeat = reader.word()?;
        reader.skip(6)?;
        let mut color = [0_u8; 3];
        for c in color.iter_mut() {
            *c = reader.byte()?;
        }
        reader.skip(1)?;
        let name = reader.string()?;
        tags.push(Tag {
            name,
            from_frame,
            to_frame,
            direction,
            repeat,
            color,
            user_data: None,
        });
    }
    Ok(tags)
}

pub(crate) fn encode_tags_chunk(tags: &[Tag]) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    w.word(tags.len() as u16);
    w.zeros(8);
    for tag in tags {
        w.word(tag.from_frame);
        w.word(tag.to_frame);
        w.byte(tag.direction.code());
        w.word(tag.repeat);
        w.zeros(6);
        w.bytes(&tag.color);
        w.zeros(1);
        w.string(&tag.name)?;
    }
    Ok(w.into_bytes())
}
