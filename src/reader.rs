use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

use crate::{AseError, Result};

/// A forward-moving little-endian cursor over a byte slice.
///
/// Every read is bounds-checked against the cursor's window and fails with
/// [`AseError::OutOfBounds`] carrying the offset and attempted length.
/// Offsets are always relative to the start of the original input, so
/// sub-readers created for chunk payloads report absolute positions.
pub(crate) struct AseReader<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> AseReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> AseReader<'a> {
        AseReader {
            data,
            pos: 0,
            end: data.len(),
        }
    }

    /// Current absolute offset.
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left in this reader's window.
    pub(crate) fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    /// Consume `len` bytes and return them as a borrowed slice.
    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.end - self.pos {
            return Err(AseError::OutOfBounds {
                offset: self.pos,
                len,
                end: self.end,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Consume `len` bytes and hand them out as a sub-reader. The parent
    /// advances past the window immediately, so a codec that under- or
    /// over-reads its chunk cannot disturb the frame position.
    pub(crate) fn sub_reader(&mut self, len: usize) -> Result<AseReader<'a>> {
        let start = self.pos;
        self.take(len)?;
        Ok(AseReader {
            data: self.data,
            pos: start,
            end: start + len,
        })
    }

    /// Move the cursor to an absolute offset within the window. Used for the
    /// defensive seeks to chunk and frame ends.
    pub(crate) fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.end {
            return Err(AseError::OutOfBounds {
                offset: pos,
                len: 0,
                end: self.end,
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        self.take(2).map(LittleEndian::read_i16)
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    pub(crate) fn long(&mut self) -> Result<i32> {
        self.take(4).map(LittleEndian::read_i32)
    }

    pub(crate) fn qword(&mut self) -> Result<u64> {
        self.take(8).map(LittleEndian::read_u64)
    }

    pub(crate) fn long64(&mut self) -> Result<i64> {
        self.take(8).map(LittleEndian::read_i64)
    }

    pub(crate) fn float(&mut self) -> Result<f32> {
        self.take(4).map(LittleEndian::read_f32)
    }

    pub(crate) fn double(&mut self) -> Result<f64> {
        self.take(8).map(LittleEndian::read_f64)
    }

    /// 16.16 fixed point: signed 32-bit divided by 65536.
    pub(crate) fn fixed(&mut self) -> Result<f64> {
        self.long().map(|raw| raw as f64 / 65536.0)
    }

    /// Length-prefixed UTF-8 string: u16 byte length, then that many bytes.
    pub(crate) fn string(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.word()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|source| AseError::InvalidString { offset, source })
    }

    /// 16 raw bytes presented in the canonical dashed form.
    pub(crate) fn uuid(&mut self) -> Result<Uuid> {
        let bytes = self.take(16)?;
        let mut raw = [0_u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes(raw))
    }

    /// Copy `len` bytes out of the input.
    pub(crate) fn take_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.take(len).map(<[u8]>::to_vec)
    }

    /// Copy everything up to the end of the window. Used for payloads that
    /// are bounded by the chunk end rather than by a declared length.
    pub(crate) fn take_rest(&mut self) -> Vec<u8> {
        let rest = self.data[self.pos..self.end].to_vec();
        self.pos = self.end;
        rest
    }

    /// The unread remainder, without consuming it.
    pub(crate) fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.pos..self.end]
    }
}
