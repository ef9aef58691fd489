//! Byte source contract and the in-memory stream.

use crate::error::Result;
use crate::model::objects::{Dict, latin1_string};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

/// A raw byte range underneath a chain of decoding streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
    /// Whether every byte of the range is available.
    pub loaded: bool,
}

/// Forward-reading, pull-based byte source.
///
/// `get_byte` returns `Ok(None)` at end of data. Every read may fail with
/// `PdfError::MissingData` when the source is backed by a partially
/// downloaded file, or with a decode error when a filter rejects its input.
pub trait BaseStream {
    /// Total length of the stream.
    ///
    /// # Panics
    /// Streams whose length is only known after decoding do not implement
    /// this and panic.
    fn length(&self) -> usize {
        unreachable!("stream length is not known before decoding")
    }

    /// Rough size of the encoded data, used to size downstream buffers.
    fn length_hint(&self) -> Option<usize> {
        None
    }

    /// True when no byte can be read.
    fn is_empty(&mut self) -> Result<bool>;

    fn is_data_loaded(&self) -> bool {
        true
    }

    fn pos(&self) -> usize;

    fn set_pos(&mut self, pos: usize);

    fn get_byte(&mut self) -> Result<Option<u8>>;

    /// Read up to `length` bytes, or everything when `None`.
    ///
    /// Fewer bytes than requested are returned only at end of data.
    fn get_bytes(&mut self, length: Option<usize>) -> Result<Vec<u8>>;

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.get_byte()?;
        if byte.is_some() {
            self.set_pos(self.pos() - 1);
        }
        Ok(byte)
    }

    fn peek_bytes(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        let bytes = self.get_bytes(length)?;
        self.set_pos(self.pos() - bytes.len());
        Ok(bytes)
    }

    /// Big-endian u16, `None` on a short read.
    fn get_uint16(&mut self) -> Result<Option<u16>> {
        let bytes = self.get_bytes(Some(2))?;
        if bytes.len() < 2 {
            return Ok(None);
        }
        Ok(Some(BigEndian::read_u16(&bytes)))
    }

    /// Big-endian i32, `None` on a short read.
    fn get_int32(&mut self) -> Result<Option<i32>> {
        let bytes = self.get_bytes(Some(4))?;
        if bytes.len() < 4 {
            return Ok(None);
        }
        Ok(Some(BigEndian::read_i32(&bytes)))
    }

    /// Bytes as a byte-string: one char per byte, no text decoding.
    fn get_string(&mut self, length: Option<usize>) -> Result<String> {
        Ok(latin1_string(&self.get_bytes(length)?))
    }

    /// Move the cursor by `n` bytes; negative values move backwards.
    fn skip(&mut self, n: isize) {
        let pos = self.pos().saturating_add_signed(n);
        self.set_pos(pos);
    }

    /// Rewind to the first byte.
    fn reset(&mut self);

    /// Make the current position the new start of the stream.
    ///
    /// # Panics
    /// Only in-memory streams support this.
    fn move_start(&mut self) {
        unreachable!("move_start is only supported by in-memory streams")
    }

    /// Independent view of `start..start + length` (or `start..`).
    ///
    /// Decoding streams buffer up to the end of the view first.
    fn make_sub_stream(
        &mut self,
        start: usize,
        length: Option<usize>,
        dict: Option<Dict>,
    ) -> Result<Box<dyn BaseStream>>;

    /// Random access read of `begin..end`, clamped to the stream bounds.
    ///
    /// # Panics
    /// Streams without random access panic.
    fn get_byte_range(&mut self, _begin: usize, _end: usize) -> Result<Vec<u8>> {
        unreachable!("random access is not supported by this stream")
    }

    /// The raw sources underneath this stream, if any are range-backed.
    fn get_base_streams(&self) -> Option<Vec<SourceRange>> {
        None
    }

    fn dict(&self) -> Option<&Dict>;

    fn set_dict(&mut self, dict: Option<Dict>);
}

/// Stream over bytes held in memory.
///
/// Positions are absolute offsets into the shared buffer, so sub-streams
/// of the same file agree on offsets.
#[derive(Clone)]
pub struct Stream {
    bytes: Bytes,
    start: usize,
    pos: usize,
    end: usize,
    dict: Option<Dict>,
}

impl Stream {
    pub fn new(
        bytes: impl Into<Bytes>,
        start: usize,
        length: Option<usize>,
        dict: Option<Dict>,
    ) -> Self {
        let bytes = bytes.into();
        let start = start.min(bytes.len());
        let end = match length {
            Some(length) => start.saturating_add(length).min(bytes.len()),
            None => bytes.len(),
        };
        Self {
            bytes,
            start,
            pos: start,
            end,
            dict,
        }
    }

    /// Stream over the whole buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, 0, None, None)
    }

    /// Empty stream, the stand-in for unreadable data.
    pub fn null() -> Self {
        Self::new(Bytes::new(), 0, None, None)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }
}

impl BaseStream for Stream {
    fn length(&self) -> usize {
        self.end - self.start
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.length())
    }

    fn is_empty(&mut self) -> Result<bool> {
        Ok(self.length() == 0)
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn get_byte(&mut self) -> Result<Option<u8>> {
        if self.pos >= self.end {
            return Ok(None);
        }
        let byte = self.bytes[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn get_bytes(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        let pos = self.pos.min(self.end);
        let end = match length {
            Some(length) => pos.saturating_add(length).min(self.end),
            None => self.end,
        };
        self.pos = end;
        Ok(self.bytes[pos..end].to_vec())
    }

    fn reset(&mut self) {
        self.pos = self.start;
    }

    fn move_start(&mut self) {
        self.start = self.pos;
    }

    fn make_sub_stream(
        &mut self,
        start: usize,
        length: Option<usize>,
        dict: Option<Dict>,
    ) -> Result<Box<dyn BaseStream>> {
        Ok(Box::new(Self::new(self.bytes.clone(), start, length, dict)))
    }

    fn get_byte_range(&mut self, begin: usize, end: usize) -> Result<Vec<u8>> {
        let end = end.min(self.end);
        let begin = begin.min(end);
        Ok(self.bytes[begin..end].to_vec())
    }

    fn dict(&self) -> Option<&Dict> {
        self.dict.as_ref()
    }

    fn set_dict(&mut self, dict: Option<Dict>) {
        self.dict = dict;
    }
}
