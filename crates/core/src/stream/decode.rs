//! Lazy, pull-driven decoding streams.
//!
//! A `DecodeStream` owns a growable output buffer and asks its
//! `BlockDecoder` for more bytes only when a reader needs them. Filters
//! implement `BlockDecoder::read_block`, which appends decoded bytes to the
//! buffer and flags end of data.

use super::base::{BaseStream, SourceRange, Stream};
use crate::error::{PdfError, Result};
use crate::model::objects::Dict;
use bytes::Bytes;
use std::collections::VecDeque;

/// Smallest buffer a decoding stream allocates.
pub const MIN_BUFFER_LENGTH: usize = 512;

/// Output buffer shared between a `DecodeStream` and its decoder.
///
/// Capacity is zero or a power of two no smaller than the minimum buffer
/// length. Growth copies the filled prefix into a fresh allocation.
#[derive(Debug)]
pub struct DecodeBuffer {
    buffer: Vec<u8>,
    length: usize,
    eof: bool,
    min_buffer_length: usize,
}

impl DecodeBuffer {
    /// `maybe_min_buffer_length` is rounded up to a power of two.
    pub fn new(maybe_min_buffer_length: Option<usize>) -> Self {
        let min_buffer_length = maybe_min_buffer_length
            .and_then(|hint| hint.max(MIN_BUFFER_LENGTH).checked_next_power_of_two())
            .unwrap_or(MIN_BUFFER_LENGTH);
        Self {
            buffer: Vec::new(),
            length: 0,
            eof: false,
            min_buffer_length,
        }
    }

    /// Grow the buffer so that at least `requested` bytes fit.
    pub fn ensure_buffer(&mut self, requested: usize) -> &mut [u8] {
        if requested > self.buffer.len() {
            let size = requested
                .max(self.min_buffer_length)
                .checked_next_power_of_two()
                .unwrap_or(requested);
            let mut grown = vec![0u8; size];
            grown[..self.length].copy_from_slice(&self.buffer[..self.length]);
            self.buffer = grown;
        }
        &mut self.buffer
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn min_buffer_length(&self) -> usize {
        self.min_buffer_length
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn set_eof(&mut self) {
        self.eof = true;
    }

    /// Decoded bytes so far.
    pub fn filled(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    /// Writable space of at least `additional` bytes after the filled part.
    ///
    /// Bytes written there become visible after `commit`.
    pub fn writable(&mut self, additional: usize) -> &mut [u8] {
        let length = self.length;
        self.ensure_buffer(length + additional);
        &mut self.buffer[length..]
    }

    /// Mark `n` bytes of the writable space as filled.
    ///
    /// # Panics
    /// Panics if this would exceed the capacity.
    pub fn commit(&mut self, n: usize) {
        assert!(self.length + n <= self.buffer.len(), "commit past capacity");
        self.length += n;
    }

    pub fn push(&mut self, byte: u8) {
        self.writable(1)[0] = byte;
        self.length += 1;
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.writable(data.len())[..data.len()].copy_from_slice(data);
        self.length += data.len();
    }

    /// Append `count` copies of `byte`.
    pub fn extend_repeated(&mut self, byte: u8, count: usize) {
        self.writable(count)[..count].fill(byte);
        self.length += count;
    }
}

/// One decoding step of a filter.
pub trait BlockDecoder {
    /// Append the next block of decoded bytes to `out`, or set eof.
    ///
    /// Implementations must either produce bytes or set eof; a call that does
    /// neither is retried.
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()>;

    /// The raw sources feeding this decoder.
    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        None
    }
}

/// Lifecycle of a decoding stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    NotStarted,
    Filling,
    Eof,
}

/// Result of a single `read_block` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Produced(usize),
    Eof,
}

/// Byte source whose bytes are produced on demand by a `BlockDecoder`.
pub struct DecodeStream<D> {
    decoder: D,
    out: DecodeBuffer,
    pos: usize,
    state: DecodeState,
    raw_min_buffer_length: usize,
    dict: Option<Dict>,
}

impl<D: BlockDecoder> DecodeStream<D> {
    pub fn new(decoder: D, maybe_min_buffer_length: Option<usize>) -> Self {
        Self {
            decoder,
            out: DecodeBuffer::new(maybe_min_buffer_length),
            pos: 0,
            state: DecodeState::NotStarted,
            raw_min_buffer_length: maybe_min_buffer_length.unwrap_or(0),
            dict: None,
        }
    }

    pub fn with_dict(mut self, dict: Option<Dict>) -> Self {
        self.dict = dict;
        self
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Bytes decoded so far.
    pub fn buffered(&self) -> &[u8] {
        self.out.filled()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.out.capacity()
    }

    pub fn ensure_buffer(&mut self, requested: usize) {
        self.out.ensure_buffer(requested);
    }

    /// Run one decoding step.
    ///
    /// A decoder error ends the stream; bytes decoded before the error stay
    /// readable.
    pub fn read_block(&mut self) -> Result<ReadStatus> {
        if self.out.is_eof() {
            self.state = DecodeState::Eof;
            return Ok(ReadStatus::Eof);
        }
        self.state = DecodeState::Filling;
        let before = self.out.len();
        if let Err(err) = self.decoder.read_block(&mut self.out) {
            if !err.is_missing_data() {
                self.out.set_eof();
                self.state = DecodeState::Eof;
            }
            return Err(err);
        }
        let produced = self.out.len() - before;
        if self.out.is_eof() {
            self.state = DecodeState::Eof;
            if produced == 0 {
                return Ok(ReadStatus::Eof);
            }
        }
        Ok(ReadStatus::Produced(produced))
    }

    /// Decode until `end` bytes are buffered or the data ends. The buffer
    /// grows with the decoded blocks, not with `end`.
    fn fill_to(&mut self, end: usize) -> Result<()> {
        while !self.out.is_eof() && self.out.len() < end {
            self.read_block()?;
        }
        Ok(())
    }

    fn fill_all(&mut self) -> Result<()> {
        while !self.out.is_eof() {
            self.read_block()?;
        }
        Ok(())
    }
}

impl<D: BlockDecoder> BaseStream for DecodeStream<D> {
    fn length_hint(&self) -> Option<usize> {
        Some(self.raw_min_buffer_length)
    }

    fn is_empty(&mut self) -> Result<bool> {
        while !self.out.is_eof() && self.out.is_empty() {
            self.read_block()?;
        }
        Ok(self.out.is_empty())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn get_byte(&mut self) -> Result<Option<u8>> {
        while self.out.len() <= self.pos {
            if self.out.is_eof() {
                return Ok(None);
            }
            self.read_block()?;
        }
        let byte = self.out.filled()[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn get_bytes(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        let pos = self.pos;
        let end = match length {
            Some(length) => {
                let end = pos.saturating_add(length);
                self.fill_to(end)?;
                end.min(self.out.len())
            }
            None => {
                self.fill_all()?;
                self.out.len()
            }
        };
        let pos = pos.min(end);
        self.pos = end;
        Ok(self.out.filled()[pos..end].to_vec())
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn make_sub_stream(
        &mut self,
        start: usize,
        length: Option<usize>,
        dict: Option<Dict>,
    ) -> Result<Box<dyn BaseStream>> {
        match length {
            Some(length) => self.fill_to(start.saturating_add(length))?,
            None => self.fill_all()?,
        }
        let bytes = Bytes::copy_from_slice(self.out.filled());
        Ok(Box::new(Stream::new(bytes, start, length, dict)))
    }

    fn get_base_streams(&self) -> Option<Vec<SourceRange>> {
        self.decoder.base_streams()
    }

    fn dict(&self) -> Option<&Dict> {
        self.dict.as_ref()
    }

    fn set_dict(&mut self, dict: Option<Dict>) {
        self.dict = dict;
    }
}

/// Callback for a member of a stream sequence that failed to read.
pub type SequenceErrorHook = Box<dyn FnMut(&PdfError)>;

/// Decoder that concatenates a queue of streams.
pub struct SequenceDecoder {
    streams: VecDeque<Box<dyn BaseStream>>,
    on_error: Option<SequenceErrorHook>,
}

impl BlockDecoder for SequenceDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        let Some(mut stream) = self.streams.pop_front() else {
            out.set_eof();
            return Ok(());
        };
        match stream.get_bytes(None) {
            Ok(chunk) => {
                out.extend_from_slice(&chunk);
                Ok(())
            }
            Err(err) if err.is_missing_data() => {
                // retried once the data arrives
                self.streams.push_front(stream);
                Err(err)
            }
            Err(err) => match &mut self.on_error {
                Some(on_error) => {
                    on_error(&err);
                    Ok(())
                }
                None => Err(err),
            },
        }
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        let ranges: Vec<SourceRange> = self
            .streams
            .iter()
            .filter_map(|stream| stream.get_base_streams())
            .flatten()
            .collect();
        (!ranges.is_empty()).then_some(ranges)
    }
}

/// Concatenation of several streams, e.g. the parts of a page's `/Contents`.
pub type StreamsSequenceStream = DecodeStream<SequenceDecoder>;

impl DecodeStream<SequenceDecoder> {
    /// Sequence over `streams`; a failing member goes to `on_error` when
    /// given, otherwise the error is returned to the reader.
    pub fn sequence(
        streams: Vec<Box<dyn BaseStream>>,
        on_error: Option<SequenceErrorHook>,
    ) -> Self {
        let maybe_length = streams
            .iter()
            .map(|stream| stream.length_hint().unwrap_or(0))
            .sum();
        Self::new(
            SequenceDecoder {
                streams: streams.into(),
                on_error,
            },
            Some(maybe_length),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Stream;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Emits `blocks` chunks of `0..size` and then stops.
    struct Counting {
        blocks: usize,
        size: usize,
        calls: Rc<RefCell<usize>>,
    }

    impl BlockDecoder for Counting {
        fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
            *self.calls.borrow_mut() += 1;
            if self.blocks == 0 {
                out.set_eof();
                return Ok(());
            }
            self.blocks -= 1;
            let block: Vec<u8> = (0..self.size).map(|b| b as u8).collect();
            out.extend_from_slice(&block);
            Ok(())
        }
    }

    #[test]
    fn buffer_growth_is_power_of_two_and_preserves_prefix() {
        let mut buffer = DecodeBuffer::new(None);
        buffer.extend_from_slice(b"keep");
        for requested in [1, 511, 512, 513, 1000, 5000, 70000] {
            buffer.ensure_buffer(requested);
            assert!(buffer.capacity().is_power_of_two());
            assert!(buffer.capacity() >= requested);
            assert_eq!(buffer.filled(), b"keep");
        }
    }

    #[test]
    fn min_buffer_hint_rounds_up() {
        assert_eq!(DecodeBuffer::new(Some(100)).min_buffer_length(), 512);
        assert_eq!(DecodeBuffer::new(Some(513)).min_buffer_length(), 1024);
        assert_eq!(DecodeBuffer::new(Some(4096)).min_buffer_length(), 4096);
    }

    #[test]
    fn reads_only_as_many_blocks_as_needed() {
        let calls = Rc::new(RefCell::new(0));
        let decoder = Counting {
            blocks: 10,
            size: 100,
            calls: Rc::clone(&calls),
        };
        let mut stream = DecodeStream::new(decoder, None);
        assert_eq!(stream.state(), DecodeState::NotStarted);
        assert_eq!(stream.get_bytes(Some(150)).unwrap().len(), 150);
        assert_eq!(*calls.borrow(), 2);
        assert_eq!(stream.state(), DecodeState::Filling);
        assert_eq!(stream.get_bytes(None).unwrap().len(), 850);
        assert_eq!(stream.state(), DecodeState::Eof);
        assert_eq!(stream.get_byte().unwrap(), None);
    }

    #[test]
    fn unbounded_requests_stop_at_end_of_data() {
        let decoder = Counting {
            blocks: 3,
            size: 100,
            calls: Rc::default(),
        };
        let mut stream = DecodeStream::new(decoder, None);
        assert_eq!(stream.get_bytes(Some(10)).unwrap().len(), 10);
        assert_eq!(stream.get_bytes(Some(usize::MAX)).unwrap().len(), 290);
        assert!(stream.buffer_capacity() <= 512);
        assert!(stream.get_bytes(Some(usize::MAX)).unwrap().is_empty());
    }

    #[test]
    fn huge_buffer_hint_falls_back_to_the_minimum() {
        assert_eq!(
            DecodeBuffer::new(Some(usize::MAX)).min_buffer_length(),
            MIN_BUFFER_LENGTH
        );
    }

    #[test]
    fn is_empty_forces_a_read() {
        let calls = Rc::new(RefCell::new(0));
        let decoder = Counting {
            blocks: 0,
            size: 1,
            calls: Rc::clone(&calls),
        };
        let mut stream = DecodeStream::new(decoder, None);
        assert!(stream.is_empty().unwrap());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn sub_stream_is_a_view_over_decoded_bytes() {
        let decoder = Counting {
            blocks: 3,
            size: 10,
            calls: Rc::default(),
        };
        let mut stream = DecodeStream::new(decoder, None);
        let mut sub = stream.make_sub_stream(5, Some(10), None).unwrap();
        assert_eq!(sub.get_bytes(None).unwrap(), [5, 6, 7, 8, 9, 0, 1, 2, 3, 4]);
        assert_eq!(stream.buffered().len(), 20);
    }

    #[test]
    fn sequence_concatenates_members() {
        let parts: Vec<Box<dyn BaseStream>> = vec![
            Box::new(Stream::from_bytes(&b"q 1 0 0 1 0 0 cm "[..])),
            Box::new(Stream::null()),
            Box::new(Stream::from_bytes(&b"Q"[..])),
        ];
        let mut seq = StreamsSequenceStream::sequence(parts, None);
        assert_eq!(seq.get_bytes(None).unwrap(), b"q 1 0 0 1 0 0 cm Q");
    }

    struct Failing;

    impl BaseStream for Failing {
        fn is_empty(&mut self) -> Result<bool> {
            Ok(false)
        }
        fn pos(&self) -> usize {
            0
        }
        fn set_pos(&mut self, _pos: usize) {}
        fn get_byte(&mut self) -> Result<Option<u8>> {
            Err(PdfError::DecodeError("corrupt".into()))
        }
        fn get_bytes(&mut self, _length: Option<usize>) -> Result<Vec<u8>> {
            Err(PdfError::DecodeError("corrupt".into()))
        }
        fn reset(&mut self) {}
        fn make_sub_stream(
            &mut self,
            _start: usize,
            _length: Option<usize>,
            _dict: Option<Dict>,
        ) -> Result<Box<dyn BaseStream>> {
            Ok(Box::new(Stream::null()))
        }
        fn dict(&self) -> Option<&Dict> {
            None
        }
        fn set_dict(&mut self, _dict: Option<Dict>) {}
    }

    #[test]
    fn sequence_error_hook_skips_broken_member() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let parts: Vec<Box<dyn BaseStream>> = vec![
            Box::new(Stream::from_bytes(&b"BT "[..])),
            Box::new(Failing),
            Box::new(Stream::from_bytes(&b"ET"[..])),
        ];
        let hook: SequenceErrorHook = Box::new(move |err: &PdfError| sink.borrow_mut().push(err.to_string()));
        let mut seq = StreamsSequenceStream::sequence(parts, Some(hook));
        assert_eq!(seq.get_bytes(None).unwrap(), b"BT ET");
        assert_eq!(seen.borrow().as_slice(), ["decode error: corrupt"]);
    }

    #[test]
    fn sequence_without_hook_propagates() {
        let parts: Vec<Box<dyn BaseStream>> = vec![
            Box::new(Stream::from_bytes(&b"BT "[..])),
            Box::new(Failing),
        ];
        let mut seq = StreamsSequenceStream::sequence(parts, None);
        assert!(seq.get_bytes(None).is_err());
        // bytes decoded before the failure stay readable
        assert_eq!(seq.buffered(), b"BT ");
    }
}
