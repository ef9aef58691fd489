//! Byte source backed by a file that arrives in chunks.
//!
//! Reads that touch a chunk which has not been delivered fail with
//! `PdfError::MissingData`; the caller fetches that range, hands it to
//! `on_receive_data` and retries the operation.

use super::base::{BaseStream, SourceRange};
use crate::error::{PdfError, Result};
use crate::model::objects::Dict;
use std::cell::RefCell;
use std::rc::Rc;

/// Default chunk size used by range-request transports.
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

struct ChunkStore {
    bytes: Vec<u8>,
    chunk_size: usize,
    loaded: Vec<bool>,
    num_loaded: usize,
}

impl ChunkStore {
    fn chunk_of(&self, pos: usize) -> usize {
        pos / self.chunk_size
    }

    fn ensure_byte(&self, pos: usize) -> Result<()> {
        let chunk = self.chunk_of(pos);
        match self.loaded.get(chunk) {
            Some(false) => Err(PdfError::MissingData {
                begin: pos,
                end: pos + 1,
            }),
            _ => Ok(()),
        }
    }

    fn ensure_range(&self, begin: usize, end: usize) -> Result<()> {
        if begin >= end {
            return Ok(());
        }
        let first = self.chunk_of(begin);
        let last = self.chunk_of(end - 1).min(self.loaded.len().saturating_sub(1));
        if first >= self.loaded.len() {
            return Ok(());
        }
        if self.loaded[first..=last].iter().all(|&loaded| loaded) {
            Ok(())
        } else {
            Err(PdfError::MissingData { begin, end })
        }
    }
}

/// Stream over a file of known length whose bytes arrive in chunks.
///
/// Sub-streams share the chunk store, so data delivered through any handle
/// becomes visible to all of them.
pub struct ChunkedStream {
    store: Rc<RefCell<ChunkStore>>,
    start: usize,
    pos: usize,
    end: usize,
    dict: Option<Dict>,
}

impl ChunkedStream {
    pub fn new(length: usize, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let num_chunks = length.div_ceil(chunk_size);
        let store = ChunkStore {
            bytes: vec![0; length],
            chunk_size,
            loaded: vec![false; num_chunks],
            num_loaded: 0,
        };
        Self {
            store: Rc::new(RefCell::new(store)),
            start: 0,
            pos: 0,
            end: length,
            dict: None,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.store.borrow().chunk_size
    }

    pub fn num_chunks(&self) -> usize {
        self.store.borrow().loaded.len()
    }

    pub fn num_chunks_loaded(&self) -> usize {
        self.store.borrow().num_loaded
    }

    pub fn has_chunk(&self, chunk: usize) -> bool {
        self.store.borrow().loaded.get(chunk).copied().unwrap_or(false)
    }

    /// Indices of the chunks covering this view that are not loaded yet.
    pub fn get_missing_chunks(&self) -> Vec<usize> {
        let store = self.store.borrow();
        if self.start >= self.end {
            return Vec::new();
        }
        let first = store.chunk_of(self.start);
        let last = store.chunk_of(self.end - 1);
        (first..=last)
            .filter(|&chunk| !store.loaded.get(chunk).copied().unwrap_or(true))
            .collect()
    }

    /// Store `chunk` at offset `begin`.
    ///
    /// `begin` must be chunk aligned, and the data must end on a chunk
    /// boundary or at the end of the file.
    pub fn on_receive_data(&self, begin: usize, chunk: &[u8]) -> Result<()> {
        let mut store = self.store.borrow_mut();
        let chunk_size = store.chunk_size;
        let file_length = store.bytes.len();
        if begin % chunk_size != 0 {
            return Err(PdfError::InvalidArgument(format!(
                "bad begin offset: {begin}"
            )));
        }
        let end = begin + chunk.len();
        if end > file_length || (end % chunk_size != 0 && end != file_length) {
            return Err(PdfError::InvalidArgument(format!("bad end offset: {end}")));
        }
        store.bytes[begin..end].copy_from_slice(chunk);
        if chunk.is_empty() {
            return Ok(());
        }
        let first = begin / chunk_size;
        let last = (end - 1) / chunk_size;
        for index in first..=last {
            if !store.loaded[index] {
                store.loaded[index] = true;
                store.num_loaded += 1;
            }
        }
        Ok(())
    }
}

impl BaseStream for ChunkedStream {
    fn length(&self) -> usize {
        self.end - self.start
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.length())
    }

    fn is_empty(&mut self) -> Result<bool> {
        Ok(self.length() == 0)
    }

    fn is_data_loaded(&self) -> bool {
        self.get_missing_chunks().is_empty()
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
        let store = self.store.borrow();
        store.ensure_byte(self.pos)?;
        let byte = store.bytes[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn get_bytes(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        let pos = self.pos.min(self.end);
        let end = match length {
            Some(length) => pos.saturating_add(length).min(self.end),
            None => self.end,
        };
        let store = self.store.borrow();
        store.ensure_range(pos, end)?;
        self.pos = end;
        Ok(store.bytes[pos..end].to_vec())
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
        let file_length = self.store.borrow().bytes.len();
        let start = start.min(file_length);
        let end = match length {
            Some(length) => {
                let end = start.saturating_add(length).min(file_length);
                self.store.borrow().ensure_range(start, end)?;
                end
            }
            None => {
                if start < file_length {
                    self.store.borrow().ensure_byte(start)?;
                }
                self.end
            }
        };
        Ok(Box::new(Self {
            store: Rc::clone(&self.store),
            start,
            pos: start,
            end,
            dict,
        }))
    }

    fn get_byte_range(&mut self, begin: usize, end: usize) -> Result<Vec<u8>> {
        let end = end.min(self.end);
        let begin = begin.min(end);
        let store = self.store.borrow();
        store.ensure_range(begin, end)?;
        Ok(store.bytes[begin..end].to_vec())
    }

    fn get_base_streams(&self) -> Option<Vec<SourceRange>> {
        Some(vec![SourceRange {
            start: self.start,
            end: self.end,
            loaded: self.is_data_loaded(),
        }])
    }

    fn dict(&self) -> Option<&Dict> {
        self.dict.as_ref()
    }

    fn set_dict(&mut self, dict: Option<Dict>) {
        self.dict = dict;
    }
}
