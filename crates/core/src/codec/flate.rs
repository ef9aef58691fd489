//! Incremental `/FlateDecode` decoder.
//!
//! Input is pulled from upstream in small chunks and inflated with
//! `flate2::Decompress`, so only the requested prefix of a large stream
//! is ever decompressed.

use crate::error::{PdfError, Result};
use crate::stream::{BaseStream, BlockDecoder, DecodeBuffer, DecodeStream, SourceRange, Stream};
use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, warn};

/// Compressed bytes pulled from upstream at a time.
const INPUT_CHUNK: usize = 512;
/// Room reserved for each inflate call.
const OUTPUT_CHUNK: usize = 2048;

/// Decoder for `/FlateDecode`.
pub struct FlateDecoder {
    source: Box<dyn BaseStream>,
    inflater: Option<Decompress>,
    pending: Vec<u8>,
    input_done: bool,
}

/// Stream decoding `/FlateDecode` data.
pub type FlateStream = DecodeStream<FlateDecoder>;

/// True when `header` starts with a zlib header PDF writers may emit.
fn is_zlib_header(header: &[u8]) -> bool {
    let (Some(&cmf), Some(&flg)) = (header.first(), header.get(1)) else {
        return false;
    };
    cmf & 0x0f == 8 && ((u16::from(cmf) << 8) | u16::from(flg)) % 31 == 0 && flg & 0x20 == 0
}

impl FlateDecoder {
    pub fn new(source: Box<dyn BaseStream>) -> Self {
        Self {
            source,
            inflater: None,
            pending: Vec::new(),
            input_done: false,
        }
    }

    pub fn stream(source: Box<dyn BaseStream>, maybe_length: Option<usize>) -> FlateStream {
        let dict = source.dict().cloned();
        DecodeStream::new(Self::new(source), maybe_length).with_dict(dict)
    }

    /// Pick zlib or raw deflate from the first two bytes; `None` for no data.
    fn open(&mut self) -> Result<Option<Decompress>> {
        let header = self.source.peek_bytes(Some(2))?;
        if header.is_empty() {
            return Ok(None);
        }
        if is_zlib_header(&header) || header.len() < 2 {
            return Ok(Some(Decompress::new(true)));
        }
        warn!(
            cmf = header[0],
            flg = header[1],
            "invalid zlib header, inflating as raw deflate"
        );
        Ok(Some(Decompress::new(false)))
    }

    fn refill(&mut self) -> Result<()> {
        if self.input_done {
            return Ok(());
        }
        let chunk = self.source.get_bytes(Some(INPUT_CHUNK))?;
        if chunk.is_empty() {
            self.input_done = true;
        }
        self.pending.extend_from_slice(&chunk);
        Ok(())
    }
}

impl BlockDecoder for FlateDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        if self.inflater.is_none() {
            match self.open()? {
                Some(inflater) => self.inflater = Some(inflater),
                None => {
                    out.set_eof();
                    return Ok(());
                }
            }
        }
        loop {
            if self.pending.is_empty() {
                self.refill()?;
            }
            let Some(inflater) = self.inflater.as_mut() else {
                out.set_eof();
                return Ok(());
            };
            let flush = if self.input_done {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };
            let before_in = inflater.total_in();
            let before_out = inflater.total_out();
            let status = inflater.decompress(&self.pending, out.writable(OUTPUT_CHUNK), flush);
            let consumed = (inflater.total_in() - before_in) as usize;
            let produced = (inflater.total_out() - before_out) as usize;
            out.commit(produced);
            self.pending.drain(..consumed);

            match status {
                Ok(Status::StreamEnd) => {
                    if !self.pending.is_empty() {
                        debug!(trailing = self.pending.len(), "bytes after end of deflate data");
                    }
                    out.set_eof();
                    return Ok(());
                }
                Ok(_) => {
                    if produced > 0 {
                        return Ok(());
                    }
                    if self.input_done {
                        warn!("deflate data ended without a final block");
                        out.set_eof();
                        return Ok(());
                    }
                    if consumed == 0 {
                        // the inflater needs more input than is pending
                        self.refill()?;
                    }
                }
                Err(err) => {
                    out.set_eof();
                    return Err(PdfError::DecodeError(format!("invalid deflate data: {err}")));
                }
            }
        }
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}

/// Inflate a complete zlib (or raw deflate) buffer.
pub fn flatedecode(data: &[u8]) -> Result<Vec<u8>> {
    let source = Box::new(Stream::from_bytes(data.to_vec()));
    FlateDecoder::stream(source, Some(data.len())).get_bytes(None)
}
