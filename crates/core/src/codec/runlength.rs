//! RunLength decoder.
//!
//! Each run starts with a length byte `n`:
//! - `0..=127`: copy the next `n + 1` bytes literally
//! - `128`: end of data
//! - `129..=255`: repeat the next byte `257 - n` times

use crate::error::Result;
use crate::stream::{BaseStream, BlockDecoder, DecodeBuffer, DecodeStream, SourceRange, Stream};

/// Decoder for `/RunLengthDecode`, one run per block.
pub struct RunLengthDecoder {
    source: Box<dyn BaseStream>,
}

/// Stream decoding `/RunLengthDecode` data.
pub type RunLengthStream = DecodeStream<RunLengthDecoder>;

impl RunLengthDecoder {
    pub fn new(source: Box<dyn BaseStream>) -> Self {
        Self { source }
    }

    pub fn stream(source: Box<dyn BaseStream>, maybe_length: Option<usize>) -> RunLengthStream {
        let dict = source.dict().cloned();
        DecodeStream::new(Self::new(source), maybe_length).with_dict(dict)
    }
}

impl BlockDecoder for RunLengthDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        // the header holds the length byte and the first data byte
        let header = self.source.get_bytes(Some(2))?;
        if header.len() < 2 || header[0] == 128 {
            out.set_eof();
            return Ok(());
        }
        let n = header[0];
        if n < 128 {
            out.push(header[1]);
            if n > 0 {
                let literal = self.source.get_bytes(Some(usize::from(n)))?;
                out.extend_from_slice(&literal);
            }
        } else {
            out.extend_repeated(header[1], 257 - usize::from(n));
        }
        Ok(())
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}

/// Decode a complete RunLength buffer.
pub fn rldecode(data: &[u8]) -> Result<Vec<u8>> {
    let source = Box::new(Stream::from_bytes(data.to_vec()));
    RunLengthDecoder::stream(source, Some(data.len())).get_bytes(None)
}
