//! Decrypting stream.

use super::cipher::Cipher;
use crate::error::Result;
use crate::stream::{BaseStream, BlockDecoder, DecodeBuffer, DecodeStream, SourceRange};

/// Encrypted bytes pulled from upstream per block.
pub const CHUNK_SIZE: usize = 512;

/// Decoder running a cipher over its upstream in fixed-size chunks.
///
/// One chunk of lookahead is kept so the cipher learns which chunk is the
/// last one and can strip block padding there.
pub struct DecryptDecoder {
    source: Box<dyn BaseStream>,
    cipher: Box<dyn Cipher>,
    current: Option<Vec<u8>>,
}

/// Stream decrypting its upstream.
pub type DecryptStream = DecodeStream<DecryptDecoder>;

impl DecryptDecoder {
    pub fn new(source: Box<dyn BaseStream>, cipher: Box<dyn Cipher>) -> Self {
        Self {
            source,
            cipher,
            current: None,
        }
    }

    pub fn stream(
        source: Box<dyn BaseStream>,
        maybe_length: Option<usize>,
        cipher: Box<dyn Cipher>,
    ) -> DecryptStream {
        let dict = source.dict().cloned();
        DecodeStream::new(Self::new(source, cipher), maybe_length).with_dict(dict)
    }
}

impl BlockDecoder for DecryptDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        if self.current.is_none() {
            self.current = Some(self.source.get_bytes(Some(CHUNK_SIZE))?);
        }
        if self.current.as_ref().is_none_or(|chunk| chunk.is_empty()) {
            out.set_eof();
            return Ok(());
        }
        // the current chunk stays put if the lookahead read fails
        let next = self.source.get_bytes(Some(CHUNK_SIZE))?;
        let finalize = next.is_empty();
        let chunk = self.current.replace(next).unwrap_or_default();
        let decrypted = self.cipher.decrypt_block(&chunk, finalize);
        out.extend_from_slice(&decrypted);
        Ok(())
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}
