//! Incremental LZW decoder (PDF/TIFF flavour).
//!
//! Codes are read MSB first, starting at 9 bits and growing to 12.
//! 256 clears the table, 257 ends the data. `EarlyChange` (default 1)
//! switches to the wider code one entry early.

use crate::error::{PdfError, Result};
use crate::stream::{BaseStream, BlockDecoder, DecodeBuffer, DecodeStream, SourceRange, Stream};

const CLEAR_TABLE: u16 = 256;
const EOD: u16 = 257;
const FIRST_CODE: u16 = 258;
const MAX_CODES: usize = 4096;
/// Codes decoded per `read_block`.
const BLOCK_SIZE: usize = 512;

struct LzwState {
    early_change: u16,
    code_length: u32,
    next_code: u16,
    values: Vec<u8>,
    lengths: Vec<u16>,
    prev_codes: Vec<u16>,
    current: Vec<u8>,
    prev_code: u16,
}

impl LzwState {
    fn new(early_change: u16) -> Self {
        let mut values = vec![0u8; MAX_CODES];
        let mut lengths = vec![0u16; MAX_CODES];
        for code in 0..256 {
            values[code] = code as u8;
            lengths[code] = 1;
        }
        Self {
            early_change,
            code_length: 9,
            next_code: FIRST_CODE,
            values,
            lengths,
            prev_codes: vec![0; MAX_CODES],
            current: Vec::with_capacity(MAX_CODES),
            prev_code: 0,
        }
    }

    fn clear(&mut self) {
        self.code_length = 9;
        self.next_code = FIRST_CODE;
        self.current.clear();
    }

    /// Replace `current` with the expansion of `code`.
    fn expand(&mut self, code: u16) -> Result<()> {
        let has_prev = !self.current.is_empty();
        if code < 256 {
            self.current.clear();
            self.current.push(code as u8);
        } else if code < self.next_code {
            let length = usize::from(self.lengths[usize::from(code)]);
            self.current.clear();
            self.current.resize(length, 0);
            let mut q = code;
            for slot in self.current.iter_mut().rev() {
                *slot = self.values[usize::from(q)];
                q = self.prev_codes[usize::from(q)];
            }
        } else if code == self.next_code && has_prev {
            // KwKwK: previous sequence plus its own first byte
            let first = self.current[0];
            self.current.push(first);
        } else {
            return Err(PdfError::DecodeError(format!(
                "invalid LZW code {code} (next code {})",
                self.next_code
            )));
        }
        if has_prev {
            self.add_entry();
        }
        self.prev_code = code;
        Ok(())
    }

    fn add_entry(&mut self) {
        let next = usize::from(self.next_code);
        if next >= MAX_CODES {
            return;
        }
        self.prev_codes[next] = self.prev_code;
        self.lengths[next] = self.lengths[usize::from(self.prev_code)] + 1;
        self.values[next] = self.current[0];
        self.next_code += 1;
        let threshold = u32::from(self.next_code + self.early_change);
        if threshold.is_power_of_two() {
            self.code_length = (threshold.ilog2() + 1).min(12);
        }
    }
}

/// Decoder for `/LZWDecode`.
pub struct LzwDecoder {
    source: Box<dyn BaseStream>,
    state: Option<LzwState>,
    cached_data: u32,
    bits_cached: u32,
}

/// Stream decoding `/LZWDecode` data.
pub type LzwStream = DecodeStream<LzwDecoder>;

impl LzwDecoder {
    pub fn new(source: Box<dyn BaseStream>, early_change: bool) -> Self {
        Self {
            source,
            state: Some(LzwState::new(u16::from(early_change))),
            cached_data: 0,
            bits_cached: 0,
        }
    }

    pub fn stream(
        source: Box<dyn BaseStream>,
        maybe_length: Option<usize>,
        early_change: bool,
    ) -> LzwStream {
        let dict = source.dict().cloned();
        DecodeStream::new(Self::new(source, early_change), maybe_length).with_dict(dict)
    }

    /// Next `n`-bit code, `None` when the input runs out.
    fn read_bits(&mut self, n: u32) -> Result<Option<u16>> {
        while self.bits_cached < n {
            let Some(byte) = self.source.get_byte()? else {
                return Ok(None);
            };
            self.cached_data = (self.cached_data << 8) | u32::from(byte);
            self.bits_cached += 8;
        }
        self.bits_cached -= n;
        let code = (self.cached_data >> self.bits_cached) & ((1 << n) - 1);
        // keep only the bits not consumed yet
        self.cached_data &= (1 << self.bits_cached) - 1;
        Ok(Some(code as u16))
    }
}

impl BlockDecoder for LzwDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        for _ in 0..BLOCK_SIZE {
            let Some(code_length) = self.state.as_ref().map(|state| state.code_length) else {
                out.set_eof();
                return Ok(());
            };
            let code = match self.read_bits(code_length)? {
                Some(EOD) | None => {
                    self.state = None;
                    out.set_eof();
                    return Ok(());
                }
                Some(code) => code,
            };
            let Some(state) = self.state.as_mut() else {
                break;
            };
            if code == CLEAR_TABLE {
                state.clear();
                continue;
            }
            if let Err(err) = state.expand(code) {
                self.state = None;
                return Err(err);
            }
            out.extend_from_slice(&state.current);
        }
        Ok(())
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}

/// Decode a complete LZW buffer with `EarlyChange` 1.
pub fn lzwdecode(data: &[u8]) -> Result<Vec<u8>> {
    lzwdecode_with_earlychange(data, true)
}

/// Decode a complete LZW buffer.
pub fn lzwdecode_with_earlychange(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let source = Box::new(Stream::from_bytes(data.to_vec()));
    LzwDecoder::stream(source, Some(data.len()), early_change).get_bytes(None)
}
