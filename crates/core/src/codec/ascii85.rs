//! ASCII85 and ASCIIHex decoders.
//!
//! Both read their upstream incrementally: ASCII85 one group per block,
//! ASCIIHex in blocks of `HEX_UPSTREAM_BLOCK_SIZE` encoded bytes.

use crate::error::{PdfError, Result};
use crate::stream::{BaseStream, BlockDecoder, DecodeBuffer, DecodeStream, SourceRange, Stream};

/// Encoded bytes pulled from upstream per ASCIIHex block.
const HEX_UPSTREAM_BLOCK_SIZE: usize = 8000;

const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\x00')
}

/// Decoder for `/ASCII85Decode`.
pub struct Ascii85Decoder {
    source: Box<dyn BaseStream>,
    started: bool,
}

/// Stream decoding `/ASCII85Decode` data.
pub type Ascii85Stream = DecodeStream<Ascii85Decoder>;

impl Ascii85Decoder {
    pub fn new(source: Box<dyn BaseStream>) -> Self {
        Self {
            source,
            started: false,
        }
    }

    /// Wrap `source`; the encoded size shrinks by a fifth when decoded.
    pub fn stream(source: Box<dyn BaseStream>, maybe_length: Option<usize>) -> Ascii85Stream {
        let dict = source.dict().cloned();
        let hint = maybe_length.map(|length| length * 4 / 5);
        DecodeStream::new(Self::new(source), hint).with_dict(dict)
    }

    fn next_significant(&mut self) -> Result<Option<u8>> {
        loop {
            match self.source.get_byte()? {
                Some(b) if is_whitespace(b) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Skip an optional `<~` opening marker.
    fn skip_prefix(&mut self) -> Result<()> {
        self.started = true;
        let pos = self.source.pos();
        let mut first = self.source.get_byte()?;
        while matches!(first, Some(b) if is_whitespace(b)) {
            first = self.source.get_byte()?;
        }
        if first == Some(b'<') && self.source.peek_byte()? == Some(b'~') {
            self.source.get_byte()?;
            return Ok(());
        }
        self.source.set_pos(pos);
        Ok(())
    }
}

impl BlockDecoder for Ascii85Decoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        if !self.started {
            self.skip_prefix()?;
        }
        let c = match self.next_significant()? {
            None | Some(b'~') => {
                out.set_eof();
                return Ok(());
            }
            Some(c) => c,
        };
        if c == b'z' {
            out.extend_repeated(0, 4);
            return Ok(());
        }

        let mut input = [0u8; 5];
        input[0] = c;
        let mut count = 1;
        while count < 5 {
            match self.next_significant()? {
                None | Some(b'~') => break,
                Some(c) => {
                    input[count] = c;
                    count += 1;
                }
            }
        }
        if count < 5 {
            // pad the short final group with the highest digit
            input[count..].fill(0x21 + 84);
            out.set_eof();
        }

        let mut t: u64 = 0;
        for &c in &input {
            if !(b'!'..=b'u').contains(&c) {
                out.set_eof();
                return Err(PdfError::DecodeError(format!(
                    "invalid ASCII85 character {c:#04x}"
                )));
            }
            t = t * 85 + u64::from(c - 0x21);
        }
        let word = (t as u32).to_be_bytes();
        out.extend_from_slice(&word[..count - 1]);
        Ok(())
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}

/// Decoder for `/ASCIIHexDecode`.
pub struct AsciiHexDecoder {
    source: Box<dyn BaseStream>,
    first_digit: Option<u8>,
}

/// Stream decoding `/ASCIIHexDecode` data.
pub type AsciiHexStream = DecodeStream<AsciiHexDecoder>;

impl AsciiHexDecoder {
    pub fn new(source: Box<dyn BaseStream>) -> Self {
        Self {
            source,
            first_digit: None,
        }
    }

    /// Wrap `source`; two encoded bytes make one decoded byte.
    pub fn stream(source: Box<dyn BaseStream>, maybe_length: Option<usize>) -> AsciiHexStream {
        let dict = source.dict().cloned();
        let hint = maybe_length.map(|length| length / 2);
        DecodeStream::new(Self::new(source), hint).with_dict(dict)
    }

    fn flush(&mut self, out: &mut DecodeBuffer) {
        if let Some(digit) = self.first_digit.take() {
            out.push(digit << 4);
        }
    }
}

impl BlockDecoder for AsciiHexDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        let bytes = self.source.get_bytes(Some(HEX_UPSTREAM_BLOCK_SIZE))?;
        if bytes.is_empty() {
            self.flush(out);
            out.set_eof();
            return Ok(());
        }
        out.ensure_buffer(out.len() + bytes.len().div_ceil(2));
        for ch in bytes {
            let digit = match ch {
                b'0'..=b'9' => ch & 0x0f,
                b'A'..=b'F' | b'a'..=b'f' => (ch & 0x0f) + 9,
                b'>' => {
                    self.flush(out);
                    out.set_eof();
                    return Ok(());
                }
                _ => continue,
            };
            match self.first_digit.take() {
                Some(first) => out.push((first << 4) | digit),
                None => self.first_digit = Some(digit),
            }
        }
        Ok(())
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}

/// Decode a complete ASCII85 buffer.
pub fn ascii85decode(data: &[u8]) -> Result<Vec<u8>> {
    let source = Box::new(Stream::from_bytes(data.to_vec()));
    Ascii85Decoder::stream(source, Some(data.len())).get_bytes(None)
}

/// Decode a complete ASCIIHex buffer.
pub fn asciihexdecode(data: &[u8]) -> Result<Vec<u8>> {
    let source = Box::new(Stream::from_bytes(data.to_vec()));
    AsciiHexDecoder::stream(source, Some(data.len())).get_bytes(None)
}

/// Encode `data` as ASCII85 with the `~>` terminator.
///
/// Full zero groups use the `z` shorthand.
pub fn ascii85encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 5 / 4 + 4);
    for group in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..group.len()].copy_from_slice(group);
        let mut t = u32::from_be_bytes(word);
        if group.len() == 4 && t == 0 {
            out.push(b'z');
            continue;
        }
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = (t % 85) as u8 + 0x21;
            t /= 85;
        }
        out.extend_from_slice(&digits[..group.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}

/// Encode `data` as upper-case hex with the `>` terminator.
pub fn asciihexencode(data: &[u8]) -> Vec<u8> {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for &b in data {
        out.push(DIGITS[usize::from(b >> 4)]);
        out.push(DIGITS[usize::from(b & 0x0f)]);
    }
    out.push(b'>');
    out
}
