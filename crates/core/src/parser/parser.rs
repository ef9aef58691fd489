//! PDF object parser.
//!
//! `Parser` turns lexer tokens into `Obj` values with two tokens of
//! lookahead (`buf1`, `buf2`): enough to recognize `num gen R` references
//! and the `>> stream` transition without backtracking.

use super::lexer::{Lexer, Token, is_whitespace};
use super::operators::KnownCommands;
use super::params::ParserOptions;
use crate::codec::{
    Ascii85Decoder, AsciiHexDecoder, FlateDecoder, ImageDecoder, ImageFilter, LzwDecoder,
    RunLengthDecoder, make_predictor,
};
use crate::document::security::{CipherTransform, CipherTransformFactory};
use crate::document::xref::XRef;
use crate::error::{PdfError, Result};
use crate::model::objects::{Cmd, Dict, Name, Obj, Ref, StreamRef};
use crate::stream::{BaseStream, Stream};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

const ENDSTREAM: &[u8] = b"endstream";
/// Damaged `endstream` keywords accepted when followed by whitespace.
const TRUNCATED_ENDSTREAM: [&[u8]; 2] = [b"endstrea", b"endsteam"];
const SCAN_BLOCK_LENGTH: usize = 2048;
/// Inline images smaller than this are cached per parser.
const MAX_LENGTH_TO_CACHE: usize = 1000;

pub struct Parser {
    lexer: Lexer,
    xref: Option<Rc<dyn XRef>>,
    options: ParserOptions,
    buf1: Token,
    buf2: Token,
    depth: usize,
    image_cache: FxHashMap<Vec<u8>, StreamRef>,
}

impl Parser {
    pub fn new(lexer: Lexer, xref: Option<Rc<dyn XRef>>, options: ParserOptions) -> Result<Self> {
        let mut parser = Self {
            lexer,
            xref,
            options,
            buf1: Token::Eof,
            buf2: Token::Eof,
            depth: 0,
            image_cache: FxHashMap::default(),
        };
        parser.refill()?;
        Ok(parser)
    }

    /// Parser over an in-memory buffer.
    pub fn from_bytes(
        data: impl Into<bytes::Bytes>,
        xref: Option<Rc<dyn XRef>>,
        options: ParserOptions,
    ) -> Result<Self> {
        let lexer = Lexer::new(Box::new(Stream::from_bytes(data)), None)?;
        Self::new(lexer, xref, options)
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer {
        &mut self.lexer
    }

    pub fn xref(&self) -> Option<&Rc<dyn XRef>> {
        self.xref.as_ref()
    }

    /// The token the next `get_obj` call starts from.
    pub fn buf1(&self) -> &Token {
        &self.buf1
    }

    pub fn buf2(&self) -> &Token {
        &self.buf2
    }

    pub fn at_eof(&self) -> bool {
        self.buf1.is_eof()
    }

    /// Reload both lookahead tokens from the lexer's current position.
    pub fn refill(&mut self) -> Result<()> {
        self.buf1 = self.lexer.get_obj()?;
        self.buf2 = self.lexer.get_obj()?;
        Ok(())
    }

    pub fn shift(&mut self) -> Result<()> {
        if self.buf2.is_cmd("ID") {
            // inline image data follows, it must not be tokenized
            self.buf1 = std::mem::replace(&mut self.buf2, Token::Null);
        } else {
            self.buf1 = std::mem::replace(&mut self.buf2, Token::Null);
            self.buf2 = self.lexer.get_obj()?;
        }
        Ok(())
    }

    /// `shift`, reporting lexer errors as `false`. Missing data still propagates.
    pub fn try_shift(&mut self) -> Result<bool> {
        match self.shift() {
            Ok(()) => Ok(true),
            Err(e) if e.is_missing_data() => Err(e),
            Err(e) => {
                debug!(error = %e, "try_shift failed");
                Ok(false)
            }
        }
    }

    fn resolve(&self, obj: &Obj) -> Result<Obj> {
        match &self.xref {
            Some(xref) => xref.fetch_if_ref(obj),
            None => Ok(obj.clone()),
        }
    }

    /// Parse the next object. Strings and streams are decrypted with
    /// `transform` when one is given.
    pub fn get_obj(&mut self, transform: Option<&CipherTransform>) -> Result<Obj> {
        let buf1 = std::mem::replace(&mut self.buf1, Token::Null);
        self.shift()?;

        match buf1 {
            Token::Cmd(cmd) => match cmd.as_str() {
                "BI" => self.make_inline_image(transform),
                "[" => self.nested(transform, Self::parse_array),
                "<<" => self.nested(transform, Self::parse_dict),
                _ => Ok(Obj::Cmd(cmd)),
            },
            Token::Int(num) => {
                if let Token::Int(generation) = self.buf1 {
                    if self.buf2.is_cmd("R") {
                        if let (Ok(num), Ok(generation)) =
                            (u32::try_from(num), u16::try_from(generation))
                        {
                            self.shift()?;
                            self.shift()?;
                            return Ok(Obj::Ref(Ref::new(num, generation)));
                        }
                    }
                }
                Ok(Obj::Int(num))
            }
            Token::String(data) => Ok(Obj::String(match transform {
                Some(transform) => transform.decrypt_string(&data),
                None => data,
            })),
            other => Ok(other.into_obj()),
        }
    }

    fn nested(
        &mut self,
        transform: Option<&CipherTransform>,
        parse: fn(&mut Self, Option<&CipherTransform>) -> Result<Obj>,
    ) -> Result<Obj> {
        if self.depth >= self.options.max_depth {
            if !self.options.recovery_mode {
                return Err(PdfError::SyntaxError(format!(
                    "objects nested deeper than {} levels",
                    self.options.max_depth
                )));
            }
            warn!(max_depth = self.options.max_depth, "nesting too deep, skipping object");
            self.skip_nested()?;
            return Ok(Obj::Null);
        }
        self.depth += 1;
        let result = parse(self, transform);
        self.depth -= 1;
        result
    }

    /// Skip to the close of the array or dictionary just opened.
    fn skip_nested(&mut self) -> Result<()> {
        let mut level = 1usize;
        while !self.buf1.is_eof() {
            if self.buf1.is_cmd("[") || self.buf1.is_cmd("<<") {
                level += 1;
            } else if self.buf1.is_cmd("]") || self.buf1.is_cmd(">>") {
                level -= 1;
            }
            self.shift()?;
            if level == 0 {
                break;
            }
        }
        Ok(())
    }

    fn parse_array(&mut self, transform: Option<&CipherTransform>) -> Result<Obj> {
        let mut array = Vec::new();
        while !self.buf1.is_cmd("]") && !self.buf1.is_eof() {
            array.push(self.get_obj(transform)?);
        }
        if self.buf1.is_eof() {
            if self.options.recovery_mode {
                return Ok(Obj::Array(array));
            }
            return Err(PdfError::UnexpectedEof);
        }
        self.shift()?;
        Ok(Obj::Array(array))
    }

    fn parse_dict(&mut self, transform: Option<&CipherTransform>) -> Result<Obj> {
        let mut dict = Dict::new(self.xref.clone());
        while !self.buf1.is_cmd(">>") && !self.buf1.is_eof() {
            let Token::Name(key) = &self.buf1 else {
                info!(token = ?self.buf1, "malformed dictionary: key must be a name object");
                self.shift()?;
                continue;
            };
            let key = key.clone();
            self.shift()?;
            if self.buf1.is_eof() {
                break;
            }
            let value = self.get_obj(transform)?;
            dict.set(key, value);
        }
        if self.buf1.is_eof() {
            if self.options.recovery_mode {
                return Ok(Obj::Dict(dict));
            }
            return Err(PdfError::UnexpectedEof);
        }

        // streams may not appear inside content streams or object streams
        if self.buf2.is_cmd("stream") {
            if self.options.allow_streams {
                return self.make_stream(dict, transform).map(Obj::Stream);
            }
            return Ok(Obj::Dict(dict));
        }
        self.shift()?;
        Ok(Obj::Dict(dict))
    }

    fn stream_length(dict: &Dict) -> Result<usize> {
        match dict.get_resolved("Length") {
            Ok(Some(Obj::Int(n))) if n >= 0 => Ok(n as usize),
            Err(e) if e.is_missing_data() => Err(e),
            other => {
                info!(length = ?other, "bad length in stream");
                Ok(0)
            }
        }
    }

    fn make_stream(&mut self, dict: Dict, transform: Option<&CipherTransform>) -> Result<StreamRef> {
        self.lexer.skip_to_next_line()?;
        let start_pos = self.lexer.stream().pos().saturating_sub(1);

        let mut length = Self::stream_length(&dict)?;
        self.lexer.stream_mut().set_pos(start_pos + length);
        self.lexer.next_char()?;
        if self.try_shift()? && self.buf2.is_cmd("endstream") {
            self.shift()?;
        } else {
            length = self.recover_stream_length(start_pos)?;
            self.lexer.next_char()?;
            self.shift()?;
            self.shift()?;
        }
        // past `endstream`
        self.shift()?;

        let raw = self
            .lexer
            .stream_mut()
            .make_sub_stream(start_pos, Some(length), Some(dict.clone()))?;
        if !self.options.decode_streams {
            return Ok(StreamRef::new(raw));
        }
        let raw = Self::decrypt_stream(raw, &dict, length, transform);
        let mut stream = self.filter(raw, &dict, length)?;
        stream.set_dict(Some(dict));
        Ok(StreamRef::new(stream))
    }

    /// Scan for `endstream` when `/Length` is missing or wrong.
    fn recover_stream_length(&mut self, start_pos: usize) -> Result<usize> {
        if let Some(length) = self.find_stream_length(start_pos, ENDSTREAM)? {
            warn!(length, "stream length recovered by scanning for endstream");
            return self.trim_trailing_eol(start_pos, length);
        }
        for signature in TRUNCATED_ENDSTREAM {
            let Some(length) = self.find_stream_length(start_pos, signature)? else {
                continue;
            };
            let after = self
                .lexer
                .stream_mut()
                .peek_bytes(Some(signature.len() + 1))?
                .get(signature.len())
                .copied();
            if !after.is_some_and(is_whitespace) {
                continue;
            }
            info!(
                found = %String::from_utf8_lossy(signature),
                "found damaged keyword when searching for endstream"
            );
            return self.trim_trailing_eol(start_pos, length);
        }
        Err(PdfError::SyntaxError("missing endstream command".into()))
    }

    /// Offset of `signature` from `start_pos`, leaving the stream positioned on it.
    fn find_stream_length(&mut self, start_pos: usize, signature: &[u8]) -> Result<Option<usize>> {
        let stream = self.lexer.stream_mut();
        stream.set_pos(start_pos);
        loop {
            let scan = stream.peek_bytes(Some(SCAN_BLOCK_LENGTH))?;
            if scan.len() < signature.len() {
                return Ok(None);
            }
            if let Some(found) = scan.windows(signature.len()).position(|w| w == signature) {
                let pos = stream.pos() + found;
                stream.set_pos(pos);
                return Ok(Some(pos - start_pos));
            }
            if scan.len() < SCAN_BLOCK_LENGTH {
                return Ok(None);
            }
            stream.skip((scan.len() - signature.len() + 1) as isize);
        }
    }

    /// Drop the end of line that precedes a scanned `endstream`.
    fn trim_trailing_eol(&mut self, start_pos: usize, length: usize) -> Result<usize> {
        let stream = self.lexer.stream_mut();
        let end = start_pos + length;
        let tail_start = end - length.min(2);
        stream.set_pos(tail_start);
        let tail = stream.peek_bytes(Some(end - tail_start))?;
        stream.set_pos(end);
        let eol = match tail.as_slice() {
            [.., b'\r', b'\n'] => 2,
            [.., b'\n' | b'\r'] => 1,
            _ => 0,
        };
        Ok(length - eol)
    }

    fn decrypt_stream(
        stream: Box<dyn BaseStream>,
        dict: &Dict,
        length: usize,
        transform: Option<&CipherTransform>,
    ) -> Box<dyn BaseStream> {
        let Some(transform) = transform else {
            return stream;
        };
        if dict.is_type("XRef") || (dict.is_type("Metadata") && !transform.encrypt_metadata()) {
            return stream;
        }
        if dict.is_type("EmbeddedFile") {
            return transform.create_embedded_file_stream(stream, Some(length));
        }
        transform.create_stream(stream, Some(length))
    }

    /// Apply the `/Filter` chain of `dict` to `stream`.
    pub fn filter(
        &self,
        stream: Box<dyn BaseStream>,
        dict: &Dict,
        length: usize,
    ) -> Result<Box<dyn BaseStream>> {
        let filter = dict.get_resolved_any(&["F", "Filter"])?;
        let params = dict.get_resolved_any(&["DP", "DecodeParms"])?;
        match filter {
            Some(Obj::Name(name)) => {
                if matches!(params, Some(Obj::Array(_))) {
                    warn!("/DecodeParms should not be an array when /Filter is a name");
                }
                let params = match params {
                    Some(Obj::Dict(params)) => Some(params),
                    _ => None,
                };
                Self::make_filter(stream, name.as_str(), Some(length), params)
            }
            Some(Obj::Array(filters)) => {
                let params = match params {
                    Some(Obj::Array(params)) => params,
                    _ => Vec::new(),
                };
                let mut stream = stream;
                let mut maybe_length = Some(length);
                for (i, filter) in filters.iter().enumerate() {
                    let Obj::Name(name) = self.resolve(filter)? else {
                        return Err(PdfError::SyntaxError(format!(
                            "bad filter name: {filter:?}"
                        )));
                    };
                    let params = match params.get(i) {
                        Some(param) => match self.resolve(param)? {
                            Obj::Dict(param) => Some(param),
                            _ => None,
                        },
                        None => None,
                    };
                    stream = Self::make_filter(stream, name.as_str(), maybe_length, params)?;
                    maybe_length = None;
                }
                Ok(stream)
            }
            _ => Ok(stream),
        }
    }

    /// Wrap `stream` in the decoder for filter `name`.
    ///
    /// A zero length or a filter that cannot be set up gives an empty
    /// stream; unknown filters pass the data through.
    pub fn make_filter(
        stream: Box<dyn BaseStream>,
        name: &str,
        maybe_length: Option<usize>,
        params: Option<Dict>,
    ) -> Result<Box<dyn BaseStream>> {
        if maybe_length == Some(0) {
            warn!(filter = name, "empty stream");
            return Ok(Box::new(Stream::null()));
        }
        match Self::build_filter(stream, name, maybe_length, params) {
            Ok(stream) => Ok(stream),
            Err(e) if e.is_missing_data() => Err(e),
            Err(e) => {
                warn!(filter = name, error = %e, "invalid stream");
                Ok(Box::new(Stream::null()))
            }
        }
    }

    fn build_filter(
        stream: Box<dyn BaseStream>,
        name: &str,
        maybe_length: Option<usize>,
        params: Option<Dict>,
    ) -> Result<Box<dyn BaseStream>> {
        let decoded: Box<dyn BaseStream> = match name {
            "Fl" | "FlateDecode" => {
                let flate = Box::new(FlateDecoder::stream(stream, maybe_length));
                match params {
                    Some(params) => make_predictor(flate, maybe_length, Some(&params))?,
                    None => flate,
                }
            }
            "LZW" | "LZWDecode" => {
                let early_change = match &params {
                    Some(params) => match params.get_resolved("EarlyChange")? {
                        Some(Obj::Int(n)) => n != 0,
                        _ => true,
                    },
                    None => true,
                };
                let lzw = Box::new(LzwDecoder::stream(stream, maybe_length, early_change));
                match params {
                    Some(params) => make_predictor(lzw, maybe_length, Some(&params))?,
                    None => lzw,
                }
            }
            "A85" | "ASCII85Decode" => Box::new(Ascii85Decoder::stream(stream, maybe_length)),
            "AHx" | "ASCIIHexDecode" => Box::new(AsciiHexDecoder::stream(stream, maybe_length)),
            "RL" | "RunLengthDecode" => Box::new(RunLengthDecoder::stream(stream, maybe_length)),
            "DCT" | "DCTDecode" => Box::new(ImageDecoder::stream(
                stream,
                maybe_length,
                ImageFilter::Dct,
                params,
            )),
            "JPX" | "JPXDecode" => Box::new(ImageDecoder::stream(
                stream,
                maybe_length,
                ImageFilter::Jpx,
                params,
            )),
            "CCF" | "CCITTFaxDecode" => Box::new(ImageDecoder::stream(
                stream,
                maybe_length,
                ImageFilter::CcittFax,
                params,
            )),
            "JBIG2Decode" => Box::new(ImageDecoder::stream(
                stream,
                maybe_length,
                ImageFilter::Jbig2,
                params,
            )),
            "Crypt" => {
                debug!("crypt filter left to the security handler");
                stream
            }
            _ => {
                warn!(filter = name, "filter not supported");
                stream
            }
        };
        Ok(decoded)
    }

    fn make_inline_image(&mut self, transform: Option<&CipherTransform>) -> Result<Obj> {
        let mut dict = Dict::new(self.xref.clone());
        while !self.buf1.is_cmd("ID") && !self.buf1.is_eof() {
            let Token::Name(key) = &self.buf1 else {
                return Err(PdfError::SyntaxError(
                    "inline image dictionary key must be a name".into(),
                ));
            };
            let key = key.clone();
            self.shift()?;
            if self.buf1.is_eof() {
                break;
            }
            let value = self.get_obj(transform)?;
            dict.set(key, value);
        }
        let begin_pos = self.lexer.begin_inline_image_pos();
        let dict_length = begin_pos.map(|begin| self.lexer.stream().pos().saturating_sub(begin));

        let filter_name = match dict.get_resolved_any(&["F", "Filter"])? {
            Some(Obj::Name(name)) => Some(name),
            Some(Obj::Array(filters)) => match filters.first() {
                Some(first) => match self.resolve(first)? {
                    Obj::Name(name) => Some(name),
                    _ => None,
                },
                None => None,
            },
            _ => None,
        };

        let known = self.lexer.known_commands();
        let stream = self.lexer.stream_mut();
        let start_pos = stream.pos();
        let length = match filter_name.as_ref().map(Name::as_str) {
            Some("DCT" | "DCTDecode") => find_dct_decode_inline_stream_end(stream, known)?,
            Some("A85" | "ASCII85Decode") => find_ascii85_decode_inline_stream_end(stream, known)?,
            Some("AHx" | "ASCIIHexDecode") => {
                find_ascii_hex_decode_inline_stream_end(stream, known)?
            }
            _ => find_default_inline_stream_end(stream, known)?,
        };

        let mut cache_key = None;
        if let (Some(begin), Some(dict_length)) = (begin_pos, dict_length) {
            if length < MAX_LENGTH_TO_CACHE && dict_length > 0 {
                let stream = self.lexer.stream_mut();
                let resume = stream.pos();
                stream.set_pos(begin);
                let key = stream.get_bytes(Some(dict_length + length))?;
                stream.set_pos(resume);
                if let Some(cached) = self.image_cache.get(&key).cloned() {
                    cached.borrow_mut().reset();
                    self.buf2 = Token::Cmd(Cmd::new("EI"));
                    self.shift()?;
                    return Ok(Obj::Stream(cached));
                }
                cache_key = Some(key);
            }
        }

        let raw = self
            .lexer
            .stream_mut()
            .make_sub_stream(start_pos, Some(length), Some(dict.clone()))?;
        let raw = Self::decrypt_stream(raw, &dict, length, transform);
        let mut image = self.filter(raw, &dict, length)?;
        image.set_dict(Some(dict));
        let image = StreamRef::new(image);
        if let Some(key) = cache_key {
            self.image_cache.insert(key, image.clone());
        }

        self.buf2 = Token::Cmd(Cmd::new("EI"));
        self.shift()?;
        Ok(Obj::Stream(image))
    }

    /// Parse `num gen obj ... endobj`, decrypting with the factory's
    /// transform for that object.
    pub fn parse_indirect_object(
        &mut self,
        expected: Option<Ref>,
        factory: Option<&CipherTransformFactory>,
    ) -> Result<(Ref, Obj)> {
        let num = self.get_obj(None)?;
        let generation = self.get_obj(None)?;
        let keyword = self.get_obj(None)?;
        let r = match (&num, &generation) {
            (Obj::Int(num), Obj::Int(generation)) => {
                match (u32::try_from(*num), u16::try_from(*generation)) {
                    (Ok(num), Ok(generation)) => Ref::new(num, generation),
                    _ => {
                        return Err(PdfError::SyntaxError(format!(
                            "object number out of range: {num} {generation}"
                        )));
                    }
                }
            }
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "bad indirect object header: {num:?} {generation:?}"
                )));
            }
        };
        if let Some(expected) = expected {
            if expected != r {
                return Err(PdfError::SyntaxError(format!(
                    "expected object {expected}, found {r}"
                )));
            }
        }
        let Obj::Cmd(keyword) = keyword else {
            return Err(PdfError::SyntaxError(format!("missing obj keyword for {r}")));
        };
        if keyword.as_str() != "obj" {
            // "obj1234" means the object is the number 1234
            if let Some(n) = keyword
                .as_str()
                .strip_prefix("obj")
                .and_then(|rest| rest.parse::<i64>().ok())
            {
                return Ok((r, Obj::Int(n)));
            }
            return Err(PdfError::SyntaxError(format!(
                "bad obj keyword for {r}: {keyword}"
            )));
        }

        let transform = factory
            .map(|factory| factory.create_cipher_transform(r.num, r.generation))
            .transpose()?;
        let obj = self.get_obj(transform.as_ref())?;
        if !self.buf1.is_cmd("endobj") {
            debug!(object = %r, "missing endobj");
        }
        Ok((r, obj))
    }
}

/// True when `data` starts with a valid operator and operand count.
fn starts_with_valid_command(data: Vec<u8>, known: &'static KnownCommands) -> bool {
    let Ok(mut lexer) = Lexer::new(Box::new(Stream::from_bytes(data)), Some(known)) else {
        return false;
    };
    lexer.silence_warnings();
    let mut num_args = 0;
    loop {
        match lexer.get_obj() {
            Ok(Token::Eof) | Err(_) => return false,
            Ok(Token::Cmd(cmd)) => match known.get(cmd.as_str()).copied().flatten() {
                None => return false,
                Some(spec) if spec.accepts(num_args) => return true,
                Some(_) => num_args = 0,
            },
            Ok(_) => num_args += 1,
        }
    }
}

/// Length of inline image data ended by `EI`, checked against what follows.
fn find_default_inline_stream_end(
    stream: &mut dyn BaseStream,
    known: Option<&'static KnownCommands>,
) -> Result<usize> {
    const LOOKAHEAD: usize = 10;
    let start_pos = stream.pos();
    let mut state = 0u8;
    let mut maybe_ei_pos = None;
    let mut found = false;

    while let Some(ch) = stream.get_byte()? {
        match state {
            0 => state = u8::from(ch == b'E'),
            1 => state = if ch == b'I' { 2 } else { 0 },
            _ => {
                if ch != b' ' && ch != b'\n' && ch != b'\r' {
                    state = 0;
                    continue;
                }
                maybe_ei_pos = Some(stream.pos());
                let following = stream.peek_bytes(Some(LOOKAHEAD))?;
                let binary = following.iter().enumerate().any(|(i, &b)| {
                    if b == 0 && following.get(i + 1) != Some(&0) {
                        return false;
                    }
                    b != b'\n' && b != b'\r' && !(0x20..=0x7f).contains(&b)
                });
                if binary {
                    state = 0;
                    continue;
                }
                let Some(known) = known else {
                    warn!("no known commands to validate the EI marker");
                    continue;
                };
                if starts_with_valid_command(stream.peek_bytes(Some(5 * LOOKAHEAD))?, known) {
                    found = true;
                    break;
                }
                state = 0;
            }
        }
    }

    if !found {
        warn!("reached the end of the stream without finding a valid EI marker");
        if let Some(pos) = maybe_ei_pos {
            warn!("using the last EI marker found");
            stream.set_pos(pos);
        }
    }

    let mut end_offset = 4;
    let pos = stream.pos();
    stream.set_pos(pos.saturating_sub(end_offset));
    let before = stream.peek_byte()?;
    stream.set_pos(pos);
    if !before.is_some_and(is_whitespace) {
        end_offset -= 1;
    }
    Ok(pos.saturating_sub(end_offset).saturating_sub(start_pos))
}

/// Skip past the `EI` that follows image data with an explicit terminator.
fn inline_stream_skip_ei(stream: &mut dyn BaseStream) -> Result<()> {
    let mut state = 0u8;
    while let Some(ch) = stream.get_byte()? {
        match state {
            0 => state = u8::from(ch == b'E'),
            1 => state = if ch == b'I' { 2 } else { 0 },
            _ => break,
        }
    }
    Ok(())
}

fn find_dct_decode_inline_stream_end(
    stream: &mut dyn BaseStream,
    known: Option<&'static KnownCommands>,
) -> Result<usize> {
    let start_pos = stream.pos();
    let mut found_eoi = false;
    while let Some(b) = stream.get_byte()? {
        if b != 0xff {
            continue;
        }
        match stream.get_byte()? {
            // stuffed zero byte
            Some(0x00) => {}
            // fill bytes
            Some(0xff) => stream.skip(-1),
            Some(0xd9) => found_eoi = true,
            Some(0xc0..=0xc7 | 0xc9..=0xcf | 0xda..=0xef | 0xfe) => {
                match stream.get_uint16()? {
                    Some(marker_length) if marker_length > 2 => {
                        stream.skip(marker_length as isize - 2)
                    }
                    _ => stream.skip(-2),
                }
            }
            _ => {}
        }
        if found_eoi {
            break;
        }
    }
    if !found_eoi {
        warn!("inline DCTDecode image: EOI marker not found, searching for EI instead");
        stream.set_pos(start_pos);
        return find_default_inline_stream_end(stream, known);
    }
    let length = stream.pos() - start_pos;
    inline_stream_skip_ei(stream)?;
    Ok(length)
}

fn find_ascii85_decode_inline_stream_end(
    stream: &mut dyn BaseStream,
    known: Option<&'static KnownCommands>,
) -> Result<usize> {
    let start_pos = stream.pos();
    let mut found = false;
    while let Some(ch) = stream.get_byte()? {
        if ch != b'~' {
            continue;
        }
        let tilde_pos = stream.pos();
        let mut next = stream.peek_byte()?;
        while next.is_some_and(is_whitespace) {
            stream.skip(1);
            next = stream.peek_byte()?;
        }
        if next == Some(b'>') {
            stream.skip(1);
            found = true;
            break;
        }
        // "~" followed by whitespace and EI: the ">" is missing
        if stream.pos() > tilde_pos && stream.peek_bytes(Some(2))? == b"EI" {
            found = true;
            break;
        }
    }
    if !found {
        warn!("inline ASCII85Decode image: EOD marker not found, searching for EI instead");
        stream.set_pos(start_pos);
        return find_default_inline_stream_end(stream, known);
    }
    let length = stream.pos() - start_pos;
    inline_stream_skip_ei(stream)?;
    Ok(length)
}

fn find_ascii_hex_decode_inline_stream_end(
    stream: &mut dyn BaseStream,
    known: Option<&'static KnownCommands>,
) -> Result<usize> {
    let start_pos = stream.pos();
    let mut found = false;
    while let Some(ch) = stream.get_byte()? {
        if ch == b'>' {
            found = true;
            break;
        }
    }
    if !found {
        warn!("inline ASCIIHexDecode image: EOD marker not found, searching for EI instead");
        stream.set_pos(start_pos);
        return find_default_inline_stream_end(stream, known);
    }
    let length = stream.pos() - start_pos;
    inline_stream_skip_ei(stream)?;
    Ok(length)
}
