//! PDF tokenizer.
//!
//! `Lexer` reads one token per `get_obj` call from a `BaseStream`. It keeps a
//! single byte of lookahead (`current_char`), so after a token has been read
//! the underlying stream is positioned one byte past the token's end.

use super::operators::KnownCommands;
use crate::error::{PdfError, Result};
use crate::model::objects::{Cmd, Name, Obj};
use crate::stream::BaseStream;
use tracing::{info, warn};

const MAX_HEX_STRING_WARNINGS: usize = 5;
const MAX_COMMAND_LENGTH: usize = 128;
const MAX_NAME_LENGTH: usize = 127;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Eof,
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    String(Vec<u8>),
    Name(Name),
    /// Keyword or delimiter (`[`, `<<`, `obj`, `Tf`, ...)
    Cmd(Cmd),
}

impl Token {
    pub fn is_cmd(&self, cmd: &str) -> bool {
        matches!(self, Self::Cmd(c) if c.as_str() == cmd)
    }

    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// The token as an object. `Eof` becomes `Null`.
    pub fn into_obj(self) -> Obj {
        match self {
            Self::Eof | Self::Null => Obj::Null,
            Self::Bool(b) => Obj::Bool(b),
            Self::Int(n) => Obj::Int(n),
            Self::Real(n) => Obj::Real(n),
            Self::String(s) => Obj::String(s),
            Self::Name(n) => Obj::Name(n),
            Self::Cmd(c) => Obj::Cmd(c),
        }
    }
}

#[inline]
pub(crate) const fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

#[inline]
const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline]
const fn is_special(b: u8) -> bool {
    is_whitespace(b) || is_delimiter(b)
}

const fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

pub struct Lexer {
    stream: Box<dyn BaseStream>,
    current: Option<u8>,
    buf: Vec<u8>,
    known_commands: Option<&'static KnownCommands>,
    hex_warnings: usize,
    quiet: bool,
    begin_inline_image_pos: Option<usize>,
}

impl Lexer {
    /// Start tokenizing `stream` at its current position.
    ///
    /// `known_commands` should be given for content streams; without it
    /// keywords run until the next whitespace or delimiter.
    pub fn new(
        mut stream: Box<dyn BaseStream>,
        known_commands: Option<&'static KnownCommands>,
    ) -> Result<Self> {
        let current = stream.get_byte()?;
        Ok(Self {
            stream,
            current,
            buf: Vec::with_capacity(64),
            known_commands,
            hex_warnings: 0,
            quiet: false,
            begin_inline_image_pos: None,
        })
    }

    pub fn stream(&self) -> &dyn BaseStream {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> &mut dyn BaseStream {
        self.stream.as_mut()
    }

    pub fn into_stream(self) -> Box<dyn BaseStream> {
        self.stream
    }

    pub fn known_commands(&self) -> Option<&'static KnownCommands> {
        self.known_commands
    }

    /// The lookahead byte, `None` at end of input.
    pub fn current_char(&self) -> Option<u8> {
        self.current
    }

    /// Stream position right after the most recent `BI` keyword.
    pub fn begin_inline_image_pos(&self) -> Option<usize> {
        self.begin_inline_image_pos
    }

    /// Suppress the invalid hex digit warnings (used by throwaway lexers).
    pub(crate) fn silence_warnings(&mut self) {
        self.quiet = true;
    }

    pub fn next_char(&mut self) -> Result<Option<u8>> {
        self.current = self.stream.get_byte()?;
        Ok(self.current)
    }

    pub fn peek_char(&mut self) -> Result<Option<u8>> {
        self.stream.peek_byte()
    }

    fn error(&self, msg: impl Into<String>) -> PdfError {
        PdfError::TokenError {
            pos: self.stream.pos(),
            msg: msg.into(),
        }
    }

    fn get_number(&mut self) -> Result<Token> {
        let mut ch = self.current;
        let mut negative = false;
        match ch {
            Some(b'-') => {
                negative = true;
                ch = self.next_char()?;
                // "--5" is read as "-5"
                if ch == Some(b'-') {
                    ch = self.next_char()?;
                }
            }
            Some(b'+') => ch = self.next_char()?,
            _ => {}
        }
        while matches!(ch, Some(b'\n' | b'\r')) {
            ch = self.next_char()?;
        }
        let mut divide_by = 0.0f64;
        if ch == Some(b'.') {
            divide_by = 10.0;
            ch = self.next_char()?;
        }
        let first = match ch {
            Some(c @ b'0'..=b'9') => c - b'0',
            other => {
                let shown = other.map_or_else(|| "EOF".to_string(), |c| format!("{:?}", char::from(c)));
                if other.is_none_or(|c| is_whitespace(c) || c == b'(' || c == b'<') {
                    info!(found = %shown, "invalid number, using 0");
                    return Ok(Token::Int(0));
                }
                return Err(self.error(format!("invalid number: {shown}")));
            }
        };

        let mut value = f64::from(first);
        let mut int_value = Some(i64::from(first));
        let mut e_notation = false;
        let mut power = 0i32;
        let mut power_negative = false;
        while let Some(c) = self.next_char()? {
            match c {
                b'0'..=b'9' => {
                    let digit = c - b'0';
                    if e_notation {
                        power = power.saturating_mul(10).saturating_add(i32::from(digit));
                    } else {
                        if divide_by != 0.0 {
                            divide_by *= 10.0;
                        }
                        value = value * 10.0 + f64::from(digit);
                        int_value = int_value
                            .and_then(|v| v.checked_mul(10))
                            .and_then(|v| v.checked_add(i64::from(digit)));
                    }
                }
                b'.' => {
                    if divide_by == 0.0 {
                        divide_by = 1.0;
                    } else {
                        break;
                    }
                }
                b'-' => {
                    warn!(pos = self.stream.pos(), "badly formatted number: minus sign in the middle");
                }
                b'e' | b'E' => {
                    match self.peek_char()? {
                        Some(sign @ (b'+' | b'-')) => {
                            power_negative = sign == b'-';
                            self.next_char()?;
                        }
                        Some(b'0'..=b'9') => {}
                        _ => break,
                    }
                    e_notation = true;
                }
                _ => break,
            }
        }

        if divide_by == 0.0 && !e_notation {
            if let Some(n) = int_value {
                return Ok(Token::Int(if negative { -n } else { n }));
            }
        }
        if divide_by != 0.0 {
            value /= divide_by;
        }
        if e_notation {
            value *= 10f64.powi(if power_negative { -power } else { power });
        }
        Ok(Token::Real(if negative { -value } else { value }))
    }

    fn get_string(&mut self) -> Result<Token> {
        let mut depth = 1usize;
        self.buf.clear();
        let mut ch = self.next_char()?;
        loop {
            let mut buffered = false;
            match ch {
                None => {
                    warn!("unterminated string");
                    break;
                }
                Some(b'(') => {
                    depth += 1;
                    self.buf.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth == 0 {
                        self.next_char()?;
                        break;
                    }
                    self.buf.push(b')');
                }
                Some(b'\\') => {
                    ch = self.next_char()?;
                    match ch {
                        None => {
                            warn!("unterminated string");
                            break;
                        }
                        Some(b'n') => self.buf.push(b'\n'),
                        Some(b'r') => self.buf.push(b'\r'),
                        Some(b't') => self.buf.push(b'\t'),
                        Some(b'b') => self.buf.push(0x08),
                        Some(b'f') => self.buf.push(0x0c),
                        Some(c @ (b'\\' | b'(' | b')')) => self.buf.push(c),
                        Some(c @ b'0'..=b'7') => {
                            let mut x = u32::from(c & 0x0f);
                            ch = self.next_char()?;
                            buffered = true;
                            if let Some(c2 @ b'0'..=b'7') = ch {
                                x = (x << 3) + u32::from(c2 & 0x0f);
                                ch = self.next_char()?;
                                if let Some(c3 @ b'0'..=b'7') = ch {
                                    buffered = false;
                                    x = (x << 3) + u32::from(c3 & 0x0f);
                                }
                            }
                            self.buf.push((x & 0xff) as u8);
                        }
                        Some(b'\r') => {
                            if self.peek_char()? == Some(b'\n') {
                                self.next_char()?;
                            }
                        }
                        Some(b'\n') => {}
                        Some(c) => self.buf.push(c),
                    }
                }
                Some(c) => self.buf.push(c),
            }
            if !buffered {
                ch = self.next_char()?;
            }
        }
        Ok(Token::String(self.buf.clone()))
    }

    fn get_name(&mut self) -> Result<Token> {
        self.buf.clear();
        loop {
            let Some(c) = self.next_char()? else {
                break;
            };
            if is_special(c) {
                break;
            }
            if c != b'#' {
                self.buf.push(c);
                continue;
            }
            let Some(c1) = self.next_char()? else {
                self.buf.push(b'#');
                break;
            };
            if is_special(c1) {
                warn!("name: '#' should be followed by a hexadecimal number");
                self.buf.push(b'#');
                break;
            }
            let Some(high) = hex_digit(c1) else {
                self.buf.extend_from_slice(&[b'#', c1]);
                continue;
            };
            let c2 = self.next_char()?;
            match c2.and_then(hex_digit) {
                Some(low) => self.buf.push(high << 4 | low),
                None => {
                    warn!(digit = ?c2.map(char::from), "name: illegal digit in hexadecimal number");
                    self.buf.extend_from_slice(&[b'#', c1]);
                    match c2 {
                        Some(c2) if !is_special(c2) => self.buf.push(c2),
                        _ => break,
                    }
                }
            }
        }
        if self.buf.len() > MAX_NAME_LENGTH {
            warn!(length = self.buf.len(), "name token is longer than allowed");
        }
        Ok(Token::Name(Name::from_bytes(&self.buf)))
    }

    fn hex_string_warning(&mut self, ch: u8) {
        if self.quiet {
            return;
        }
        self.hex_warnings += 1;
        if self.hex_warnings > MAX_HEX_STRING_WARNINGS {
            return;
        }
        if self.hex_warnings == MAX_HEX_STRING_WARNINGS {
            warn!("hex string: ignoring additional invalid characters");
            return;
        }
        warn!(ch, "hex string: ignoring invalid character");
    }

    fn get_hex_string(&mut self) -> Result<Token> {
        self.buf.clear();
        self.hex_warnings = 0;
        let mut ch = self.current;
        let mut high: Option<u8> = None;
        loop {
            match ch {
                None => {
                    warn!("unterminated hex string");
                    break;
                }
                Some(b'>') => {
                    self.next_char()?;
                    break;
                }
                Some(c) if is_whitespace(c) => {}
                Some(c) => match hex_digit(c) {
                    None => self.hex_string_warning(c),
                    Some(digit) => match high.take() {
                        Some(h) => self.buf.push(h << 4 | digit),
                        None => high = Some(digit),
                    },
                },
            }
            ch = self.next_char()?;
        }
        if let Some(h) = high {
            self.buf.push(h << 4);
        }
        Ok(Token::String(self.buf.clone()))
    }

    fn get_command(&mut self, first: u8) -> Result<Token> {
        self.buf.clear();
        self.buf.push(first);
        if !(0x20..=0x7f).contains(&first) {
            if let Some(next) = self.peek_char()? {
                if (0x20..=0x7f).contains(&next) {
                    self.next_char()?;
                    return Ok(Token::Cmd(Cmd::from_bytes(&self.buf)));
                }
            }
        }
        let known = self.known_commands;
        let is_known = |word: &[u8]| {
            known.is_some_and(|table| {
                std::str::from_utf8(word).is_ok_and(|word| table.contains_key(word))
            })
        };
        let mut found = is_known(&self.buf);
        while let Some(c) = self.next_char()? {
            if is_special(c) {
                break;
            }
            if self.buf.len() == MAX_COMMAND_LENGTH {
                return Err(self.error(format!(
                    "command token too long: {}",
                    self.buf.len()
                )));
            }
            self.buf.push(c);
            if found && !is_known(&self.buf) {
                // `c` starts the next token
                self.buf.pop();
                break;
            }
            found = is_known(&self.buf);
        }
        match self.buf.as_slice() {
            b"true" => return Ok(Token::Bool(true)),
            b"false" => return Ok(Token::Bool(false)),
            b"null" => return Ok(Token::Null),
            b"BI" => self.begin_inline_image_pos = Some(self.stream.pos()),
            _ => {}
        }
        Ok(Token::Cmd(Cmd::from_bytes(&self.buf)))
    }

    /// Read the next token, skipping whitespace and comments.
    pub fn get_obj(&mut self) -> Result<Token> {
        let mut comment = false;
        let mut ch = self.current;
        let c = loop {
            let Some(c) = ch else {
                return Ok(Token::Eof);
            };
            if comment {
                if c == b'\n' || c == b'\r' {
                    comment = false;
                }
            } else if c == b'%' {
                comment = true;
            } else if !is_whitespace(c) {
                break c;
            }
            ch = self.next_char()?;
        };

        match c {
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.get_number(),
            b'(' => self.get_string(),
            b'/' => self.get_name(),
            b'[' | b']' | b'{' | b'}' => {
                self.next_char()?;
                Ok(Token::Cmd(Cmd::from_bytes(&[c])))
            }
            b'<' => {
                if self.next_char()? == Some(b'<') {
                    self.next_char()?;
                    return Ok(Token::Cmd(Cmd::new("<<")));
                }
                self.get_hex_string()
            }
            b'>' => {
                if self.next_char()? == Some(b'>') {
                    self.next_char()?;
                    return Ok(Token::Cmd(Cmd::new(">>")));
                }
                Ok(Token::Cmd(Cmd::new(">")))
            }
            b')' => {
                self.next_char()?;
                Err(self.error("illegal character: ')'"))
            }
            _ => self.get_command(c),
        }
    }

    /// Consume input up to and including the next end of line.
    pub fn skip_to_next_line(&mut self) -> Result<()> {
        let mut ch = self.current;
        while let Some(c) = ch {
            if c == b'\r' {
                if self.next_char()? == Some(b'\n') {
                    self.next_char()?;
                }
                break;
            }
            if c == b'\n' {
                self.next_char()?;
                break;
            }
            ch = self.next_char()?;
        }
        Ok(())
    }
}

/// Tokenize `data` to the end. Handy for tests and dumps.
pub fn tokenize(data: &[u8], known_commands: Option<&'static KnownCommands>) -> Result<Vec<Token>> {
    let stream = Box::new(crate::stream::Stream::from_bytes(data.to_vec()));
    let mut lexer = Lexer::new(stream, known_commands)?;
    let mut tokens = Vec::new();
    loop {
        match lexer.get_obj()? {
            Token::Eof => return Ok(tokens),
            token => tokens.push(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::operators::KNOWN_COMMANDS;

    fn single(data: &[u8]) -> Token {
        let tokens = tokenize(data, None).unwrap();
        assert_eq!(tokens.len(), 1, "{tokens:?}");
        tokens.into_iter().next().unwrap()
    }

    #[test]
    fn numbers() {
        assert_eq!(single(b"123"), Token::Int(123));
        assert_eq!(single(b"-98"), Token::Int(-98));
        assert_eq!(single(b"--5"), Token::Int(-5));
        assert_eq!(single(b".5"), Token::Real(0.5));
        assert_eq!(single(b"-3.25"), Token::Real(-3.25));
        assert_eq!(single(b"1.5e2"), Token::Real(150.0));
        assert_eq!(single(b"5-"), Token::Int(5));
        assert_eq!(single(b"- "), Token::Int(0));
        assert!(tokenize(b"-x", None).is_err());
    }

    #[test]
    fn exponent_needs_digits() {
        let tokens = tokenize(b"1e", None).unwrap();
        assert_eq!(tokens, vec![Token::Int(1), Token::Cmd(Cmd::new("e"))]);
    }

    #[test]
    fn literal_strings() {
        assert_eq!(single(b"(a(b)c)"), Token::String(b"a(b)c".to_vec()));
        assert_eq!(single(b"(\\101\\1012)"), Token::String(b"AA2".to_vec()));
        assert_eq!(single(b"(line\\\r\nnext)"), Token::String(b"linenext".to_vec()));
        assert_eq!(single(b"(\\q)"), Token::String(b"q".to_vec()));
        assert_eq!(single(b"(open"), Token::String(b"open".to_vec()));
    }

    #[test]
    fn hex_strings_and_names() {
        assert_eq!(single(b"<48 65 6c6C 6>"), Token::String(b"Hell`".to_vec()));
        assert_eq!(single(b"<4x1>"), Token::String(vec![0x41]));
        assert_eq!(single(b"/A#20B"), Token::Name(Name::new("A B")));
        assert_eq!(single(b"/A#zB"), Token::Name(Name::new("A#zB")));
    }

    #[test]
    fn known_commands_split_prefixes() {
        let tokens = tokenize(b"f*false n", Some(&KNOWN_COMMANDS)).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Cmd(Cmd::new("f*")),
                Token::Bool(false),
                Token::Cmd(Cmd::new("n")),
            ]
        );
        let tokens = tokenize(b"BTET", Some(&KNOWN_COMMANDS)).unwrap();
        assert_eq!(tokens, vec![Token::Cmd(Cmd::new("BT")), Token::Cmd(Cmd::new("ET"))]);
    }

    #[test]
    fn comments_and_delimiters() {
        let tokens = tokenize(b"% hello\n<<[]>>", None).unwrap();
        let cmds: Vec<_> = tokens.iter().map(|t| matches!(t, Token::Cmd(_))).collect();
        assert_eq!(cmds, vec![true; 4]);
        assert!(tokenize(b")", None).is_err());
    }
}
