//! Parser configuration.

/// Options for `Parser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Build stream objects for `<< ... >> stream`. Off for content
    /// streams and object streams, where streams may not appear.
    pub allow_streams: bool,

    /// Return what was parsed so far instead of failing on a premature end
    /// of input or on excessive nesting.
    pub recovery_mode: bool,

    /// Maximum nesting of arrays and dictionaries.
    pub max_depth: usize,

    /// Decrypt and decode stream data. When off, streams hand out the
    /// bytes between `stream` and `endstream` as stored in the file.
    pub decode_streams: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            allow_streams: false,
            recovery_mode: false,
            max_depth: 64,
            decode_streams: true,
        }
    }
}

impl ParserOptions {
    pub fn allow_streams(mut self, allow: bool) -> Self {
        self.allow_streams = allow;
        self
    }

    pub fn recovery_mode(mut self, recovery: bool) -> Self {
        self.recovery_mode = recovery;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn decode_streams(mut self, decode: bool) -> Self {
        self.decode_streams = decode;
        self
    }
}
