//! quire - PDF object parsing, stream decoding and decryption.
//!
//! Bytes come in through a `BaseStream`; the `Parser` turns them into `Obj`
//! values whose streams decode lazily through a chain of filters, with
//! decryption first when the document is encrypted.

pub mod api;
pub mod codec;
pub mod crypto;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;
pub mod stream;

pub use api::high_level;
pub use document::{CipherTransform, CipherTransformFactory, MemoryXRef, XRef};
pub use error::{PasswordResponse, PdfError, Result};
pub use model::{Cmd, Dict, Name, Obj, Ref, StreamRef};
pub use parser::{ContentStreamParser, Lexer, Operation, Parser, ParserOptions, Token};
pub use stream::{BaseStream, ChunkedStream, DecodeStream, Stream};
