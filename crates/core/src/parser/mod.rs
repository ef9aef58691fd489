//! PDF syntax.
//!
//! - `lexer`: tokenizer over a `BaseStream`
//! - `operators`: content stream operator table
//! - `params`: `ParserOptions`
//! - `parser`: object parser, stream construction and filter chains
//! - `content`: content stream operations

pub mod content;
pub mod lexer;
pub mod operators;
pub mod params;
#[allow(clippy::module_inception)]
pub mod parser;

pub use content::{ContentStreamParser, Operation};
pub use lexer::{Lexer, Token, tokenize};
pub use operators::{KNOWN_COMMANDS, KnownCommands, OpSpec, op_spec};
pub use params::ParserOptions;
pub use parser::Parser;
