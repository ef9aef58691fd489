//! Convenience entry points over the parser.
//!
//! # Example
//!
//! ```ignore
//! use quire_core::api::{decode_stream, parse_object};
//!
//! let obj = parse_object(b"<< /Length 5 /Filter /AHx >>\nstream\n68656C6C6F>\nendstream")?;
//! assert_eq!(decode_stream(&obj)?, b"hello");
//! ```

pub mod high_level;

pub use high_level::{decode_stream, parse_content_stream, parse_indirect_object, parse_object};
