//! Byte sources and the lazy decoding framework.
//!
//! - `base` - the `BaseStream` contract and the in-memory `Stream`
//! - `chunked` - `ChunkedStream`, a source filled by range requests
//! - `decode` - `DecodeStream`, `BlockDecoder` and stream sequences

pub mod base;
pub mod chunked;
pub mod decode;

pub use base::{BaseStream, SourceRange, Stream};
pub use chunked::ChunkedStream;
pub use decode::{
    BlockDecoder, DecodeBuffer, DecodeState, DecodeStream, ReadStatus, StreamsSequenceStream,
};
