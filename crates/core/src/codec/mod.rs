//! Stream filters.
//!
//! - `ascii85`: ASCII85 and ASCIIHex
//! - `flate`: zlib / deflate
//! - `image`: pass-through for externally decoded image formats
//! - `lzw`: LZW with `EarlyChange`
//! - `predictor`: TIFF and PNG predictors
//! - `runlength`: run-length decoding

pub mod ascii85;
pub mod flate;
pub mod image;
pub mod lzw;
pub mod predictor;
pub mod runlength;

pub use ascii85::{
    Ascii85Decoder, Ascii85Stream, AsciiHexDecoder, AsciiHexStream, ascii85decode, ascii85encode,
    asciihexdecode, asciihexencode,
};
pub use flate::{FlateDecoder, FlateStream, flatedecode};
pub use image::{ImageDecoder, ImageFilter, ImageStream};
pub use lzw::{LzwDecoder, LzwStream, lzwdecode, lzwdecode_with_earlychange};
pub use predictor::{PredictorDecoder, PredictorStream, make_predictor};
pub use runlength::{RunLengthDecoder, RunLengthStream, rldecode};
