//! Pass-through streams for image codecs decoded outside this crate.
//!
//! The encoded bytes are buffered whole on the first pull; the stream keeps
//! the filter kind and its `/DecodeParms` so an image decoder can pick them
//! up from the stream.

use crate::error::Result;
use crate::model::objects::Dict;
use crate::stream::{BaseStream, BlockDecoder, DecodeBuffer, DecodeStream, SourceRange};
use std::fmt;

/// Image filters handled by an external decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFilter {
    Dct,
    Jpx,
    CcittFax,
    Jbig2,
}

impl ImageFilter {
    /// Filter for a full `/Filter` name (abbreviations are resolved by the parser).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DCTDecode" => Some(Self::Dct),
            "JPXDecode" => Some(Self::Jpx),
            "CCITTFaxDecode" => Some(Self::CcittFax),
            "JBIG2Decode" => Some(Self::Jbig2),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Dct => "DCTDecode",
            Self::Jpx => "JPXDecode",
            Self::CcittFax => "CCITTFaxDecode",
            Self::Jbig2 => "JBIG2Decode",
        }
    }
}

impl fmt::Display for ImageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoder that hands encoded image data through unchanged.
pub struct ImageDecoder {
    source: Box<dyn BaseStream>,
    filter: ImageFilter,
    params: Option<Dict>,
}

/// Stream of still-encoded image data.
pub type ImageStream = DecodeStream<ImageDecoder>;

impl ImageDecoder {
    pub fn stream(
        source: Box<dyn BaseStream>,
        maybe_length: Option<usize>,
        filter: ImageFilter,
        params: Option<Dict>,
    ) -> ImageStream {
        let dict = source.dict().cloned();
        let decoder = Self {
            source,
            filter,
            params,
        };
        DecodeStream::new(decoder, maybe_length).with_dict(dict)
    }

    pub fn filter(&self) -> ImageFilter {
        self.filter
    }

    /// The filter's `/DecodeParms`, e.g. `/K` and `/Columns` for fax data.
    pub fn params(&self) -> Option<&Dict> {
        self.params.as_ref()
    }
}

impl BlockDecoder for ImageDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        let data = self.source.get_bytes(None)?;
        out.extend_from_slice(&data);
        out.set_eof();
        Ok(())
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}
