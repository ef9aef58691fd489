//! One-call helpers for parsing objects and decoding streams from memory.

use crate::document::security::CipherTransformFactory;
use crate::document::xref::XRef;
use crate::error::Result;
use crate::model::objects::{Obj, Ref};
use crate::parser::{ContentStreamParser, Operation, Parser, ParserOptions};
use std::rc::Rc;

/// Parse the first object in `data`. Streams are allowed.
///
/// # Example
/// ```ignore
/// let obj = quire_core::api::parse_object(b"[1 2 0 R /Name (text)]")?;
/// ```
pub fn parse_object(data: &[u8]) -> Result<Obj> {
    let options = ParserOptions::default().allow_streams(true);
    let mut parser = Parser::from_bytes(data.to_vec(), None, options)?;
    parser.get_obj(None)
}

/// Parse `num gen obj ... endobj` from `data`.
///
/// With a `factory` the object's strings and streams are decrypted; `xref`
/// resolves indirect `/Length` values and filter entries.
pub fn parse_indirect_object(
    data: &[u8],
    factory: Option<&CipherTransformFactory>,
    xref: Option<Rc<dyn XRef>>,
) -> Result<(Ref, Obj)> {
    let options = ParserOptions::default().allow_streams(true);
    let mut parser = Parser::from_bytes(data.to_vec(), xref, options)?;
    parser.parse_indirect_object(None, factory)
}

/// All decoded bytes of a stream object.
pub fn decode_stream(obj: &Obj) -> Result<Vec<u8>> {
    obj.as_stream()?.get_all_bytes()
}

/// Every operation of a content stream.
pub fn parse_content_stream(data: &[u8]) -> Result<Vec<Operation>> {
    ContentStreamParser::from_bytes(data.to_vec())?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_stream_round_trip() {
        let obj =
            parse_object(b"<< /Length 11 /Filter /AHx >>\nstream\n68656C6C6F>\nendstream").unwrap();
        assert_eq!(decode_stream(&obj).unwrap(), b"hello");
    }

    #[test]
    fn indirect_object_header() {
        let (r, obj) = parse_indirect_object(b"7 0 obj\n(text)\nendobj", None, None).unwrap();
        assert_eq!(r, Ref::new(7, 0));
        assert_eq!(obj, Obj::String(b"text".to_vec()));
    }

    #[test]
    fn decode_stream_rejects_non_streams() {
        assert!(decode_stream(&Obj::Int(1)).is_err());
    }
}
