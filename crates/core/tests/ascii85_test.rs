//! ASCII85 and ASCIIHex decoding, including the filters reached through the parser.

use quire_core::codec::{
    Ascii85Decoder, ascii85decode, ascii85encode, asciihexdecode, asciihexencode,
};
use quire_core::high_level::{decode_stream, parse_object};
use quire_core::stream::{BaseStream, Stream};

#[test]
fn test_ascii85decode_wikipedia() {
    assert_eq!(
        ascii85decode(b"9jqo^BlbD-BleB1DJ+*+F(f,q").unwrap(),
        b"Man is distinguished"
    );
}

#[test]
fn test_ascii85decode_with_eod() {
    assert_eq!(ascii85decode(b"E,9)oF*2M7/c~>").unwrap(), b"pleasure.");
}

#[test]
fn test_ascii85decode_z_encoding() {
    assert_eq!(
        ascii85decode(b"zE,9)oF*2M7/c~>").unwrap(),
        b"\0\0\0\0pleasure."
    );
}

#[test]
fn test_ascii85decode_no_eod() {
    assert_eq!(ascii85decode(b"E,9)oF*2M7/c").unwrap(), b"pleasure.");
}

#[test]
fn test_ascii85decode_partial_eod() {
    assert_eq!(ascii85decode(b"E,9)oF*2M7/c~").unwrap(), b"pleasure.");
}

#[test]
fn test_ascii85decode_with_prefix_and_newline() {
    assert_eq!(ascii85decode(b"<~E,9)oF*2M7/c~\n>").unwrap(), b"pleasure.");
}

#[test]
fn test_ascii85decode_leading_angle_is_data() {
    assert_eq!(
        ascii85decode(b"<^BVT:K:=9<E)pd;BS_1:/aSV;ag~>").unwrap(),
        b"VARIOUS UTTER NONSENSE"
    );
    assert_eq!(
        ascii85decode(b"<~<^BVT:K:=9<E)pd;BS_1:/aSV;ag~>").unwrap(),
        b"VARIOUS UTTER NONSENSE"
    );
}

#[test]
fn test_ascii85decode_whitespace_between_digits() {
    assert_eq!(
        ascii85decode(b"87cUR\r\nD]i,\"\tEbo7 ~>").unwrap(),
        b"Hello World"
    );
}

#[test]
fn test_ascii85_encoder_output_decodes() {
    let data = b"Hello World";
    let encoded = ascii85encode(data);
    assert_eq!(encoded, b"87cURD]i,\"Ebo7~>");
    assert_eq!(ascii85decode(&encoded).unwrap(), data);
}

#[test]
fn test_ascii85_stream_reads_incrementally() {
    let source = Box::new(Stream::from_bytes(&b"9jqo^BlbD-BleB1DJ+*+F(f,q"[..]));
    let mut stream = Ascii85Decoder::stream(source, Some(25));
    assert_eq!(stream.get_bytes(Some(3)).unwrap(), b"Man");
    assert_eq!(stream.get_byte().unwrap(), Some(b' '));
    assert_eq!(stream.get_bytes(None).unwrap(), b"is distinguished");
    assert_eq!(stream.get_byte().unwrap(), None);
}

#[test]
fn test_ascii85_filter_in_stream_object() {
    let data = b"<< /Length 21 /Filter /ASCII85Decode >>\nstream\n<~87cURD_*#4DfTZ)+T~>\nendstream";
    let obj = parse_object(data).unwrap();
    assert_eq!(decode_stream(&obj).unwrap(), b"Hello, World!");
}

#[test]
fn test_asciihexdecode() {
    assert_eq!(asciihexdecode(b"61 62 2e6364   65").unwrap(), b"ab.cde");
    assert_eq!(asciihexdecode(b"61 62 2e6364   657>").unwrap(), b"ab.cdep");
    assert_eq!(asciihexdecode(b"7>").unwrap(), b"p");
}

#[test]
fn test_asciihex_stops_at_eod() {
    assert_eq!(asciihexdecode(b"4142>4344").unwrap(), b"AB");
}

#[test]
fn test_asciihex_encoder() {
    assert_eq!(asciihexencode(b"\x01\xab"), b"01AB>");
    assert_eq!(asciihexdecode(&asciihexencode(b"quire")).unwrap(), b"quire");
}
