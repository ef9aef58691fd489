//! Content stream operations and inline images.

use quire_core::high_level::parse_content_stream;
use quire_core::parser::{ContentStreamParser, Operation};
use quire_core::{Obj, PdfError};

fn operators(ops: &[Operation]) -> Vec<&str> {
    ops.iter().map(|op| op.operator.as_str()).collect()
}

fn inline_image(data: &[u8]) -> Obj {
    let ops = parse_content_stream(data).unwrap();
    let ei = ops.iter().find(|op| op.operator.as_str() == "EI").unwrap();
    assert_eq!(ei.operands.len(), 1);
    ei.operands[0].clone()
}

#[test]
fn test_text_object_operations() {
    let ops = parse_content_stream(b"BT /F1 12 Tf 72 712 Td [(A) -120 (B)] TJ ET").unwrap();
    assert_eq!(operators(&ops), ["BT", "Tf", "Td", "TJ", "ET"]);
    assert_eq!(ops[1].operands, vec![Obj::Name("F1".into()), Obj::Int(12)]);
    assert_eq!(
        ops[3].operands,
        vec![Obj::Array(vec![
            Obj::String(b"A".to_vec()),
            Obj::Int(-120),
            Obj::String(b"B".to_vec()),
        ])]
    );
}

#[test]
fn test_extra_operands_go_to_the_next_short_operator() {
    let ops = parse_content_stream(b"1 2 3 w m").unwrap();
    assert_eq!(operators(&ops), ["w", "m"]);
    assert_eq!(ops[0].operands, vec![Obj::Int(3)]);
    assert_eq!(ops[1].operands, vec![Obj::Int(1), Obj::Int(2)]);
}

#[test]
fn test_operator_missing_operands_is_skipped() {
    let ops = parse_content_stream(b"q 10 re Q").unwrap();
    assert_eq!(operators(&ops), ["q", "Q"]);
}

#[test]
fn test_unknown_operator_is_ignored() {
    let ops = parse_content_stream(b"1 Xyz w").unwrap();
    assert_eq!(operators(&ops), ["w"]);
    assert_eq!(ops[0].operands, vec![Obj::Int(1)]);
}

#[test]
fn test_variable_operand_operators_keep_everything() {
    let ops = parse_content_stream(b"/P0 /Pattern 0.5 0.25 0 scn").unwrap();
    assert_eq!(operators(&ops), ["scn"]);
    assert_eq!(ops[0].operands.len(), 5);
}

#[test]
fn test_too_many_operands_is_an_error() {
    let data = "1 ".repeat(40) + "w";
    let result = parse_content_stream(data.as_bytes());
    assert!(matches!(result, Err(PdfError::SyntaxError(_))));
}

#[test]
fn test_parser_is_an_iterator() {
    let parser = ContentStreamParser::from_bytes(&b"q 1 0 0 1 5 5 cm Q"[..]).unwrap();
    let ops: Vec<Operation> = parser.map(Result::unwrap).collect();
    assert_eq!(operators(&ops), ["q", "cm", "Q"]);
    assert_eq!(ops[1].operands.len(), 6);
}

#[test]
fn test_inline_image_with_default_terminator() {
    let data = b"q BI /W 1 /H 1 /BPC 8 /CS /G ID \xff EI Q";
    let ops = parse_content_stream(data).unwrap();
    assert_eq!(operators(&ops), ["q", "EI", "Q"]);

    let image = ops[1].operands[0].as_stream().unwrap();
    let dict = image.dict().unwrap();
    assert_eq!(dict.get("W"), Some(&Obj::Int(1)));
    assert_eq!(dict.get("CS"), Some(&Obj::Name("G".into())));
    assert_eq!(image.get_all_bytes().unwrap(), [0xff]);
}

#[test]
fn test_inline_image_data_containing_ei() {
    // "EI" followed by binary data is part of the image
    let data = b"BI /W 4 /H 1 ID AEI\x01\x02\x03 EI Q";
    let image = inline_image(data);
    assert_eq!(
        image.as_stream().unwrap().get_all_bytes().unwrap(),
        b"AEI\x01\x02\x03"
    );
}

#[test]
fn test_inline_dct_image_ends_at_eoi() {
    let data = b"BI /W 1 /H 1 /F /DCT ID \xff\xd8\xff\xd9 EI Q";
    let image = inline_image(data);
    assert_eq!(
        image.as_stream().unwrap().get_all_bytes().unwrap(),
        [0xff, 0xd8, 0xff, 0xd9]
    );
}

#[test]
fn test_inline_dct_image_skips_marker_segments() {
    // the APP0 payload holds a fake EOI that must not end the image
    let data = b"BI /W 1 /H 1 /F /DCT ID \xff\xd8\xff\xe0\x00\x04\xff\xd9\xff\xd9 EI Q";
    let ops = parse_content_stream(data).unwrap();
    assert_eq!(operators(&ops), ["EI", "Q"]);
    let image = ops[0].operands[0].as_stream().unwrap();
    assert_eq!(
        image.get_all_bytes().unwrap(),
        [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x04, 0xff, 0xd9, 0xff, 0xd9]
    );
}

#[test]
fn test_inline_ascii85_image() {
    let data = b"BI /W 11 /H 1 /F /A85 ID 87cURD]i,\"Ebo7~> EI Q";
    let image = inline_image(data);
    assert_eq!(image.as_stream().unwrap().get_all_bytes().unwrap(), b"Hello World");
}

#[test]
fn test_inline_ascii_hex_image() {
    let data = b"BI /W 5 /H 1 /F [/AHx] ID 48656C6C6F> EI Q";
    let image = inline_image(data);
    assert_eq!(image.as_stream().unwrap().get_all_bytes().unwrap(), b"Hello");
}

#[test]
fn test_repeated_inline_image_is_cached() {
    let data = b"BI /W 1 /H 1 ID \x07 EI BI /W 1 /H 1 ID \x07 EI Q";
    let ops = parse_content_stream(data).unwrap();
    assert_eq!(operators(&ops), ["EI", "EI", "Q"]);
    let first = ops[0].operands[0].as_stream().unwrap();
    let second = ops[1].operands[0].as_stream().unwrap();
    assert!(first.ptr_eq(second));
    assert_eq!(second.get_all_bytes().unwrap(), [0x07]);
}

#[test]
fn test_operations_after_inline_image_continue() {
    let data = b"q BI /W 1 /H 1 ID \x00 EI Q 0 0 m 1 1 l S";
    let ops = parse_content_stream(data).unwrap();
    assert_eq!(operators(&ops), ["q", "EI", "Q", "m", "l", "S"]);
}
