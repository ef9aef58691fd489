//! Tokenizer behaviour on well-formed and damaged input.

use quire_core::model::{Cmd, Name};
use quire_core::parser::{KNOWN_COMMANDS, Lexer, Token, tokenize};
use quire_core::stream::{BaseStream, Stream};
use quire_core::PdfError;

fn cmd(s: &str) -> Token {
    Token::Cmd(Cmd::new(s))
}

fn name(s: &str) -> Token {
    Token::Name(Name::new(s))
}

#[test]
fn test_tokenize_object_syntax() {
    let tokens = tokenize(b"<< /Type /Page /Kids [1 0 R] /Rotate -90 /Scale 0.5 >>", None).unwrap();
    assert_eq!(
        tokens,
        vec![
            cmd("<<"),
            name("Type"),
            name("Page"),
            name("Kids"),
            cmd("["),
            Token::Int(1),
            Token::Int(0),
            cmd("R"),
            cmd("]"),
            name("Rotate"),
            Token::Int(-90),
            name("Scale"),
            Token::Real(0.5),
            cmd(">>"),
        ]
    );
}

#[test]
fn test_keywords_become_values() {
    let tokens = tokenize(b"true false null", None).unwrap();
    assert_eq!(tokens, vec![Token::Bool(true), Token::Bool(false), Token::Null]);
}

#[test]
fn test_literal_string_escapes() {
    let tokens = tokenize(b"(a\\nb\\(c\\)\\\\ \\053 \\0053)", None).unwrap();
    assert_eq!(tokens, vec![Token::String(b"a\nb(c)\\ + \x053".to_vec())]);
}

#[test]
fn test_literal_string_nested_parens() {
    let tokens = tokenize(b"(outer (inner) done)", None).unwrap();
    assert_eq!(tokens, vec![Token::String(b"outer (inner) done".to_vec())]);
}

#[test]
fn test_hex_string_odd_digit_count() {
    let tokens = tokenize(b"<901FA>", None).unwrap();
    assert_eq!(tokens, vec![Token::String(vec![0x90, 0x1f, 0xa0])]);
}

#[test]
fn test_name_with_hex_escape() {
    let tokens = tokenize(b"/Adobe#20Green /Lime#20Green", None).unwrap();
    assert_eq!(tokens, vec![name("Adobe Green"), name("Lime Green")]);
}

#[test]
fn test_empty_name() {
    let tokens = tokenize(b"/ 1", None).unwrap();
    assert_eq!(tokens, vec![name(""), Token::Int(1)]);
}

#[test]
fn test_comment_runs_to_end_of_line() {
    let tokens = tokenize(b"1 % comment ] >>\r2", None).unwrap();
    assert_eq!(tokens, vec![Token::Int(1), Token::Int(2)]);
}

#[test]
fn test_number_forms() {
    let tokens = tokenize(b"+17 -.002 34.5 4. 0.0 -0", None).unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Int(17),
            Token::Real(-0.002),
            Token::Real(34.5),
            Token::Real(4.0),
            Token::Real(0.0),
            Token::Int(0),
        ]
    );
}

#[test]
fn test_number_with_line_break_after_sign() {
    let tokens = tokenize(b"-\n12", None).unwrap();
    assert_eq!(tokens, vec![Token::Int(-12)]);
}

#[test]
fn test_invalid_number_is_a_token_error() {
    match tokenize(b"+x", None) {
        Err(PdfError::TokenError { pos, .. }) => assert!(pos > 0),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_stray_close_paren_is_an_error() {
    assert!(matches!(tokenize(b"1 )", None), Err(PdfError::TokenError { .. })));
}

#[test]
fn test_content_operators_without_separators() {
    let tokens = tokenize(b"qBT/F1 1 Tf[(a)]TJ ETQ", Some(&KNOWN_COMMANDS)).unwrap();
    assert_eq!(
        tokens,
        vec![
            cmd("q"),
            cmd("BT"),
            name("F1"),
            Token::Int(1),
            cmd("Tf"),
            cmd("["),
            Token::String(b"a".to_vec()),
            cmd("]"),
            cmd("TJ"),
            cmd("ET"),
            cmd("Q"),
        ]
    );
}

#[test]
fn test_unknown_keyword_without_table_runs_to_delimiter() {
    let tokens = tokenize(b"qBT", None).unwrap();
    assert_eq!(tokens, vec![cmd("qBT")]);
}

#[test]
fn test_lexer_leaves_stream_after_token() {
    let stream = Box::new(Stream::from_bytes(&b"stream\r\nDATA"[..]));
    let mut lexer = Lexer::new(stream, None).unwrap();
    assert_eq!(lexer.get_obj().unwrap(), cmd("stream"));
    lexer.skip_to_next_line().unwrap();
    assert_eq!(lexer.current_char(), Some(b'D'));
    assert_eq!(lexer.stream().pos(), 9);
}

#[test]
fn test_begin_inline_image_position() {
    let stream = Box::new(Stream::from_bytes(&b"q BI /W 1"[..]));
    let mut lexer = Lexer::new(stream, Some(&KNOWN_COMMANDS)).unwrap();
    assert_eq!(lexer.get_obj().unwrap(), cmd("q"));
    assert_eq!(lexer.begin_inline_image_pos(), None);
    assert_eq!(lexer.get_obj().unwrap(), cmd("BI"));
    assert_eq!(lexer.begin_inline_image_pos(), Some(5));
}
