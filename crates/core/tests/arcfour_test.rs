//! RC4 known answers.

use quire_core::crypto::Arcfour;
use quire_core::crypto::cipher::Cipher;

#[test]
fn test_arcfour_key() {
    let mut cipher = Arcfour::new(b"Key");
    assert_eq!(hex::encode(cipher.process(b"Plaintext")), "bbf316e8d940af0ad3");
}

#[test]
fn test_arcfour_wiki() {
    let mut cipher = Arcfour::new(b"Wiki");
    assert_eq!(hex::encode(cipher.process(b"pedia")), "1021bf0420");
}

#[test]
fn test_arcfour_secret() {
    let mut cipher = Arcfour::new(b"Secret");
    assert_eq!(
        hex::encode(cipher.process(b"Attack at dawn")),
        "45a01f645fc35b383552544b9bf5"
    );
}

#[test]
fn test_arcfour_keystream_continues_across_calls() {
    let mut whole = Arcfour::new(b"Secret");
    let expected = whole.process(b"Attack at dawn");

    let mut split = Arcfour::new(b"Secret");
    let mut out = split.decrypt_block(b"Attack", false);
    out.extend(split.decrypt_block(b" at dawn", true));
    assert_eq!(out, expected);
}

#[test]
fn test_arcfour_is_symmetric() {
    let ciphertext = Arcfour::new(b"k").encrypt(b"round trip", None);
    assert_eq!(Arcfour::new(b"k").decrypt_block(&ciphertext, true), b"round trip");
}
