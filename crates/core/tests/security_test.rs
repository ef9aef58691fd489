//! Standard security handler: password checks, key derivation and
//! decryption of parsed objects.

use quire_core::crypto::cipher::CipherKind;
use quire_core::document::AuthenticatedAs;
use quire_core::high_level::{decode_stream, parse_indirect_object};
use quire_core::{CipherTransformFactory, Dict, Name, Obj, PasswordResponse, PdfError};

// rc4-40.pdf: V=1, R=2, 40-bit key, owner password "foo", user password "baz"
const RC4_40_O: [u8; 32] = [
    1, 169, 240, 206, 242, 141, 0, 248, 223, 176, 37, 143, 94, 240, 197, 92, 157, 247, 200, 22,
    149, 143, 54, 49, 0, 175, 119, 236, 2, 38, 36, 84,
];
const RC4_40_U: [u8; 32] = [
    105, 75, 157, 162, 248, 9, 199, 124, 114, 119, 140, 251, 202, 194, 4, 129, 178, 114, 5, 208,
    231, 211, 34, 98, 54, 130, 131, 100, 102, 106, 151, 8,
];
const DOCID: [u8; 16] = [
    101, 26, 148, 254, 235, 120, 104, 211, 18, 169, 123, 55, 114, 112, 134, 14,
];

// rc4-128.pdf: V=2, R=3, 128-bit key, password "foo"
const RC4_128_O: [u8; 32] = [
    208, 72, 209, 82, 158, 83, 93, 24, 132, 205, 56, 86, 54, 123, 24, 75, 74, 144, 223, 1, 230, 55,
    209, 110, 202, 6, 91, 175, 78, 100, 144, 11,
];
const RC4_128_U: [u8; 32] = [
    9, 52, 18, 54, 59, 157, 50, 124, 122, 197, 1, 68, 199, 199, 85, 241, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0,
];

// aes-256.pdf: V=5, R=5, password "foo"
const AES256_O: [u8; 48] = [
    197, 126, 60, 46, 218, 22, 190, 91, 132, 46, 198, 222, 145, 49, 111, 125, 24, 147, 223, 122, 6,
    21, 159, 78, 155, 195, 49, 220, 252, 161, 203, 182, 215, 56, 115, 236, 23, 247, 193, 14, 39,
    184, 210, 207, 56, 201, 114, 199,
];
const AES256_U: [u8; 48] = [
    179, 236, 138, 87, 238, 76, 63, 44, 188, 66, 38, 224, 89, 1, 136, 216, 233, 86, 206, 51, 43,
    103, 248, 173, 26, 183, 85, 55, 229, 239, 180, 149, 88, 136, 28, 124, 249, 186, 223, 59, 180,
    7, 178, 19, 84, 51, 249, 188,
];
const AES256_OE: [u8; 32] = [
    91, 206, 49, 194, 37, 90, 49, 81, 128, 220, 14, 148, 72, 121, 213, 222, 45, 98, 227, 35, 15,
    76, 191, 10, 54, 211, 184, 43, 81, 250, 80, 231,
];
const AES256_UE: [u8; 32] = [
    121, 209, 78, 72, 9, 195, 93, 96, 16, 97, 189, 216, 198, 84, 195, 205, 125, 73, 208, 81, 173,
    33, 196, 195, 9, 4, 57, 3, 226, 247, 31, 8,
];

// V=4, R=4, AESV2, owner "owner", user "user", file ID 00..0f, P=-3904
const AESV2_O: &str = "0ba3835f88f90388e74e54584125ce142be0de24c6b0d37746e075b891756671";
const AESV2_U: &str = "b8d04c0b647956d75df3b1f5a437ef9700000000000000000000000000000000";
const AESV2_KEY: &str = "ebc53cf170c71152a5ba9925bd0fefc3";

// V=4, R=4, V2 crypt filter with a 40-bit key, owner "owner", user "user", file ID 00..0f
const RC4_V4_40_O: &str = "3c482162008fafcb228b7db3c43a1090bc5b56e9b1556e89fc0656fd291f4908";
const RC4_V4_40_U: &str = "3135d7fbc422c3691b1f98a888f5ca9500000000000000000000000000000000";

// V=5, R=6, owner "owner", user "user", file key a0..bf
const R6_O: &str = "8a315bf69dd058f051451db82b059609a733a4f9f4ebc58b17c6de8eccea32844f5653414c5430314f4b53414c543031";
const R6_U: &str = "2767bfdcbf33c97e7801a89cb7525250849f8643c4783ca21967491d65b0a9de555653414c543031554b53414c543031";
const R6_OE: &str = "b26927b52cabbf586d6e191003810c7d630c943f9b85cf6137eea31ccace6124";
const R6_UE: &str = "74b3e76bafad3cec39c3afc0d03c29976127bac1fe11787a4a23dd622090e2ec";
const R6_KEY: &str = "a0a1a2a3a4a5a6a7a8a9aaabacadaeafb0b1b2b3b4b5b6b7b8b9babbbcbdbebf";

fn name(value: &str) -> Obj {
    Obj::Name(Name::new(value))
}

fn legacy_dict(v: i64, r: i64, length: i64, o: &[u8], u: &[u8]) -> Dict {
    let mut dict = Dict::new(None);
    dict.set("Filter", name("Standard"));
    dict.set("V", Obj::Int(v));
    dict.set("R", Obj::Int(r));
    dict.set("P", Obj::Int(-4));
    dict.set("Length", Obj::Int(length));
    dict.set("O", Obj::String(o.to_vec()));
    dict.set("U", Obj::String(u.to_vec()));
    dict
}

fn crypt_filters(dict: &mut Dict, method: &str, length: i64) {
    let mut std_cf = Dict::new(None);
    std_cf.set("CFM", name(method));
    std_cf.set("Length", Obj::Int(length));
    std_cf.set("AuthEvent", name("DocOpen"));
    let mut cf = Dict::new(None);
    cf.set("StdCF", Obj::Dict(std_cf));
    dict.set("CF", Obj::Dict(cf));
    dict.set("StmF", name("StdCF"));
    dict.set("StrF", name("StdCF"));
}

fn aes256_dict(r: i64, o: &[u8], u: &[u8], oe: &[u8], ue: &[u8]) -> Dict {
    let mut dict = legacy_dict(5, r, 256, o, u);
    dict.set("OE", Obj::String(oe.to_vec()));
    dict.set("UE", Obj::String(ue.to_vec()));
    crypt_filters(&mut dict, "AESV3", 32);
    dict
}

fn aesv2_dict() -> Dict {
    let mut dict = legacy_dict(
        4,
        4,
        128,
        &hex::decode(AESV2_O).unwrap(),
        &hex::decode(AESV2_U).unwrap(),
    );
    dict.set("P", Obj::Int(-3904));
    crypt_filters(&mut dict, "AESV2", 16);
    dict
}

fn r6_dict() -> Dict {
    aes256_dict(
        6,
        &hex::decode(R6_O).unwrap(),
        &hex::decode(R6_U).unwrap(),
        &hex::decode(R6_OE).unwrap(),
        &hex::decode(R6_UE).unwrap(),
    )
}

fn file_id_00_0f() -> Vec<u8> {
    (0..16).collect()
}

fn password_error(result: Result<CipherTransformFactory, PdfError>) -> PasswordResponse {
    match result {
        Err(PdfError::Password(response)) => response,
        other => panic!("expected a password error, got {other:?}"),
    }
}

// --- legacy RC4 ---

#[test]
fn test_rc4_40_owner_password() {
    let dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    let factory = CipherTransformFactory::new(&dict, &DOCID, Some("foo")).unwrap();
    assert_eq!(factory.authenticated_as(), AuthenticatedAs::Owner);
    assert_eq!(hex::encode(factory.encryption_key()), "115e6afda4");
}

#[test]
fn test_rc4_40_user_password() {
    let dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    let factory = CipherTransformFactory::new(&dict, &DOCID, Some("baz")).unwrap();
    assert_eq!(factory.authenticated_as(), AuthenticatedAs::User);
    assert_eq!(hex::encode(factory.encryption_key()), "115e6afda4");
}

#[test]
fn test_rc4_40_wrong_password() {
    let dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    let result = CipherTransformFactory::new(&dict, &DOCID, Some("wrong"));
    assert_eq!(password_error(result), PasswordResponse::IncorrectPassword);
}

#[test]
fn test_rc4_40_missing_password() {
    let dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    let result = CipherTransformFactory::new(&dict, &DOCID, None);
    assert_eq!(password_error(result), PasswordResponse::NeedPassword);
    let result = CipherTransformFactory::new(&dict, &DOCID, Some(""));
    assert_eq!(password_error(result), PasswordResponse::NeedPassword);
}

#[test]
fn test_rc4_128_correct_password() {
    let dict = legacy_dict(2, 3, 128, &RC4_128_O, &RC4_128_U);
    let factory = CipherTransformFactory::new(&dict, &DOCID, Some("foo")).unwrap();
    assert_eq!(factory.encryption_key().len(), 16);
    assert_eq!(factory.revision(), 3);
}

#[test]
fn test_rc4_128_wrong_password() {
    let dict = legacy_dict(2, 3, 128, &RC4_128_O, &RC4_128_U);
    assert!(CipherTransformFactory::new(&dict, &DOCID, Some("wrong")).is_err());
}

#[test]
fn test_object_keys_depend_on_number_and_generation() {
    let dict = legacy_dict(2, 3, 128, &RC4_128_O, &RC4_128_U);
    let factory = CipherTransformFactory::new(&dict, &DOCID, Some("foo")).unwrap();
    let a = factory.create_cipher_transform(1, 0).unwrap();
    let b = factory.create_cipher_transform(2, 0).unwrap();
    let c = factory.create_cipher_transform(1, 1).unwrap();
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert!(matches!(a.string_cipher(), CipherKind::Rc4(key) if key.len() == 16));
}

#[test]
fn test_legacy_decrypt_string() {
    let dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    let factory = CipherTransformFactory::new(&dict, &DOCID, Some("baz")).unwrap();
    let transform = factory.create_cipher_transform(1, 0).unwrap();
    let ciphertext = hex::decode("9fea2e4b559ccd5ac4083f18f0").unwrap();
    assert_eq!(transform.decrypt_string(&ciphertext), b"Hello, World!");
    assert_eq!(transform.encrypt_string(b"Hello, World!"), ciphertext);
}

#[test]
fn test_rc4_40_object_matches_plain_control() {
    let dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    let factory = CipherTransformFactory::new(&dict, &DOCID, Some("foo")).unwrap();

    let control = b"2 0 obj\n<< /Length 23 >>\nstream\nBT /F1 12 Tf (Hi) Tj ET\nendstream\nendobj";
    let (_, plain) = parse_indirect_object(control, None, None).unwrap();

    let mut encrypted = b"2 0 obj\n<< /Length 23 >>\nstream\n".to_vec();
    encrypted.extend(hex::decode("32e840ddfb9270a41abcf5a77058d794b95cf695812d86").unwrap());
    encrypted.extend_from_slice(b"\nendstream\nendobj");
    let (r, decrypted) = parse_indirect_object(&encrypted, Some(&factory), None).unwrap();

    assert_eq!(r.num, 2);
    assert_eq!(decode_stream(&decrypted).unwrap(), decode_stream(&plain).unwrap());
}

#[test]
fn test_encrypted_string_inside_object() {
    let dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    let factory = CipherTransformFactory::new(&dict, &DOCID, Some("baz")).unwrap();
    let data = b"1 0 obj\n<< /Title <9fea2e4b559ccd5ac4083f18f0> /Count 3 >>\nendobj";
    let (_, obj) = parse_indirect_object(data, Some(&factory), None).unwrap();
    let dict = obj.as_dict().unwrap();
    assert_eq!(dict.get("Title"), Some(&Obj::String(b"Hello, World!".to_vec())));
    assert_eq!(dict.get("Count"), Some(&Obj::Int(3)));
}

#[test]
fn test_unknown_filter_is_rejected() {
    let mut dict = legacy_dict(1, 2, 40, &RC4_40_O, &RC4_40_U);
    dict.set("Filter", name("Adobe.PubSec"));
    assert!(matches!(
        CipherTransformFactory::new(&dict, &DOCID, Some("foo")),
        Err(PdfError::EncryptionError(_))
    ));
}

#[test]
fn test_unsupported_version_is_rejected() {
    let dict = legacy_dict(3, 3, 128, &RC4_128_O, &RC4_128_U);
    assert!(matches!(
        CipherTransformFactory::new(&dict, &DOCID, Some("foo")),
        Err(PdfError::EncryptionError(_))
    ));
}

// --- AESV2 ---

#[test]
fn test_aesv2_user_and_owner_passwords() {
    let dict = aesv2_dict();
    let id = file_id_00_0f();
    let user = CipherTransformFactory::new(&dict, &id, Some("user")).unwrap();
    assert_eq!(user.authenticated_as(), AuthenticatedAs::User);
    assert_eq!(hex::encode(user.encryption_key()), AESV2_KEY);

    let owner = CipherTransformFactory::new(&dict, &id, Some("owner")).unwrap();
    assert_eq!(owner.authenticated_as(), AuthenticatedAs::Owner);
    assert_eq!(hex::encode(owner.encryption_key()), AESV2_KEY);
}

#[test]
fn test_aesv2_string_and_stream() {
    let dict = aesv2_dict();
    let factory = CipherTransformFactory::new(&dict, &file_id_00_0f(), Some("user")).unwrap();

    let transform = factory.create_cipher_transform(5, 0).unwrap();
    assert!(matches!(transform.string_cipher(), CipherKind::Aes128(_)));
    let ciphertext =
        hex::decode("6465666768696a6b6c6d6e6f7071727311255b64fcaadb92eef865dfe1c8fe70").unwrap();
    assert_eq!(transform.decrypt_string(&ciphertext), b"Hello, World!");

    let payload = hex::decode(
        "000102030405060708090a0b0c0d0e0fffea21d13b06fc9f8bee8bfbabca29132e56fa1eadd4681c8a2116bfac54e3e9",
    )
    .unwrap();
    let mut data = format!("6 0 obj\n<< /Length {} >>\nstream\n", payload.len()).into_bytes();
    data.extend_from_slice(&payload);
    data.extend_from_slice(b"\nendstream\nendobj");
    let (_, obj) = parse_indirect_object(&data, Some(&factory), None).unwrap();
    assert_eq!(decode_stream(&obj).unwrap(), b"BT /F1 12 Tf (Hi) Tj ET");
}

#[test]
fn test_v4_short_key_is_zero_padded() {
    let mut dict = legacy_dict(
        4,
        4,
        40,
        &hex::decode(RC4_V4_40_O).unwrap(),
        &hex::decode(RC4_V4_40_U).unwrap(),
    );
    crypt_filters(&mut dict, "V2", 5);
    let factory = CipherTransformFactory::new(&dict, &file_id_00_0f(), Some("user")).unwrap();
    assert_eq!(factory.authenticated_as(), AuthenticatedAs::User);
    assert_eq!(
        hex::encode(factory.encryption_key()),
        "6a2acde2a90000000000000000000000"
    );

    // md5(padded key || 07 00 00 00 00), all 16 bytes
    let transform = factory.create_cipher_transform(7, 0).unwrap();
    let expected = hex::decode("29e28768549e0b50d6ba9c382c155a48").unwrap();
    assert_eq!(transform.string_cipher(), &CipherKind::Rc4(expected));
    let ciphertext = hex::decode("4cac0becacd9745e314d9162c4").unwrap();
    assert_eq!(transform.decrypt_string(&ciphertext), b"Hello, World!");

    let owner = CipherTransformFactory::new(&dict, &file_id_00_0f(), Some("owner")).unwrap();
    assert_eq!(owner.authenticated_as(), AuthenticatedAs::Owner);
    assert_eq!(owner.encryption_key(), factory.encryption_key());
}

#[test]
fn test_aes_encrypt_string_round_trip() {
    let dict = aesv2_dict();
    let factory = CipherTransformFactory::new(&dict, &file_id_00_0f(), Some("user")).unwrap();
    let transform = factory.create_cipher_transform(9, 0).unwrap();
    let encrypted = transform.encrypt_string(b"sixteen byte msg");
    assert_eq!(encrypted.len(), 48);
    assert_eq!(transform.decrypt_string(&encrypted), b"sixteen byte msg");
}

#[test]
fn test_identity_crypt_filter_leaves_data_alone() {
    let mut dict = aesv2_dict();
    dict.set("StrF", name("Identity"));
    let factory = CipherTransformFactory::new(&dict, &file_id_00_0f(), Some("user")).unwrap();
    let transform = factory.create_cipher_transform(1, 0).unwrap();
    assert_eq!(transform.string_cipher(), &CipherKind::Null);
    assert_eq!(transform.decrypt_string(b"clear"), b"clear");
}

#[test]
fn test_encrypt_metadata_false_changes_the_key() {
    let mut dict = aesv2_dict();
    dict.set("EncryptMetadata", Obj::Bool(false));
    // the key derivation changes with /EncryptMetadata, so the stored /U no longer matches
    let result = CipherTransformFactory::new(&dict, &file_id_00_0f(), Some("user"));
    assert_eq!(password_error(result), PasswordResponse::IncorrectPassword);
}

// --- AES-256 ---

#[test]
fn test_aes256_r5_correct_password() {
    let dict = aes256_dict(5, &AES256_O, &AES256_U, &AES256_OE, &AES256_UE);
    let factory = CipherTransformFactory::new(&dict, &[], Some("foo")).unwrap();
    assert_eq!(factory.encryption_key().len(), 32);
    let transform = factory.create_cipher_transform(1, 0).unwrap();
    let other = factory.create_cipher_transform(7, 3).unwrap();
    // AES-256 uses the document key directly for every object
    assert!(matches!(transform.stream_cipher(), CipherKind::Aes256(_)));
    assert_eq!(transform, other);
}

#[test]
fn test_aes256_r5_wrong_and_empty_password() {
    let dict = aes256_dict(5, &AES256_O, &AES256_U, &AES256_OE, &AES256_UE);
    let result = CipherTransformFactory::new(&dict, &[], Some("wrong"));
    assert_eq!(password_error(result), PasswordResponse::IncorrectPassword);
    let result = CipherTransformFactory::new(&dict, &[], Some(""));
    assert_eq!(password_error(result), PasswordResponse::NeedPassword);
}

#[test]
fn test_aes256_r6_owner_and_user() {
    let dict = r6_dict();
    let owner = CipherTransformFactory::new(&dict, &[], Some("owner")).unwrap();
    assert_eq!(owner.authenticated_as(), AuthenticatedAs::Owner);
    assert_eq!(hex::encode(owner.encryption_key()), R6_KEY);

    let user = CipherTransformFactory::new(&dict, &[], Some("user")).unwrap();
    assert_eq!(user.authenticated_as(), AuthenticatedAs::User);
    assert_eq!(hex::encode(user.encryption_key()), R6_KEY);

    assert!(CipherTransformFactory::new(&dict, &[], Some("nobody")).is_err());
}

#[test]
fn test_aes256_r6_string() {
    let dict = r6_dict();
    let factory = CipherTransformFactory::new(&dict, &[], Some("user")).unwrap();
    let transform = factory.create_cipher_transform(3, 0).unwrap();
    let ciphertext =
        hex::decode("000102030405060708090a0b0c0d0e0f136cf01d508f00564a571c03c063e318").unwrap();
    assert_eq!(transform.decrypt_string(&ciphertext), b"Hello, World!");
}

#[test]
fn test_aes256_short_validation_strings_are_rejected() {
    let dict = aes256_dict(5, &AES256_O[..32], &AES256_U, &AES256_OE, &AES256_UE);
    assert!(matches!(
        CipherTransformFactory::new(&dict, &[], Some("foo")),
        Err(PdfError::EncryptionError(_))
    ));
}
