//! Standard security handler.
//!
//! `CipherTransformFactory` authenticates a password against the
//! `/Encrypt` dictionary once per document and then hands out a
//! `CipherTransform` for each indirect object.

use crate::crypto::aes::{AesCipher, aes_cbc_decrypt};
use crate::crypto::arcfour::{Arcfour, arcfour_rounds};
use crate::crypto::cipher::{Cipher, CipherKind};
use crate::crypto::decrypt::DecryptDecoder;
use crate::crypto::hash::{md5, md5_parts, sha256, sha384, sha512};
use crate::error::{PasswordResponse, PdfError, Result};
use crate::model::objects::{Dict, Obj};
use crate::stream::BaseStream;
use tracing::{debug, warn};

/// Password padding string from the PDF specification.
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Passwords longer than this are truncated for revisions 5 and 6.
const MAX_UTF8_PASSWORD: usize = 127;

/// Which password opened the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatedAs {
    Owner,
    User,
}

/// Password checks and key unwrapping for AES-256 documents.
pub trait PasswordAlgorithm {
    fn hash(&self, password: &[u8], input: &[u8], user_bytes: &[u8]) -> [u8; 32];

    fn check_owner_password(
        &self,
        password: &[u8],
        owner_validation_salt: &[u8],
        user_bytes: &[u8],
        owner_password: &[u8],
    ) -> bool {
        let input = [password, owner_validation_salt, user_bytes].concat();
        owner_password.get(..32) == Some(&self.hash(password, &input, user_bytes)[..])
    }

    fn check_user_password(
        &self,
        password: &[u8],
        user_validation_salt: &[u8],
        user_password: &[u8],
    ) -> bool {
        let input = [password, user_validation_salt].concat();
        user_password.get(..32) == Some(&self.hash(password, &input, &[])[..])
    }

    fn get_owner_key(
        &self,
        password: &[u8],
        owner_key_salt: &[u8],
        user_bytes: &[u8],
        owner_encryption: &[u8],
    ) -> Result<[u8; 32]> {
        let input = [password, owner_key_salt, user_bytes].concat();
        unwrap_file_key(&self.hash(password, &input, user_bytes), owner_encryption)
    }

    fn get_user_key(
        &self,
        password: &[u8],
        user_key_salt: &[u8],
        user_encryption: &[u8],
    ) -> Result<[u8; 32]> {
        let input = [password, user_key_salt].concat();
        unwrap_file_key(&self.hash(password, &input, &[]), user_encryption)
    }
}

/// AES-256 with a single SHA-256 (revision 5).
#[derive(Debug, Default, Clone, Copy)]
pub struct Pdf17;

/// AES-256 with the iterated SHA-2 and AES hash (revision 6).
#[derive(Debug, Default, Clone, Copy)]
pub struct Pdf20;

impl PasswordAlgorithm for Pdf17 {
    fn hash(&self, _password: &[u8], input: &[u8], _user_bytes: &[u8]) -> [u8; 32] {
        sha256(input)
    }
}

impl PasswordAlgorithm for Pdf20 {
    fn hash(&self, password: &[u8], input: &[u8], user_bytes: &[u8]) -> [u8; 32] {
        let mut k = sha256(input).to_vec();
        let mut last = 0u8;
        let mut round = 0i32;
        while round < 64 || i32::from(last) > round - 32 {
            let block = [password, &k[..], user_bytes].concat();
            let k1 = block.repeat(64);
            let mut cipher = AesCipher::new_128(&first_16(&k));
            let mut iv = [0u8; 16];
            iv.copy_from_slice(&k[16..32]);
            let e = cipher.encrypt(&k1, Some(&iv));
            // 256 is 1 mod 3, so the 16-byte big-endian value mod 3 is the digit sum mod 3
            let remainder = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
            k = match remainder {
                0 => sha256(&e).to_vec(),
                1 => sha384(&e).to_vec(),
                _ => sha512(&e).to_vec(),
            };
            last = e.last().copied().unwrap_or(0);
            round += 1;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&k[..32]);
        out
    }
}

fn first_16(bytes: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    let n = bytes.len().min(16);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// AES-256-CBC, zero IV, no padding over the first 32 bytes of `/OE` or `/UE`.
fn unwrap_file_key(key: &[u8; 32], encrypted: &[u8]) -> Result<[u8; 32]> {
    let encrypted = encrypted.get(..32).ok_or_else(|| {
        PdfError::EncryptionError(format!(
            "encrypted file key too short: {} bytes",
            encrypted.len()
        ))
    })?;
    let plain = aes_cbc_decrypt(key, &[0u8; 16], encrypted)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&plain);
    Ok(out)
}

/// `password` padded or truncated to 32 bytes.
fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
    padded
}

/// Bytes of `password` as the legacy algorithms see them.
fn legacy_password_bytes(password: &str) -> Vec<u8> {
    if password.chars().all(|c| u32::from(c) <= 0xff) {
        password.chars().map(|c| c as u8).collect()
    } else {
        password.as_bytes().to_vec()
    }
}

fn utf8_password_bytes(password: &str) -> Vec<u8> {
    let bytes = password.as_bytes();
    bytes[..bytes.len().min(MAX_UTF8_PASSWORD)].to_vec()
}

/// Values of the `/Encrypt` dictionary the legacy key derivation uses.
struct LegacyParams<'a> {
    file_id: &'a [u8],
    owner_password: &'a [u8],
    user_password: &'a [u8],
    flags: i32,
    revision: i64,
    key_length: usize,
    encrypt_metadata: bool,
}

impl LegacyParams<'_> {
    /// Document key for `password` if it is the user password.
    fn prepare_key_data(&self, password: &[u8]) -> Option<Vec<u8>> {
        let padded = pad_password(password);
        let flags = self.flags.to_le_bytes();
        let mut parts: Vec<&[u8]> = vec![&padded[..], self.owner_password, &flags[..], self.file_id];
        if self.revision >= 4 && !self.encrypt_metadata {
            parts.push(&[0xff; 4]);
        }
        let mut hash = md5_parts(&parts);
        let key_bytes = self.key_length >> 3;
        if self.revision >= 3 {
            for _ in 0..50 {
                hash = md5(&hash[..key_bytes.min(16)]);
            }
        }
        let key = hash[..key_bytes.min(16)].to_vec();

        let matches = if self.revision >= 3 {
            let seed = md5_parts(&[&PASSWORD_PADDING[..], self.file_id]);
            let check = arcfour_rounds(&key, &seed, 0..20);
            self.user_password.get(..check.len()) == Some(&check[..])
        } else {
            let check = Arcfour::new(&key).process(&PASSWORD_PADDING);
            self.user_password.get(..check.len()) == Some(&check[..])
        };
        matches.then_some(key)
    }

    /// The user password recovered from `/O` with `password` as owner password.
    fn decode_user_password(&self, password: &[u8]) -> Vec<u8> {
        let mut hash = md5(&pad_password(password));
        if self.revision >= 3 {
            for _ in 0..50 {
                hash = md5(&hash);
            }
        }
        let key = &hash[..(self.key_length >> 3).min(16)];
        if self.revision >= 3 {
            arcfour_rounds(key, self.owner_password, (0..20).rev())
        } else {
            Arcfour::new(key).process(self.owner_password)
        }
    }
}

/// Values of the `/Encrypt` dictionary the AES-256 key derivation uses.
struct ModernParams<'a> {
    revision: i64,
    owner_bytes: &'a [u8],
    user_bytes: &'a [u8],
    owner_encryption: &'a [u8],
    user_encryption: &'a [u8],
}

impl ModernParams<'_> {
    fn algorithm(&self) -> Box<dyn PasswordAlgorithm> {
        if self.revision == 6 {
            Box::new(Pdf20)
        } else {
            Box::new(Pdf17)
        }
    }

    fn try_owner(&self, password: &[u8]) -> Result<Option<[u8; 32]>> {
        let algorithm = self.algorithm();
        let owner_hash = &self.owner_bytes[..32];
        let validation_salt = &self.owner_bytes[32..40];
        let key_salt = &self.owner_bytes[40..48];
        let user_bytes = &self.user_bytes[..48];
        if !algorithm.check_owner_password(password, validation_salt, user_bytes, owner_hash) {
            return Ok(None);
        }
        algorithm
            .get_owner_key(password, key_salt, user_bytes, self.owner_encryption)
            .map(Some)
    }

    fn try_user(&self, password: &[u8]) -> Result<Option<[u8; 32]>> {
        let algorithm = self.algorithm();
        let user_hash = &self.user_bytes[..32];
        let validation_salt = &self.user_bytes[32..40];
        let key_salt = &self.user_bytes[40..48];
        if !algorithm.check_user_password(password, validation_salt, user_hash) {
            return Ok(None);
        }
        algorithm
            .get_user_key(password, key_salt, self.user_encryption)
            .map(Some)
    }
}

fn required_bytes(dict: &Dict, key: &str) -> Result<Vec<u8>> {
    match dict.get_resolved(key)? {
        Some(Obj::String(bytes)) => Ok(bytes),
        Some(other) => Err(PdfError::EncryptionError(format!(
            "/{key} must be a string, got {}",
            other.type_name()
        ))),
        None => Err(PdfError::EncryptionError(format!("missing /{key} in /Encrypt"))),
    }
}

fn int_entry(dict: &Dict, key: &str) -> Result<Option<i64>> {
    Ok(match dict.get_resolved(key)? {
        Some(Obj::Int(n)) => Some(n),
        _ => None,
    })
}

fn name_entry(dict: &Dict, key: &str) -> Result<Option<String>> {
    Ok(match dict.get_resolved(key)? {
        Some(Obj::Name(name)) => Some(name.as_str().to_string()),
        _ => None,
    })
}

/// Key length in bits: `/Length`, or the stream crypt filter's length for V4+.
fn key_length(dict: &Dict, algorithm: i64) -> Result<i64> {
    if let Some(length) = int_entry(dict, "Length")?.filter(|&n| n != 0) {
        return Ok(length);
    }
    if algorithm <= 3 {
        return Ok(40);
    }
    let cf = dict.get_resolved("CF")?;
    let stmf = name_entry(dict, "StmF")?;
    let mut length = 128;
    if let (Some(Obj::Dict(cf)), Some(stmf)) = (cf, stmf) {
        if let Some(Obj::Dict(handler)) = cf.get_resolved(&stmf)? {
            length = int_entry(&handler, "Length")?.filter(|&n| n != 0).unwrap_or(128);
        }
        if length < 40 {
            // some writers store the length in bytes
            length <<= 3;
        }
    }
    Ok(length)
}

/// Document-wide decryption context.
#[derive(Debug, Clone)]
pub struct CipherTransformFactory {
    algorithm: i64,
    revision: i64,
    encryption_key: Vec<u8>,
    encrypt_metadata: bool,
    authenticated_as: AuthenticatedAs,
    cf: Option<Dict>,
    stmf: String,
    strf: String,
    eff: String,
}

impl CipherTransformFactory {
    /// Authenticate `password` against the `/Encrypt` dictionary `dict`.
    ///
    /// The password is tried as owner password first, then as user
    /// password. With no (or an empty) password only the empty user
    /// password is tried.
    pub fn new(dict: &Dict, file_id: &[u8], password: Option<&str>) -> Result<Self> {
        let filter = name_entry(dict, "Filter")?;
        if filter.as_deref() != Some("Standard") {
            return Err(PdfError::EncryptionError(format!(
                "unknown encryption method: {}",
                filter.as_deref().unwrap_or("none")
            )));
        }
        let algorithm = int_entry(dict, "V")?.unwrap_or(0);
        if !matches!(algorithm, 1 | 2 | 4 | 5) {
            return Err(PdfError::EncryptionError(format!(
                "unsupported encryption algorithm: V={algorithm}"
            )));
        }
        let key_length = key_length(dict, algorithm)?;
        if key_length < 40 || key_length % 8 != 0 {
            return Err(PdfError::EncryptionError(format!(
                "invalid key length: {key_length}"
            )));
        }
        let revision = int_entry(dict, "R")?.ok_or_else(|| {
            PdfError::EncryptionError("missing /R in /Encrypt".into())
        })?;
        let owner_bytes = required_bytes(dict, "O")?;
        let user_bytes = required_bytes(dict, "U")?;
        // /P is a signed 32-bit value, some writers store it unsigned
        let flags = int_entry(dict, "P")?.unwrap_or(0) as i32;
        let encrypt_metadata = !matches!(algorithm, 4 | 5)
            || !matches!(dict.get_resolved("EncryptMetadata")?, Some(Obj::Bool(false)));
        let password = password.filter(|p| !p.is_empty());

        let found = if algorithm == 5 {
            let owner_encryption = required_bytes(dict, "OE")?;
            let user_encryption = required_bytes(dict, "UE")?;
            if owner_bytes.len() < 48 || user_bytes.len() < 48 {
                return Err(PdfError::EncryptionError(format!(
                    "/O and /U must be 48 bytes, got {} and {}",
                    owner_bytes.len(),
                    user_bytes.len()
                )));
            }
            let params = ModernParams {
                revision,
                owner_bytes: &owner_bytes,
                user_bytes: &user_bytes,
                owner_encryption: &owner_encryption,
                user_encryption: &user_encryption,
            };
            match password {
                Some(password) => {
                    let bytes = utf8_password_bytes(password);
                    match params.try_owner(&bytes)? {
                        Some(key) => Some((key.to_vec(), AuthenticatedAs::Owner)),
                        None => params
                            .try_user(&bytes)?
                            .map(|key| (key.to_vec(), AuthenticatedAs::User)),
                    }
                }
                None => params
                    .try_user(&[])?
                    .map(|key| (key.to_vec(), AuthenticatedAs::User)),
            }
        } else {
            let params = LegacyParams {
                file_id,
                owner_password: &owner_bytes[..owner_bytes.len().min(32)],
                user_password: &user_bytes[..user_bytes.len().min(32)],
                flags,
                revision,
                key_length: key_length as usize,
                encrypt_metadata,
            };
            match password {
                Some(password) => {
                    let bytes = legacy_password_bytes(password);
                    let decoded = params.decode_user_password(&bytes);
                    match params.prepare_key_data(&decoded) {
                        Some(key) => Some((key, AuthenticatedAs::Owner)),
                        None => params
                            .prepare_key_data(&bytes)
                            .map(|key| (key, AuthenticatedAs::User)),
                    }
                }
                None => params
                    .prepare_key_data(&[])
                    .map(|key| (key, AuthenticatedAs::User)),
            }
        };

        let Some((mut encryption_key, authenticated_as)) = found else {
            return Err(PdfError::Password(if password.is_some() {
                PasswordResponse::IncorrectPassword
            } else {
                PasswordResponse::NeedPassword
            }));
        };
        debug!(algorithm, revision, key_length, ?authenticated_as, "document key derived");
        if algorithm == 4 && encryption_key.len() < 16 {
            // short V4 keys are zero-padded before per-object hashing
            encryption_key.resize(16, 0);
        }

        let (cf, stmf, strf, eff) = if algorithm >= 4 {
            let cf = match dict.get_resolved("CF")? {
                Some(Obj::Dict(cf)) => Some(cf),
                _ => None,
            };
            let stmf = name_entry(dict, "StmF")?.unwrap_or_else(|| "Identity".into());
            let strf = name_entry(dict, "StrF")?.unwrap_or_else(|| "Identity".into());
            let eff = name_entry(dict, "EFF")?.unwrap_or_else(|| stmf.clone());
            (cf, stmf, strf, eff)
        } else {
            (None, String::new(), String::new(), String::new())
        };

        Ok(Self {
            algorithm,
            revision,
            encryption_key,
            encrypt_metadata,
            authenticated_as,
            cf,
            stmf,
            strf,
            eff,
        })
    }

    pub fn algorithm(&self) -> i64 {
        self.algorithm
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    /// False when `/EncryptMetadata false` leaves XMP metadata in the clear.
    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    pub fn authenticated_as(&self) -> AuthenticatedAs {
        self.authenticated_as
    }

    /// Per-object key for the legacy algorithms.
    fn object_key(&self, num: u32, generation: u16, is_aes: bool) -> Vec<u8> {
        let num = num.to_le_bytes();
        let generation = generation.to_le_bytes();
        let mut parts: Vec<&[u8]> = vec![&self.encryption_key[..], &num[..3], &generation[..]];
        if is_aes {
            parts.push(b"sAlT");
        }
        let hash = md5_parts(&parts);
        hash[..(self.encryption_key.len() + 5).min(16)].to_vec()
    }

    fn cipher_for_filter(&self, name: &str, num: u32, generation: u16) -> Result<CipherKind> {
        let crypt_filter = match &self.cf {
            Some(cf) => match cf.get_resolved(name)? {
                Some(Obj::Dict(filter)) => Some(filter),
                _ => None,
            },
            None => None,
        };
        let method = match &crypt_filter {
            Some(filter) => name_entry(filter, "CFM")?,
            None => None,
        };
        match method.as_deref() {
            None | Some("None") => {
                if name != "Identity" && crypt_filter.is_none() {
                    warn!(filter = name, "crypt filter not found, using identity");
                }
                Ok(CipherKind::Null)
            }
            Some("V2") => Ok(CipherKind::Rc4(self.object_key(num, generation, false))),
            Some("AESV2") => Ok(CipherKind::Aes128(first_16(
                &self.object_key(num, generation, true),
            ))),
            Some("AESV3") => {
                let key: [u8; 32] = self.encryption_key.as_slice().try_into().map_err(|_| {
                    PdfError::EncryptionError(format!(
                        "AESV3 needs a 32-byte key, have {} bytes",
                        self.encryption_key.len()
                    ))
                })?;
                Ok(CipherKind::Aes256(key))
            }
            Some(other) => Err(PdfError::EncryptionError(format!(
                "unknown crypt filter method: {other}"
            ))),
        }
    }

    /// The transform for indirect object `num generation`.
    pub fn create_cipher_transform(&self, num: u32, generation: u16) -> Result<CipherTransform> {
        if self.algorithm >= 4 {
            return Ok(CipherTransform {
                string_cipher: self.cipher_for_filter(&self.strf, num, generation)?,
                stream_cipher: self.cipher_for_filter(&self.stmf, num, generation)?,
                embedded_file_cipher: self.cipher_for_filter(&self.eff, num, generation)?,
                encrypt_metadata: self.encrypt_metadata,
            });
        }
        let kind = CipherKind::Rc4(self.object_key(num, generation, false));
        Ok(CipherTransform {
            string_cipher: kind.clone(),
            stream_cipher: kind.clone(),
            embedded_file_cipher: kind,
            encrypt_metadata: self.encrypt_metadata,
        })
    }
}

/// Encryption of one indirect object's strings and streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherTransform {
    string_cipher: CipherKind,
    stream_cipher: CipherKind,
    embedded_file_cipher: CipherKind,
    encrypt_metadata: bool,
}

impl CipherTransform {
    pub fn new(string_cipher: CipherKind, stream_cipher: CipherKind) -> Self {
        Self {
            embedded_file_cipher: stream_cipher.clone(),
            string_cipher,
            stream_cipher,
            encrypt_metadata: true,
        }
    }

    pub fn string_cipher(&self) -> &CipherKind {
        &self.string_cipher
    }

    pub fn stream_cipher(&self) -> &CipherKind {
        &self.stream_cipher
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Wrap `stream` so that it decrypts with the stream cipher.
    pub fn create_stream(
        &self,
        stream: Box<dyn BaseStream>,
        length: Option<usize>,
    ) -> Box<dyn BaseStream> {
        Box::new(DecryptDecoder::stream(
            stream,
            length,
            self.stream_cipher.make_cipher(),
        ))
    }

    /// Like `create_stream`, with the `/EFF` cipher for embedded files.
    pub fn create_embedded_file_stream(
        &self,
        stream: Box<dyn BaseStream>,
        length: Option<usize>,
    ) -> Box<dyn BaseStream> {
        Box::new(DecryptDecoder::stream(
            stream,
            length,
            self.embedded_file_cipher.make_cipher(),
        ))
    }

    pub fn decrypt_string(&self, data: &[u8]) -> Vec<u8> {
        self.string_cipher.make_cipher().decrypt_block(data, true)
    }

    /// Encrypt a string; AES output is prefixed with a random IV.
    pub fn encrypt_string(&self, data: &[u8]) -> Vec<u8> {
        let mut cipher = self.string_cipher.make_cipher();
        if !cipher.is_block_cipher() {
            return cipher.encrypt(data, None);
        }
        let pad = 16 - data.len() % 16;
        let mut padded = data.to_vec();
        padded.resize(data.len() + pad, pad as u8);
        let iv: [u8; 16] = rand::random();
        let mut out = iv.to_vec();
        out.extend(cipher.encrypt(&padded, Some(&iv)));
        out
    }
}
