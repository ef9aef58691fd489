//! The cipher contract and the per-object cipher selector.

use super::aes::AesCipher;
use super::arcfour::Arcfour;

/// A symmetric cipher instance.
///
/// Instances are stateful: RC4 advances its keystream and AES carries the
/// CBC chain and any partial block from one call to the next.
pub trait Cipher {
    /// Decrypt the next piece of data. `finalize` marks the last piece.
    fn decrypt_block(&mut self, data: &[u8], finalize: bool) -> Vec<u8>;

    /// Encrypt the next piece of data, starting a new chain at `iv` if given.
    fn encrypt(&mut self, data: &[u8], iv: Option<&[u8; 16]>) -> Vec<u8>;

    /// True for ciphers that need block padding when encrypting.
    fn is_block_cipher(&self) -> bool {
        false
    }
}

/// Identity cipher for the `/Identity` crypt filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCipher;

impl Cipher for NullCipher {
    fn decrypt_block(&mut self, data: &[u8], _finalize: bool) -> Vec<u8> {
        data.to_vec()
    }

    fn encrypt(&mut self, data: &[u8], _iv: Option<&[u8; 16]>) -> Vec<u8> {
        data.to_vec()
    }
}

/// Cipher algorithm bound to an object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherKind {
    Null,
    Rc4(Vec<u8>),
    Aes128([u8; 16]),
    Aes256([u8; 32]),
}

impl CipherKind {
    /// A fresh cipher instance for one string or stream.
    pub fn make_cipher(&self) -> Box<dyn Cipher> {
        match self {
            Self::Null => Box::new(NullCipher),
            Self::Rc4(key) => Box::new(Arcfour::new(key)),
            Self::Aes128(key) => Box::new(AesCipher::new_128(key)),
            Self::Aes256(key) => Box::new(AesCipher::new_256(key)),
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}
