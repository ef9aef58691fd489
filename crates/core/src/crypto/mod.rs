//! Hashes and ciphers for the standard security handler.
//!
//! - `hash`: MD5 and SHA-2 digests
//! - `arcfour`: RC4
//! - `aes`: AES-128/256 in CBC mode
//! - `cipher`: the `Cipher` trait, the null cipher and `CipherKind`
//! - `decrypt`: `DecryptStream`

pub mod aes;
pub mod arcfour;
pub mod cipher;
pub mod decrypt;
pub mod hash;

pub use aes::{AesCipher, aes_cbc_decrypt, aes_cbc_encrypt, unpad_aes};
pub use arcfour::Arcfour;
pub use cipher::{Cipher, CipherKind, NullCipher};
pub use decrypt::{DecryptDecoder, DecryptStream};
