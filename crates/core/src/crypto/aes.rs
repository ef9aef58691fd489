//! AES-CBC for PDF encryption.
//!
//! `AesCipher` is the streaming form used for strings and streams: CBC state
//! and partial blocks carry over between calls. The one-shot helpers serve
//! the key derivation, which always works on whole blocks.

use super::cipher::Cipher;
use crate::error::{PdfError, Result};
use aes::cipher::block_padding::NoPadding;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{
    BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit,
};
use cbc::{Decryptor, Encryptor};

type Aes128CbcDec = Decryptor<aes::Aes128>;
type Aes256CbcDec = Decryptor<aes::Aes256>;
type Aes128CbcEnc = Encryptor<aes::Aes128>;
type Aes256CbcEnc = Encryptor<aes::Aes256>;

const BLOCK: usize = 16;

fn check_cbc_input(key: &[u8], iv: &[u8], data: &[u8]) -> Result<()> {
    if iv.len() != BLOCK {
        return Err(PdfError::EncryptionError(format!(
            "AES IV must be 16 bytes, got {}",
            iv.len()
        )));
    }
    if data.len() % BLOCK != 0 {
        return Err(PdfError::EncryptionError(format!(
            "AES input of {} bytes is not block aligned",
            data.len()
        )));
    }
    if key.len() != 16 && key.len() != 32 {
        return Err(PdfError::EncryptionError(format!(
            "AES key must be 16 or 32 bytes, got {}",
            key.len()
        )));
    }
    Ok(())
}

/// Decrypt block-aligned `data` with AES-128 or AES-256 in CBC mode, no padding.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_cbc_input(key, iv, data)?;
    let mut buf = data.to_vec();
    let done = if key.len() == 16 {
        Aes128CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ())
    } else {
        Aes256CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ())
    };
    done.map_err(|_| PdfError::EncryptionError("AES-CBC decryption failed".into()))?;
    Ok(buf)
}

/// Encrypt block-aligned `data` with AES-128 or AES-256 in CBC mode, no padding.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_cbc_input(key, iv, data)?;
    let mut buf = data.to_vec();
    let len = data.len();
    let done = if key.len() == 16 {
        Aes128CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ())
    } else {
        Aes256CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ())
    };
    done.map_err(|_| PdfError::EncryptionError("AES-CBC encryption failed".into()))?;
    Ok(buf)
}

/// Remove PKCS#7 padding, returning `data` unchanged if the padding is not valid.
pub fn unpad_aes(data: &[u8]) -> &[u8] {
    let Some(&last) = data.last() else {
        return data;
    };
    let pad_len = usize::from(last);
    if pad_len == 0 || pad_len > BLOCK || pad_len > data.len() {
        return data;
    }
    let start = data.len() - pad_len;
    if data[start..].iter().all(|&byte| byte == last) {
        &data[..start]
    } else {
        data
    }
}

enum AesCore {
    Aes128(aes::Aes128),
    Aes256(aes::Aes256),
}

impl AesCore {
    fn decrypt(&self, block: &mut [u8; BLOCK]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.decrypt_block(block),
            Self::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }

    fn encrypt(&self, block: &mut [u8; BLOCK]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }
}

/// Streaming AES-CBC cipher.
///
/// Without an explicit IV, decryption takes the first 16 input bytes as the
/// IV. PKCS#7 padding is stripped from the last block of a finalizing call.
pub struct AesCipher {
    core: AesCore,
    iv: Option<[u8; BLOCK]>,
    pending: Vec<u8>,
}

impl AesCipher {
    pub fn new_128(key: &[u8; 16]) -> Self {
        Self::with_core(AesCore::Aes128(aes::Aes128::new(GenericArray::from_slice(key))))
    }

    pub fn new_256(key: &[u8; 32]) -> Self {
        Self::with_core(AesCore::Aes256(aes::Aes256::new(GenericArray::from_slice(key))))
    }

    fn with_core(core: AesCore) -> Self {
        Self {
            core,
            iv: None,
            pending: Vec::with_capacity(BLOCK),
        }
    }
}

impl Cipher for AesCipher {
    fn decrypt_block(&mut self, data: &[u8], finalize: bool) -> Vec<u8> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(data);
        let mut offset = 0;
        let mut prev = match self.iv {
            Some(iv) => iv,
            None => {
                if input.len() < BLOCK {
                    self.pending = input;
                    return Vec::new();
                }
                offset = BLOCK;
                let mut iv = [0u8; BLOCK];
                iv.copy_from_slice(&input[..BLOCK]);
                iv
            }
        };

        let whole = (input.len() - offset) / BLOCK * BLOCK;
        let mut output = Vec::with_capacity(whole);
        for chunk in input[offset..offset + whole].chunks_exact(BLOCK) {
            let mut block = [0u8; BLOCK];
            block.copy_from_slice(chunk);
            self.core.decrypt(&mut block);
            for (byte, mask) in block.iter_mut().zip(&prev) {
                *byte ^= mask;
            }
            prev.copy_from_slice(chunk);
            output.extend_from_slice(&block);
        }
        self.iv = Some(prev);
        self.pending = input[offset + whole..].to_vec();

        if finalize && output.len() >= BLOCK {
            let pad_len = usize::from(output[output.len() - 1]);
            let last = &output[output.len() - BLOCK..];
            let padded = last[BLOCK - pad_len.min(BLOCK)..]
                .iter()
                .all(|&b| usize::from(b) == pad_len);
            if pad_len <= BLOCK && padded {
                output.truncate(output.len() - pad_len);
            }
        }
        output
    }

    fn encrypt(&mut self, data: &[u8], iv: Option<&[u8; 16]>) -> Vec<u8> {
        if let Some(iv) = iv {
            self.iv = Some(*iv);
        }
        let mut prev = self.iv.unwrap_or([0u8; BLOCK]);
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(data);
        let whole = input.len() / BLOCK * BLOCK;
        let mut output = Vec::with_capacity(whole);
        for chunk in input[..whole].chunks_exact(BLOCK) {
            let mut block = [0u8; BLOCK];
            for ((dst, src), mask) in block.iter_mut().zip(chunk).zip(&prev) {
                *dst = src ^ mask;
            }
            self.core.encrypt(&mut block);
            prev = block;
            output.extend_from_slice(&block);
        }
        self.iv = Some(prev);
        self.pending = input[whole..].to_vec();
        output
    }

    fn is_block_cipher(&self) -> bool {
        true
    }
}
