//! RC4 stream cipher.

use super::cipher::Cipher;

/// RC4 keystream state.
///
/// Keys of any length up to 256 bytes are accepted.
pub struct Arcfour {
    state: [u8; 256],
    a: u8,
    b: u8,
}

impl Arcfour {
    pub fn new(key: &[u8]) -> Self {
        let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
        if !key.is_empty() {
            let mut j: u8 = 0;
            for i in 0..256 {
                j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
                state.swap(i, usize::from(j));
            }
        }
        Self { state, a: 0, b: 0 }
    }

    /// XOR `data` with the keystream. Encryption and decryption are the same.
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|byte| byte ^ self.next_key_byte()).collect()
    }

    fn next_key_byte(&mut self) -> u8 {
        self.a = self.a.wrapping_add(1);
        let tmp = self.state[usize::from(self.a)];
        self.b = self.b.wrapping_add(tmp);
        self.state.swap(usize::from(self.a), usize::from(self.b));
        let idx = tmp.wrapping_add(self.state[usize::from(self.a)]);
        self.state[usize::from(idx)]
    }
}

impl Cipher for Arcfour {
    fn decrypt_block(&mut self, data: &[u8], _finalize: bool) -> Vec<u8> {
        self.process(data)
    }

    fn encrypt(&mut self, data: &[u8], _iv: Option<&[u8; 16]>) -> Vec<u8> {
        self.process(data)
    }
}

/// RC4 with the key XORed by `round` for each of the 20 rounds, used by the
/// revision 3+ password checks. `rounds` gives the order.
pub(crate) fn arcfour_rounds(
    key: &[u8],
    data: &[u8],
    rounds: impl Iterator<Item = u8>,
) -> Vec<u8> {
    let mut result = data.to_vec();
    let mut round_key = vec![0u8; key.len()];
    for round in rounds {
        for (dst, src) in round_key.iter_mut().zip(key) {
            *dst = src ^ round;
        }
        result = Arcfour::new(&round_key).process(&result);
    }
    result
}
