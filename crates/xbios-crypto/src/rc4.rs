//! RC4 stream cipher, ported from the boot ROM's `rc4.c`.
//!
//! Key scheduling is textbook RC4. The keystream generator uses the
//! original's `k` index convention: `k` is incremented *before* it is used
//! to pull a byte out of the S-box, so the first output byte is produced
//! from `S[1]`, not `S[0]`. `apply_keystream` is its own inverse, so the
//! same call encrypts and decrypts.

use crate::error::CryptoError;

pub struct Rc4 {
    sbox: [u8; 256],
    i: u8,
    k: u8,
}

impl Rc4 {
    /// Runs the key-scheduling algorithm over `key` (1-256 bytes).
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.is_empty() || key.len() > 256 {
            return Err(CryptoError::InvalidKeyLength(key.len()));
        }

        let mut sbox = [0u8; 256];
        for (idx, slot) in sbox.iter_mut().enumerate() {
            *slot = idx as u8;
        }

        let mut j: u8 = 0;
        for i in 0..256usize {
            j = j
                .wrapping_add(sbox[i])
                .wrapping_add(key[i % key.len()]);
            sbox.swap(i, j as usize);
        }

        Ok(Rc4 { sbox, i: 0, k: 0 })
    }

    /// XORs `data` in place with the keystream, advancing internal state.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.k = self.k.wrapping_add(self.sbox[self.i as usize]);
            self.sbox.swap(self.i as usize, self.k as usize);
            let t = self.sbox[self.i as usize].wrapping_add(self.sbox[self.k as usize]);
            *byte ^= self.sbox[t as usize];
        }
    }
}

/// One-shot symmetric encrypt/decrypt: key schedule followed by a single
/// full-buffer keystream XOR. Self-inverse, matching `symmetricEncDec` in
/// the original: calling this twice with the same key restores the input.
pub fn symmetric_enc_dec(key: &[u8], data: &mut [u8]) -> Result<(), CryptoError> {
    let mut cipher = Rc4::new(key)?;
    cipher.apply_keystream(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_an_involution() {
        let key = b"xbox-mcpx-key-16";
        let plaintext = b"the quick brown fox jumps over the lazy dog!!!!";
        let mut buf = *plaintext;

        symmetric_enc_dec(key, &mut buf).unwrap();
        assert_ne!(&buf[..], &plaintext[..]);

        symmetric_enc_dec(key, &mut buf).unwrap();
        assert_eq!(&buf[..], &plaintext[..]);
    }

    #[test]
    fn rejects_bad_key_lengths() {
        assert!(Rc4::new(&[]).is_err());
        assert!(Rc4::new(&[0u8; 257]).is_err());
        assert!(Rc4::new(&[0u8; 16]).is_ok());
    }

    #[test]
    fn empty_buffer_is_noop() {
        let mut buf: [u8; 0] = [];
        symmetric_enc_dec(b"key", &mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
