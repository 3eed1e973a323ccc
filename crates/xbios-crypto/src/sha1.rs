//! FIPS-180-1 SHA-1, ported from the boot ROM's `sha1.cpp` (itself derived
//! from the public-domain xbedump implementation).

const K: [u32; 4] = [0x5A827999, 0x6ED9EBA1, 0x8F1BBCDC, 0xCA62C1D6];

fn circular_shift(bits: u32, word: u32) -> u32 {
    (word << bits) | (word >> (32 - bits))
}

/// Incremental SHA-1 hasher.
pub struct Sha1 {
    h: [u32; 5],
    length_bits: u64,
    block: [u8; 64],
    block_index: usize,
}

impl Default for Sha1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha1 {
    pub fn new() -> Self {
        Sha1 {
            h: [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0],
            length_bits: 0,
            block: [0u8; 64],
            block_index: 0,
        }
    }

    pub fn update(&mut self, message: &[u8]) {
        for &byte in message {
            self.block[self.block_index] = byte;
            self.block_index += 1;
            self.length_bits += 8;

            if self.block_index == 64 {
                self.process_block();
            }
        }
    }

    pub fn finalize(mut self) -> [u8; 20] {
        self.pad_message();

        let mut digest = [0u8; 20];
        for (i, byte) in digest.iter_mut().enumerate() {
            *byte = (self.h[i >> 2] >> (8 * (3 - (i & 0x03)))) as u8;
        }
        digest
    }

    fn process_block(&mut self) {
        let mut w = [0u32; 80];
        for t in 0..16 {
            w[t] = u32::from_be_bytes([
                self.block[t * 4],
                self.block[t * 4 + 1],
                self.block[t * 4 + 2],
                self.block[t * 4 + 3],
            ]);
        }
        for t in 16..80 {
            w[t] = circular_shift(1, w[t - 3] ^ w[t - 8] ^ w[t - 14] ^ w[t - 16]);
        }

        let [mut a, mut b, mut c, mut d, mut e] = self.h;

        for (t, &word) in w.iter().enumerate() {
            let (f, k) = match t {
                0..=19 => ((b & c) | ((!b) & d), K[0]),
                20..=39 => (b ^ c ^ d, K[1]),
                40..=59 => ((b & c) | (b & d) | (c & d), K[2]),
                _ => (b ^ c ^ d, K[3]),
            };
            let temp = circular_shift(5, a)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(word)
                .wrapping_add(k);
            e = d;
            d = c;
            c = circular_shift(30, b);
            b = a;
            a = temp;
        }

        self.h[0] = self.h[0].wrapping_add(a);
        self.h[1] = self.h[1].wrapping_add(b);
        self.h[2] = self.h[2].wrapping_add(c);
        self.h[3] = self.h[3].wrapping_add(d);
        self.h[4] = self.h[4].wrapping_add(e);

        self.block_index = 0;
    }

    fn pad_message(&mut self) {
        let length_bits = self.length_bits;

        if self.block_index > 55 {
            self.block[self.block_index] = 0x80;
            self.block_index += 1;
            while self.block_index < 64 {
                self.block[self.block_index] = 0;
                self.block_index += 1;
            }
            self.process_block();
            while self.block_index < 56 {
                self.block[self.block_index] = 0;
                self.block_index += 1;
            }
        } else {
            self.block[self.block_index] = 0x80;
            self.block_index += 1;
            while self.block_index < 56 {
                self.block[self.block_index] = 0;
                self.block_index += 1;
            }
        }

        self.block[56..64].copy_from_slice(&length_bits.to_be_bytes());
        self.process_block();
    }
}

/// One-shot SHA-1 over a single buffer.
pub fn sha1(message: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(message);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn fips_vector_abc() {
        let digest = sha1(b"abc");
        assert_eq!(hex(&digest), "a9993e364706816aba3e25717850c26c9cd0d89");
    }

    #[test]
    fn fips_vector_empty() {
        let digest = sha1(b"");
        assert_eq!(hex(&digest), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn fips_vector_two_block() {
        let msg = b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq";
        let digest = sha1(msg);
        assert_eq!(hex(&digest), "84983e441c3bd26ebaae4aa1f95129e5e54670f1");
    }

    #[test]
    fn incremental_matches_one_shot() {
        let msg = b"the quick brown fox jumps over the lazy dog";
        let mut hasher = Sha1::new();
        hasher.update(&msg[..10]);
        hasher.update(&msg[10..]);
        assert_eq!(hasher.finalize(), sha1(msg));
    }
}
