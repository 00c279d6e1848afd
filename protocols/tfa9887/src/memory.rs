// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Protocol about memory of CoolFlux DSP.
//!
//! The DSP operates with 24 bit word. In byte stream through the memory window, each word is
//! expressed by three bytes in big endian, with two's complement for negative value.

use {super::*, register::*};

/// The number of bytes for single word in DSP memory.
pub const BYTES_PER_WORD: usize = 3;

/// The maximum value expressed by 24 bit signed word.
pub const WORD_MAX: i32 = (1 << 23) - 1;
/// The minimum value expressed by 24 bit signed word.
pub const WORD_MIN: i32 = -(1 << 23);

const TFA9887_DMEM_XMEM: u16 = 0x01;

/// Decode the sequence of 3 bytes into signed 24 bit words. Trailing bytes are ignored.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(BYTES_PER_WORD)
        .map(|chunk| {
            let val = ((chunk[0] as i32) << 16) | ((chunk[1] as i32) << 8) | (chunk[2] as i32);
            if chunk[0] & 0x80 > 0 {
                val - (1 << 24)
            } else {
                val
            }
        })
        .collect()
}

/// Encode signed words into the sequence of 3 bytes. The value out of range is saturated.
pub fn words_to_bytes(words: &[i32]) -> Vec<u8> {
    let mut bytes = vec![0; words.len() * BYTES_PER_WORD];
    serialize_words(words, &mut bytes);
    bytes
}

pub(crate) fn serialize_words(words: &[i32], raw: &mut [u8]) {
    assert!(raw.len() >= words.len() * BYTES_PER_WORD);

    words
        .iter()
        .zip(raw.chunks_exact_mut(BYTES_PER_WORD))
        .for_each(|(&word, chunk)| {
            let val = word.clamp(WORD_MIN, WORD_MAX) as u32;
            chunk.copy_from_slice(&val.to_be_bytes()[1..]);
        });
}

/// The trait for operation to read DSP memory.
pub trait Tfa9887MemoryOperation: Tfa9887RegisterOperation {
    /// Read words from X memory of DSP, starting at the offset.
    fn read_mem(&mut self, offset: u16, count: usize) -> Result<Vec<i32>, Error> {
        // Select X memory. The auto-increment is enabled by cleared AIF.
        self.update_register(TFA9887_CF_CONTROLS, 0x000e, TFA9887_DMEM_XMEM << 1)?;
        self.write_register(TFA9887_CF_MAD, offset)?;

        let burst_size = MAX_I2C_LENGTH - MAX_I2C_LENGTH % BYTES_PER_WORD;
        let mut remain = count * BYTES_PER_WORD;
        let mut words = Vec::with_capacity(count);

        while remain > 0 {
            let len = std::cmp::min(remain, burst_size);
            let mut bytes = vec![0; len];
            self.read_block(TFA9887_CF_MEM, &mut bytes)?;
            words.append(&mut bytes_to_words(&bytes));
            remain -= len;
        }

        Ok(words)
    }
}

impl<O: Tfa9887RegisterOperation> Tfa9887MemoryOperation for O {}

#[cfg(test)]
mod test {
    use {super::*, crate::simulator::*};

    #[test]
    fn sign_extension() {
        assert_eq!(bytes_to_words(&[0x80, 0x00, 0x00]), vec![-8388608]);
        assert_eq!(bytes_to_words(&[0x7f, 0xff, 0xff]), vec![8388607]);
        assert_eq!(bytes_to_words(&[0xff, 0xff, 0xff]), vec![-1]);
        assert_eq!(
            bytes_to_words(&[0x00, 0x00, 0x01, 0xff, 0xff, 0xfe, 0x12]),
            vec![1, -2]
        );
    }

    #[test]
    fn saturation() {
        assert_eq!(words_to_bytes(&[9000000]), words_to_bytes(&[8388607]));
        assert_eq!(words_to_bytes(&[9000000]), vec![0x7f, 0xff, 0xff]);
        assert_eq!(words_to_bytes(&[-9000000]), vec![0x80, 0x00, 0x00]);
        assert_eq!(words_to_bytes(&[i32::MIN]), words_to_bytes(&[WORD_MIN]));
    }

    #[test]
    fn stable_after_saturation() {
        [WORD_MIN, -1234567, -1, 0, 1, 4660, WORD_MAX, WORD_MAX + 1, i32::MAX]
            .iter()
            .for_each(|&val| {
                let raw = words_to_bytes(&[val]);
                assert_eq!(words_to_bytes(&bytes_to_words(&raw)), raw);
            });
    }

    #[test]
    fn read_mem_in_bursts() {
        let mut chip = SimChip::default();
        chip.regs.insert(TFA9887_CF_CONTROLS, 0x000e | 0x0100);
        chip.version = 0x123456;

        let words = chip.read_mem(0x2210, 100).unwrap();
        assert_eq!(words.len(), 100);
        assert!(words.iter().all(|&w| w == 0x123456));

        // DMEM is XMEM, AIF is cleared, and the other bits are left.
        assert_eq!(chip.reg(TFA9887_CF_CONTROLS), 0x0102);
        assert_eq!(chip.reg(TFA9887_CF_MAD), 0x2210);
        // 300 bytes are read by 252 and 48 bytes.
        assert_eq!(chip.count_reads(TFA9887_CF_MEM), 2);
    }
}
