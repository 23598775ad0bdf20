//! Small, dependency-free binary I/O helpers used by the persistence layer and the codec.
//!
//! Mirrors the style of a hand-rolled binary format: fixed-width reads/writes over a byte
//! buffer, plus a bit-level reader/writer for the PForDelta codec's variable bit-width packing.

use std::io::{self, Read, Write};

pub(crate) fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn write_u32_slice<W: Write>(w: &mut W, values: &[u32]) -> io::Result<()> {
    for &v in values {
        write_u32(w, v)?;
    }
    Ok(())
}

pub(crate) fn read_u32_vec<R: Read>(r: &mut R, count: usize) -> io::Result<Vec<u32>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_u32(r)?);
    }
    Ok(out)
}

pub(crate) fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_u32(w, s.len() as u32)?;
    w.write_all(s.as_bytes())
}

pub(crate) fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Packs fixed-width (`bits`-wide, `bits` in `1..=32`) values into `u32` words, LSB-first.
pub(crate) struct BitWriter {
    words: Vec<u32>,
    acc: u64,
    acc_bits: u32,
}

impl BitWriter {
    pub(crate) fn new() -> Self {
        BitWriter {
            words: Vec::new(),
            acc: 0,
            acc_bits: 0,
        }
    }

    pub(crate) fn push(&mut self, value: u32, bits: u32) {
        debug_assert!(bits <= 32);
        if bits == 0 {
            return;
        }
        let masked = if bits == 32 {
            value as u64
        } else {
            (value as u64) & ((1u64 << bits) - 1)
        };
        self.acc |= masked << self.acc_bits;
        self.acc_bits += bits;
        while self.acc_bits >= 32 {
            self.words.push((self.acc & 0xFFFF_FFFF) as u32);
            self.acc >>= 32;
            self.acc_bits -= 32;
        }
    }

    pub(crate) fn finish(mut self) -> Vec<u32> {
        if self.acc_bits > 0 {
            self.words.push((self.acc & 0xFFFF_FFFF) as u32);
        }
        self.words
    }
}

/// Reads fixed-width values back out of a `u32` slice written by `BitWriter`.
pub(crate) struct BitReader<'a> {
    words: &'a [u32],
    word_index: usize,
    acc: u64,
    acc_bits: u32,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(words: &'a [u32]) -> Self {
        BitReader {
            words,
            word_index: 0,
            acc: 0,
            acc_bits: 0,
        }
    }

    pub(crate) fn pull(&mut self, bits: u32) -> u32 {
        debug_assert!(bits <= 32);
        if bits == 0 {
            return 0;
        }
        while self.acc_bits < bits {
            let word = self.words.get(self.word_index).copied().unwrap_or(0);
            self.word_index += 1;
            self.acc |= (word as u64) << self.acc_bits;
            self.acc_bits += 32;
        }
        let mask = if bits == 32 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };
        let value = (self.acc & mask) as u32;
        self.acc >>= bits;
        self.acc_bits -= bits;
        value
    }
}

pub(crate) fn bits_needed(value: u32) -> u32 {
    32 - value.leading_zeros()
}
