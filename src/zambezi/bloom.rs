//! Per-segment Bloom filter summary.
//!
//! Standard double-hashing scheme (Kirsch/Mitzenmacher): two independent hashes are combined
//! as `g_i = h1 + i * h2` to derive `k` bit positions without running `k` independent hash
//! functions. Never produces false negatives; false positives occur at the design rate for
//! `(n, bits_per_element)`.

use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

fn seed_1() -> RandomState {
    RandomState::with_seeds(0x5bd1_e995, 0x27d4_eb2f, 0x1656_67b1, 0x9e37_79b9)
}

fn seed_2() -> RandomState {
    RandomState::with_seeds(0x85eb_ca6b, 0xc2b2_ae35, 0x27d4_eb2f, 0x1656_67b1)
}

#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    k: u32,
}

impl BloomFilter {
    /// `n` is the number of elements the filter will hold; `bits_per_element` sets the
    /// target false-positive rate (larger = lower rate, larger filter).
    pub fn new(n: usize, k: u32, bits_per_element: u32) -> Self {
        let num_bits = target_num_bits(n, bits_per_element);
        let words = num_bits.div_ceil(64);
        BloomFilter {
            bits: vec![0u64; words],
            num_bits,
            k,
        }
    }

    pub fn insert(&mut self, value: u32) {
        let (h1, h2) = self.hashes(value);
        for i in 0..self.k {
            let bit = self.bit_index(h1, h2, i);
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
    }

    pub fn contains(&self, value: u32) -> bool {
        let (h1, h2) = self.hashes(value);
        (0..self.k).all(|i| {
            let bit = self.bit_index(h1, h2, i);
            self.bits[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn as_words(&self) -> &[u64] {
        &self.bits
    }

    pub fn from_words(words: Vec<u64>, num_bits: usize, k: u32) -> Self {
        BloomFilter {
            bits: words,
            num_bits,
            k,
        }
    }

    fn hashes(&self, value: u32) -> (u64, u64) {
        let mut h1 = seed_1().build_hasher();
        h1.write_u32(value);
        let mut h2 = seed_2().build_hasher();
        h2.write_u32(value);
        (h1.finish(), h2.finish())
    }

    fn bit_index(&self, h1: u64, h2: u64, i: u32) -> usize {
        let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (combined % self.num_bits as u64) as usize
    }
}

fn target_num_bits(n: usize, bits_per_element: u32) -> usize {
    (n * bits_per_element as usize).max(64)
}
