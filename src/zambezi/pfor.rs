//! PForDelta-family block codec.
//!
//! Compresses runs of up to [`B`] unsigned integers at a time: most values are packed at a
//! single bit width `b` chosen to cover the bulk of the block, and the few values that don't
//! fit (the "exceptions") are patched in separately. This is the classic "patched frontier"
//! scheme the family is named for.
//!
//! `encode`/`decode` are pure functions over integer slices: they never see a [`SegmentPool`]
//! or a pool pointer. [`BlockMode`] and `reverse` answer two independent questions: whether
//! this block needs delta/gap decoding at all (`BlockMode`), and which physical direction a
//! docid run runs in (`reverse`). A forward-mode docid run is ascending, so each gap is
//! `current - previous`; a reverse-mode run is descending (the caller already physically
//! reversed it before calling `encode`), so each gap is `previous - current` instead, keeping
//! gaps small in both directions rather than wrapping to near-`u32::MAX`.
//!
//! [`SegmentPool`]: crate::segment_pool::SegmentPool

use crate::utils::{BitReader, BitWriter, bits_needed};

/// Fixed block size: all codec operations work on runs of exactly this many integers.
pub const B: usize = 128;

/// Percentile of the block's bit-length distribution used to pick the packed width.
/// Values above the resulting width are carried as exceptions instead of widening every slot.
const PERCENTILE: f64 = 0.9;

/// Whether a block holds a monotone docid run (needs delta/gap decoding) or independent
/// values (tf counts, already-gapped positions) that are packed as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Docid,
    Value,
}

/// Compress `input` (length `n <= B`) into a self-describing word sequence.
///
/// `reverse` selects the gap direction used for [`BlockMode::Docid`]: forward mode expects
/// `input` ascending and gaps against the previous (smaller) element; reverse mode expects
/// `input` descending and gaps against the previous (larger) element. Ignored for
/// [`BlockMode::Value`], which never delta-codes.
pub fn encode(input: &[u32], mode: BlockMode, reverse: bool) -> Vec<u32> {
    let n = input.len();
    assert!(n <= B, "block exceeds {B} elements");

    let values: Vec<u32> = match mode {
        BlockMode::Docid => delta_encode(input, reverse),
        BlockMode::Value => input.to_vec(),
    };

    let width = pick_width(&values);
    let mask: u64 = if width >= 32 { u32::MAX as u64 } else { (1u64 << width) - 1 };

    let mut writer = BitWriter::new();
    let mut exceptions: Vec<(u32, u32)> = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if width < 32 && (v as u64) > mask {
            writer.push(0, width);
            exceptions.push((i as u32, v));
        } else {
            writer.push(v, width);
        }
    }
    let packed = writer.finish();

    let mut out = Vec::with_capacity(4 + packed.len() + exceptions.len() * 2);
    out.push(width);
    out.push(n as u32);
    out.push(exceptions.len() as u32);
    out.push(packed.len() as u32);
    out.extend(packed);
    for (idx, val) in exceptions {
        out.push(idx);
        out.push(val);
    }
    out
}

/// Decompress a word sequence produced by [`encode`] into a zero-padded array of length [`B`].
/// Returns the true element count `n` that was passed to `encode`. `reverse` must match the
/// value passed to the original `encode` call for this block.
pub fn decode(compressed: &[u32], mode: BlockMode, reverse: bool) -> ([u32; B], usize) {
    let width = compressed[0];
    let n = compressed[1] as usize;
    assert!(n <= B, "corrupt block: element count {n} exceeds {B}");
    let exception_count = compressed[2] as usize;
    let packed_len = compressed[3] as usize;

    let packed_start = 4;
    let packed_end = packed_start + packed_len;
    assert!(
        compressed.len() >= packed_end + exception_count * 2,
        "corrupt block: size header exceeds buffer"
    );
    let packed = &compressed[packed_start..packed_end];

    let mut values = [0u32; B];
    let mut reader = BitReader::new(packed);
    for slot in values.iter_mut().take(n) {
        *slot = reader.pull(width);
    }

    let exceptions_start = packed_end;
    for e in 0..exception_count {
        let idx = compressed[exceptions_start + e * 2] as usize;
        let val = compressed[exceptions_start + e * 2 + 1];
        assert!(idx < n, "corrupt block: exception index {idx} out of range");
        values[idx] = val;
    }

    if mode == BlockMode::Docid {
        delta_decode_in_place(&mut values, n, reverse);
    }

    (values, n)
}

fn delta_encode(input: &[u32], reverse: bool) -> Vec<u32> {
    let mut out = Vec::with_capacity(input.len());
    let mut prev = 0u32;
    for (i, &v) in input.iter().enumerate() {
        if i == 0 {
            out.push(v);
        } else if reverse {
            out.push(prev.wrapping_sub(v));
        } else {
            out.push(v.wrapping_sub(prev));
        }
        prev = v;
    }
    out
}

fn delta_decode_in_place(values: &mut [u32; B], n: usize, reverse: bool) {
    if n == 0 {
        return;
    }
    if reverse {
        let mut acc = values[0];
        for slot in values.iter_mut().take(n).skip(1) {
            acc = acc.wrapping_sub(*slot);
            *slot = acc;
        }
    } else {
        let mut acc = 0u32;
        for slot in values.iter_mut().take(n) {
            acc = acc.wrapping_add(*slot);
            *slot = acc;
        }
    }
}

fn pick_width(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let mut bits: Vec<u32> = values.iter().map(|&v| bits_needed(v)).collect();
    bits.sort_unstable();
    let idx = (((bits.len() - 1) as f64) * PERCENTILE).round() as usize;
    bits[idx.min(bits.len() - 1)].min(32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_full_block_value_mode() {
        let input: Vec<u32> = (0..B as u32).map(|i| i * 3 + 1).collect();
        let compressed = encode(&input, BlockMode::Value, false);
        let (decoded, n) = decode(&compressed, BlockMode::Value, false);
        assert_eq!(n, B);
        assert_eq!(&decoded[..], &input[..]);
    }

    #[test]
    fn round_trip_full_block_docid_mode() {
        let mut input = Vec::with_capacity(B);
        let mut docid = 5u32;
        for _ in 0..B {
            input.push(docid);
            docid += 7;
        }
        let compressed = encode(&input, BlockMode::Docid, false);
        let (decoded, n) = decode(&compressed, BlockMode::Docid, false);
        assert_eq!(n, B);
        assert_eq!(&decoded[..], &input[..]);
    }

    #[test]
    fn round_trip_full_block_docid_mode_reverse() {
        let mut input = Vec::with_capacity(B);
        let mut docid = 900u32;
        for _ in 0..B {
            input.push(docid);
            docid -= 7;
        }
        let compressed = encode(&input, BlockMode::Docid, true);
        // gaps must stay small (7) rather than wrapping to near u32::MAX, so the packed
        // width stays far below 32 bits: header (4 words) + exceptions (0) well under the
        // all-exception-width-32 worst case of B words.
        assert!(compressed.len() < B);
        let (decoded, n) = decode(&compressed, BlockMode::Docid, true);
        assert_eq!(n, B);
        assert_eq!(&decoded[..], &input[..]);
    }

    #[test]
    fn round_trip_short_tail_zero_padded() {
        let input: Vec<u32> = vec![2, 9, 40, 41];
        let compressed = encode(&input, BlockMode::Docid, false);
        let (decoded, n) = decode(&compressed, BlockMode::Docid, false);
        assert_eq!(n, input.len());
        assert_eq!(&decoded[..n], &input[..]);
        assert!(decoded[n..].iter().all(|&v| v == 0));
    }

    #[test]
    fn round_trip_with_outliers() {
        let mut input = vec![1u32; B];
        input[3] = 1_000_000;
        input[100] = 500_000;
        let compressed = encode(&input, BlockMode::Value, false);
        let (decoded, n) = decode(&compressed, BlockMode::Value, false);
        assert_eq!(n, B);
        assert_eq!(&decoded[..], &input[..]);
    }

    #[test]
    fn round_trip_all_zero_block() {
        let input = vec![0u32; B];
        let compressed = encode(&input, BlockMode::Value, false);
        let (decoded, n) = decode(&compressed, BlockMode::Value, false);
        assert_eq!(n, B);
        assert!(decoded.iter().all(|&v| v == 0));
    }

    #[test]
    #[should_panic(expected = "corrupt block")]
    fn decode_rejects_truncated_buffer() {
        let input: Vec<u32> = (0..10).collect();
        let mut compressed = encode(&input, BlockMode::Value, false);
        compressed.truncate(compressed.len() - 1);
        let _ = decode(&compressed, BlockMode::Value, false);
    }
}
