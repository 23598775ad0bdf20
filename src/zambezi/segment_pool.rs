//! The append-only, chain-linked store of compressed postings segments.
//!
//! A [`SegmentPool`] owns up to [`NUMBER_OF_POOLS`] growable integer arenas ("pools"). Each
//! term's postings live as a linked chain of variable-length [`Segment`] records scattered
//! across those arenas; a [`SegmentPointer`] is an opaque `(pool, offset)` pair with no
//! lifetime tied to it, matching the arena-of-indices pattern used for cyclic/back-pointer
//! structures where ownership can't flow through a Rust reference graph.
//!
//! Pools are allocated lazily: the conceptual per-pool capacity is [`MAX_INT_VALUE`] (the
//! largest offset a 32-bit pointer component can address), but the backing `Vec<u32>` only
//! grows to the high-water mark actually written, rather than reserving that up front.

use crate::bloom::BloomFilter;
use crate::error::ZambeziError;
use crate::pfor::{self, B, BlockMode};

/// Largest offset addressable within a single pool (31 bits to leave room for forward-link
/// sentinels); the practical working set of this implementation is far smaller.
pub const MAX_INT_VALUE: usize = u32::MAX as usize;

/// Maximum number of pools the allocator will create before treating further growth as fatal.
pub const NUMBER_OF_POOLS: usize = 4;

/// Sentinel forward-link pool index meaning "no further segment in the chain".
pub const UNKNOWN: u32 = u32::MAX;

const HEADER_LEN: usize = 8;
// [0] reqspace  [1] fwd_pool  [2] fwd_offset  [3] boundary_docid  [4] bloom_offset
// [5] doc_count [6] flags     [7] csize        then csize docid words, then optional
// tfcsize+tf words, then plen+num_pos_blocks+position sub-blocks, then filterSize+filter words.

const FLAG_HAS_TF: u32 = 1 << 0;
const FLAG_HAS_POSITIONS: u32 = 1 << 1;
const FLAG_HAS_BLOOM: u32 = 1 << 2;

/// Opaque pointer to a segment: high bits identify the pool, low bits the integer offset
/// within it. `None` plays the role of the spec's `UNDEFINED = -1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPointer {
    pub pool: u32,
    pub offset: u32,
}

impl SegmentPointer {
    pub fn to_u64(self) -> u64 {
        ((self.pool as u64) << 32) | self.offset as u64
    }

    pub fn from_u64(raw: u64) -> Option<Self> {
        if raw == u64::MAX {
            None
        } else {
            Some(SegmentPointer {
                pool: (raw >> 32) as u32,
                offset: raw as u32,
            })
        }
    }
}

pub fn undefined_u64() -> u64 {
    u64::MAX
}

/// Bloom filter construction parameters; `None` disables filter writing entirely.
#[derive(Debug, Clone, Copy)]
pub struct BloomParams {
    pub num_hashes: u32,
    pub bits_per_element: u32,
}

pub struct SegmentPool {
    pools: Vec<Vec<u32>>,
    bloom: Option<BloomParams>,
}

impl SegmentPool {
    pub fn new(bloom: Option<BloomParams>) -> Self {
        SegmentPool {
            pools: vec![Vec::new()],
            bloom,
        }
    }

    fn word(&self, ptr: SegmentPointer, idx: usize) -> u32 {
        self.pools[ptr.pool as usize][ptr.offset as usize + idx]
    }

    fn reqspace(&self, ptr: SegmentPointer) -> usize {
        self.word(ptr, 0) as usize
    }

    fn flags(&self, ptr: SegmentPointer) -> u32 {
        self.word(ptr, 6)
    }

    fn csize(&self, ptr: SegmentPointer) -> usize {
        self.word(ptr, 7) as usize
    }

    fn docid_words(&self, ptr: SegmentPointer) -> &[u32] {
        let pool = &self.pools[ptr.pool as usize];
        let start = ptr.offset as usize + HEADER_LEN;
        let end = start + self.csize(ptr);
        &pool[start..end]
    }

    fn tf_section_start(&self, ptr: SegmentPointer) -> usize {
        ptr.offset as usize + HEADER_LEN + self.csize(ptr)
    }

    fn tf_words(&self, ptr: SegmentPointer) -> Option<&[u32]> {
        if self.flags(ptr) & FLAG_HAS_TF == 0 {
            return None;
        }
        let pool = &self.pools[ptr.pool as usize];
        let start = self.tf_section_start(ptr);
        let tfcsize = pool[start] as usize;
        Some(&pool[start + 1..start + 1 + tfcsize])
    }

    fn position_section_start(&self, ptr: SegmentPointer) -> usize {
        let mut offset = self.tf_section_start(ptr);
        if self.flags(ptr) & FLAG_HAS_TF != 0 {
            let pool = &self.pools[ptr.pool as usize];
            let tfcsize = pool[offset] as usize;
            offset += 1 + tfcsize;
        }
        offset
    }

    fn bloom_section_start(&self, ptr: SegmentPointer) -> Option<usize> {
        if self.flags(ptr) & FLAG_HAS_BLOOM == 0 {
            return None;
        }
        Some(ptr.offset as usize + self.word(ptr, 4) as usize)
    }

    /// Maximum docid (min-docid in reverse mode) encoded in this segment.
    pub fn boundary_docid(&self, ptr: SegmentPointer) -> u32 {
        self.word(ptr, 3)
    }

    pub fn doc_count(&self, ptr: SegmentPointer) -> usize {
        self.word(ptr, 5) as usize
    }

    pub fn next(&self, ptr: SegmentPointer) -> Option<SegmentPointer> {
        let pool = self.word(ptr, 1);
        if pool == UNKNOWN {
            None
        } else {
            Some(SegmentPointer {
                pool,
                offset: self.word(ptr, 2),
            })
        }
    }

    pub fn decode_docid_block(&self, ptr: SegmentPointer, reverse: bool) -> ([u32; B], usize) {
        pfor::decode(self.docid_words(ptr), BlockMode::Docid, reverse)
    }

    pub fn decode_tf_block(&self, ptr: SegmentPointer) -> ([u32; B], usize) {
        match self.tf_words(ptr) {
            Some(words) => pfor::decode(words, BlockMode::Value, false),
            None => ([0u32; B], 0),
        }
    }

    pub fn position_block_count(&self, ptr: SegmentPointer) -> usize {
        if self.flags(ptr) & FLAG_HAS_POSITIONS == 0 {
            return 0;
        }
        let pool = &self.pools[ptr.pool as usize];
        let start = self.position_section_start(ptr);
        pool[start + 1] as usize
    }

    /// Decode the `block_idx`-th position sub-block (each sub-block holds up to `B` gap-coded
    /// positions spanning possibly several documents).
    pub fn decode_position_block(&self, ptr: SegmentPointer, block_idx: usize) -> ([u32; B], usize) {
        let pool = &self.pools[ptr.pool as usize];
        let start = self.position_section_start(ptr);
        let num_blocks = pool[start + 1] as usize;
        assert!(block_idx < num_blocks, "position sub-block index out of range");
        let mut offset = start + 2;
        for _ in 0..block_idx {
            let len = pool[offset] as usize;
            offset += 1 + len;
        }
        let len = pool[offset] as usize;
        let words = &pool[offset + 1..offset + 1 + len];
        pfor::decode(words, BlockMode::Value, false)
    }

    /// Recover the `i`-th document's ungapped position list, given the segment's decoded tf
    /// block (`tfs`, with `tfs[i]` positions belonging to document `i`).
    pub fn decode_positions_for(&self, ptr: SegmentPointer, tfs: &[u32], i: usize) -> Vec<u32> {
        let total_positions: usize = tfs.iter().map(|&t| t as usize).sum();
        let mut flat = Vec::with_capacity(total_positions);
        let num_blocks = self.position_block_count(ptr);
        for b in 0..num_blocks {
            let (block, len) = self.decode_position_block(ptr, b);
            flat.extend_from_slice(&block[..len]);
        }
        let skip: usize = tfs[..i].iter().map(|&t| t as usize).sum();
        let take = tfs[i] as usize;
        let mut out = Vec::with_capacity(take);
        let mut acc = 0u32;
        for &gap in &flat[skip..skip + take] {
            acc += gap;
            out.push(acc);
        }
        out
    }

    /// Walk forward from `*ptr` over Bloom-bearing segments until one whose boundary docid
    /// has passed `docid`, testing the filter (or doing an exact check when no filter is
    /// present). Updates `*ptr` to the segment actually tested and returns the result.
    pub fn contains_docid(&self, ptr: &mut SegmentPointer, docid: u32, reverse: bool) -> bool {
        loop {
            let boundary = self.boundary_docid(*ptr);
            let past_boundary = if reverse { boundary <= docid } else { boundary >= docid };
            if past_boundary {
                return match self.bloom_section_start(*ptr) {
                    Some(start) => {
                        let pool = &self.pools[ptr.pool as usize];
                        let num_bits = pool[start] as usize;
                        let k = pool[start + 1];
                        let word_count = num_bits.div_ceil(64);
                        let words: Vec<u64> = (0..word_count)
                            .map(|i| {
                                let lo = pool[start + 2 + i * 2] as u64;
                                let hi = pool[start + 2 + i * 2 + 1] as u64;
                                lo | (hi << 32)
                            })
                            .collect();
                        let filter = BloomFilter::from_words(words, num_bits, k);
                        filter.contains(docid)
                    }
                    None => {
                        let (decoded, n) = self.decode_docid_block(*ptr, reverse);
                        decoded[..n].contains(&docid)
                    }
                };
            }
            match self.next(*ptr) {
                Some(next) => *ptr = next,
                None => return false,
            }
        }
    }

    pub fn append_nonpositional(
        &mut self,
        docids: &[u32],
        tail: Option<SegmentPointer>,
        reverse: bool,
    ) -> SegmentPointer {
        self.append(docids, None, None, tail, reverse)
    }

    pub fn append_tfonly(
        &mut self,
        docids: &[u32],
        tfs: &[u32],
        tail: Option<SegmentPointer>,
        reverse: bool,
    ) -> SegmentPointer {
        self.append(docids, Some(tfs), None, tail, reverse)
    }

    pub fn append_positional(
        &mut self,
        docids: &[u32],
        tfs: &[u32],
        positions: &[u32],
        tail: Option<SegmentPointer>,
        reverse: bool,
    ) -> SegmentPointer {
        self.append(docids, Some(tfs), Some(positions), tail, reverse)
    }

    fn append(
        &mut self,
        docids: &[u32],
        tfs: Option<&[u32]>,
        positions: Option<&[u32]>,
        tail: Option<SegmentPointer>,
        reverse: bool,
    ) -> SegmentPointer {
        assert!(!docids.is_empty() && docids.len() <= B, "segment must hold 1..=B postings");

        let (docids, tfs, positions) = if reverse {
            let rev_docids: Vec<u32> = docids.iter().rev().copied().collect();
            let rev_tfs = tfs.map(|t| t.iter().rev().copied().collect::<Vec<u32>>());
            let rev_positions = match (tfs, positions) {
                (Some(tfs), Some(positions)) => Some(reverse_positions(tfs, positions)),
                _ => positions.map(|p| p.to_vec()),
            };
            (rev_docids, rev_tfs, rev_positions)
        } else {
            (docids.to_vec(), tfs.map(|t| t.to_vec()), positions.map(|p| p.to_vec()))
        };

        // Forward mode stores ascending runs, so the last element is the max docid; reverse
        // mode physically reverses the run to descending, so the last element is the min.
        // Either way the "boundary" the chain walk checks against is `docids[last]`.
        let boundary_docid = docids[docids.len() - 1];

        let docid_compressed = pfor::encode(&docids, BlockMode::Docid, reverse);

        let mut flags = 0u32;
        let mut body: Vec<u32> = Vec::new();
        body.extend(&docid_compressed);

        if let Some(tfs) = &tfs {
            flags |= FLAG_HAS_TF;
            let tf_compressed = pfor::encode(tfs, BlockMode::Value, false);
            body.push(tf_compressed.len() as u32);
            body.extend(&tf_compressed);
        }

        if let Some(positions) = &positions {
            flags |= FLAG_HAS_POSITIONS;
            let sub_blocks: Vec<Vec<u32>> = positions
                .chunks(B)
                .map(|chunk| pfor::encode(chunk, BlockMode::Value, false))
                .collect();
            body.push(positions.len() as u32);
            body.push(sub_blocks.len() as u32);
            for sub in &sub_blocks {
                body.push(sub.len() as u32);
                body.extend(sub);
            }
        }

        let bloom_offset_marker = body.len();
        if let Some(params) = self.bloom {
            flags |= FLAG_HAS_BLOOM;
            let mut filter = BloomFilter::new(docids.len(), params.num_hashes, params.bits_per_element);
            for &d in &docids {
                filter.insert(d);
            }
            body.push(filter.num_bits() as u32);
            body.push(filter.k());
            for &w in filter.as_words() {
                body.push(w as u32);
                body.push((w >> 32) as u32);
            }
        }

        let reqspace = HEADER_LEN + body.len();
        let bloom_offset = if flags & FLAG_HAS_BLOOM != 0 {
            HEADER_LEN + bloom_offset_marker
        } else {
            0
        };

        let mut header = vec![0u32; HEADER_LEN];
        header[0] = reqspace as u32;
        header[1] = UNKNOWN;
        header[2] = 0;
        header[3] = boundary_docid;
        header[4] = bloom_offset as u32;
        header[5] = docids.len() as u32;
        header[6] = flags;
        header[7] = docid_compressed.len() as u32;

        let mut record = header;
        record.extend(body);

        let new_ptr = self.place(&record);

        match tail {
            None => {}
            Some(tail_ptr) if !reverse => {
                self.set_word(tail_ptr, 1, new_ptr.pool);
                self.set_word(tail_ptr, 2, new_ptr.offset);
            }
            Some(tail_ptr) => {
                self.set_word(new_ptr, 1, tail_ptr.pool);
                self.set_word(new_ptr, 2, tail_ptr.offset);
            }
        }

        new_ptr
    }

    fn set_word(&mut self, ptr: SegmentPointer, idx: usize, value: u32) {
        self.pools[ptr.pool as usize][ptr.offset as usize + idx] = value;
    }

    fn place(&mut self, record: &[u32]) -> SegmentPointer {
        let mut pool_idx = self.pools.len() - 1;
        let mut pool_len = self.pools[pool_idx].len();
        if pool_len + record.len() > MAX_INT_VALUE {
            pool_idx += 1;
            if pool_idx >= NUMBER_OF_POOLS {
                // Fatal by policy, no recovery path once the arena is out of room, so this
                // constructs the error only to format a panic message, never a Result.
                panic!("{}", ZambeziError::PoolsExhausted(format!("all {NUMBER_OF_POOLS} pools are full")));
            }
            self.pools.push(Vec::new());
            pool_len = 0;
        }
        let offset = pool_len;
        self.pools[pool_idx].extend_from_slice(record);
        SegmentPointer {
            pool: pool_idx as u32,
            offset: offset as u32,
        }
    }

    pub fn write<W: std::io::Write>(&self, w: &mut W) -> crate::error::Result<()> {
        use crate::utils::write_u32;
        write_u32(w, self.pools.len() as u32 - 1)?;
        write_u32(w, *self.pools.last().map(|p| p.len()).get_or_insert(0) as u32)?;
        write_u32(w, self.bloom.is_some() as u32)?;
        write_u32(w, self.bloom.map(|b| b.num_hashes).unwrap_or(0))?;
        write_u32(w, self.bloom.map(|b| b.bits_per_element).unwrap_or(0))?;
        for pool in &self.pools {
            write_u32(w, pool.len() as u32)?;
            crate::utils::write_u32_slice(w, pool)?;
        }
        Ok(())
    }

    pub fn read<R: std::io::Read>(r: &mut R) -> crate::error::Result<Self> {
        use crate::utils::read_u32;
        let segment = read_u32(r)?;
        if segment as usize >= NUMBER_OF_POOLS {
            return Err(ZambeziError::CorruptIndex(format!(
                "segment index {segment} exceeds {NUMBER_OF_POOLS} pools"
            )));
        }
        let _offset = read_u32(r)?;
        let bloom_enabled = read_u32(r)? != 0;
        let nb_hash = read_u32(r)?;
        let bits_per_element = read_u32(r)?;
        let bloom = bloom_enabled.then_some(BloomParams {
            num_hashes: nb_hash,
            bits_per_element,
        });
        let mut pools = Vec::new();
        for _ in 0..=segment {
            let len = read_u32(r)? as usize;
            pools.push(crate::utils::read_u32_vec(r, len)?);
        }
        Ok(SegmentPool { pools, bloom })
    }
}

fn reverse_positions(tfs: &[u32], positions: &[u32]) -> Vec<u32> {
    let mut doc_slices = Vec::with_capacity(tfs.len());
    let mut offset = 0usize;
    for &tf in tfs {
        let tf = tf as usize;
        doc_slices.push(&positions[offset..offset + tf]);
        offset += tf;
    }
    doc_slices.iter().rev().flat_map(|s| s.iter().copied()).collect()
}
