//! Per-term indexing buffers: the staging area between "a posting was just observed" and
//! "a block was compressed into the segment pool".
//!
//! Capacity policy (§4.6): a term starts in a small, uncompressed buffer of capacity
//! `df_cutoff`. Once its df crosses that cutoff the buffer is promoted to hold whole [`B`]
//! blocks (the `df_cutoff` postings already collected stay at the head), and subsequent
//! flushes compress full `B`-sized runs into the pool. If block expansion is enabled
//! (`max_blocks > B`), capacity doubles at each flush up to `max_blocks`.

use smallvec::SmallVec;

use crate::pointer_directory::PointerDirectory;
use crate::segment_pool::{SegmentPointer, SegmentPool, B};

/// Inline capacity sized to the default `df_cutoff`: a term's buffer stays on the stack
/// until it's promoted, and only spills to the heap past that.
type PostingVec = SmallVec<[u32; 8]>;

/// Which postings data a term's buffers (and the segments they flush into) carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionalMode {
    NonPositional,
    TfOnly,
    Positional,
}

struct TermBuffer {
    docids: PostingVec,
    tfs: PostingVec,
    /// Flat, gap-encoded positions; doc boundaries are implied by `tfs`.
    positions: PostingVec,
    tail: Option<SegmentPointer>,
    capacity: usize,
    promoted: bool,
}

impl TermBuffer {
    fn new(df_cutoff: usize) -> Self {
        TermBuffer {
            docids: SmallVec::new(),
            tfs: SmallVec::new(),
            positions: SmallVec::new(),
            tail: None,
            capacity: df_cutoff.max(1),
            promoted: false,
        }
    }
}

pub struct BufferMap {
    buffers: Vec<Option<TermBuffer>>,
    df_cutoff: usize,
    max_blocks: usize,
    mode: PositionalMode,
    reverse: bool,
}

impl BufferMap {
    pub fn new(df_cutoff: usize, max_blocks: usize, mode: PositionalMode, reverse: bool) -> Self {
        BufferMap {
            buffers: Vec::new(),
            df_cutoff: df_cutoff.max(1),
            max_blocks: max_blocks.max(B),
            mode,
            reverse,
        }
    }

    fn buffer_mut(&mut self, term: u32) -> &mut TermBuffer {
        let idx = term as usize;
        if idx >= self.buffers.len() {
            self.buffers.resize_with(idx + 1, || None);
        }
        self.buffers[idx].get_or_insert_with(|| TermBuffer::new(self.df_cutoff))
    }

    /// Records one occurrence: `docid` is the document, `tf` its term frequency in that
    /// document (ignored outside [`PositionalMode::TfOnly`]/[`PositionalMode::Positional`]),
    /// `positions` the document's gap-encoded position list (only consulted in
    /// [`PositionalMode::Positional`]). Flushes full blocks into `pool` as capacity fills up,
    /// updating `dir`'s head/tail bookkeeping for this term.
    pub fn add_document(
        &mut self,
        term: u32,
        docid: u32,
        tf: u32,
        positions: &[u32],
        pool: &mut SegmentPool,
        dir: &mut PointerDirectory,
    ) {
        dir.bump_df(term);
        let df_cutoff = self.df_cutoff;
        let max_blocks = self.max_blocks;
        let mode = self.mode;
        let reverse = self.reverse;
        let buf = self.buffer_mut(term);

        if !buf.promoted && buf.docids.len() < df_cutoff {
            buf.docids.push(docid);
            if mode != PositionalMode::NonPositional {
                buf.tfs.push(tf);
            }
            if mode == PositionalMode::Positional {
                buf.positions.extend_from_slice(positions);
            }
            if buf.docids.len() == df_cutoff {
                buf.promoted = true;
                buf.capacity = B;
            }
            return;
        }

        buf.docids.push(docid);
        if mode != PositionalMode::NonPositional {
            buf.tfs.push(tf);
        }
        if mode == PositionalMode::Positional {
            buf.positions.extend_from_slice(positions);
        }

        if buf.docids.len() >= buf.capacity {
            flush_blocks(buf, term, mode, reverse, pool, dir, false);
            if buf.capacity < max_blocks {
                buf.capacity = (buf.capacity * 2).min(max_blocks);
            }
        }
    }

    /// Flushes every term's pending postings: full `B`-sized blocks, then one final short
    /// block for whatever remains. Called once at the end of indexing.
    pub fn flush_all(&mut self, pool: &mut SegmentPool, dir: &mut PointerDirectory) {
        let mode = self.mode;
        let reverse = self.reverse;
        for (term, slot) in self.buffers.iter_mut().enumerate() {
            let Some(buf) = slot else { continue };
            if buf.docids.is_empty() {
                continue;
            }
            flush_blocks(buf, term as u32, mode, reverse, pool, dir, true);
        }
    }
}

fn flush_blocks(
    buf: &mut TermBuffer,
    term: u32,
    mode: PositionalMode,
    reverse: bool,
    pool: &mut SegmentPool,
    dir: &mut PointerDirectory,
    flush_tail: bool,
) {
    let mut pos_offset = 0usize;
    while !buf.docids.is_empty() {
        let take = if buf.docids.len() >= B {
            B
        } else if flush_tail {
            buf.docids.len()
        } else {
            break;
        };

        let docids: Vec<u32> = buf.docids.drain(..take).collect();
        let tfs: Vec<u32> = if mode != PositionalMode::NonPositional {
            buf.tfs.drain(..take).collect()
        } else {
            Vec::new()
        };
        let position_count: usize = if mode == PositionalMode::Positional {
            tfs.iter().map(|&t| t as usize).sum()
        } else {
            0
        };
        let positions: Vec<u32> = if mode == PositionalMode::Positional {
            buf.positions[pos_offset..pos_offset + position_count].to_vec()
        } else {
            Vec::new()
        };
        pos_offset += position_count;

        let new_ptr = match mode {
            PositionalMode::NonPositional => pool.append_nonpositional(&docids, buf.tail, reverse),
            PositionalMode::TfOnly => pool.append_tfonly(&docids, &tfs, buf.tail, reverse),
            PositionalMode::Positional => {
                pool.append_positional(&docids, &tfs, &positions, buf.tail, reverse)
            }
        };

        if buf.tail.is_none() || reverse {
            dir.set_head(term, new_ptr);
        }
        buf.tail = Some(new_ptr);
    }
    if mode == PositionalMode::Positional {
        buf.positions.drain(..pos_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_buffer_not_flushed_until_df_cutoff() {
        let mut pool = SegmentPool::new(None);
        let mut dir = PointerDirectory::new(false);
        let mut buffers = BufferMap::new(2, B, PositionalMode::NonPositional, false);
        buffers.add_document(0, 1, 1, &[], &mut pool, &mut dir);
        assert!(dir.head_ptr(0).is_none());
        buffers.add_document(0, 2, 1, &[], &mut pool, &mut dir);
        assert!(dir.head_ptr(0).is_none());
        assert_eq!(dir.df(0), 2);
    }

    #[test]
    fn promoted_buffer_flushes_at_capacity_b() {
        let mut pool = SegmentPool::new(None);
        let mut dir = PointerDirectory::new(false);
        let mut buffers = BufferMap::new(2, B, PositionalMode::NonPositional, false);
        for docid in 1..=(B as u32 + 2) {
            buffers.add_document(0, docid, 1, &[], &mut pool, &mut dir);
        }
        assert!(dir.head_ptr(0).is_some());
        assert_eq!(dir.df(0), B as u32 + 2);
    }

    #[test]
    fn flush_all_emits_final_short_block() {
        let mut pool = SegmentPool::new(None);
        let mut dir = PointerDirectory::new(false);
        let mut buffers = BufferMap::new(2, B, PositionalMode::NonPositional, false);
        for docid in 1..=5u32 {
            buffers.add_document(0, docid, 1, &[], &mut pool, &mut dir);
        }
        buffers.flush_all(&mut pool, &mut dir);
        let head = dir.head_ptr(0).unwrap();
        let (decoded, n) = pool.decode_docid_block(head, false);
        assert_eq!(&decoded[..n], &[1, 2, 3, 4, 5]);
    }
}
