//! Query evaluator: shared term-resolution preamble plus the five traversal algorithms
//! (SvS, WAND, MBWAND, BWAND_AND, BWAND_OR) over compressed segment chains.
//!
//! [`Searcher`] is a read-only façade over a finished [`BuiltIndex`]; it borrows the
//! dictionary, pointer directory and segment pool immutably, so independent `Searcher`s (or
//! independent calls on the same one) may run concurrently across threads with no locking —
//! the core itself still spawns none.

use ahash::AHashSet;

use crate::bm25::{bm25_score, idf};
use crate::driver::BuiltIndex;
use crate::min_heap::MinHeap;
pub use crate::min_heap::Candidate;
use crate::pfor::B;
use crate::segment_pool::{SegmentPointer, SegmentPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    SvS,
    Wand,
    MbWand,
    BwandAnd,
    BwandOr,
}

impl Algorithm {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "SvS" => Some(Algorithm::SvS),
            "WAND" => Some(Algorithm::Wand),
            "MBWAND" => Some(Algorithm::MbWand),
            "BWAND_AND" => Some(Algorithm::BwandAnd),
            "BWAND_OR" => Some(Algorithm::BwandOr),
            _ => None,
        }
    }
}

pub struct Searcher<'a> {
    index: &'a BuiltIndex,
}

impl<'a> Searcher<'a> {
    pub fn new(index: &'a BuiltIndex) -> Self {
        Searcher { index }
    }

    /// Resolves query term strings to term ids, dropping terms absent from the dictionary or
    /// with an empty posting list, and sorts the survivors by ascending df — uniformly, for
    /// every algorithm (§9 Open Questions).
    pub fn resolve_terms(&self, terms: &[String]) -> Vec<u32> {
        let dir = &self.index.pointer_directory;
        let mut ids: Vec<u32> = terms
            .iter()
            .filter_map(|t| self.index.dictionary.lookup(t))
            .filter(|&id| dir.df(id) > 0)
            .collect();
        ids.sort_by_key(|&id| dir.df(id));
        ids.dedup();
        ids
    }

    pub fn evaluate(&self, terms: &[String], algorithm: Algorithm, hits: usize) -> Vec<Candidate> {
        let term_ids = self.resolve_terms(terms);
        if term_ids.is_empty() {
            return Vec::new();
        }
        match algorithm {
            Algorithm::SvS => self
                .svs(&term_ids, hits)
                .into_iter()
                .map(|doc_id| Candidate { doc_id, score: 0.0 })
                .collect(),
            Algorithm::Wand => self.wand(&term_ids, hits, false),
            Algorithm::MbWand => self.wand(&term_ids, hits, true),
            Algorithm::BwandAnd => self
                .bwand_and(&term_ids)
                .into_iter()
                .map(|doc_id| Candidate { doc_id, score: 0.0 })
                .collect(),
            Algorithm::BwandOr => self.bwand_or(&term_ids, hits),
        }
    }

    /// Conjunctive top-k: walks the shortest list and probes every longer list with a
    /// block-skipping advance, emitting docids present in all lists in the order the shortest
    /// list's chain is traversed (ascending in forward mode, descending in reverse mode).
    pub fn svs(&self, term_ids: &[u32], hits: usize) -> Vec<u32> {
        let reverse = self.index.reverse;
        let pool = &self.index.segment_pool;
        let dir = &self.index.pointer_directory;
        let hits = if hits == 0 { dir.df(term_ids[0]) as usize } else { hits };

        let mut cursors: Vec<PostingCursor> = term_ids
            .iter()
            .map(|&t| PostingCursor::new(pool, dir.head_ptr(t), reverse))
            .collect();

        let mut results = Vec::new();
        'outer: while let Some(candidate) = cursors[0].current() {
            if results.len() >= hits {
                break;
            }
            for cursor in cursors.iter_mut().skip(1) {
                cursor.advance_to(candidate, reverse);
                match cursor.current() {
                    Some(d) if d == candidate => continue,
                    _ => {
                        cursors[0].advance();
                        continue 'outer;
                    }
                }
            }
            results.push(candidate);
            cursors[0].advance();
        }
        results
    }

    /// Disjunctive top-k via the WAND pivoting algorithm. `idf_only` selects the MBWAND
    /// variant, which bounds and scores purely on IDF (no tf needed).
    pub fn wand(&self, term_ids: &[u32], hits: usize, idf_only: bool) -> Vec<Candidate> {
        let reverse = self.index.reverse;
        let pool = &self.index.segment_pool;
        let dir = &self.index.pointer_directory;
        let total_docs = dir.total_docs();
        let avgdl = dir.avg_doc_len();
        let hits = hits.max(1);

        let mut cursors: Vec<PostingCursor> = term_ids
            .iter()
            .map(|&t| PostingCursor::new(pool, dir.head_ptr(t), reverse))
            .collect();
        let upper_bounds: Vec<f32> = term_ids
            .iter()
            .map(|&t| {
                let term_idf = idf(total_docs, dir.df(t));
                if idf_only { term_idf } else { term_idf * dir.max_tf(t) }
            })
            .collect();

        let mut heap = MinHeap::new(hits);

        loop {
            let mut order: Vec<usize> = (0..cursors.len()).filter(|&i| cursors[i].current().is_some()).collect();
            if order.is_empty() {
                break;
            }
            order.sort_by_key(|&i| order_key(cursors[i].current().unwrap(), reverse));

            let threshold = heap.threshold(hits);
            let mut cumulative = 0.0f32;
            let mut pivot = None;
            for (pos, &i) in order.iter().enumerate() {
                cumulative += upper_bounds[i];
                if cumulative > threshold {
                    pivot = Some(pos);
                    break;
                }
            }
            let Some(pivot_pos) = pivot else { break };
            let pivot_cursor = order[pivot_pos];
            let pivot_docid = cursors[pivot_cursor].current().unwrap();

            if cursors[order[0]].current() == Some(pivot_docid) {
                let mut score = 0.0f32;
                for &i in &order {
                    if cursors[i].current() == Some(pivot_docid) {
                        let term = term_ids[i];
                        score += if idf_only {
                            idf(total_docs, dir.df(term))
                        } else {
                            let tf = cursors[i].current_tf();
                            let dl = dir.doc_len(pivot_docid) as f32;
                            bm25_score(tf as f32, dl, avgdl, total_docs, dir.df(term))
                        };
                        cursors[i].advance();
                    } else {
                        break;
                    }
                }
                heap.add_topk(score, pivot_docid, hits);
            } else {
                cursors[order[0]].advance_to(pivot_docid, reverse);
            }
        }

        heap.into_sorted()
    }

    /// Conjunctive Bloom-only retrieval: candidates come from the shortest list's real
    /// postings, every other term is checked with `contains_docid`.
    pub fn bwand_and(&self, term_ids: &[u32]) -> Vec<u32> {
        let reverse = self.index.reverse;
        let pool = &self.index.segment_pool;
        let dir = &self.index.pointer_directory;

        let Some((&shortest, rest)) = term_ids.split_first() else {
            return Vec::new();
        };
        let Some(head) = dir.head_ptr(shortest) else {
            return Vec::new();
        };
        let candidates = decode_full_chain(pool, head, reverse);

        candidates
            .into_iter()
            .filter(|&docid| {
                rest.iter().all(|&t| match dir.head_ptr(t) {
                    None => false,
                    Some(mut ptr) => pool.contains_docid(&mut ptr, docid, reverse),
                })
            })
            .collect()
    }

    /// Disjunctive Bloom-only retrieval: candidates are the union of every term's real
    /// postings, scored by summing the IDF of every filter that passes.
    pub fn bwand_or(&self, term_ids: &[u32], hits: usize) -> Vec<Candidate> {
        let reverse = self.index.reverse;
        let pool = &self.index.segment_pool;
        let dir = &self.index.pointer_directory;
        let total_docs = dir.total_docs();
        let hits = hits.max(1);

        let mut candidates: AHashSet<u32> = AHashSet::new();
        for &t in term_ids {
            if let Some(head) = dir.head_ptr(t) {
                candidates.extend(decode_full_chain(pool, head, reverse));
            }
        }

        let mut heap = MinHeap::new(hits);
        for docid in candidates {
            let mut score = 0.0f32;
            for &t in term_ids {
                if let Some(mut ptr) = dir.head_ptr(t) {
                    if pool.contains_docid(&mut ptr, docid, reverse) {
                        score += idf(total_docs, dir.df(t));
                    }
                }
            }
            heap.add_topk(score, docid, hits);
        }
        heap.into_sorted()
    }
}

fn order_key(docid: u32, reverse: bool) -> i64 {
    if reverse { -(docid as i64) } else { docid as i64 }
}

fn decode_full_chain(pool: &SegmentPool, head: SegmentPointer, reverse: bool) -> Vec<u32> {
    let mut out = Vec::new();
    let mut cur = Some(head);
    while let Some(ptr) = cur {
        let (block, n) = pool.decode_docid_block(ptr, reverse);
        out.extend_from_slice(&block[..n]);
        cur = pool.next(ptr);
    }
    out
}

/// Walks a single term's chain, decoding blocks on demand and supporting the block-skipping
/// advance both SvS and WAND need.
struct PostingCursor<'a> {
    pool: &'a SegmentPool,
    ptr: Option<SegmentPointer>,
    docids: [u32; B],
    tfs: [u32; B],
    has_tf: bool,
    len: usize,
    pos: usize,
    reverse: bool,
}

impl<'a> PostingCursor<'a> {
    fn new(pool: &'a SegmentPool, head: Option<SegmentPointer>, reverse: bool) -> Self {
        let mut cursor = PostingCursor {
            pool,
            ptr: head,
            docids: [0; B],
            tfs: [0; B],
            has_tf: false,
            len: 0,
            pos: 0,
            reverse,
        };
        if let Some(ptr) = head {
            cursor.load_block(ptr, reverse);
        }
        cursor
    }

    fn load_block(&mut self, ptr: SegmentPointer, reverse: bool) {
        let (docids, len) = self.pool.decode_docid_block(ptr, reverse);
        self.docids = docids;
        self.len = len;
        self.pos = 0;
        let (tfs, tf_len) = self.pool.decode_tf_block(ptr);
        self.has_tf = tf_len > 0;
        self.tfs = tfs;
    }

    fn current(&self) -> Option<u32> {
        if self.ptr.is_some() && self.pos < self.len {
            Some(self.docids[self.pos])
        } else {
            None
        }
    }

    fn current_tf(&self) -> u32 {
        if self.has_tf { self.tfs[self.pos] } else { 1 }
    }

    fn advance(&mut self) {
        self.pos += 1;
        if self.pos >= self.len {
            match self.ptr.and_then(|p| self.pool.next(p)) {
                Some(next) => {
                    self.ptr = Some(next);
                    self.load_block(next, self.reverse);
                }
                None => {
                    self.ptr = None;
                    self.len = 0;
                    self.pos = 0;
                }
            }
        }
    }

    /// Advances past whole segments whose boundary docid hasn't reached `target` yet, then
    /// scans linearly within the landing block.
    fn advance_to(&mut self, target: u32, reverse: bool) {
        loop {
            let Some(ptr) = self.ptr else { return };
            let boundary = self.pool.boundary_docid(ptr);
            let segment_exhausted = if reverse { boundary > target } else { boundary < target };
            if segment_exhausted {
                match self.pool.next(ptr) {
                    Some(next) => {
                        self.ptr = Some(next);
                        self.load_block(next, reverse);
                        continue;
                    }
                    None => {
                        self.ptr = None;
                        self.len = 0;
                        self.pos = 0;
                        return;
                    }
                }
            }
            while self.pos < self.len {
                let d = self.docids[self.pos];
                let reached = if reverse { d <= target } else { d >= target };
                if reached {
                    return;
                }
                self.pos += 1;
            }
            match self.pool.next(ptr) {
                Some(next) => {
                    self.ptr = Some(next);
                    self.load_block(next, reverse);
                }
                None => {
                    self.ptr = None;
                    self.len = 0;
                    self.pos = 0;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{IndexBuilder, IndexingConfig};
    use crate::segment_pool::BloomParams;

    fn build(lines: &[&str], config: IndexingConfig) -> BuiltIndex {
        let mut builder = IndexBuilder::new(config);
        for line in lines {
            builder.index_document(line).unwrap();
        }
        builder.finish()
    }

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scenario_a_svs_conjunctive() {
        let index = build(
            &["1\ta b c", "2\ta a b", "3\tb c c"],
            IndexingConfig {
                df_cutoff: 1,
                ..Default::default()
            },
        );
        let searcher = Searcher::new(&index);
        let ab = searcher.svs(&searcher.resolve_terms(&terms(&["a", "b"])), 0);
        assert_eq!(ab, vec![1, 2]);
        let bc = searcher.svs(&searcher.resolve_terms(&terms(&["b", "c"])), 0);
        assert_eq!(bc, vec![1, 3]);
    }

    #[test]
    fn scenario_d_reverse_svs_descending() {
        let index = build(
            &["1\ta", "2\ta", "3\ta"],
            IndexingConfig {
                df_cutoff: 1,
                reverse: true,
                ..Default::default()
            },
        );
        let searcher = Searcher::new(&index);
        let result = searcher.svs(&searcher.resolve_terms(&terms(&["a"])), 3);
        assert_eq!(result, vec![3, 2, 1]);
    }

    #[test]
    fn scenario_e_bwand_and_with_bloom() {
        let index = build(
            &[
                "1\ta b", "2\ta", "7\ta b", "8\tb", "13\ta b", "20\ta", "21\tb",
            ],
            IndexingConfig {
                df_cutoff: 1,
                bloom: Some(BloomParams {
                    num_hashes: 4,
                    bits_per_element: 10,
                }),
                ..Default::default()
            },
        );
        let searcher = Searcher::new(&index);
        let result = searcher.bwand_and(&searcher.resolve_terms(&terms(&["a", "b"])));
        let mut sorted = result.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 7, 13]);
    }

    #[test]
    fn scenario_f_wand_matches_exhaustive_bm25() {
        let index = build(
            &[
                "1\tcat dog", "2\tcat cat dog bird", "3\tdog", "4\tcat bird bird bird", "5\tdog cat",
            ],
            IndexingConfig {
                mode: PositionalMode::TfOnly,
                df_cutoff: 1,
                ..Default::default()
            },
        );
        let searcher = Searcher::new(&index);
        let query_terms = searcher.resolve_terms(&terms(&["cat", "dog", "bird"]));
        let wand_result = searcher.wand(&query_terms, 2, false);

        // exhaustive baseline: score every document containing any query term directly
        // via the pointer directory / segment pool, without pivoting.
        let dir = &index.pointer_directory;
        let pool = &index.segment_pool;
        let total_docs = dir.total_docs();
        let avgdl = dir.avg_doc_len();
        let mut scores: std::collections::HashMap<u32, f32> = std::collections::HashMap::new();
        for &t in &query_terms {
            if let Some(head) = dir.head_ptr(t) {
                let mut cur = Some(head);
                while let Some(ptr) = cur {
                    let (docids, n) = pool.decode_docid_block(ptr, false);
                    let (tfs, _) = pool.decode_tf_block(ptr);
                    for i in 0..n {
                        let docid = docids[i];
                        let dl = dir.doc_len(docid) as f32;
                        let s = bm25_score(tfs[i] as f32, dl, avgdl, total_docs, dir.df(t));
                        *scores.entry(docid).or_insert(0.0) += s;
                    }
                    cur = pool.next(ptr);
                }
            }
        }
        let mut baseline: Vec<(u32, f32)> = scores.into_iter().collect();
        baseline.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
        let top2: Vec<u32> = baseline.into_iter().take(2).map(|(d, _)| d).collect();
        let wand_docids: Vec<u32> = wand_result.iter().map(|c| c.doc_id).collect();
        assert_eq!(wand_docids, top2);
    }
}
