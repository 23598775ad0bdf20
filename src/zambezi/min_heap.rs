//! Fixed-capacity binary min-heap used as the top-k candidate structure during query
//! evaluation. A single allocation covers the whole query's lifetime, and a docid->score
//! side index gives O(1) "is this docid already a candidate" checks for WAND pivoting.
//!
//! Adapted from the shape of a conventional top-k min-heap: `add_topk` is the one entry
//! point callers use; ties are broken by keeping the earlier (lower docid) insertion, since
//! `add_topk` only replaces an existing candidate's score when the new score is strictly
//! greater.

use ahash::AHashMap;

#[derive(Clone, Debug, Copy, Default)]
pub struct Candidate {
    pub doc_id: u32,
    pub score: f32,
}

pub struct MinHeap {
    elements: Vec<Candidate>,
    current_heap_size: usize,
    docid_index: AHashMap<u32, f32>,
}

impl MinHeap {
    pub fn new(capacity: usize) -> Self {
        MinHeap {
            elements: vec![Candidate::default(); capacity.max(1)],
            current_heap_size: 0,
            docid_index: AHashMap::new(),
        }
    }

    fn left(index: usize) -> usize {
        2 * index + 1
    }

    fn right(index: usize) -> usize {
        2 * index + 2
    }

    fn parent(index: usize) -> usize {
        (index - 1) / 2
    }

    fn has_left(&self, index: usize) -> bool {
        Self::left(index) < self.current_heap_size
    }

    fn has_right(&self, index: usize) -> bool {
        Self::right(index) < self.current_heap_size
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.elements.swap(a, b);
    }

    fn add(&mut self, score: f32, doc_id: u32) {
        self.elements[self.current_heap_size] = Candidate { doc_id, score };
        self.current_heap_size += 1;
        self.docid_index.insert(doc_id, score);
        self.heapify_up();
    }

    fn pop_add(&mut self, score: f32, doc_id: u32) {
        self.docid_index.remove(&self.elements[0].doc_id);
        self.elements[0] = Candidate { doc_id, score };
        self.docid_index.insert(doc_id, score);
        self.heapify_down_from(0);
    }

    fn heapify_up(&mut self) {
        let mut index = self.current_heap_size - 1;
        while index != 0 && self.elements[index].score < self.elements[Self::parent(index)].score {
            let parent = Self::parent(index);
            self.swap(parent, index);
            index = parent;
        }
    }

    fn heapify_down_from(&mut self, start: usize) {
        let mut index = start;
        while self.has_left(index) {
            let mut smaller = Self::left(index);
            if self.has_right(index) && self.elements[Self::right(index)].score < self.elements[smaller].score {
                smaller = Self::right(index);
            }
            if self.elements[smaller].score >= self.elements[index].score {
                break;
            }
            self.swap(smaller, index);
            index = smaller;
        }
    }

    /// Current lowest score held in the top-k set; `0.0` while the heap has not yet filled,
    /// so it never rejects a candidate before `top_k` slots are occupied.
    pub fn threshold(&self, top_k: usize) -> f32 {
        if self.current_heap_size < top_k {
            f32::NEG_INFINITY
        } else {
            self.elements[0].score
        }
    }

    pub fn len(&self) -> usize {
        self.current_heap_size
    }

    pub fn is_empty(&self) -> bool {
        self.current_heap_size == 0
    }

    /// Inserts or updates a candidate; returns whether the top-k set changed. Ties within the
    /// heap keep the earlier (already-inserted, hence lower-docid-first) candidate: a repeat
    /// doc_id is only updated when strictly higher-scoring.
    pub fn add_topk(&mut self, score: f32, doc_id: u32, top_k: usize) -> bool {
        if self.current_heap_size >= top_k && self.elements[0].score >= score {
            return false;
        }

        if let Some(&existing_score) = self.docid_index.get(&doc_id) {
            if existing_score >= score {
                return false;
            }
            if self.elements[0].doc_id == doc_id {
                self.elements[0].score = score;
                self.docid_index.insert(doc_id, score);
                self.heapify_down_from(0);
                return true;
            }
            let mut index = 0;
            while index < self.current_heap_size && self.elements[index].doc_id != doc_id {
                index += 1;
            }
            if index == self.current_heap_size {
                return false;
            }
            self.elements[index].score = score;
            self.docid_index.insert(doc_id, score);
            self.heapify_down_from(index);
            return true;
        }

        if self.current_heap_size < top_k {
            self.add(score, doc_id);
            true
        } else if score > self.elements[0].score {
            self.pop_add(score, doc_id);
            true
        } else {
            false
        }
    }

    /// Drains the heap into a vector of candidates sorted by descending score, with ties
    /// broken by ascending docid.
    pub fn into_sorted(self) -> Vec<Candidate> {
        let mut out = self.elements[..self.current_heap_size].to_vec();
        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then(a.doc_id.cmp(&b.doc_id)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_top_k_by_score() {
        let mut heap = MinHeap::new(3);
        for (doc_id, score) in [(1, 1.0), (2, 5.0), (3, 2.0), (4, 9.0), (5, 0.5)] {
            heap.add_topk(score, doc_id, 3);
        }
        let sorted = heap.into_sorted();
        let doc_ids: Vec<u32> = sorted.iter().map(|c| c.doc_id).collect();
        assert_eq!(doc_ids, vec![4, 2, 3]);
    }

    #[test]
    fn duplicate_docid_keeps_higher_score() {
        let mut heap = MinHeap::new(2);
        heap.add_topk(1.0, 7, 2);
        heap.add_topk(0.5, 7, 2);
        heap.add_topk(4.0, 7, 2);
        let sorted = heap.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].score, 4.0);
    }
}
