//! Per-term statistics and the postings-chain head pointer, plus corpus-level totals.

use crate::bm25::bm25_tf;
use crate::segment_pool::SegmentPointer;

#[derive(Debug, Clone, Copy, Default)]
struct TermEntry {
    head: Option<SegmentPointer>,
    df: u32,
    cf: u64,
    max_tf: f32,
    max_tf_doclen: u32,
    head_set: bool,
}

pub struct PointerDirectory {
    terms: Vec<TermEntry>,
    doc_len: Vec<u32>,
    total_docs: u64,
    total_doc_len: u64,
    reverse: bool,
}

impl PointerDirectory {
    pub fn new(reverse: bool) -> Self {
        PointerDirectory {
            terms: Vec::new(),
            doc_len: Vec::new(),
            total_docs: 0,
            total_doc_len: 0,
            reverse,
        }
    }

    fn entry(&self, term: u32) -> TermEntry {
        self.terms.get(term as usize).copied().unwrap_or_default()
    }

    fn entry_mut(&mut self, term: u32) -> &mut TermEntry {
        let idx = term as usize;
        if idx >= self.terms.len() {
            self.terms.resize(idx + 1, TermEntry::default());
        }
        &mut self.terms[idx]
    }

    pub fn head_ptr(&self, term: u32) -> Option<SegmentPointer> {
        self.entry(term).head
    }

    pub fn df(&self, term: u32) -> u32 {
        self.entry(term).df
    }

    pub fn cf(&self, term: u32) -> u64 {
        self.entry(term).cf
    }

    pub fn max_tf(&self, term: u32) -> f32 {
        self.entry(term).max_tf
    }

    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }

    pub fn total_doc_len(&self) -> u64 {
        self.total_doc_len
    }

    pub fn avg_doc_len(&self) -> f32 {
        if self.total_docs == 0 {
            0.0
        } else {
            self.total_doc_len as f32 / self.total_docs as f32
        }
    }

    pub fn doc_len(&self, docid: u32) -> u32 {
        self.doc_len.get(docid as usize).copied().unwrap_or(0)
    }

    pub fn bump_df(&mut self, term: u32) {
        self.entry_mut(term).df += 1;
    }

    pub fn bump_cf(&mut self, term: u32) {
        self.entry_mut(term).cf += 1;
    }

    /// Idempotent under forward-mode-first-write-only semantics: once a head is recorded for
    /// a term in forward mode it never changes, since forward chains only ever grow at the
    /// tail. In reverse mode the chain grows at the head, so every append rewrites it.
    pub fn set_head(&mut self, term: u32, ptr: SegmentPointer) {
        let entry = self.entry_mut(term);
        if self.reverse || !entry.head_set {
            entry.head = Some(ptr);
            entry.head_set = true;
        }
    }

    pub fn record_doc_len(&mut self, docid: u32, len: u32) {
        let idx = docid as usize;
        if idx >= self.doc_len.len() {
            self.doc_len.resize(idx + 1, 0);
        }
        self.doc_len[idx] = len;
        self.total_docs += 1;
        self.total_doc_len += len as u64;
    }

    /// Updates `max_tf[t]` using the BM25-tf saturation at the current average document
    /// length, per the corpus totals at the moment this document is considered.
    pub fn update_max_tf(&mut self, term: u32, tf: u32, doc_len: u32) {
        let avgdl = self.avg_doc_len();
        let candidate = bm25_tf(tf as f32, doc_len as f32, avgdl);
        let entry = self.entry_mut(term);
        if candidate > entry.max_tf {
            entry.max_tf = candidate;
            entry.max_tf_doclen = doc_len;
        }
    }

    pub fn total_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn write<W: std::io::Write>(&self, w: &mut W) -> crate::error::Result<()> {
        use crate::utils::write_u32;
        write_u32(w, self.reverse as u32)?;
        write_u32(w, self.total_docs as u32)?;
        write_u32(w, self.total_doc_len as u32)?;
        write_u32(w, self.doc_len.len() as u32)?;
        crate::utils::write_u32_slice(w, &self.doc_len)?;
        write_u32(w, self.terms.len() as u32)?;
        for t in &self.terms {
            write_u32(w, t.head.map(|p| p.to_u64()).unwrap_or(u64::MAX) as u32)?;
            write_u32(w, t.head.map(|p| (p.to_u64() >> 32) as u32).unwrap_or(u32::MAX))?;
            write_u32(w, t.df)?;
            write_u32(w, t.cf as u32)?;
            write_u32(w, t.max_tf.to_bits())?;
            write_u32(w, t.max_tf_doclen)?;
            write_u32(w, t.head_set as u32)?;
        }
        Ok(())
    }

    pub fn read<R: std::io::Read>(r: &mut R) -> crate::error::Result<Self> {
        use crate::utils::read_u32;
        let reverse = read_u32(r)? != 0;
        let total_docs = read_u32(r)? as u64;
        let total_doc_len = read_u32(r)? as u64;
        let doc_len_count = read_u32(r)? as usize;
        let doc_len = crate::utils::read_u32_vec(r, doc_len_count)?;
        let term_count = read_u32(r)? as usize;
        let mut terms = Vec::with_capacity(term_count);
        for _ in 0..term_count {
            let lo = read_u32(r)? as u64;
            let hi = read_u32(r)? as u64;
            let raw = (hi << 32) | lo;
            let df = read_u32(r)?;
            let cf = read_u32(r)? as u64;
            let max_tf = f32::from_bits(read_u32(r)?);
            let max_tf_doclen = read_u32(r)?;
            let head_set = read_u32(r)? != 0;
            terms.push(TermEntry {
                head: SegmentPointer::from_u64(raw),
                df,
                cf,
                max_tf,
                max_tf_doclen,
                head_set,
            });
        }
        Ok(PointerDirectory {
            terms,
            doc_len,
            total_docs,
            total_doc_len,
            reverse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_term_reads_as_zero() {
        let dir = PointerDirectory::new(false);
        assert_eq!(dir.df(0), 0);
        assert_eq!(dir.cf(0), 0);
        assert!(dir.head_ptr(0).is_none());
    }

    #[test]
    fn forward_head_set_once() {
        let mut dir = PointerDirectory::new(false);
        let p1 = SegmentPointer { pool: 0, offset: 0 };
        let p2 = SegmentPointer { pool: 0, offset: 10 };
        dir.set_head(1, p1);
        dir.set_head(1, p2);
        assert_eq!(dir.head_ptr(1), Some(p1));
    }

    #[test]
    fn reverse_head_rewritten_every_append() {
        let mut dir = PointerDirectory::new(true);
        let p1 = SegmentPointer { pool: 0, offset: 0 };
        let p2 = SegmentPointer { pool: 0, offset: 10 };
        dir.set_head(1, p1);
        dir.set_head(1, p2);
        assert_eq!(dir.head_ptr(1), Some(p2));
    }

    #[test]
    fn max_tf_tracks_highest_saturation() {
        let mut dir = PointerDirectory::new(false);
        dir.record_doc_len(0, 10);
        dir.update_max_tf(5, 3, 10);
        let first = dir.max_tf(5);
        dir.record_doc_len(1, 10);
        dir.update_max_tf(5, 1, 10);
        assert_eq!(dir.max_tf(5), first);
    }

    #[test]
    fn round_trip_persistence() {
        let mut dir = PointerDirectory::new(false);
        dir.record_doc_len(0, 3);
        dir.bump_df(2);
        dir.bump_cf(2);
        dir.set_head(2, SegmentPointer { pool: 0, offset: 5 });
        dir.update_max_tf(2, 2, 3);

        let mut buf = Vec::new();
        dir.write(&mut buf).unwrap();
        let reloaded = PointerDirectory::read(&mut &buf[..]).unwrap();
        assert_eq!(reloaded.df(2), 1);
        assert_eq!(reloaded.cf(2), 1);
        assert_eq!(reloaded.head_ptr(2), Some(SegmentPointer { pool: 0, offset: 5 }));
        assert_eq!(reloaded.total_docs(), 1);
    }
}
