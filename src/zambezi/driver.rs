//! The indexing driver: the per-document build loop described in §4.7. Tokenises a line,
//! updates the dictionary and pointer directory, and feeds the per-term buffers that in turn
//! flush compressed blocks into the segment pool.

use indexmap::IndexMap;

use crate::buffers::{BufferMap, PositionalMode};
use crate::dictionary::Dictionary;
use crate::doc_vectors::DocumentVectors;
use crate::error::{Result, ZambeziError};
use crate::pointer_directory::PointerDirectory;
use crate::segment_pool::{BloomParams, SegmentPool};

pub struct IndexingConfig {
    pub mode: PositionalMode,
    pub reverse: bool,
    pub df_cutoff: usize,
    pub max_blocks: usize,
    pub bloom: Option<BloomParams>,
    pub document_vectors: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        IndexingConfig {
            mode: PositionalMode::NonPositional,
            reverse: false,
            df_cutoff: 4,
            max_blocks: crate::segment_pool::MAX_INT_VALUE,
            bloom: None,
            document_vectors: false,
        }
    }
}

/// The write-capable façade over the index. Owns the dictionary, pointer directory, segment
/// pool, and per-term staging buffers exclusively for the lifetime of the build; no other
/// façade may touch them until `finish()` hands back a read-only [`BuiltIndex`].
pub struct IndexBuilder {
    dictionary: Dictionary,
    pointer_directory: PointerDirectory,
    segment_pool: SegmentPool,
    buffers: BufferMap,
    doc_vectors: Option<DocumentVectors>,
    next_term_id: u32,
    mode: PositionalMode,
    reverse: bool,
}

/// The finished, read-only store: a dictionary, pointer directory, and segment pool with no
/// pending buffered postings. Hands off to [`crate::query::Searcher`] for evaluation.
pub struct BuiltIndex {
    pub dictionary: Dictionary,
    pub pointer_directory: PointerDirectory,
    pub segment_pool: SegmentPool,
    pub doc_vectors: Option<DocumentVectors>,
    pub mode: PositionalMode,
    pub reverse: bool,
}

impl IndexBuilder {
    pub fn new(config: IndexingConfig) -> Self {
        IndexBuilder {
            dictionary: Dictionary::new(),
            pointer_directory: PointerDirectory::new(config.reverse),
            segment_pool: SegmentPool::new(config.bloom),
            buffers: BufferMap::new(config.df_cutoff, config.max_blocks, config.mode, config.reverse),
            doc_vectors: config.document_vectors.then(DocumentVectors::new),
            next_term_id: 0,
            mode: config.mode,
            reverse: config.reverse,
        }
    }

    /// Indexes one input line of the form `"<docid>\t<tok1> <tok2> … <tokN>"`.
    pub fn index_document(&mut self, line: &str) -> Result<()> {
        let (docid_str, rest) = line
            .split_once('\t')
            .ok_or_else(|| ZambeziError::MalformedInput(format!("missing tab separator: {line:?}")))?;
        let docid: u32 = docid_str
            .trim()
            .parse()
            .map_err(|_| ZambeziError::MalformedInput(format!("non-numeric docid: {docid_str:?}")))?;

        // unique-term set in first-occurrence order, with running tf and (if positional)
        // the raw (not yet gapped) position list for this document.
        let mut unique: IndexMap<u32, (u32, Vec<u32>)> = IndexMap::new();
        let mut doc_vector_terms: Vec<u32> = Vec::new();

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        for (i, token) in tokens.iter().enumerate() {
            let position = i as u32 + 1;
            let id = self.dictionary.intern(token, self.next_term_id);
            if id == self.next_term_id {
                self.next_term_id += 1;
            }
            self.pointer_directory.bump_cf(id);
            if self.doc_vectors.is_some() {
                doc_vector_terms.push(id);
            }
            let entry = unique.entry(id).or_insert_with(|| (0, Vec::new()));
            entry.0 += 1;
            if self.mode == PositionalMode::Positional {
                entry.1.push(position);
            }
        }

        let doc_len = tokens.len() as u32;
        self.pointer_directory.record_doc_len(docid, doc_len);
        if let Some(vectors) = &mut self.doc_vectors {
            vectors.set(docid, doc_vector_terms);
        }

        for (term, (tf, raw_positions)) in unique {
            self.pointer_directory.update_max_tf(term, tf, doc_len);
            let gapped = gap_encode(&raw_positions);
            self.buffers.add_document(
                term,
                docid,
                tf,
                &gapped,
                &mut self.segment_pool,
                &mut self.pointer_directory,
            );
        }

        Ok(())
    }

    /// Flushes every term's remaining buffered postings and returns the finished, read-only
    /// index. Mirrors "at end of indexing: for every term with pending postings, flush any
    /// full blocks and a final short block" (§4.7).
    pub fn finish(mut self) -> BuiltIndex {
        self.buffers.flush_all(&mut self.segment_pool, &mut self.pointer_directory);
        BuiltIndex {
            dictionary: self.dictionary,
            pointer_directory: self.pointer_directory,
            segment_pool: self.segment_pool,
            doc_vectors: self.doc_vectors,
            mode: self.mode,
            reverse: self.reverse,
        }
    }
}

fn gap_encode(positions: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(positions.len());
    let mut prev = 0u32;
    for (i, &p) in positions.iter().enumerate() {
        if i == 0 {
            out.push(p);
        } else {
            out.push(p - prev);
        }
        prev = p;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::PositionalMode;

    fn build(lines: &[&str], config: IndexingConfig) -> BuiltIndex {
        let mut builder = IndexBuilder::new(config);
        for line in lines {
            builder.index_document(line).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn scenario_a_small_corpus_stats() {
        let index = build(
            &["1\ta b c", "2\ta a b", "3\tb c c"],
            IndexingConfig {
                df_cutoff: 1,
                ..Default::default()
            },
        );
        let a = index.dictionary.lookup("a").unwrap();
        let b = index.dictionary.lookup("b").unwrap();
        let c = index.dictionary.lookup("c").unwrap();
        assert_eq!(index.pointer_directory.df(a), 2);
        assert_eq!(index.pointer_directory.df(b), 3);
        assert_eq!(index.pointer_directory.df(c), 2);
        assert_eq!(index.pointer_directory.cf(a), 3);
        assert_eq!(index.pointer_directory.cf(b), 3);
        assert_eq!(index.pointer_directory.cf(c), 3);
        assert_eq!(index.pointer_directory.doc_len(1), 3);
        assert_eq!(index.pointer_directory.doc_len(2), 3);
        assert_eq!(index.pointer_directory.doc_len(3), 3);
    }

    #[test]
    fn scenario_b_small_buffer_not_flushed_before_cutoff() {
        let mut builder = IndexBuilder::new(IndexingConfig {
            df_cutoff: 2,
            ..Default::default()
        });
        builder.index_document("1\ta b c").unwrap();
        builder.index_document("2\ta a b").unwrap();
        let a = builder.dictionary.lookup("a").unwrap();
        assert!(builder.pointer_directory.head_ptr(a).is_none());
        assert_eq!(builder.pointer_directory.df(a), 2);

        builder.index_document("3\tb c c").unwrap();
        builder.index_document("4\ta").unwrap();
        let index = builder.finish();
        assert!(index.pointer_directory.head_ptr(a).is_some());
    }

    #[test]
    fn scenario_c_positional_tf_and_positions() {
        let index = build(
            &["10\tx y x y x"],
            IndexingConfig {
                mode: PositionalMode::Positional,
                df_cutoff: 1,
                ..Default::default()
            },
        );
        let x = index.dictionary.lookup("x").unwrap();
        let y = index.dictionary.lookup("y").unwrap();
        let head_x = index.pointer_directory.head_ptr(x).unwrap();
        let (tfs, n) = index.segment_pool.decode_tf_block(head_x);
        assert_eq!(&tfs[..n], &[3]);
        assert_eq!(index.segment_pool.decode_positions_for(head_x, &tfs[..n], 0), vec![1, 3, 5]);

        let head_y = index.pointer_directory.head_ptr(y).unwrap();
        let (tfs_y, n_y) = index.segment_pool.decode_tf_block(head_y);
        assert_eq!(&tfs_y[..n_y], &[2]);
        assert_eq!(index.segment_pool.decode_positions_for(head_y, &tfs_y[..n_y], 0), vec![2, 4]);
    }

    #[test]
    fn scenario_d_reverse_mode_descending_chain() {
        let index = build(
            &["1\ta", "2\ta", "3\ta"],
            IndexingConfig {
                df_cutoff: 1,
                reverse: true,
                ..Default::default()
            },
        );
        let a = index.dictionary.lookup("a").unwrap();
        let head = index.pointer_directory.head_ptr(a).unwrap();
        let (decoded, n) = index.segment_pool.decode_docid_block(head, true);
        assert_eq!(&decoded[..n], &[3, 2, 1]);
    }

    #[test]
    fn malformed_line_is_rejected() {
        let mut builder = IndexBuilder::new(IndexingConfig::default());
        assert!(builder.index_document("no-tab-here").is_err());
        assert!(builder.index_document("notanumber\ta b").is_err());
    }
}
