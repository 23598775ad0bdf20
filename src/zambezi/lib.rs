#![crate_type = "lib"]
#![crate_name = "zambezi"]

//! # `zambezi`
//! A single-threaded, in-memory inverted-index search library: PForDelta-compressed
//! postings segments, a pointer directory of per-term statistics, a string dictionary, and
//! five query evaluators (SvS, WAND, MBWAND, BWAND_AND, BWAND_OR).
//!
//! ### build an index and run a query
//! ```rust
//! use zambezi::buffers::PositionalMode;
//! use zambezi::driver::{IndexBuilder, IndexingConfig};
//! use zambezi::query::{Algorithm, Searcher};
//!
//! let mut builder = IndexBuilder::new(IndexingConfig {
//!     mode: PositionalMode::TfOnly,
//!     df_cutoff: 1,
//!     ..Default::default()
//! });
//! builder.index_document("1\tthe quick brown fox").unwrap();
//! builder.index_document("2\tthe lazy dog").unwrap();
//! let index = builder.finish();
//!
//! let searcher = Searcher::new(&index);
//! let hits = searcher.evaluate(&["the".to_string(), "fox".to_string()], Algorithm::Wand, 10);
//! assert_eq!(hits[0].doc_id, 1);
//! ```

/// BM25/IDF scoring primitives shared by the pointer directory and the query evaluator.
pub mod bm25;
pub(crate) mod bloom;
/// Per-term indexing buffers: the staging area between observing a posting and flushing a
/// compressed block into the segment pool.
pub mod buffers;
/// String-to-term-id interning with dense, permanent ids.
pub mod dictionary;
/// Optional dense per-docid term-id streams.
pub mod doc_vectors;
/// The indexing driver: builds an index document-by-document, then hands off a read-only
/// [`driver::BuiltIndex`].
pub mod driver;
/// Recoverable error type and the crate-wide `Result` alias.
pub mod error;
pub(crate) mod min_heap;
pub(crate) mod pfor;
/// Per-term statistics (df, cf, max-tf, head pointer) plus corpus-level totals.
pub mod pointer_directory;
/// The query evaluator: term resolution, SvS/WAND/MBWAND/BWAND_AND/BWAND_OR, and the
/// read-only [`query::Searcher`] façade.
pub mod query;
/// The append-only, chain-linked store of compressed postings segments.
pub mod segment_pool;
pub(crate) mod utils;
