//! Integration tests: build an index end-to-end, persist it, reload it, and query it.
//! Each module already covers its own unit behaviour; these tests exercise the modules
//! together the way `zambezi_index`/`zambezi_query` do.

use zambezi::buffers::PositionalMode;
use zambezi::dictionary::Dictionary;
use zambezi::doc_vectors::DocumentVectors;
use zambezi::driver::{BuiltIndex, IndexBuilder, IndexingConfig};
use zambezi::pointer_directory::PointerDirectory;
use zambezi::query::{Algorithm, Searcher};
use zambezi::segment_pool::{BloomParams, SegmentPool};

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

fn round_trip(index: &BuiltIndex) -> BuiltIndex {
    let mut dict_buf = Vec::new();
    index.dictionary.write(&mut dict_buf).unwrap();
    let dictionary = Dictionary::read(&mut &dict_buf[..]).unwrap();

    let mut dir_buf = Vec::new();
    index.pointer_directory.write(&mut dir_buf).unwrap();
    let pointer_directory = PointerDirectory::read(&mut &dir_buf[..]).unwrap();

    let mut pool_buf = Vec::new();
    index.segment_pool.write(&mut pool_buf).unwrap();
    let segment_pool = SegmentPool::read(&mut &pool_buf[..]).unwrap();

    let doc_vectors = index.doc_vectors.as_ref().map(|v| {
        let mut buf = Vec::new();
        v.write(&mut buf).unwrap();
        DocumentVectors::read(&mut &buf[..]).unwrap()
    });

    BuiltIndex {
        dictionary,
        pointer_directory,
        segment_pool,
        doc_vectors,
        mode: index.mode,
        reverse: index.reverse,
    }
}

#[test]
/// scenario A: small non-positional corpus stats and conjunctive queries
fn test_01_small_corpus_stats_and_svs() {
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

    let searcher = Searcher::new(&index);
    assert_eq!(searcher.svs(&searcher.resolve_terms(&terms(&["a", "b"])), 0), vec![1, 2]);
    assert_eq!(searcher.svs(&searcher.resolve_terms(&terms(&["b", "c"])), 0), vec![1, 3]);
}

#[test]
/// scenario D: reverse-mode chain growth and descending SvS traversal
fn test_02_reverse_mode_descending_query() {
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
/// scenario C: positional mode tf and position round-trip through the full pipeline
fn test_03_positional_mode_tf_and_positions() {
    let index = build(
        &["10\tx y x y x"],
        IndexingConfig {
            mode: PositionalMode::Positional,
            df_cutoff: 1,
            ..Default::default()
        },
    );
    let x = index.dictionary.lookup("x").unwrap();
    let head = index.pointer_directory.head_ptr(x).unwrap();
    let (tfs, n) = index.segment_pool.decode_tf_block(head);
    assert_eq!(&tfs[..n], &[3]);
    assert_eq!(index.segment_pool.decode_positions_for(head, &tfs[..n], 0), vec![1, 3, 5]);
}

#[test]
/// scenario 4: round-trip persistence returns byte-identical query results
fn test_04_round_trip_persistence_preserves_query_results() {
    let index = build(
        &["1\tcat dog", "2\tcat cat dog bird", "3\tdog", "4\tcat bird bird bird", "5\tdog cat"],
        IndexingConfig {
            mode: PositionalMode::TfOnly,
            df_cutoff: 1,
            ..Default::default()
        },
    );
    let before = Searcher::new(&index).evaluate(&terms(&["cat", "dog", "bird"]), Algorithm::Wand, 3);

    let reloaded = round_trip(&index);
    let after = Searcher::new(&reloaded).evaluate(&terms(&["cat", "dog", "bird"]), Algorithm::Wand, 3);

    let before_ids: Vec<u32> = before.iter().map(|c| c.doc_id).collect();
    let after_ids: Vec<u32> = after.iter().map(|c| c.doc_id).collect();
    assert_eq!(before_ids, after_ids);
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.score, a.score);
    }
}

#[test]
/// scenario E: Bloom-filtered BWAND_AND retrieval
fn test_05_bloom_bwand_and_retrieval() {
    let index = build(
        &["1\ta b", "2\ta", "7\ta b", "8\tb", "13\ta b", "20\ta", "21\tb"],
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
    let mut result = searcher.bwand_and(&searcher.resolve_terms(&terms(&["a", "b"])));
    result.sort();
    assert_eq!(result, vec![1, 7, 13]);

    let a = index.dictionary.lookup("a").unwrap();
    let mut ptr = index.pointer_directory.head_ptr(a).unwrap();
    assert!(index.segment_pool.contains_docid(&mut ptr, 1, false));
    let mut ptr = index.pointer_directory.head_ptr(a).unwrap();
    assert!(!index.segment_pool.contains_docid(&mut ptr, 999, false));
}

#[test]
/// scenario F: WAND matches an exhaustive BM25 baseline for top-k
fn test_06_wand_matches_exhaustive_baseline() {
    use zambezi::bm25::bm25_score;

    let index = build(
        &["1\tcat dog", "2\tcat cat dog bird", "3\tdog", "4\tcat bird bird bird", "5\tdog cat"],
        IndexingConfig {
            mode: PositionalMode::TfOnly,
            df_cutoff: 1,
            ..Default::default()
        },
    );
    let searcher = Searcher::new(&index);
    let query_terms = searcher.resolve_terms(&terms(&["cat", "dog", "bird"]));
    let wand_result = searcher.wand(&query_terms, 2, false);
    let wand_ids: Vec<u32> = wand_result.iter().map(|c| c.doc_id).collect();

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
    assert_eq!(wand_ids, top2);
}
