//! BM25 scoring primitives shared by the pointer directory (max-tf tracking) and the query
//! evaluator (per-term upper bounds and candidate scoring).

/// Term-frequency saturation constant.
pub const K1: f32 = 0.9;
/// Document-length normalization constant.
pub const B: f32 = 0.4;

/// `((K1+1) * tf) / (K1 * (1 - B + B * dl/avgdl) + tf)`
pub fn bm25_tf(tf: f32, dl: f32, avgdl: f32) -> f32 {
    if avgdl <= 0.0 {
        return 0.0;
    }
    ((K1 + 1.0) * tf) / (K1 * (1.0 - B + B * (dl / avgdl)) + tf)
}

/// `log((N - df + 0.5) / (df + 0.5))`
pub fn idf(total_docs: u64, df: u32) -> f32 {
    let n = total_docs as f32;
    let df = df as f32;
    ((n - df + 0.5) / (df + 0.5)).ln()
}

/// Full BM25 contribution of a single term occurrence in a document.
pub fn bm25_score(tf: f32, dl: f32, avgdl: f32, total_docs: u64, df: u32) -> f32 {
    idf(total_docs, df) * bm25_tf(tf, dl, avgdl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bm25_tf_saturates_with_increasing_tf() {
        let low = bm25_tf(1.0, 100.0, 100.0);
        let high = bm25_tf(100.0, 100.0, 100.0);
        assert!(high > low);
        assert!(high < K1 + 1.0 + 1.0);
    }

    #[test]
    fn idf_decreases_as_df_grows() {
        let rare = idf(1000, 1);
        let common = idf(1000, 500);
        assert!(rare > common);
    }
}
