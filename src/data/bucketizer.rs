// ============================================================
// Layer 4 — Bucketizer
// ============================================================
// Reorders sequence pairs so that pairs of similar length end up
// next to each other, which keeps per-batch padding small.
//
//   length(i)  = max(source_len(i), target_len(i))
//   width      = ceil(max_source_len / n_buckets), at least 1
//   bucket(i)  = length(i) / width
//
// The result is the pair indices concatenated by ascending
// bucket id; inside a bucket the original order is kept. With
// n_buckets ≤ 1 the identity order is returned.
//
// Reference: Rust Book §8 (Collections)

use std::collections::BTreeMap;

use crate::domain::corpus::ParallelCorpus;

/// A permutation of `0..corpus.len()` grouping pairs by length bucket.
pub fn bucket_order(corpus: &ParallelCorpus, n_buckets: usize) -> Vec<usize> {
    let n = corpus.len();
    if n_buckets <= 1 || n == 0 {
        return (0..n).collect();
    }

    let width = corpus.max_source_len().div_ceil(n_buckets).max(1);

    let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, (src, tgt)) in corpus.sources.iter().zip(&corpus.targets).enumerate() {
        let len = src.len().max(tgt.len());
        buckets.entry(len / width).or_default().push(i);
    }

    tracing::debug!("Bucketized {} pairs into {} buckets (width {})", n, buckets.len(), width);
    buckets.into_values().flatten().collect()
}

/// Apply `bucket_order` and return the reordered corpus.
pub fn bucketize(corpus: &ParallelCorpus, n_buckets: usize) -> ParallelCorpus {
    if n_buckets <= 1 {
        return corpus.clone();
    }
    corpus.select(&bucket_order(corpus, n_buckets))
}
