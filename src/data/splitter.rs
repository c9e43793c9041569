// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Reserves a random validation subset of the parsed corpus.
//
//   n_valid = floor(floor(N · valid_portion) / batch) · batch
//
// so the validation set is always a whole number of batches
// (possibly zero). Indices are drawn without replacement; both
// subsets keep the corpus order, which preserves the length
// grouping the bucketizer produced.
//
// The RNG is a parameter: training uses thread_rng(), tests use
// a seeded StdRng.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation (seq::index::sample)

use rand::{seq::index::sample, Rng};
use std::collections::HashSet;

use crate::domain::corpus::ParallelCorpus;

/// Number of validation pairs for a corpus of `n` pairs.
pub fn validation_size(n: usize, valid_portion: f64, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    let raw = (n as f64 * valid_portion).floor() as usize;
    (raw / batch_size * batch_size).min(n)
}

/// Split `corpus` into (train, validation).
pub fn split_validation<R: Rng + ?Sized>(
    corpus:        &ParallelCorpus,
    valid_portion: f64,
    batch_size:    usize,
    rng:           &mut R,
) -> (ParallelCorpus, ParallelCorpus) {
    let total   = corpus.len();
    let n_valid = validation_size(total, valid_portion, batch_size);

    let picked: HashSet<usize> = sample(rng, total, n_valid).into_iter().collect();

    let (valid_idx, train_idx): (Vec<usize>, Vec<usize>) =
        (0..total).partition(|i| picked.contains(i));

    tracing::info!(
        "Dataset split: {} training, {} validation",
        train_idx.len(),
        valid_idx.len(),
    );

    (corpus.select(&train_idx), corpus.select(&valid_idx))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn corpus(n: usize) -> ParallelCorpus {
        let mut c = ParallelCorpus::new();
        for i in 0..n {
            c.push(vec![i], vec![i + 1]);
        }
        c
    }

    #[test]
    fn test_validation_size_is_whole_batches() {
        // floor(floor(100 · 0.25) / 8) · 8 = floor(25/8) · 8 = 24
        assert_eq!(validation_size(100, 0.25, 8), 24);
        assert_eq!(validation_size(100, 0.05, 8), 0);
        assert_eq!(validation_size(0, 0.5, 4), 0);
    }

    #[test]
    fn test_all_pairs_preserved() {
        let mut rng = StdRng::seed_from_u64(7);
        let (train, valid) = split_validation(&corpus(50), 0.5, 5, &mut rng);
        assert_eq!(valid.len(), 25);
        assert_eq!(train.len() + valid.len(), 50);

        let mut seen: Vec<usize> = train.sources.iter().chain(&valid.sources).map(|s| s[0]).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_both_sides_keep_corpus_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let (train, valid) = split_validation(&corpus(40), 0.5, 4, &mut rng);
        for part in [&train, &valid] {
            let ids: Vec<usize> = part.sources.iter().map(|s| s[0]).collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            // pairs stay aligned
            assert!(part.sources.iter().zip(&part.targets).all(|(s, t)| t[0] == s[0] + 1));
        }
    }

    #[test]
    fn test_zero_portion_keeps_everything_for_training() {
        let mut rng = StdRng::seed_from_u64(1);
        let (train, valid) = split_validation(&corpus(10), 0.0, 2, &mut rng);
        assert_eq!(train.len(), 10);
        assert!(valid.is_empty());
    }
}
