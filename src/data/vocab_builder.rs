// ============================================================
// Layer 4 — Vocabulary Builder
// ============================================================
// Builds a frequency-ranked Vocabulary from one corpus file.
//
//   1. Tokenise every line (lower-case + whitespace split)
//   2. Count each token; remember where it was first seen
//   3. Sort by count descending, ties by first occurrence
//   4. Walk the sorted list accumulating counts; admit a token
//      while cumulative / total ≤ rate, stop at the first one
//      that would push the share above it
//
// The reserved tokens always come first and do not count
// towards the coverage mass.
//
// Reference: Rust Book §8 (Hash Maps)

use anyhow::Result;
use std::{collections::HashMap, path::Path};

use crate::data::loader::{read_lines, tokenize};
use crate::domain::vocabulary::Vocabulary;

/// Build a vocabulary from an in-memory list of lines.
pub fn build_vocabulary<S: AsRef<str>>(lines: &[S], remain_rate: f64) -> Vocabulary {
    // token → (count, first-seen position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut n_words = 0usize;

    for line in lines {
        for token in tokenize(line.as_ref()) {
            let next = counts.len();
            counts.entry(token).or_insert((0, next)).0 += 1;
            n_words += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(token, (count, first))| (token, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    let distinct = ranked.len();

    let mut admitted = Vec::new();
    let mut covered  = 0usize;
    for (token, count, _) in ranked {
        covered += count;
        if covered as f64 / n_words as f64 > remain_rate {
            break;
        }
        admitted.push(token);
    }

    tracing::info!(
        "Vocabulary: kept {} of {} distinct tokens ({} words scanned, rate {})",
        admitted.len(),
        distinct,
        n_words,
        remain_rate,
    );

    Vocabulary::from_tokens(admitted)
}

/// Read `path` and build its vocabulary.
pub fn build_vocabulary_from_file(path: &Path, remain_rate: f64) -> Result<Vocabulary> {
    tracing::info!("Building vocabulary from '{}'", path.display());
    let lines = read_lines(path)?;
    Ok(build_vocabulary(&lines, remain_rate))
}
