// ============================================================
// Layer 4 — Sequence Parser / Filter
// ============================================================
// Turns two line-aligned corpus files into a ParallelCorpus of
// id sequences.
//
// For each (encoder line, decoder line) pair:
//   - tokenise both sides
//   - reject if either side's length is outside the bounds
//   - reject if either side is empty
//   - map tokens to ids (<UNK> when absent)
//   - reject if either side has ≥ 20% unknown tokens
//
// Surviving pairs keep their input order. Files with different
// line counts are a hard error: the pairing would be wrong.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{ensure, Result};
use std::path::Path;

use crate::data::loader::{read_lines, tokenize};
use crate::domain::{
    corpus::ParallelCorpus,
    hparams::Hyperparameters,
    vocabulary::{Dictionary, Vocabulary},
};

/// A side with this share of unknown tokens or more is rejected.
pub const MAX_UNK_RATIO: f64 = 0.2;

/// Encode one side of a pair, or `None` if it fails a filter.
fn encode_side(line: &str, vocab: &Vocabulary, hparams: &Hyperparameters) -> Option<Vec<usize>> {
    let tokens = tokenize(line);
    if tokens.is_empty() || !hparams.accepts_len(tokens.len()) {
        return None;
    }

    let n_unk = tokens.iter().filter(|t| !vocab.contains(t)).count();
    if n_unk as f64 / tokens.len() as f64 >= MAX_UNK_RATIO {
        return None;
    }
    Some(vocab.encode(&tokens))
}

/// Parse already-read lines.
pub fn parse_lines<S: AsRef<str>>(
    encode_lines: &[S],
    decode_lines: &[S],
    dict:         &Dictionary,
    hparams:      &Hyperparameters,
) -> Result<ParallelCorpus> {
    ensure!(
        encode_lines.len() == decode_lines.len(),
        "encode file and decode file should have the same number of lines ({} vs {})",
        encode_lines.len(),
        decode_lines.len(),
    );

    let mut corpus   = ParallelCorpus::new();
    let mut rejected = 0usize;

    for (enc, dec) in encode_lines.iter().zip(decode_lines) {
        let pair = encode_side(enc.as_ref(), &dict.encoder, hparams)
            .and_then(|s| encode_side(dec.as_ref(), &dict.decoder, hparams).map(|t| (s, t)));
        match pair {
            Some((source, target)) => corpus.push(source, target),
            None => rejected += 1,
        }
    }

    tracing::debug!("Rejected {} of {} pairs", rejected, encode_lines.len());
    tracing::info!("Parsed {} sequence pairs", corpus.len());
    Ok(corpus)
}

/// Read and parse the two corpus files.
pub fn parse_files(
    encode_path: &Path,
    decode_path: &Path,
    dict:        &Dictionary,
    hparams:     &Hyperparameters,
) -> Result<ParallelCorpus> {
    let encode_lines = read_lines(encode_path)?;
    let decode_lines = read_lines(decode_path)?;
    parse_lines(&encode_lines, &decode_lines, dict, hparams)
}
