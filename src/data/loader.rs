// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads line-oriented corpus files. One example per line; the
// encoder file and the decoder file are aligned line by line.
//
// Tokenisation is deliberately simple: lower-case, then split
// on Unicode whitespace. The same function is used when the
// vocabulary is built, when the corpus is parsed and when a
// predictor input is encoded, so all three agree.
//
// Reference: Rust Book §12 (I/O and File Handling)
//            Rust Book §8 (Strings in Rust)

use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Read every line of a text file (without line terminators).
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    tracing::debug!("Read {} lines from '{}'", lines.len(), path.display());
    Ok(lines)
}

/// Lower-case a line and split it on whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    line.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
