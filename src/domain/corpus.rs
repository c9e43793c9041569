// ============================================================
// Layer 3 — Parallel Corpus
// ============================================================
// Two equally long lists of id sequences: `sources[i]` is the
// encoder input and `targets[i]` the decoder output of pair i.
//
// The corpus is transient. It is rebuilt from the text files
// on every train call (fresh or resumed) and never persisted.
//
// Reference: Rust Book §8 (Vectors)

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParallelCorpus {
    pub sources: Vec<Vec<usize>>,
    pub targets: Vec<Vec<usize>>,
}

impl ParallelCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: Vec<usize>, target: Vec<usize>) {
        self.sources.push(source);
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Longest source sequence, 0 for an empty corpus.
    pub fn max_source_len(&self) -> usize {
        self.sources.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// A new corpus holding the pairs at `indices`, in that order.
    /// Panics on an out-of-range index, like slice indexing.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            sources: indices.iter().map(|&i| self.sources[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i].clone()).collect(),
        }
    }
}
