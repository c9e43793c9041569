// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw corpus files to device-ready batches.
//
//   enc.txt / dec.txt
//       │
//       ▼
//   TextProcessor     → regex cleaning, in place (.origin kept)
//       │
//       ▼
//   vocab_builder     → frequency-ranked Vocabulary per side
//       │
//       ▼
//   parser            → ParallelCorpus of id sequences, filtered
//       │
//       ▼
//   bucketizer        → pairs of similar length grouped together
//       │
//       ▼
//   splitter          → training / validation subsets
//       │
//       ▼
//   PaddedBatches     → windows → Seq2SeqBatcher → Seq2SeqBatch tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads corpus lines and tokenises them
pub mod loader;

/// Regex cleaning of corpus files and predictor inputs
pub mod preprocessor;

/// Builds vocabularies with a coverage threshold
pub mod vocab_builder;

/// Maps line pairs to filtered id sequences
pub mod parser;

/// Groups pairs into length buckets
pub mod bucketizer;

/// Reserves the validation subset
pub mod splitter;

/// Padded minibatches and their tensor form
pub mod batcher;
