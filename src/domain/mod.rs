// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that define the core concepts
// of the system: the hyperparameter set, the vocabularies and
// the parallel id corpus.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The full tunable record plus its partial override form
pub mod hparams;

// Token ↔ id tables with the four reserved tokens
pub mod vocabulary;

// Parallel source/target id sequences
pub mod corpus;

// Core abstractions (traits) that other layers implement
pub mod traits;
