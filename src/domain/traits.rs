// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams other layers implement:
//
//   SequencePredictor — maps one raw input line to one output line
//                       (ModelInstance implements it)
//   Persistable       — state that round-trips through a file
//                       (Dictionary, Hyperparameters and the
//                       checkpoint pointer implement it in infra/)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

// ─── SequencePredictor ────────────────────────────────────────────────────────
/// Anything that can answer a raw input line with a generated line.
pub trait SequencePredictor {
    /// Takes `&mut self` so implementations may load a model lazily.
    fn predict(&mut self, text: &str) -> Result<String>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
pub trait Persistable: Sized {
    /// Save this component's state to the given path
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a component's state from the given path.
    fn load(path: &Path) -> Result<Self>;
}
