// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem concerns shared by training and inference:
//
//   checkpoint.rs — the per-model directory: weights, optimizer
//                   state, pointer, dictionary and hparams
//   metrics.rs    — the scalar summary log under tensorboard/
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training summary CSV logger
pub mod metrics;
