// ============================================================
// Layer 3 — Hyperparameter Set
// ============================================================
// The full, immutable record of every tunable value used by
// a model: architecture, optimisation, data filtering,
// validation scoring and the periodic-action intervals.
//
// Two types live here:
//   Hyperparameters — every field set; what a model runs with
//   HparamOverrides — every field optional; what a caller asks for
//
// Defaults are a plain constant (DEFAULT_HPARAMS). Nothing is
// shared or mutated between model instances: a run always
// starts from `DEFAULT_HPARAMS.apply(&overrides)` or, when a
// checkpoint is resumed, from `loaded.apply(&overrides)`.
//
// Reference: Rust Book §5 (Structs), §6 (Option)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Embedding size for both encoder and decoder tokens
    pub embedding_dim:     usize,
    /// Units per decoder LSTM layer; each encoder direction gets half (even only)
    pub rnn_layer_size:    usize,
    /// Stacked layers, same count for encoder and decoder
    pub n_rnn_layers:      usize,
    pub beam_width:        usize,
    /// Keep probability applied to every cell input while training
    pub keep_prob:         f64,
    /// Fraction of the parsed corpus reserved for validation
    pub valid_portion:     f64,
    pub train_batch_size:  usize,
    pub infer_batch_size:  usize,
    /// Element-wise gradient clip value
    pub max_gradient_norm: f64,
    pub epoch:             usize,
    /// `None` trains for `epoch` passes without a step ceiling
    pub max_global_step:   Option<u64>,
    pub learning_rate:     f64,
    pub decay_rate:        f64,
    pub decay_every:       u64,
    pub decay_start_at:    u64,
    pub n_buckets:         usize,
    /// Vocabulary keeps the most frequent tokens covering this share of the corpus
    pub vocab_remain_rate: f64,
    pub input_seq_min_len: usize,
    /// `None` means no upper bound
    pub input_seq_max_len: Option<usize>,
    pub bleu_max_order:    usize,
    pub bleu_smooth:       bool,
    pub report_every:      u64,
    pub show_every:        u64,
    pub summary_every:     u64,
    pub save_every:        u64,
}

pub const DEFAULT_HPARAMS: Hyperparameters = Hyperparameters {
    embedding_dim:     512,
    rnn_layer_size:    1024,
    n_rnn_layers:      3,
    beam_width:        3,
    keep_prob:         0.8,
    valid_portion:     0.05,
    train_batch_size:  32,
    infer_batch_size:  1,
    max_gradient_norm: 5.0,
    epoch:             10,
    max_global_step:   None,
    learning_rate:     1e-3,
    decay_rate:        0.5,
    decay_every:       1_000,
    decay_start_at:    8_000,
    n_buckets:         50,
    vocab_remain_rate: 0.97,
    input_seq_min_len: 1,
    input_seq_max_len: None,
    bleu_max_order:    4,
    bleu_smooth:       false,
    report_every:      50,
    show_every:        200,
    summary_every:     50,
    save_every:        500,
};

impl Default for Hyperparameters {
    fn default() -> Self {
        DEFAULT_HPARAMS
    }
}

impl Hyperparameters {
    /// Return a copy of `self` with every field the overrides set replaced.
    pub fn apply(&self, overrides: &HparamOverrides) -> Self {
        let o = overrides;
        Self {
            embedding_dim:     o.embedding_dim.unwrap_or(self.embedding_dim),
            rnn_layer_size:    o.rnn_layer_size.unwrap_or(self.rnn_layer_size),
            n_rnn_layers:      o.n_rnn_layers.unwrap_or(self.n_rnn_layers),
            beam_width:        o.beam_width.unwrap_or(self.beam_width),
            keep_prob:         o.keep_prob.unwrap_or(self.keep_prob),
            valid_portion:     o.valid_portion.unwrap_or(self.valid_portion),
            train_batch_size:  o.train_batch_size.unwrap_or(self.train_batch_size),
            infer_batch_size:  o.infer_batch_size.unwrap_or(self.infer_batch_size),
            max_gradient_norm: o.max_gradient_norm.unwrap_or(self.max_gradient_norm),
            epoch:             o.epoch.unwrap_or(self.epoch),
            max_global_step:   o.max_global_step.or(self.max_global_step),
            learning_rate:     o.learning_rate.unwrap_or(self.learning_rate),
            decay_rate:        o.decay_rate.unwrap_or(self.decay_rate),
            decay_every:       o.decay_every.unwrap_or(self.decay_every),
            decay_start_at:    o.decay_start_at.unwrap_or(self.decay_start_at),
            n_buckets:         o.n_buckets.unwrap_or(self.n_buckets),
            vocab_remain_rate: o.vocab_remain_rate.unwrap_or(self.vocab_remain_rate),
            input_seq_min_len: o.input_seq_min_len.unwrap_or(self.input_seq_min_len),
            input_seq_max_len: o.input_seq_max_len.or(self.input_seq_max_len),
            bleu_max_order:    o.bleu_max_order.unwrap_or(self.bleu_max_order),
            bleu_smooth:       o.bleu_smooth.unwrap_or(self.bleu_smooth),
            report_every:      o.report_every.unwrap_or(self.report_every),
            show_every:        o.show_every.unwrap_or(self.show_every),
            summary_every:     o.summary_every.unwrap_or(self.summary_every),
            save_every:        o.save_every.unwrap_or(self.save_every),
        }
    }

    /// Check the invariants the model and the training loop rely on.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.rnn_layer_size > 0 && self.rnn_layer_size % 2 == 0,
            "rnn_layer_size must be a positive even number, got {}", self.rnn_layer_size);
        ensure!(self.embedding_dim > 0, "embedding_dim must be positive");
        ensure!(self.n_rnn_layers > 0, "n_rnn_layers must be positive");
        ensure!(self.beam_width > 0, "beam_width must be positive");
        ensure!(self.train_batch_size > 0, "train_batch_size must be positive");
        ensure!(self.infer_batch_size > 0, "infer_batch_size must be positive");
        ensure!(self.keep_prob > 0.0 && self.keep_prob <= 1.0,
            "keep_prob must lie in (0, 1], got {}", self.keep_prob);
        ensure!((0.0..1.0).contains(&self.valid_portion),
            "valid_portion must lie in [0, 1), got {}", self.valid_portion);
        ensure!(self.vocab_remain_rate > 0.0 && self.vocab_remain_rate <= 1.0,
            "vocab_remain_rate must lie in (0, 1], got {}", self.vocab_remain_rate);
        ensure!(self.learning_rate > 0.0,
            "learning_rate must be positive, got {}", self.learning_rate);
        ensure!(self.decay_rate > 0.0,
            "decay_rate must be positive, got {}", self.decay_rate);
        ensure!(self.max_gradient_norm > 0.0,
            "max_gradient_norm must be positive, got {}", self.max_gradient_norm);
        ensure!(self.bleu_max_order > 0, "bleu_max_order must be positive");
        ensure!(self.decay_every > 0, "decay_every must be positive");
        ensure!(
            self.report_every > 0 && self.show_every > 0
                && self.summary_every > 0 && self.save_every > 0,
            "report/show/summary/save intervals must be positive"
        );
        if let Some(max_len) = self.input_seq_max_len {
            ensure!(max_len >= self.input_seq_min_len,
                "input_seq_max_len ({max_len}) is below input_seq_min_len ({})",
                self.input_seq_min_len);
        }
        Ok(())
    }

    /// Whether a sequence of `len` tokens passes the length filter.
    pub fn accepts_len(&self, len: usize) -> bool {
        len >= self.input_seq_min_len
            && self.input_seq_max_len.map_or(true, |max| len <= max)
    }
}

// ─── HparamOverrides ──────────────────────────────────────────────────────────
/// A partial hyperparameter record. `None` means "not specified".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HparamOverrides {
    pub embedding_dim:     Option<usize>,
    pub rnn_layer_size:    Option<usize>,
    pub n_rnn_layers:      Option<usize>,
    pub beam_width:        Option<usize>,
    pub keep_prob:         Option<f64>,
    pub valid_portion:     Option<f64>,
    pub train_batch_size:  Option<usize>,
    pub infer_batch_size:  Option<usize>,
    pub max_gradient_norm: Option<f64>,
    pub epoch:             Option<usize>,
    pub max_global_step:   Option<u64>,
    pub learning_rate:     Option<f64>,
    pub decay_rate:        Option<f64>,
    pub decay_every:       Option<u64>,
    pub decay_start_at:    Option<u64>,
    pub n_buckets:         Option<usize>,
    pub vocab_remain_rate: Option<f64>,
    pub input_seq_min_len: Option<usize>,
    pub input_seq_max_len: Option<usize>,
    pub bleu_max_order:    Option<usize>,
    pub bleu_smooth:       Option<bool>,
    pub report_every:      Option<u64>,
    pub show_every:        Option<u64>,
    pub summary_every:     Option<u64>,
    pub save_every:        Option<u64>,
}
