// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and the
// hyperparameter flags both of them accept.
//
// Every hyperparameter flag is optional: an absent flag keeps
// the default (fresh model) or the saved value (checkpoint).
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{ArgGroup, Args, Subcommand};
use std::path::PathBuf;

use crate::application::{predict_use_case::PredictConfig, train_use_case::TrainConfig};
use crate::domain::hparams::HparamOverrides;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a new model, or continue training a saved one
    Train(TrainArgs),

    /// Answer with a trained model
    Predict(PredictArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Encoder-side corpus (questions), one example per line
    #[arg(short, long)]
    pub enc: PathBuf,

    /// Decoder-side corpus (answers), line-aligned with --enc
    #[arg(short, long)]
    pub dec: PathBuf,

    /// Model id; a random 20-digit id when absent
    #[arg(long)]
    pub id: Option<String>,

    /// Checkpoint directory of a saved model to continue training
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Directory holding one sub-directory per model
    #[arg(long, default_value = "models")]
    pub model_root: PathBuf,

    /// Use the corpus files as they are instead of cleaning them first
    #[arg(long)]
    pub no_clean: bool,

    #[command(flatten)]
    pub hparams: HparamArgs,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            enc:        a.enc,
            dec:        a.dec,
            id:         a.id,
            pretrained: a.model,
            model_root: a.model_root,
            clean:      !a.no_clean,
            overrides:  a.hparams.into(),
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "interactive"])))]
pub struct PredictArgs {
    /// Checkpoint directory of a trained model
    #[arg(long)]
    pub model: PathBuf,

    /// Answer this one line
    #[arg(long)]
    pub input: Option<String>,

    /// Keep answering lines from stdin until EOF or ctrl-c
    #[arg(long = "loop")]
    pub interactive: bool,

    #[command(flatten)]
    pub hparams: HparamArgs,
}

impl From<&PredictArgs> for PredictConfig {
    fn from(a: &PredictArgs) -> Self {
        PredictConfig {
            model:     a.model.clone(),
            overrides: a.hparams.clone().into(),
        }
    }
}

// ─── Hyperparameter flags ─────────────────────────────────────────────────────
#[derive(Args, Debug, Clone, Default)]
pub struct HparamArgs {
    /// Embedding size of both encoder and decoder [default: 512]
    #[arg(long)]
    pub embedding_dim: Option<usize>,

    /// Decoder LSTM units, halved per encoder direction; must be even [default: 1024]
    #[arg(long)]
    pub rnn_layer_size: Option<usize>,

    /// Stacked LSTM layers on each side [default: 3]
    #[arg(long)]
    pub n_rnn_layers: Option<usize>,

    /// Beam width when decoding [default: 3]
    #[arg(long)]
    pub beam_width: Option<usize>,

    /// Keep probability of cell inputs while training [default: 0.8]
    #[arg(long)]
    pub keep_prob: Option<f64>,

    /// Share of the corpus held out for validation [default: 0.05]
    #[arg(long)]
    pub valid_portion: Option<f64>,

    /// [default: 32]
    #[arg(long)]
    pub train_batch_size: Option<usize>,

    /// [default: 1]
    #[arg(long)]
    pub infer_batch_size: Option<usize>,

    /// Element-wise gradient clip value [default: 5.0]
    #[arg(long)]
    pub max_gradient_norm: Option<f64>,

    /// Passes over the training data [default: 10]
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Stop once the global step exceeds this [default: unbounded]
    #[arg(long)]
    pub max_global_step: Option<u64>,

    /// [default: 0.001]
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Multiplier applied at every decay [default: 0.5]
    #[arg(long)]
    pub decay_rate: Option<f64>,

    /// Steps between decays [default: 1000]
    #[arg(long)]
    pub decay_every: Option<u64>,

    /// Step after which decay begins [default: 8000]
    #[arg(long)]
    pub decay_start_at: Option<u64>,

    /// Length buckets for grouping training pairs [default: 50]
    #[arg(long)]
    pub n_buckets: Option<usize>,

    /// Share of corpus words the vocabulary must cover [default: 0.97]
    #[arg(long)]
    pub vocab_remain_rate: Option<f64>,

    /// [default: 1]
    #[arg(long)]
    pub input_seq_min_len: Option<usize>,

    /// [default: unbounded]
    #[arg(long)]
    pub input_seq_max_len: Option<usize>,

    /// Highest n-gram order in validation BLEU [default: 4]
    #[arg(long)]
    pub bleu_max_order: Option<usize>,

    /// Smoothed BLEU precisions [default: false]
    #[arg(long)]
    pub bleu_smooth: Option<bool>,

    /// Steps between validation reports [default: 50]
    #[arg(long)]
    pub report_every: Option<u64>,

    /// Steps between printed examples [default: 200]
    #[arg(long)]
    pub show_every: Option<u64>,

    /// Steps between summary rows [default: 50]
    #[arg(long)]
    pub summary_every: Option<u64>,

    /// Steps between checkpoints [default: 500]
    #[arg(long)]
    pub save_every: Option<u64>,
}

impl From<HparamArgs> for HparamOverrides {
    fn from(a: HparamArgs) -> Self {
        HparamOverrides {
            embedding_dim:     a.embedding_dim,
            rnn_layer_size:    a.rnn_layer_size,
            n_rnn_layers:      a.n_rnn_layers,
            beam_width:        a.beam_width,
            keep_prob:         a.keep_prob,
            valid_portion:     a.valid_portion,
            train_batch_size:  a.train_batch_size,
            infer_batch_size:  a.infer_batch_size,
            max_gradient_norm: a.max_gradient_norm,
            epoch:             a.epoch,
            max_global_step:   a.max_global_step,
            learning_rate:     a.learning_rate,
            decay_rate:        a.decay_rate,
            decay_every:       a.decay_every,
            decay_start_at:    a.decay_start_at,
            n_buckets:         a.n_buckets,
            vocab_remain_rate: a.vocab_remain_rate,
            input_seq_min_len: a.input_seq_min_len,
            input_seq_max_len: a.input_seq_max_len,
            bleu_max_order:    a.bleu_max_order,
            bleu_smooth:       a.bleu_smooth,
            report_every:      a.report_every,
            show_every:        a.show_every,
            summary_every:     a.summary_every,
            save_every:        a.save_every,
        }
    }
}
