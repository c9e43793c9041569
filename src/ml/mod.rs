// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn tensor code lives here. Data preparation above this
// layer works on plain Vecs; the application layer only sees
// Seq2SeqModel, the training loop and the Predictor.
//
//   lstm.rs / attention.rs   building blocks on raw tensors
//   encoder.rs / decoder.rs  bidirectional encoder, attention decoder
//   beam_search.rs           host-side beam bookkeeping
//   model.rs                 Seq2SeqModel: training and beam-search drivers
//   lr_schedule.rs / bleu.rs step-wise decay, validation BLEU
//   trainer.rs               the training loop with checkpoint/resume
//   inferencer.rs            Predictor: text in, text out
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Luong, Pham & Manning (2015)

pub mod lstm;
pub mod attention;
pub mod encoder;
pub mod decoder;
pub mod beam_search;

/// Encoder-decoder model with attention
pub mod model;

pub mod lr_schedule;
pub mod bleu;

/// Training loop with validation, summaries and checkpointing
pub mod trainer;

/// Inference from a trained checkpoint
pub mod inferencer;
