// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven training with Adam, periodic validation and a
// single overwritten checkpoint.
//
// Per step:
//   lr     = schedule.next()
//   loss   = masked cross-entropy (teacher forcing)
//   θ      = Adam(θ, clip_value(∇loss), lr)
//   step  += 1
//   every report_every  → loss + BLEU on the next validation batch
//   every show_every    → one INPUT / PRED / EXPECT example
//   every summary_every → scalars to tensorboard/scalars.csv
//   every save_every    → weights + optimizer + pointer
//   step > max_global_step → stop
//
// A resumed run continues at epoch 1 + step / n_batch and skips
// the step % n_batch batches of that epoch it already saw. The
// final state is always checkpointed before returning.
//
// Backends:
//   - training runs on B: AutodiffBackend (Autodiff<Wgpu> in the binary)
//   - validation runs on model.valid(), i.e. B::InnerBackend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{anyhow, ensure, Result};
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{seq::SliceRandom, Rng};

use crate::data::{
    batcher::{PaddedBatch, PaddedBatches, Seq2SeqBatch, Seq2SeqBatcher},
    bucketizer::bucketize,
    splitter::split_validation,
};
use crate::domain::{
    corpus::ParallelCorpus,
    hparams::Hyperparameters,
    vocabulary::{Dictionary, Vocabulary},
};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointPointer},
    metrics::{tags, SummaryWriter},
};
use crate::ml::{bleu::BleuScorer, lr_schedule::LrSchedule, model::Seq2SeqModel};

pub type TrainingBackend = Autodiff<Wgpu>;

pub fn training_device() -> WgpuDevice {
    let device = WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    device
}

// ─── Training data ────────────────────────────────────────────────────────────
/// The bucketized corpus, split once into training and validation pairs.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub train: ParallelCorpus,
    pub valid: ParallelCorpus,
}

impl TrainingData {
    pub fn prepare<R: Rng + ?Sized>(corpus: &ParallelCorpus, h: &Hyperparameters, rng: &mut R) -> Self {
        let bucketed = bucketize(corpus, h.n_buckets);
        let (train, valid) = split_validation(&bucketed, h.valid_portion, h.train_batch_size, rng);
        Self { train, valid }
    }
}

/// What the loop needs besides the model and the data.
pub struct TrainingContext<'a> {
    pub hparams:    &'a Hyperparameters,
    pub dictionary: &'a Dictionary,
    pub checkpoint: &'a CheckpointManager,
}

// ─── Validation ───────────────────────────────────────────────────────────────
/// Outcome of one validation batch.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub batch:       PaddedBatch,
    /// Teacher-forced argmax tokens, cut to each target's length
    pub predictions: Vec<Vec<usize>>,
    pub loss:        f64,
    pub bleu:        f64,
}

pub fn validate<B: Backend>(
    model:  &Seq2SeqModel<B>,
    batch:  Seq2SeqBatch<B>,
    scorer: &BleuScorer,
) -> Result<ValidationReport> {
    let (loss, logits) = model.forward_loss(&batch);
    let batch = batch.host;
    let loss: f64 = loss.into_scalar().elem::<f64>();

    let width = batch.target_width().max(1);
    let ids: Vec<i64> = logits
        .argmax(2)
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;

    let predictions: Vec<Vec<usize>> = ids
        .chunks(width)
        .zip(&batch.target_lens)
        .map(|(row, &len)| row[..len].iter().map(|&t| t as usize).collect())
        .collect();
    let references: Vec<Vec<usize>> = (0..batch.len()).map(|i| batch.target(i).to_vec()).collect();
    let bleu = scorer.score(&predictions, &references);

    Ok(ValidationReport { batch, predictions, loss, bleu })
}

fn render(vocab: &Vocabulary, ids: &[usize]) -> String {
    vocab.decode(ids).join(" ")
}

fn show_example<R: Rng + ?Sized>(report: &ValidationReport, dictionary: &Dictionary, rng: &mut R) {
    let rows: Vec<usize> = (0..report.batch.len()).collect();
    if let Some(&i) = rows.choose(rng) {
        println!("INPUT:  {}", render(&dictionary.encoder, report.batch.input(i)));
        println!("PRED:   {}", render(&dictionary.decoder, &report.predictions[i]));
        println!("EXPECT: {}", render(&dictionary.decoder, report.batch.target(i)));
    }
}

// ─── Loop ─────────────────────────────────────────────────────────────────────
/// Train `model` on `data`. `resume_from` continues a saved run;
/// its optimizer state is restored when present.
pub fn train_loop<B: AutodiffBackend>(
    mut model:   Seq2SeqModel<B>,
    data:        &TrainingData,
    ctx:         &TrainingContext<'_>,
    resume_from: Option<CheckpointPointer>,
    device:      &B::Device,
) -> Result<Seq2SeqModel<B>> {
    let h = ctx.hparams;
    let batch_size = h.train_batch_size;
    ensure!(
        data.train.len() >= batch_size,
        "Training corpus has {} pairs, fewer than one batch of {}",
        data.train.len(),
        batch_size
    );
    let n_batch = data.train.len() / batch_size;

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Value(h.max_gradient_norm as f32)))
        .init();
    if resume_from.is_some() {
        optim = ctx.checkpoint.load_optimizer::<B, _>(optim, device)?;
    }

    // ── Position ──────────────────────────────────────────────────────────────
    let mut step    = resume_from.map_or(0, |p| p.global_step);
    let start_epoch = 1 + step as usize / n_batch;
    let skip        = step as usize % n_batch;
    let mut epoch   = start_epoch;
    let mut lr      = LrSchedule::from_hparams(h).starting_at(step);

    if resume_from.is_some() {
        tracing::info!(
            "Resuming at step {} (epoch {}, skipping {} batches)",
            step, start_epoch, skip
        );
    }

    let summary = SummaryWriter::new(&ctx.checkpoint.summary_dir())?;
    let scorer  = BleuScorer::new(h.bleu_max_order, h.bleu_smooth);
    let mut rng = rand::thread_rng();
    let train_batcher = Seq2SeqBatcher::<B>::new(device.clone());
    let valid_batcher = Seq2SeqBatcher::<B::InnerBackend>::new(device.clone());
    let mut valid_batches = PaddedBatches::new(&data.valid, &valid_batcher, batch_size, true);
    let mut last_report: Option<ValidationReport> = None;

    tracing::info!(
        "Training on {} pairs ({} batches per epoch), validating on {}",
        data.train.len(), n_batch, data.valid.len()
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    'epochs: for e in start_epoch..=h.epoch {
        epoch = e;
        let first = if e == start_epoch { skip } else { 0 };
        let batches = PaddedBatches::new(&data.train, &train_batcher, batch_size, false)
            .starting_at(first);

        for batch in batches {
            let rate = lr.next().unwrap_or(h.learning_rate);

            let (loss, _) = model.forward_loss(&batch);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

            // Backward pass + Adam update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(rate, model, grads);
            step += 1;

            if step % h.report_every == 0 {
                if let Some(valid) = valid_batches.next() {
                    let report = validate(&model.valid(), valid, &scorer)?;
                    println!(
                        "Epoch {:>3}/{} | step {:>7} | lr={:.6} | train_loss={:.4} | val_loss={:.4} | bleu={:.4}",
                        epoch, h.epoch, step, rate, loss_val, report.loss, report.bleu,
                    );
                    summary.add_scalars(step, &[
                        (tags::VALID_LOSS, report.loss),
                        (tags::VALID_BLEU, report.bleu),
                    ])?;
                    last_report = Some(report);
                }
            }

            if step % h.show_every == 0 {
                match &last_report {
                    Some(report) => show_example(report, ctx.dictionary, &mut rng),
                    None => tracing::debug!("No validation batch to show at step {}", step),
                }
            }

            if step % h.summary_every == 0 {
                summary.add_scalars(step, &[
                    (tags::TRAIN_LOSS, loss_val),
                    (tags::LEARNING_RATE, rate),
                ])?;
            }

            if step % h.save_every == 0 {
                ctx.checkpoint.save_snapshot(&model, &optim, CheckpointPointer::new(step, epoch))?;
                tracing::info!("Checkpoint saved at step {}", step);
            }

            if h.max_global_step.is_some_and(|max| step > max) {
                tracing::info!("Reached max_global_step at step {}", step);
                break 'epochs;
            }
        }
    }

    ctx.checkpoint.save_snapshot(&model, &optim, CheckpointPointer::new(step, epoch))?;
    tracing::info!("Training complete at step {} (epoch {})", step, epoch);
    Ok(model)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::metrics::SCALARS_FILE;
    use crate::ml::model::Seq2SeqConfig;
    use burn::{backend::NdArray, data::dataloader::batcher::Batcher};
    use std::fs;

    type B = Autodiff<NdArray>;

    fn toy_corpus(n: usize) -> ParallelCorpus {
        let mut c = ParallelCorpus::new();
        for i in 0..n {
            let a = 4 + i % 4;
            c.push(vec![a, a + 1], vec![a + 1, a]);
        }
        c
    }

    fn toy_hparams() -> Hyperparameters {
        let mut h = Hyperparameters::default();
        h.embedding_dim     = 4;
        h.rnn_layer_size    = 4;
        h.n_rnn_layers      = 1;
        h.train_batch_size  = 2;
        h.valid_portion     = 0.25;
        h.epoch             = 2;
        h.n_buckets         = 1;
        h.report_every      = 1;
        h.show_every        = 2;
        h.summary_every     = 1;
        h.save_every        = 100;
        h
    }

    fn dictionary() -> Dictionary {
        let words = ["a", "b", "c", "d", "e"];
        Dictionary::new(Vocabulary::from_tokens(words), Vocabulary::from_tokens(words))
    }

    fn scratch(name: &str) -> CheckpointManager {
        let dir = std::env::temp_dir().join(format!("trainer_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let ckpt = CheckpointManager::new(dir);
        ckpt.create_dir().unwrap();
        ckpt
    }

    fn model(h: &Hyperparameters, device: &<B as Backend>::Device) -> Seq2SeqModel<B> {
        Seq2SeqConfig::from_hparams(h, 9, 9).init::<B>(device).unwrap()
    }

    fn split(corpus: &ParallelCorpus) -> TrainingData {
        // first 6 pairs train, last 2 validate
        TrainingData {
            train: corpus.select(&(0..6).collect::<Vec<_>>()),
            valid: corpus.select(&[6, 7]),
        }
    }

    #[test]
    fn test_runs_all_epochs_and_checkpoints() {
        let device = Default::default();
        let h = toy_hparams();
        let dict = dictionary();
        let ckpt = scratch("epochs");
        let ctx = TrainingContext { hparams: &h, dictionary: &dict, checkpoint: &ckpt };

        train_loop(model(&h, &device), &split(&toy_corpus(8)), &ctx, None, &device).unwrap();

        // 3 batches per epoch × 2 epochs
        assert_eq!(ckpt.load_pointer().unwrap(), CheckpointPointer::new(6, 2));
        assert!(ckpt.dir().join("model.mpk.gz").is_file());

        let scalars = fs::read_to_string(ckpt.summary_dir().join(SCALARS_FILE)).unwrap();
        assert!(scalars.contains(tags::VALID_BLEU));
        assert!(scalars.contains(tags::TRAIN_LOSS));
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_resume_continues_from_pointer() {
        let device = Default::default();
        let mut h = toy_hparams();
        let dict = dictionary();
        let ckpt = scratch("resume");
        let data = split(&toy_corpus(8));

        h.epoch = 1;
        let ctx = TrainingContext { hparams: &h, dictionary: &dict, checkpoint: &ckpt };
        let trained = train_loop(model(&h, &device), &data, &ctx, None, &device).unwrap();
        let pointer = ckpt.load_pointer().unwrap();
        assert_eq!(pointer, CheckpointPointer::new(3, 1));

        let mut more = h.clone();
        more.epoch = 3;
        let ctx = TrainingContext { hparams: &more, dictionary: &dict, checkpoint: &ckpt };
        train_loop(trained, &data, &ctx, Some(pointer), &device).unwrap();
        assert_eq!(ckpt.load_pointer().unwrap(), CheckpointPointer::new(9, 3));
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_max_global_step_stops_early() {
        let device = Default::default();
        let mut h = toy_hparams();
        h.max_global_step = Some(2);
        h.epoch = 50;
        let dict = dictionary();
        let ckpt = scratch("maxstep");
        let ctx = TrainingContext { hparams: &h, dictionary: &dict, checkpoint: &ckpt };

        train_loop(model(&h, &device), &split(&toy_corpus(8)), &ctx, None, &device).unwrap();
        assert_eq!(ckpt.load_pointer().unwrap().global_step, 3);
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_corpus_smaller_than_a_batch_is_rejected() {
        let device = Default::default();
        let mut h = toy_hparams();
        h.train_batch_size = 16;
        let dict = dictionary();
        let ckpt = scratch("tiny");
        let ctx = TrainingContext { hparams: &h, dictionary: &dict, checkpoint: &ckpt };

        let err = train_loop(model(&h, &device), &split(&toy_corpus(8)), &ctx, None, &device).unwrap_err();
        assert!(err.to_string().contains("fewer than one batch"));
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_validation_predictions_follow_target_lengths() {
        let device = Default::default();
        let h = toy_hparams();
        let m = model(&h, &device).valid();
        let batch = Seq2SeqBatcher::<NdArray>::new(device)
            .batch(vec![(vec![4, 5], vec![5]), (vec![6], vec![6, 7, 8])]);

        let report = validate(&m, batch, &BleuScorer::new(4, false)).unwrap();
        assert_eq!(report.predictions[0].len(), 2);
        assert_eq!(report.predictions[1].len(), 4);
        assert!(report.loss.is_finite());
        assert!((0.0..=1.0).contains(&report.bleu));
    }

    #[test]
    fn test_prepare_reserves_whole_validation_batches() {
        let h = toy_hparams();
        let mut rng = rand::thread_rng();
        let data = TrainingData::prepare(&toy_corpus(8), &h, &mut rng);
        assert_eq!(data.valid.len(), 2);
        assert_eq!(data.train.len(), 6);
    }
}
