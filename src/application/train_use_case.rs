// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Clean the corpus files in place   (Layer 4 - data)
//   Step 2: Create the model instance         (Layer 2)
//   Step 3: Apply the requested id            (Layer 2)
//   Step 4: Train, fresh or resumed           (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use std::path::PathBuf;

use crate::application::model_instance::ModelInstance;
use crate::data::preprocessor::TextProcessor;
use crate::domain::hparams::HparamOverrides;
use crate::ml::trainer::{training_device, TrainingBackend};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Encoder-side corpus, one example per line
    pub enc:        PathBuf,
    /// Decoder-side corpus, line-aligned with `enc`
    pub dec:        PathBuf,
    pub id:         Option<String>,
    /// Checkpoint directory to continue from
    pub pretrained: Option<PathBuf>,
    pub model_root: PathBuf,
    /// Run the text processor over both files first
    pub clean:      bool,
    pub overrides:  HparamOverrides,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline; returns the checkpoint directory of the trained model.
    pub fn execute(&self) -> Result<PathBuf> {
        let cfg = &self.config;

        // ── Step 1: Clean the corpus ──────────────────────────────────────────
        // A file whose .origin sibling exists was cleaned by an earlier run.
        if cfg.clean {
            let processor = TextProcessor::new()?;
            for path in [&cfg.enc, &cfg.dec] {
                if processor.clean_file(path)? {
                    tracing::info!("Cleaned '{}'", path.display());
                } else {
                    tracing::info!("'{}' already cleaned, skipping", path.display());
                }
            }
        }

        // ── Step 2: Model instance ────────────────────────────────────────────
        let mut instance = ModelInstance::<TrainingBackend>::new(
            &cfg.model_root,
            cfg.overrides.clone(),
            training_device(),
        )?;

        // ── Step 3: Id ────────────────────────────────────────────────────────
        if let Some(id) = &cfg.id {
            instance.set_id(id)?;
        }

        // ── Step 4: Train ─────────────────────────────────────────────────────
        instance.train(&cfg.enc, &cfg.dec, cfg.pretrained.as_deref())?;

        Ok(instance.checkpoint_dir().to_path_buf())
    }
}
