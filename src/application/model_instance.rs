// ============================================================
// Layer 2 — Model Instance
// ============================================================
// Identity and lifecycle of one seq2seq model.
//
//   id              20 random digits unless the caller picks one
//   checkpoint dir  <model_root>/<id>
//   hparams         DEFAULT_HPARAMS + overrides, or the loaded
//                   record + overrides after `load`
//   model           materialised by train / load, or lazily by
//                   the first predict; dropped with the instance
//
// Training runs on B (Autodiff); the trained weights are kept
// on B::InnerBackend for prediction.
//
// Reference: Rust Book §5 (Structs), §17 (Encapsulation)

use anyhow::{bail, Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use rand::Rng;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{parser::parse_files, vocab_builder::build_vocabulary_from_file};
use crate::domain::{
    hparams::{HparamOverrides, Hyperparameters, DEFAULT_HPARAMS},
    traits::SequencePredictor,
    vocabulary::Dictionary,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    inferencer::Predictor,
    model::Seq2SeqConfig,
    trainer::{train_loop, TrainingContext, TrainingData, TrainingBackend},
};

const ID_LEN: usize = 20;

/// A fresh 20-digit id.
pub fn generate_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub struct ModelInstance<B: AutodiffBackend = TrainingBackend> {
    id:             String,
    model_root:     PathBuf,
    checkpoint_dir: PathBuf,
    overrides:      HparamOverrides,
    hparams:        Hyperparameters,
    device:         B::Device,
    predictor:      Option<Predictor<B::InnerBackend>>,
}

impl<B: AutodiffBackend> ModelInstance<B> {
    /// Creates `model_root` if needed; the checkpoint directory
    /// itself appears on the first training run.
    pub fn new(model_root: impl Into<PathBuf>, overrides: HparamOverrides, device: B::Device) -> Result<Self> {
        let model_root = model_root.into();
        fs::create_dir_all(&model_root)
            .with_context(|| format!("Cannot create model root '{}'", model_root.display()))?;

        let hparams = DEFAULT_HPARAMS.apply(&overrides);
        hparams.validate()?;

        let id = generate_id(&mut rand::thread_rng());
        let checkpoint_dir = model_root.join(&id);
        Ok(Self { id, model_root, checkpoint_dir, overrides, hparams, device, predictor: None })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    pub fn hparams(&self) -> &Hyperparameters {
        &self.hparams
    }

    /// Rename the instance. An existing checkpoint directory moves along.
    pub fn set_id(&mut self, new_id: &str) -> Result<()> {
        let target = self.model_root.join(new_id);
        if target.is_dir() {
            bail!("Model named '{}' already exists in '{}'", new_id, self.model_root.display());
        }
        if self.checkpoint_dir.is_dir() {
            fs::rename(&self.checkpoint_dir, &target).with_context(|| {
                format!("Cannot move '{}' to '{}'", self.checkpoint_dir.display(), target.display())
            })?;
        }
        tracing::info!("Model '{}' renamed to '{}'", self.id, new_id);
        self.id = new_id.to_string();
        self.checkpoint_dir = target;
        Ok(())
    }

    /// Adopt an existing checkpoint directory: its name becomes the id
    /// and its weights become the active model.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let predictor = Predictor::from_checkpoint(
            &CheckpointManager::new(path),
            &self.overrides,
            self.device.clone(),
        )?;
        self.adopt(path)?;
        self.hparams   = predictor.hparams().clone();
        self.predictor = Some(predictor);
        Ok(())
    }

    fn adopt(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("'{}' has no usable directory name", path.display()))?;
        self.id = name.to_string();
        self.checkpoint_dir = path.to_path_buf();
        if let Some(parent) = path.parent() {
            self.model_root = parent.to_path_buf();
        }
        Ok(())
    }

    /// Train on a parallel corpus. With `pretrained`, continue the run
    /// saved there (and keep saving there); otherwise start a new model
    /// in this instance's checkpoint directory.
    pub fn train(&mut self, enc: &Path, dec: &Path, pretrained: Option<&Path>) -> Result<()> {
        // release the previous model before building the next one
        self.predictor = None;

        let (hparams, dictionary, ckpt, resume_from) = match pretrained {
            Some(path) => {
                let ckpt = CheckpointManager::new(path);
                ckpt.ensure_complete()?;
                let hparams = ckpt.load_hparams()?.apply(&self.overrides);
                hparams.validate()?;
                let dictionary = ckpt.load_dictionary()?;
                let pointer = ckpt.load_pointer()?;
                tracing::info!("Continuing '{}' from step {}", path.display(), pointer.global_step);
                self.adopt(path)?;
                (hparams, dictionary, ckpt, Some(pointer))
            }
            None => {
                tracing::info!("Training new model '{}'", self.id);
                let hparams = self.hparams.clone();
                let dictionary = Dictionary::new(
                    build_vocabulary_from_file(enc, hparams.vocab_remain_rate)?,
                    build_vocabulary_from_file(dec, hparams.vocab_remain_rate)?,
                );
                let ckpt = CheckpointManager::new(&self.checkpoint_dir);
                ckpt.create_dir()?;
                ckpt.save_dictionary(&dictionary)?;
                ckpt.save_hparams(&hparams)?;
                (hparams, dictionary, ckpt, None)
            }
        };

        let corpus = parse_files(enc, dec, &dictionary, &hparams)?;
        let data   = TrainingData::prepare(&corpus, &hparams, &mut rand::thread_rng());

        let config = Seq2SeqConfig::from_hparams(&hparams, dictionary.encoder.len(), dictionary.decoder.len());
        let mut model = config.init::<B>(&self.device)?;
        if resume_from.is_some() {
            model = ckpt.load_model(model, &self.device)?;
        }

        let ctx = TrainingContext { hparams: &hparams, dictionary: &dictionary, checkpoint: &ckpt };
        let model = train_loop(model, &data, &ctx, resume_from, &self.device)?;

        self.predictor = Some(Predictor::new(model.valid(), dictionary, hparams.clone(), self.device.clone())?);
        self.hparams = hparams;
        Ok(())
    }

    /// Answer one line, loading this instance's checkpoint on first use.
    pub fn predict(&mut self, text: &str) -> Result<String> {
        if self.predictor.is_none() {
            let dir = self.checkpoint_dir.clone();
            self.load(&dir)
                .with_context(|| format!("Model '{}' is not trained yet", self.id))?;
        }
        match &self.predictor {
            Some(predictor) => predictor.predict(text),
            None => bail!("Model '{}' has no weights loaded", self.id),
        }
    }
}

impl<B: AutodiffBackend> SequencePredictor for ModelInstance<B> {
    fn predict(&mut self, text: &str) -> Result<String> {
        ModelInstance::predict(self, text)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use rand::{rngs::StdRng, SeedableRng};

    type B = Autodiff<NdArray>;

    fn scratch_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("instance_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        root
    }

    fn tiny_overrides() -> HparamOverrides {
        HparamOverrides {
            embedding_dim:     Some(8),
            rnn_layer_size:    Some(8),
            n_rnn_layers:      Some(1),
            beam_width:        Some(2),
            train_batch_size:  Some(2),
            valid_portion:     Some(0.2),
            epoch:             Some(2),
            n_buckets:         Some(2),
            vocab_remain_rate: Some(1.0),
            report_every:      Some(2),
            show_every:        Some(4),
            summary_every:     Some(2),
            save_every:        Some(4),
            ..HparamOverrides::default()
        }
    }

    fn write_corpus(root: &Path) -> (PathBuf, PathBuf) {
        let questions = ["hello there", "how are you", "good morning", "see you", "thank you"];
        let answers   = ["hi", "fine thanks", "morning", "bye", "you are welcome"];
        let enc = root.join("enc.txt");
        let dec = root.join("dec.txt");
        // 10 pairs: 2 validation, 8 training
        fs::write(&enc, questions.repeat(2).join("\n")).unwrap();
        fs::write(&dec, answers.repeat(2).join("\n")).unwrap();
        (enc, dec)
    }

    #[test]
    fn test_generated_ids_are_twenty_digits() {
        let mut rng = StdRng::seed_from_u64(3);
        let id = generate_id(&mut rng);
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(id, generate_id(&mut rng));
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        let root = scratch_root("invalid");
        let overrides = HparamOverrides { rnn_layer_size: Some(7), ..HparamOverrides::default() };
        assert!(ModelInstance::<B>::new(&root, overrides, Default::default()).is_err());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_set_id_moves_directory_and_refuses_collisions() {
        let root = scratch_root("rename");
        let mut m = ModelInstance::<B>::new(&root, HparamOverrides::default(), Default::default()).unwrap();
        fs::create_dir_all(m.checkpoint_dir()).unwrap();
        fs::write(m.checkpoint_dir().join("marker"), "x").unwrap();

        m.set_id("alpha").unwrap();
        assert_eq!(m.id(), "alpha");
        assert!(root.join("alpha").join("marker").is_file());

        fs::create_dir_all(root.join("beta")).unwrap();
        assert!(m.set_id("beta").is_err());
        assert_eq!(m.id(), "alpha");
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_predict_without_training_fails() {
        let root = scratch_root("untrained");
        let mut m = ModelInstance::<B>::new(&root, HparamOverrides::default(), Default::default()).unwrap();
        let err = m.predict("hello").unwrap_err();
        assert!(format!("{err:#}").contains("not trained"));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_train_load_predict_end_to_end() {
        let root = scratch_root("e2e");
        fs::create_dir_all(&root).unwrap();
        let (enc, dec) = write_corpus(&root);

        let mut m = ModelInstance::<B>::new(root.join("models"), tiny_overrides(), Default::default()).unwrap();
        m.set_id("bot").unwrap();
        m.train(&enc, &dec, None).unwrap();

        let dir = m.checkpoint_dir().to_path_buf();
        for file in ["model.mpk.gz", "optimizer.mpk.gz", "checkpoint", "dictionary", "hparams"] {
            assert!(dir.join(file).is_file(), "missing {file}");
        }
        let trained = m.predict("hello there").unwrap();

        // a second instance serves the same checkpoint
        let mut other = ModelInstance::<B>::new(root.join("models"), HparamOverrides::default(), Default::default()).unwrap();
        other.load(&dir).unwrap();
        assert_eq!(other.id(), "bot");
        assert_eq!(other.hparams().rnn_layer_size, 8);
        let served = other.predict("hello there").unwrap();
        assert!(served.split_whitespace().count() <= 4);
        assert!(trained.split_whitespace().count() <= 4);

        // resuming continues the step counter in the same directory
        let before = CheckpointManager::new(&dir).load_pointer().unwrap().global_step;
        let mut resumed = ModelInstance::<B>::new(
            root.join("models"),
            HparamOverrides { epoch: Some(3), ..tiny_overrides() },
            Default::default(),
        )
        .unwrap();
        resumed.train(&enc, &dec, Some(&dir)).unwrap();
        assert_eq!(resumed.id(), "bot");
        let after = CheckpointManager::new(&dir).load_pointer().unwrap().global_step;
        assert_eq!(after, before + before / 2);
        fs::remove_dir_all(&root).ok();
    }
}
