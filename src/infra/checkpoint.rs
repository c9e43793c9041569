// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Everything one model instance persists lives in a single
// directory, `<model_root>/<id>/`:
//
//   model.mpk.gz       weights (CompactRecorder: MessagePack + gzip)
//   optimizer.mpk.gz   Adam moment estimates
//   checkpoint         JSON pointer: {"global_step": .., "epoch": ..}
//   dictionary         JSON 4-tuple: encoder id→token, token→id,
//                                    decoder id→token, token→id
//   hparams            JSON hyperparameter record
//   tensorboard/       summary log (see metrics.rs)
//
// Only one snapshot is kept: every save overwrites the last.
// `checkpoint`, `dictionary` and `hparams` are required to
// resume or to infer; the optimizer file is optional.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{
    hparams::Hyperparameters,
    traits::Persistable,
    vocabulary::{Dictionary, Vocabulary},
};
use crate::ml::model::Seq2SeqModel;

/// File stems; the recorder appends `.mpk.gz`.
const MODEL_STEM:     &str = "model";
const OPTIMIZER_STEM: &str = "optimizer";

pub const POINTER_FILE:    &str = "checkpoint";
pub const DICTIONARY_FILE: &str = "dictionary";
pub const HPARAMS_FILE:    &str = "hparams";
pub const SUMMARY_DIR:     &str = "tensorboard";

// ─── CheckpointPointer ────────────────────────────────────────────────────────
/// Where training stood when the snapshot was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointPointer {
    pub global_step: u64,
    pub epoch:       usize,
}

impl CheckpointPointer {
    pub fn new(global_step: u64, epoch: usize) -> Self {
        Self { global_step, epoch }
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
}

impl Persistable for CheckpointPointer {
    fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

impl Persistable for Hyperparameters {
    fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

type DictionaryTables = (
    BTreeMap<usize, String>,
    BTreeMap<String, usize>,
    BTreeMap<usize, String>,
    BTreeMap<String, usize>,
);

impl Persistable for Dictionary {
    fn save(&self, path: &Path) -> Result<()> {
        let (enc_id2tok, enc_tok2id) = self.encoder.to_tables();
        let (dec_id2tok, dec_tok2id) = self.decoder.to_tables();
        write_json(&(enc_id2tok, enc_tok2id, dec_id2tok, dec_tok2id), path)
    }

    fn load(path: &Path) -> Result<Self> {
        let (enc_id2tok, enc_tok2id, dec_id2tok, dec_tok2id): DictionaryTables = read_json(path)?;
        Ok(Dictionary::new(
            Vocabulary::from_tables(&enc_id2tok, &enc_tok2id).context("Bad encoder vocabulary")?,
            Vocabulary::from_tables(&dec_id2tok, &dec_tok2id).context("Bad decoder vocabulary")?,
        ))
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Reads and writes the files of one checkpoint directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Does not touch the filesystem; see `create_dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn create_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))
    }

    pub fn summary_dir(&self) -> PathBuf {
        self.dir.join(SUMMARY_DIR)
    }

    fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_STEM)
    }

    fn optimizer_path(&self) -> PathBuf {
        self.dir.join(OPTIMIZER_STEM)
    }

    /// A pointer file exists, so there is something to resume.
    pub fn has_checkpoint(&self) -> bool {
        self.dir.join(POINTER_FILE).is_file()
    }

    /// Fail unless the pointer, dictionary and hparams files all exist.
    pub fn ensure_complete(&self) -> Result<()> {
        if !self.dir.is_dir() {
            bail!("Checkpoint directory '{}' does not exist", self.dir.display());
        }
        let missing: Vec<&str> = [POINTER_FILE, DICTIONARY_FILE, HPARAMS_FILE]
            .into_iter()
            .filter(|f| !self.dir.join(f).is_file())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Checkpoint '{}' is incomplete, missing: {}",
                self.dir.display(),
                missing.join(", ")
            );
        }
        Ok(())
    }

    // ── Weights ──────────────────────────────────────────────────────────────
    pub fn save_model<B: Backend>(&self, model: &Seq2SeqModel<B>) -> Result<()> {
        let path = self.model_path();
        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .map_err(|e| anyhow!("Failed to save weights to '{}': {e:?}", path.display()))
    }

    /// `model` must have the saved architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  Seq2SeqModel<B>,
        device: &B::Device,
    ) -> Result<Seq2SeqModel<B>> {
        let path = self.model_path();
        model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .map_err(|e| anyhow!("Cannot load weights from '{}': {e:?}", path.display()))
    }

    // ── Optimizer state ──────────────────────────────────────────────────────
    pub fn save_optimizer<B, O>(&self, optim: &O) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2SeqModel<B>, B>,
    {
        let path = self.optimizer_path();
        CompactRecorder::new()
            .record(optim.to_record(), path.clone())
            .map_err(|e| anyhow!("Failed to save optimizer state to '{}': {e:?}", path.display()))
    }

    /// Restore the optimizer state if it was saved; otherwise return
    /// `optim` unchanged with a warning.
    pub fn load_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2SeqModel<B>, B>,
    {
        let path = self.optimizer_path();
        if !path.with_extension("mpk.gz").is_file() {
            tracing::warn!(
                "No optimizer state in '{}', starting with fresh moments",
                self.dir.display()
            );
            return Ok(optim);
        }
        let record: O::Record = CompactRecorder::new()
            .load(path.clone(), device)
            .map_err(|e| anyhow!("Cannot load optimizer state from '{}': {e:?}", path.display()))?;
        Ok(optim.load_record(record))
    }

    // ── JSON side files ──────────────────────────────────────────────────────
    pub fn save_pointer(&self, pointer: CheckpointPointer) -> Result<()> {
        pointer.save(&self.dir.join(POINTER_FILE))
    }

    pub fn load_pointer(&self) -> Result<CheckpointPointer> {
        CheckpointPointer::load(&self.dir.join(POINTER_FILE))
    }

    pub fn save_dictionary(&self, dictionary: &Dictionary) -> Result<()> {
        dictionary.save(&self.dir.join(DICTIONARY_FILE))
    }

    pub fn load_dictionary(&self) -> Result<Dictionary> {
        Dictionary::load(&self.dir.join(DICTIONARY_FILE))
    }

    pub fn save_hparams(&self, hparams: &Hyperparameters) -> Result<()> {
        hparams.save(&self.dir.join(HPARAMS_FILE))
    }

    pub fn load_hparams(&self) -> Result<Hyperparameters> {
        Hyperparameters::load(&self.dir.join(HPARAMS_FILE))
    }

    /// Weights, optimizer state and pointer in one go.
    pub fn save_snapshot<B, O>(
        &self,
        model:   &Seq2SeqModel<B>,
        optim:   &O,
        pointer: CheckpointPointer,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2SeqModel<B>, B>,
    {
        self.save_model(model)?;
        self.save_optimizer::<B, O>(optim)?;
        self.save_pointer(pointer)?;
        tracing::debug!(
            "Saved checkpoint at step {} (epoch {}) to '{}'",
            pointer.global_step,
            pointer.epoch,
            self.dir.display()
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::Seq2SeqConfig;
    use burn::backend::NdArray;

    fn scratch(name: &str) -> CheckpointManager {
        let dir = std::env::temp_dir().join(format!("ckpt_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let manager = CheckpointManager::new(dir);
        manager.create_dir().unwrap();
        manager
    }

    #[test]
    fn test_dictionary_survives_disk() {
        let ckpt = scratch("dict");
        let dict = Dictionary::new(
            Vocabulary::from_tokens(["hello", "world", "café", "\"quoted\""]),
            Vocabulary::from_tokens(["hi", "naïve", "it's", "日本"]),
        );
        ckpt.save_dictionary(&dict).unwrap();
        let loaded = ckpt.load_dictionary().unwrap();
        assert_eq!(loaded, dict);
        assert_eq!(loaded.decoder.token(5), Some("naïve"));
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_hparams_and_pointer_survive_disk() {
        let ckpt = scratch("hp");
        let mut hp = Hyperparameters::default();
        hp.max_global_step = Some(77);
        ckpt.save_hparams(&hp).unwrap();
        ckpt.save_pointer(CheckpointPointer::new(12, 3)).unwrap();

        assert_eq!(ckpt.load_hparams().unwrap(), hp);
        assert_eq!(ckpt.load_pointer().unwrap(), CheckpointPointer::new(12, 3));
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_incomplete_checkpoint_names_missing_files() {
        let ckpt = scratch("incomplete");
        ckpt.save_hparams(&Hyperparameters::default()).unwrap();

        let err = ckpt.ensure_complete().unwrap_err().to_string();
        assert!(err.contains(POINTER_FILE));
        assert!(err.contains(DICTIONARY_FILE));
        assert!(!err.contains(HPARAMS_FILE));
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let ckpt = CheckpointManager::new(std::env::temp_dir().join("ckpt_does_not_exist_here"));
        assert!(ckpt.ensure_complete().is_err());
        assert!(!ckpt.has_checkpoint());
    }

    #[test]
    fn test_weights_reload_into_fresh_model() {
        let ckpt = scratch("weights");
        let device = Default::default();
        let config = Seq2SeqConfig::new(8, 8, 4, 4, 1);
        let model = config.init::<NdArray>(&device).unwrap();
        ckpt.save_model(&model).unwrap();
        assert!(ckpt.dir().join("model.mpk.gz").is_file());

        let fresh = config.init::<NdArray>(&device).unwrap();
        assert!(ckpt.load_model(fresh, &device).is_ok());
        fs::remove_dir_all(ckpt.dir()).ok();
    }
}
