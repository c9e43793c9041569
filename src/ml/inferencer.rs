// ============================================================
// Layer 5 — Predictor
// ============================================================
// Serves single-sequence inference from a trained model.
//
//   raw text ──clean──► lower-case tokens ──encoder vocab──► ids
//            ──× infer_batch_size──► beam search ──► row 0, rank 0
//            ──decoder vocab──► tokens joined by spaces
//
// Unknown words map to <UNK>. Reserved tokens in the output
// (including the trailing <EOS>) are returned as they are.
//
// Reference: Sutskever, Vinyals & Le (2014) §3.1 (decoding)

use anyhow::Result;
use burn::prelude::*;

use crate::data::{
    batcher::{int_tensor, length_mask},
    loader::tokenize,
    preprocessor::TextProcessor,
};
use crate::domain::{
    hparams::{HparamOverrides, Hyperparameters},
    vocabulary::{Dictionary, EOS_ID, GO_ID},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{Seq2SeqConfig, Seq2SeqModel};

pub struct Predictor<B: Backend> {
    model:      Seq2SeqModel<B>,
    dictionary: Dictionary,
    hparams:    Hyperparameters,
    processor:  TextProcessor,
    device:     B::Device,
}

impl<B: Backend> Predictor<B> {
    pub fn new(
        model:      Seq2SeqModel<B>,
        dictionary: Dictionary,
        hparams:    Hyperparameters,
        device:     B::Device,
    ) -> Result<Self> {
        hparams.validate()?;
        Ok(Self { model, dictionary, hparams, processor: TextProcessor::new()?, device })
    }

    /// Rebuild the model described by a checkpoint and load its weights.
    /// `overrides` may change decoding settings such as `beam_width`;
    /// architecture overrides that disagree with the weights fail to load.
    pub fn from_checkpoint(
        ckpt:      &CheckpointManager,
        overrides: &HparamOverrides,
        device:    B::Device,
    ) -> Result<Self> {
        ckpt.ensure_complete()?;
        let hparams    = ckpt.load_hparams()?.apply(overrides);
        let dictionary = ckpt.load_dictionary()?;

        let model = Seq2SeqConfig::from_hparams(&hparams, dictionary.encoder.len(), dictionary.decoder.len())
            .init::<B>(&device)?;
        let model = ckpt.load_model(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt.dir().display());

        Self::new(model, dictionary, hparams, device)
    }

    pub fn hparams(&self) -> &Hyperparameters {
        &self.hparams
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn predict(&self, text: &str) -> Result<String> {
        let tokens = tokenize(&self.processor.clean(text));
        if tokens.is_empty() {
            tracing::warn!("Nothing left to predict after cleaning {:?}", text);
            return Ok(String::new());
        }

        let ids  = self.dictionary.encoder.encode(&tokens);
        let rows = vec![ids; self.hparams.infer_batch_size];
        let lens: Vec<usize> = rows.iter().map(Vec::len).collect();

        let sources = int_tensor::<B>(&rows, &self.device);
        let mask    = length_mask::<B>(&lens, lens[0], &self.device);

        let best = self.model.beam_search(
            sources,
            mask,
            &lens,
            self.hparams.beam_width,
            GO_ID,
            EOS_ID,
        )?;

        let output = best
            .first()
            .map(|row| self.dictionary.decoder.decode(row).join(" "))
            .unwrap_or_default();
        tracing::debug!("{:?} → {:?}", text, output);
        Ok(output)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::Vocabulary;
    use burn::backend::NdArray;

    type B = NdArray;

    fn predictor(beam_width: usize, infer_batch_size: usize) -> Predictor<B> {
        let device = Default::default();
        let mut h = Hyperparameters::default();
        h.embedding_dim    = 4;
        h.rnn_layer_size   = 4;
        h.n_rnn_layers     = 1;
        h.beam_width       = beam_width;
        h.infer_batch_size = infer_batch_size;

        let dictionary = Dictionary::new(
            Vocabulary::from_tokens(["hello", "world", "!"]),
            Vocabulary::from_tokens(["hi", "there"]),
        );
        let model = Seq2SeqConfig::from_hparams(&h, dictionary.encoder.len(), dictionary.decoder.len())
            .init::<B>(&device)
            .unwrap();
        Predictor::new(model, dictionary, h, device).unwrap()
    }

    #[test]
    fn test_output_uses_decoder_vocabulary() {
        let p = predictor(2, 1);
        let out = p.predict("Hello (aside) World!").unwrap();
        // at most 2 × 3 source tokens
        assert!(out.split(' ').count() <= 6);
        for word in out.split_whitespace() {
            assert!(p.dictionary().decoder.contains(word), "unexpected {word}");
        }
    }

    #[test]
    fn test_replicated_batch_still_answers() {
        let p = predictor(3, 4);
        let out = p.predict("hello world").unwrap();
        assert!(out.split_whitespace().count() <= 4);
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let p = predictor(2, 1);
        assert_eq!(p.predict("  (only a remark)  ").unwrap(), "");
    }

    #[test]
    fn test_incomplete_checkpoint_cannot_serve() {
        let dir = std::env::temp_dir().join(format!("predictor_empty_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let ckpt = CheckpointManager::new(&dir);
        assert!(Predictor::<B>::from_checkpoint(&ckpt, &HparamOverrides::default(), Default::default()).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
