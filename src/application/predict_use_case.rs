// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Serves a trained checkpoint, one line at a time. The CLI
// decides where the lines come from (a flag or stdin).
//
// Reference: Rust Book §10 (Generics and Traits)

use anyhow::Result;
use std::path::PathBuf;

use crate::application::model_instance::ModelInstance;
use crate::domain::{hparams::HparamOverrides, traits::SequencePredictor};
use crate::ml::trainer::{training_device, TrainingBackend};

#[derive(Debug, Clone)]
pub struct PredictConfig {
    /// Checkpoint directory of a trained model
    pub model:     PathBuf,
    pub overrides: HparamOverrides,
}

pub struct PredictUseCase<P: SequencePredictor> {
    predictor: P,
}

impl PredictUseCase<ModelInstance<TrainingBackend>> {
    /// Load the checkpoint named by `config`.
    pub fn from_config(config: &PredictConfig) -> Result<Self> {
        let mut instance = ModelInstance::<TrainingBackend>::new(
            config.model.parent().map(PathBuf::from).unwrap_or_default(),
            config.overrides.clone(),
            training_device(),
        )?;
        instance.load(&config.model)?;
        Ok(Self::new(instance))
    }
}

impl<P: SequencePredictor> PredictUseCase<P> {
    pub fn new(predictor: P) -> Self {
        Self { predictor }
    }

    pub fn answer(&mut self, input: &str) -> Result<String> {
        self.predictor.predict(input)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes its input reversed word by word.
    struct Reverser;

    impl SequencePredictor for Reverser {
        fn predict(&mut self, text: &str) -> Result<String> {
            Ok(text.split_whitespace().rev().collect::<Vec<_>>().join(" "))
        }
    }

    #[test]
    fn test_answer_delegates_to_predictor() {
        let mut uc = PredictUseCase::new(Reverser);
        assert_eq!(uc.answer("how are you").unwrap(), "you are how");
    }
}
