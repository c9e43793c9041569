// ============================================================
// Layer 5 — Seq2Seq Model
// ============================================================
// Encoder + attention decoder sharing one parameter set, with
// two ways to drive the decoder:
//
//   forward_training  teacher forcing on <GO> + targets[:-1],
//                     logits for the masked cross-entropy loss
//   beam_search       encoder outputs tiled `beam_width` times,
//                     decoder stepped until every beam emits
//                     <EOS> or 2 × longest source steps pass
//
// Loss:
//   L = −Σ_{b,t} mask · log softmax(logits)[target] / Σ mask
//
// Reference: Sutskever, Vinyals & Le (2014)
//            Bahdanau et al. (2015), Luong et al. (2015)

use anyhow::{anyhow, ensure, Result};
use burn::{
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::data::batcher::Seq2SeqBatch;
use crate::domain::hparams::Hyperparameters;
use crate::ml::{
    beam_search::BeamSearch,
    decoder::AttentionDecoder,
    encoder::Encoder,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub encoder_vocab_size: usize,
    pub decoder_vocab_size: usize,
    pub embedding_dim:      usize,
    /// Decoder units; each encoder direction gets half
    pub rnn_layer_size:     usize,
    pub n_rnn_layers:       usize,
    /// Drop probability on cell inputs (1 − keep_prob)
    #[config(default = 0.0)]
    pub dropout:            f64,
}

impl Seq2SeqConfig {
    pub fn from_hparams(h: &Hyperparameters, encoder_vocab_size: usize, decoder_vocab_size: usize) -> Self {
        Self::new(
            encoder_vocab_size,
            decoder_vocab_size,
            h.embedding_dim,
            h.rnn_layer_size,
            h.n_rnn_layers,
        )
        .with_dropout(1.0 - h.keep_prob)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.rnn_layer_size > 0 && self.rnn_layer_size % 2 == 0,
            "rnn_layer_size must be a positive even number, got {}", self.rnn_layer_size);
        ensure!(self.n_rnn_layers > 0, "n_rnn_layers must be positive");
        ensure!(self.embedding_dim > 0, "embedding_dim must be positive");
        ensure!(self.encoder_vocab_size > 0 && self.decoder_vocab_size > 0,
            "vocabularies must not be empty");
        ensure!((0.0..1.0).contains(&self.dropout),
            "dropout must lie in [0, 1), got {}", self.dropout);
        Ok(())
    }

    /// Validate, then allocate parameters on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Seq2SeqModel<B>> {
        self.validate()?;
        Ok(Seq2SeqModel {
            encoder: Encoder::new(
                self.encoder_vocab_size,
                self.embedding_dim,
                self.rnn_layer_size,
                self.n_rnn_layers,
                self.dropout,
                device,
            ),
            decoder: AttentionDecoder::new(
                self.decoder_vocab_size,
                self.embedding_dim,
                self.rnn_layer_size,
                self.n_rnn_layers,
                self.dropout,
                device,
            ),
            decoder_vocab_size: self.decoder_vocab_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub encoder:        Encoder<B>,
    pub decoder:        AttentionDecoder<B>,
    decoder_vocab_size: usize,
}

impl<B: Backend> Seq2SeqModel<B> {
    /// Teacher-forced logits: [b, T, decoder_vocab].
    pub fn forward_training(&self, batch: &Seq2SeqBatch<B>) -> Tensor<B, 3> {
        let device  = batch.sources.device();
        let encoded = self.encoder.forward(batch.sources.clone(), batch.source_mask.clone());
        let memory  = self.decoder.attention.prepare(encoded.memory, batch.source_mask.clone());
        let state   = self.decoder.initial_state(encoded.final_states, &device);

        self.decoder.forward_training(
            batch.decoder_inputs.clone(),
            batch.target_mask.clone(),
            state,
            &memory,
        )
    }

    /// (loss [1], logits [b, T, V])
    pub fn forward_loss(&self, batch: &Seq2SeqBatch<B>) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward_training(batch);
        let loss = masked_cross_entropy(logits.clone(), batch.targets.clone(), batch.target_mask.clone());
        (loss, logits)
    }

    /// Beam-search decode a batch of sources. Returns the rank-0
    /// token ids of every row, through the first <EOS>.
    pub fn beam_search(
        &self,
        sources:     Tensor<B, 2, Int>,
        source_mask: Tensor<B, 2>,
        source_lens: &[usize],
        beam_width:  usize,
        go_id:       usize,
        eos_id:      usize,
    ) -> Result<Vec<Vec<usize>>> {
        ensure!(beam_width > 0, "beam_width must be positive");
        let [batch, _] = sources.dims();
        let device = sources.device();
        let rows = batch * beam_width;

        let encoded = self.encoder.forward(sources, source_mask.clone());

        let tile: Vec<i32> = (0..batch)
            .flat_map(|e| std::iter::repeat(e as i32).take(beam_width))
            .collect();
        let tile = Tensor::<B, 1, Int>::from_ints(tile.as_slice(), &device);

        let memory = self
            .decoder
            .attention
            .prepare(encoded.memory, source_mask)
            .select_rows(tile.clone());
        let mut state = self
            .decoder
            .initial_state(encoded.final_states, &device)
            .select_rows(tile);

        let max_steps  = 2 * source_lens.iter().copied().max().unwrap_or(0);
        let mut search = BeamSearch::new(batch, beam_width, eos_id);
        let mut tokens = vec![go_id; rows];

        for _ in 0..max_steps {
            let ids: Vec<i32> = tokens.iter().map(|&t| t as i32).collect();
            let input = self
                .decoder
                .embed_tokens(Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &device));

            let (logits, next_state) = self.decoder.step(input, state, &memory);
            let log_probs: Vec<f32> = log_softmax(logits, 1)
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Cannot read decoder output: {e:?}"))?;

            let step = search.advance(&log_probs, self.decoder_vocab_size);
            let parents: Vec<i32> = step.parents.iter().map(|&p| p as i32).collect();
            state  = next_state.select_rows(Tensor::<B, 1, Int>::from_ints(parents.as_slice(), &device));
            tokens = step.tokens;

            if search.is_done() {
                break;
            }
        }

        Ok(search.best())
    }
}

/// Mean token cross-entropy over the positions where `mask` is 1.
pub fn masked_cross_entropy<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
    mask:    Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [batch, tgt_len, _] = logits.dims();
    let picked = log_softmax(logits, 2)
        .gather(2, targets.unsqueeze_dim::<3>(2))
        .reshape([batch, tgt_len]);
    let total = (picked * mask.clone()).sum().neg();
    total / mask.sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::{length_mask, Seq2SeqBatcher};
    use crate::domain::vocabulary::{EOS_ID, GO_ID};
    use burn::{backend::NdArray, data::dataloader::batcher::Batcher};
    use burn::tensor::ElementConversion;

    type B = NdArray;

    fn tiny() -> Seq2SeqConfig {
        Seq2SeqConfig::new(12, 10, 4, 6, 2)
    }

    #[test]
    fn test_odd_layer_size_rejected_before_allocation() {
        let device = Default::default();
        let err = Seq2SeqConfig::new(12, 10, 4, 5, 2).init::<B>(&device).unwrap_err();
        assert!(err.to_string().contains("even"));
    }

    #[test]
    fn test_training_logits_shape_and_finite_loss() {
        let device = Default::default();
        let model = tiny().init::<B>(&device).unwrap();
        let batch = Seq2SeqBatcher::<B>::new(device)
            .batch(vec![(vec![4, 5, 6], vec![4, 5]), (vec![7], vec![6, 7, 8])]);

        let (loss, logits) = model.forward_loss(&batch);
        assert_eq!(logits.dims(), [2, 4, 10]);
        let loss: f64 = loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_uniform_logits_give_log_vocab_loss() {
        let device = Default::default();
        let logits = Tensor::<B, 3>::zeros([1, 3, 8], &device);
        let targets = Tensor::<B, 1, Int>::from_ints([1, 2, 0].as_slice(), &device).reshape([1, 3]);
        let mask = length_mask::<B>(&[2], 3, &device);
        let loss: f64 = masked_cross_entropy(logits, targets, mask).into_scalar().elem::<f64>();
        assert!((loss - 8f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_beam_search_is_bounded() {
        let device = Default::default();
        let model = tiny().init::<B>(&device).unwrap();
        let sources = Tensor::<B, 1, Int>::from_ints([4, 5, 6, 4, 5, 6].as_slice(), &device).reshape([2, 3]);
        let mask = length_mask::<B>(&[3, 3], 3, &device);

        let out = model.beam_search(sources, mask, &[3, 3], 3, GO_ID, EOS_ID).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].len() <= 6);
        // identical rows decode identically
        assert_eq!(out[0], out[1]);
        // nothing after the first <EOS>
        if let Some(pos) = out[0].iter().position(|&t| t == EOS_ID) {
            assert_eq!(pos, out[0].len() - 1);
        }
    }
}
