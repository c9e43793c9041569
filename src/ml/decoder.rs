// ============================================================
// Layer 5 — Attention Decoder
// ============================================================
// Stacked LSTM wrapped with Luong attention and input feeding.
//
// One decoder step:
//   x      = embed(token) ‖ a_{t−1}           input feeding
//   h_top  = LSTM stack(x)                     dropout on cell inputs
//   ctx    = attention(h_top, encoder memory)
//   a_t    = W_a · (h_top ‖ ctx)               attention layer, no bias
//   logits = W_o · a_t                         projection, no bias
//
// The initial cell states are the encoder's final states; the
// initial attention vector is zero.
//
// The same parameters serve two drivers: `forward_training`
// (teacher forcing, this file) and beam search (model.rs).
//
// Reference: Luong, Pham & Manning (2015) §3.3 Input-feeding

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Initializer, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::{
    attention::{AttentionMemory, LuongAttention},
    lstm::{blend, LstmCell, LstmState},
};

#[derive(Module, Debug)]
pub struct AttentionDecoder<B: Backend> {
    pub(crate) embedding: Embedding<B>,
    cells:                Vec<LstmCell<B>>,
    pub(crate) attention: LuongAttention<B>,
    attention_layer:      Linear<B>,
    projection:           Linear<B>,
    dropout:              Dropout,
    units:                usize,
    embedding_dim:        usize,
}

#[derive(Debug, Clone)]
pub struct DecoderState<B: Backend> {
    pub layers:    Vec<LstmState<B>>,
    /// Previous attention vector a_{t−1}: [b, units]
    pub attention: Tensor<B, 2>,
}

impl<B: Backend> DecoderState<B> {
    pub fn select_rows(self, rows: Tensor<B, 1, Int>) -> Self {
        Self {
            layers: self
                .layers
                .into_iter()
                .map(|s| s.select_rows(rows.clone()))
                .collect(),
            attention: self.attention.select(0, rows),
        }
    }

    /// Keep `prev` on rows whose mask is 0 (finished sequences).
    pub fn keep_where_padded(next: Self, prev: Self, mask: Tensor<B, 2>) -> Self {
        Self {
            layers: next
                .layers
                .into_iter()
                .zip(prev.layers)
                .map(|(n, p)| LstmState::keep_where_padded(n, p, mask.clone()))
                .collect(),
            attention: blend(next.attention, prev.attention, mask),
        }
    }
}

impl<B: Backend> AttentionDecoder<B> {
    pub fn new(
        vocab_size:    usize,
        embedding_dim: usize,
        units:         usize,
        n_layers:      usize,
        dropout:       f64,
        device:        &B::Device,
    ) -> Self {
        let embedding = EmbeddingConfig::new(vocab_size, embedding_dim)
            .with_initializer(Initializer::Uniform { min: -0.1, max: 0.1 })
            .init(device);
        let cells = (0..n_layers)
            .map(|l| {
                let input_size = if l == 0 { embedding_dim + units } else { units };
                LstmCell::new(input_size, units, device)
            })
            .collect();

        Self {
            embedding,
            cells,
            attention:       LuongAttention::new(units, device),
            attention_layer: LinearConfig::new(2 * units, units).with_bias(false).init(device),
            projection:      LinearConfig::new(units, vocab_size)
                .with_bias(false)
                .with_initializer(Initializer::Normal { mean: 0.0, std: 0.1 })
                .init(device),
            dropout: DropoutConfig::new(dropout).init(),
            units,
            embedding_dim,
        }
    }

    pub fn initial_state(&self, encoder_states: Vec<LstmState<B>>, device: &B::Device) -> DecoderState<B> {
        let batch = encoder_states.first().map_or(0, |s| s.hidden.dims()[0]);
        DecoderState {
            layers:    encoder_states,
            attention: Tensor::zeros([batch, self.units], device),
        }
    }

    /// Embed a [b] vector of token ids as [b, emb].
    pub fn embed_tokens(&self, tokens: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        let [batch] = tokens.dims();
        self.embedding
            .forward(tokens.reshape([batch, 1]))
            .reshape([batch, self.embedding_dim])
    }

    /// One step. `input`: embedded tokens [b, emb]. Returns logits [b, vocab].
    pub fn step(
        &self,
        input:  Tensor<B, 2>,
        state:  DecoderState<B>,
        memory: &AttentionMemory<B>,
    ) -> (Tensor<B, 2>, DecoderState<B>) {
        let mut x = Tensor::cat(vec![input, state.attention], 1);
        let mut layers = Vec::with_capacity(self.cells.len());

        for (cell, prev) in self.cells.iter().zip(state.layers) {
            let next = cell.step(self.dropout.forward(x), prev);
            x = next.hidden.clone();
            layers.push(next);
        }

        let (context, _) = self.attention.forward(x.clone(), memory);
        let attention = self.attention_layer.forward(Tensor::cat(vec![x, context], 1));
        let logits = self.projection.forward(attention.clone());

        (logits, DecoderState { layers, attention })
    }

    /// Teacher-forced unroll over `decoder_inputs` [b, T].
    ///
    /// Rows past their target length keep their state and emit
    /// zero logits. Returns [b, T, vocab].
    pub fn forward_training(
        &self,
        decoder_inputs: Tensor<B, 2, Int>,
        target_mask:    Tensor<B, 2>,
        state:          DecoderState<B>,
        memory:         &AttentionMemory<B>,
    ) -> Tensor<B, 3> {
        let [batch, tgt_len] = decoder_inputs.dims();
        let embedded = self.embedding.forward(decoder_inputs);

        let mut state  = state;
        let mut logits = Vec::with_capacity(tgt_len);

        for t in 0..tgt_len {
            let x = embedded
                .clone()
                .slice([0..batch, t..t + 1, 0..self.embedding_dim])
                .reshape([batch, self.embedding_dim]);
            let mask = target_mask.clone().slice([0..batch, t..t + 1]);

            let (step_logits, next) = self.step(x, state.clone(), memory);
            state = DecoderState::keep_where_padded(next, state, mask.clone());

            let dims = step_logits.dims();
            logits.push(step_logits * mask.expand(dims));
        }

        Tensor::stack(logits, 1)
    }
}
