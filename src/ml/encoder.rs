// ============================================================
// Layer 5 — Bidirectional Encoder
// ============================================================
// Embedding followed by a stack of bidirectional LSTM layers.
//
//   sources [b, S] ──embed──► [b, S, emb]
//       layer 0:  fwd LSTM (units/2) ─┐
//                 bwd LSTM (units/2) ─┴─ concat ─► [b, S, units]
//       layer l:  same, consuming layer l−1's concatenated output
//
// Dropout (1 − keep_prob) is applied to every cell input, never
// to outputs. Each direction draws its own dropout mask.
//
// Padded steps do not update state and emit zeros, so the
// backward direction effectively starts at each row's own last
// token. The final state of layer l is (fwd ‖ bwd) for both c
// and h, which is exactly the shape the decoder's layer l
// expects as its initial state.
//
// Reference: Schuster & Paliwal (1997) Bidirectional RNNs

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Initializer},
    prelude::*,
};

use crate::ml::lstm::{LstmCell, LstmState};

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    embedding:      Embedding<B>,
    forward_cells:  Vec<LstmCell<B>>,
    backward_cells: Vec<LstmCell<B>>,
    dropout:        Dropout,
}

#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// Top-layer outputs, zero on padding: [b, S, units]
    pub memory:       Tensor<B, 3>,
    /// One (c, h) per layer, each [b, units]
    pub final_states: Vec<LstmState<B>>,
}

impl<B: Backend> Encoder<B> {
    pub fn new(
        vocab_size:    usize,
        embedding_dim: usize,
        units:         usize,
        n_layers:      usize,
        dropout:       f64,
        device:        &B::Device,
    ) -> Self {
        let half = units / 2;
        let embedding = EmbeddingConfig::new(vocab_size, embedding_dim)
            .with_initializer(Initializer::Uniform { min: -0.1, max: 0.1 })
            .init(device);

        let input_size = |layer: usize| if layer == 0 { embedding_dim } else { units };
        let forward_cells  = (0..n_layers).map(|l| LstmCell::new(input_size(l), half, device)).collect();
        let backward_cells = (0..n_layers).map(|l| LstmCell::new(input_size(l), half, device)).collect();

        Self {
            embedding,
            forward_cells,
            backward_cells,
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    /// `source_mask`: [b, S] with 1.0 on real tokens.
    pub fn forward(&self, sources: Tensor<B, 2, Int>, source_mask: Tensor<B, 2>) -> EncoderOutput<B> {
        let [batch, src_len] = sources.dims();
        let device = sources.device();

        let step_masks: Vec<Tensor<B, 2>> = (0..src_len)
            .map(|t| source_mask.clone().slice([0..batch, t..t + 1]))
            .collect();

        let mut layer_input  = self.embedding.forward(sources);
        let mut final_states = Vec::with_capacity(self.forward_cells.len());

        for (fwd, bwd) in self.forward_cells.iter().zip(&self.backward_cells) {
            let half = fwd.hidden_size();

            let fwd_gates = fwd.project_inputs(self.dropout.forward(layer_input.clone()));
            let bwd_gates = bwd.project_inputs(self.dropout.forward(layer_input));

            // forward direction
            let mut state = LstmState::zeros(batch, half, &device);
            let mut fwd_out = Vec::with_capacity(src_len);
            for t in 0..src_len {
                let next = fwd.step_projected(gates_at(&fwd_gates, t), state.clone());
                state = LstmState::keep_where_padded(next, state, step_masks[t].clone());
                fwd_out.push(masked_rows(state.hidden.clone(), step_masks[t].clone()));
            }
            let fwd_final = state;

            // backward direction
            let mut state = LstmState::zeros(batch, half, &device);
            let mut bwd_out = vec![None; src_len];
            for t in (0..src_len).rev() {
                let next = bwd.step_projected(gates_at(&bwd_gates, t), state.clone());
                state = LstmState::keep_where_padded(next, state, step_masks[t].clone());
                bwd_out[t] = Some(masked_rows(state.hidden.clone(), step_masks[t].clone()));
            }
            let bwd_final = state;

            let outputs: Vec<Tensor<B, 2>> = fwd_out
                .into_iter()
                .zip(bwd_out.into_iter().flatten())
                .map(|(f, b)| Tensor::cat(vec![f, b], 1))
                .collect();

            layer_input = Tensor::stack(outputs, 1);
            final_states.push(LstmState::concat(fwd_final, bwd_final));
        }

        EncoderOutput { memory: layer_input, final_states }
    }
}

/// Row `t` of a [b, S, F] tensor as [b, F].
fn gates_at<B: Backend>(x: &Tensor<B, 3>, t: usize) -> Tensor<B, 2> {
    let [batch, _, features] = x.dims();
    x.clone().slice([0..batch, t..t + 1, 0..features]).reshape([batch, features])
}

/// Zero the rows whose mask is 0. `mask`: [b, 1].
fn masked_rows<B: Backend>(x: Tensor<B, 2>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
    let dims = x.dims();
    x * mask.expand(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::length_mask;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_output_shapes() {
        let device = Default::default();
        let enc = Encoder::<B>::new(10, 6, 8, 2, 0.0, &device);
        let sources = Tensor::<B, 1, Int>::from_ints([4, 5, 6, 7, 8, 0].as_slice(), &device).reshape([2, 3]);
        let mask = length_mask::<B>(&[3, 2], 3, &device);

        let out = enc.forward(sources, mask);
        assert_eq!(out.memory.dims(), [2, 3, 8]);
        assert_eq!(out.final_states.len(), 2);
        assert_eq!(out.final_states[1].hidden.dims(), [2, 8]);
    }

    #[test]
    fn test_padding_positions_are_zero() {
        let device = Default::default();
        let enc = Encoder::<B>::new(10, 4, 4, 1, 0.0, &device);
        let sources = Tensor::<B, 1, Int>::from_ints([4, 5, 6, 0].as_slice(), &device).reshape([2, 2]);
        let mask = length_mask::<B>(&[2, 1], 2, &device);

        let out = enc.forward(sources, mask);
        let memory: Vec<f32> = out.memory.into_data().convert::<f32>().to_vec().unwrap();
        // row 1, step 1 is padding: last 4 values
        assert!(memory[12..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_padding_does_not_change_final_state() {
        let device = Default::default();
        let enc = Encoder::<B>::new(10, 4, 4, 1, 0.0, &device);

        let short = Tensor::<B, 1, Int>::from_ints([4, 5].as_slice(), &device).reshape([1, 2]);
        let a = enc.forward(short, length_mask::<B>(&[2], 2, &device));

        let padded = Tensor::<B, 1, Int>::from_ints([4, 5, 0, 0].as_slice(), &device).reshape([1, 4]);
        let b = enc.forward(padded, length_mask::<B>(&[2], 4, &device));

        let ha: Vec<f32> = a.final_states[0].hidden.clone().into_data().convert::<f32>().to_vec().unwrap();
        let hb: Vec<f32> = b.final_states[0].hidden.clone().into_data().convert::<f32>().to_vec().unwrap();
        for (x, y) in ha.iter().zip(&hb) {
            assert!((x - y).abs() < 1e-6);
        }
    }
}
