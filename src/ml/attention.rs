// ============================================================
// Layer 5 — Luong Attention
// ============================================================
// Multiplicative ("dot") attention over the encoder outputs.
//
//   keys    = W_m · memory                  [b, S, units]
//   score_s = keys_s · query                [b, S]
//   score   = −1e9 where the source is padding
//   α       = softmax(score)                [b, S]
//   context = Σ_s α_s · memory_s            [b, units]
//
// The keys depend only on the encoder output, so they are
// computed once per batch (AttentionMemory) and reused at every
// decoder step.
//
// Reference: Luong, Pham & Manning (2015)

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

const MASKED_SCORE: f32 = -1e9;

#[derive(Module, Debug)]
pub struct LuongAttention<B: Backend> {
    memory_layer: Linear<B>,
}

/// Encoder output prepared for attention.
#[derive(Debug, Clone)]
pub struct AttentionMemory<B: Backend> {
    /// [b, S, units]
    pub keys:   Tensor<B, 3>,
    /// [b, S, units]
    pub values: Tensor<B, 3>,
    /// [b, S], 1.0 on real tokens
    pub mask:   Tensor<B, 2>,
}

impl<B: Backend> AttentionMemory<B> {
    /// Reorder / repeat batch rows (beam tiling).
    pub fn select_rows(self, rows: Tensor<B, 1, Int>) -> Self {
        Self {
            keys:   self.keys.select(0, rows.clone()),
            values: self.values.select(0, rows.clone()),
            mask:   self.mask.select(0, rows),
        }
    }
}

impl<B: Backend> LuongAttention<B> {
    pub fn new(units: usize, device: &B::Device) -> Self {
        Self {
            memory_layer: LinearConfig::new(units, units).with_bias(false).init(device),
        }
    }

    pub fn prepare(&self, memory: Tensor<B, 3>, mask: Tensor<B, 2>) -> AttentionMemory<B> {
        AttentionMemory {
            keys:   self.memory_layer.forward(memory.clone()),
            values: memory,
            mask,
        }
    }

    /// Returns (context [b, units], alignments [b, S]).
    pub fn forward(&self, query: Tensor<B, 2>, memory: &AttentionMemory<B>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, src_len, units] = memory.values.dims();

        let scores = memory
            .keys
            .clone()
            .matmul(query.unsqueeze_dim::<3>(2))
            .reshape([batch, src_len]);
        let scores = scores.mask_fill(memory.mask.clone().equal_elem(0.0), MASKED_SCORE);
        let alignments = softmax(scores, 1);

        let context = alignments
            .clone()
            .unsqueeze_dim::<3>(1)
            .matmul(memory.values.clone())
            .reshape([batch, units]);

        (context, alignments)
    }
}
