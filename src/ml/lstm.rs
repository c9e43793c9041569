// ============================================================
// Layer 5 — LSTM Cell
// ============================================================
// One LSTM layer stepped manually over time.
//
//   gates = W_x · x + W_h · h + b          [batch, 4·hidden]
//   i, f, g, o = split(gates)
//   c' = σ(f + 1) ⊙ c + σ(i) ⊙ tanh(g)
//   h' = σ(o) ⊙ tanh(c')
//
// The +1 forget bias is added at every step rather than stored.
//
// Padding is handled with a step mask [batch, 1]: rows whose
// mask is 0 keep their previous (c, h), so the state at the end
// of the loop is the state after each row's own last token.
//
// Reference: Hochreiter & Schmidhuber (1997)
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

const FORGET_BIAS: f64 = 1.0;

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    /// x → 4·hidden, carries the gate bias
    input_gates:  Linear<B>,
    /// h → 4·hidden
    hidden_gates: Linear<B>,
    hidden_size:  usize,
}

/// (c, h), each [batch, hidden]
#[derive(Debug, Clone)]
pub struct LstmState<B: Backend> {
    pub cell:   Tensor<B, 2>,
    pub hidden: Tensor<B, 2>,
}

impl<B: Backend> LstmState<B> {
    pub fn zeros(batch: usize, hidden: usize, device: &B::Device) -> Self {
        Self {
            cell:   Tensor::zeros([batch, hidden], device),
            hidden: Tensor::zeros([batch, hidden], device),
        }
    }

    /// Take `next` where `mask` is 1 and `prev` where it is 0. `mask`: [batch, 1].
    pub fn keep_where_padded(next: Self, prev: Self, mask: Tensor<B, 2>) -> Self {
        Self {
            cell:   blend(next.cell, prev.cell, mask.clone()),
            hidden: blend(next.hidden, prev.hidden, mask),
        }
    }

    /// Reorder / repeat rows: row i of the result is row `rows[i]` of self.
    pub fn select_rows(self, rows: Tensor<B, 1, Int>) -> Self {
        Self {
            cell:   self.cell.select(0, rows.clone()),
            hidden: self.hidden.select(0, rows),
        }
    }

    /// Concatenate two states feature-wise (forward ‖ backward).
    pub fn concat(a: Self, b: Self) -> Self {
        Self {
            cell:   Tensor::cat(vec![a.cell, b.cell], 1),
            hidden: Tensor::cat(vec![a.hidden, b.hidden], 1),
        }
    }
}

/// `new · mask + old · (1 − mask)` with `mask` [batch, 1] broadcast over features.
pub fn blend<B: Backend>(new: Tensor<B, 2>, old: Tensor<B, 2>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, width] = new.dims();
    let mask = mask.expand([batch, width]);
    let keep = mask.clone().neg().add_scalar(1.0);
    new * mask + old * keep
}

impl<B: Backend> LstmCell<B> {
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            input_gates:  LinearConfig::new(input_size, 4 * hidden_size).init(device),
            hidden_gates: LinearConfig::new(hidden_size, 4 * hidden_size)
                .with_bias(false)
                .init(device),
            hidden_size,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Input contribution for a whole sequence at once: [b, S, in] → [b, S, 4·hidden].
    pub fn project_inputs(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.input_gates.forward(x)
    }

    /// One step from a single input row batch.
    pub fn step(&self, x: Tensor<B, 2>, state: LstmState<B>) -> LstmState<B> {
        self.step_projected(self.input_gates.forward(x), state)
    }

    /// One step from an input already passed through `project_inputs`.
    pub fn step_projected(&self, x_gates: Tensor<B, 2>, state: LstmState<B>) -> LstmState<B> {
        let [batch, _] = x_gates.dims();
        let h = self.hidden_size;
        let gates = x_gates + self.hidden_gates.forward(state.hidden);

        let i = sigmoid(gates.clone().slice([0..batch, 0..h]));
        let f = sigmoid(gates.clone().slice([0..batch, h..2 * h]).add_scalar(FORGET_BIAS));
        let g = tanh(gates.clone().slice([0..batch, 2 * h..3 * h]));
        let o = sigmoid(gates.slice([0..batch, 3 * h..4 * h]));

        let cell   = f * state.cell + i * g;
        let hidden = o * tanh(cell.clone());
        LstmState { cell, hidden }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_step_shapes() {
        let device = Default::default();
        let cell = LstmCell::<B>::new(5, 3, &device);
        let state = LstmState::zeros(2, 3, &device);
        let next = cell.step(Tensor::ones([2, 5], &device), state);
        assert_eq!(next.cell.dims(), [2, 3]);
        assert_eq!(next.hidden.dims(), [2, 3]);
    }

    #[test]
    fn test_masked_rows_keep_state() {
        let device = Default::default();
        let cell = LstmCell::<B>::new(4, 2, &device);
        let prev = LstmState::<B>::zeros(2, 2, &device);
        let next = cell.step(Tensor::ones([2, 4], &device), prev.clone());
        let mask = Tensor::<B, 1>::from_floats([1.0, 0.0].as_slice(), &device).reshape([2, 1]);

        let kept = LstmState::keep_where_padded(next.clone(), prev, mask);
        let rows: Vec<f32> = kept.hidden.into_data().convert::<f32>().to_vec().unwrap();
        let fresh: Vec<f32> = next.hidden.into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(&rows[..2], &fresh[..2]);
        assert_eq!(&rows[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_select_rows_repeats() {
        let device = Default::default();
        let state = LstmState::<B> {
            cell:   Tensor::from_floats([[1.0], [2.0]], &device),
            hidden: Tensor::from_floats([[3.0], [4.0]], &device),
        };
        let idx = Tensor::<B, 1, Int>::from_ints([1, 1, 0].as_slice(), &device);
        let out = state.select_rows(idx);
        let cell: Vec<f32> = out.cell.into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(cell, vec![2.0, 2.0, 1.0]);
    }
}
