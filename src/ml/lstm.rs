// ============================================================
// Layer 5 — LSTM Cell
// ============================================================
// A single LSTM step exposed as its own module so the encoder
// can scan a whole sequence while the decoder advances one
// character at a time through the very same weights.
//
//   gates = W_x · dropout(x) + W_h · h          (4 × hidden wide)
//   i, f, g, o = σ(·), σ(· + 1), tanh(·), σ(·)
//   c' = f ⊙ c + i ⊙ g
//   h' = o ⊙ tanh(c')
//
// Length masking: `scan` keeps a row's state frozen (and its
// output zeroed) once the row's true length has been passed, so
// padding never leaks into a final state. Scanning backwards
// over a masked row therefore starts at its last real character.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

/// Added to the forget gate so fresh cells start out remembering.
const FORGET_BIAS: f64 = 1.0;

#[derive(Config, Debug)]
pub struct LstmCellConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
    /// Probability of zeroing an input feature (1 − keep_prob)
    #[config(default = 0.0)]
    pub dropout:  f64,
}

impl LstmCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmCell<B> {
        LstmCell {
            input_gates:  LinearConfig::new(self.d_input, 4 * self.d_hidden).init(device),
            hidden_gates: LinearConfig::new(self.d_hidden, 4 * self.d_hidden)
                .with_bias(false)
                .init(device),
            dropout:      DropoutConfig::new(self.dropout).init(),
            d_hidden:     self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    pub dropout:      Dropout,
    pub d_hidden:     usize,
}

/// (cell, hidden) pair, each [batch, d_hidden].
#[derive(Debug, Clone)]
pub struct CellState<B: Backend> {
    pub cell:   Tensor<B, 2>,
    pub hidden: Tensor<B, 2>,
}

impl<B: Backend> CellState<B> {
    pub fn zeros(batch: usize, d_hidden: usize, device: &B::Device) -> Self {
        Self {
            cell:   Tensor::zeros([batch, d_hidden], device),
            hidden: Tensor::zeros([batch, d_hidden], device),
        }
    }

    /// Rows where `mask` ([batch, 1]) is 1 take `self`, the rest keep `previous`.
    pub fn blend(self, previous: Self, mask: Tensor<B, 2>) -> Self {
        let [batch, d_hidden] = self.hidden.dims();
        let keep  = mask.expand([batch, d_hidden]);
        let carry = keep.clone().neg().add_scalar(1.0);

        Self {
            cell:   self.cell * keep.clone() + previous.cell * carry.clone(),
            hidden: self.hidden * keep + previous.hidden * carry,
        }
    }
}

impl<B: Backend> LstmCell<B> {
    /// One step: input [batch, d_input] → next state.
    pub fn forward(&self, input: Tensor<B, 2>, state: CellState<B>) -> CellState<B> {
        let h = self.d_hidden;
        let gates = self.input_gates.forward(self.dropout.forward(input))
            + self.hidden_gates.forward(state.hidden);

        let input_gate  = sigmoid(gates.clone().narrow(1, 0, h));
        let forget_gate = sigmoid(gates.clone().narrow(1, h, h).add_scalar(FORGET_BIAS));
        let candidate   = tanh(gates.clone().narrow(1, 2 * h, h));
        let output_gate = sigmoid(gates.narrow(1, 3 * h, h));

        let cell   = forget_gate * state.cell + input_gate * candidate;
        let hidden = output_gate * tanh(cell.clone());
        CellState { cell, hidden }
    }

    /// Run over a whole sequence [batch, steps, d_input] from a zero state.
    ///
    /// Returns the per-position outputs [batch, steps, d_hidden] (zero
    /// past each row's length) and the state at each row's boundary.
    pub fn scan(
        &self,
        inputs:  Tensor<B, 3>,
        mask:    Tensor<B, 2>,
        reverse: bool,
    ) -> (Tensor<B, 3>, CellState<B>) {
        let [batch, steps, d_input] = inputs.dims();
        let device = inputs.device();

        let mut state   = CellState::zeros(batch, self.d_hidden, &device);
        let mut outputs = Vec::with_capacity(steps);

        let order: Vec<usize> = if reverse {
            (0..steps).rev().collect()
        } else {
            (0..steps).collect()
        };

        for t in order {
            let x = inputs.clone().slice([0..batch, t..t + 1, 0..d_input]).reshape([batch, d_input]);
            let m = mask.clone().slice([0..batch, t..t + 1]);

            state = self.forward(x, state.clone()).blend(state, m.clone());
            outputs.push(state.hidden.clone() * m.expand([batch, self.d_hidden]));
        }

        if reverse {
            outputs.reverse();
        }
        (Tensor::stack(outputs, 1), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_step_shapes() {
        let device = Default::default();
        let cell = LstmCellConfig::new(3, 5).init::<TestBackend>(&device);
        let state = cell.forward(Tensor::ones([2, 3], &device), CellState::zeros(2, 5, &device));
        assert_eq!(state.hidden.dims(), [2, 5]);
        assert_eq!(state.cell.dims(), [2, 5]);
    }

    #[test]
    fn test_padding_does_not_change_final_state() {
        let device = Default::default();
        let cell = LstmCellConfig::new(2, 4).init::<TestBackend>(&device);

        let row: Tensor<TestBackend, 3> = Tensor::random(
            [1, 3, 2],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let padded = Tensor::cat(vec![row.clone(), Tensor::ones([1, 2, 2], &device)], 1);

        for reverse in [false, true] {
            let (_, alone) = cell.scan(row.clone(), Tensor::ones([1, 3], &device), reverse);
            let mask = Tensor::<TestBackend, 1>::from_floats([1.0, 1.0, 1.0, 0.0, 0.0], &device)
                .reshape([1, 5]);
            let (outputs, masked) = cell.scan(padded.clone(), mask, reverse);

            for (a, b) in values(alone.hidden).iter().zip(values(masked.hidden)) {
                assert!((a - b).abs() < 1e-5, "reverse={reverse}: {a} vs {b}");
            }
            let tail: Vec<f32> = outputs
                .slice([0..1, 3..5, 0..4])
                .into_data()
                .iter::<f32>()
                .collect();
            assert!(tail.iter().all(|v| *v == 0.0));
        }
    }
}
