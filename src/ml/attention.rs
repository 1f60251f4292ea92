// ============================================================
// Layer 5 — Additive (Bahdanau) Attention
// ============================================================
// Scores the decoder's current state against every encoder
// position and returns the weighted sum of encoder outputs.
//
//   energy_j = vᵀ · tanh(W_k · memory_j + W_q · query)
//   weights  = softmax(energy + mask_bias)
//   context  = Σ_j weights_j · memory_j
//
// Keys (W_k · memory) do not depend on the decode step, so they
// are computed once per batch with `keys` and reused.
// Padded encoder positions receive a large negative bias and end
// up with (numerically) zero weight.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};

const MASKED_ENERGY: f64 = 1e9;

#[derive(Config, Debug)]
pub struct AdditiveAttentionConfig {
    pub d_query:  usize,
    pub d_memory: usize,
    pub d_units:  usize,
}

impl AdditiveAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AdditiveAttention<B> {
        AdditiveAttention {
            query:  LinearConfig::new(self.d_query, self.d_units).with_bias(false).init(device),
            memory: LinearConfig::new(self.d_memory, self.d_units).with_bias(false).init(device),
            energy: LinearConfig::new(self.d_units, 1).with_bias(false).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct AdditiveAttention<B: Backend> {
    pub query:  Linear<B>,
    pub memory: Linear<B>,
    pub energy: Linear<B>,
}

impl<B: Backend> AdditiveAttention<B> {
    /// Project encoder outputs [batch, steps, d_memory] → [batch, steps, d_units].
    pub fn keys(&self, memory: Tensor<B, 3>) -> Tensor<B, 3> {
        self.memory.forward(memory)
    }

    /// Turn a 1/0 validity mask into an additive energy bias.
    pub fn mask_bias(mask: Tensor<B, 2>) -> Tensor<B, 2> {
        mask.sub_scalar(1.0).mul_scalar(MASKED_ENERGY)
    }

    /// Alignment of `query` [batch, d_query] over every encoder
    /// position: [batch, steps], rows sum to 1.
    pub fn weights(&self, query: Tensor<B, 2>, keys: Tensor<B, 3>, mask_bias: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, steps, units] = keys.dims();

        let query  = self.query.forward(query).reshape([batch, 1, units]).expand([batch, steps, units]);
        let energy = self.energy.forward(tanh(keys + query)).reshape([batch, steps]) + mask_bias;

        softmax(energy, 1)
    }

    /// Context vector [batch, d_memory] for `query`.
    pub fn forward(
        &self,
        query:     Tensor<B, 2>,
        keys:      Tensor<B, 3>,
        memory:    Tensor<B, 3>,
        mask_bias: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [batch, steps, d_memory] = memory.dims();

        self.weights(query, keys, mask_bias)
            .reshape([batch, 1, steps])
            .matmul(memory)
            .reshape([batch, d_memory])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_masked_positions_get_no_weight() {
        let device = Default::default();
        let attention = AdditiveAttentionConfig::new(4, 6, 5).init::<TestBackend>(&device);

        let memory: Tensor<TestBackend, 3> = Tensor::random(
            [2, 3, 6],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let mask = Tensor::<TestBackend, 1>::from_floats([1.0, 1.0, 0.0, 1.0, 0.0, 0.0], &device)
            .reshape([2, 3]);

        let query = Tensor::<TestBackend, 2>::ones([2, 4], &device);
        let keys  = attention.keys(memory.clone());
        let bias  = AdditiveAttention::mask_bias(mask);

        let context = attention.forward(query.clone(), keys.clone(), memory, bias.clone());
        assert_eq!(context.dims(), [2, 6]);

        let w: Vec<f32> = attention.weights(query, keys, bias).into_data().iter::<f32>().collect();
        assert!((w[0] + w[1] - 1.0).abs() < 1e-5);
        assert!(w[2] < 1e-6);
        assert!((w[3] - 1.0).abs() < 1e-5);
        assert!(w[4] < 1e-6 && w[5] < 1e-6);
    }
}
