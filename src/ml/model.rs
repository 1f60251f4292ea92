// ============================================================
// Layer 5 — Sequence-to-Sequence Corrector Model
// ============================================================
// Character-level encoder–decoder with additive attention.
//
//   noisy ids ─▶ Embedding ─▶ [Bi]LSTM × num_layers ─▶ memory
//                                  │ forward final state of layer l
//                                  ▼
//   <GO> + clean[:-1] ─▶ Embedding ─▶ LSTM × num_layers ─▶ attention
//                        (input-fed with the previous attention vector)
//                                                   │
//                              W_a [hidden; context] ─▶ W_out ─▶ logits
//
// One set of weights, two ways to run it:
//   - forward_training:  teacher forcing over the whole target
//   - forward_inference: greedy decoding from <GO> until <EOS>
// Both go through Decoder::step, so the two modes cannot diverge.
//
// The output layer has one slot more than the vocabulary; that
// spare index is never a target but the decoder may emit it.

use burn::{
    nn::{Embedding, EmbeddingConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::data::batcher::Seq2SeqBatch;
use crate::data::vocabulary::Vocabulary;
use crate::domain::signature::HyperSignature;
use crate::ml::attention::{AdditiveAttention, AdditiveAttentionConfig};
use crate::ml::lstm::{CellState, LstmCell, LstmCellConfig};

#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    /// Output classes: vocabulary size + 1 spare slot
    pub vocab_size:     usize,
    pub embedding_size: usize,
    pub rnn_size:       usize,
    pub num_layers:     usize,
    pub bidirectional:  bool,
    pub go:             usize,
    pub eos:            usize,
    #[config(default = 0.0)]
    pub dropout:        f64,
}

impl Seq2SeqConfig {
    /// Architecture for `signature` over `vocab`.
    pub fn from_signature(signature: &HyperSignature, vocab: &Vocabulary) -> Self {
        Self::new(
            vocab.len() + 1,
            signature.embedding_size,
            signature.rnn_size,
            signature.num_layers,
            signature.direction.is_bidirectional(),
            vocab.go(),
            vocab.eos(),
        )
        .with_dropout(1.0 - signature.keep_prob)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqModel<B> {
        let directions = if self.bidirectional { 2 } else { 1 };
        let d_memory   = self.rnn_size * directions;

        let embedding = |device: &B::Device| {
            EmbeddingConfig::new(self.vocab_size, self.embedding_size)
                .with_initializer(Initializer::Uniform { min: -1.0, max: 1.0 })
                .init(device)
        };
        let cell = |d_input: usize| {
            LstmCellConfig::new(d_input, self.rnn_size)
                .with_dropout(self.dropout)
                .init(device)
        };

        let encoder_input = |layer: usize| {
            if layer == 0 { self.embedding_size } else { d_memory }
        };
        let forward_cells: Vec<LstmCell<B>> =
            (0..self.num_layers).map(|l| cell(encoder_input(l))).collect();
        let backward_cells: Vec<LstmCell<B>> = if self.bidirectional {
            (0..self.num_layers).map(|l| cell(encoder_input(l))).collect()
        } else {
            Vec::new()
        };

        let decoder_cells: Vec<LstmCell<B>> = (0..self.num_layers)
            .map(|l| cell(if l == 0 { self.embedding_size + self.rnn_size } else { self.rnn_size }))
            .collect();

        let encoder = Encoder {
            embedding: embedding(device),
            forward_cells,
            backward_cells,
        };

        let decoder = Decoder {
            embedding: embedding(device),
            cells:     decoder_cells,
            attention: AdditiveAttentionConfig::new(self.rnn_size, d_memory, self.rnn_size)
                .init(device),
            attention_projection: LinearConfig::new(self.rnn_size + d_memory, self.rnn_size)
                .with_bias(false)
                .init(device),
            output: LinearConfig::new(self.rnn_size, self.vocab_size)
                .with_initializer(Initializer::Normal { mean: 0.0, std: 0.1 })
                .init(device),
        };

        Seq2SeqModel {
            encoder,
            decoder,
            go:  self.go,
            eos: self.eos,
        }
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub embedding:      Embedding<B>,
    pub forward_cells:  Vec<LstmCell<B>>,
    /// Empty for a unidirectional encoder
    pub backward_cells: Vec<LstmCell<B>>,
}

pub struct EncoderOutput<B: Backend> {
    /// Top layer outputs, directions concatenated — [batch, steps, d_memory]
    pub memory: Tensor<B, 3>,
    /// [batch, steps]
    pub mask: Tensor<B, 2>,
    /// Forward-direction final state of every layer
    pub final_states: Vec<CellState<B>>,
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, inputs: Tensor<B, 2, Int>, mask: Tensor<B, 2>) -> EncoderOutput<B> {
        let mut x = self.embedding.forward(inputs);
        let mut final_states = Vec::with_capacity(self.forward_cells.len());

        for (layer, cell) in self.forward_cells.iter().enumerate() {
            let (forward_out, forward_state) = cell.scan(x.clone(), mask.clone(), false);

            // The backward final state is dropped: one decoder layer
            // can only be seeded by one state.
            x = match self.backward_cells.get(layer) {
                Some(backward) => {
                    let (backward_out, _) = backward.scan(x, mask.clone(), true);
                    Tensor::cat(vec![forward_out, backward_out], 2)
                }
                None => forward_out,
            };
            final_states.push(forward_state);
        }

        EncoderOutput { memory: x, mask, final_states }
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub embedding:            Embedding<B>,
    pub cells:                Vec<LstmCell<B>>,
    pub attention:            AdditiveAttention<B>,
    pub attention_projection: Linear<B>,
    pub output:               Linear<B>,
}

#[derive(Debug, Clone)]
pub struct DecoderState<B: Backend> {
    pub layers:    Vec<CellState<B>>,
    /// Previous attention vector — [batch, rnn_size]
    pub attention: Tensor<B, 2>,
}

/// Per-batch attention inputs that stay fixed while decoding.
pub struct AttentionMemory<B: Backend> {
    memory:    Tensor<B, 3>,
    keys:      Tensor<B, 3>,
    mask_bias: Tensor<B, 2>,
}

impl<B: Backend> Decoder<B> {
    /// Seed the decoder from the encoder.
    pub fn start(&self, encoded: EncoderOutput<B>) -> (AttentionMemory<B>, DecoderState<B>) {
        let [batch, _, _] = encoded.memory.dims();
        let rnn_size = self.attention_projection.weight.dims()[1];
        let device   = encoded.memory.device();

        let memory = AttentionMemory {
            keys:      self.attention.keys(encoded.memory.clone()),
            mask_bias: AdditiveAttention::<B>::mask_bias(encoded.mask),
            memory:    encoded.memory,
        };
        let state = DecoderState {
            layers:    encoded.final_states,
            attention: Tensor::zeros([batch, rnn_size], &device),
        };
        (memory, state)
    }

    /// Embed one column of ids [batch, 1] → [batch, embedding_size].
    pub fn embed_step(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, _] = ids.dims();
        let embedded = self.embedding.forward(ids);
        let d = embedded.dims()[2];
        embedded.reshape([batch, d])
    }

    /// Advance every layer by one character. Returns logits [batch, vocab].
    pub fn step(
        &self,
        input:  Tensor<B, 2>,
        state:  DecoderState<B>,
        memory: &AttentionMemory<B>,
    ) -> (Tensor<B, 2>, DecoderState<B>) {
        let mut x = Tensor::cat(vec![input, state.attention], 1);
        let mut layers = Vec::with_capacity(self.cells.len());

        for (cell, previous) in self.cells.iter().zip(state.layers) {
            let next = cell.forward(x, previous);
            x = next.hidden.clone();
            layers.push(next);
        }

        let context = self
            .attention
            .forward(x.clone(), memory.keys.clone(), memory.memory.clone(), memory.mask_bias.clone());
        let attention = self.attention_projection.forward(Tensor::cat(vec![x, context], 1));
        let logits    = self.output.forward(attention.clone());

        (logits, DecoderState { layers, attention })
    }
}

// ─── Seq2SeqModel ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
    pub go:      usize,
    pub eos:     usize,
}

/// Result of greedy decoding.
pub struct InferenceOutput<B: Backend> {
    /// Logits of every decoded step — [batch, steps, vocab]
    pub logits: Tensor<B, 3>,
    /// Emitted ids per row, up to and including <EOS> when one was produced
    pub predictions: Vec<Vec<usize>>,
}

impl<B: Backend> Seq2SeqModel<B> {
    /// Targets shifted right behind <GO>: [go, t0, …, t_{n-2}].
    pub fn teacher_forcing_inputs(&self, targets: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        let [batch, steps] = targets.dims();
        let go = Tensor::<B, 2, Int>::full([batch, 1], self.go as i64, &targets.device());
        if steps <= 1 {
            return go;
        }
        Tensor::cat(vec![go, targets.slice([0..batch, 0..steps - 1])], 1)
    }

    /// Teacher-forced logits — [batch, target_width, vocab].
    pub fn forward_training(
        &self,
        inputs:     Tensor<B, 2, Int>,
        input_mask: Tensor<B, 2>,
        targets:    Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let encoded = self.encoder.forward(inputs, input_mask);
        let (memory, mut state) = self.decoder.start(encoded);

        let decoder_inputs = self.teacher_forcing_inputs(targets);
        let [batch, steps] = decoder_inputs.dims();
        let embedded = self.decoder.embedding.forward(decoder_inputs);
        let d = embedded.dims()[2];

        let mut logits = Vec::with_capacity(steps);
        for t in 0..steps {
            let x = embedded.clone().slice([0..batch, t..t + 1, 0..d]).reshape([batch, d]);
            let (step_logits, next) = self.decoder.step(x, state, &memory);
            state = next;
            logits.push(step_logits);
        }

        Tensor::stack(logits, 1)
    }

    /// Masked cross-entropy of a batch.
    pub fn forward_loss(&self, batch: &Seq2SeqBatch<B>) -> Tensor<B, 1> {
        let logits = self.forward_training(
            batch.inputs.clone(),
            batch.input_mask.clone(),
            batch.targets.clone(),
        );
        sequence_loss(logits, batch.targets.clone(), batch.target_mask.clone())
    }

    /// Greedy decoding: feed back the argmax until every row emitted
    /// <EOS> or `max_steps` characters were produced.
    pub fn forward_inference(
        &self,
        inputs:     Tensor<B, 2, Int>,
        input_mask: Tensor<B, 2>,
        max_steps:  usize,
    ) -> InferenceOutput<B> {
        let [batch, _] = inputs.dims();
        let device = inputs.device();

        let encoded = self.encoder.forward(inputs, input_mask);
        let (memory, mut state) = self.decoder.start(encoded);

        let mut next_ids    = Tensor::<B, 2, Int>::full([batch, 1], self.go as i64, &device);
        let mut finished    = vec![false; batch];
        let mut predictions = vec![Vec::new(); batch];
        let mut logits      = Vec::new();

        for _ in 0..max_steps.max(1) {
            let x = self.decoder.embed_step(next_ids);
            let (step_logits, next_state) = self.decoder.step(x, state, &memory);
            state = next_state;

            let ids = step_logits.clone().argmax(1);
            for (row, id) in ids.to_data().iter::<i64>().enumerate() {
                if finished[row] {
                    continue;
                }
                let id = id as usize;
                predictions[row].push(id);
                if id == self.eos {
                    finished[row] = true;
                }
            }

            logits.push(step_logits);
            next_ids = ids;

            if finished.iter().all(|&done| done) {
                break;
            }
        }

        InferenceOutput {
            logits: Tensor::stack(logits, 1),
            predictions,
        }
    }
}

/// Mean negative log-likelihood over the unmasked target positions.
pub fn sequence_loss<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
    mask:    Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [batch, steps, _] = logits.dims();

    let picked = log_softmax(logits, 2)
        .gather(2, targets.reshape([batch, steps, 1]))
        .reshape([batch, steps]);

    (picked.neg() * mask.clone()).sum() / mask.sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::{index_tensor, length_mask, Batch};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::{AdamConfig, GradientsParams, Optimizer};

    type TestBackend = NdArray;

    fn config(bidirectional: bool) -> Seq2SeqConfig {
        // vocab: 6 characters + 3 controls + 1 spare
        Seq2SeqConfig::new(10, 4, 8, 2, bidirectional, 8, 7)
    }

    fn batch() -> Batch {
        Batch {
            noisy:         vec![vec![0, 1, 2, 6], vec![3, 4, 6, 6]],
            clean:         vec![vec![0, 1, 2, 7, 6], vec![3, 5, 7, 6, 6]],
            noisy_lengths: vec![3, 2],
            clean_lengths: vec![4, 3],
        }
    }

    #[test]
    fn test_teacher_forcing_shifts_targets() {
        let device = Default::default();
        let model = config(false).init::<TestBackend>(&device);
        let targets = index_tensor::<TestBackend>(&[vec![0, 1, 7], vec![2, 7, 6]], &device);

        let shifted: Vec<i64> = model
            .teacher_forcing_inputs(targets)
            .into_data()
            .iter::<i64>()
            .collect();
        assert_eq!(shifted, vec![8, 0, 1, 8, 2, 7]);
    }

    #[test]
    fn test_training_logits_shape() {
        let device = Default::default();
        for bidirectional in [false, true] {
            let model = config(bidirectional).init::<TestBackend>(&device);
            let tensors = Seq2SeqBatch::<TestBackend>::from_batch(&batch(), &device);
            let logits = model.forward_training(tensors.inputs, tensors.input_mask, tensors.targets);
            assert_eq!(logits.dims(), [2, 5, 10]);
        }
    }

    #[test]
    fn test_loss_ignores_padded_targets() {
        let device = Default::default();
        let logits: Tensor<TestBackend, 3> = Tensor::random(
            [1, 3, 4],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let mask = length_mask::<TestBackend>(&[2], 3, &device);

        // Changing the target under the mask must not move the loss.
        let a = sequence_loss(logits.clone(), index_tensor(&[vec![1, 2, 0]], &device), mask.clone());
        let b = sequence_loss(logits, index_tensor(&[vec![1, 2, 3]], &device), mask);
        let (a, b): (f64, f64) = (a.into_scalar().elem(), b.into_scalar().elem());
        assert!((a - b).abs() < 1e-6);
        assert!(a > 0.0);
    }

    #[test]
    fn test_inference_stops_within_cap() {
        let device = Default::default();
        let model = config(true).init::<TestBackend>(&device);
        let inputs = index_tensor::<TestBackend>(&[vec![0, 1, 2], vec![0, 1, 2]], &device);
        let mask = length_mask::<TestBackend>(&[3, 3], 3, &device);

        let out = model.forward_inference(inputs, mask, 4);
        let steps = out.logits.dims()[1];
        assert!(steps >= 1 && steps <= 4);
        assert_eq!(out.logits.dims()[2], 10);
        for row in &out.predictions {
            assert!(!row.is_empty() && row.len() <= 4);
            // Nothing follows an <EOS>.
            if let Some(pos) = row.iter().position(|&id| id == 7) {
                assert_eq!(pos, row.len() - 1);
            }
        }
        // Identical rows decode identically.
        assert_eq!(out.predictions[0], out.predictions[1]);
    }

    #[test]
    fn test_optimisation_lowers_loss_on_a_fixed_batch() {
        type TrainBackend = Autodiff<NdArray>;
        let device = Default::default();
        let mut model = config(true).init::<TrainBackend>(&device);
        let mut optim = AdamConfig::new().init();
        let tensors = Seq2SeqBatch::<TrainBackend>::from_batch(&batch(), &device);

        let first: f64 = model.forward_loss(&tensors).into_scalar().elem();
        let mut last = first;
        for _ in 0..40 {
            let loss = model.forward_loss(&tensors);
            last = loss.clone().into_scalar().elem();
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(0.01, model, grads);
        }
        assert!(last < first, "loss went from {first} to {last}");
    }
}
