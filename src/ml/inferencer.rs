// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Restores a checkpoint and runs greedy decoding on single
// sentences.
//
// The sentence is replicated across `batch_width` rows so the
// model sees the batch shape it was trained with; only row 0 of
// the output is read.

use burn::prelude::*;

use crate::data::batcher::{index_tensor, length_mask};
use crate::data::vocabulary::Vocabulary;
use crate::domain::error::SpellError;
use crate::domain::signature::HyperSignature;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{Seq2SeqConfig, Seq2SeqModel};

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend = InferBackend> {
    model:       Seq2SeqModel<B>,
    vocab:       Vocabulary,
    batch_width: usize,
    device:      B::Device,
}

impl<B: Backend> Inferencer<B> {
    /// Load the checkpoint trained under `signature`. Without an explicit
    /// `batch_width` the training batch size of that run is used.
    pub fn from_checkpoint(
        checkpoints: &CheckpointManager,
        signature:   &HyperSignature,
        batch_width: Option<usize>,
        device:      B::Device,
    ) -> Result<Self, SpellError> {
        let meta  = checkpoints.load_meta(signature)?;
        let vocab = Vocabulary::from_record(&meta.vocabulary)?;

        let model = Seq2SeqConfig::from_signature(signature, &vocab).init(&device);
        let model = checkpoints.load_model(model, signature, &device)?;
        tracing::info!(
            "Model loaded from '{}' (epoch {}, test loss {:.4})",
            checkpoints.run_dir(signature).display(),
            meta.epoch,
            meta.test_loss,
        );

        let batch_width = match batch_width {
            Some(width) => width,
            None => checkpoints.load_config(signature)?.batch_size,
        };
        Ok(Self::new(model, vocab, batch_width, device))
    }

    pub fn new(model: Seq2SeqModel<B>, vocab: Vocabulary, batch_width: usize, device: B::Device) -> Self {
        Self { model, vocab, batch_width: batch_width.max(1), device }
    }

    /// Correct one already-cleaned sentence.
    pub fn correct(&self, text: &str) -> Result<String, SpellError> {
        let encoded = self.vocab.encode(text)?;
        if encoded.is_empty() {
            return Ok(String::new());
        }
        let length = encoded.len();

        let rows    = vec![encoded.ids().to_vec(); self.batch_width];
        let lengths = vec![length; self.batch_width];
        let inputs  = index_tensor::<B>(&rows, &self.device);
        let mask    = length_mask::<B>(&lengths, length, &self.device);

        let output = self.model.forward_inference(inputs, mask, length + 1);
        let steps  = output.logits.dims()[1];
        let ids    = output.predictions.into_iter().next().unwrap_or_default();

        let corrected = self.vocab.decode(strip_trailing_controls(&ids, &self.vocab));
        tracing::debug!("'{}' → '{}' ({} steps)", text, corrected, steps);
        Ok(corrected)
    }
}

/// Drop any run of <PAD>/<EOS> at the end of a prediction.
fn strip_trailing_controls<'a>(ids: &'a [usize], vocab: &Vocabulary) -> &'a [usize] {
    let end = ids
        .iter()
        .rposition(|&id| id != vocab.pad() && id != vocab.eos())
        .map_or(0, |last| last + 1);
    &ids[..end]
}
