// ============================================================
// Layer 2 — CorrectUseCase
// ============================================================
// Restores the checkpoint of one hyperparameter signature and
// corrects sentences with it:
//
//   raw text ─▶ Preprocessor::clean ─▶ Inferencer::correct ─▶ text
//
// The model is loaded once in `new` and then only read.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::data::preprocessor::Preprocessor;
use crate::domain::signature::HyperSignature;
use crate::domain::traits::SpellCorrector;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{InferBackend, Inferencer};

pub struct CorrectUseCase<B: Backend = InferBackend> {
    inferencer:   Inferencer<B>,
    preprocessor: Preprocessor,
}

impl CorrectUseCase {
    /// Load the checkpoint for `signature` from `checkpoint_dir` onto the GPU.
    pub fn new(
        checkpoint_dir: &str,
        signature:      &HyperSignature,
        batch_width:    Option<usize>,
    ) -> Result<Self> {
        let device      = burn::backend::wgpu::WgpuDevice::default();
        let checkpoints = CheckpointManager::new(checkpoint_dir);

        let inferencer = Inferencer::from_checkpoint(&checkpoints, signature, batch_width, device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}' from '{checkpoint_dir}'. Have you run 'train' with these settings?",
                    signature
                )
            })?;
        Ok(Self::with_inferencer(inferencer))
    }
}

impl<B: Backend> CorrectUseCase<B> {
    pub fn with_inferencer(inferencer: Inferencer<B>) -> Self {
        Self { inferencer, preprocessor: Preprocessor::new() }
    }
}

impl<B: Backend> SpellCorrector for CorrectUseCase<B> {
    fn correct(&self, text: &str) -> Result<String> {
        let cleaned = self.preprocessor.clean(text);
        Ok(self.inferencer.correct(&cleaned)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocabulary::Vocabulary;
    use crate::domain::error::SpellError;
    use crate::domain::signature::Direction;
    use crate::infra::checkpoint::CheckpointMeta;
    use crate::ml::model::Seq2SeqConfig;
    use burn::backend::NdArray;

    fn signature() -> HyperSignature {
        HyperSignature {
            rnn_size:       8,
            num_layers:     1,
            embedding_size: 4,
            direction:      Direction::Bi,
            keep_prob:      0.75,
            threshold:      0.95,
        }
    }

    fn saved_use_case(dir: &std::path::Path) -> CorrectUseCase<NdArray> {
        let vocab = Vocabulary::build(&["con mèo đen. bà về."]).unwrap();
        let device = Default::default();
        let checkpoints = CheckpointManager::new(dir);

        let model = Seq2SeqConfig::from_signature(&signature(), &vocab).init::<NdArray>(&device);
        checkpoints
            .save(&model, &CheckpointMeta::new(signature(), vocab.to_record(), 1.0, 1, 1))
            .unwrap();

        let inferencer =
            Inferencer::<NdArray>::from_checkpoint(&checkpoints, &signature(), Some(2), device).unwrap();
        CorrectUseCase::with_inferencer(inferencer)
    }

    #[test]
    fn test_markup_is_cleaned_before_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let use_case = saved_use_case(tmp.path());
        // '*' and '(' are not in the vocabulary but are stripped first.
        assert!(use_case.correct("*con (meo)").is_ok());
    }

    #[test]
    fn test_unknown_character_surfaces_to_caller() {
        let tmp = tempfile::tempdir().unwrap();
        let use_case = saved_use_case(tmp.path());

        let err = use_case.correct("con chó").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpellError>(),
            Some(SpellError::UnknownCharacter { character: 'h', .. })
        ));
    }

    #[test]
    fn test_missing_batch_width_falls_back_to_saved_config() {
        let tmp = tempfile::tempdir().unwrap();
        saved_use_case(tmp.path());
        let checkpoints = CheckpointManager::new(tmp.path());

        // No train_config.json was written for this run.
        let result = Inferencer::<NdArray>::from_checkpoint(
            &checkpoints,
            &signature(),
            None,
            Default::default(),
        );
        assert!(matches!(result, Err(SpellError::CheckpointIo { .. })));
    }
}
