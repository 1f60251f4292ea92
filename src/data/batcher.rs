// ============================================================
// Layer 4 — Batch Scheduler
// ============================================================
// Slices a length-sorted sentence list into fixed-size batches
// and prepares each one for the model:
//
//   clean sentences ──noise──▶ noisy inputs    (no EOS)
//          │
//          └──────append EOS──▶ clean targets
//
//   both groups padded with <PAD> to their OWN batch-local max
//
// Noise is drawn when a batch is built, so asking for the same
// batch again (next epoch) yields fresh mistakes. A trailing
// chunk smaller than batch_size is never emitted.
//
// The second half of the file turns a host-side Batch into
// Burn tensors (indices + float length masks).

use burn::prelude::*;
use rand::Rng;

use crate::data::noise::NoiseGenerator;
use crate::data::vocabulary::Vocabulary;
use crate::domain::sentence::EncodedSentence;

// ─── Batch ────────────────────────────────────────────────────────────────────
/// One rectangular training step worth of data.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Noisy inputs padded to the longest noisy row — [batch, noisy_width]
    pub noisy: Vec<Vec<usize>>,

    /// Clean targets (EOS appended) padded to the longest target row
    pub clean: Vec<Vec<usize>>,

    /// True length of each noisy row before padding
    pub noisy_lengths: Vec<usize>,

    /// True length of each clean row before padding (EOS included)
    pub clean_lengths: Vec<usize>,
}

impl Batch {
    pub fn noisy_width(&self) -> usize {
        self.noisy.first().map_or(0, Vec::len)
    }

    pub fn clean_width(&self) -> usize {
        self.clean.first().map_or(0, Vec::len)
    }
}

// ─── BatchScheduler ───────────────────────────────────────────────────────────
pub struct BatchScheduler<'a> {
    sentences:  &'a [EncodedSentence],
    batch_size: usize,
    noise:      &'a NoiseGenerator,
    threshold:  f64,
    pad:        usize,
    eos:        usize,
}

impl<'a> BatchScheduler<'a> {
    pub fn new(
        sentences:  &'a [EncodedSentence],
        batch_size: usize,
        noise:      &'a NoiseGenerator,
        threshold:  f64,
        vocab:      &Vocabulary,
    ) -> Self {
        Self {
            sentences,
            batch_size,
            noise,
            threshold,
            pad: vocab.pad(),
            eos: vocab.eos(),
        }
    }

    /// Number of full batches per epoch.
    pub fn num_batches(&self) -> usize {
        if self.batch_size == 0 {
            0
        } else {
            self.sentences.len() / self.batch_size
        }
    }

    /// Build batch `index` with freshly drawn noise.
    pub fn batch<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Option<Batch> {
        if index >= self.num_batches() {
            return None;
        }
        let start = index * self.batch_size;
        let chunk = &self.sentences[start..start + self.batch_size];

        let noisy: Vec<Vec<usize>> = chunk
            .iter()
            .map(|s| self.noise.noise(s.ids(), self.threshold, rng))
            .collect();

        let clean: Vec<Vec<usize>> = chunk
            .iter()
            .map(|s| {
                let mut target = Vec::with_capacity(s.len() + 1);
                target.extend_from_slice(s.ids());
                target.push(self.eos);
                target
            })
            .collect();

        let (noisy, noisy_lengths) = pad_rows(noisy, self.pad);
        let (clean, clean_lengths) = pad_rows(clean, self.pad);

        Some(Batch { noisy, clean, noisy_lengths, clean_lengths })
    }

    /// One lazy pass over every full batch. Call again for a new epoch.
    pub fn epoch<'s, R: Rng + ?Sized>(&'s self, rng: &'s mut R) -> EpochBatches<'s, 'a, R> {
        EpochBatches { scheduler: self, rng, next: 0 }
    }
}

/// Iterator returned by [`BatchScheduler::epoch`].
pub struct EpochBatches<'s, 'a, R: ?Sized> {
    scheduler: &'s BatchScheduler<'a>,
    rng:       &'s mut R,
    next:      usize,
}

impl<'s, 'a, R: Rng + ?Sized> Iterator for EpochBatches<'s, 'a, R> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let batch = self.scheduler.batch(self.next, &mut *self.rng)?;
        self.next += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.scheduler.num_batches().saturating_sub(self.next);
        (left, Some(left))
    }
}

/// Pad every row to the longest row of this group.
fn pad_rows(rows: Vec<Vec<usize>>, pad: usize) -> (Vec<Vec<usize>>, Vec<usize>) {
    let lengths: Vec<usize> = rows.iter().map(Vec::len).collect();
    let width = lengths.iter().copied().max().unwrap_or(0);

    let padded = rows
        .into_iter()
        .map(|mut row| {
            row.resize(width, pad);
            row
        })
        .collect();

    (padded, lengths)
}

// ─── Seq2SeqBatch ─────────────────────────────────────────────────────────────
/// A Batch moved onto a Burn device.
///
/// Masks are 1.0 on real positions and 0.0 on padding; the encoder
/// uses `input_mask` to freeze its state past each row's end and
/// the loss uses `target_mask` to ignore padded targets.
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    /// Noisy indices — [batch, noisy_width]
    pub inputs: Tensor<B, 2, Int>,

    /// Noisy validity mask — [batch, noisy_width]
    pub input_mask: Tensor<B, 2>,

    /// Clean indices with EOS — [batch, clean_width]
    pub targets: Tensor<B, 2, Int>,

    /// Clean validity mask — [batch, clean_width]
    pub target_mask: Tensor<B, 2>,
}

impl<B: Backend> Seq2SeqBatch<B> {
    pub fn from_batch(batch: &Batch, device: &B::Device) -> Self {
        Self {
            inputs:      index_tensor(&batch.noisy, device),
            input_mask:  length_mask(&batch.noisy_lengths, batch.noisy_width(), device),
            targets:     index_tensor(&batch.clean, device),
            target_mask: length_mask(&batch.clean_lengths, batch.clean_width(), device),
        }
    }
}

/// Flatten rectangular rows into a [rows, width] Int tensor.
pub fn index_tensor<B: Backend>(rows: &[Vec<usize>], device: &B::Device) -> Tensor<B, 2, Int> {
    let width = rows.first().map_or(0, Vec::len);
    let flat: Vec<i32> = rows
        .iter()
        .flat_map(|row| row.iter().map(|&id| id as i32))
        .collect();

    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), width])
}

/// [rows, width] mask with 1.0 for positions below each row's length.
pub fn length_mask<B: Backend>(lengths: &[usize], width: usize, device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = lengths
        .iter()
        .flat_map(|&len| (0..width).map(move |t| if t < len { 1.0 } else { 0.0 }))
        .collect();

    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([lengths.len(), width])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diacritics::DiacriticClasses;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = NdArray;

    fn fixture() -> (Vocabulary, NoiseGenerator, Vec<EncodedSentence>) {
        let corpus = ["mèo đen ăn cá rồi ngủ trên ghế"];
        let vocab = Vocabulary::build(&corpus).unwrap();
        let noise = NoiseGenerator::new(&DiacriticClasses::vietnamese().unwrap(), &vocab);
        let sentences = ["mèo ăn", "cá đen", "mèo ngủ", "ghế đen ăn", "cá ngủ rồi", "mèo"]
            .iter()
            .map(|s| vocab.encode(s).unwrap())
            .collect();
        (vocab, noise, sentences)
    }

    #[test]
    fn test_batches_are_rectangular_with_local_width() {
        let (vocab, noise, mut sentences) = fixture();
        crate::data::segmenter::sort_by_length(&mut sentences);
        let scheduler = BatchScheduler::new(&sentences, 2, &noise, 0.95, &vocab);
        let mut rng = StdRng::seed_from_u64(2);

        let batches: Vec<Batch> = scheduler.epoch(&mut rng).collect();
        assert_eq!(batches.len(), 3);

        for batch in &batches {
            assert!(batch.noisy.iter().all(|r| r.len() == batch.noisy_width()));
            assert!(batch.clean.iter().all(|r| r.len() == batch.clean_width()));
            assert_eq!(batch.noisy_width(), *batch.noisy_lengths.iter().max().unwrap());
            assert_eq!(batch.clean_width(), *batch.clean_lengths.iter().max().unwrap());
        }
        // Sorted input: the first batch is narrower than the last.
        assert!(batches[0].clean_width() < batches[2].clean_width());
    }

    #[test]
    fn test_padding_scenario_five_and_seven() {
        let vocab = Vocabulary::build(&["abcdefg"]).unwrap();
        let noise = NoiseGenerator::new(&DiacriticClasses::vietnamese().unwrap(), &vocab);
        let sentences = vec![vocab.encode("bcdfg").unwrap(), vocab.encode("bcdfgbc").unwrap()];
        let scheduler = BatchScheduler::new(&sentences, 2, &noise, 1.0, &vocab);
        let mut rng = StdRng::seed_from_u64(2);

        let batch = scheduler.batch(0, &mut rng).unwrap();
        assert_eq!(batch.clean_lengths, vec![6, 8]);
        assert_eq!(batch.clean_width(), 8);
        assert_eq!(batch.clean[0][5], vocab.eos());
        assert_eq!(&batch.clean[0][6..], &[vocab.pad(), vocab.pad()]);
        assert_eq!(batch.clean[1][7], vocab.eos());

        // Inputs carry no EOS and are padded to their own maximum.
        assert_eq!(batch.noisy_lengths, vec![5, 7]);
        assert_eq!(batch.noisy_width(), 7);
        assert!(!batch.noisy.iter().flatten().any(|&id| id == vocab.eos()));
    }

    #[test]
    fn test_trailing_partial_batch_dropped() {
        let (vocab, noise, sentences) = fixture();
        let scheduler = BatchScheduler::new(&sentences, 4, &noise, 0.5, &vocab);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(scheduler.num_batches(), 1);
        assert_eq!(scheduler.epoch(&mut rng).count(), 1);
        assert!(scheduler.batch(1, &mut rng).is_none());
    }

    #[test]
    fn test_zero_threshold_inputs_match_targets() {
        let (vocab, noise, sentences) = fixture();
        let scheduler = BatchScheduler::new(&sentences, 3, &noise, 0.0, &vocab);
        let mut rng = StdRng::seed_from_u64(2);
        for batch in scheduler.epoch(&mut rng) {
            for i in 0..batch.clean.len() {
                let len = batch.noisy_lengths[i];
                assert_eq!(batch.clean_lengths[i], len + 1);
                assert_eq!(&batch.noisy[i][..len], &batch.clean[i][..len]);
            }
        }
    }

    #[test]
    fn test_tensor_batch_shapes_and_masks() {
        let batch = Batch {
            noisy:         vec![vec![1, 2, 0], vec![3, 4, 5]],
            clean:         vec![vec![1, 2, 9, 0], vec![3, 4, 5, 9]],
            noisy_lengths: vec![2, 3],
            clean_lengths: vec![3, 4],
        };
        let device = Default::default();
        let tensors = Seq2SeqBatch::<TestBackend>::from_batch(&batch, &device);

        assert_eq!(tensors.inputs.dims(), [2, 3]);
        assert_eq!(tensors.targets.dims(), [2, 4]);

        let ids: Vec<i64> = tensors.targets.into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![1, 2, 9, 0, 3, 4, 5, 9]);

        let mask: Vec<f32> = tensors.input_mask.into_data().iter::<f32>().collect();
        assert_eq!(mask, vec![1.0, 1.0, 0.0, 1.0, 1.0, 1.0]);
    }
}
