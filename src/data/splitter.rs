// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles sentences with a seeded RNG and splits them into:
//   - Training set: drives the optimiser
//   - Testing set:  measured at every evaluation; its total loss
//                   decides checkpointing and early stopping
//
// The seed makes the partition reproducible run to run, which
// keeps test losses of different sweep runs comparable.
//
// Split size: ceil(n × test_fraction) sentences go to testing.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

pub const DEFAULT_TEST_FRACTION: f64 = 0.15;

/// Shuffle `samples` with `seed` and split into (training, testing).
pub fn split_train_test<T>(
    mut samples:   Vec<T>,
    test_fraction: f64,
    seed:          u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total      = samples.len();
    let test_count = ((total as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let split_at   = total - test_count.min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..total)
    let testing = samples.split_off(split_at);

    tracing::info!("Number of training sentences: {}", samples.len());
    tracing::info!("Number of testing sentences: {}", testing.len());

    (samples, testing)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test) = split_train_test(items, 0.15, 2);
        assert_eq!(train.len(), 85);
        assert_eq!(test.len(), 15);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let items: Vec<usize> = (0..57).collect();
        let (train, test) = split_train_test(items, 0.15, 2);
        let train: HashSet<usize> = train.into_iter().collect();
        let test: HashSet<usize> = test.into_iter().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 57);
        assert_eq!(test.len(), 9); // ceil(57 × 0.15) = ceil(8.55)
    }

    #[test]
    fn test_same_seed_same_partition() {
        let (a, _) = split_train_test((0..40).collect::<Vec<usize>>(), 0.25, 7);
        let (b, _) = split_train_test((0..40).collect::<Vec<usize>>(), 0.25, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, test) = split_train_test(Vec::<usize>::new(), 0.15, 2);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_zero_fraction_keeps_everything_for_training() {
        let (train, test) = split_train_test((0..10).collect::<Vec<usize>>(), 0.0, 2);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }
}
