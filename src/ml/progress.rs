// ============================================================
// Layer 5 — Training Progress
// ============================================================
// Running-minimum bookkeeping for early stopping.
//
// Only two numbers matter for the stop decision: the lowest test
// loss seen so far and how many evaluations have passed since it
// was set. The full loss history is never kept.

#[derive(Debug, Clone)]
pub struct TrainingProgress {
    /// Optimiser steps taken so far
    pub iteration: usize,
    pub best_loss: Option<f64>,
    /// Evaluations since the last new minimum
    pub stalls:    usize,
    pub patience:  usize,
}

impl TrainingProgress {
    pub fn new(patience: usize) -> Self {
        Self { iteration: 0, best_loss: None, stalls: 0, patience }
    }

    /// A strictly lower loss than every earlier evaluation.
    /// The first evaluation always qualifies; NaN never does.
    pub fn is_improvement(&self, loss: f64) -> bool {
        if loss.is_nan() {
            return false;
        }
        match self.best_loss {
            Some(best) => loss < best,
            None => true,
        }
    }

    pub fn record_improvement(&mut self, loss: f64) {
        self.best_loss = Some(loss);
        self.stalls = 0;
    }

    /// Count one stalled evaluation. Returns `true` once patience is used up.
    pub fn record_stall(&mut self) -> bool {
        self.stalls += 1;
        self.stalls >= self.patience
    }
}
