// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per evaluation to <run dir>/metrics.csv.
//
// Example CSV output:
//   iteration,epoch,batch,test_loss,improved
//   120,1,120,412.337100,true
//   240,1,240,398.104500,true
//   360,1,360,401.220800,false
//
// How to read the metrics:
//   - test_loss is the TOTAL over every testing batch, so it
//     only compares within one run (same testing partition)
//   - three `false` rows in a row end the run early

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "iteration,epoch,batch,test_loss,improved";

/// One row of the CSV: the outcome of a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Optimiser steps taken before this evaluation
    pub iteration: usize,
    pub epoch:     usize,
    /// Batches of the current epoch already trained on
    pub batch:     usize,
    pub test_loss: f64,
    /// Whether this evaluation produced a new checkpoint
    pub improved:  bool,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EvaluationMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{},{},{:.6},{}",
            m.iteration, m.epoch, m.batch, m.test_loss, m.improved,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
