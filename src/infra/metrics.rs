// ============================================================
// Layer 6 — Summary Log
// ============================================================
// Scalar time series written while training, one row per
// (step, tag) pair, appended to `<checkpoint>/tensorboard/scalars.csv`:
//
//   step,tag,value
//   50,train/loss,5.812034
//   50,train/learning_rate,0.001000
//   50,valid/loss,5.904117
//   50,valid/bleu,0.000000
//
// The long format lets new tags appear without rewriting the
// header, and a resumed run keeps appending to the same file.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const SCALARS_FILE: &str = "scalars.csv";

pub mod tags {
    pub const TRAIN_LOSS:    &str = "train/loss";
    pub const LEARNING_RATE: &str = "train/learning_rate";
    pub const VALID_LOSS:    &str = "valid/loss";
    pub const VALID_BLEU:    &str = "valid/bleu";
}

/// One logged value.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub step:  u64,
    pub tag:   String,
    pub value: f64,
}

/// Appends scalars to the CSV file of one summary directory.
pub struct SummaryWriter {
    csv_path: PathBuf,
}

impl SummaryWriter {
    /// Create `dir` if needed and write the header only for a new file.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create summary directory '{}'", dir.display()))?;

        let csv_path = dir.join(SCALARS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,tag,value")?;
            tracing::debug!("Created summary log '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn add_scalar(&self, step: u64, tag: &str, value: f64) -> Result<()> {
        self.add_scalars(step, &[(tag, value)])
    }

    /// Several tags for the same step, one open/append.
    pub fn add_scalars(&self, step: u64, values: &[(&str, f64)]) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        for (tag, value) in values {
            writeln!(f, "{step},{tag},{value:.6}")?;
        }
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Parse every row back. Malformed rows are skipped.
    pub fn read_all(&self) -> Result<Vec<Scalar>> {
        let text = fs::read_to_string(&self.csv_path)?;
        Ok(text
            .lines()
            .skip(1)
            .filter_map(|line| {
                let mut cols = line.splitn(3, ',');
                let step  = cols.next()?.parse().ok()?;
                let tag   = cols.next()?.to_string();
                let value = cols.next()?.parse().ok()?;
                Some(Scalar { step, tag, value })
            })
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_across_writers() {
        let dir = std::env::temp_dir().join(format!("summary_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let w = SummaryWriter::new(&dir).unwrap();
        w.add_scalars(10, &[(tags::TRAIN_LOSS, 2.5), (tags::LEARNING_RATE, 0.001)]).unwrap();

        // a resumed run reopens the same file without a second header
        let w = SummaryWriter::new(&dir).unwrap();
        w.add_scalar(20, tags::VALID_BLEU, 0.25).unwrap();

        let rows = w.read_all().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], Scalar { step: 10, tag: tags::TRAIN_LOSS.into(), value: 2.5 });
        assert_eq!(rows[2].step, 20);

        let text = fs::read_to_string(w.csv_path()).unwrap();
        assert_eq!(text.matches("step,tag,value").count(), 1);
        fs::remove_dir_all(&dir).ok();
    }
}
