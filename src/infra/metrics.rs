// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Two records of a training run, both under the log directory:
//
//   metrics.csv   scalar stream, one row per (tag, step):
//                   tag,step,value
//                   loss_epoch,0,0.041233
//                   f1_train,0,38.120000
//                   f1_test,0,35.400000
//
//   trainlog.txt  one line per completed epoch:
//                   epoch:0 loss:0.041233 diff:-242509900 f1_train:38.12 f1_test:35.4
//
// A logger is only built for a training run, and building it
// starts both files afresh. Rows are then appended as epochs end.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Tags written to the scalar stream.
pub const TAG_LOSS: &str = "loss_epoch";
pub const TAG_F1_TRAIN: &str = "f1_train";
pub const TAG_F1_TEST: &str = "f1_test";

/// One completed epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch index, starting at 0
    pub epoch: usize,

    /// Mean MSE over every video of the epoch
    pub loss: f64,

    /// Relative loss change in percent (see early stopping)
    pub diff: f64,

    /// Mean summary F-score on the training videos, in [0, 100]
    pub f1_train: f64,

    /// Mean summary F-score on the held-out videos, in [0, 100]
    pub f1_test: f64,
}

impl EpochMetrics {
    /// `epoch:<i> loss:<f> diff:<f> f1_train:<f> f1_test:<f>`
    pub fn log_line(&self) -> String {
        format!(
            "epoch:{} loss:{} diff:{} f1_train:{} f1_test:{}",
            self.epoch, self.loss, self.diff, self.f1_train, self.f1_test
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
    log_path: PathBuf,
}

impl MetricsLogger {
    /// Create the log directory and truncate both files.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "tag,step,value")?;

        let log_path = dir.join("trainlog.txt");
        fs::File::create(&log_path)
            .with_context(|| format!("Cannot create '{}'", log_path.display()))?;
        tracing::debug!("Started metrics in '{}'", dir.display());

        Ok(Self { csv_path, log_path })
    }

    /// Append one scalar to the stream.
    pub fn update(&self, tag: &str, step: usize, value: f64) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{tag},{step},{value:.6}")?;
        Ok(())
    }

    /// Append the epoch line to trainlog.txt and echo it to stdout.
    pub fn log_epoch(&self, m: &EpochMetrics) -> Result<()> {
        let line = m.log_line();
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Cannot open '{}'", self.log_path.display()))?;
        writeln!(f, "{line}")?;
        println!("{line}");
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_format() {
        let m = EpochMetrics { epoch: 4, loss: 0.5, diff: -2.5, f1_train: 40.0, f1_test: 37.25 };
        assert_eq!(m.log_line(), "epoch:4 loss:0.5 diff:-2.5 f1_train:40 f1_test:37.25");
    }

    #[test]
    fn test_scalar_stream_appends_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().join("logs")).unwrap();
        logger.update(TAG_LOSS, 0, 0.25).unwrap();
        logger.update(TAG_F1_TEST, 0, 30.0).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv, "tag,step,value\nloss_epoch,0,0.250000\nf1_test,0,30.000000\n");
    }

    #[test]
    fn test_epoch_log_is_appended() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let m = EpochMetrics { epoch: 0, loss: 1.0, diff: -1.0, f1_train: 0.0, f1_test: 0.0 };
        logger.log_epoch(&m).unwrap();
        logger.log_epoch(&EpochMetrics { epoch: 1, ..m }).unwrap();

        let log = fs::read_to_string(logger.log_path()).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.lines().nth(1).unwrap().starts_with("epoch:1 "));
    }

    #[test]
    fn test_new_run_starts_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        let m = EpochMetrics { epoch: 0, loss: 1.0, diff: -1.0, f1_train: 0.0, f1_test: 0.0 };

        let first = MetricsLogger::new(dir.path()).unwrap();
        first.update(TAG_LOSS, 0, 1.0).unwrap();
        first.log_epoch(&m).unwrap();
        first.log_epoch(&EpochMetrics { epoch: 1, ..m.clone() }).unwrap();

        let second = MetricsLogger::new(dir.path()).unwrap();
        second.log_epoch(&m).unwrap();

        let log = fs::read_to_string(second.log_path()).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert_eq!(fs::read_to_string(second.csv_path()).unwrap(), "tag,step,value\n");
    }
}
