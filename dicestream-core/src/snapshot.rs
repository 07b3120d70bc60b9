//! Append-only snapshot log.
//!
//! Every `every` rolls the writer appends one row holding the cumulative
//! counts and the statistics derived from them. Rows are never rewritten and
//! carry no run marker; the analyzer infers runs later.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_SNAPSHOT_EVERY, DEFAULT_SNAPSHOT_PATH, FACE_COUNT, SNAPSHOT_FIELDS,
    SNAPSHOT_FLOAT_PLACES, SNAPSHOT_TS_FORMAT,
};
use crate::face::FaceCounts;
use crate::numbers::{positive_interval, round_to_places};
use crate::stats::DerivedStats;

/// Errors raised while creating or appending to the snapshot log.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to create snapshot directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open snapshot log {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to append to snapshot log {path}: {source}")]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Cadence and destination for snapshot rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Rolls between rows; zero or negative disables writing.
    pub every: i64,
    pub path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            every: DEFAULT_SNAPSHOT_EVERY,
            path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

impl SnapshotConfig {
    #[must_use]
    pub fn new(every: i64, path: impl Into<PathBuf>) -> Self {
        Self {
            every,
            path: path.into(),
        }
    }

    #[must_use]
    pub const fn with_every(mut self, every: i64) -> Self {
        self.every = every;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.every > 0
    }
}

/// True when `n` lands on the cadence. `n == 0` qualifies for any enabled
/// interval.
#[must_use]
pub fn should_write(n: u64, interval: i64) -> bool {
    positive_interval(interval).is_some_and(|every| n % every == 0)
}

/// One persisted row of the snapshot log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub ts: String,
    pub n: u64,
    pub max_abs_dev: f64,
    pub chi2: f64,
    pub proportions: [f64; FACE_COUNT],
    pub counts: [u64; FACE_COUNT],
}

impl SnapshotRecord {
    /// Build a row from cumulative counts, rounding floats to the log precision.
    #[must_use]
    pub fn from_counts(ts: impl Into<String>, n: u64, counts: &FaceCounts) -> Self {
        let stats = DerivedStats::compute(counts, n);
        Self {
            ts: ts.into(),
            n,
            max_abs_dev: round_to_places(stats.max_abs_dev, SNAPSHOT_FLOAT_PLACES),
            chi2: round_to_places(stats.chi2, SNAPSHOT_FLOAT_PLACES),
            proportions: stats
                .proportions
                .map(|p| round_to_places(p, SNAPSHOT_FLOAT_PLACES)),
            counts: *counts.as_array(),
        }
    }

    /// Render as a CSV line (with trailing newline) in header order.
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        let mut line = String::with_capacity(160);
        let _ = write!(
            line,
            "{},{},{:.6},{:.6}",
            self.ts, self.n, self.max_abs_dev, self.chi2
        );
        for p in &self.proportions {
            let _ = write!(line, ",{p:.6}");
        }
        for c in &self.counts {
            let _ = write!(line, ",{c}");
        }
        line.push('\n');
        line
    }
}

/// The header row shared by every snapshot log.
#[must_use]
pub fn header_line() -> String {
    let mut header = SNAPSHOT_FIELDS.join(",");
    header.push('\n');
    header
}

/// Local wall-clock timestamp at second resolution.
#[must_use]
pub fn local_timestamp() -> String {
    Local::now().format(SNAPSHOT_TS_FORMAT).to_string()
}

/// Writes snapshot rows for one process lifetime.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    config: SnapshotConfig,
}

impl SnapshotWriter {
    #[must_use]
    pub const fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Ensure the parent directory and a header-only log exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn init(&self) -> Result<(), SnapshotError> {
        let path = &self.config.path;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if path.exists() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(path)
            .map_err(|source| SnapshotError::Open {
                path: path.clone(),
                source,
            })?;
        file.write_all(header_line().as_bytes())
            .map_err(|source| SnapshotError::Append {
                path: path.clone(),
                source,
            })?;
        log::info!("created snapshot log {}", path.display());
        Ok(())
    }

    #[must_use]
    pub fn should_write(&self, n: u64) -> bool {
        should_write(n, self.config.every)
    }

    /// Append a row when `n` is on the cadence.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be appended.
    pub fn maybe_write(
        &self,
        n: u64,
        counts: &FaceCounts,
    ) -> Result<Option<SnapshotRecord>, SnapshotError> {
        if !self.should_write(n) {
            return Ok(None);
        }
        self.write(n, counts).map(Some)
    }

    /// Append one row unconditionally, timestamped now.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be appended.
    pub fn write(&self, n: u64, counts: &FaceCounts) -> Result<SnapshotRecord, SnapshotError> {
        let record = SnapshotRecord::from_counts(local_timestamp(), n, counts);
        self.append(&record)?;
        Ok(record)
    }

    /// Append a prepared row, creating the log first when it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be created or appended to.
    pub fn append(&self, record: &SnapshotRecord) -> Result<(), SnapshotError> {
        self.init()?;
        let path = &self.config.path;
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|source| SnapshotError::Open {
                path: path.clone(),
                source,
            })?;
        // whole row in one write so a completed call never leaves a partial line
        file.write_all(record.to_csv_line().as_bytes())
            .map_err(|source| SnapshotError::Append {
                path: path.clone(),
                source,
            })?;
        log::debug!(
            "snapshot n={} chi2={:.3} max_abs_dev={:.4} -> {}",
            record.n,
            record.chi2,
            record.max_abs_dev,
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(label: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!(
                "dicestream-snapshot-{label}-{}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            ))
            .join("snapshots.csv")
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn cadence_fires_on_multiples_including_zero() {
        let hits: Vec<u64> = (0..=200).filter(|n| should_write(*n, 50)).collect();
        assert_eq!(hits, vec![0, 50, 100, 150, 200]);
    }

    #[test]
    fn disabled_cadence_never_fires() {
        assert!((0..500).all(|n| !should_write(n, 0)));
        assert!((0..500).all(|n| !should_write(n, -5)));
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = SnapshotConfig::default();
        assert_eq!(config.every, 50);
        assert_eq!(config.path, PathBuf::from("data/snapshots.csv"));
        assert!(config.is_enabled());
        assert!(!config.with_every(0).is_enabled());
    }

    #[test]
    fn init_creates_header_once() {
        let path = temp_log("init");
        let writer = SnapshotWriter::new(SnapshotConfig::new(10, &path));
        writer.init().unwrap();
        writer.init().unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "ts,n,max_abs_dev,chi2,p1,p2,p3,p4,p5,p6,c1,c2,c3,c4,c5,c6\n"
        );
    }

    #[test]
    fn write_creates_missing_log_with_header() {
        let path = temp_log("fresh");
        let writer = SnapshotWriter::new(SnapshotConfig::new(10, &path));
        writer
            .write(6, &FaceCounts::new([1, 1, 1, 1, 1, 1]))
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("ts,n,"));
        let row = lines.next().unwrap();
        assert!(row.contains(",6,0.000000,0.000000,0.166667,"));
        assert!(row.ends_with(",1,1,1,1,1,1"));
    }

    #[test]
    fn repeated_writes_append_duplicate_rows() {
        let path = temp_log("dupes");
        let writer = SnapshotWriter::new(SnapshotConfig::new(10, &path));
        writer.init().unwrap();
        let counts = FaceCounts::new([2, 2, 1, 3, 1, 1]);
        writer.write(10, &counts).unwrap();
        let before = line_count(&path);
        writer.write(10, &counts).unwrap();
        writer.write(10, &counts).unwrap();
        assert_eq!(line_count(&path), before + 2);
    }

    #[test]
    fn maybe_write_respects_cadence() {
        let path = temp_log("cadence");
        let writer = SnapshotWriter::new(SnapshotConfig::new(5, &path));
        writer.init().unwrap();
        let counts = FaceCounts::new([1, 1, 1, 1, 0, 0]);
        assert!(writer.maybe_write(4, &counts).unwrap().is_none());
        let record = writer
            .maybe_write(5, &FaceCounts::new([1, 1, 1, 1, 1, 0]))
            .unwrap()
            .expect("row at cadence");
        assert_eq!(record.n, 5);
        assert_eq!(line_count(&path), 2);
    }

    #[test]
    fn disabled_writer_is_a_no_op() {
        let path = temp_log("disabled");
        let writer = SnapshotWriter::new(SnapshotConfig::new(0, &path));
        writer.init().unwrap();
        for n in 0..20 {
            assert!(writer.maybe_write(n, &FaceCounts::default()).unwrap().is_none());
        }
        assert_eq!(line_count(&path), 1);
    }

    #[test]
    fn existing_content_is_preserved() {
        let path = temp_log("preserve");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, header_line() + "legacy-row\n").unwrap();
        let writer = SnapshotWriter::new(SnapshotConfig::new(1, &path));
        writer.write(1, &FaceCounts::new([1, 0, 0, 0, 0, 0])).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("legacy-row\n"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn record_rounds_to_six_places() {
        let record = SnapshotRecord::from_counts(
            "2025-10-07T01:23:45",
            7,
            &FaceCounts::new([2, 1, 1, 1, 1, 1]),
        );
        assert!((record.proportions[0] - 0.285_714).abs() < 1e-12);
        let line = record.to_csv_line();
        assert!(line.starts_with("2025-10-07T01:23:45,7,"));
        assert!(line.contains(",0.285714,0.142857,"));
        assert!(line.ends_with(",2,1,1,1,1,1\n"));
    }

    #[test]
    fn timestamp_has_second_resolution() {
        let ts = local_timestamp();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[10..11], "T");
    }
}
