//! Offline analysis of a snapshot log.
//!
//! The analyzer loads every row, infers runs from decreases in `n`, writes
//! two SVG charts for the latest run and a per-run `summary.csv`. Loading
//! fails before anything is written, so a rejected log leaves the output
//! directory untouched.

mod reader;
mod runs;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::{ChartStyle, distribution_chart, trend_chart};
use crate::constants::{
    DEFAULT_REPORT_DIR, DEFAULT_SNAPSHOT_PATH, DISTRIBUTION_CHART_FILE, SUMMARY_FILE,
    TREND_CHART_FILE,
};

pub use reader::{load_snapshots, read_snapshots};
pub use runs::{
    AnnotatedRow, RunAnalysis, RunSummary, assign_runs, cumulative_proportions, passes_fairness,
    summary_csv,
};

/// Errors raised while loading a snapshot log or writing its reports.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read snapshot log {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read snapshot log: {source}")]
    Read { source: std::io::Error },
    #[error("snapshot log contains no snapshot rows")]
    EmptyLog,
    #[error("snapshot log is missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },
    #[error("line {line}: invalid value {value:?} in column {column}")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to render chart: {0}")]
    Chart(#[from] std::fmt::Error),
}

/// Input log and output directory for one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            out_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl AnalyzerConfig {
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            out_dir: out_dir.into(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    #[must_use]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    #[must_use]
    pub fn distribution_path(&self) -> PathBuf {
        self.out_dir.join(DISTRIBUTION_CHART_FILE)
    }

    #[must_use]
    pub fn trend_path(&self) -> PathBuf {
        self.out_dir.join(TREND_CHART_FILE)
    }

    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.out_dir.join(SUMMARY_FILE)
    }
}

/// What one analyzer invocation read and produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub input: PathBuf,
    pub rows_read: usize,
    pub run_count: usize,
    pub latest_run: Option<usize>,
    pub final_n: Option<u64>,
    pub summaries: Vec<RunSummary>,
    pub distribution_chart: PathBuf,
    pub trend_chart: PathBuf,
    pub summary_csv: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
    style: ChartStyle,
}

impl Analyzer {
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            style: ChartStyle::default(),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Load the log, then write both charts and the summary.
    ///
    /// # Errors
    ///
    /// Returns an error when the log cannot be loaded or validated, or when
    /// any output cannot be written.
    pub fn run(&self) -> Result<AnalysisReport, AnalysisError> {
        let records = load_snapshots(&self.config.input)?;
        let rows_read = records.len();
        let analysis = RunAnalysis::new(records);
        log::info!(
            "loaded {rows_read} rows from {} ({} run(s))",
            self.config.input.display(),
            analysis.run_count()
        );

        self.write_outputs(&analysis)?;

        let summaries = analysis.summaries();
        let final_row = analysis.final_row();
        Ok(AnalysisReport {
            input: self.config.input.clone(),
            rows_read,
            run_count: analysis.run_count(),
            latest_run: final_row.map(|row| row.run),
            final_n: final_row.map(|row| row.record.n),
            summaries,
            distribution_chart: self.config.distribution_path(),
            trend_chart: self.config.trend_path(),
            summary_csv: self.config.summary_path(),
        })
    }

    /// Write charts and summary for an already-built analysis.
    ///
    /// # Errors
    ///
    /// Returns an error when the output directory or a file cannot be written.
    pub fn write_outputs(&self, analysis: &RunAnalysis) -> Result<(), AnalysisError> {
        let out_dir = &self.config.out_dir;
        fs::create_dir_all(out_dir).map_err(|source| AnalysisError::Write {
            path: out_dir.clone(),
            source,
        })?;

        if let Some(row) = analysis.final_row() {
            let svg = distribution_chart(row, &self.style)?;
            write_file(&self.config.distribution_path(), &svg)?;
        }
        let svg = trend_chart(analysis.plot_rows(), &self.style)?;
        write_file(&self.config.trend_path(), &svg)?;
        write_file(
            &self.config.summary_path(),
            &summary_csv(&analysis.summaries()),
        )?;
        log::info!("wrote reports to {}", out_dir.display());
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), AnalysisError> {
    fs::write(path, contents).map_err(|source| AnalysisError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("dicestream-analysis-{label}-{nanos}"))
    }

    const LOG: &str = "ts,n,max_abs_dev,chi2,p1,p2,p3,p4,p5,p6,c1,c2,c3,c4,c5,c6\n\
        2025-10-07T01:00:00,6,0.0,0.0,0.166667,0.166667,0.166667,0.166667,0.166667,0.166667,1,1,1,1,1,1\n\
        2025-10-07T01:00:05,12,0.083333,2.0,0.25,0.166667,0.083333,0.166667,0.166667,0.166667,3,2,1,2,2,2\n\
        2025-10-07T02:00:00,6,0.166667,4.0,0.333333,0.0,0.166667,0.166667,0.166667,0.166667,2,0,1,1,1,1\n";

    #[test]
    fn run_writes_all_outputs() {
        let dir = temp_dir("outputs");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("snapshots.csv");
        fs::write(&input, LOG).unwrap();
        let config = AnalyzerConfig::new(&input, dir.join("reports"));

        let report = Analyzer::new(config.clone()).run().unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.run_count, 2);
        assert_eq!(report.latest_run, Some(1));
        assert_eq!(report.final_n, Some(6));
        assert!(config.distribution_path().exists());
        assert!(config.trend_path().exists());

        let summary = fs::read_to_string(config.summary_path()).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,12,"));
        assert!(lines[2].starts_with("1,6,"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_log_writes_nothing() {
        let dir = temp_dir("empty");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("snapshots.csv");
        fs::write(&input, crate::snapshot::header_line()).unwrap();
        let out_dir = dir.join("reports");

        let err = Analyzer::new(AnalyzerConfig::new(&input, &out_dir))
            .run()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyLog));
        assert!(!out_dir.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_input_names_the_path() {
        let input = temp_dir("missing").join("absent.csv");
        let err = Analyzer::new(AnalyzerConfig::default().with_input(&input))
            .run()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
        assert!(err.to_string().contains("absent.csv"));
    }

    #[test]
    fn default_config_points_at_conventional_paths() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.input, PathBuf::from("data/snapshots.csv"));
        assert_eq!(config.summary_path(), PathBuf::from("reports/summary.csv"));
    }
}
