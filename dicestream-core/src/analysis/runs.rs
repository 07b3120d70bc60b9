//! Run segmentation, cumulative recomputation and per-run summaries.
//!
//! The log has no run marker. A run is a maximal stretch of rows whose `n`
//! never decreases; every decrease relative to the previous row opens the
//! next run.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::constants::{CHI2_CRIT_5PCT, FACE_COUNT, SUMMARY_FIELDS};
use crate::numbers::count_to_f64;
use crate::snapshot::SnapshotRecord;

/// Run number for every position of `ns`, starting at 0 and advancing by
/// one at each decrease.
#[must_use]
pub fn assign_runs(ns: &[u64]) -> Vec<usize> {
    let mut run = 0;
    let mut previous: Option<u64> = None;
    ns.iter()
        .map(|&n| {
            if previous.is_some_and(|prev| n < prev) {
                run += 1;
            }
            previous = Some(n);
            run
        })
        .collect()
}

/// Proportions rebuilt from raw counts, ignoring the persisted `p1..p6`.
///
/// A row with `n == 0` has no defined proportions; every non-finite ratio
/// becomes NaN, including `c / 0` for malformed rows with non-zero counts.
#[must_use]
pub fn cumulative_proportions(record: &SnapshotRecord) -> [f64; FACE_COUNT] {
    let n = count_to_f64(record.n);
    record.counts.map(|count| {
        let proportion = count_to_f64(count) / n;
        if proportion.is_finite() {
            proportion
        } else {
            f64::NAN
        }
    })
}

/// Whether `chi2` is below the fixed 5% critical value for five degrees of freedom.
#[must_use]
pub fn passes_fairness(chi2: f64) -> bool {
    chi2 < CHI2_CRIT_5PCT
}

/// A persisted row together with everything derived from it offline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRow {
    pub run: usize,
    pub record: SnapshotRecord,
    pub cumulative: [f64; FACE_COUNT],
    pub passes_chi2: bool,
}

/// Final state of one run as reported in `summary.csv`.
///
/// Proportions here are the ones originally persisted; the charts use the
/// recomputed [`AnnotatedRow::cumulative`] values instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run: usize,
    pub n: u64,
    pub max_abs_dev: f64,
    pub chi2: f64,
    pub proportions: [f64; FACE_COUNT],
    pub n_at_first_pass: Option<u64>,
}

impl RunSummary {
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        let mut line = String::with_capacity(128);
        let _ = write!(
            line,
            "{},{},{:.6},{:.6}",
            self.run, self.n, self.max_abs_dev, self.chi2
        );
        for p in &self.proportions {
            let _ = write!(line, ",{p:.6}");
        }
        line.push(',');
        if let Some(n) = self.n_at_first_pass {
            let _ = write!(line, "{n}");
        }
        line.push('\n');
        line
    }
}

/// Render summaries as a CSV document with header.
#[must_use]
pub fn summary_csv(summaries: &[RunSummary]) -> String {
    let mut out = SUMMARY_FIELDS.join(",");
    out.push('\n');
    for summary in summaries {
        out.push_str(&summary.to_csv_line());
    }
    out
}

/// Every loaded row, annotated, plus the per-run view derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAnalysis {
    rows: Vec<AnnotatedRow>,
}

impl RunAnalysis {
    #[must_use]
    pub fn new(records: Vec<SnapshotRecord>) -> Self {
        let ns: Vec<u64> = records.iter().map(|r| r.n).collect();
        let runs = assign_runs(&ns);
        let rows: Vec<AnnotatedRow> = records
            .into_iter()
            .zip(runs)
            .map(|(record, run)| {
                if record.n == 0 {
                    log::warn!(
                        "row at {} in run {run} has n = 0; cumulative proportions are undefined",
                        record.ts
                    );
                }
                AnnotatedRow {
                    run,
                    cumulative: cumulative_proportions(&record),
                    passes_chi2: passes_fairness(record.chi2),
                    record,
                }
            })
            .collect();
        log::debug!(
            "segmented {} rows into {} run(s)",
            rows.len(),
            rows.last().map_or(0, |row| row.run + 1)
        );
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[AnnotatedRow] {
        &self.rows
    }

    #[must_use]
    pub fn run_count(&self) -> usize {
        self.rows.last().map_or(0, |row| row.run + 1)
    }

    /// Rows of the highest-numbered run.
    #[must_use]
    pub fn latest(&self) -> &[AnnotatedRow] {
        let Some(last_run) = self.rows.last().map(|row| row.run) else {
            return &[];
        };
        let start = self
            .rows
            .iter()
            .position(|row| row.run == last_run)
            .unwrap_or(self.rows.len());
        &self.rows[start..]
    }

    /// Rows to plot: the latest run, or every row when it is empty.
    #[must_use]
    pub fn plot_rows(&self) -> &[AnnotatedRow] {
        let latest = self.latest();
        if latest.is_empty() {
            self.rows.as_slice()
        } else {
            latest
        }
    }

    /// Row behind the final distribution chart.
    #[must_use]
    pub fn final_row(&self) -> Option<&AnnotatedRow> {
        self.latest().last().or_else(|| self.rows.last())
    }

    /// Smallest `n` among passing rows, per run; runs with no passing row are absent.
    #[must_use]
    pub fn first_pass_by_run(&self) -> BTreeMap<usize, u64> {
        let mut first_pass: BTreeMap<usize, u64> = BTreeMap::new();
        for row in self.rows.iter().filter(|row| row.passes_chi2) {
            first_pass
                .entry(row.run)
                .and_modify(|n| *n = (*n).min(row.record.n))
                .or_insert(row.record.n);
        }
        first_pass
    }

    /// Last row of each run by ascending `n`, joined with its first passing `n`.
    #[must_use]
    pub fn summaries(&self) -> Vec<RunSummary> {
        let first_pass = self.first_pass_by_run();
        let mut last_by_run: BTreeMap<usize, &AnnotatedRow> = BTreeMap::new();
        for row in &self.rows {
            last_by_run
                .entry(row.run)
                .and_modify(|current| {
                    if row.record.n >= current.record.n {
                        *current = row;
                    }
                })
                .or_insert(row);
        }

        last_by_run
            .into_iter()
            .map(|(run, row)| RunSummary {
                run,
                n: row.record.n,
                max_abs_dev: row.record.max_abs_dev,
                chi2: row.record.chi2,
                proportions: row.record.proportions,
                n_at_first_pass: first_pass.get(&run).copied(),
            })
            .collect()
    }
}
