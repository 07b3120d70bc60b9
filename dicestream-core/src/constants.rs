//! Centralized constants for the dice statistics pipeline.
//!
//! The snapshot header, the fairness threshold and the default cadence are
//! part of the persisted log contract, so they live here rather than in
//! runtime configuration.

// Event stream --------------------------------------------------------------
pub const DICE_EVENT_KIND: &str = "dice";
pub const FACE_COUNT: usize = 6;

// Fairness ------------------------------------------------------------------
/// Expected probability of each face under a fair die.
pub const EXPECTED_PROPORTION: f64 = 1.0 / 6.0;
/// Chi-square critical value at 5% significance with 5 degrees of freedom.
pub const CHI2_CRIT_5PCT: f64 = 11.07;

// Snapshot log --------------------------------------------------------------
pub const DEFAULT_SNAPSHOT_EVERY: i64 = 50;
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/snapshots.csv";
pub const SNAPSHOT_FLOAT_PLACES: i32 = 6;
pub const SNAPSHOT_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const SNAPSHOT_FIELDS: [&str; 16] = [
    "ts",
    "n",
    "max_abs_dev",
    "chi2",
    "p1",
    "p2",
    "p3",
    "p4",
    "p5",
    "p6",
    "c1",
    "c2",
    "c3",
    "c4",
    "c5",
    "c6",
];

// Analyzer outputs ----------------------------------------------------------
pub const DEFAULT_REPORT_DIR: &str = "reports";
pub const DISTRIBUTION_CHART_FILE: &str = "faces_distribution.svg";
pub const TREND_CHART_FILE: &str = "faces_trend.svg";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const SUMMARY_FIELDS: [&str; 11] = [
    "run",
    "n",
    "max_abs_dev",
    "chi2",
    "p1",
    "p2",
    "p3",
    "p4",
    "p5",
    "p6",
    "n_at_first_pass",
];

/// Per-face palette shared by the live presenter and the offline charts.
pub const FACE_COLORS: [&str; FACE_COUNT] = [
    "#bedfdd", "#fcc2b3", "#fc917b", "#d0b97e", "#b89e46", "#365d59",
];
