//! Dicestream Core
//!
//! Seeded die-roll stream, single-consumer online aggregation, an
//! append-only snapshot log and the offline analyzer that reads it back.
//! The crate has no terminal or process concerns; the `dicestream` binary
//! drives it.

pub mod aggregate;
pub mod analysis;
pub mod chart;
pub mod constants;
pub mod event;
pub mod face;
pub mod numbers;
pub mod snapshot;
pub mod stats;

// Re-export commonly used types
pub use aggregate::{AggregateView, Aggregator, CumulativeState};
pub use analysis::{
    AnalysisError, AnalysisReport, Analyzer, AnalyzerConfig, AnnotatedRow, RunAnalysis,
    RunSummary, assign_runs, load_snapshots,
};
pub use chart::ChartStyle;
#[cfg(feature = "async")]
pub use event::DiceStream;
pub use event::{DiceSource, RollEvent};
pub use face::{Face, FaceCounts};
pub use snapshot::{SnapshotConfig, SnapshotError, SnapshotRecord, SnapshotWriter, should_write};
pub use stats::{DerivedStats, chi_square, max_abs_deviation, proportions};
