use serde::{Deserialize, Serialize};

use crate::constants::FACE_COUNT;
use crate::event::RollEvent;
use crate::face::FaceCounts;
use crate::stats::proportions;

/// Running per-face counts and total since stream start.
///
/// `n` always equals the sum of `counts`; the only way to change either is
/// [`CumulativeState::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeState {
    counts: FaceCounts,
    n: u64,
}

impl CumulativeState {
    #[must_use]
    pub fn init() -> Self {
        Self::default()
    }

    /// Fold one event into the state.
    ///
    /// Events that are not dice rolls, or whose face is outside `1..=6`,
    /// leave the state untouched.
    #[must_use]
    pub fn apply(mut self, event: &RollEvent) -> Self {
        if let Some(face) = event.valid_face() {
            self.counts.increment(face);
            self.n = self.n.saturating_add(1);
        }
        self
    }

    #[must_use]
    pub const fn counts(&self) -> &FaceCounts {
        &self.counts
    }

    #[must_use]
    pub const fn n(&self) -> u64 {
        self.n
    }

    /// Read-only projection handed to presenters and the snapshot writer.
    #[must_use]
    pub fn snapshot(&self) -> AggregateView {
        AggregateView {
            counts: self.counts,
            proportions: proportions(&self.counts, self.n),
            n: self.n,
        }
    }
}

/// `(counts, proportions, n)` as observed at one point of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateView {
    pub counts: FaceCounts,
    pub proportions: [f64; FACE_COUNT],
    pub n: u64,
}

/// Single consumer driving a [`CumulativeState`] one event at a time.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    state: CumulativeState,
    ignored: u64,
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one event; returns whether it was counted.
    pub fn process(&mut self, event: &RollEvent) -> bool {
        let before = self.state.n();
        self.state = self.state.apply(event);
        let counted = self.state.n() != before;
        if !counted {
            self.ignored = self.ignored.saturating_add(1);
            log::trace!(
                "ignoring event {} (kind {:?}, face {})",
                event.sequence_id,
                event.kind,
                event.face
            );
        }
        counted
    }

    #[must_use]
    pub const fn state(&self) -> &CumulativeState {
        &self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> AggregateView {
        self.state.snapshot()
    }

    /// Number of events dropped as foreign or malformed.
    #[must_use]
    pub const fn ignored(&self) -> u64 {
        self.ignored
    }
}
