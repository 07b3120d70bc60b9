//! Seeded die-roll event source.
//!
//! Each [`DiceSource`] owns its own `ChaCha20Rng`, seeded once when the
//! source is created, so two sources built from the same seed emit the same
//! face sequence. Sequence ids start at 1 and advance by exactly one per
//! event.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::constants::DICE_EVENT_KIND;
use crate::face::Face;

/// A single observation from the stream.
///
/// The face is kept as a raw integer so foreign or malformed events can be
/// represented; the aggregator decides what counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollEvent {
    pub sequence_id: u64,
    pub kind: String,
    pub face: i64,
    pub timestamp: DateTime<Utc>,
}

impl RollEvent {
    #[must_use]
    pub fn dice(sequence_id: u64, face: Face, timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence_id,
            kind: DICE_EVENT_KIND.to_string(),
            face: i64::from(face.value()),
            timestamp,
        }
    }

    /// The face this event contributes, `None` for foreign or out-of-range events.
    #[must_use]
    pub fn valid_face(&self) -> Option<Face> {
        if self.kind != DICE_EVENT_KIND {
            return None;
        }
        Face::from_value(self.face)
    }

    /// Serialize as one JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Infinite, lazily evaluated sequence of fair die rolls.
#[derive(Debug, Clone)]
pub struct DiceSource {
    seed: u64,
    rng: ChaCha20Rng,
    next_id: u64,
}

impl DiceSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha20Rng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Create a source seeded from the thread-local entropy pool.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().r#gen())
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Id the next emitted event will carry.
    #[must_use]
    pub const fn next_sequence_id(&self) -> u64 {
        self.next_id
    }

    /// Draw the next face without building an event.
    pub fn roll_face(&mut self) -> Face {
        let value: i64 = self.rng.gen_range(1..=6);
        Face::from_value(value).unwrap_or(Face::One)
    }

    /// Produce the next event stamped with the current UTC time.
    pub fn next_event(&mut self) -> RollEvent {
        self.next_event_at(Utc::now())
    }

    /// Produce the next event with an explicit timestamp.
    pub fn next_event_at(&mut self, timestamp: DateTime<Utc>) -> RollEvent {
        let face = self.roll_face();
        let event = RollEvent::dice(self.next_id, face, timestamp);
        self.next_id = self.next_id.saturating_add(1);
        event
    }
}

impl Iterator for DiceSource {
    type Item = RollEvent;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_event())
    }
}

#[cfg(feature = "async")]
pub use paced::DiceStream;

#[cfg(feature = "async")]
mod paced {
    use std::time::Duration;

    use super::{DiceSource, RollEvent};

    /// A [`DiceSource`] that suspends between events.
    ///
    /// The delay is a cooperative yield on the tokio timer; nothing else
    /// happens while the stream is suspended.
    #[derive(Debug)]
    pub struct DiceStream {
        source: DiceSource,
        delay: Duration,
        started: bool,
    }

    impl DiceStream {
        #[must_use]
        pub const fn new(source: DiceSource, delay: Duration) -> Self {
            Self {
                source,
                delay,
                started: false,
            }
        }

        #[must_use]
        pub const fn source(&self) -> &DiceSource {
            &self.source
        }

        #[must_use]
        pub const fn delay(&self) -> Duration {
            self.delay
        }

        /// Yield the next event, sleeping for the configured delay between
        /// consecutive events (the first event is emitted immediately).
        pub async fn next_paced(&mut self) -> RollEvent {
            if self.started && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.started = true;
            self.source.next_event()
        }
    }
}
