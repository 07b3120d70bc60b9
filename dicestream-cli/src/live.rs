//! Live terminal presenter.
//!
//! One frame per pulled roll: the aggregator is updated, the frame redrawn,
//! then the snapshot writer offered the new count. Commands arrive line-wise
//! on a channel fed from stdin; an interrupt arrives on its own oneshot.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use dicestream_core::constants::{EXPECTED_PROPORTION, FACE_COLORS};
use dicestream_core::numbers::{index_to_f64, round_to_index};
use dicestream_core::{
    AggregateView, Aggregator, DerivedStats, DiceSource, DiceStream, Face, RollEvent,
    SnapshotConfig, SnapshotWriter,
};

const BAR_WIDTH: usize = 40;
const AXIS_MAX: f64 = 0.5;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenterState {
    Running,
    Paused,
    Stopped,
}

impl PresenterState {
    /// Running and paused swap; a stopped presenter stays stopped.
    #[must_use]
    pub const fn toggle_pause(self) -> Self {
        match self {
            Self::Running => Self::Paused,
            Self::Paused => Self::Running,
            Self::Stopped => Self::Stopped,
        }
    }

    #[must_use]
    pub const fn stop(self) -> Self {
        Self::Stopped
    }

    #[must_use]
    pub const fn should_pull(self) -> bool {
        matches!(self, Self::Running)
    }

    const fn label(self) -> Option<&'static str> {
        match self {
            Self::Running => None,
            Self::Paused => Some("PAUSED"),
            Self::Stopped => Some("STOPPED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterCommand {
    TogglePause,
    Stop,
    Quit,
}

impl PresenterCommand {
    /// Interpret one input line; anything unrecognised is ignored.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.is_empty() && line.trim().is_empty() {
            return Some(Self::TogglePause);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Self::TogglePause),
            "x" | "stop" => Some(Self::Stop),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub seed: u64,
    pub delay: Duration,
    pub max_rolls: Option<u64>,
    pub snapshot: SnapshotConfig,
    pub emit_events: bool,
    /// Draw frames into the output; off when the output carries a
    /// machine-readable report.
    pub draw_frames: bool,
    pub clear_screen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveOutcome {
    /// `--max-rolls` was reached.
    Completed,
    Stopped,
    Quit,
    /// Command input closed while paused.
    InputClosed,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveSummary {
    pub seed: u64,
    pub rolls: u64,
    pub ignored: u64,
    pub snapshots_written: u64,
    pub snapshot_path: PathBuf,
    pub outcome: LiveOutcome,
    pub view: AggregateView,
    pub stats: DerivedStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Feed stdin lines into a channel from a detached thread.
///
/// A blocking stdin read cannot be cancelled, so it lives outside the
/// runtime and never holds up shutdown. The thread holds the only sender:
/// end of input closes the channel.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (reader_tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        use std::io::BufRead as _;
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if reader_tx.send(line).is_err() {
                break;
            }
        }
        log::debug!("command input closed");
    });
    rx
}

struct Session<'a, W: Write> {
    options: &'a LiveOptions,
    writer: SnapshotWriter,
    aggregator: Aggregator,
    presenter: PresenterState,
    rolls: u64,
    snapshots_written: u64,
    out: &'a mut W,
}

impl<W: Write> Session<'_, W> {
    fn consume(&mut self, event: &RollEvent) -> Result<()> {
        self.rolls = self.rolls.saturating_add(1);
        self.aggregator.process(event);
        if self.options.emit_events {
            let line = event.to_json_line().context("failed to serialize event")?;
            writeln!(self.out, "{line}")?;
        } else {
            self.draw()?;
        }
        let state = self.aggregator.state();
        if self
            .writer
            .maybe_write(state.n(), state.counts())
            .context("failed to write snapshot")?
            .is_some()
        {
            self.snapshots_written += 1;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        if self.options.emit_events || !self.options.draw_frames {
            return Ok(());
        }
        if self.options.clear_screen {
            write!(self.out, "{CLEAR_SCREEN}")?;
        }
        let frame = render_frame(&self.aggregator.snapshot(), self.presenter);
        write!(self.out, "{frame}")?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(self, outcome: LiveOutcome, started_at: DateTime<Utc>) -> LiveSummary {
        let view = self.aggregator.snapshot();
        LiveSummary {
            seed: self.options.seed,
            rolls: self.rolls,
            ignored: self.aggregator.ignored(),
            snapshots_written: self.snapshots_written,
            snapshot_path: self.writer.path().to_path_buf(),
            outcome,
            stats: DerivedStats::compute(&view.counts, view.n),
            view,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Drive the presenter until the roll budget is spent, the user quits or
/// interrupts, or no further progress is possible.
///
/// A dropped `interrupt` sender only disarms the interrupt.
///
/// # Errors
///
/// Returns an error when the snapshot log cannot be written or output fails.
pub async fn run_live<W: Write>(
    options: &LiveOptions,
    mut commands: mpsc::UnboundedReceiver<String>,
    mut interrupt: oneshot::Receiver<()>,
    out: &mut W,
) -> Result<LiveSummary> {
    let started_at = Utc::now();
    let mut stream = DiceStream::new(DiceSource::new(options.seed), options.delay);
    let mut session = Session {
        options,
        writer: SnapshotWriter::new(options.snapshot.clone()),
        aggregator: Aggregator::new(),
        presenter: PresenterState::Running,
        rolls: 0,
        snapshots_written: 0,
        out,
    };
    session
        .writer
        .init()
        .context("failed to initialise snapshot log")?;
    log::info!(
        "live session seed={} every={} -> {}",
        options.seed,
        options.snapshot.every,
        options.snapshot.path.display()
    );

    let budget_spent = |rolls: u64| options.max_rolls.is_some_and(|max| rolls >= max);

    // first frame is primed with one roll
    if !budget_spent(0) {
        let event = stream.next_paced().await;
        session.consume(&event)?;
    }

    let mut input_open = true;
    let mut interrupt_armed = true;
    let outcome = loop {
        if budget_spent(session.rolls) {
            break LiveOutcome::Completed;
        }
        // nothing left can resume the stream; the interrupt alone never ends a session
        if !input_open && !session.presenter.should_pull() {
            break idle_outcome(session.presenter);
        }
        tokio::select! {
            biased;
            line = commands.recv(), if input_open => {
                match line.as_deref().map(PresenterCommand::parse) {
                    Some(Some(PresenterCommand::Quit)) => break LiveOutcome::Quit,
                    Some(Some(PresenterCommand::TogglePause)) => {
                        session.presenter = session.presenter.toggle_pause();
                        session.draw()?;
                    }
                    Some(Some(PresenterCommand::Stop)) => {
                        session.presenter = session.presenter.stop();
                        session.draw()?;
                    }
                    Some(None) => {}
                    None => input_open = false,
                }
            }
            signal = &mut interrupt, if interrupt_armed => match signal {
                Ok(()) => break LiveOutcome::Quit,
                Err(_) => interrupt_armed = false,
            },
            event = stream.next_paced(), if session.presenter.should_pull() => {
                session.consume(&event)?;
            }
            else => break idle_outcome(session.presenter),
        }
    };

    session.out.flush()?;
    log::info!("live session ended ({outcome:?}) after {} rolls", session.rolls);
    Ok(session.finish(outcome, started_at))
}

const fn idle_outcome(presenter: PresenterState) -> LiveOutcome {
    match presenter {
        PresenterState::Stopped => LiveOutcome::Stopped,
        PresenterState::Running | PresenterState::Paused => LiveOutcome::InputClosed,
    }
}

/// Render one frame: title, a bar per face on a 0 to 0.5 axis, and the 1/6 marker.
#[must_use]
pub fn render_frame(view: &AggregateView, presenter: PresenterState) -> String {
    let marker = axis_column(EXPECTED_PROPORTION);
    let mut frame = String::with_capacity(1024);

    let mut title = format!("Dice Proportions (n={})", view.n);
    if let Some(label) = presenter.label() {
        title.push_str(&format!(" [{label}]"));
    }
    frame.push_str(&format!("{}\n\n", title.bold()));

    for face in Face::ALL {
        let proportion = view.proportions[face.index()];
        let filled = axis_column(proportion);
        let mut track = String::with_capacity(BAR_WIDTH);
        for column in filled..BAR_WIDTH {
            track.push(if column == marker { '┊' } else { ' ' });
        }
        let (r, g, b) = hex_rgb(FACE_COLORS[face.index()]);
        frame.push_str(&format!(
            "  {face} │{}{track}│ {proportion:.3} ({})\n",
            "█".repeat(filled).truecolor(r, g, b),
            view.counts.get(face),
        ));
    }

    frame.push_str(&format!("    └{}┘\n", "─".repeat(BAR_WIDTH)));
    let mut axis = format!("     {:<marker$}", "0.0");
    axis.push_str(&format!("{:<width$}", "1/6", width = BAR_WIDTH - marker - 2));
    axis.push_str("0.5\n");
    frame.push_str(&axis);
    frame.push_str(&format!(
        "{}\n",
        "[p/space] pause  [x] stop  [q] quit".dimmed()
    ));
    frame
}

fn axis_column(proportion: f64) -> usize {
    if !proportion.is_finite() {
        return 0;
    }
    let scaled = (proportion / AXIS_MAX).clamp(0.0, 1.0) * index_to_f64(BAR_WIDTH);
    round_to_index(scaled).min(BAR_WIDTH)
}

fn hex_rgb(hex: &str) -> (u8, u8, u8) {
    let channel = |range: std::ops::Range<usize>| {
        hex.trim_start_matches('#')
            .get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .unwrap_or(u8::MAX)
    };
    (channel(0..2), channel(2..4), channel(4..6))
}
