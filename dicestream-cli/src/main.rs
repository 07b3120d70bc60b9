mod live;
mod reports;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write, stdout};
use std::path::PathBuf;
use std::time::Duration;

use dicestream_core::constants::{
    DEFAULT_REPORT_DIR, DEFAULT_SNAPSHOT_EVERY, DEFAULT_SNAPSHOT_PATH,
};
use dicestream_core::{Analyzer, AnalyzerConfig, DiceSource, SnapshotConfig};
use live::{LiveOptions, run_live, spawn_stdin_reader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Roll, aggregate, draw and append snapshots
    Live,
    /// Read a snapshot log and write charts and summary
    Analyze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "dicestream", version)]
#[command(about = "Live die-roll statistics with an append-only snapshot log and offline analyzer")]
struct Args {
    /// Live presenter or offline analyzer
    #[arg(long, value_enum, default_value_t = Mode::Live)]
    mode: Mode,

    /// Seed for the roll source (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Delay between rolls in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,

    /// Stop after this many rolls
    #[arg(long)]
    max_rolls: Option<u64>,

    /// Rolls between snapshot rows; zero or negative disables the log
    #[arg(
        long,
        env = "SNAPSHOT_EVERY",
        default_value_t = DEFAULT_SNAPSHOT_EVERY,
        allow_negative_numbers = true
    )]
    snapshot_every: i64,

    /// Snapshot log written by live mode
    #[arg(long, env = "SNAPSHOT_PATH", default_value = DEFAULT_SNAPSHOT_PATH)]
    snapshot_path: PathBuf,

    /// Snapshot log read by analyze mode (defaults to the snapshot path)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for charts and summary.csv
    #[arg(long, default_value = DEFAULT_REPORT_DIR)]
    out_dir: PathBuf,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Print each roll as a JSON line instead of drawing frames
    #[arg(long)]
    emit_events: bool,

    /// Optional path to write output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.report == ReportFormat::Console && !args.emit_events {
        announce_banner(args.mode);
    }

    match args.mode {
        Mode::Live => run_live_mode(&args).await,
        Mode::Analyze => run_analyze_mode(&args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn announce_banner(mode: Mode) {
    let subtitle = match mode {
        Mode::Live => "live",
        Mode::Analyze => "analyze",
    };
    println!("{} {}", "🎲 Dicestream".bright_cyan().bold(), subtitle.cyan());
    println!("{}", "================================".cyan());
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let seed = DiceSource::from_entropy().seed();
        log::info!("no seed given, using {seed}");
        seed
    })
}

fn live_options(args: &Args, clear_screen: bool) -> LiveOptions {
    LiveOptions {
        seed: resolve_seed(args.seed),
        delay: Duration::from_millis(args.delay_ms),
        max_rolls: args.max_rolls,
        snapshot: SnapshotConfig::new(args.snapshot_every, &args.snapshot_path),
        emit_events: args.emit_events,
        draw_frames: args.report != ReportFormat::Json,
        clear_screen,
    }
}

fn analyzer_config(args: &Args) -> AnalyzerConfig {
    let input = args.input.clone().unwrap_or_else(|| args.snapshot_path.clone());
    AnalyzerConfig::new(input, &args.out_dir)
}

async fn run_live_mode(args: &Args) -> Result<()> {
    let clear_screen = args.output.is_none() && stdout().is_terminal();
    let options = live_options(args, clear_screen);
    let commands = spawn_stdin_reader();
    let (interrupt_tx, interrupt) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(());
        }
    });

    let mut output_target = OutputTarget::new(args.output.clone())?;
    let summary = run_live(&options, commands, interrupt, &mut output_target).await?;

    match args.report {
        // Keeps the event stream one JSON document per line.
        ReportFormat::Json if args.emit_events => {
            reports::generate_json_line_report(&mut output_target, &summary)?;
        }
        ReportFormat::Json => reports::generate_json_report(&mut output_target, &summary)?,
        ReportFormat::Console if !args.emit_events => {
            reports::generate_live_console_report(&mut output_target, &summary)?;
        }
        ReportFormat::Console => {}
    }
    output_target.flush_inner()?;
    Ok(())
}

fn run_analyze_mode(args: &Args) -> Result<()> {
    let config = analyzer_config(args);
    let report = Analyzer::new(config.clone())
        .run()
        .with_context(|| format!("failed to analyze {}", config.input.display()))?;

    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, &report)?,
        ReportFormat::Console => {
            reports::generate_analysis_console_report(&mut output_target, &report)?;
        }
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
