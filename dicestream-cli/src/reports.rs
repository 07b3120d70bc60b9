use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use dicestream_core::AnalysisReport;
use dicestream_core::constants::CHI2_CRIT_5PCT;

use crate::live::{LiveOutcome, LiveSummary};

pub fn generate_json_report<W: Write + ?Sized, T: Serialize>(
    writer: &mut W,
    value: &T,
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(value)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

/// Compact single-line form, for output that already carries JSON lines.
pub fn generate_json_line_report<W: Write + ?Sized, T: Serialize>(
    writer: &mut W,
    value: &T,
) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string(value)?)?;
    Ok(())
}

pub fn generate_live_console_report<W: Write + ?Sized>(
    writer: &mut W,
    summary: &LiveSummary,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "🎲 Live Session Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "=======================".cyan())?;

    let outcome = match summary.outcome {
        LiveOutcome::Completed => "completed".green(),
        LiveOutcome::Stopped => "stopped".yellow(),
        LiveOutcome::Quit => "quit".yellow(),
        LiveOutcome::InputClosed => "input closed".yellow(),
    };
    writeln!(writer, "Outcome: {outcome}")?;
    writeln!(writer, "Seed: {}", summary.seed)?;
    writeln!(writer, "Rolls: {}", summary.rolls)?;
    if summary.ignored > 0 {
        writeln!(writer, "Ignored events: {}", summary.ignored.to_string().red())?;
    }
    writeln!(
        writer,
        "Snapshots written: {} -> {}",
        summary.snapshots_written,
        summary.snapshot_path.display()
    )?;
    let elapsed = summary.finished_at - summary.started_at;
    writeln!(writer, "Elapsed: {}ms", elapsed.num_milliseconds())?;
    writeln!(writer)?;

    writeln!(writer, "{:>6} {:>8} {:>10}", "face", "count", "proportion")?;
    for (face, count) in summary.view.counts.iter() {
        writeln!(
            writer,
            "{:>6} {:>8} {:>10.4}",
            face,
            count,
            summary.view.proportions[face.index()]
        )?;
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "chi2: {}  max_abs_dev: {:.4}",
        chi2_label(summary.stats.chi2),
        summary.stats.max_abs_dev
    )?;
    Ok(())
}

pub fn generate_analysis_console_report<W: Write + ?Sized>(
    writer: &mut W,
    report: &AnalysisReport,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Final snapshot per run".bright_cyan().bold())?;
    writeln!(writer, "{}", "=========================".cyan())?;
    writeln!(
        writer,
        "Rows read: {} from {} ({} run(s))",
        report.rows_read,
        report.input.display(),
        report.run_count
    )?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:>4} {:>8} {:>12} {:>12} {:>16}",
        "run", "n", "chi2", "max_abs_dev", "n_at_first_pass"
    )?;
    for summary in &report.summaries {
        let first_pass = summary
            .n_at_first_pass
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        writeln!(
            writer,
            "{:>4} {:>8} {:>12.4} {:>12.4} {:>16}",
            summary.run, summary.n, summary.chi2, summary.max_abs_dev, first_pass
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "{}", "📁 Files written".bright_yellow().bold())?;
    writeln!(writer, "   {}", report.distribution_chart.display())?;
    writeln!(writer, "   {}", report.trend_chart.display())?;
    writeln!(writer, "   {}", report.summary_csv.display())?;
    Ok(())
}

fn chi2_label(chi2: f64) -> colored::ColoredString {
    let text = format!("{chi2:.3}");
    if chi2 < CHI2_CRIT_5PCT {
        text.green()
    } else {
        text.red()
    }
}
