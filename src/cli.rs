use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

use crate::backup::parse_timestamp;
use crate::model::{Repetition, Shift, ShiftColor, ShiftId, ShiftTemplate};
use crate::stats::ShiftStats;
use crate::store::{EditScope, ShiftStore};

#[derive(Debug, Parser)]
#[command(name = "shiftbook")]
#[command(about = "Plan recurring work shifts")]
#[command(
    after_help = "Environment:\n  SHIFTBOOK_DATA_DIR   Journal directory (./data)\n  SHIFTBOOK_TIMEZONE   Default IANA zone (UTC)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upcoming shifts, or every shift touching one day.
    List {
        #[arg(long)]
        day: Option<NaiveDate>,
        /// Include shifts that already ended.
        #[arg(long, default_value_t = false)]
        all: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Add a shift; with --every, a recurring series.
    Add {
        title: String,
        /// RFC 3339, or local `YYYY-MM-DDTHH:MM` in the default zone.
        start: String,
        end: String,
        #[arg(long, default_value = "sky")]
        color: ShiftColor,
        /// `<interval>:<days|weeks|months|year>`, e.g. `2:weeks`.
        #[arg(long, value_parser = Repetition::parse)]
        every: Option<Repetition>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        overtime: Option<f64>,
    },
    /// Delete a shift, or with --series every shift of its series.
    Delete {
        id: String,
        #[arg(long, default_value_t = false)]
        series: bool,
    },
    /// Totals over an inclusive date range (default: recent days).
    Stats {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    /// Write the collection as JSON to FILE, or stdout.
    Export { file: Option<PathBuf> },
    /// Replace the collection with a JSON backup.
    Import { file: PathBuf },
    /// Delete every shift.
    Reset,
}

/// Execute one command against `store`, writing human output to `out`.
pub async fn run(
    command: Command,
    store: &ShiftStore,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let tz = store.settings().timezone;
    match command {
        Command::List { day, all, limit } => {
            let shifts = match (day, all) {
                (Some(day), _) => store.on_day(day).await,
                (None, true) => store.list().await,
                (None, false) => store.upcoming().await,
            };
            let shown = limit.unwrap_or(shifts.len());
            for shift in shifts.iter().take(shown) {
                writeln!(out, "{}", format_shift(shift, tz))?;
            }
            if shifts.len() > shown {
                writeln!(out, "... {} more", shifts.len() - shown)?;
            }
        }
        Command::Add {
            title,
            start,
            end,
            color,
            every,
            notes,
            overtime,
        } => {
            let start = parse_timestamp(&start, tz).ok_or_else(|| format!("invalid start: {start}"))?;
            let end = parse_timestamp(&end, tz).ok_or_else(|| format!("invalid end: {end}"))?;
            let mut template = ShiftTemplate::new(title, start, end);
            template.color = color;
            template.notes = notes;
            template.overtime_hours = overtime;

            let added = store.add_shift(template, every).await?;
            if let Some(first) = added.first() {
                writeln!(out, "added {} shift(s) in series {}", added.len(), first.series_id)?;
                writeln!(out, "{}", format_shift(first, tz))?;
            }
        }
        Command::Delete { id, series } => {
            let removed = store
                .remove(&ShiftId::from(id.as_str()), EditScope::from_flag(series))
                .await?;
            writeln!(out, "deleted {removed} shift(s)")?;
        }
        Command::Stats { from, to } => {
            let stats = match (from, to) {
                (Some(from), Some(to)) => store.stats(from, to).await,
                (Some(from), None) => store.stats(from, from).await,
                _ => store.recent_stats().await,
            };
            write_stats(out, &stats)?;
        }
        Command::Export { file } => {
            let json = store.export_json().await?;
            match file {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    writeln!(out, "exported {} shift(s) to {}", store.len().await, path.display())?;
                }
                None => writeln!(out, "{json}")?,
            }
        }
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file)?;
            let report = store.import_json(&text).await?;
            writeln!(
                out,
                "imported {} shift(s), rejected {}",
                report.imported, report.rejected
            )?;
        }
        Command::Reset => {
            let removed = store.delete_all().await;
            writeln!(out, "deleted {removed} shift(s)")?;
        }
    }
    Ok(())
}

fn format_shift(shift: &Shift, default_tz: Tz) -> String {
    let tz = shift.timezone.unwrap_or(default_tz);
    let start = shift.start.with_timezone(&tz);
    let end = shift.end.with_timezone(&tz);
    let mut line = format!(
        "{}  {} -> {}  {} [{}]",
        shift.id,
        start.format("%Y-%m-%d %H:%M"),
        end.format("%Y-%m-%d %H:%M"),
        shift.title,
        shift.color.as_str(),
    );
    if let Some(rule) = &shift.repetition {
        line.push_str(&format!(" every {} {}", rule.interval, rule.frequency.as_str()));
    }
    line
}

fn write_stats(out: &mut impl Write, stats: &ShiftStats) -> std::io::Result<()> {
    writeln!(out, "shifts: {}", stats.total_shifts)?;
    writeln!(out, "hours: {:.2}", stats.total_hours)?;
    writeln!(out, "overtime: {:.2}", stats.total_overtime)?;
    for (title, count) in &stats.shifts_by_title {
        writeln!(out, "  {title}: {count}")?;
    }
    for (name, amount) in &stats.allowances_by_name {
        writeln!(out, "  allowance {name}: {amount:.2}")?;
    }
    Ok(())
}
