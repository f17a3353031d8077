use anyhow::{Context, Result};
use colored::Colorize;
use std::fs::File;
use std::path::Path;
use vibe_auditor::config::Config;
use vibe_auditor::history::{HistoryStore, IssueSummary, SeverityCounts, Trend, TrendReport};

use crate::display::{self, OutputFormat};
use crate::HistoryAction;

pub fn run(action: HistoryAction, project: &Path, config: &Config, format: OutputFormat) -> Result<()> {
    let store = HistoryStore::for_project(project);

    match action {
        HistoryAction::Record {
            mode,
            critical,
            warning,
            info,
            ai_critical,
            ai_warning,
            ai_info,
        } => {
            if !config.history.enabled {
                println!("History disabled in config, run not recorded");
                return Ok(());
            }
            let static_summary =
                IssueSummary::from_counts(SeverityCounts::new(critical, warning, info));
            let ai_summary = if ai_critical.is_some() || ai_warning.is_some() || ai_info.is_some() {
                Some(IssueSummary::from_counts(SeverityCounts::new(
                    ai_critical.unwrap_or(0),
                    ai_warning.unwrap_or(0),
                    ai_info.unwrap_or(0),
                )))
            } else {
                None
            };
            store
                .save_result(&mode, &static_summary, ai_summary.as_ref())
                .context("Failed to save analysis result to history")?;
            println!("Recorded {} run", mode);
            Ok(())
        }
        HistoryAction::Show { limit } => show(&store, limit, format),
        HistoryAction::Trend => show_trend(&store.get_trend_data(), format),
        HistoryAction::Export { output, csv } => {
            if csv {
                let file = File::create(&output)
                    .with_context(|| format!("Failed to create {}", output.display()))?;
                store
                    .export_timeline_csv(file)
                    .context("Failed to export timeline")?;
            } else {
                store
                    .export_history(&output)
                    .context("Failed to export history")?;
            }
            println!("Exported history to {}", output.display());
            Ok(())
        }
        HistoryAction::Clear => {
            store.clear_history().context("Failed to clear history")?;
            println!("History cleared");
            Ok(())
        }
    }
}

fn show(store: &HistoryStore, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let history = store.get_history(limit);
    if format == OutputFormat::Json {
        return display::print_json(&history);
    }

    if history.is_empty() {
        println!("No history yet.");
        println!("Record a run with `vibe-auditor history record`.");
        return Ok(());
    }

    display::title("Audit History");
    println!(
        "{:<20} {:<12} {:>6} {:>8} {:>8} {:>6}",
        "Date", "Mode", "Total", "Critical", "Warning", "Info"
    );
    println!("{}", display::separator(65));
    for entry in &history {
        let sev = &entry.summary.by_severity;
        println!(
            "{:<20} {:<12} {:>6} {:>8} {:>8} {:>6}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.mode,
            entry.summary.total_issues,
            sev.critical,
            sev.warning,
            sev.info
        );
    }
    Ok(())
}

fn show_trend(trend: &TrendReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return display::print_json(trend);
    }

    if trend.trend == Trend::NoData {
        println!("No history yet.");
        return Ok(());
    }

    let label = match trend.trend {
        Trend::Improving => trend.trend.as_str().green().bold(),
        Trend::Declining => trend.trend.as_str().red().bold(),
        _ => trend.trend.as_str().normal(),
    };

    display::title("Issue Trend");
    println!("Runs:      {}", trend.total_runs);
    println!("Trend:     {}", label);
    println!("Current:   {}", trend.current_issues);
    println!("Previous:  {}", trend.previous_issues);
    println!("Change:    {:+} ({:+.1}%)", trend.change, trend.change_percent);

    display::section("Timeline:");
    for point in &trend.timeline {
        println!(
            "  {}  {:>5}  (c:{} w:{} i:{})",
            point.timestamp.format("%Y-%m-%d %H:%M"),
            point.total_issues,
            point.critical,
            point.warning,
            point.info
        );
    }
    Ok(())
}
