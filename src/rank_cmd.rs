use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use vibe_auditor::config::Config;
use vibe_auditor::ranker::{FileRanker, FileScore, ScoreBreakdown};

use crate::display::{self, OutputFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RankedFile<'a> {
    path: &'a str,
    score: f64,
    line_count: usize,
    snapshot_lines: usize,
    breakdown: &'a ScoreBreakdown,
}

impl<'a> From<&'a FileScore> for RankedFile<'a> {
    fn from(file: &'a FileScore) -> Self {
        Self {
            path: &file.descriptor.path,
            score: file.score,
            line_count: file.breakdown.line_count,
            snapshot_lines: vibe_auditor::ranker::count_lines(&file.content_snapshot),
            breakdown: &file.breakdown,
        }
    }
}

/// Print `rounds` successive batches of the top files; each batch skips
/// everything returned by earlier ones.
pub fn run(
    project: &Path,
    config: &Config,
    max_files: Option<usize>,
    rounds: usize,
    explain: bool,
    format: OutputFormat,
) -> Result<()> {
    let max_files = max_files.unwrap_or(config.ranker.max_files);
    let mut ranker = FileRanker::new(config.ranker_options());

    let mut batches = Vec::new();
    for _ in 0..rounds.max(1) {
        let batch = ranker.select_top_files(project, max_files, true);
        if batch.is_empty() {
            break;
        }
        batches.push(batch);
    }

    if format == OutputFormat::Json {
        let view: Vec<Vec<RankedFile>> = batches
            .iter()
            .map(|batch| batch.iter().map(RankedFile::from).collect())
            .collect();
        return display::print_json(&view);
    }

    if batches.is_empty() {
        println!("No eligible source files under {}", project.display());
        return Ok(());
    }

    display::title("File Ranking");
    let mut rank = 0;
    for (i, batch) in batches.iter().enumerate() {
        if batches.len() > 1 {
            display::section(&format!("Round {}:", i + 1));
        }
        for file in batch {
            rank += 1;
            let marker = if file.breakdown.tiers.is_high_priority() {
                "*".cyan().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "{:>3}. {:>7.1} {} {}",
                rank, file.score, marker, file.descriptor.path
            );
            if explain {
                print_breakdown(&file.breakdown);
            }
        }
    }
    Ok(())
}

fn print_breakdown(b: &ScoreBreakdown) {
    println!(
        "            {} role {:+.0}  depth {:+.0}  density {:+.0}  size {:+.0}  ({} fn, {} types, {} imports, {} lines)",
        "└".dimmed(),
        b.role,
        b.depth,
        b.density,
        b.size,
        b.declarations.functions,
        b.declarations.types,
        b.declarations.imports,
        b.line_count
    );
}
