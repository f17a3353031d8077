use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use vibe_auditor::cache::{CacheLookup, ResultCache};
use vibe_auditor::config::Config;
use vibe_auditor::files::scan_project;

use crate::display::{self, OutputFormat};
use crate::CacheAction;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    key: &'a str,
    hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
}

pub fn run(action: CacheAction, project: &Path, config: &Config, format: OutputFormat) -> Result<()> {
    let cache = ResultCache::for_project(project, config.cache_ttl());

    match action {
        CacheAction::Stats => show_stats(&cache, format),
        CacheAction::Check { key } => check(&cache, project, config, &key, format),
        CacheAction::Clear { key } => {
            cache
                .invalidate(key.as_deref())
                .context("Failed to clear cache")?;
            match key {
                Some(key) => println!("Removed cache entry '{}'", key),
                None => println!("Cache cleared"),
            }
            Ok(())
        }
        CacheAction::Cleanup => {
            let removed = cache
                .cleanup_expired()
                .context("Failed to remove expired cache entries")?;
            println!("Removed {} expired entr{}", removed, if removed == 1 { "y" } else { "ies" });
            Ok(())
        }
    }
}

fn show_stats(cache: &ResultCache, format: OutputFormat) -> Result<()> {
    let stats = cache.stats();
    if format == OutputFormat::Json {
        return display::print_json(&stats);
    }

    display::title("Result Cache");
    println!("Path:     {}", cache.cache_file().display());
    println!("TTL:      {}h", cache.ttl().num_hours());
    println!("Entries:  {}", stats.total_entries);
    println!("Size:     {}", display::format_size(stats.cache_file_size));

    if stats.entries.is_empty() {
        return Ok(());
    }

    display::section("Entries:");
    for entry in &stats.entries {
        let state = if entry.is_expired {
            "expired".yellow()
        } else {
            "fresh".green()
        };
        println!(
            "  {:<32} {:>7}  {}",
            entry.key,
            display::format_age(entry.age_hours),
            state
        );
    }
    Ok(())
}

fn check(
    cache: &ResultCache,
    project: &Path,
    config: &Config,
    key: &str,
    format: OutputFormat,
) -> Result<()> {
    if !config.cache.enabled {
        println!("Cache disabled in config");
        return Ok(());
    }

    let files = scan_project(project, &config.ranker_options().scan);
    let report = match cache.get(key, Some(&files)) {
        CacheLookup::Hit(result) => CheckReport {
            key,
            hit: true,
            reason: None,
            result: Some(result),
        },
        CacheLookup::Miss(reason) => CheckReport {
            key,
            hit: false,
            reason: Some(reason.to_string()),
            result: None,
        },
    };

    if format == OutputFormat::Json {
        return display::print_json(&report);
    }

    if report.hit {
        println!("{} {} ({} files checked)", "hit".green().bold(), key, files.len());
    } else {
        println!(
            "{} {} ({})",
            "miss".yellow().bold(),
            key,
            report.reason.as_deref().unwrap_or("absent")
        );
    }
    Ok(())
}
