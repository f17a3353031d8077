//! File-importance ranking for AI review sampling.
//!
//! Every eligible source file gets an additive score from four independent
//! signals (filename role, path depth, declaration density, size band). The
//! ranker returns the top N and remembers what it returned, so repeated calls
//! with `skip_already_selected` walk down the ranking batch by batch.

pub mod patterns;

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::files::{scan_project, ProjectFileDescriptor, ScanOptions};
use patterns::{
    classify_name, count_declarations, density_score, role_adjustment, DeclarationCounts,
    RoleMatch,
};

pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_MAX_LINES: usize = 500;
pub const DEFAULT_MAX_LINES_PRIORITY: usize = 1000;
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

const SIZE_BAND_MIN_LINES: usize = 50;
const SIZE_BAND_MAX_LINES: usize = 500;
const SIZE_BAND_MAX_LINES_PRIORITY: usize = 1000;
const SIZE_BONUS_IN_BAND: f64 = 20.0;
const SIZE_BONUS_OVER_BAND: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct RankerOptions {
    pub scan: ScanOptions,
    /// Snapshot line cap for ordinary files.
    pub max_lines: usize,
    /// Snapshot line cap for high-priority (role tier) files.
    pub max_lines_priority: usize,
    /// Larger files are skipped without being read.
    pub max_file_bytes: u64,
}

impl Default for RankerOptions {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            max_lines: DEFAULT_MAX_LINES,
            max_lines_priority: DEFAULT_MAX_LINES_PRIORITY,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Per-signal contributions behind a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub role: f64,
    pub depth: f64,
    pub density: f64,
    pub size: f64,
    pub tiers: RoleMatch,
    pub declarations: DeclarationCounts,
    pub line_count: usize,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.role + self.depth + self.density + self.size
    }
}

#[derive(Debug, Clone)]
pub struct FileScore {
    pub descriptor: ProjectFileDescriptor,
    pub score: f64,
    /// Line-capped file content captured while scoring.
    pub content_snapshot: String,
    pub breakdown: ScoreBreakdown,
}

/// `max(0, 50 - 10 * depth)`; a root-level file has depth 1.
pub fn depth_score(depth: usize) -> f64 {
    (50.0 - 10.0 * depth as f64).max(0.0)
}

pub fn size_score(line_count: usize, high_priority: bool) -> f64 {
    let upper = if high_priority {
        SIZE_BAND_MAX_LINES_PRIORITY
    } else {
        SIZE_BAND_MAX_LINES
    };
    if line_count > upper {
        SIZE_BONUS_OVER_BAND
    } else if line_count >= SIZE_BAND_MIN_LINES {
        SIZE_BONUS_IN_BAND
    } else {
        0.0
    }
}

/// Score one file from its relative path and full content.
pub fn score_file(rel_path: &str, content: &str) -> ScoreBreakdown {
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    let depth = rel_path.split('/').filter(|s| !s.is_empty()).count();

    let tiers = classify_name(file_name);
    let declarations = count_declarations(content);
    let line_count = count_lines(content);

    ScoreBreakdown {
        role: role_adjustment(&tiers),
        depth: depth_score(depth),
        density: density_score(&declarations),
        size: size_score(line_count, tiers.is_high_priority()),
        tiers,
        declarations,
        line_count,
    }
}

pub fn count_lines(content: &str) -> usize {
    let bytes = content.as_bytes();
    let newlines = memchr::memchr_iter(b'\n', bytes).count();
    if bytes.last().is_some_and(|&b| b != b'\n') {
        newlines + 1
    } else {
        newlines
    }
}

/// First `limit` lines of `content`, line terminators included.
pub fn truncate_lines(content: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    match memchr::memchr_iter(b'\n', content.as_bytes()).nth(limit - 1) {
        Some(idx) => &content[..=idx],
        None => content,
    }
}

pub struct FileRanker {
    options: RankerOptions,
    analyzed: HashSet<String>,
}

impl Default for FileRanker {
    fn default() -> Self {
        Self::new(RankerOptions::default())
    }
}

impl FileRanker {
    pub fn new(options: RankerOptions) -> Self {
        Self {
            options,
            analyzed: HashSet::new(),
        }
    }

    pub fn options(&self) -> &RankerOptions {
        &self.options
    }

    /// Paths returned by earlier calls on this instance.
    pub fn analyzed(&self) -> &HashSet<String> {
        &self.analyzed
    }

    pub fn reset(&mut self) {
        self.analyzed.clear();
    }

    /// Score every eligible file under `root` and return the best `max_files`,
    /// highest first. Ties keep traversal order. Selected paths are remembered;
    /// with `skip_already_selected` they are excluded from later calls.
    pub fn select_top_files(
        &mut self,
        root: &Path,
        max_files: usize,
        skip_already_selected: bool,
    ) -> Vec<FileScore> {
        let mut scored = self.score_eligible(root, skip_already_selected);

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(max_files);

        for file in &scored {
            self.analyzed.insert(file.descriptor.path.clone());
        }
        debug!(
            root = %root.display(),
            selected = scored.len(),
            seen = self.analyzed.len(),
            "ranked files"
        );
        scored
    }

    fn score_eligible(&self, root: &Path, skip_already_selected: bool) -> Vec<FileScore> {
        let mut scored = Vec::new();

        for descriptor in scan_project(root, &self.options.scan) {
            if skip_already_selected && self.analyzed.contains(&descriptor.path) {
                continue;
            }
            if descriptor.size_bytes > self.options.max_file_bytes {
                debug!(path = %descriptor.path, size = descriptor.size_bytes, "skipping oversized file");
                continue;
            }

            let content = match fs::read_to_string(&descriptor.absolute_path) {
                Ok(content) => content,
                Err(err) => {
                    debug!(path = %descriptor.path, error = %err, "skipping unreadable file");
                    continue;
                }
            };
            if content.trim().is_empty() {
                continue;
            }

            let breakdown = score_file(&descriptor.path, &content);
            let cap = if breakdown.tiers.is_high_priority() {
                self.options.max_lines_priority
            } else {
                self.options.max_lines
            };
            let content_snapshot = truncate_lines(&content, cap).to_string();

            scored.push(FileScore {
                score: breakdown.total(),
                descriptor,
                content_snapshot,
                breakdown,
            });
        }

        scored
    }
}
