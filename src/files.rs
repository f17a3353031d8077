//! Project file descriptors and the source-tree walk shared by the cache
//! (project hash input) and the ranker (eligibility pass).

use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Source extensions considered by default (lowercase, no dot).
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "go", "rs", "java", "kt", "kts", "php", "cs", "rb", "swift",
];

/// Directory names never descended into by default.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "venv",
    ".venv",
    ".git",
    "__pycache__",
    "build",
    "dist",
    "target",
    "vendor",
    ".vibe-auditor-cache",
    ".vibe-auditor-history",
];

/// One file of a project snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFileDescriptor {
    /// Relative to the project root, `/`-separated.
    pub path: String,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
    /// Lowercase, without the leading dot. Empty when the file has none.
    pub extension: String,
}

impl ProjectFileDescriptor {
    pub fn new(
        path: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        size_bytes: u64,
        modified: SystemTime,
    ) -> Self {
        let path = normalize_rel_path(Path::new(&path.into()));
        let extension = extension_of(Path::new(&path));
        Self {
            path,
            absolute_path: absolute_path.into(),
            size_bytes,
            modified,
            extension,
        }
    }

    /// Stat `absolute_path` and describe it relative to `root`.
    /// Returns `None` when the file cannot be stat'ed or lies outside `root`.
    pub fn from_fs(root: &Path, absolute_path: &Path) -> Option<Self> {
        let rel = absolute_path.strip_prefix(root).ok()?;
        let metadata = fs::metadata(absolute_path).ok()?;
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        Some(Self::new(
            normalize_rel_path(rel),
            absolute_path,
            metadata.len(),
            modified,
        ))
    }

    pub fn modified_ns(&self) -> u128 {
        self.modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    }

    /// Number of path segments from the root; a root-level file has depth 1.
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|s| !s.is_empty()).count()
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    /// Apply `.gitignore`/`.ignore` rules on top of `exclude_dirs`. Off by default:
    /// eligibility is decided by extension and excluded directories only.
    pub respect_gitignore: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: SOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            respect_gitignore: false,
        }
    }
}

impl ScanOptions {
    pub fn accepts_extension(&self, extension: &str) -> bool {
        !extension.is_empty() && self.extensions.iter().any(|e| e == extension)
    }
}

/// Walk `root` and describe every source file that passes `options`.
///
/// Entries are visited sorted by file name within each directory, so the
/// returned order is stable for an unchanged tree. Unreadable entries are skipped.
pub fn scan_project(root: &Path, options: &ScanOptions) -> Vec<ProjectFileDescriptor> {
    let mut files = Vec::new();

    for entry in build_walker(root, options).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable walk entry");
                continue;
            }
        };

        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let Some(descriptor) = ProjectFileDescriptor::from_fs(root, entry.path()) else {
            debug!(path = %entry.path().display(), "skipping file without metadata");
            continue;
        };

        if !options.accepts_extension(&descriptor.extension) {
            continue;
        }

        files.push(descriptor);
    }

    files
}

fn build_walker(root: &Path, options: &ScanOptions) -> WalkBuilder {
    let excluded = options.exclude_dirs.clone();
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .parents(options.respect_gitignore)
        .ignore(options.respect_gitignore)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !excluded.iter().any(|dir| dir == name.as_ref())
        });
    builder
}

fn normalize_rel_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut rel = normalized.as_str();
    while let Some(rest) = rel.strip_prefix("./") {
        rel = rest;
    }
    rel.to_string()
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
