use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_TTL_HOURS;
use crate::files::{ScanOptions, EXCLUDED_DIRS, SOURCE_EXTENSIONS};
use crate::ranker::{
    RankerOptions, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_LINES,
    DEFAULT_MAX_LINES_PRIORITY,
};

pub const PROJECT_CONFIG_FILE: &str = ".vibe-auditor.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub ranker: RankerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "CacheConfig::default_ttl_hours")]
    pub ttl_hours: i64,
}

impl CacheConfig {
    fn default_ttl_hours() -> i64 {
        DEFAULT_TTL_HOURS
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: Self::default_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankerConfig {
    #[serde(default = "RankerConfig::default_max_files")]
    pub max_files: usize,
    #[serde(default = "RankerConfig::default_max_lines")]
    pub max_lines: usize,
    /// Snapshot cap for entrypoint/server/config-style files.
    #[serde(default = "RankerConfig::default_max_lines_priority")]
    pub max_lines_priority: usize,
    #[serde(default = "RankerConfig::default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default)]
    pub respect_gitignore: bool,
    #[serde(default = "RankerConfig::default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "RankerConfig::default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

impl RankerConfig {
    fn default_max_files() -> usize {
        DEFAULT_MAX_FILES
    }
    fn default_max_lines() -> usize {
        DEFAULT_MAX_LINES
    }
    fn default_max_lines_priority() -> usize {
        DEFAULT_MAX_LINES_PRIORITY
    }
    fn default_max_file_bytes() -> u64 {
        DEFAULT_MAX_FILE_BYTES
    }
    fn default_extensions() -> Vec<String> {
        SOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    }
    fn default_exclude_dirs() -> Vec<String> {
        EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect()
    }
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            max_files: Self::default_max_files(),
            max_lines: Self::default_max_lines(),
            max_lines_priority: Self::default_max_lines_priority(),
            max_file_bytes: Self::default_max_file_bytes(),
            respect_gitignore: false,
            extensions: Self::default_extensions(),
            exclude_dirs: Self::default_exclude_dirs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn bool_true() -> bool {
    true
}

impl Config {
    /// Effective config for `project`: project file, then user file, then defaults.
    pub fn load(project: &Path) -> Result<Self> {
        match resolve_config_path(project) {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Write the default config into `project`. Refuses to overwrite.
    pub fn create_default(project: &Path) -> Result<PathBuf> {
        let path = project.join(PROJECT_CONFIG_FILE);
        if path.exists() {
            anyhow::bail!("Config already exists: {}", path.display());
        }
        Config::default().save_to(&path)?;
        Ok(path)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::hours(self.cache.ttl_hours.max(0))
    }

    pub fn ranker_options(&self) -> RankerOptions {
        RankerOptions {
            scan: ScanOptions {
                extensions: self
                    .ranker
                    .extensions
                    .iter()
                    .map(|e| e.trim_start_matches('.').to_lowercase())
                    .collect(),
                exclude_dirs: self.ranker.exclude_dirs.clone(),
                respect_gitignore: self.ranker.respect_gitignore,
            },
            max_lines: self.ranker.max_lines,
            max_lines_priority: self.ranker.max_lines_priority,
            max_file_bytes: self.ranker.max_file_bytes,
        }
    }
}

fn user_config_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("vibe-auditor").join("config.toml")
}

fn resolve_config_path(project: &Path) -> Option<PathBuf> {
    let project_file = project.join(PROJECT_CONFIG_FILE);
    if project_file.exists() {
        return Some(project_file);
    }
    let user_file = user_config_path();
    user_file.exists().then_some(user_file)
}

pub fn show_config(project: &Path) -> Result<()> {
    match resolve_config_path(project) {
        Some(path) => {
            println!("Config: {}", path.display());
            println!();
            let config = Config::load_from(&path)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        None => {
            println!("Config: {}", project.join(PROJECT_CONFIG_FILE).display());
            println!();
            println!("(default config, file not created)");
            println!();
            println!("{}", toml::to_string_pretty(&Config::default())?);
        }
    }

    Ok(())
}
