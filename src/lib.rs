//! Result caching, file ranking and audit history for vibe-auditor.
//!
//! Everything persisted lives inside the audited project
//! (`.vibe-auditor-cache/`, `.vibe-auditor-history/`).

pub mod cache;
pub mod config;
pub mod error;
pub mod files;
pub mod history;
mod json_store;
pub mod logging;
pub mod ranker;

pub use cache::{CacheLookup, MissReason, ResultCache};
pub use error::{StoreError, StoreResult};
pub use files::{scan_project, ProjectFileDescriptor, ScanOptions};
pub use history::{HistoryStore, IssueSummary, SeverityCounts, Trend, TrendReport};
pub use ranker::{FileRanker, FileScore, RankerOptions};
