//! Append-only audit history in `{project}/.vibe-auditor-history/history.json`
//! plus the trend summary derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::ops::Add;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::json_store;

pub const HISTORY_DIR_NAME: &str = ".vibe-auditor-history";
pub const HISTORY_FILE_NAME: &str = "history.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(default)]
    pub critical: u64,
    #[serde(default)]
    pub warning: u64,
    #[serde(default)]
    pub info: u64,
}

impl SeverityCounts {
    pub fn new(critical: u64, warning: u64, info: u64) -> Self {
        Self {
            critical,
            warning,
            info,
        }
    }

    pub fn total(&self) -> u64 {
        self.critical
            .saturating_add(self.warning)
            .saturating_add(self.info)
    }
}

impl Add for SeverityCounts {
    type Output = SeverityCounts;

    fn add(self, rhs: SeverityCounts) -> SeverityCounts {
        SeverityCounts {
            critical: self.critical.saturating_add(rhs.critical),
            warning: self.warning.saturating_add(rhs.warning),
            info: self.info.saturating_add(rhs.info),
        }
    }
}

/// What a caller reports for one analysis pass (static or AI).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub total_issues: u64,
    pub by_severity: SeverityCounts,
}

impl IssueSummary {
    /// Summary whose total is the sum of its severity counts.
    pub fn from_counts(by_severity: SeverityCounts) -> Self {
        Self {
            total_issues: by_severity.total(),
            by_severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_issues: u64,
    #[serde(default)]
    pub static_issues: u64,
    #[serde(default)]
    pub ai_issues: u64,
    pub by_severity: SeverityCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub mode: String,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    NoData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
            Trend::NoData => "no_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    pub total_issues: u64,
    pub critical: u64,
    pub warning: u64,
    pub info: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub total_runs: usize,
    pub trend: Trend,
    pub current_issues: u64,
    pub previous_issues: u64,
    pub change: i64,
    pub change_percent: f64,
    /// Oldest first, for plotting.
    pub timeline: Vec<TimelinePoint>,
}

impl TrendReport {
    fn empty() -> Self {
        Self {
            total_runs: 0,
            trend: Trend::NoData,
            current_issues: 0,
            previous_issues: 0,
            change: 0,
            change_percent: 0.0,
            timeline: Vec::new(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryExport<'a> {
    project_path: String,
    export_timestamp: DateTime<Utc>,
    total_runs: usize,
    trend: &'a TrendReport,
    history: &'a [HistoryEntry],
}

pub struct HistoryStore {
    project_root: PathBuf,
    history_file: PathBuf,
}

impl HistoryStore {
    /// History persisted in `history_dir/history.json`; `project_root` is only
    /// recorded in exports.
    pub fn new(project_root: impl Into<PathBuf>, history_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            history_file: history_dir.into().join(HISTORY_FILE_NAME),
        }
    }

    /// History stored under `{project_root}/.vibe-auditor-history/`.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root, project_root.join(HISTORY_DIR_NAME))
    }

    pub fn history_file(&self) -> &Path {
        &self.history_file
    }

    /// Append one run combining the static summary with the optional AI summary.
    pub fn save_result(
        &self,
        mode: &str,
        static_summary: &IssueSummary,
        ai_summary: Option<&IssueSummary>,
    ) -> StoreResult<()> {
        self.append(HistoryEntry {
            timestamp: Utc::now(),
            mode: mode.to_string(),
            summary: combine(static_summary, ai_summary),
        })
    }

    /// Entries newest first, truncated to `limit` when given.
    pub fn get_history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let mut history = self.load();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        history
    }

    pub fn get_trend_data(&self) -> TrendReport {
        trend_of(self.chronological())
    }

    /// Irrecoverably delete every entry.
    pub fn clear_history(&self) -> StoreResult<()> {
        warn!(path = %self.history_file.display(), "clearing all history data");
        if json_store::remove_if_exists(&self.history_file)? {
            info!("history cleared");
        }
        Ok(())
    }

    /// Write history plus trend to `output` as pretty JSON.
    pub fn export_history(&self, output: &Path) -> StoreResult<()> {
        let history = self.load();
        let trend = trend_of(self.chronological());
        let export = HistoryExport {
            project_path: self.project_root.display().to_string(),
            export_timestamp: Utc::now(),
            total_runs: history.len(),
            trend: &trend,
            history: &history,
        };
        json_store::write_atomic(output, &export)?;
        info!(path = %output.display(), runs = history.len(), "history exported");
        Ok(())
    }

    /// Timeline as CSV: `timestamp,total_issues,critical,warning,info`, oldest first.
    pub fn export_timeline_csv<W: Write>(&self, writer: W) -> StoreResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["timestamp", "total_issues", "critical", "warning", "info"])?;
        for point in self.get_trend_data().timeline {
            csv.write_record([
                point.timestamp.to_rfc3339(),
                point.total_issues.to_string(),
                point.critical.to_string(),
                point.warning.to_string(),
                point.info.to_string(),
            ])?;
        }
        csv.flush()
            .map_err(|e| crate::error::StoreError::io(&self.history_file, e))?;
        Ok(())
    }

    pub(crate) fn append(&self, entry: HistoryEntry) -> StoreResult<()> {
        let mut history = self.load();
        history.push(entry);
        json_store::write_atomic(&self.history_file, &history)?;
        info!(entries = history.len(), "analysis result saved to history");
        Ok(())
    }

    /// Oldest first; equal timestamps keep append order.
    fn chronological(&self) -> Vec<HistoryEntry> {
        let mut history = self.load();
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        history
    }

    fn load(&self) -> Vec<HistoryEntry> {
        json_store::load_or_default(&self.history_file)
    }
}

fn combine(static_summary: &IssueSummary, ai_summary: Option<&IssueSummary>) -> RunSummary {
    let by_severity = match ai_summary {
        Some(ai) => static_summary.by_severity + ai.by_severity,
        None => static_summary.by_severity,
    };
    RunSummary {
        total_issues: by_severity.total(),
        static_issues: static_summary.total_issues,
        ai_issues: ai_summary.map(|ai| ai.total_issues).unwrap_or(0),
        by_severity,
    }
}

fn trend_of(history: Vec<HistoryEntry>) -> TrendReport {
    let Some(current) = history.last() else {
        return TrendReport::empty();
    };
    let previous = if history.len() > 1 {
        &history[history.len() - 2]
    } else {
        current
    };

    let current_issues = current.summary.total_issues;
    let previous_issues = previous.summary.total_issues;
    let change = (i128::from(current_issues) - i128::from(previous_issues))
        .clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;

    let trend = match change {
        c if c < 0 => Trend::Improving,
        c if c > 0 => Trend::Declining,
        _ => Trend::Stable,
    };
    let change_percent = if previous_issues > 0 {
        round1(change as f64 / previous_issues as f64 * 100.0)
    } else {
        0.0
    };

    let timeline = history
        .iter()
        .map(|entry| TimelinePoint {
            timestamp: entry.timestamp,
            total_issues: entry.summary.total_issues,
            critical: entry.summary.by_severity.critical,
            warning: entry.summary.by_severity.warning,
            info: entry.summary.by_severity.info,
        })
        .collect();

    TrendReport {
        total_runs: history.len(),
        trend,
        current_issues,
        previous_issues,
        change,
        change_percent,
        timeline,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;
    use tempfile::TempDir;

    fn summary(critical: u64, warning: u64, info: u64) -> IssueSummary {
        IssueSummary::from_counts(SeverityCounts::new(critical, warning, info))
    }

    fn record_totals(store: &HistoryStore, totals: &[u64]) {
        for &total in totals {
            store
                .save_result("deployment", &summary(0, total, 0), None)
                .unwrap();
        }
    }

    #[test]
    fn save_combines_static_and_ai() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        store
            .save_result("personal", &summary(1, 2, 3), Some(&summary(4, 0, 1)))
            .unwrap();

        let history = store.get_history(None);
        assert_eq!(history.len(), 1);
        let entry = &history[0];
        assert_eq!(entry.mode, "personal");
        assert_eq!(entry.summary.by_severity, SeverityCounts::new(5, 2, 4));
        assert_eq!(entry.summary.total_issues, 11);
        assert_eq!(entry.summary.static_issues, 6);
        assert_eq!(entry.summary.ai_issues, 5);
    }

    #[test]
    fn severity_counts_always_sum_to_total() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        store.save_result("deployment", &summary(3, 0, 9), None).unwrap();
        store
            .save_result("deployment", &summary(0, 0, 0), Some(&summary(2, 2, 2)))
            .unwrap();

        for entry in store.get_history(None) {
            assert_eq!(entry.summary.by_severity.total(), entry.summary.total_issues);
        }
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        let base = Utc::now() - Duration::days(3);
        for (i, total) in [4u64, 8, 2].iter().enumerate() {
            store
                .append(HistoryEntry {
                    timestamp: base + Duration::hours(i as i64),
                    mode: "deployment".into(),
                    summary: combine(&summary(0, *total, 0), None),
                })
                .unwrap();
        }

        let all = store.get_history(None);
        let totals: Vec<u64> = all.iter().map(|e| e.summary.total_issues).collect();
        assert_eq!(totals, vec![2, 8, 4]);

        let limited = store.get_history(Some(2));
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].summary.total_issues, 2);
    }

    #[test]
    fn trend_improving() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[10, 5]);

        let trend = store.get_trend_data();
        assert_eq!(trend.trend, Trend::Improving);
        assert_eq!(trend.change, -5);
        assert_eq!(trend.change_percent, -50.0);
        assert_eq!(trend.current_issues, 5);
        assert_eq!(trend.previous_issues, 10);
        assert_eq!(trend.total_runs, 2);
    }

    #[test]
    fn trend_declining() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[5, 10]);

        let trend = store.get_trend_data();
        assert_eq!(trend.trend, Trend::Declining);
        assert_eq!(trend.change, 5);
        assert_eq!(trend.change_percent, 100.0);
    }

    #[test]
    fn trend_stable() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[7, 7]);

        let trend = store.get_trend_data();
        assert_eq!(trend.trend, Trend::Stable);
        assert_eq!(trend.change, 0);
        assert_eq!(trend.change_percent, 0.0);
    }

    #[test]
    fn trend_single_run_is_stable() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[3]);

        let trend = store.get_trend_data();
        assert_eq!(trend.total_runs, 1);
        assert_eq!(trend.trend, Trend::Stable);
        assert_eq!(trend.previous_issues, 3);
        assert_eq!(trend.change, 0);
    }

    #[test]
    fn trend_from_zero_has_no_percent() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[0, 4]);

        let trend = store.get_trend_data();
        assert_eq!(trend.trend, Trend::Declining);
        assert_eq!(trend.change_percent, 0.0);
    }

    #[test]
    fn change_percent_rounds_to_one_decimal() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[3, 2]);
        assert_eq!(store.get_trend_data().change_percent, -33.3);
    }

    #[test]
    fn empty_history_reports_no_data() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        let trend = store.get_trend_data();
        assert_eq!(trend.total_runs, 0);
        assert_eq!(trend.trend, Trend::NoData);
        assert_eq!(trend.current_issues, 0);
        assert!(trend.timeline.is_empty());
    }

    #[test]
    fn timeline_is_oldest_first() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        store.save_result("deployment", &summary(1, 0, 0), None).unwrap();
        store.save_result("deployment", &summary(0, 2, 0), None).unwrap();
        store.save_result("deployment", &summary(0, 0, 3), None).unwrap();

        let timeline = store.get_trend_data().timeline;
        assert_eq!(timeline.len(), 3);
        assert_eq!(
            (timeline[0].critical, timeline[1].warning, timeline[2].info),
            (1, 2, 3)
        );
        // get_history runs the other way
        assert_eq!(store.get_history(Some(1))[0].summary.by_severity.info, 3);
    }

    #[test]
    fn clear_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[1, 2]);
        store.clear_history().unwrap();
        assert!(store.get_history(None).is_empty());
        assert_eq!(store.get_trend_data().trend, Trend::NoData);
        store.clear_history().unwrap();
    }

    #[test]
    fn corrupt_history_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        fs::create_dir_all(store.history_file().parent().unwrap()).unwrap();
        fs::write(store.history_file(), "[{\"timestamp\":").unwrap();

        assert!(store.get_history(None).is_empty());
        assert_eq!(store.get_trend_data().total_runs, 0);
        record_totals(&store, &[6]);
        assert_eq!(store.get_history(None).len(), 1);
    }

    #[test]
    fn persisted_layout_uses_camel_case_summary() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        store
            .save_result("deployment", &summary(1, 1, 1), Some(&summary(0, 1, 0)))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.history_file()).unwrap()).unwrap();
        let entry = &raw[0];
        assert_eq!(entry["mode"], "deployment");
        assert_eq!(entry["summary"]["totalIssues"], 4);
        assert_eq!(entry["summary"]["staticIssues"], 3);
        assert_eq!(entry["summary"]["aiIssues"], 1);
        assert_eq!(entry["summary"]["bySeverity"]["warning"], 2);
    }

    #[test]
    fn export_writes_history_and_trend() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        record_totals(&store, &[4, 2]);

        let out = tmp.path().join("export.json");
        store.export_history(&out).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(raw["totalRuns"], 2);
        assert_eq!(raw["trend"]["trend"], "improving");
        assert_eq!(raw["history"].as_array().unwrap().len(), 2);
        assert!(raw["projectPath"].is_string());
    }

    #[test]
    fn timeline_csv_has_header_and_rows() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        store.save_result("deployment", &summary(1, 2, 3), None).unwrap();

        let mut buf = Vec::new();
        store.export_timeline_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,total_issues,critical,warning,info");
        assert!(lines[1].ends_with(",6,1,2,3"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn huge_counts_saturate() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        store
            .save_result(
                "deployment",
                &summary(u64::MAX, 1, 0),
                Some(&summary(1, 0, 0)),
            )
            .unwrap();

        let entry = &store.get_history(None)[0];
        assert_eq!(entry.summary.by_severity.critical, u64::MAX);
        assert_eq!(entry.summary.total_issues, u64::MAX);
        assert_eq!(store.get_trend_data().change, 0);
    }

    #[test]
    fn write_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        // a regular file where the history directory should be
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let store = HistoryStore::new(tmp.path(), &blocker);
        let err = store
            .save_result("deployment", &summary(1, 0, 0), None)
            .unwrap_err();
        assert!(matches!(err, crate::error::StoreError::Io { .. }), "got {err:?}");
        assert!(store.get_history(None).is_empty());
    }

    #[test]
    fn clear_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::for_project(tmp.path());
        // a non-empty directory where history.json should be
        fs::create_dir_all(store.history_file().join("nested")).unwrap();

        let err = store.clear_history().unwrap_err();
        assert!(matches!(err, crate::error::StoreError::Io { .. }), "got {err:?}");
    }
}
