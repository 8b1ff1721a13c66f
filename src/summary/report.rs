use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::{
    llm::TextGenerator,
    log_store::{hourly_log_path, legacy_daily_filename, read_records, summary_path},
    models::LogRecord,
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

const OCR_PREVIEW_CHARS: usize = 100;

pub const DEFAULT_REPORT_PROMPT: &str = "\
You are given the desktop activity of one working day.

Write a daily report in Markdown with these sections:
## Done today
## In progress
## Notes and follow-ups

Activity:
{activities}
";

pub fn render_report_prompt(template: &str, activities: &str) -> String {
    template.replace("{activities}", activities)
}

pub fn report_filename(date: NaiveDate) -> String {
    format!("daily_report_{}.md", date.format("%Y-%m-%d"))
}

/// Writes `daily_report_<date>.md`, creating `reports_dir` if needed.
pub fn save_daily_report(reports_dir: &Path, date: NaiveDate, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("failed to create reports directory {}", reports_dir.display()))?;
    let path = reports_dir.join(report_filename(date));
    fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Existing hourly summaries of `date`, in hour order.
pub fn summaries_for_date(summaries_dir: &Path, date: NaiveDate) -> Result<Vec<(u32, String)>> {
    let mut summaries = Vec::new();
    for hour in 0..24 {
        let path = summary_path(summaries_dir, date, hour);
        if !path.is_file() {
            continue;
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        summaries.push((hour, content));
    }
    Ok(summaries)
}

pub fn format_summaries(summaries: &[(u32, String)]) -> String {
    summaries
        .iter()
        .map(|(hour, content)| format!("## {hour:02}:00\n{}", content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One bullet per record; OCR text is cut to a short preview.
pub fn format_log_activities(records: &[LogRecord]) -> String {
    records
        .iter()
        .map(|record| {
            let timestamp = record.timestamp().format("%Y-%m-%dT%H:%M:%S");
            match record {
                LogRecord::Window(entry) => format!(
                    "- {timestamp}: {} ({})\n  content: {}",
                    entry.window_info.app_name,
                    entry.window_info.window_title,
                    preview(&entry.ocr_text)
                ),
                LogRecord::Speech(entry) => {
                    format!("- {timestamp}: speech\n  transcript: {}", preview(&entry.transcript))
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(OCR_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Where the day's activity was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    Summaries,
    LegacyDailyLog,
    HourlyLogs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Written { path: PathBuf, source: ReportSource },
    NoData,
    BackendUnavailable,
}

/// Builds the daily report from hourly summaries, falling back to raw logs.
pub struct DailyReporter {
    generator: Arc<dyn TextGenerator>,
    model: String,
    template: String,
}

impl DailyReporter {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>, template: String) -> Self {
        Self {
            generator,
            model: model.into(),
            template,
        }
    }

    pub fn generate(
        &self,
        log_dir: &Path,
        summaries_dir: &Path,
        reports_dir: &Path,
        date: NaiveDate,
    ) -> Result<ReportOutcome> {
        let Some((source, activities)) = self.collect_activities(log_dir, summaries_dir, date)?
        else {
            return Ok(ReportOutcome::NoData);
        };

        if !self.generator.is_available() {
            return Ok(ReportOutcome::BackendUnavailable);
        }

        log_info!("generating report for {date} from {source:?}");
        let prompt = render_report_prompt(&self.template, &activities);
        let content = self
            .generator
            .generate(&prompt, &self.model)
            .with_context(|| format!("{} failed to write the report for {date}", self.generator.name()))?;

        let path = save_daily_report(reports_dir, date, &content)?;
        Ok(ReportOutcome::Written { path, source })
    }

    /// Summaries win; then the legacy daily file; then the raw hourly logs.
    fn collect_activities(
        &self,
        log_dir: &Path,
        summaries_dir: &Path,
        date: NaiveDate,
    ) -> Result<Option<(ReportSource, String)>> {
        let summaries = summaries_for_date(summaries_dir, date)?;
        if !summaries.is_empty() {
            return Ok(Some((ReportSource::Summaries, format_summaries(&summaries))));
        }

        let legacy = log_dir.join(legacy_daily_filename(date));
        if legacy.is_file() {
            let records = read_records(&legacy)?;
            return Ok(Some((ReportSource::LegacyDailyLog, format_log_activities(&records))));
        }

        let mut records = Vec::new();
        for hour in 0..24 {
            let path = hourly_log_path(log_dir, date, hour);
            if path.is_file() {
                records.extend(read_records(&path)?);
            }
        }
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some((ReportSource::HourlyLogs, format_log_activities(&records))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        log_store::LogStore,
        models::WindowInfo,
        summary::save_summary,
    };
    use chrono::{Local, TimeZone};
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    };
    use tempfile::tempdir;

    struct FakeGenerator {
        available: AtomicBool,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn new(available: bool) -> Arc<Self> {
            Arc::new(Self {
                available: AtomicBool::new(available),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl TextGenerator for FakeGenerator {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn generate(&self, prompt: &str, model: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("# report by {model}"))
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 26).unwrap()
    }

    fn reporter(generator: Arc<FakeGenerator>) -> DailyReporter {
        DailyReporter::new(generator, "test-model", "DAY:\n{activities}".to_string())
    }

    #[test]
    fn test_report_prefers_summaries() {
        let dir = tempdir().unwrap();
        let (logs, summaries, reports) = (
            dir.path().join("logs"),
            dir.path().join("summaries"),
            dir.path().join("reports"),
        );
        save_summary(&summaries, date(), 15, "reviewed PRs\n").unwrap();
        save_summary(&summaries, date(), 9, "wrote the parser").unwrap();
        let store = LogStore::new(logs.clone()).unwrap();
        store
            .append_legacy_daily_at(
                Local.with_ymd_and_hms(2025, 12, 26, 9, 0, 0).unwrap(),
                &WindowInfo::new("Safari", "Docs"),
                "ignored",
            )
            .unwrap();
        let generator = FakeGenerator::new(true);

        let outcome = reporter(generator.clone())
            .generate(&logs, &summaries, &reports, date())
            .unwrap();

        let path = reports.join("daily_report_2025-12-26.md");
        assert_eq!(
            outcome,
            ReportOutcome::Written { path: path.clone(), source: ReportSource::Summaries }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "# report by test-model");
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "DAY:\n## 09:00\nwrote the parser\n\n## 15:00\nreviewed PRs"
        );
    }

    #[test]
    fn test_report_falls_back_to_legacy_daily_log() {
        let dir = tempdir().unwrap();
        let (logs, summaries, reports) = (
            dir.path().join("logs"),
            dir.path().join("summaries"),
            dir.path().join("reports"),
        );
        let store = LogStore::new(logs.clone()).unwrap();
        store
            .append_legacy_daily_at(
                Local.with_ymd_and_hms(2025, 12, 26, 10, 15, 0).unwrap(),
                &WindowInfo::new("Code", "main.rs"),
                &"x".repeat(150),
            )
            .unwrap();
        let generator = FakeGenerator::new(true);

        let outcome = reporter(generator.clone())
            .generate(&logs, &summaries, &reports, date())
            .unwrap();

        assert!(matches!(
            outcome,
            ReportOutcome::Written { source: ReportSource::LegacyDailyLog, .. }
        ));
        let prompt = generator.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("- 2025-12-26T10:15:00: Code (main.rs)"));
        assert!(prompt.contains(&format!("content: {}...", "x".repeat(100))));
        assert!(!prompt.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_report_reads_hourly_logs_when_nothing_else_exists() {
        let dir = tempdir().unwrap();
        let (logs, summaries, reports) = (
            dir.path().join("logs"),
            dir.path().join("summaries"),
            dir.path().join("reports"),
        );
        let store = LogStore::new(logs.clone()).unwrap();
        store
            .append_hourly_at(
                Local.with_ymd_and_hms(2025, 12, 26, 14, 30, 0).unwrap(),
                &WindowInfo::new("Slack", "#dev-team | Company"),
                "standup notes",
                None,
            )
            .unwrap();
        store
            .append_speech_at(
                Local.with_ymd_and_hms(2025, 12, 26, 14, 40, 0).unwrap(),
                "let's ship it",
                0.9,
                true,
                None,
            )
            .unwrap();
        let generator = FakeGenerator::new(true);

        let outcome = reporter(generator.clone())
            .generate(&logs, &summaries, &reports, date())
            .unwrap();

        assert!(matches!(
            outcome,
            ReportOutcome::Written { source: ReportSource::HourlyLogs, .. }
        ));
        let prompt = generator.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Slack (#dev-team | Company)\n  content: standup notes"));
        assert!(prompt.contains("speech\n  transcript: let's ship it"));
    }

    #[test]
    fn test_report_without_data_writes_nothing() {
        let dir = tempdir().unwrap();
        let reports = dir.path().join("reports");
        let generator = FakeGenerator::new(true);

        let outcome = reporter(generator.clone())
            .generate(&dir.path().join("logs"), &dir.path().join("summaries"), &reports, date())
            .unwrap();

        assert_eq!(outcome, ReportOutcome::NoData);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert!(!reports.exists());
    }

    #[test]
    fn test_report_skips_unavailable_backend() {
        let dir = tempdir().unwrap();
        let (summaries, reports) = (dir.path().join("summaries"), dir.path().join("reports"));
        save_summary(&summaries, date(), 9, "wrote the parser").unwrap();
        let generator = FakeGenerator::new(false);

        let outcome = reporter(generator.clone())
            .generate(&dir.path().join("logs"), &summaries, &reports, date())
            .unwrap();

        assert_eq!(outcome, ReportOutcome::BackendUnavailable);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_preview_cuts_on_char_boundary() {
        let text = "日".repeat(120);
        assert_eq!(preview(&text), format!("{}...", "日".repeat(100)));
        assert_eq!(preview("short"), "short");
    }
}
