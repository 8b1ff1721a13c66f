use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, Timelike};

use crate::{
    llm::TextGenerator,
    log_store::{hourly_log_path, summary_dir_for_date, summary_filename, summary_path},
};

use super::{Clock, SummaryCallback};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const DEFAULT_SUMMARY_PROMPT: &str = "\
You are given one hour of desktop activity logs in JSON Lines format.
Each line records the active application, its window title and text read from the screen.

Write a short Markdown summary of what the user worked on during this hour:
- main tasks and projects
- tools and documents involved
- notable conversations or decisions

Logs:
{log_content}
";

pub fn render_prompt(template: &str, log_content: &str) -> String {
    template.replace("{log_content}", log_content)
}

/// Reads a custom template, falling back to `default` when none is
/// configured or the file cannot be read.
pub fn load_prompt_template(path: Option<&Path>, default: &str) -> String {
    let Some(path) = path else {
        return default.to_string();
    };
    match fs::read_to_string(path) {
        Ok(template) if !template.trim().is_empty() => template,
        Ok(_) => {
            log_warn!("prompt template {} is empty; using default", path.display());
            default.to_string()
        }
        Err(err) => {
            log_warn!(
                "failed to read prompt template {}: {err}; using default",
                path.display()
            );
            default.to_string()
        }
    }
}

/// The hour before `now`; hour 0 wraps to 23 of the previous day.
pub fn previous_hour(now: DateTime<Local>) -> (NaiveDate, u32) {
    let earlier = now - Duration::hours(1);
    (earlier.date_naive(), earlier.hour())
}

/// Writes `summary_<HH>.md` through a temp file so readers never see a
/// partial summary.
pub fn save_summary(
    summaries_base: &Path,
    date: NaiveDate,
    hour: u32,
    content: &str,
) -> Result<PathBuf> {
    let dir = summary_dir_for_date(summaries_base, date)?;
    let path = dir.join(summary_filename(hour));
    let tmp = dir.join(format!(".{}.tmp", summary_filename(hour)));

    fs::write(&tmp, content)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("failed to move summary into {}", path.display()))?;
    Ok(path)
}

/// Hours of `date` that have an activity log but no summary yet.
pub fn missing_summary_hours(log_dir: &Path, summaries_dir: &Path, date: NaiveDate) -> Vec<u32> {
    (0..24)
        .filter(|&hour| hourly_log_path(log_dir, date, hour).is_file())
        .filter(|&hour| !summary_path(summaries_dir, date, hour).exists())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Written(PathBuf),
    AlreadyExists(PathBuf),
    NoLog,
    BackendUnavailable,
}

/// Turns an hourly activity log into a Markdown summary via a [`TextGenerator`].
pub struct HourlySummarizer {
    generator: Arc<dyn TextGenerator>,
    model: String,
    template: String,
    clock: Clock,
}

impl HourlySummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>, template: String) -> Self {
        Self {
            generator,
            model: model.into(),
            template,
            clock: Arc::new(Local::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn summarize_previous_hour(
        &self,
        log_dir: &Path,
        summaries_dir: &Path,
    ) -> Result<SummaryOutcome> {
        let (date, hour) = previous_hour((self.clock)());
        self.summarize_hour(log_dir, summaries_dir, date, hour, false)
    }

    /// No-op when the summary exists (unless `overwrite`) or the hour has no log.
    pub fn summarize_hour(
        &self,
        log_dir: &Path,
        summaries_dir: &Path,
        date: NaiveDate,
        hour: u32,
        overwrite: bool,
    ) -> Result<SummaryOutcome> {
        let existing = summary_path(summaries_dir, date, hour);
        if existing.exists() && !overwrite {
            return Ok(SummaryOutcome::AlreadyExists(existing));
        }

        let log_file = hourly_log_path(log_dir, date, hour);
        if !log_file.is_file() {
            return Ok(SummaryOutcome::NoLog);
        }

        if !self.generator.is_available() {
            return Ok(SummaryOutcome::BackendUnavailable);
        }

        let log_content = fs::read_to_string(&log_file)
            .with_context(|| format!("failed to read {}", log_file.display()))?;
        let prompt = render_prompt(&self.template, &log_content);
        let summary = self
            .generator
            .generate(&prompt, &self.model)
            .with_context(|| format!("{} failed to summarize {date} {hour:02}:00", self.generator.name()))?;

        save_summary(summaries_dir, date, hour, &summary).map(SummaryOutcome::Written)
    }

    /// Summarizes every hour of `date` that has a log but no summary yet and
    /// returns the hours written.
    pub fn summarize_missing_hours(
        &self,
        log_dir: &Path,
        summaries_dir: &Path,
        date: NaiveDate,
    ) -> Result<Vec<u32>> {
        let mut written = Vec::new();
        for hour in missing_summary_hours(log_dir, summaries_dir, date) {
            if let SummaryOutcome::Written(_) =
                self.summarize_hour(log_dir, summaries_dir, date, hour, false)?
            {
                written.push(hour);
            }
        }
        Ok(written)
    }

    /// Adapts the summarizer to the scheduler's callback shape. Outcomes are
    /// reported here; nothing is propagated.
    pub fn into_callback(self: Arc<Self>) -> SummaryCallback {
        Arc::new(move |log_dir: &Path, summaries_dir: &Path| {
            match self.summarize_previous_hour(log_dir, summaries_dir) {
                Ok(SummaryOutcome::Written(path)) => {
                    log_info!("summary saved: {}", path.display());
                }
                Ok(SummaryOutcome::BackendUnavailable) => {
                    log_warn!(
                        "cannot summarize previous hour: {} not available",
                        self.generator.name()
                    );
                }
                Ok(SummaryOutcome::AlreadyExists(_)) | Ok(SummaryOutcome::NoLog) => {}
                Err(err) => log_warn!("summary failed: {err:#}"),
            }
        })
    }
}
