use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// `base/<YYYY-MM-DD>`, created if absent.
pub fn date_dir_for<Tz: TimeZone>(base: &Path, instant: &DateTime<Tz>) -> Result<PathBuf> {
    let dir = base.join(instant.date_naive().format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    Ok(dir)
}

pub fn hourly_filename_for<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    hourly_filename(instant.hour())
}

pub fn hourly_filename(hour: u32) -> String {
    format!("activity_{hour:02}.jsonl")
}

/// Hourly log path without touching the filesystem.
pub fn hourly_log_path(base: &Path, date: NaiveDate, hour: u32) -> PathBuf {
    base.join(date.format("%Y-%m-%d").to_string())
        .join(hourly_filename(hour))
}

pub fn legacy_daily_filename(date: NaiveDate) -> String {
    format!("activity_{}.jsonl", date.format("%Y-%m-%d"))
}

pub fn summary_filename(hour: u32) -> String {
    format!("summary_{hour:02}.md")
}

pub fn summary_path(summaries_base: &Path, date: NaiveDate, hour: u32) -> PathBuf {
    summaries_base
        .join(date.format("%Y-%m-%d").to_string())
        .join(summary_filename(hour))
}

/// `summaries/<YYYY-MM-DD>`, created if absent.
pub fn summary_dir_for_date(summaries_base: &Path, date: NaiveDate) -> Result<PathBuf> {
    let dir = summaries_base.join(date.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create summary directory {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_hourly_filename_zero_padded_and_distinct() {
        let mut seen = HashSet::new();
        for hour in 0..24 {
            let instant = Local.with_ymd_and_hms(2025, 12, 26, hour, 17, 3).unwrap();
            let name = hourly_filename_for(&instant);
            assert_eq!(name, format!("activity_{:02}.jsonl", hour));
            assert!(seen.insert(name));
        }
        assert_eq!(hourly_filename(7), "activity_07.jsonl");
    }

    #[test]
    fn test_date_dir_created() {
        let dir = tempdir().unwrap();
        let instant = Local.with_ymd_and_hms(2025, 12, 26, 9, 30, 0).unwrap();

        let date_dir = date_dir_for(dir.path(), &instant).unwrap();
        assert_eq!(date_dir, dir.path().join("2025-12-26"));
        assert!(date_dir.is_dir());
        // Second call on an existing directory is fine.
        date_dir_for(dir.path(), &instant).unwrap();
    }

    #[test]
    fn test_summary_and_legacy_names() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(legacy_daily_filename(date), "activity_2025-01-05.jsonl");
        assert_eq!(
            summary_path(Path::new("/s"), date, 3),
            PathBuf::from("/s/2025-01-05/summary_03.md")
        );
        assert_eq!(
            hourly_log_path(Path::new("/l"), date, 14),
            PathBuf::from("/l/2025-01-05/activity_14.jsonl")
        );
    }
}
