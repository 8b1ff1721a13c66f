mod report;
mod scheduler;
mod summarizer;

pub use report::{
    format_log_activities, format_summaries, render_report_prompt, report_filename,
    save_daily_report, summaries_for_date, DailyReporter, ReportOutcome, ReportSource,
    DEFAULT_REPORT_PROMPT,
};
pub use scheduler::{
    AutoTrigger, Clock, HourlySummaryScheduler, SummaryCallback, AUTO_TRIGGER_MINUTES,
    DEFAULT_CHECK_INTERVAL,
};
pub use summarizer::{
    load_prompt_template, missing_summary_hours, previous_hour, render_prompt, save_summary,
    HourlySummarizer, SummaryOutcome, DEFAULT_SUMMARY_PROMPT,
};
