pub mod config;
pub mod llm;
pub mod log_store;
pub mod macos_bridge;
pub mod models;
pub mod ocr;
pub mod sensing;
pub mod summary;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate, Timelike};
use log::{info, warn};

use config::Config;
use llm::{generator_from_config, TextGenerator};
use log_store::LogStore;
use macos_bridge::{MacActivityProbe, MacScreenCapturer, MacWindowSource};
use models::WindowInfo;
use ocr::OcrEngine;
use sensing::{
    ActivityProbe, CaptureCallback, CaptureContext, CapturePipeline, IntervalCapture,
    WindowChangeCallback, WindowPoller, WindowSource,
};
use summary::{
    load_prompt_template, DailyReporter, HourlySummarizer, HourlySummaryScheduler, ReportOutcome,
    SummaryCallback, SummaryOutcome, DEFAULT_REPORT_PROMPT, DEFAULT_SUMMARY_PROMPT,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging (reads RUST_LOG env var). Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// The three background loops of a monitoring session.
pub struct Runtime {
    poller: WindowPoller,
    capture: IntervalCapture,
    scheduler: HourlySummaryScheduler,
    poll_interval: Duration,
}

impl Runtime {
    pub fn new(
        config: &Config,
        pipeline: CapturePipeline,
        windows: Arc<dyn WindowSource>,
        probe: Arc<dyn ActivityProbe>,
        summary_callback: SummaryCallback,
    ) -> Self {
        let poller = WindowPoller::new(
            windows.clone(),
            probe.clone(),
            window_change_callback(pipeline.clone()),
        );
        let capture = IntervalCapture::new(
            periodic_capture_callback(pipeline.clone(), windows),
            pipeline.log_dir().to_path_buf(),
            config.capture_interval(),
            probe,
        );
        let scheduler = HourlySummaryScheduler::new(
            summary_callback,
            config.log_dir.clone(),
            config.summaries_dir.clone(),
            config.summary_check_interval(),
        );

        Self {
            poller,
            capture,
            scheduler,
            poll_interval: config.poll_interval(),
        }
    }

    /// macOS collaborators, the configured OCR backend and the configured
    /// text generator.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = LogStore::new(config.log_dir.clone())?
            .with_speech_language(&config.speech_language);
        let extractor = Arc::new(OcrEngine::from_config(config)?);
        let pipeline = CapturePipeline::new(Arc::new(MacScreenCapturer), extractor, store);

        let summarizer = Arc::new(summarizer_from_config(config)?);

        Ok(Self::new(
            config,
            pipeline,
            Arc::new(MacWindowSource),
            Arc::new(MacActivityProbe),
            summarizer.into_callback(),
        ))
    }

    pub fn start(&mut self) {
        self.poller.start(self.poll_interval);
        self.capture.start();
        self.scheduler.start();
    }

    pub async fn stop(&mut self) {
        self.poller.stop().await;
        self.capture.stop().await;
        self.scheduler.stop().await;
    }

    pub fn trigger_summary(&self) {
        self.scheduler.trigger_summary();
    }

    pub fn is_running(&self) -> bool {
        self.poller.is_running() || self.capture.is_running() || self.scheduler.is_running()
    }
}

fn window_change_callback(pipeline: CapturePipeline) -> WindowChangeCallback {
    Arc::new(move |old: &WindowInfo, new: &WindowInfo| {
        println!(
            "Window changed: {} -> {} ({})",
            old.app_name, new.app_name, new.window_title
        );
        if pipeline.execute(&CaptureContext::new(new.clone())) {
            println!("  Captured, OCR'd, and logged");
        } else {
            println!("  Processing failed");
        }
    })
}

fn periodic_capture_callback(
    pipeline: CapturePipeline,
    windows: Arc<dyn WindowSource>,
) -> CaptureCallback {
    Arc::new(move |_log_dir: &Path| {
        let window = match windows.active_window() {
            Ok(window) => window,
            Err(err) => {
                warn!("periodic capture skipped, active window unknown: {err:#}");
                return false;
            }
        };
        let ok = pipeline.execute(&CaptureContext::new(window));
        if ok {
            println!("Periodic capture: captured, OCR'd, and logged");
        } else {
            println!("Periodic capture: processing failed");
        }
        ok
    })
}

fn summarizer_from_config(config: &Config) -> Result<HourlySummarizer> {
    let generator: Arc<dyn TextGenerator> = Arc::from(generator_from_config(config)?);
    Ok(summarizer_with(generator, config))
}

fn summarizer_with(generator: Arc<dyn TextGenerator>, config: &Config) -> HourlySummarizer {
    let template = load_prompt_template(
        config.summary_prompt_path.as_deref(),
        DEFAULT_SUMMARY_PROMPT,
    );
    HourlySummarizer::new(generator, config.summary_model(), template)
}

/// Runs all three loops until Ctrl-C.
pub async fn start_monitoring(config: Config) -> Result<()> {
    println!("auto-daily v{VERSION} - Starting window monitor...");

    let mut runtime = Runtime::from_config(&config)?;
    runtime.start();

    println!("Logs: {}", config.log_dir.display());
    println!("Summaries: {}", config.summaries_dir.display());
    println!(
        "Periodic capture every {}s, hourly summary enabled",
        config.capture_interval().as_secs()
    );
    println!("Press Ctrl+C to stop");

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {err}");
    }

    println!("\nStopping monitor...");
    runtime.stop().await;
    info!("monitor stopped");
    Ok(())
}

/// Summarizes one hour; defaults to the current hour of today. Blocking.
pub fn run_summarize(
    config: &Config,
    date: Option<NaiveDate>,
    hour: Option<u32>,
    force: bool,
) -> Result<()> {
    let now = Local::now();
    let date = date.unwrap_or_else(|| now.date_naive());
    let hour = hour.unwrap_or_else(|| now.hour());
    if hour > 23 {
        bail!("hour must be between 0 and 23, got {hour}");
    }

    let summarizer = summarizer_from_config(config)?;
    println!("Generating summary for {date} {hour:02}:00...");

    match summarizer.summarize_hour(&config.log_dir, &config.summaries_dir, date, hour, force)? {
        SummaryOutcome::Written(path) => println!("Summary saved: {}", path.display()),
        SummaryOutcome::AlreadyExists(path) => {
            println!("Summary already exists: {} (use --force to regenerate)", path.display())
        }
        SummaryOutcome::NoLog => {
            let expected = log_store::hourly_log_path(&config.log_dir, date, hour);
            println!("No log file found for {date} hour {hour:02}");
            println!("Expected: {}", expected.display());
        }
        SummaryOutcome::BackendUnavailable => {
            bail!(
                "cannot connect to the {} backend; please ensure it is running",
                config.ai_backend
            );
        }
    }
    Ok(())
}

/// Writes the daily report for `date` (default today). With `auto_summarize`,
/// hours that have a log but no summary are summarized first. Blocking.
pub fn run_report(config: &Config, date: Option<NaiveDate>, auto_summarize: bool) -> Result<()> {
    let generator: Arc<dyn TextGenerator> = Arc::from(generator_from_config(config)?);
    report_with(generator, config, date, auto_summarize).map(|_| ())
}

fn report_with(
    generator: Arc<dyn TextGenerator>,
    config: &Config,
    date: Option<NaiveDate>,
    auto_summarize: bool,
) -> Result<PathBuf> {
    if !generator.is_available() {
        bail!(
            "cannot connect to the {} backend; please ensure it is running",
            config.ai_backend
        );
    }
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    if auto_summarize {
        let summarizer = summarizer_with(generator.clone(), config);
        for hour in summarizer.summarize_missing_hours(&config.log_dir, &config.summaries_dir, date)? {
            println!("  Generated summary for hour {hour:02}");
        }
    }

    let template = load_prompt_template(config.report_prompt_path.as_deref(), DEFAULT_REPORT_PROMPT);
    let reporter = DailyReporter::new(generator, config.summary_model(), template);
    println!("Generating report for {date}...");

    match reporter.generate(&config.log_dir, &config.summaries_dir, &config.reports_dir, date)? {
        ReportOutcome::Written { path, .. } => {
            println!("Report saved: {}", path.display());
            Ok(path)
        }
        ReportOutcome::NoData => {
            let expected = config.log_dir.join(log_store::legacy_daily_filename(date));
            bail!(
                "no summaries or logs found for {date} (expected {})",
                expected.display()
            )
        }
        ReportOutcome::BackendUnavailable => bail!(
            "cannot connect to the {} backend; please ensure it is running",
            config.ai_backend
        ),
    }
}
