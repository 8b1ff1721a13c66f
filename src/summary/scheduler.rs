use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Local, NaiveDate, Timelike};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::sensing::LoopController;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Auto trigger window: the first minutes of each hour.
pub const AUTO_TRIGGER_MINUTES: u32 = 5;

/// Receives `(log_dir, summaries_dir)`. Must be safe to call repeatedly for
/// the same hour; deciding whether there is anything to do is its job.
pub type SummaryCallback = Arc<dyn Fn(&Path, &Path) + Send + Sync>;

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Remembers which hour already auto-fired in this process.
#[derive(Debug, Default)]
pub struct AutoTrigger {
    last_fired: Option<(NaiveDate, u32)>,
}

impl AutoTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once per hour, and only within the first [`AUTO_TRIGGER_MINUTES`].
    pub fn should_fire(&mut self, now: DateTime<Local>) -> bool {
        let slot = (now.date_naive(), now.hour());
        if now.minute() >= AUTO_TRIGGER_MINUTES || self.last_fired == Some(slot) {
            return false;
        }
        self.last_fired = Some(slot);
        true
    }
}

/// Invokes the summary callback near each hour boundary, or immediately on
/// [`trigger_summary`](Self::trigger_summary).
pub struct HourlySummaryScheduler {
    callback: SummaryCallback,
    log_dir: PathBuf,
    summaries_dir: PathBuf,
    check_interval: Duration,
    clock: Clock,
    trigger: Arc<Notify>,
    controller: LoopController,
}

impl HourlySummaryScheduler {
    pub fn new(
        callback: SummaryCallback,
        log_dir: PathBuf,
        summaries_dir: PathBuf,
        check_interval: Duration,
    ) -> Self {
        Self {
            callback,
            log_dir,
            summaries_dir,
            check_interval: check_interval.max(Duration::from_millis(1)),
            clock: Arc::new(Local::now),
            trigger: Arc::new(Notify::new()),
            controller: LoopController::new("hourly summary scheduler"),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn start(&mut self) {
        let state = LoopState {
            callback: self.callback.clone(),
            log_dir: self.log_dir.clone(),
            summaries_dir: self.summaries_dir.clone(),
            check_interval: self.check_interval,
            clock: self.clock.clone(),
            trigger: self.trigger.clone(),
        };

        self.controller
            .start(move |cancel_token| summary_loop(state, cancel_token));
    }

    pub async fn stop(&mut self) {
        self.controller.stop().await;
    }

    /// Wakes the loop so the callback runs now. A trigger issued before the
    /// loop is waiting is kept until the next wait.
    pub fn trigger_summary(&self) {
        self.trigger.notify_one();
    }
}

struct LoopState {
    callback: SummaryCallback,
    log_dir: PathBuf,
    summaries_dir: PathBuf,
    check_interval: Duration,
    clock: Clock,
    trigger: Arc<Notify>,
}

impl LoopState {
    async fn invoke(&self, reason: &str) {
        log_info!("running hourly summary ({reason})");
        let callback = self.callback.clone();
        let log_dir = self.log_dir.clone();
        let summaries_dir = self.summaries_dir.clone();

        if let Err(err) =
            tokio::task::spawn_blocking(move || callback(&log_dir, &summaries_dir)).await
        {
            log_error!("summary callback failed: {err}");
        }
    }
}

async fn summary_loop(state: LoopState, cancel_token: CancellationToken) {
    let mut auto = AutoTrigger::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = state.trigger.notified() => {
                state.invoke("manual trigger").await;
            }
            _ = tokio::time::sleep(state.check_interval) => {
                let now = (state.clock)();
                if auto.should_fire(now) {
                    state.invoke("hour boundary").await;
                } else {
                    log_debug!("summary check at {} - nothing to do", now.format("%H:%M"));
                }
            }
        }
    }
}
