use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::WindowInfo;

use super::{ActivityProbe, LoopController, WindowSource};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

/// Called with `(previous, current)` when the foreground window changes.
pub type WindowChangeCallback = Arc<dyn Fn(&WindowInfo, &WindowInfo) + Send + Sync>;

/// Baseline tracking for window transitions.
#[derive(Debug, Default)]
pub struct WindowTracker {
    baseline: Option<WindowInfo>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<&WindowInfo> {
        self.baseline.as_ref()
    }

    /// First reading becomes the baseline silently. Afterwards a reading that
    /// differs from the baseline yields `(old, new)` and becomes the new baseline.
    pub fn observe(&mut self, current: WindowInfo) -> Option<(WindowInfo, WindowInfo)> {
        match self.baseline.take() {
            None => {
                self.baseline = Some(current);
                None
            }
            Some(previous) if previous == current => {
                self.baseline = Some(previous);
                None
            }
            Some(previous) => {
                self.baseline = Some(current.clone());
                Some((previous, current))
            }
        }
    }
}

/// Polls the foreground window and reports transitions. Ticks are skipped
/// while the screen is locked.
pub struct WindowPoller {
    source: Arc<dyn WindowSource>,
    probe: Arc<dyn ActivityProbe>,
    callback: WindowChangeCallback,
    controller: LoopController,
}

impl WindowPoller {
    pub fn new(
        source: Arc<dyn WindowSource>,
        probe: Arc<dyn ActivityProbe>,
        callback: WindowChangeCallback,
    ) -> Self {
        Self {
            source,
            probe,
            callback,
            controller: LoopController::new("window poller"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Starts polling; a second call while running does nothing.
    pub fn start(&mut self, poll_interval: Duration) {
        let source = self.source.clone();
        let probe = self.probe.clone();
        let callback = self.callback.clone();
        let poll_interval = poll_interval.max(Duration::from_millis(1));

        self.controller.start(move |cancel_token| {
            poll_loop(source, probe, callback, poll_interval, cancel_token)
        });
    }

    pub async fn stop(&mut self) {
        self.controller.stop().await;
    }
}

async fn poll_loop(
    source: Arc<dyn WindowSource>,
    probe: Arc<dyn ActivityProbe>,
    callback: WindowChangeCallback,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tracker = WindowTracker::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let reading = tokio::task::spawn_blocking({
            let source = source.clone();
            let probe = probe.clone();
            move || probe.is_active().then(|| source.active_window())
        })
        .await;

        let current = match reading {
            Ok(Some(Ok(window))) => window,
            Ok(None) => {
                log_debug!("screen locked; skipping window poll");
                continue;
            }
            Ok(Some(Err(err))) => {
                log_warn!("active window query failed: {err:#}");
                continue;
            }
            Err(err) => {
                log_error!("window poll worker failed: {err}");
                continue;
            }
        };

        let Some((previous, current)) = tracker.observe(current) else {
            continue;
        };
        if cancel_token.is_cancelled() {
            break;
        }

        let callback = callback.clone();
        if let Err(err) =
            tokio::task::spawn_blocking(move || callback(&previous, &current)).await
        {
            log_error!("window change callback failed: {err}");
        }
    }
}
