use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{ActivityProbe, LoopController};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(30);

/// Receives the log directory on every active tick; returns whether the capture succeeded.
pub type CaptureCallback = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Fires a capture every `interval` while the screen is unlocked. Locked
/// ticks are dropped, not deferred.
pub struct IntervalCapture {
    callback: CaptureCallback,
    log_dir: PathBuf,
    interval: Duration,
    probe: Arc<dyn ActivityProbe>,
    controller: LoopController,
}

impl IntervalCapture {
    pub fn new(
        callback: CaptureCallback,
        log_dir: PathBuf,
        interval: Duration,
        probe: Arc<dyn ActivityProbe>,
    ) -> Self {
        Self {
            callback,
            log_dir,
            interval: interval.max(Duration::from_millis(1)),
            probe,
            controller: LoopController::new("interval capture"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn start(&mut self) {
        let callback = self.callback.clone();
        let log_dir = self.log_dir.clone();
        let interval = self.interval;
        let probe = self.probe.clone();

        self.controller.start(move |cancel_token| {
            capture_loop(callback, log_dir, interval, probe, cancel_token)
        });
    }

    pub async fn stop(&mut self) {
        self.controller.stop().await;
    }
}

async fn capture_loop(
    callback: CaptureCallback,
    log_dir: PathBuf,
    interval: Duration,
    probe: Arc<dyn ActivityProbe>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let probe = probe.clone();
        let active = tokio::task::spawn_blocking(move || probe.is_active())
            .await
            .unwrap_or(false);
        if !active {
            log_debug!("screen locked; skipping interval capture");
            continue;
        }
        if cancel_token.is_cancelled() {
            break;
        }

        let callback = callback.clone();
        let log_dir = log_dir.clone();
        match tokio::task::spawn_blocking(move || callback(&log_dir)).await {
            Ok(true) => {}
            Ok(false) => log_debug!("interval capture tick did not complete"),
            Err(err) => log_error!("interval capture callback failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    };
    use tempfile::tempdir;
    use tokio::time::Instant;

    struct Probe(AtomicBool);

    impl ActivityProbe for Probe {
        fn is_active(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn counting_callback(counter: Arc<AtomicUsize>) -> CaptureCallback {
        Arc::new(move |_dir: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    #[tokio::test]
    async fn test_periodic_capture() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let mut capture = IntervalCapture::new(
            counting_callback(count.clone()),
            dir.path().to_path_buf(),
            Duration::from_millis(20),
            Arc::new(Probe(AtomicBool::new(true))),
        );

        capture.start();
        tokio::time::sleep(Duration::from_millis(110)).await;
        capture.stop().await;

        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_callback_receives_log_dir() {
        let dir = tempdir().unwrap();
        let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: CaptureCallback = Arc::new(move |log_dir: &Path| {
            sink.lock().unwrap().push(log_dir.to_path_buf());
            true
        });

        let mut capture = IntervalCapture::new(
            callback,
            dir.path().to_path_buf(),
            Duration::from_millis(20),
            Arc::new(Probe(AtomicBool::new(true))),
        );
        capture.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        capture.stop().await;

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|path| path == dir.path()));
    }

    #[tokio::test]
    async fn test_locked_screen_skips_ticks() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let probe = Arc::new(Probe(AtomicBool::new(false)));
        let mut capture = IntervalCapture::new(
            counting_callback(count.clone()),
            dir.path().to_path_buf(),
            Duration::from_millis(20),
            probe.clone(),
        );

        capture.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        probe.0.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        capture.stop().await;

        // Skipped ticks are not replayed once the screen unlocks.
        let fired = count.load(Ordering::SeqCst);
        assert!((1..=4).contains(&fired), "fired {fired} times");
    }

    #[tokio::test]
    async fn test_failing_callback_keeps_loop_alive() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let callback: CaptureCallback = Arc::new(move |_dir: &Path| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                panic!("first capture blew up");
            }
            false
        });

        let mut capture = IntervalCapture::new(
            callback,
            dir.path().to_path_buf(),
            Duration::from_millis(15),
            Arc::new(Probe(AtomicBool::new(true))),
        );
        capture.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(capture.is_running());
        capture.stop().await;

        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_stop_interrupts_long_interval() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let mut capture = IntervalCapture::new(
            counting_callback(count.clone()),
            dir.path().to_path_buf(),
            Duration::from_secs(3600),
            Arc::new(Probe(AtomicBool::new(true))),
        );

        capture.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = Instant::now();
        capture.stop().await;

        assert!(started.elapsed() < Duration::from_millis(100));
        let fired = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), fired);
        assert_eq!(fired, 1);
    }
}
