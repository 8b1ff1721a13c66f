use std::future::Future;
use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on how long `stop()` waits for a loop to exit.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Owns one cancellable background loop: its token and its task handle.
pub struct LoopController {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl LoopController {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawns the loop built by `make_loop`. No-op (returns `false`) while a
    /// previous loop is still running. Must be called inside a tokio runtime.
    pub fn start<F, Fut>(&mut self, make_loop: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(make_loop(cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!("{} started", self.name);
        true
    }

    /// Cancels the loop and waits up to [`STOP_TIMEOUT`] for it to exit.
    /// Safe to call repeatedly or when never started.
    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let Some(mut handle) = self.handle.take() else {
            return;
        };

        match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => info!("{} stopped", self.name),
            Ok(Err(err)) => warn!("{} loop ended abnormally: {err}", self.name),
            Err(_) => {
                warn!(
                    "{} did not stop within {:?}; aborting",
                    self.name, STOP_TIMEOUT
                );
                handle.abort();
            }
        }
    }
}

impl Drop for LoopController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
