use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::models::WindowInfo;

mod controller;
mod interval_capture;
mod pipeline;
mod slack;
mod window_poller;

pub use controller::{LoopController, STOP_TIMEOUT};
pub use interval_capture::{CaptureCallback, IntervalCapture, DEFAULT_CAPTURE_INTERVAL};
pub use pipeline::{CaptureContext, CapturePipeline};
pub use slack::{extract_conversations, is_chat_client, parse_slack_title, SlackMessage};
pub use window_poller::{WindowChangeCallback, WindowPoller, WindowTracker};

/// Takes a full-screen snapshot into `output_dir`; `None` on failure.
pub trait ScreenCapturer: Send + Sync {
    fn capture(&self, output_dir: &Path) -> Option<PathBuf>;
}

/// Reads the current foreground window.
pub trait WindowSource: Send + Sync {
    fn active_window(&self) -> Result<WindowInfo>;
}

/// `false` while the screen is locked.
pub trait ActivityProbe: Send + Sync {
    fn is_active(&self) -> bool;
}
