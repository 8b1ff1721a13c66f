use chrono::{DateTime, Local};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    log_store::LogStore,
    macos_bridge::cleanup_image,
    models::WindowInfo,
    ocr::TextExtractor,
};

use super::{is_chat_client, parse_slack_title, ScreenCapturer};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, Clone)]
pub struct CaptureContext {
    pub window_info: WindowInfo,
    pub extract_slack_context: bool,
}

impl CaptureContext {
    pub fn new(window_info: WindowInfo) -> Self {
        Self {
            window_info,
            extract_slack_context: true,
        }
    }
}

/// Removes the capture file when dropped, whatever happened in between.
struct TempCapture(PathBuf);

impl TempCapture {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempCapture {
    fn drop(&mut self) {
        cleanup_image(&self.0);
    }
}

/// Capture -> OCR -> log -> cleanup for a single frame.
#[derive(Clone)]
pub struct CapturePipeline {
    capturer: Arc<dyn ScreenCapturer>,
    extractor: Arc<dyn TextExtractor>,
    store: LogStore,
}

impl CapturePipeline {
    pub fn new(
        capturer: Arc<dyn ScreenCapturer>,
        extractor: Arc<dyn TextExtractor>,
        store: LogStore,
    ) -> Self {
        Self {
            capturer,
            extractor,
            store,
        }
    }

    pub fn log_dir(&self) -> &Path {
        self.store.base()
    }

    /// Returns `true` only when the entry was appended. A failed capture
    /// aborts before OCR; once a file exists it is always deleted.
    pub fn execute(&self, context: &CaptureContext) -> bool {
        self.execute_at(Local::now(), context)
    }

    /// [`execute`](Self::execute) with the entry time (and so the hourly file) fixed.
    pub fn execute_at(&self, timestamp: DateTime<Local>, context: &CaptureContext) -> bool {
        let Some(image_path) = self.capturer.capture(self.store.base()) else {
            log_warn!("screen capture failed; skipping this frame");
            return false;
        };
        let capture = TempCapture(image_path);

        let ocr_text = self.extractor.extract(capture.path());

        let window = &context.window_info;
        let slack_context = (context.extract_slack_context && is_chat_client(&window.app_name))
            .then(|| parse_slack_title(&window.window_title));

        match self
            .store
            .append_hourly_at(timestamp, window, &ocr_text, slack_context)
        {
            Ok(path) => {
                log_debug!(
                    "logged {} ({} chars) to {}",
                    window.app_name,
                    ocr_text.len(),
                    path.display()
                );
                true
            }
            Err(err) => {
                log_warn!("failed to append activity log: {err:#}");
                false
            }
        }
    }
}
