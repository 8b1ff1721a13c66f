use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::{SlackContext, WindowInfo};

pub const DEFAULT_SPEECH_LANGUAGE: &str = "ja-JP";

/// One screen observation. `slack_context` is always written, as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub window_info: WindowInfo,
    pub ocr_text: String,
    #[serde(default)]
    pub slack_context: Option<SlackContext>,
}

/// Entry shape of the legacy `activity_<date>.jsonl` daily file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyLogEntry {
    pub timestamp: DateTime<Local>,
    pub window_info: WindowInfo,
    pub ocr_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Speech,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechEntry {
    pub timestamp: DateTime<Local>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub transcript: String,
    pub confidence: f64,
    pub is_final: bool,
    pub language: String,
}

/// Any line found in an hourly log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    Speech(SpeechEntry),
    Window(LogEntry),
}

impl LogRecord {
    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            LogRecord::Speech(entry) => entry.timestamp,
            LogRecord::Window(entry) => entry.timestamp,
        }
    }
}
