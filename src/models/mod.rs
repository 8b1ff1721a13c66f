mod entry;
mod window;

pub use entry::{EntryKind, LegacyLogEntry, LogEntry, LogRecord, SpeechEntry, DEFAULT_SPEECH_LANGUAGE};
pub use window::{SlackContext, WindowInfo};
