use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use log::{error, info};
use serde::Serialize;

mod paths;

pub use paths::{
    date_dir_for, hourly_filename, hourly_filename_for, hourly_log_path, legacy_daily_filename,
    summary_dir_for_date, summary_filename, summary_path,
};

use crate::models::{
    EntryKind, LegacyLogEntry, LogEntry, LogRecord, SlackContext, SpeechEntry, WindowInfo,
    DEFAULT_SPEECH_LANGUAGE,
};

enum WriterCommand {
    Append {
        path: PathBuf,
        line: String,
        reply: mpsc::Sender<Result<()>>,
    },
    Shutdown,
}

struct WriterInner {
    sender: Mutex<mpsc::Sender<WriterCommand>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WriterInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            let sender = match self.sender.lock() {
                Ok(sender) => sender,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(err) = sender.send(WriterCommand::Shutdown) {
                error!("Failed to send shutdown to log writer: {err}");
            }
            drop(sender);
            if let Err(join_err) = handle.join() {
                error!("Failed to join log writer thread: {join_err:?}");
            }
        }
    }
}

/// Append-only JSONL storage partitioned as `<base>/<date>/activity_<HH>.jsonl`,
/// plus the legacy `<base>/activity_<date>.jsonl` daily file.
///
/// Every append goes through one writer thread, so concurrent producers never
/// interleave inside a line. Each line is written with a single `write_all`
/// on a file opened in append mode.
#[derive(Clone)]
pub struct LogStore {
    inner: Arc<WriterInner>,
    base: Arc<PathBuf>,
    speech_language: Arc<str>,
}

impl LogStore {
    pub fn new(base: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base)
            .with_context(|| format!("failed to create log directory {}", base.display()))?;

        let (command_tx, command_rx) = mpsc::channel::<WriterCommand>();

        let worker = thread::Builder::new()
            .name("auto-daily-log-writer".into())
            .spawn(move || {
                while let Ok(command) = command_rx.recv() {
                    match command {
                        WriterCommand::Append { path, line, reply } => {
                            let _ = reply.send(append_line(&path, &line));
                        }
                        WriterCommand::Shutdown => break,
                    }
                }

                info!("Log writer thread shutting down");
            })
            .context("failed to spawn log writer thread")?;

        info!("Log store initialized at {}", base.display());

        Ok(Self {
            inner: Arc::new(WriterInner {
                sender: Mutex::new(command_tx),
                worker: Mutex::new(Some(worker)),
            }),
            base: Arc::new(base),
            speech_language: Arc::from(DEFAULT_SPEECH_LANGUAGE),
        })
    }

    /// Language recorded for speech entries that do not name one.
    pub fn with_speech_language(mut self, language: &str) -> Self {
        self.speech_language = Arc::from(language);
        self
    }

    pub fn base(&self) -> &Path {
        self.base.as_path()
    }

    /// Appends a window observation to the current hour's file.
    pub fn append_hourly(
        &self,
        window_info: &WindowInfo,
        ocr_text: &str,
        slack_context: Option<SlackContext>,
    ) -> Result<PathBuf> {
        self.append_hourly_at(Local::now(), window_info, ocr_text, slack_context)
    }

    /// Same as [`append_hourly`](Self::append_hourly) with an explicit creation time;
    /// the time picks both the entry timestamp and the target file.
    pub fn append_hourly_at(
        &self,
        timestamp: DateTime<Local>,
        window_info: &WindowInfo,
        ocr_text: &str,
        slack_context: Option<SlackContext>,
    ) -> Result<PathBuf> {
        let path = self.hourly_path(&timestamp)?;
        let entry = LogEntry {
            timestamp,
            window_info: window_info.clone(),
            ocr_text: ocr_text.to_string(),
            slack_context,
        };
        self.append(path, &entry)
    }

    /// Appends a speech snippet; `language` falls back to the store default (`ja-JP`).
    pub fn append_speech(
        &self,
        transcript: &str,
        confidence: f64,
        is_final: bool,
        language: Option<&str>,
    ) -> Result<PathBuf> {
        self.append_speech_at(Local::now(), transcript, confidence, is_final, language)
    }

    pub fn append_speech_at(
        &self,
        timestamp: DateTime<Local>,
        transcript: &str,
        confidence: f64,
        is_final: bool,
        language: Option<&str>,
    ) -> Result<PathBuf> {
        let path = self.hourly_path(&timestamp)?;
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let entry = SpeechEntry {
            timestamp,
            kind: EntryKind::Speech,
            transcript: transcript.to_string(),
            confidence,
            is_final,
            language: language.unwrap_or(&*self.speech_language).to_string(),
        };
        self.append(path, &entry)
    }

    /// Appends to the legacy `activity_<date>.jsonl` file directly under the base.
    pub fn append_legacy_daily(&self, window_info: &WindowInfo, ocr_text: &str) -> Result<PathBuf> {
        self.append_legacy_daily_at(Local::now(), window_info, ocr_text)
    }

    pub fn append_legacy_daily_at(
        &self,
        timestamp: DateTime<Local>,
        window_info: &WindowInfo,
        ocr_text: &str,
    ) -> Result<PathBuf> {
        let path = self
            .base
            .join(legacy_daily_filename(timestamp.date_naive()));
        let entry = LegacyLogEntry {
            timestamp,
            window_info: window_info.clone(),
            ocr_text: ocr_text.to_string(),
        };
        self.append(path, &entry)
    }

    fn hourly_path(&self, timestamp: &DateTime<Local>) -> Result<PathBuf> {
        let dir = date_dir_for(&self.base, timestamp)?;
        Ok(dir.join(hourly_filename_for(timestamp)))
    }

    fn append<T: Serialize>(&self, path: PathBuf, entry: &T) -> Result<PathBuf> {
        let line = serde_json::to_string(entry).context("failed to serialize log entry")?;
        let (reply_tx, reply_rx) = mpsc::channel();

        {
            let sender = self
                .inner
                .sender
                .lock()
                .map_err(|_| anyhow!("log writer sender poisoned"))?;
            sender
                .send(WriterCommand::Append {
                    path: path.clone(),
                    line,
                    reply: reply_tx,
                })
                .map_err(|_| anyhow!("log writer thread is not running"))?;
        }

        reply_rx
            .recv()
            .map_err(|_| anyhow!("log writer dropped append reply"))?
            .with_context(|| format!("failed to append to {}", path.display()))?;

        Ok(path)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(buf.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Reads every record of a JSONL log file, skipping blank lines.
pub fn read_records(path: &Path) -> Result<Vec<LogRecord>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).with_context(|| {
            format!("invalid log line {} in {}", index + 1, path.display())
        })?;
        records.push(record);
    }
    Ok(records)
}
