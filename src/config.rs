use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::{sensing::DEFAULT_CAPTURE_INTERVAL, summary::DEFAULT_CHECK_INTERVAL};

pub const ENV_LOG_DIR: &str = "AUTO_DAILY_LOG_DIR";
pub const ENV_SUMMARIES_DIR: &str = "AUTO_DAILY_SUMMARIES_DIR";
pub const ENV_REPORTS_DIR: &str = "AUTO_DAILY_REPORTS_DIR";
pub const ENV_SETTINGS: &str = "AUTO_DAILY_SETTINGS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown OCR backend: {0}")]
    UnknownOcrBackend(String),
    #[error("unknown AI backend: {0}")]
    UnknownAiBackend(String),
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_dir: PathBuf,
    pub summaries_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub capture_interval_secs: u64,
    pub poll_interval_secs: f64,
    pub summary_check_interval_secs: u64,
    pub ocr_backend: String,
    pub ocr_model: String,
    pub ocr_filter_noise: bool,
    pub ai_backend: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub lm_studio_base_url: String,
    pub lm_studio_model: String,
    pub summary_prompt_path: Option<PathBuf>,
    pub report_prompt_path: Option<PathBuf>,
    pub speech_language: String,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".auto-daily");

        Self {
            log_dir: base.join("logs"),
            summaries_dir: base.join("summaries"),
            reports_dir: base.join("reports"),
            capture_interval_secs: DEFAULT_CAPTURE_INTERVAL.as_secs(),
            poll_interval_secs: 1.0,
            summary_check_interval_secs: DEFAULT_CHECK_INTERVAL.as_secs(),
            ocr_backend: "ollama".into(),
            ocr_model: "llava".into(),
            ocr_filter_noise: true,
            ai_backend: "ollama".into(),
            ollama_base_url: "http://localhost:11434".into(),
            ollama_model: "gemma2".into(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            lm_studio_base_url: "http://localhost:1234".into(),
            lm_studio_model: "default".into(),
            summary_prompt_path: None,
            report_prompt_path: None,
            speech_language: crate::models::DEFAULT_SPEECH_LANGUAGE.into(),
        }
    }
}

impl Config {
    /// Defaults, then the JSON settings file if present, then environment overrides.
    /// Log, summary and report directories are created.
    pub fn load() -> Result<Self> {
        let settings_path = env::var_os(ENV_SETTINGS)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".auto-daily").join("settings.json")));

        let mut config = match settings_path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.ensure_dirs()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// Applies overrides from a key lookup; `lookup` is `env::var` outside tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_SUMMARIES_DIR) {
            self.summaries_dir = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_REPORTS_DIR) {
            self.reports_dir = PathBuf::from(value);
        }
        if let Some(value) = get("AUTO_DAILY_CAPTURE_INTERVAL") {
            self.capture_interval_secs = parse_value("AUTO_DAILY_CAPTURE_INTERVAL", &value)?;
        }
        if let Some(value) = get("AUTO_DAILY_POLL_INTERVAL") {
            self.poll_interval_secs = parse_value("AUTO_DAILY_POLL_INTERVAL", &value)?;
        }
        if let Some(value) = get("AUTO_DAILY_SUMMARY_CHECK_INTERVAL") {
            self.summary_check_interval_secs =
                parse_value("AUTO_DAILY_SUMMARY_CHECK_INTERVAL", &value)?;
        }
        if let Some(value) = get("OCR_BACKEND") {
            self.ocr_backend = value.trim().to_lowercase();
        }
        if let Some(value) = get("OCR_MODEL") {
            self.ocr_model = value;
        }
        if let Some(value) = get("OCR_FILTER_NOISE") {
            self.ocr_filter_noise = parse_flag("OCR_FILTER_NOISE", &value)?;
        }
        if let Some(value) = get("AI_BACKEND") {
            self.ai_backend = value.trim().to_lowercase();
        }
        if let Some(value) = get("OLLAMA_BASE_URL") {
            self.ollama_base_url = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = get("OLLAMA_MODEL") {
            self.ollama_model = value;
        }
        if let Some(value) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(value);
        }
        if let Some(value) = get("OPENAI_MODEL") {
            self.openai_model = value;
        }
        if let Some(value) = get("LM_STUDIO_BASE_URL") {
            self.lm_studio_base_url = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = get("LM_STUDIO_MODEL") {
            self.lm_studio_model = value;
        }
        if let Some(value) = get("AUTO_DAILY_SUMMARY_PROMPT") {
            self.summary_prompt_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get("AUTO_DAILY_REPORT_PROMPT") {
            self.report_prompt_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get("AUTO_DAILY_SPEECH_LANGUAGE") {
            self.speech_language = value;
        }

        if !self.poll_interval_secs.is_finite() || self.poll_interval_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "AUTO_DAILY_POLL_INTERVAL",
                value: self.poll_interval_secs.to_string(),
            });
        }
        if self.capture_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUTO_DAILY_CAPTURE_INTERVAL",
                value: "0".into(),
            });
        }
        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.log_dir, &self.summaries_dir, &self.reports_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn summary_check_interval(&self) -> Duration {
        Duration::from_secs(self.summary_check_interval_secs.max(1))
    }

    /// Model name passed to the text generator for the configured AI backend.
    pub fn summary_model(&self) -> &str {
        match self.ai_backend.as_str() {
            "openai" => &self.openai_model,
            "lm_studio" => &self.lm_studio_model,
            _ => &self.ollama_model,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_log_dir_from_env() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[(ENV_LOG_DIR, "/tmp/custom-logs")]))
            .unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/tmp/custom-logs"));
    }

    #[test]
    fn test_log_dir_default() {
        let config = Config::default();
        assert!(config.log_dir.ends_with(".auto-daily/logs"));
        assert!(config.summaries_dir.ends_with(".auto-daily/summaries"));
        assert!(config.reports_dir.ends_with(".auto-daily/reports"));
        assert_eq!(config.capture_interval(), Duration::from_secs(30));
        assert_eq!(config.summary_check_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_dirs_auto_created() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                (ENV_LOG_DIR, dir.path().join("a/logs").to_str().unwrap()),
                (ENV_SUMMARIES_DIR, dir.path().join("a/summaries").to_str().unwrap()),
                (ENV_REPORTS_DIR, dir.path().join("a/reports").to_str().unwrap()),
            ]))
            .unwrap();
        config.ensure_dirs().unwrap();
        assert!(dir.path().join("a/logs").is_dir());
        assert!(dir.path().join("a/summaries").is_dir());
        assert!(dir.path().join("a/reports").is_dir());
    }

    #[test]
    fn test_invalid_interval_is_named() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("AUTO_DAILY_CAPTURE_INTERVAL", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "AUTO_DAILY_CAPTURE_INTERVAL",
                value: "soon".into()
            }
        );
    }

    #[test]
    fn test_filter_noise_flag() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[("OCR_FILTER_NOISE", "false")]))
            .unwrap();
        assert!(!config.ocr_filter_noise);
    }

    #[test]
    fn test_settings_file_then_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"ai_backend":"openai","capture_interval_secs":10}"#).unwrap();

        let mut config = Config::from_file(&path).unwrap();
        assert_eq!(config.ai_backend, "openai");
        assert_eq!(config.capture_interval_secs, 10);
        assert_eq!(config.ocr_model, "llava");
        assert_eq!(config.summary_model(), "gpt-4o-mini");

        config
            .apply_overrides(lookup(&[("AI_BACKEND", "LM_Studio")]))
            .unwrap();
        assert_eq!(config.summary_model(), "default");
    }
}
