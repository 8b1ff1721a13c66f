use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;

mod ollama;
mod openai_compat;

pub use ollama::OllamaClient;
pub use openai_compat::OpenAiCompatClient;

use crate::config::{Config, ConfigError};

/// Text generation backend used for hourly summaries.
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self, prompt: &str, model: &str) -> Result<String>;

    /// Cheap reachability probe; summaries are skipped when this is false.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        (**self).generate(prompt, model)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Maps `ai_backend` to a client; unknown names fail fast.
pub fn generator_from_config(config: &Config) -> Result<Box<dyn TextGenerator>, ConfigError> {
    match config.ai_backend.as_str() {
        "ollama" => Ok(Box::new(OllamaClient::new(&config.ollama_base_url))),
        "openai" => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or(ConfigError::MissingApiKey("OPENAI_API_KEY"))?;
            Ok(Box::new(OpenAiCompatClient::openai(api_key)))
        }
        "lm_studio" => Ok(Box::new(OpenAiCompatClient::lm_studio(
            &config.lm_studio_base_url,
        ))),
        other => Err(ConfigError::UnknownAiBackend(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// First choice's content, "" when the model returned a null message.
    pub(crate) fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
    }
}
