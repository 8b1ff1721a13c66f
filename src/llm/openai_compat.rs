use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde_json::json;
use std::time::Duration;

use super::{ChatCompletionResponse, TextGenerator};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const GENERATE_TIMEOUT_SECS: u64 = 300;
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Chat-completions client for OpenAI and servers speaking the same API (LM Studio).
pub struct OpenAiCompatClient {
    name: &'static str,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    pub fn openai(api_key: String) -> Self {
        Self {
            name: "openai",
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: Some(api_key),
        }
    }

    /// LM Studio needs no API key.
    pub fn lm_studio(base_url: &str) -> Self {
        Self {
            name: "lm_studio",
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    fn client(timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")
    }
}

impl TextGenerator for OpenAiCompatClient {
    fn name(&self) -> &'static str {
        self.name
    }

    fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut request = Self::client(GENERATE_TIMEOUT_SECS)?.post(&url).json(&json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }]
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: ChatCompletionResponse = request
            .send()
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?
            .json()
            .with_context(|| format!("Invalid {} response", self.name))?;

        response
            .into_content()
            .ok_or_else(|| anyhow!("{} returned no choices", self.name))
    }

    fn is_available(&self) -> bool {
        if self.api_key.is_some() {
            return true;
        }
        let Ok(client) = Self::client(PROBE_TIMEOUT_SECS) else {
            return false;
        };
        client
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}
