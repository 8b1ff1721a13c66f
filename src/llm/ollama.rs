use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TextGenerator;

const GENERATE_TIMEOUT_SECS: u64 = 300;
const PROBE_TIMEOUT_SECS: u64 = 5;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn client(timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")
    }
}

impl TextGenerator for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let response: GenerateResponse = Self::client(GENERATE_TIMEOUT_SECS)?
            .post(&url)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?
            .json()
            .context("Invalid Ollama response")?;

        Ok(response.response)
    }

    fn is_available(&self) -> bool {
        let Ok(client) = Self::client(PROBE_TIMEOUT_SECS) else {
            return false;
        };
        client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}
