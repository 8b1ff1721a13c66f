use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::Client;
use serde_json::json;
use std::{fs, path::Path, time::Duration};

use super::{OcrBackend, OCR_PROMPT};
use crate::llm::ChatCompletionResponse;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// OCR through an OpenAI vision-capable chat model.
pub struct OpenAiVisionOcr {
    api_key: String,
    model: String,
}

impl OpenAiVisionOcr {
    pub fn new(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            model: model.to_string(),
        }
    }
}

impl OcrBackend for OpenAiVisionOcr {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn perform_ocr(&self, image_path: &Path) -> Result<String> {
        let bytes = fs::read(image_path)
            .with_context(|| format!("Failed to read image {}", image_path.display()))?;
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(bytes));

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": OCR_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        let response: ChatCompletionResponse = client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .context("Failed to reach OpenAI")?
            .error_for_status()?
            .json()
            .context("Invalid OpenAI response")?;

        response
            .into_content()
            .ok_or_else(|| anyhow!("OpenAI returned no choices"))
    }
}
