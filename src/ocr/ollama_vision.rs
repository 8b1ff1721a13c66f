use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use super::{OcrBackend, OCR_PROMPT};

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// OCR through an Ollama multimodal model (llava, llama3.2-vision, ...).
pub struct OllamaVisionOcr {
    base_url: String,
    model: String,
}

impl OllamaVisionOcr {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

impl OcrBackend for OllamaVisionOcr {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn perform_ocr(&self, image_path: &Path) -> Result<String> {
        let bytes = fs::read(image_path)
            .with_context(|| format!("Failed to read image {}", image_path.display()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        let url = format!("{}/api/generate", self.base_url);
        let response: GenerateResponse = client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt: OCR_PROMPT,
                images: vec![STANDARD.encode(bytes)],
                stream: false,
            })
            .send()
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?
            .json()
            .context("Invalid Ollama response")?;

        Ok(response.response)
    }
}
