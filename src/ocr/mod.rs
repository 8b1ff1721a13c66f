use anyhow::Result;
use log::warn;
use std::{path::Path, sync::Arc};

mod filters;
mod ollama_vision;
mod openai_vision;

pub use filters::NoiseFilter;
pub use ollama_vision::OllamaVisionOcr;
pub use openai_vision::OpenAiVisionOcr;

use crate::config::{Config, ConfigError};

/// Instruction sent to vision models along with the screenshot.
pub(crate) const OCR_PROMPT: &str =
    "Extract all text contained in this image. Output only the text, with no explanation.";

/// A concrete OCR engine. May fail; [`OcrEngine`] turns failures into empty text.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn perform_ocr(&self, image_path: &Path) -> Result<String>;
}

/// Text extraction as the capture pipeline sees it: total, "" when nothing was read.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image_path: &Path) -> String;
}

pub struct OcrEngine {
    backend: Box<dyn OcrBackend>,
    filter: Option<NoiseFilter>,
}

impl OcrEngine {
    pub fn new(backend: Box<dyn OcrBackend>, filter_noise: bool) -> Self {
        Self {
            backend,
            filter: filter_noise.then(NoiseFilter::new),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(backend_from_config(config)?, config.ocr_filter_noise))
    }
}

impl TextExtractor for OcrEngine {
    fn extract(&self, image_path: &Path) -> String {
        let text = match self.backend.perform_ocr(image_path) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "{} OCR failed for {}: {err:#}",
                    self.backend.name(),
                    image_path.display()
                );
                return String::new();
            }
        };

        match &self.filter {
            Some(filter) => filter.filter(&text),
            None => text,
        }
    }
}

impl<T: TextExtractor + ?Sized> TextExtractor for Arc<T> {
    fn extract(&self, image_path: &Path) -> String {
        (**self).extract(image_path)
    }
}

/// Maps `ocr_backend` to an implementation; unknown names fail fast.
pub fn backend_from_config(config: &Config) -> Result<Box<dyn OcrBackend>, ConfigError> {
    match config.ocr_backend.as_str() {
        "ollama" => Ok(Box::new(OllamaVisionOcr::new(
            &config.ollama_base_url,
            &config.ocr_model,
        ))),
        "openai" => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or(ConfigError::MissingApiKey("OPENAI_API_KEY"))?;
            Ok(Box::new(OpenAiVisionOcr::new(api_key, &config.openai_model)))
        }
        other => Err(ConfigError::UnknownOcrBackend(other.to_string())),
    }
}
