// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for PdfScope

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::AnswerStrategy;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Hosted API endpoints and credentials
    pub providers: ProvidersConfig,

    /// Model identifiers per call site
    pub models: ModelConfig,

    /// Per-page extraction settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Question answering settings
    #[serde(default)]
    pub answer: AnswerConfig,

    /// Image description settings
    #[serde(default)]
    pub vision: VisionConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    /// Chat completions for text analysis and answering
    pub groq: EndpointConfig,
    /// Vision-capable chat completions
    pub openrouter: EndpointConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_analysis_model")]
    pub analysis: String,
    /// Tried in order; the first non-empty answer wins
    #[serde(default = "default_answer_models")]
    pub answer: Vec<String>,
    /// Selectable vision models; the first is the default
    #[serde(default = "default_vision_models")]
    pub vision: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub use_hosted: bool,
    #[serde(default = "default_analysis_chars")]
    pub max_chars: usize,
    #[serde(default = "default_analysis_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_analysis_temperature")]
    pub temperature: f32,
    #[serde(default = "default_analysis_top_p")]
    pub top_p: Option<f32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnswerConfig {
    #[serde(default)]
    pub strategy: AnswerStrategy,
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    #[serde(default = "default_image_descriptions")]
    pub image_descriptions: usize,
    #[serde(default = "default_image_description_chars")]
    pub image_description_chars: usize,
    #[serde(default = "default_answer_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_answer_temperature")]
    pub temperature: f32,
    #[serde(default = "default_answer_top_p")]
    pub top_p: Option<f32>,
}

/// Wire encoding used when sending an image to the vision endpoint
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Png,
    Jpeg,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisionConfig {
    #[serde(default)]
    pub encoding: ImageEncoding,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_vision_tokens")]
    pub max_tokens: u32,
    /// Pause between consecutive vision calls
    #[serde(default = "default_vision_delay")]
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_analysis_system_prompt")]
    pub analysis_system: String,
    #[serde(default = "default_answer_system_prompt")]
    pub answer_system: String,
    #[serde(default = "default_vision_prompt")]
    pub vision: String,
}

// Default value functions
fn default_true() -> bool { true }
fn default_analysis_model() -> String { "llama-3.1-8b-instant".to_string() }
fn default_analysis_chars() -> usize { 3500 }
fn default_analysis_tokens() -> u32 { 500 }
fn default_analysis_temperature() -> f32 { 0.1 }
fn default_analysis_top_p() -> Option<f32> { Some(0.9) }
fn default_context_chars() -> usize { 8000 }
fn default_image_descriptions() -> usize { 3 }
fn default_image_description_chars() -> usize { 300 }
fn default_answer_tokens() -> u32 { 1500 }
fn default_answer_temperature() -> f32 { 0.3 }
fn default_answer_top_p() -> Option<f32> { Some(0.95) }
fn default_jpeg_quality() -> u8 { 85 }
fn default_vision_tokens() -> u32 { 800 }
fn default_vision_delay() -> u64 { 500 }

fn default_answer_models() -> Vec<String> {
    vec![
        "llama-3.1-8b-instant",
        "llama-3.2-3b-preview",
        "llama-3.2-1b-preview",
        "mixtral-8x7b-32768",
        "gemma2-9b-it",
    ].into_iter().map(String::from).collect()
}

fn default_vision_models() -> Vec<String> {
    vec![
        "qwen/qwen-2.5-vl-72b-instruct",
        "anthropic/claude-3-haiku",
        "openai/gpt-4o-mini",
        "meta-llama/llama-3.2-11b-vision-instruct",
    ].into_iter().map(String::from).collect()
}

fn default_analysis_system_prompt() -> String {
    "You are an expert document analyst. Extract information accurately and return ONLY valid JSON."
        .to_string()
}

fn default_answer_system_prompt() -> String {
    "You are a careful document analyst. Answer questions using the provided document text \
     and image descriptions, citing page numbers where possible.".to_string()
}

fn default_vision_prompt() -> String {
    "Analyze this image in detail. Describe everything you see, including objects, text, \
     people, colors, layout, and any important details. Be thorough and precise.".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig {
                groq: EndpointConfig {
                    url: "https://api.groq.com/openai/v1".to_string(),
                    api_key: String::new(),
                    timeout_secs: None,
                },
                openrouter: EndpointConfig {
                    url: "https://openrouter.ai/api/v1".to_string(),
                    api_key: String::new(),
                    timeout_secs: Some(60),
                },
            },
            models: ModelConfig {
                analysis: default_analysis_model(),
                answer: default_answer_models(),
                vision: default_vision_models(),
            },
            analysis: AnalysisConfig::default(),
            answer: AnswerConfig::default(),
            vision: VisionConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_hosted: true,
            max_chars: default_analysis_chars(),
            max_tokens: default_analysis_tokens(),
            temperature: default_analysis_temperature(),
            top_p: default_analysis_top_p(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            strategy: AnswerStrategy::default(),
            context_chars: default_context_chars(),
            image_descriptions: default_image_descriptions(),
            image_description_chars: default_image_description_chars(),
            max_tokens: default_answer_tokens(),
            temperature: default_answer_temperature(),
            top_p: default_answer_top_p(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            encoding: ImageEncoding::default(),
            jpeg_quality: default_jpeg_quality(),
            max_tokens: default_vision_tokens(),
            delay_ms: default_vision_delay(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            analysis_system: default_analysis_system_prompt(),
            answer_system: default_answer_system_prompt(),
            vision: default_vision_prompt(),
        }
    }
}

impl EndpointConfig {
    /// True once an operator has supplied a key
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl ModelConfig {
    /// Default vision model (first entry)
    pub fn default_vision(&self) -> Option<&str> {
        self.vision.first().map(String::as_str)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::PdfScopeError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> crate::Result<()> {
        let fail = |msg: &str| Err(crate::PdfScopeError::Config(msg.to_string()));

        if self.models.analysis.trim().is_empty() {
            return fail("models.analysis must not be empty");
        }
        if self.models.answer.is_empty() {
            return fail("models.answer needs at least one candidate");
        }
        if self.models.vision.is_empty() {
            return fail("models.vision needs at least one model");
        }
        if self.analysis.max_chars == 0 || self.answer.context_chars == 0 {
            return fail("character limits must be greater than zero");
        }
        for t in [self.analysis.temperature, self.answer.temperature] {
            if !(0.0..=2.0).contains(&t) {
                return fail("temperature must be within 0.0..=2.0");
            }
        }
        if !(1..=100).contains(&self.vision.jpeg_quality) {
            return fail("vision.jpeg_quality must be within 1..=100");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.providers.groq.is_configured());
        assert_eq!(config.providers.openrouter.timeout_secs, Some(60));
        assert_eq!(config.models.default_vision(), Some("qwen/qwen-2.5-vl-72b-instruct"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.analysis.max_chars, 3500);
        assert_eq!(config.answer.context_chars, 8000);
    }

    #[test]
    fn test_save_and_load_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{
            "providers": {
                "groq": { "url": "https://api.groq.com/openai/v1", "api_key": "gsk_test" },
                "openrouter": { "url": "https://openrouter.ai/api/v1" }
            },
            "models": { "analysis": "llama-3.1-8b-instant" },
            "answer": { "strategy": "fast" },
            "vision": { "encoding": "jpeg" }
        }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert!(config.providers.groq.is_configured());
        assert!(!config.providers.openrouter.is_configured());
        assert_eq!(config.answer.strategy, AnswerStrategy::Heuristic);
        assert_eq!(config.vision.encoding, ImageEncoding::Jpeg);
        assert_eq!(config.models.answer.len(), 5);

        let out = dir.path().join("out.json");
        config.save(&out).unwrap();
        let again = AppConfig::load(&out).unwrap();
        assert_eq!(again.providers.groq.api_key, "gsk_test");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.vision.jpeg_quality = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.models.answer.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analysis.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
