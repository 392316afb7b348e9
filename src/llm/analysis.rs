// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-page structured extraction with a heuristic fallback

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{prompts, ChatBackend, ChatMessage, ChatRequest};
use crate::config::{AnalysisConfig, AppConfig};
use crate::heuristics::HeuristicAnalyzer;
use crate::model::{Analysis, AnalysisSource};
use crate::{PdfScopeError, Result};

/// Asks a hosted model for entities, keywords and events; never fails
pub struct AnalysisBridge {
    backend: Option<Arc<dyn ChatBackend>>,
    model: String,
    system_prompt: String,
    settings: AnalysisConfig,
    heuristic: HeuristicAnalyzer,
}

impl AnalysisBridge {
    /// `backend` is ignored when hosted analysis is disabled in `config`
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, config: &AppConfig) -> Self {
        Self {
            backend: backend.filter(|_| config.analysis.use_hosted),
            model: config.models.analysis.clone(),
            system_prompt: config.prompts.analysis_system.clone(),
            settings: config.analysis.clone(),
            heuristic: HeuristicAnalyzer::new(),
        }
    }

    /// Heuristics only, no network
    pub fn heuristic(config: &AppConfig) -> Self {
        Self::new(None, config)
    }

    pub fn is_hosted(&self) -> bool {
        self.backend.is_some()
    }

    /// Analyze one page, falling back to heuristics on any hosted failure
    pub async fn analyze(&self, text: &str, page: u32) -> Analysis {
        let Some(backend) = &self.backend else {
            return self.heuristic.analyze(text, page);
        };

        match self.request(backend.as_ref(), text, page).await {
            Ok(analysis) => {
                debug!("Hosted analysis of page {} succeeded", page);
                analysis
            }
            Err(e) => {
                warn!("Hosted analysis of page {} failed, using heuristics: {}", page, e);
                self.heuristic.analyze(text, page)
            }
        }
    }

    async fn request(&self, backend: &dyn ChatBackend, text: &str, page: u32) -> Result<Analysis> {
        let request = ChatRequest::new(
            self.model.as_str(),
            vec![
                ChatMessage::system(self.system_prompt.as_str()),
                ChatMessage::user(prompts::analysis_prompt(text, page, self.settings.max_chars)),
            ],
            self.settings.max_tokens,
        )
        .temperature(self.settings.temperature)
        .top_p(self.settings.top_p);

        let reply = backend.complete(&request).await?;
        parse_analysis(&reply)
    }
}

/// Remove markdown code fences around a JSON reply
pub fn strip_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse a model reply into a capped hosted [`Analysis`]
pub fn parse_analysis(reply: &str) -> Result<Analysis> {
    let value: Value = serde_json::from_str(&strip_fences(reply))?;
    let object = value
        .as_object()
        .ok_or_else(|| PdfScopeError::MalformedResponse("expected a JSON object".to_string()))?;

    let list = |key: &str| -> Result<Vec<String>> {
        let items = object
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| PdfScopeError::MalformedResponse(format!("missing list '{}'", key)))?;

        Ok(items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect())
    };

    Ok(Analysis {
        entities: list("entities")?,
        keywords: list("keywords")?,
        events: list("events")?,
        source: AnalysisSource::Hosted,
    }
    .truncated())
}
