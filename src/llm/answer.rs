// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Question answering: ordered hosted candidates with a heuristic fallback

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{prompts, ChatBackend, ChatMessage, ChatRequest};
use crate::config::{AnswerConfig, AppConfig};
use crate::heuristics::{truncate_chars, HeuristicAnswerer};
use crate::model::{AnswerRequest, AnswerStrategy, Document};

/// Characters of a model error kept in the fallback warning
const ERROR_EXCERPT_CHARS: usize = 100;

/// Result of trying every candidate model in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Success { model: String, text: String },
    AllFailed { last_error: String },
}

/// Hosted answering over an ordered list of candidate models
pub struct HostedAnswerer {
    backend: Arc<dyn ChatBackend>,
    candidates: Vec<String>,
    system_prompt: String,
    settings: AnswerConfig,
}

impl HostedAnswerer {
    pub fn new(backend: Arc<dyn ChatBackend>, config: &AppConfig) -> Self {
        Self {
            backend,
            candidates: config.models.answer.clone(),
            system_prompt: config.prompts.answer_system.clone(),
            settings: config.answer.clone(),
        }
    }

    /// First non-empty reply wins; later candidates are not contacted
    pub async fn ask(&self, prompt: &str) -> CandidateOutcome {
        let mut last_error = "no candidate models configured".to_string();

        for model in &self.candidates {
            let request = ChatRequest::new(
                model.as_str(),
                vec![
                    ChatMessage::system(self.system_prompt.as_str()),
                    ChatMessage::user(prompt),
                ],
                self.settings.max_tokens,
            )
            .temperature(self.settings.temperature)
            .top_p(self.settings.top_p);

            match self.backend.complete(&request).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!("Answered with {}", model);
                    return CandidateOutcome::Success {
                        model: model.clone(),
                        text: text.trim().to_string(),
                    };
                }
                Ok(_) => {
                    debug!("Model {} returned an empty answer", model);
                    last_error = format!("Model {} failed: empty response", model);
                }
                Err(e) => {
                    debug!("Model {} failed: {}", model, e);
                    let reason = e.to_string();
                    last_error = format!(
                        "Model {} failed: {}",
                        model,
                        truncate_chars(&reason, ERROR_EXCERPT_CHARS)
                    );
                }
            }
        }

        CandidateOutcome::AllFailed { last_error }
    }
}

/// Strategy dispatch; always produces an answer
pub struct QuestionAnswerer {
    hosted: Option<HostedAnswerer>,
    heuristic: HeuristicAnswerer,
    settings: AnswerConfig,
}

impl QuestionAnswerer {
    pub fn new(hosted: Option<HostedAnswerer>, config: &AppConfig) -> Self {
        Self {
            hosted,
            heuristic: HeuristicAnswerer::new(),
            settings: config.answer.clone(),
        }
    }

    pub async fn answer(&self, doc: &Document, request: &AnswerRequest) -> String {
        let heuristic = || self.heuristic.answer(&request.question, &doc.pages);

        if request.strategy == AnswerStrategy::Heuristic {
            return heuristic();
        }

        let Some(hosted) = &self.hosted else {
            warn!("Hosted answering requested without a configured provider");
            return format!(
                "WARNING: Hosted model not configured.\n\nFallback Analysis:\n{}",
                heuristic()
            );
        };

        let context = prompts::answer_context(doc, &self.settings, request.include_images);
        let prompt = prompts::answer_prompt(&context, &request.question);

        match hosted.ask(&prompt).await {
            CandidateOutcome::Success { model, text } => {
                hosted_report(&request.question, &model, doc.described_image_count(), &text)
            }
            CandidateOutcome::AllFailed { last_error } => {
                warn!("All hosted models failed: {}", last_error);
                format!(
                    "WARNING: All hosted models failed. {}\n\nFallback Analysis:\n{}",
                    last_error,
                    heuristic()
                )
            }
        }
    }
}

/// Framed hosted answer with question, model, local time and image count
pub fn hosted_report(question: &str, model: &str, images_described: usize, answer: &str) -> String {
    let rule = "=".repeat(80);
    let thin = "-".repeat(80);
    let time = chrono::Local::now().format("%H:%M:%S");

    format!(
        "{rule}\nDOCUMENT ANALYSIS REPORT\n{rule}\n\n\
         QUESTION: {question}\n\n\
         MODE: Hosted model\n\
         TIME: {time}\n\
         MODEL: {model}\n\
         IMAGES ANALYZED: {images_described}\n\n\
         {thin}\nANSWER:\n{thin}\n\n\
         {answer}\n\n\
         {rule}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedBackend;

    const PAGE: &str = "Detective Smith said the window was broken.";

    fn hosted(backend: Arc<ScriptedBackend>) -> HostedAnswerer {
        let backend: Arc<dyn ChatBackend> = backend;
        HostedAnswerer::new(backend, &AppConfig::default())
    }

    #[tokio::test]
    async fn test_first_success_stops_the_loop() {
        let backend = Arc::new(ScriptedBackend::new().status(500).reply("   ").reply("It was Smith."));
        let outcome = hosted(backend.clone()).ask("who?").await;

        assert_eq!(
            outcome,
            CandidateOutcome::Success {
                model: "llama-3.2-1b-preview".to_string(),
                text: "It was Smith.".to_string(),
            }
        );
        let models: Vec<String> = backend.recorded().into_iter().map(|r| r.model).collect();
        assert_eq!(models, vec!["llama-3.1-8b-instant", "llama-3.2-3b-preview", "llama-3.2-1b-preview"]);
    }

    #[tokio::test]
    async fn test_all_candidates_fail() {
        let backend = Arc::new(ScriptedBackend::new().status(500).status(500).status(500).status(500).status(429));
        let outcome = hosted(backend.clone()).ask("who?").await;

        match outcome {
            CandidateOutcome::AllFailed { last_error } => {
                assert!(last_error.starts_with("Model gemma2-9b-it failed"));
                assert!(last_error.contains("429"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(backend.recorded().len(), 5);
    }

    #[tokio::test]
    async fn test_fallback_prefixes_warning() {
        let backend = Arc::new(ScriptedBackend::new());
        let answerer = QuestionAnswerer::new(Some(hosted(backend)), &AppConfig::default());
        let doc = Document::from_texts([PAGE]);

        let answer = answerer
            .answer(&doc, &AnswerRequest::new("Who is Detective Smith?", AnswerStrategy::Hosted))
            .await;

        assert!(answer.starts_with("WARNING: All hosted models failed."));
        assert!(answer.contains("Fallback Analysis:\n===="));
        assert!(answer.contains("Identified: Detective Smith"));
    }

    #[tokio::test]
    async fn test_unconfigured_hosted_falls_back() {
        let answerer = QuestionAnswerer::new(None, &AppConfig::default());
        let doc = Document::from_texts([PAGE]);

        let answer = answerer
            .answer(&doc, &AnswerRequest::new("Who is Detective Smith?", AnswerStrategy::Hosted))
            .await;
        assert!(answer.starts_with("WARNING: Hosted model not configured."));
    }

    #[tokio::test]
    async fn test_heuristic_strategy_skips_backend() {
        let backend = Arc::new(ScriptedBackend::always("hosted"));
        let answerer = QuestionAnswerer::new(Some(hosted(backend.clone())), &AppConfig::default());
        let doc = Document::from_texts([PAGE]);

        let answer = answerer
            .answer(&doc, &AnswerRequest::new("Who is Detective Smith?", AnswerStrategy::Heuristic))
            .await;

        assert!(answer.contains("QUESTION: Who is Detective Smith?"));
        assert!(backend.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_hosted_report_and_prompt() {
        let backend = Arc::new(ScriptedBackend::new().reply("Smith is the detective (Page 1)."));
        let answerer = QuestionAnswerer::new(Some(hosted(backend.clone())), &AppConfig::default());
        let doc = Document::from_texts([PAGE]);

        let answer = answerer
            .answer(&doc, &AnswerRequest::new("Who is Smith?", AnswerStrategy::Hosted))
            .await;

        assert!(answer.contains("QUESTION: Who is Smith?"));
        assert!(answer.contains("MODEL: llama-3.1-8b-instant"));
        assert!(answer.contains("IMAGES ANALYZED: 0"));
        assert!(answer.contains("Smith is the detective (Page 1)."));

        let sent = &backend.recorded()[0];
        assert_eq!(sent.max_tokens, 1500);
        assert_eq!(sent.temperature, Some(0.3));
        let body = serde_json::to_string(sent).unwrap();
        assert!(body.contains("--- PAGE 1 ---"));
        assert!(body.contains("Who is Smith?"));
    }

    #[test]
    fn test_report_time_format() {
        let report = hosted_report("q", "m", 2, "a");
        let time = report
            .lines()
            .find_map(|l| l.strip_prefix("TIME: "))
            .unwrap();
        assert!(chrono::NaiveTime::parse_from_str(time, "%H:%M:%S").is_ok());
    }
}
