// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Hosted chat-completion plumbing shared by analysis, vision and answering

pub mod analysis;
pub mod answer;
pub mod client;
pub mod prompts;
pub mod vision;

pub use analysis::AnalysisBridge;
pub use answer::{CandidateOutcome, HostedAnswerer, QuestionAnswerer};
pub use client::{ChatClient, ProviderStatus};
pub use vision::VisionBridge;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{PdfScopeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Plain text, or an array of typed parts for multimodal messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Body of `POST {base}/chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature: None,
            top_p: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice
    pub(crate) fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PdfScopeError::MalformedResponse("response has no choices".to_string()))
    }
}

/// A chat-completion endpoint
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name used in logs and errors
    fn provider(&self) -> &str;

    /// Send one request and return the first choice's text
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// In-process backend that replays queued replies and records requests
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String>>>,
        fallback: Option<String>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                fallback: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Reply used once the queue is empty
        pub fn always(text: &str) -> Self {
            Self {
                fallback: Some(text.to_string()),
                ..Self::new()
            }
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn status(self, status: u16) -> Self {
            self.replies.lock().unwrap().push_back(Err(PdfScopeError::ApiStatus {
                provider: "scripted".to_string(),
                status,
            }));
            self
        }

        pub fn recorded(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn provider(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            match self.replies.lock().unwrap().pop_front() {
                Some(reply) => reply,
                None => self
                    .fallback
                    .clone()
                    .ok_or_else(|| PdfScopeError::MalformedResponse("script exhausted".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_request_shape() {
        let request = ChatRequest::new(
            "llama-3.1-8b-instant",
            vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            500,
        )
        .temperature(0.1);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "llama-3.1-8b-instant",
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hi" }
                ],
                "max_tokens": 500,
                "temperature": 0.1f32
            })
        );
    }

    #[test]
    fn test_image_part_shape() {
        let message = ChatMessage::user_parts(vec![
            ContentPart::Text { text: "describe".to_string() },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: "data:image/png;base64,AAAA".to_string() },
            },
        ]);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": "describe" },
                    { "type": "image_url", "image_url": { "url": "data:image/png;base64,AAAA" } }
                ]
            })
        );
    }

    #[test]
    fn test_response_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Connected"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_text().unwrap(), "Connected");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(empty.into_text(), Err(PdfScopeError::MalformedResponse(_))));
    }
}
