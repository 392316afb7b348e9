// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Foreground owner of a loaded document.
//!
//! Each operation runs as one spawned task working on a snapshot of its
//! inputs. Tasks never touch the session's [`Document`]; they report over
//! an unbounded channel and the foreground applies each event in order.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::llm::{AnalysisBridge, ChatBackend, ChatClient, HostedAnswerer, QuestionAnswerer, VisionBridge};
use crate::model::{Analysis, AnswerRequest, AnswerStrategy, Document, DESCRIPTION_ERROR_PREFIX};
use crate::{PdfScopeError, Result};

/// Long-running work a session can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    TextAnalysis,
    ImageAnalysis,
    Question,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextAnalysis => write!(f, "text analysis"),
            Self::ImageAnalysis => write!(f, "image analysis"),
            Self::Question => write!(f, "question answering"),
        }
    }
}

/// Messages from background tasks to the foreground
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Progress {
        operation: Operation,
        done: usize,
        total: usize,
        label: String,
    },
    PageAnalyzed {
        page: u32,
        analysis: Analysis,
    },
    AnalysisFinished {
        pages: usize,
    },
    /// One per completed image
    ImageAnalyzed {
        index: usize,
        description: String,
    },
    VisionFinished {
        described: usize,
        total: usize,
    },
    Answered {
        question: String,
        answer: String,
    },
    Failed {
        operation: Operation,
        reason: String,
    },
}

impl SessionEvent {
    /// Operation this event ends, if it is a terminal event
    pub fn finishes(&self) -> Option<Operation> {
        match self {
            Self::AnalysisFinished { .. } => Some(Operation::TextAnalysis),
            Self::VisionFinished { .. } => Some(Operation::ImageAnalysis),
            Self::Answered { .. } => Some(Operation::Question),
            Self::Failed { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// Bridges shared by every task of a session
#[derive(Clone)]
pub struct Services {
    pub analysis: Arc<AnalysisBridge>,
    /// Absent without an OpenRouter key
    pub vision: Option<Arc<VisionBridge>>,
    pub answerer: Arc<QuestionAnswerer>,
}

impl Services {
    /// Wire hosted providers for every configured key
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let groq = ChatClient::groq(config)?;
        let text_backend: Option<Arc<dyn ChatBackend>> = if groq.is_configured() {
            Some(Arc::new(groq))
        } else {
            info!("Groq API key not set; text analysis and answers use heuristics");
            None
        };

        let openrouter = ChatClient::openrouter(config)?;
        let vision = if openrouter.is_configured() {
            let backend: Arc<dyn ChatBackend> = Arc::new(openrouter);
            Some(Arc::new(VisionBridge::new(backend, config)))
        } else {
            None
        };

        let hosted = text_backend
            .clone()
            .map(|backend| HostedAnswerer::new(backend, config));

        Ok(Self {
            analysis: Arc::new(AnalysisBridge::new(text_backend, config)),
            vision,
            answerer: Arc::new(QuestionAnswerer::new(hosted, config)),
        })
    }

    /// No network at all
    pub fn heuristic(config: &AppConfig) -> Self {
        Self {
            analysis: Arc::new(AnalysisBridge::heuristic(config)),
            vision: None,
            answerer: Arc::new(QuestionAnswerer::new(None, config)),
        }
    }
}

pub struct Session {
    document: Document,
    services: Services,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
    in_flight: HashSet<Operation>,
    vision_model: String,
    strategy: AnswerStrategy,
}

impl Session {
    pub fn new(document: Document, services: Services, config: &AppConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            document,
            services,
            events_tx,
            events_rx,
            in_flight: HashSet::new(),
            vision_model: config.models.default_vision().unwrap_or_default().to_string(),
            strategy: config.answer.strategy,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_busy(&self, operation: Operation) -> bool {
        self.in_flight.contains(&operation)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn strategy(&self) -> AnswerStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: AnswerStrategy) {
        self.strategy = strategy;
    }

    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    pub fn set_vision_model(&mut self, model: impl Into<String>) {
        self.vision_model = model.into();
    }

    /// Analyze every page, emitting one `PageAnalyzed` per page
    pub fn start_analysis(&mut self) -> Result<()> {
        self.begin(Operation::TextAnalysis)?;

        let pages: Vec<(u32, String)> = self
            .document
            .pages
            .iter()
            .map(|p| (p.number, p.raw_text.clone()))
            .collect();
        let bridge = Arc::clone(&self.services.analysis);
        let tx = self.events_tx.clone();

        info!("Analyzing {} pages", pages.len());
        self.spawn(Operation::TextAnalysis, async move {
            let total = pages.len();
            for (done, (page, text)) in pages.into_iter().enumerate() {
                let _ = tx.send(SessionEvent::Progress {
                    operation: Operation::TextAnalysis,
                    done,
                    total,
                    label: format!("Page {}", page),
                });

                let analysis = bridge.analyze(&text, page).await;
                if tx.send(SessionEvent::PageAnalyzed { page, analysis }).is_err() {
                    return;
                }
            }
            let _ = tx.send(SessionEvent::AnalysisFinished { pages: total });
        });

        Ok(())
    }

    /// Describe every extracted image with the selected vision model
    pub fn start_image_analysis(&mut self) -> Result<()> {
        let vision = self
            .services
            .vision
            .clone()
            .ok_or_else(|| PdfScopeError::MissingApiKey("OpenRouter".to_string()))?;
        self.begin(Operation::ImageAnalysis)?;

        let images: Vec<_> = self
            .document
            .images
            .iter()
            .map(|i| Arc::clone(&i.pixels))
            .collect();
        let model = self.vision_model.clone();
        let tx = self.events_tx.clone();

        info!("Describing {} images with {}", images.len(), model);
        self.spawn(Operation::ImageAnalysis, async move {
            let total = images.len();
            let mut described = 0;

            for (index, pixels) in images.into_iter().enumerate() {
                if index > 0 && !vision.delay().is_zero() {
                    tokio::time::sleep(vision.delay()).await;
                }

                let _ = tx.send(SessionEvent::Progress {
                    operation: Operation::ImageAnalysis,
                    done: index,
                    total,
                    label: format!("Image {}/{}", index + 1, total),
                });

                let description = vision.describe(&pixels, &model).await;
                if !description.starts_with(DESCRIPTION_ERROR_PREFIX) {
                    described += 1;
                }
                if tx.send(SessionEvent::ImageAnalyzed { index, description }).is_err() {
                    return;
                }
            }
            let _ = tx.send(SessionEvent::VisionFinished { described, total });
        });

        Ok(())
    }

    /// Answer with the session's current strategy
    pub fn ask(&mut self, question: impl Into<String>) -> Result<()> {
        let request = AnswerRequest::new(question, self.strategy);
        self.ask_with(request)
    }

    pub fn ask_with(&mut self, request: AnswerRequest) -> Result<()> {
        self.begin(Operation::Question)?;

        let snapshot = self.document.clone();
        let answerer = Arc::clone(&self.services.answerer);
        let tx = self.events_tx.clone();

        debug!("Answering with {} strategy: {}", request.strategy, request.question);
        self.spawn(Operation::Question, async move {
            let answer = answerer.answer(&snapshot, &request).await;
            let _ = tx.send(SessionEvent::Answered {
                question: request.question,
                answer,
            });
        });

        Ok(())
    }

    /// Fold one event into the foreground document
    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::PageAnalyzed { page, analysis } => {
                if !self.document.set_analysis(*page, analysis.clone()) {
                    warn!("Analysis for unknown page {}", page);
                }
            }
            SessionEvent::ImageAnalyzed { index, description } => {
                if !self.document.set_description(*index, description.clone()) {
                    warn!("Description for unknown image {}", index);
                }
            }
            SessionEvent::Failed { operation, reason } => {
                error!("{} failed: {}", operation, reason);
            }
            _ => {}
        }

        if let Some(operation) = event.finishes() {
            self.in_flight.remove(&operation);
        }
    }

    /// Next event, already applied; `None` once nothing is in flight
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.is_idle() {
            return None;
        }
        let event = self.events_rx.recv().await?;
        self.apply(&event);
        Some(event)
    }

    /// Drain events until every dispatched operation has finished
    pub async fn run_until_idle<F>(&mut self, mut on_event: F)
    where
        F: FnMut(&SessionEvent),
    {
        while let Some(event) = self.next_event().await {
            on_event(&event);
        }
    }

    fn begin(&mut self, operation: Operation) -> Result<()> {
        if !self.in_flight.insert(operation) {
            return Err(PdfScopeError::Busy(operation.to_string()));
        }
        Ok(())
    }

    /// Run `work` as the operation's task; a panic surfaces as `Failed`
    fn spawn<F>(&self, operation: Operation, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(work);
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = task.await {
                let _ = tx.send(SessionEvent::Failed {
                    operation,
                    reason: format!("{}: {}", PdfScopeError::WorkerGone, e),
                });
            }
        });
    }
}
