// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Document aggregate and the records produced while analyzing it

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Maximum entities kept per page
pub const ENTITY_LIMIT: usize = 8;
/// Maximum keyword entries kept per page
pub const KEYWORD_LIMIT: usize = 6;
/// Maximum events kept per page
pub const EVENT_LIMIT: usize = 5;

/// Prefix that marks a vision description as a failed analysis
pub const DESCRIPTION_ERROR_PREFIX: &str = "Error";

/// Where a page analysis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Hosted,
    Heuristic,
}

/// Entities, keyword categories and events found on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub entities: Vec<String>,
    pub keywords: Vec<String>,
    pub events: Vec<String>,
    pub source: AnalysisSource,
}

impl Analysis {
    pub fn empty(source: AnalysisSource) -> Self {
        Self {
            entities: Vec::new(),
            keywords: Vec::new(),
            events: Vec::new(),
            source,
        }
    }

    /// Apply the per-list display caps
    pub fn truncated(mut self) -> Self {
        self.entities.truncate(ENTITY_LIMIT);
        self.keywords.truncate(KEYWORD_LIMIT);
        self.events.truncate(EVENT_LIMIT);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.keywords.is_empty() && self.events.is_empty()
    }
}

/// One PDF page, 1-based
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub number: u32,
    pub raw_text: String,
    pub analysis: Option<Analysis>,
}

impl Page {
    pub fn new(number: u32, raw_text: impl Into<String>) -> Self {
        Self {
            number,
            raw_text: raw_text.into(),
            analysis: None,
        }
    }
}

/// A raster image embedded in the document
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedImage {
    pub page: u32,
    pub index_on_page: usize,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub pixels: Arc<DynamicImage>,
    pub description: Option<String>,
}

impl ExtractedImage {
    pub fn new(page: u32, index_on_page: usize, pixels: DynamicImage) -> Self {
        Self {
            page,
            index_on_page,
            width: pixels.width(),
            height: pixels.height(),
            pixels: Arc::new(pixels),
            description: None,
        }
    }

    /// True when a description exists and is not an error report
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.starts_with(DESCRIPTION_ERROR_PREFIX))
    }
}

/// Everything loaded from one PDF, built once per load
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub path: PathBuf,
    pub fingerprint: String,
    pub pages: Vec<Page>,
    pub images: Vec<ExtractedImage>,
    #[serde(skip)]
    full_text: String,
}

impl Document {
    pub fn new(
        path: PathBuf,
        fingerprint: String,
        pages: Vec<Page>,
        images: Vec<ExtractedImage>,
    ) -> Self {
        let full_text = pages
            .iter()
            .map(|p| format!("\n\n--- PAGE {} ---\n{}", p.number, p.raw_text))
            .collect();

        Self {
            path,
            fingerprint,
            pages,
            images,
            full_text,
        }
    }

    /// Build an in-memory document from page texts (numbered from 1)
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, t)| Page::new(i as u32 + 1, t))
            .collect();
        Self::new(PathBuf::new(), String::new(), pages, Vec::new())
    }

    /// Concatenated text of every page with page markers
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn page(&self, number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == number)
    }

    /// Record the analysis of a page; returns false for an unknown page
    pub fn set_analysis(&mut self, number: u32, analysis: Analysis) -> bool {
        match self.pages.iter_mut().find(|p| p.number == number) {
            Some(page) => {
                page.analysis = Some(analysis);
                true
            }
            None => false,
        }
    }

    /// Record the description of an image; returns false for an unknown index
    pub fn set_description(&mut self, index: usize, description: String) -> bool {
        match self.images.get_mut(index) {
            Some(image) => {
                image.description = Some(description);
                true
            }
            None => false,
        }
    }

    pub fn described_image_count(&self) -> usize {
        self.images.iter().filter(|i| i.has_description()).count()
    }

    pub fn is_analyzed(&self) -> bool {
        !self.pages.is_empty() && self.pages.iter().all(|p| p.analysis.is_some())
    }
}

/// How a question gets answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStrategy {
    #[default]
    #[serde(alias = "smart", alias = "groq")]
    Hosted,
    #[serde(alias = "fast")]
    Heuristic,
}

impl FromStr for AnswerStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hosted" | "smart" | "groq" => Ok(Self::Hosted),
            "heuristic" | "fast" => Ok(Self::Heuristic),
            other => Err(format!("unknown answer strategy '{}'", other)),
        }
    }
}

impl fmt::Display for AnswerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hosted => write!(f, "hosted"),
            Self::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// A question about the loaded document
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub question: String,
    pub strategy: AnswerStrategy,
    /// Append successful image descriptions to the hosted prompt
    pub include_images: bool,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>, strategy: AnswerStrategy) -> Self {
        Self {
            question: question.into(),
            strategy,
            include_images: true,
        }
    }
}

/// Coarse question category driving fact extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Who,
    When,
    Where,
    Number,
    Why,
    What,
    How,
    General,
}

impl QuestionType {
    /// First matching keyword wins, in fixed order
    pub fn classify(question: &str) -> Self {
        let q = question.to_lowercase();
        if q.contains("who") {
            Self::Who
        } else if q.contains("when") {
            Self::When
        } else if q.contains("where") {
            Self::Where
        } else if q.contains("how many") || q.contains("how much") {
            Self::Number
        } else if q.contains("why") {
            Self::Why
        } else if q.contains("what") {
            Self::What
        } else if q.contains("how") {
            Self::How
        } else {
            Self::General
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Who => "WHO",
            Self::When => "WHEN",
            Self::Where => "WHERE",
            Self::Number => "NUMBER",
            Self::Why => "WHY",
            Self::What => "WHAT",
            Self::How => "HOW",
            Self::General => "GENERAL",
        }
    }
}
