// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PdfScope: PDF text and image analysis
//!
//! Loads a PDF, extracts entities, keyword categories and events per page,
//! describes embedded images with a hosted vision model and answers
//! questions about the document. Every hosted call has a rule-based
//! fallback so the tool stays useful without API keys.

pub mod config;
pub mod error;
pub mod heuristics;
pub mod llm;
pub mod loader;
pub mod model;
pub mod report;
pub mod session;

pub use config::AppConfig;
pub use error::{PdfScopeError, Result};
