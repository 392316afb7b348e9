// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for PdfScope

use thiserror::Error;

/// Result type alias for PdfScope operations
pub type Result<T> = std::result::Result<T, PdfScopeError>;

/// PdfScope error types
#[derive(Error, Debug)]
pub enum PdfScopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("{provider} returned status {status}")]
    ApiStatus { provider: String, status: u16 },

    #[error("{0} API key not configured")]
    MissingApiKey(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} is already running")]
    Busy(String),

    #[error("Background worker stopped unexpectedly")]
    WorkerGone,
}
