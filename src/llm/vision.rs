// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image descriptions from a hosted vision model

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatBackend, ChatMessage, ChatRequest, ContentPart, ImageUrl};
use crate::config::{AppConfig, ImageEncoding, VisionConfig};
use crate::{PdfScopeError, Result};

/// Sends one image per request to a vision-capable model
pub struct VisionBridge {
    backend: Arc<dyn ChatBackend>,
    instruction: String,
    settings: VisionConfig,
}

impl VisionBridge {
    pub fn new(backend: Arc<dyn ChatBackend>, config: &AppConfig) -> Self {
        Self {
            backend,
            instruction: config.prompts.vision.clone(),
            settings: config.vision.clone(),
        }
    }

    /// Pause between consecutive images
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.settings.delay_ms)
    }

    /// Describe `image` with `model`.
    ///
    /// Failures come back as a description starting with "Error" rather
    /// than as an `Err`, so callers can store and show them.
    pub async fn describe(&self, image: &DynamicImage, model: &str) -> String {
        let url = match encode_data_url(image, self.settings.encoding, self.settings.jpeg_quality) {
            Ok(url) => url,
            Err(e) => return format!("Error analyzing image: {}", e),
        };

        let request = ChatRequest::new(
            model,
            vec![ChatMessage::user_parts(vec![
                ContentPart::Text {
                    text: self.instruction.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                },
            ])],
            self.settings.max_tokens,
        );

        debug!(
            "Describing {}x{} image with {}",
            image.width(),
            image.height(),
            model
        );

        match self.backend.complete(&request).await {
            Ok(description) => description,
            Err(PdfScopeError::ApiStatus { status, .. }) => {
                warn!("{} rejected image request with status {}", self.backend.provider(), status);
                format!("Error: API returned status {}", status)
            }
            Err(e) => {
                warn!("Image analysis failed: {}", e);
                format!("Error analyzing image: {}", e)
            }
        }
    }
}

/// Encode `image` as a base64 `data:` URL
pub fn encode_data_url(image: &DynamicImage, encoding: ImageEncoding, jpeg_quality: u8) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());

    let mime = match encoding {
        ImageEncoding::Png => {
            image.write_to(&mut buffer, ImageFormat::Png)?;
            "image/png"
        }
        ImageEncoding::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, jpeg_quality).encode_image(&rgb)?;
            "image/jpeg"
        }
    };

    Ok(format!(
        "data:{};base64,{}",
        mime,
        general_purpose::STANDARD.encode(buffer.into_inner())
    ))
}
