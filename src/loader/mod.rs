// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PDF loading: per-page text, embedded images and a content fingerprint

mod images;
mod text;

pub use images::export_png;

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::Document;
use crate::{PdfScopeError, Result};

/// Builds a [`Document`] from a PDF on disk
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    with_images: bool,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self { with_images: true }
    }

    /// Skip image extraction
    pub fn text_only(mut self) -> Self {
        self.with_images = false;
        self
    }

    /// Load a PDF file. Open and parse failures abort; image failures do not.
    pub fn load(&self, path: &Path) -> Result<Document> {
        info!("Loading PDF: {:?}", path);
        let bytes = std::fs::read(path)?;
        self.load_bytes(path.to_path_buf(), &bytes)
    }

    pub fn load_bytes(&self, path: PathBuf, bytes: &[u8]) -> Result<Document> {
        let pdf = lopdf::Document::load_mem(bytes)
            .map_err(|e| PdfScopeError::Pdf(format!("Failed to load PDF: {}", e)))?;

        let pages = text::page_texts(bytes, &pdf);

        let images = if self.with_images {
            images::extract(&pdf)
        } else {
            Vec::new()
        };

        if pages.iter().all(|p| p.raw_text.trim().is_empty()) {
            warn!("No text extracted from {:?}", path);
        }

        info!(
            "Loaded {} pages and {} images from {:?}",
            pages.len(),
            images.len(),
            path
        );

        Ok(Document::new(path, fingerprint(bytes), pages, images))
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex blake3 digest of the file contents
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_sample_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.pdf");
        fixtures::write_sample_pdf(&path);

        let doc = DocumentLoader::new().load(&path).unwrap();

        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].number, 1);
        assert!(doc.pages[0].raw_text.contains("Hello"));
        assert!(doc.full_text().starts_with("\n\n--- PAGE 1 ---\n"));
        assert_eq!(doc.fingerprint.len(), 64);

        assert_eq!(doc.images.len(), 1);
        let image = &doc.images[0];
        assert_eq!((image.page, image.index_on_page), (1, 0));
        assert_eq!((image.width, image.height), (2, 2));
        assert_eq!(image.pixels.to_rgb8().get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(image.pixels.to_rgb8().get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_text_only_skips_images() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.pdf");
        fixtures::write_sample_pdf(&path);

        let doc = DocumentLoader::new().text_only().load(&path).unwrap();
        assert!(doc.images.is_empty());
        assert_eq!(doc.pages.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = DocumentLoader::new()
            .load(Path::new("/nonexistent/file.pdf"))
            .unwrap_err();
        assert!(matches!(err, PdfScopeError::FileSystem(_)));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = DocumentLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, PdfScopeError::Pdf(_)));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
    }
}
