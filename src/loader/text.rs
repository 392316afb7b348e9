// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

use tracing::{debug, warn};

use crate::model::Page;

/// Text of every page, in page order.
///
/// pdf-extract handles font encodings better, so it goes first; when it
/// errors or disagrees with the page tree on the page count, each page is
/// extracted with lopdf instead.
pub(super) fn page_texts(bytes: &[u8], pdf: &lopdf::Document) -> Vec<Page> {
    let numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();

    match pdf_extract::extract_text_from_mem_by_pages(bytes) {
        Ok(texts) if texts.len() == numbers.len() => {
            return numbers
                .into_iter()
                .zip(texts)
                .map(|(number, text)| Page::new(number, text))
                .collect();
        }
        Ok(texts) => warn!(
            "pdf-extract returned {} pages, document has {}; using lopdf",
            texts.len(),
            numbers.len()
        ),
        Err(e) => warn!("pdf-extract failed: {}; using lopdf", e),
    }

    numbers
        .into_iter()
        .map(|number| {
            let text = pdf.extract_text(&[number]).unwrap_or_else(|e| {
                debug!("No text on page {}: {}", number, e);
                String::new()
            });
            Page::new(number, text)
        })
        .collect()
}
