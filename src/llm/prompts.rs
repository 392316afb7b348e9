// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Prompt text for page analysis, question answering and probes

use crate::config::AnswerConfig;
use crate::heuristics::truncate_chars;
use crate::model::Document;

/// Appended to page text cut at the analysis limit
pub const TRUNCATION_MARKER: &str = " [Text truncated for analysis]";

/// Connection probe message
pub const PROBE_PROMPT: &str = "Say 'Connected'";

/// Extraction request for one page
pub fn analysis_prompt(text: &str, page: u32, max_chars: usize) -> String {
    let mut chunk = truncate_chars(text, max_chars).trim().to_string();
    if text.chars().count() > max_chars {
        chunk.push_str(TRUNCATION_MARKER);
    }

    format!(
        r#"ANALYZE THIS TEXT AND EXTRACT INFORMATION:

TEXT FROM PAGE {page}:
"{chunk}"

EXTRACTION TASKS:
1. ENTITIES: Extract all important named entities (people, organizations, locations, technical terms)
2. KEYWORDS: Extract 5-10 most important keywords or key phrases
3. EVENTS: Extract key events, actions, or important occurrences

OUTPUT FORMAT - Return ONLY a valid JSON object with this exact structure:
{{
  "entities": ["Entity 1", "Entity 2", "Entity 3"],
  "keywords": ["Keyword 1", "Keyword 2", "Keyword 3"],
  "events": ["Event 1", "Event 2", "Event 3"]
}}

RETURN ONLY THE JSON OBJECT:"#
    )
}

/// Document text prefix plus, when requested, successful image descriptions
pub fn answer_context(doc: &Document, settings: &AnswerConfig, include_images: bool) -> String {
    let mut context = truncate_chars(doc.full_text(), settings.context_chars).to_string();

    if include_images && doc.described_image_count() > 0 {
        context.push_str("\n\nIMAGE DESCRIPTIONS:\n");
        for image in doc
            .images
            .iter()
            .filter(|i| i.has_description())
            .take(settings.image_descriptions)
        {
            let description = image.description.as_deref().unwrap_or_default();
            context.push_str(&format!(
                "Page {}: {}...\n",
                image.page,
                truncate_chars(description, settings.image_description_chars)
            ));
        }
    }

    context
}

/// Question prompt embedding the prepared context
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        r#"# DOCUMENT ANALYSIS

## DOCUMENT CONTENT:
{context}

## USER QUESTION:
{question}

## HOW TO ANSWER:
1. Identify the document type, main topics and key entities
2. Combine text evidence with the image descriptions, if any
3. Reason step by step and note any ambiguity

## FORMAT:
- Start with a clear, direct answer
- Cite evidence as (Page X) or (Image Y)
- Use bullet points where they help
- End with key takeaways

## ANSWER:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractedImage;
    use image::DynamicImage;

    #[test]
    fn test_analysis_prompt_truncation() {
        let long = "a".repeat(4000);
        let prompt = analysis_prompt(&long, 2, 3500);
        assert!(prompt.contains("TEXT FROM PAGE 2:"));
        assert!(prompt.contains(&format!("\"{}{}\"", "a".repeat(3500), TRUNCATION_MARKER)));

        let short = analysis_prompt("Detective Smith said hello.", 1, 3500);
        assert!(!short.contains(TRUNCATION_MARKER));
        assert!(short.contains("\"entities\": [\"Entity 1\""));
    }

    #[test]
    fn test_answer_context_limits() {
        let mut doc = Document::from_texts(["x".repeat(100)]);
        for page in 1..=5 {
            doc.images.push(ExtractedImage::new(page, 0, DynamicImage::new_rgb8(1, 1)));
        }
        doc.set_description(0, "Error: API returned status 429".to_string());
        for i in 1..5 {
            doc.set_description(i, "d".repeat(400));
        }

        let settings = AnswerConfig {
            context_chars: 40,
            ..AnswerConfig::default()
        };
        let context = answer_context(&doc, &settings, true);

        assert!(context.starts_with("\n\n--- PAGE 1 ---\n"));
        assert!(!context.contains("Error"));
        assert_eq!(context.matches("Page ").count(), 3);
        assert!(context.contains(&format!("Page 2: {}...\n", "d".repeat(300))));
        assert!(!context.contains("Page 5:"));

        let without = answer_context(&doc, &settings, false);
        assert_eq!(without.chars().count(), 40);
    }
}
