// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text, JSON and JSON Lines output for pages, images and answers

use serde::Serialize;

use crate::model::{AnalysisSource, AnswerStrategy, Document, ExtractedImage, Page, ENTITY_LIMIT, EVENT_LIMIT};
use crate::Result;

const RULE_WIDTH: usize = 70;
const SECTION_WIDTH: usize = 30;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Jsonl,
}

#[derive(Serialize)]
struct PageRecord<'a> {
    page: u32,
    source: Option<AnalysisSource>,
    entities: &'a [String],
    keywords: &'a [String],
    events: &'a [String],
}

impl<'a> From<&'a Page> for PageRecord<'a> {
    fn from(page: &'a Page) -> Self {
        let empty: &[String] = &[];
        match &page.analysis {
            Some(a) => Self {
                page: page.number,
                source: Some(a.source),
                entities: &a.entities,
                keywords: &a.keywords,
                events: &a.events,
            },
            None => Self {
                page: page.number,
                source: None,
                entities: empty,
                keywords: empty,
                events: empty,
            },
        }
    }
}

#[derive(Serialize)]
struct ImageRecord<'a> {
    page: u32,
    index_on_page: usize,
    width: u32,
    height: u32,
    model: &'a str,
    described: bool,
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct AnswerRecord<'a> {
    question: &'a str,
    strategy: AnswerStrategy,
    answer: &'a str,
}

/// Entities, keyword categories and events of one page
pub fn page_view(page: &Page, total_pages: usize) -> String {
    let section = "=".repeat(SECTION_WIDTH);
    let mut out = format!("Page {} of {}\n", page.number, total_pages);

    let Some(analysis) = &page.analysis else {
        out.push_str("Not analyzed yet.\n");
        return out;
    };

    let source = match analysis.source {
        AnalysisSource::Hosted => "hosted model",
        AnalysisSource::Heuristic => "rule-based",
    };
    out.push_str(&format!("Source: {}\n\n", source));

    if analysis.entities.is_empty() {
        out.push_str("No entities identified.\n");
    } else {
        out.push_str(&format!("IDENTIFIED ENTITIES:\n{section}\n"));
        for entity in analysis.entities.iter().take(ENTITY_LIMIT) {
            out.push_str(&format!("* {}\n", entity));
        }
    }
    out.push('\n');

    if analysis.keywords.is_empty() {
        out.push_str("No keywords identified.\n");
    } else {
        out.push_str(&format!("KEY CATEGORIES:\n{section}\n"));
        for keyword in &analysis.keywords {
            out.push_str(&format!("* {}\n", keyword));
        }
    }
    out.push('\n');

    if analysis.events.is_empty() {
        out.push_str("No events detected.\n");
    } else {
        out.push_str(&format!("EVENTS:\n{section}\n"));
        for event in analysis.events.iter().take(EVENT_LIMIT) {
            out.push_str(&format!("* {}\n", event));
        }
    }

    out
}

/// Description block for one image; `position` is 1-based
pub fn image_view(image: &ExtractedImage, position: usize, total: usize, model: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let description = image
        .description
        .as_deref()
        .unwrap_or("Description not available. Run image analysis to generate one.");

    format!(
        "{rule}\nIMAGE ANALYSIS RESULT\n{rule}\n\n\
         MODEL: {model}\n\
         PAGE: {}\n\
         IMAGE: {position}/{total}\n\
         SIZE: {}x{}\n\n\
         {thin}\nDESCRIPTION:\n{thin}\n\n\
         {description}\n\n\
         {rule}",
        image.page, image.width, image.height
    )
}

/// One-line overview of where page analyses came from
pub fn analysis_summary(doc: &Document) -> String {
    let hosted = doc
        .pages
        .iter()
        .filter(|p| matches!(&p.analysis, Some(a) if a.source == AnalysisSource::Hosted))
        .count();
    let analyzed = doc.pages.iter().filter(|p| p.analysis.is_some()).count();

    format!(
        "Analyzed {} of {} pages ({} hosted, {} rule-based)",
        analyzed,
        doc.pages.len(),
        hosted,
        analyzed - hosted
    )
}

/// Render the given pages in `format`
pub fn render_pages(doc: &Document, pages: &[&Page], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(pages
            .iter()
            .map(|p| page_view(p, doc.pages.len()))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => {
            let records: Vec<PageRecord> = pages.iter().map(|p| PageRecord::from(*p)).collect();
            Ok(serde_json::to_string_pretty(&records)?)
        }
        OutputFormat::Jsonl => json_lines(pages.iter().map(|p| PageRecord::from(*p))),
    }
}

/// Render every image of `doc` in `format`
pub fn render_images(doc: &Document, model: &str, format: OutputFormat) -> Result<String> {
    let total = doc.images.len();

    match format {
        OutputFormat::Text => {
            if total == 0 {
                return Ok("No images found in document.".to_string());
            }
            Ok(doc
                .images
                .iter()
                .enumerate()
                .map(|(i, image)| image_view(image, i + 1, total, model))
                .collect::<Vec<_>>()
                .join("\n\n"))
        }
        OutputFormat::Json => {
            let records: Vec<ImageRecord> = doc.images.iter().map(|i| image_record(i, model)).collect();
            Ok(serde_json::to_string_pretty(&records)?)
        }
        OutputFormat::Jsonl => json_lines(doc.images.iter().map(|i| image_record(i, model))),
    }
}

pub fn render_answer(
    question: &str,
    strategy: AnswerStrategy,
    answer: &str,
    format: OutputFormat,
) -> Result<String> {
    let record = AnswerRecord {
        question,
        strategy,
        answer,
    };

    Ok(match format {
        OutputFormat::Text => answer.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(&record)?,
        OutputFormat::Jsonl => serde_json::to_string(&record)?,
    })
}

fn image_record<'a>(image: &'a ExtractedImage, model: &'a str) -> ImageRecord<'a> {
    ImageRecord {
        page: image.page,
        index_on_page: image.index_on_page,
        width: image.width,
        height: image.height,
        model,
        described: image.has_description(),
        description: image.description.as_deref(),
    }
}

fn json_lines<T: Serialize>(records: impl Iterator<Item = T>) -> Result<String> {
    let lines = records
        .map(|r| serde_json::to_string(&r))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::HeuristicAnalyzer;
    use image::DynamicImage;

    fn analyzed_doc() -> Document {
        let mut doc = Document::from_texts(["Detective Smith said the window was broken.", ""]);
        let analysis = HeuristicAnalyzer::new().analyze(&doc.pages[0].raw_text, 1);
        doc.set_analysis(1, analysis);
        doc
    }

    #[test]
    fn test_page_view_sections() {
        let doc = analyzed_doc();
        let view = page_view(&doc.pages[0], doc.pages.len());

        assert!(view.starts_with("Page 1 of 2\nSource: rule-based"));
        assert!(view.contains("IDENTIFIED ENTITIES:"));
        assert!(view.contains("* Detective Smith (detective)"));
        assert!(view.contains("* CHARACTERS: SAID"));

        let pending = page_view(&doc.pages[1], doc.pages.len());
        assert!(pending.contains("Not analyzed yet."));
    }

    #[test]
    fn test_image_view() {
        let mut image = ExtractedImage::new(3, 0, DynamicImage::new_rgb8(4, 2));
        let view = image_view(&image, 2, 5, "anthropic/claude-3-haiku");
        assert!(view.contains("MODEL: anthropic/claude-3-haiku"));
        assert!(view.contains("PAGE: 3"));
        assert!(view.contains("IMAGE: 2/5"));
        assert!(view.contains("SIZE: 4x2"));
        assert!(view.contains("Description not available."));

        image.description = Some("A bar chart".to_string());
        assert!(image_view(&image, 1, 1, "m").contains("\nA bar chart\n"));
    }

    #[test]
    fn test_pages_as_json() {
        let doc = analyzed_doc();
        let pages: Vec<&Page> = doc.pages.iter().collect();

        let json = render_pages(&doc, &pages, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["source"], "heuristic");
        assert_eq!(value[1]["source"], serde_json::Value::Null);

        let jsonl = render_pages(&doc, &pages, OutputFormat::Jsonl).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
    }

    #[test]
    fn test_images_without_any() {
        let doc = analyzed_doc();
        assert_eq!(
            render_images(&doc, "m", OutputFormat::Text).unwrap(),
            "No images found in document."
        );
        assert_eq!(render_images(&doc, "m", OutputFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_summary_and_answer() {
        let doc = analyzed_doc();
        assert_eq!(analysis_summary(&doc), "Analyzed 1 of 2 pages (0 hosted, 1 rule-based)");

        let json = render_answer("q?", AnswerStrategy::Heuristic, "a", OutputFormat::Jsonl).unwrap();
        assert_eq!(json, r#"{"question":"q?","strategy":"heuristic","answer":"a"}"#);
    }
}
