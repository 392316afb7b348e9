// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use pdfscope::heuristics::{question::relevance, HeuristicAnalyzer, HeuristicAnswerer};
use pdfscope::model::{Document, ENTITY_LIMIT, EVENT_LIMIT, KEYWORD_LIMIT};

#[derive(Debug, Arbitrary)]
struct Input {
    pages: Vec<String>,
    question: String,
}

fuzz_target!(|input: Input| {
    let mut doc = Document::from_texts(input.pages);
    let analyzer = HeuristicAnalyzer::new();

    for page in doc.pages.iter_mut() {
        let analysis = analyzer.analyze(&page.raw_text, page.number);
        assert!(analysis.entities.len() <= ENTITY_LIMIT);
        assert!(analysis.keywords.len() <= KEYWORD_LIMIT);
        assert!(analysis.events.len() <= EVENT_LIMIT);
        page.analysis = Some(analysis);
    }

    for page in &doc.pages {
        let score = relevance(&page.raw_text, &input.question);
        assert!((0.0..=1.0).contains(&score));
    }

    let answer = HeuristicAnswerer::new().answer(&input.question, &doc.pages);
    assert!(!answer.is_empty());
});
