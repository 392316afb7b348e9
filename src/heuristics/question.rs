// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Word-overlap question answering with typed fact extraction

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use super::{joined_groups, truncate_chars};
use crate::model::{Page, QuestionType};

/// Relevance above which a sentence is a direct match
const DIRECT_THRESHOLD: f64 = 0.7;
/// Relevance above which a sentence is context
const CONTEXT_THRESHOLD: f64 = 0.4;

const QUESTION_WORDS: [&str; 6] = ["who", "what", "when", "where", "why", "how"];
const REASON_KEYWORDS: &[&str] = &["because", "since", "as", "due to", "reason", "cause", "therefore", "thus"];
const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];
const NAME_STOPWORDS: [&str; 4] = ["the", "and", "but", "for"];

const SHOWN_MATCHES: usize = 3;
const SHOWN_FACTS: usize = 5;
const PAGE_ENTITIES: usize = 5;
const REASON_CHARS: usize = 150;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());
static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"Detective\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"Dr\.\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"Officer\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"Professor\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"\b([A-Z][a-z]+)\s+([A-Z][a-z]+)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{1,2},? \d{4}\b",
        r"(?i)\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b",
        r"(?i)\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b",
        r"(?i)\b\d{1,2}:\d{2}\s*(?:AM|PM|GMT)?\b",
        r"(?i)\b(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\b",
        r"(?i)\b(?:morning|afternoon|evening|night|noon|midnight)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:at|in|near|by)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b",
        r"(?i)\b(?:room|office|building|house|apartment|street|avenue|road)\s+[A-Z]?\d*\b",
        r"(?i)coordinates?\s*[:=]?\s*(\d+\.\d+°?\s*[NS],?\s*\d+\.\d+°?\s*[EW])",
        r"(?i)Server Room\s+[A-Z]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b\d+\s*(?:percent\b|%)",
        r"(?i)\b\d+\.?\d*\s*(?:TB|GB|MB|KB)\b",
        r"(?i)\b\d+\s*(?:dollars|USD|Rs|rupees)\b",
        r"(?i)\b\d+\s*(?:hours|minutes|seconds|days|weeks|months|years)\b",
        r"(?i)\b\d+\.?\d*\s*(?:°C|degrees\b|℃)",
        r"(?i)\b\d+\.?\d*\s*(?:GHz|MHz|Hz)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// A sentence scored against the question
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceMatch {
    pub text: String,
    pub page: u32,
    pub relevance: f64,
}

/// Kind of fact pulled out of the raw text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    Entity,
    Name,
    DateTime,
    Location,
    Number,
    Reason,
}

/// A typed fact with its owning page
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub text: String,
    pub page: u32,
    pub kind: FactKind,
}

/// Everything gathered for one question before rendering
#[derive(Debug, Clone)]
pub struct Findings {
    pub question: String,
    pub question_type: QuestionType,
    pub direct_matches: Vec<SentenceMatch>,
    pub context_matches: Vec<SentenceMatch>,
    pub facts: Vec<Fact>,
    pub pages: BTreeSet<u32>,
}

/// Rule-based answerer over the analyzed pages
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnswerer;

impl HeuristicAnswerer {
    pub fn new() -> Self {
        Self
    }

    /// Formatted answer; always non-empty, never fails
    pub fn answer(&self, question: &str, pages: &[Page]) -> String {
        self.gather(question, pages).render()
    }

    /// Score sentences and extract facts for `question`
    pub fn gather(&self, question: &str, pages: &[Page]) -> Findings {
        let question_lower = question.to_lowercase();
        let question_type = QuestionType::classify(question);

        let mut findings = Findings {
            question: question.to_string(),
            question_type,
            direct_matches: Vec::new(),
            context_matches: Vec::new(),
            facts: Vec::new(),
            pages: BTreeSet::new(),
        };

        for page in pages {
            let text = page.raw_text.as_str();

            for sentence in SENTENCE_BREAK.split(text).map(str::trim).filter(|s| !s.is_empty()) {
                let relevance = relevance(&sentence.to_lowercase(), &question_lower);
                let scored = SentenceMatch {
                    text: sentence.to_string(),
                    page: page.number,
                    relevance,
                };

                if relevance > DIRECT_THRESHOLD {
                    findings.direct_matches.push(scored);
                    findings.pages.insert(page.number);
                } else if relevance > CONTEXT_THRESHOLD {
                    findings.context_matches.push(scored);
                    findings.pages.insert(page.number);
                }
            }

            let facts = &mut findings.facts;
            match question_type {
                QuestionType::Who => extract_names(facts, page, &question_lower),
                QuestionType::When => extract_dates(facts, text, page.number),
                QuestionType::Where => extract_locations(facts, text, page.number),
                QuestionType::Number => extract_numbers(facts, text, page.number),
                QuestionType::Why => extract_reasons(facts, text, page.number),
                QuestionType::What | QuestionType::How | QuestionType::General => {}
            }
        }

        let by_relevance = |a: &SentenceMatch, b: &SentenceMatch| b.relevance.total_cmp(&a.relevance);
        findings.direct_matches.sort_by(by_relevance);
        findings.context_matches.sort_by(by_relevance);

        findings
    }
}

/// Share of question words present in the sentence, plus 0.2 per shared
/// interrogative, clamped to 1.0
pub fn relevance(sentence: &str, question: &str) -> f64 {
    let sentence = sentence.to_lowercase();
    let question = question.to_lowercase();

    let sentence_words: HashSet<&str> = WORD.find_iter(&sentence).map(|m| m.as_str()).collect();
    let question_words: HashSet<&str> = WORD.find_iter(&question).map(|m| m.as_str()).collect();

    if sentence_words.is_empty() || question_words.is_empty() {
        return 0.0;
    }

    let common = sentence_words.intersection(&question_words).count();
    let mut score = common as f64 / question_words.len().max(1) as f64;

    for keyword in QUESTION_WORDS {
        if question.contains(keyword) && sentence.contains(keyword) {
            score += 0.2;
        }
    }

    score.min(1.0)
}

fn extract_names(facts: &mut Vec<Fact>, page: &Page, question_lower: &str) {
    if let Some(analysis) = &page.analysis {
        facts.extend(analysis.entities.iter().take(PAGE_ENTITIES).map(|e| Fact {
            text: e.clone(),
            page: page.number,
            kind: FactKind::Entity,
        }));
    }

    let wants_detective = question_lower.contains("detective");

    for pattern in NAME_PATTERNS.iter() {
        for caps in pattern.captures_iter(&page.raw_text) {
            let name = joined_groups(&caps);
            let lower = name.to_lowercase();

            if name.chars().count() <= 3
                || NAME_STOPWORDS.contains(&lower.as_str())
                || MONTHS.iter().any(|m| lower.contains(m))
            {
                continue;
            }
            if wants_detective && !lower.contains("detective") {
                continue;
            }

            facts.push(Fact {
                text: format!("Identified: {}", name),
                page: page.number,
                kind: FactKind::Name,
            });
        }
    }
}

fn extract_with(
    facts: &mut Vec<Fact>,
    patterns: &[Regex],
    text: &str,
    page: u32,
    kind: FactKind,
    label: &str,
    min_chars: usize,
) {
    for pattern in patterns {
        for caps in pattern.captures_iter(text) {
            let found = joined_groups(&caps);
            if found.chars().count() > min_chars {
                facts.push(Fact {
                    text: format!("{}: {}", label, found),
                    page,
                    kind,
                });
            }
        }
    }
}

fn extract_dates(facts: &mut Vec<Fact>, text: &str, page: u32) {
    extract_with(facts, &DATE_PATTERNS, text, page, FactKind::DateTime, "Date/Time", 0);
}

fn extract_locations(facts: &mut Vec<Fact>, text: &str, page: u32) {
    extract_with(facts, &LOCATION_PATTERNS, text, page, FactKind::Location, "Location", 3);
}

fn extract_numbers(facts: &mut Vec<Fact>, text: &str, page: u32) {
    extract_with(facts, &NUMBER_PATTERNS, text, page, FactKind::Number, "Numerical", 0);
}

fn extract_reasons(facts: &mut Vec<Fact>, text: &str, page: u32) {
    for sentence in text.split('.') {
        let lower = sentence.to_lowercase();
        if REASON_KEYWORDS.iter().any(|k| lower.contains(k)) {
            facts.push(Fact {
                text: truncate_chars(sentence.trim(), REASON_CHARS).to_string(),
                page,
                kind: FactKind::Reason,
            });
        }
    }
}

impl Findings {
    pub fn total_matches(&self) -> usize {
        self.direct_matches.len() + self.context_matches.len()
    }

    /// Facts with exact-text duplicates removed, first occurrence kept
    pub fn unique_facts(&self) -> Vec<&Fact> {
        let mut seen = HashSet::new();
        self.facts.iter().filter(|f| seen.insert(f.text.as_str())).collect()
    }

    fn facts_heading(&self) -> &'static str {
        match self.question_type {
            QuestionType::Who | QuestionType::What => "IDENTIFIED ENTITIES",
            QuestionType::When => "DATES & TIMES",
            QuestionType::Where => "LOCATIONS",
            QuestionType::Number => "NUMBERS",
            QuestionType::Why => "REASONS",
            QuestionType::How | QuestionType::General => "FACTS",
        }
    }

    /// Human-readable report
    pub fn render(&self) -> String {
        let rule = "=".repeat(70);
        let thin = "-".repeat(30);
        let mut out = format!("{rule}\nQUESTION: {}\n{rule}\n\n", self.question);

        if !self.direct_matches.is_empty() {
            out.push_str(&format!("MOST RELEVANT MATCHES:\n{thin}\n"));
            render_matches(&mut out, &self.direct_matches, 120);
        }

        if !self.context_matches.is_empty() {
            out.push_str(&format!("CONTEXTUAL INFORMATION:\n{thin}\n"));
            render_matches(&mut out, &self.context_matches, 100);
        }

        let facts = self.unique_facts();
        if !facts.is_empty() {
            out.push_str(&format!("{}:\n{thin}\n", self.facts_heading()));
            for fact in facts.iter().take(SHOWN_FACTS) {
                out.push_str(&format!("   * {} (Page {})\n", fact.text, fact.page));
            }
            out.push('\n');
        }

        if !self.pages.is_empty() {
            let pages: Vec<String> = self.pages.iter().map(u32::to_string).collect();
            out.push_str(&format!("RELEVANT PAGES: {}\n\n", pages.join(", ")));
        }

        out.push_str(&format!("{rule}\nSUMMARY:\n* Question Type: {}\n", self.question_type.label()));
        if self.total_matches() > 0 {
            out.push_str(&format!(
                "* Total matches found: {}\n* Relevant pages: {}\n* Mode: Fast Rule-based Search\n* Status: Information found\n",
                self.total_matches(),
                self.pages.len()
            ));
        } else {
            out.push_str(
                "* Mode: Fast Rule-based Search\n* Status: No direct matches found\n\n\
                 NO DIRECT MATCHES FOUND\n\n\
                 SUGGESTIONS:\n\
                 1. Try rephrasing your question\n\
                 2. Use hosted mode for better understanding\n\
                 3. Check the page analysis for context\n\
                 4. Search for specific keywords manually\n",
            );
        }
        out.push_str(&rule);

        out
    }
}

fn render_matches(out: &mut String, matches: &[SentenceMatch], chars: usize) {
    for (i, m) in matches.iter().take(SHOWN_MATCHES).enumerate() {
        out.push_str(&format!(
            "{}. {}... (Page {})\n   Relevance: {:.1}%\n\n",
            i + 1,
            truncate_chars(&m.text, chars),
            m.page,
            m.relevance * 100.0
        ));
    }
}
