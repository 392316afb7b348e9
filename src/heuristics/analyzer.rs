// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Pattern-based extraction of entities, keyword categories and events

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{dedup_in_order, truncate_chars};
use crate::model::{Analysis, AnalysisSource};

/// Upper bound on each list before the display caps apply
const RAW_LIST_LIMIT: usize = 10;

/// Characters of a sentence quoted in an event entry
const EVENT_PREFIX_CHARS: usize = 80;

const ENTITY_STOPWORDS: &[&str] = &["the", "and", "but", "for", "from", "this", "that", "with"];

/// Name patterns paired with the role they imply, in priority order
static ROLE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    const NAME: &str = r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)";
    vec![
        (
            Regex::new(&format!(r"(Detective|Officer|Constable|Inspector|Sergeant)\s+{NAME}")).unwrap(),
            "detective",
        ),
        (
            Regex::new(&format!(r"(Dr\.|Doctor|Nurse|Surgeon|Physician)\s+{NAME}")).unwrap(),
            "medical",
        ),
        (
            Regex::new(&format!(r"(Professor|Prof\.|Lecturer|Teacher)\s+{NAME}")).unwrap(),
            "academic",
        ),
        (
            Regex::new(&format!(r"(Mr\.|Mrs\.|Ms\.|Miss|Master)\s+{NAME}")).unwrap(),
            "person",
        ),
        (Regex::new(r"\b([A-Z][a-z]+)\s+([A-Z][a-z]+)\b").unwrap(), "person"),
    ]
});

/// Fixed vocabulary buckets reported as `CATEGORY: TERM, TERM`
const KEYWORD_CATEGORIES: &[(&str, &[&str])] = &[
    ("CHARACTERS", &["said", "asked", "replied", "answered", "whispered", "shouted"]),
    ("ACTIONS", &["went", "came", "ran", "walked", "entered", "left", "took", "gave"]),
    ("OBJECTS", &["book", "letter", "key", "door", "window", "car", "house", "room"]),
    ("EMOTIONS", &["happy", "sad", "angry", "scared", "surprised", "excited"]),
    ("TIME", &["morning", "afternoon", "evening", "night", "day", "week", "month", "year"]),
    ("LOCATIONS", &["home", "office", "school", "hospital", "street", "park", "city"]),
];

/// Event labels and the phrases that trigger them
const EVENT_PATTERNS: &[(&str, &[&str])] = &[
    ("DIALOGUE", &["\"", "said", "asked", "replied", "answered"]),
    ("ACTION", &["went to", "came from", "ran towards", "walked into"]),
    ("DISCOVERY", &["found", "discovered", "noticed", "saw", "observed"]),
    ("CONFLICT", &["argued", "fought", "disagreed", "confronted"]),
    ("DECISION", &["decided", "chose", "selected", "picked"]),
    ("REVELATION", &["realized", "understood", "learned", "found out"]),
    ("TRANSITION", &["then", "next", "after", "later", "meanwhile"]),
    ("DESCRIPTION", &["was", "were", "had", "looked", "seemed", "appeared"]),
];

/// Every label a heuristic event can carry
pub const EVENT_LABELS: [&str; 8] = [
    "DIALOGUE",
    "ACTION",
    "DISCOVERY",
    "CONFLICT",
    "DECISION",
    "REVELATION",
    "TRANSITION",
    "DESCRIPTION",
];

/// Every keyword category name
pub const KEYWORD_CATEGORY_NAMES: [&str; 6] =
    ["CHARACTERS", "ACTIONS", "OBJECTS", "EMOTIONS", "TIME", "LOCATIONS"];

/// Rule-based page analyzer
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze one page of text. Never fails; empty text yields empty lists.
    pub fn analyze(&self, text: &str, page_number: u32) -> Analysis {
        let sentences: Vec<&str> = text.split('.').collect();

        let entities = finalize(Self::entities(&sentences));
        let keywords = finalize(Self::keywords(text));
        let events = finalize(Self::events(&sentences));

        debug!(
            "Heuristic analysis of page {}: {} entities, {} keywords, {} events",
            page_number,
            entities.len(),
            keywords.len(),
            events.len()
        );

        Analysis {
            entities,
            keywords,
            events,
            source: AnalysisSource::Heuristic,
        }
        .truncated()
    }

    fn entities(sentences: &[&str]) -> Vec<String> {
        let mut entities = Vec::new();

        for sentence in sentences {
            if sentence.trim().chars().count() <= 10 {
                continue;
            }
            for (name, role) in entities_with_roles(sentence) {
                let entry = format!("{} ({})", name, role);
                if !entities.contains(&entry) {
                    entities.push(entry);
                }
            }
        }

        entities
    }

    fn keywords(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();

        KEYWORD_CATEGORIES
            .iter()
            .filter_map(|(category, terms)| {
                let found: Vec<String> = terms
                    .iter()
                    .filter(|t| lower.contains(*t))
                    .take(3)
                    .map(|t| t.to_uppercase())
                    .collect();
                (!found.is_empty()).then(|| format!("{}: {}", category, found.join(", ")))
            })
            .collect()
    }

    fn events(sentences: &[&str]) -> Vec<String> {
        let mut events = Vec::new();

        for sentence in sentences {
            let clean = sentence.trim();
            let lower = clean.to_lowercase();
            if lower.chars().count() <= 10 {
                continue;
            }

            // One entry per matching label; the first trigger of a label decides it
            for (label, triggers) in EVENT_PATTERNS {
                if triggers.iter().any(|t| lower.contains(t)) && clean.chars().count() > 20 {
                    events.push(format!(
                        "{}: {}...",
                        label,
                        truncate_chars(clean, EVENT_PREFIX_CHARS)
                    ));
                }
            }
        }

        events
    }
}

/// `(name, role)` pairs found in a sentence, in pattern order
pub fn entities_with_roles(sentence: &str) -> Vec<(String, &'static str)> {
    let mut found = Vec::new();

    for (pattern, role) in ROLE_PATTERNS.iter() {
        for caps in pattern.captures_iter(sentence) {
            let parts: Vec<&str> = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .filter(|s| s.chars().count() > 1)
                .collect();
            if parts.is_empty() {
                continue;
            }
            let entity = parts.join(" ");
            if !ENTITY_STOPWORDS.contains(&entity.to_lowercase().as_str()) {
                found.push((entity, *role));
            }
        }
    }

    found
}

fn finalize(items: Vec<String>) -> Vec<String> {
    let mut items = dedup_in_order(items);
    items.truncate(RAW_LIST_LIMIT);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ENTITY_LIMIT, EVENT_LIMIT, KEYWORD_LIMIT};

    const SAMPLE: &str = "Detective Smith said the window was broken.";

    #[test]
    fn test_detective_example() {
        let analysis = HeuristicAnalyzer::new().analyze(SAMPLE, 1);

        assert!(analysis.entities.contains(&"Detective Smith (detective)".to_string()));
        assert!(analysis.keywords.contains(&"CHARACTERS: SAID".to_string()));
        assert!(analysis.keywords.contains(&"OBJECTS: WINDOW".to_string()));
        assert!(analysis.events.iter().any(|e| e.starts_with("DIALOGUE: Detective Smith said")));
        assert_eq!(analysis.source, AnalysisSource::Heuristic);
    }

    #[test]
    fn test_detective_entities_exact() {
        let analysis = HeuristicAnalyzer::new().analyze(SAMPLE, 1);
        assert_eq!(
            analysis.entities,
            vec!["Detective Smith (detective)", "Detective Smith (person)"]
        );
    }

    #[test]
    fn test_empty_text() {
        let analysis = HeuristicAnalyzer::new().analyze("", 1);
        assert!(analysis.is_empty());
    }

    #[test]
    fn test_short_sentences_are_ignored() {
        let analysis = HeuristicAnalyzer::new().analyze("Mr. Bo. Hi Al.", 1);
        assert!(analysis.entities.is_empty());
        assert!(analysis.events.is_empty());
    }

    #[test]
    fn test_roles() {
        let pairs = entities_with_roles("Professor Moriarty met Nurse Ratched at the station");
        assert!(pairs.contains(&("Professor Moriarty".to_string(), "academic")));
        assert!(pairs.contains(&("Nurse Ratched".to_string(), "medical")));
    }

    #[test]
    fn test_event_labels_are_closed_set() {
        let text = "Then she decided to leave the house quickly. They argued about the missing letter for hours. \
                    He realized the key had been found under the old mat. She walked into the garden and saw a fox.";
        let analysis = HeuristicAnalyzer::new().analyze(text, 3);

        assert!(!analysis.events.is_empty());
        for event in &analysis.events {
            let label = event.split(':').next().unwrap();
            assert!(EVENT_LABELS.contains(&label), "unexpected label in {event}");
            assert!(event.ends_with("..."));
        }
    }

    #[test]
    fn test_keyword_entries_are_well_formed() {
        let text = "In the morning he went to the office, took a book and left the room. \
                    She was happy and excited about the day in the city park.";
        let analysis = HeuristicAnalyzer::new().analyze(text, 1);

        for entry in &analysis.keywords {
            let (category, terms) = entry.split_once(": ").unwrap();
            assert!(KEYWORD_CATEGORY_NAMES.contains(&category));
            let terms: Vec<&str> = terms.split(", ").collect();
            assert!(!terms.is_empty() && terms.len() <= 3);
            assert!(terms.iter().all(|t| *t == t.to_uppercase()));
        }
        assert!(analysis.keywords.contains(&"ACTIONS: WENT, LEFT, TOOK".to_string()));
    }

    #[test]
    fn test_caps_and_uniqueness() {
        let text = (0..40)
            .map(|i| format!("Inspector Name{} walked into the hall and said something odd", char::from(b'a' + (i % 26) as u8)))
            .collect::<Vec<_>>()
            .join(". ");
        let analysis = HeuristicAnalyzer::new().analyze(&text, 1);

        assert!(analysis.entities.len() <= ENTITY_LIMIT);
        assert!(analysis.keywords.len() <= KEYWORD_LIMIT);
        assert!(analysis.events.len() <= EVENT_LIMIT);

        let unique: std::collections::HashSet<_> = analysis.entities.iter().collect();
        assert_eq!(unique.len(), analysis.entities.len());
    }

    #[test]
    fn test_deterministic() {
        let a = HeuristicAnalyzer::new().analyze(SAMPLE, 1);
        let b = HeuristicAnalyzer::new().analyze(SAMPLE, 1);
        assert_eq!(a, b);
    }
}
