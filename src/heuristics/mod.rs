// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rule-based text analysis used when hosted models are unavailable

pub mod analyzer;
pub mod question;

pub use analyzer::HeuristicAnalyzer;
pub use question::{Findings, HeuristicAnswerer};

use regex::Captures;
use std::collections::HashSet;

/// First `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Drop repeated entries, keeping first occurrences in order
pub fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

/// Whole match when the pattern has no groups, otherwise the
/// participating non-empty groups joined by a space
fn joined_groups(caps: &Captures<'_>) -> String {
    if caps.len() == 1 {
        return caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
    }

    caps.iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 80), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_dedup_in_order() {
        let items = vec!["b", "a", "b", "c", "a"].into_iter().map(String::from).collect();
        assert_eq!(dedup_in_order(items), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_joined_groups() {
        let two = Regex::new(r"(\w+)\s+(\w+)?").unwrap();
        let caps = two.captures("Detective Smith").unwrap();
        assert_eq!(joined_groups(&caps), "Detective Smith");

        let none = Regex::new(r"room\s+\d+").unwrap();
        let caps = none.captures("the room 42 door").unwrap();
        assert_eq!(joined_groups(&caps), "room 42");
    }
}
