//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Deterministic fuzzy resolution of user-typed names.
//!
//! Users type human-readable names; the world is keyed by stable ids. The
//! resolution ladder is fixed: exact, case-insensitive exact, unique
//! case-insensitive prefix, unique case-insensitive substring. Ambiguity at
//! any stage enumerates the matches rather than picking arbitrarily, and a
//! miss suggests up to five near-misses by edit distance. Candidate
//! insertion order never affects the outcome.

/// Maximum candidates enumerated in an ambiguity error.
const MAX_AMBIGUOUS_LISTED: usize = 10;
/// Maximum near-miss suggestions on a failed resolve.
const MAX_SUGGESTIONS: usize = 5;

/// Special token resolving to the actor's current room in room-argument
/// positions.
pub const ROOM_HERE: &str = "here";

/// Outcome of a fuzzy resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single candidate was selected.
    Resolved(String),
    /// More than one candidate matched at the deciding stage.
    Ambiguous(Vec<String>),
    /// Nothing matched; carries up to five suggestions by edit distance.
    NotFound(Vec<String>),
}

/// Remove surrounding single or double quotes when the whole string is
/// quoted.
pub fn strip_quotes(s: &str) -> &str {
    let t = s.trim();
    if t.len() >= 2 {
        let bytes = t.as_bytes();
        let (first, last) = (bytes[0], bytes[t.len() - 1]);
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            return t[1..t.len() - 1].trim();
        }
    }
    t
}

/// Split on `|`, trimming whitespace and surrounding quotes per part. With
/// `expected`, short inputs are padded with empty strings and extras are
/// re-joined onto the last slot.
pub fn parse_pipe_parts(s: &str, expected: Option<usize>) -> Vec<String> {
    let mut parts: Vec<String> = s
        .split('|')
        .map(|p| strip_quotes(p).to_string())
        .collect();
    if let Some(expected) = expected {
        while parts.len() < expected {
            parts.push(String::new());
        }
        if parts.len() > expected {
            let tail = parts.split_off(expected - 1).join(" | ");
            parts.push(tail);
        }
    }
    parts
}

/// Levenshtein edit distance; used only for suggestion ordering.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (prev[j + 1] + 1).min(current[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Run the resolution ladder over `candidates`.
pub fn fuzzy_resolve<I, S>(typed: &str, candidates: I) -> Resolution
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let typed = strip_quotes(typed);
    // Sorting removes any dependence on insertion order.
    let mut items: Vec<String> = candidates.into_iter().map(Into::into).collect();
    items.sort();
    items.dedup();

    if typed.is_empty() {
        return Resolution::NotFound(Vec::new());
    }

    // Stage 1: exact.
    if items.iter().any(|c| c == typed) {
        return Resolution::Resolved(typed.to_string());
    }

    let typed_low = typed.to_lowercase();

    // Stage 2: case-insensitive exact.
    let ci: Vec<&String> = items
        .iter()
        .filter(|c| c.to_lowercase() == typed_low)
        .collect();
    match ci.len() {
        1 => return Resolution::Resolved(ci[0].clone()),
        n if n > 1 => return Resolution::Ambiguous(ci.into_iter().cloned().collect()),
        _ => {}
    }

    // Stage 3: unique case-insensitive prefix.
    let prefixed: Vec<&String> = items
        .iter()
        .filter(|c| c.to_lowercase().starts_with(&typed_low))
        .collect();
    match prefixed.len() {
        1 => return Resolution::Resolved(prefixed[0].clone()),
        n if n > 1 => return Resolution::Ambiguous(prefixed.into_iter().cloned().collect()),
        _ => {}
    }

    // Stage 4: unique case-insensitive substring.
    let contained: Vec<&String> = items
        .iter()
        .filter(|c| c.to_lowercase().contains(&typed_low))
        .collect();
    match contained.len() {
        1 => return Resolution::Resolved(contained[0].clone()),
        n if n > 1 => return Resolution::Ambiguous(contained.into_iter().cloned().collect()),
        _ => {}
    }

    // Miss: suggest near names, distance ascending then lexicographic.
    let mut scored: Vec<(usize, String)> = items
        .into_iter()
        .map(|c| (edit_distance(&typed_low, &c.to_lowercase()), c))
        .collect();
    scored.sort();
    Resolution::NotFound(
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, c)| c)
            .collect(),
    )
}

/// Render the ladder outcome into the service-facing `(ok, err, resolved)`
/// contract with the standard error phrasing.
pub fn resolve_or_err<I, S>(typed: &str, candidates: I) -> Result<String, String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let shown = strip_quotes(typed);
    if shown.is_empty() {
        return Err("Identifier required.".to_string());
    }
    match fuzzy_resolve(typed, candidates) {
        Resolution::Resolved(value) => Ok(value),
        Resolution::Ambiguous(mut matches) => {
            matches.sort();
            matches.truncate(MAX_AMBIGUOUS_LISTED);
            Err(format!(
                "Ambiguous name. Did you mean: {} ?",
                matches.join(", ")
            ))
        }
        Resolution::NotFound(suggestions) => {
            if suggestions.is_empty() {
                Err(format!("'{}' not found.", shown))
            } else {
                Err(format!(
                    "'{}' not found. Did you mean: {}?",
                    shown,
                    suggestions.join(", ")
                ))
            }
        }
    }
}

/// Resolve a user-typed room name, honoring the `here` shorthand for the
/// actor's current room.
pub fn resolve_room_id(
    typed: &str,
    actor_room_id: Option<&str>,
    room_ids: impl IntoIterator<Item = String>,
) -> Result<String, String> {
    let stripped = strip_quotes(typed);
    if stripped.eq_ignore_ascii_case(ROOM_HERE) {
        return actor_room_id
            .map(String::from)
            .ok_or_else(|| "You are nowhere.".to_string());
    }
    resolve_or_err(typed, room_ids)
}

/// Trim a leading English article from movement input.
pub fn strip_article(input: &str) -> &str {
    let trimmed = input.trim();
    let low = trimmed.to_lowercase();
    for article in ["the ", "a ", "an "] {
        if low.starts_with(article) {
            return trimmed[article.len()..].trim_start();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec![
            "oak door".to_string(),
            "Oak Table".to_string(),
            "iron gate".to_string(),
            "garden path".to_string(),
        ]
    }

    #[test]
    fn test_exact_wins() {
        assert_eq!(
            fuzzy_resolve("oak door", names()),
            Resolution::Resolved("oak door".to_string())
        );
    }

    #[test]
    fn test_ci_exact() {
        assert_eq!(
            fuzzy_resolve("OAK DOOR", names()),
            Resolution::Resolved("oak door".to_string())
        );
    }

    #[test]
    fn test_ambiguous_prefix_enumerates() {
        match fuzzy_resolve("oak", names()) {
            Resolution::Ambiguous(matches) => {
                assert_eq!(matches.len(), 2);
                assert!(matches.contains(&"oak door".to_string()));
                assert!(matches.contains(&"Oak Table".to_string()));
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_unique_prefix() {
        assert_eq!(
            fuzzy_resolve("iro", names()),
            Resolution::Resolved("iron gate".to_string())
        );
    }

    #[test]
    fn test_unique_substring() {
        assert_eq!(
            fuzzy_resolve("path", names()),
            Resolution::Resolved("garden path".to_string())
        );
    }

    #[test]
    fn test_not_found_suggests_by_distance() {
        match fuzzy_resolve("oak dor", names()) {
            Resolution::NotFound(suggestions) => {
                assert_eq!(suggestions.first().map(String::as_str), Some("oak door"));
                assert!(suggestions.len() <= 5);
            }
            other => panic!("expected not-found, got {:?}", other),
        }
    }

    #[test]
    fn test_order_independence() {
        let forward = fuzzy_resolve("oak", names());
        let mut reversed = names();
        reversed.reverse();
        let backward = fuzzy_resolve("oak", reversed);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_empty_query() {
        assert!(matches!(
            fuzzy_resolve("", names()),
            Resolution::NotFound(_)
        ));
        assert!(resolve_or_err("", names()).is_err());
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'oak door'"), "oak door");
        assert_eq!(strip_quotes("\"oak door\""), "oak door");
        assert_eq!(strip_quotes("  plain  "), "plain");
        assert_eq!(strip_quotes("'"), "'");
    }

    #[test]
    fn test_parse_pipe_parts_padding() {
        let parts = parse_pipe_parts("a | 'b c'", Some(3));
        assert_eq!(parts, vec!["a", "b c", ""]);
    }

    #[test]
    fn test_parse_pipe_parts_overflow_joins() {
        let parts = parse_pipe_parts("a | b | c | d", Some(2));
        assert_eq!(parts, vec!["a", "b | c | d"]);
    }

    #[test]
    fn test_resolve_room_here() {
        let resolved =
            resolve_room_id("here", Some("tavern"), vec!["start".to_string()]).unwrap();
        assert_eq!(resolved, "tavern");
        assert!(resolve_room_id("here", None, vec!["start".to_string()]).is_err());
    }

    #[test]
    fn test_strip_article() {
        assert_eq!(strip_article("the oak door"), "oak door");
        assert_eq!(strip_article("An Apple"), "Apple");
        assert_eq!(strip_article("gate"), "gate");
    }

    #[test]
    fn test_edit_distance_basics() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
