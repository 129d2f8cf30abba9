//! Entity rule set
//!
//! The rule file is a JSON array of `{label, pattern}` objects, the same
//! shape an entity-ruler pattern export has. The data layer only needs two
//! things from it: the distinct label set (to know which gold tables exist)
//! and, for the bundled extractor, the string patterns.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::pipeline::EntityExtractor;
use crate::records::EntitySpan;
use crate::Result;

/// One extraction rule
///
/// `pattern` is kept loose: string patterns are phrase matches, anything
/// else (token-level patterns) is meaningful only to a real NLP engine and
/// is carried for label enumeration alone.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub label: String,
    pub pattern: serde_json::Value,
}

/// Load the rule file
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let contents = std::fs::read_to_string(path)?;
    let rules: Vec<Rule> = serde_json::from_str(&contents)?;
    Ok(rules)
}

/// The sorted set of distinct labels defined in the rule set
pub fn labels_from_rules(rules: &[Rule]) -> Vec<String> {
    rules
        .iter()
        .map(|r| r.label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Case-insensitive phrase matcher over the string patterns of a rule set
///
/// A deliberately simple stand-in for the external NLP collaborator: it
/// reports every non-overlapping occurrence of each phrase, with byte
/// offsets into the normalized text.
pub struct RuleExtractor {
    phrases: Vec<(String, String)>, // (lowercased phrase, label)
}

impl RuleExtractor {
    pub fn from_rules(rules: &[Rule]) -> Self {
        let phrases = rules
            .iter()
            .filter_map(|r| {
                r.pattern
                    .as_str()
                    .map(|p| (p.to_lowercase(), r.label.clone()))
            })
            .collect();
        Self { phrases }
    }
}

impl EntityExtractor for RuleExtractor {
    fn extract(&self, text: &str) -> Vec<EntitySpan> {
        let lowered = text.to_lowercase();
        let mut spans = Vec::new();
        for (phrase, label) in &self.phrases {
            if phrase.is_empty() {
                continue;
            }
            for (start, matched) in lowered.match_indices(phrase.as_str()) {
                spans.push(EntitySpan {
                    entity_text: matched.to_string(),
                    label: label.clone(),
                    start_pos: start as i64,
                    end_pos: (start + matched.len()) as i64,
                });
            }
        }
        spans.sort_by_key(|s| s.start_pos);
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule> {
        serde_json::from_str(
            r#"[
                {"label": "PUESTO", "pattern": "ingeniero"},
                {"label": "SKILL", "pattern": "python"},
                {"label": "SKILL", "pattern": [{"LOWER": "sql"}]},
                {"label": "MODALIDAD", "pattern": "remoto"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_labels_are_sorted_and_distinct() {
        let labels = labels_from_rules(&rules());
        assert_eq!(labels, vec!["MODALIDAD", "PUESTO", "SKILL"]);
    }

    #[test]
    fn test_extractor_finds_all_occurrences() {
        let extractor = RuleExtractor::from_rules(&rules());
        let spans = extractor.extract("se busca ingeniero con python; ingeniero senior");
        let entities: Vec<&str> = spans.iter().map(|s| s.entity_text.as_str()).collect();
        assert_eq!(entities, vec!["ingeniero", "python", "ingeniero"]);
        assert_eq!(spans[0].start_pos, 9);
        assert_eq!(spans[0].end_pos, 18);
    }

    #[test]
    fn test_extractor_ignores_token_patterns() {
        let extractor = RuleExtractor::from_rules(&rules());
        let spans = extractor.extract("necesitamos sql ya");
        assert!(spans.is_empty());
    }
}
