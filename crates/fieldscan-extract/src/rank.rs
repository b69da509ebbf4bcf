// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field deduplicator and ranker.
//
// Turns the unordered candidate pool into the final field list:
//
//   1. one winner per structured type, above the confidence floor;
//   2. free `text` words that pass the validity filter;
//   3. free words overlapping a structured value are dropped;
//   4. duplicates by (normalized value, type) collapse to the first;
//   5. structured fields first, then text, each top-to-bottom.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use fieldscan_core::config::ExtractionConfig;
use fieldscan_core::types::{ExtractedField, FieldCandidate, FieldType, OcrWord, TextSpan};

/// Punctuation allowed in free-text tokens besides letters and digits.
const ALLOWED_PUNCTUATION: &str = ".,$@#%&+=_:;/\\";

/// Common English function words never reported as free text.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "may", "who", "did", "get", "him", "let",
    "she", "too", "use", "with", "this", "that", "from", "they", "will", "have", "your", "been",
    "were", "than", "then", "them", "what", "when", "which", "into", "upon", "also", "only",
    "per", "via", "off", "over", "some", "such", "each", "there", "their", "these", "those",
    "would", "could", "should", "about", "after", "before",
];

/// Whether `candidate` beats `incumbent`: higher confidence, or equal
/// confidence from an earlier-declared rule.
fn beats(candidate: &FieldCandidate, incumbent: &FieldCandidate) -> bool {
    candidate.confidence > incumbent.confidence
        || (candidate.confidence == incumbent.confidence
            && candidate.pattern_rank < incumbent.pattern_rank)
}

/// Keep the best candidate per structured type, dropping winners below
/// `min_confidence`.  Output is in [`FieldType`] declaration order.
pub fn select_structured(candidates: Vec<FieldCandidate>, min_confidence: f64) -> Vec<FieldCandidate> {
    let mut best: BTreeMap<FieldType, FieldCandidate> = BTreeMap::new();
    for candidate in candidates.into_iter().filter(|c| c.field_type.is_structured()) {
        match best.get(&candidate.field_type) {
            Some(incumbent) if !beats(&candidate, incumbent) => {}
            _ => {
                best.insert(candidate.field_type, candidate);
            }
        }
    }

    best.into_values()
        .filter(|winner| {
            let keep = winner.confidence >= min_confidence;
            if !keep {
                debug!(
                    field = %winner.field_type,
                    confidence = winner.confidence,
                    min_confidence,
                    "structured field below confidence floor"
                );
            }
            keep
        })
        .collect()
}

/// Whether a free word is worth reporting as `text`.
pub fn is_valid_free_text(text: &str, min_len: usize) -> bool {
    let text = text.trim();
    if text.chars().count() < min_len || !text.chars().any(char::is_alphabetic) {
        return false;
    }
    if !text
        .chars()
        .all(|c| c.is_alphanumeric() || ALLOWED_PUNCTUATION.contains(c))
    {
        return false;
    }
    let bare = text
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    !STOPWORDS.contains(&bare.as_str())
}

/// Free `text` candidates from individual high-confidence words.
pub fn collect_text_candidates(words: &[OcrWord], config: &ExtractionConfig) -> Vec<FieldCandidate> {
    words
        .iter()
        .enumerate()
        .filter(|(_, word)| word.confidence() >= config.text_min_confidence)
        .filter(|(_, word)| is_valid_free_text(word.text(), config.text_min_length))
        .map(|(idx, word)| FieldCandidate {
            field_type: FieldType::Text,
            value: word.text().trim().to_string(),
            raw_source_text: word.text().to_string(),
            confidence: word.confidence(),
            bbox: word.bbox(),
            pattern_rank: idx,
        })
        .collect()
}

/// Drop free text that is a substring of, or contains, a structured value.
pub fn drop_overlapping(text: Vec<FieldCandidate>, structured: &[FieldCandidate]) -> Vec<FieldCandidate> {
    let taken: Vec<String> = structured
        .iter()
        .map(|c| c.value.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();

    text.into_iter()
        .filter(|candidate| {
            let value = candidate.value.trim().to_lowercase();
            !taken
                .iter()
                .any(|t| t.contains(value.as_str()) || value.contains(t.as_str()))
        })
        .collect()
}

/// Key under which two fields count as duplicates.
fn dedup_key(field: &ExtractedField) -> (String, FieldType) {
    let normalized = field
        .value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (normalized, field.field_type)
}

/// Remove duplicates by (normalized value, type), keeping first occurrences.
pub fn dedup_fields(fields: Vec<ExtractedField>) -> Vec<ExtractedField> {
    let mut seen = HashSet::new();
    fields
        .into_iter()
        .filter(|field| seen.insert(dedup_key(field)))
        .collect()
}

/// Structured fields before `text`, each group top-to-bottom.  Stable.
pub fn order_fields(fields: &mut [ExtractedField]) {
    fields.sort_by(|a, b| {
        let group_a = a.field_type == FieldType::Text;
        let group_b = b.field_type == FieldType::Text;
        group_a.cmp(&group_b).then(a.bbox.y.total_cmp(&b.bbox.y))
    });
}

/// Full ranking: structured pool plus free-word pool in, final list out.
pub fn rank(
    structured_pool: Vec<FieldCandidate>,
    text_pool: Vec<FieldCandidate>,
    config: &ExtractionConfig,
) -> Vec<ExtractedField> {
    let structured = select_structured(structured_pool, config.structured_min_confidence);
    let text = drop_overlapping(text_pool, &structured);

    let fields: Vec<ExtractedField> = structured
        .into_iter()
        .chain(text)
        .map(FieldCandidate::into_field)
        .collect();

    let mut fields = dedup_fields(fields);
    order_fields(&mut fields);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::types::BoundingBox;

    fn candidate(field_type: FieldType, value: &str, confidence: f64, y: f64, rank: usize) -> FieldCandidate {
        FieldCandidate {
            field_type,
            value: value.into(),
            raw_source_text: value.into(),
            confidence,
            bbox: BoundingBox::new(0.0, y, 50.0, y + 10.0),
            pattern_rank: rank,
        }
    }

    #[test]
    fn highest_confidence_wins_per_type() {
        let winners = select_structured(
            vec![
                candidate(FieldType::Total, "10.00", 80.0, 0.0, 0),
                candidate(FieldType::Total, "99.00", 92.0, 0.0, 2),
                candidate(FieldType::Tax, "1.00", 75.0, 0.0, 3),
            ],
            70.0,
        );
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[0].value, "99.00");
        assert_eq!(winners[1].field_type, FieldType::Tax);
    }

    #[test]
    fn confidence_tie_prefers_earlier_rule() {
        let winners = select_structured(
            vec![
                candidate(FieldType::Date, "2024-02-02", 90.0, 0.0, 7),
                candidate(FieldType::Date, "2024-01-01", 90.0, 0.0, 5),
            ],
            70.0,
        );
        assert_eq!(winners[0].value, "2024-01-01");
    }

    #[test]
    fn winner_below_floor_is_omitted() {
        let winners = select_structured(vec![candidate(FieldType::Vendor, "Acme", 60.0, 0.0, 0)], 70.0);
        assert!(winners.is_empty());
    }

    #[test]
    fn free_text_filter() {
        assert!(is_valid_free_text("Widgets", 3));
        assert!(is_valid_free_text("Net:30", 3));
        assert!(!is_valid_free_text("ab", 3));
        assert!(!is_valid_free_text("1234", 3));
        assert!(!is_valid_free_text("the", 3));
        assert!(!is_valid_free_text("With,", 3));
        assert!(!is_valid_free_text("Price!", 3));
    }

    #[test]
    fn low_confidence_words_are_not_text() {
        let config = ExtractionConfig::default();
        let words = vec![
            OcrWord::new("Shipping", 60.0, BoundingBox::placeholder()),
            OcrWord::new("Handling", 91.0, BoundingBox::placeholder()),
        ];
        let text = collect_text_candidates(&words, &config);
        assert_eq!(text.len(), 1);
        assert_eq!(text[0].value, "Handling");
    }

    #[test]
    fn text_overlapping_structured_value_is_dropped() {
        let structured = vec![candidate(FieldType::Vendor, "Acme Corp", 90.0, 0.0, 0)];
        let text = vec![
            candidate(FieldType::Text, "Acme", 90.0, 0.0, 0),
            candidate(FieldType::Text, "Acme-Corp-Holdings", 90.0, 0.0, 1),
            candidate(FieldType::Text, "Thanks", 90.0, 0.0, 2),
        ];
        let kept = drop_overlapping(text, &structured);
        let values: Vec<&str> = kept.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["Acme-Corp-Holdings", "Thanks"]);
    }

    #[test]
    fn structured_fields_precede_text_in_reading_order() {
        let config = ExtractionConfig::default();
        let fields = rank(
            vec![
                candidate(FieldType::Total, "12.00", 90.0, 500.0, 1),
                candidate(FieldType::InvoiceNumber, "A-17", 90.0, 40.0, 0),
            ],
            vec![
                candidate(FieldType::Text, "Thanks", 90.0, 10.0, 0),
                candidate(FieldType::Text, "Widgets", 90.0, 5.0, 1),
            ],
            &config,
        );

        let order: Vec<(FieldType, &str)> =
            fields.iter().map(|f| (f.field_type, f.value.as_str())).collect();
        assert_eq!(
            order,
            vec![
                (FieldType::InvoiceNumber, "A-17"),
                (FieldType::Total, "12.00"),
                (FieldType::Text, "Widgets"),
                (FieldType::Text, "Thanks"),
            ]
        );
    }

    #[test]
    fn duplicate_text_collapses_to_first() {
        let config = ExtractionConfig::default();
        let fields = rank(
            vec![],
            vec![
                candidate(FieldType::Text, "Widgets", 90.0, 10.0, 0),
                candidate(FieldType::Text, "WIDGETS", 95.0, 30.0, 1),
            ],
            &config,
        );
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].bbox.y, 10.0);
    }

    #[test]
    fn dedup_and_order_are_idempotent() {
        let config = ExtractionConfig::default();
        let once = rank(
            vec![
                candidate(FieldType::Tax, "3.00", 88.0, 300.0, 4),
                candidate(FieldType::Date, "2024-01-01", 88.0, 20.0, 2),
            ],
            vec![
                candidate(FieldType::Text, "Alpha", 90.0, 50.0, 0),
                candidate(FieldType::Text, "alpha", 90.0, 60.0, 1),
                candidate(FieldType::Text, "Beta", 90.0, 50.0, 2),
            ],
            &config,
        );

        let mut twice = dedup_fields(once.clone());
        order_fields(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_pool_is_empty_output() {
        let config = ExtractionConfig::default();
        assert!(rank(vec![], vec![], &config).is_empty());
    }
}
