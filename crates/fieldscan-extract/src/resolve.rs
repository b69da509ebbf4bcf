// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate resolver: maps a matched text span back to the box it occupies
// on the page.
//
// Lines are searched before words because a line gives the tighter semantic
// context ("Total: $12.00" rather than a bare "$12.00").  An unresolvable
// match gets the placeholder box; losing coordinate precision never aborts
// extraction.

use tracing::trace;

use fieldscan_core::types::{BoundingBox, TextSpan, clamp_confidence};

use crate::ocr::OcrPage;
use crate::rules::{ExtractionRule, RuleMatch};

/// Words shorter than this never claim a match ("#", "$", ":").
const MIN_WORD_CHARS: usize = 2;

/// Where a resolved box came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanSource {
    Line(usize),
    Word(usize),
    Unresolved,
}

/// Box and confidence assigned to a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub source: SpanSource,
}

/// Resolves rule matches against one page.
pub struct CoordinateResolver<'a> {
    page: &'a OcrPage,
    unlocalized_confidence: f64,
}

impl<'a> CoordinateResolver<'a> {
    pub fn new(page: &'a OcrPage, unlocalized_confidence: f64) -> Self {
        Self {
            page,
            unlocalized_confidence: clamp_confidence(unlocalized_confidence),
        }
    }

    /// Locate `m`, produced by `rule`, on the page.
    pub fn resolve(&self, m: &RuleMatch, rule: &ExtractionRule) -> Resolved {
        let source = self.locate(m, rule);
        trace!(field = %m.field_type, value = %m.value, ?source, "match resolved");

        match source {
            SpanSource::Line(idx) => from_span(&self.page.lines[idx], source),
            SpanSource::Word(idx) => from_span(&self.page.words[idx], source),
            SpanSource::Unresolved => Resolved {
                bbox: BoundingBox::placeholder(),
                confidence: self.unlocalized_confidence,
                source,
            },
        }
    }

    fn locate(&self, m: &RuleMatch, rule: &ExtractionRule) -> SpanSource {
        if let Some(idx) = m.line.filter(|idx| *idx < self.page.lines.len()) {
            return SpanSource::Line(idx);
        }

        let captured = m.captured.trim();
        let needle = captured.to_lowercase();
        if needle.is_empty() {
            return SpanSource::Unresolved;
        }

        // The whole match pins the line; a bare value may repeat elsewhere.
        let matched = m.matched.trim().to_lowercase();
        if let Some(idx) = (!matched.is_empty())
            .then(|| self.line_containing(&matched))
            .flatten()
        {
            return SpanSource::Line(idx);
        }
        if let Some(idx) = self.page.lines.iter().position(|l| rule.yields(&l.text, captured)) {
            return SpanSource::Line(idx);
        }
        if let Some(idx) = self.line_containing(&needle) {
            return SpanSource::Line(idx);
        }
        if let Some(idx) = self.page.lines.iter().position(|l| rule.is_match(&l.text)) {
            return SpanSource::Line(idx);
        }
        if let Some(idx) = self.word_overlapping(&needle) {
            return SpanSource::Word(idx);
        }
        SpanSource::Unresolved
    }

    /// First line holding `needle` as a whole phrase, so "total: $5.00" does
    /// not land inside "subtotal: $5.00".
    fn line_containing(&self, needle: &str) -> Option<usize> {
        self.page
            .lines
            .iter()
            .position(|line| contains_phrase(&line.text.to_lowercase(), needle))
    }

    /// A word that contains the needle, or is contained by it.
    fn word_overlapping(&self, needle: &str) -> Option<usize> {
        self.page.words.iter().position(|word| {
            let text = word.text.trim().to_lowercase();
            text.chars().count() >= MIN_WORD_CHARS
                && (text.contains(needle) || needle.contains(text.as_str()))
        })
    }
}

fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let starts_word = needle.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = needle.chars().next_back().is_some_and(char::is_alphanumeric);
    haystack.match_indices(needle).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        !(starts_word && before.is_some_and(char::is_alphanumeric))
            && !(ends_word && after.is_some_and(char::is_alphanumeric))
    })
}

fn from_span(span: &impl TextSpan, source: SpanSource) -> Resolved {
    Resolved {
        bbox: span.bbox(),
        confidence: clamp_confidence(span.confidence()),
        source,
    }
}
