// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pattern matching engine.
//
// Each field type owns an ordered list of rules, most specific first.  A rule
// is a regular expression with exactly one capturing group.  Every rule is
// evaluated; a later rule never gets skipped because an earlier one matched,
// since ranking picks the winner on resolved confidence afterwards.
//
// Evaluation is a pure function of the page text and the rule set, so the
// same input always yields the same matches in the same order.

use regex::Regex;
use tracing::{debug, trace};

use fieldscan_core::error::{FieldscanError, Result};
use fieldscan_core::types::FieldType;

use crate::normalize::{Normalizer, amount_value};
use crate::ocr::OcrPage;

// ---------------------------------------------------------------------------
// Shared pattern fragments
// ---------------------------------------------------------------------------

/// Currency amount without the symbol: `1,250.00`, `1250`, `3.5`.
const AMOUNT: &str = r"(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?";

/// Any supported date literal, as a non-capturing alternation.
const DATE: &str = concat!(
    r"(?:\d{4}-\d{2}-\d{2}",
    r"|\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}",
    r"|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4})"
);

/// Words that, right before a date, mark it as a due date.
const DUE_MARKERS: &[&str] = &["due", "payment"];

/// Where a rule looks for matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The page's full text (lines joined by a space).
    FullText,
    /// Each OCR line separately, first matching line wins.  Falls back to the
    /// full text when the page has no lines.
    Lines,
    /// Like [`Scope::Lines`] but only the first `n` lines.
    LeadingLines(usize),
}

/// Which occurrence a rule reports when its pattern matches several times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    First,
    /// The occurrence with the largest amount value; earliest wins ties.
    LargestAmount,
}

/// One extraction rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    field_type: FieldType,
    pattern: Regex,
    normalizer: Normalizer,
    scope: Scope,
    occurrence: Occurrence,
    not_after: &'static [&'static str],
    min_len: usize,
}

impl ExtractionRule {
    /// Compile a rule.  The pattern must contain exactly one capturing group.
    pub fn new(field_type: FieldType, pattern: &str, normalizer: Normalizer) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| FieldscanError::InvalidRule {
            field: field_type,
            reason: e.to_string(),
        })?;

        // captures_len counts the implicit whole-match group.
        let groups = pattern.captures_len() - 1;
        if groups != 1 {
            return Err(FieldscanError::InvalidRule {
                field: field_type,
                reason: format!("expected exactly one capture group, found {groups}"),
            });
        }

        Ok(Self {
            field_type,
            pattern,
            normalizer,
            scope: Scope::FullText,
            occurrence: Occurrence::First,
            not_after: &[],
            min_len: 1,
        })
    }

    pub fn scoped(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn taking(mut self, occurrence: Occurrence) -> Self {
        self.occurrence = occurrence;
        self
    }

    /// Skip occurrences whose two preceding words include any of `words`.
    pub fn not_after(mut self, words: &'static [&'static str]) -> Self {
        self.not_after = words;
        self
    }

    /// Reject captures shorter than `len` characters.
    pub fn min_len(mut self, len: usize) -> Self {
        self.min_len = len;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Whether the rule's pattern matches `text` anywhere.
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Whether some accepted occurrence in `text` captures exactly `captured`.
    pub fn yields(&self, text: &str, captured: &str) -> bool {
        self.hits(text).any(|hit| hit.captured == captured)
    }

    /// Evaluate this rule against a single piece of text.
    fn find(&self, text: &str) -> Option<Hit> {
        let hits = self.hits(text);
        match self.occurrence {
            Occurrence::First => hits.into_iter().next(),
            Occurrence::LargestAmount => hits.fold(None, |best: Option<Hit>, hit| match best {
                Some(b) if amount_value(&b.value) >= amount_value(&hit.value) => Some(b),
                _ => Some(hit),
            }),
        }
    }

    /// Every occurrence in `text` that survives the exclusions and normalizes.
    fn hits<'t>(&'t self, text: &'t str) -> impl Iterator<Item = Hit> + 't {
        self.pattern.captures_iter(text).filter_map(move |caps| {
            let whole = caps.get(0)?;
            let group = caps.get(1)?;
            if self.preceded_by_excluded(&text[..whole.start()]) {
                trace!(field = %self.field_type, matched = whole.as_str(), "skipped by preceding word");
                return None;
            }
            let captured = group.as_str().trim();
            if captured.chars().count() < self.min_len {
                return None;
            }
            let value = self.normalizer.apply(captured)?;
            Some(Hit {
                value,
                captured: captured.to_string(),
                matched: whole.as_str().trim().to_string(),
            })
        })
    }

    fn preceded_by_excluded(&self, before: &str) -> bool {
        if self.not_after.is_empty() {
            return false;
        }
        before
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .rev()
            .take(2)
            .any(|w| {
                self.not_after
                    .iter()
                    .any(|excluded| w.eq_ignore_ascii_case(excluded))
            })
    }
}

/// A single occurrence accepted by a rule.
struct Hit {
    value: String,
    captured: String,
    matched: String,
}

/// A rule's contribution for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub field_type: FieldType,
    /// Index of the producing rule in its [`RuleSet`].
    pub rank: usize,
    /// Normalized value.
    pub value: String,
    /// The captured substring as it appears in the text.
    pub captured: String,
    /// The whole pattern match, used as raw source text.
    pub matched: String,
    /// Line the match came from, for line-scoped rules.
    pub line: Option<usize>,
}

/// Ordered collection of rules.  Declaration order is the tie-break order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: ExtractionRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn rule(&self, rank: usize) -> Option<&ExtractionRule> {
        self.rules.get(rank)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against the page, in declaration order.
    pub fn evaluate(&self, page: &OcrPage) -> Vec<RuleMatch> {
        let matches: Vec<RuleMatch> = self
            .rules
            .iter()
            .enumerate()
            .filter_map(|(rank, rule)| evaluate_rule(rank, rule, page))
            .collect();
        debug!(rules = self.rules.len(), matches = matches.len(), "rules evaluated");
        matches
    }

    /// The built-in invoice rule set.
    pub fn invoice_defaults() -> Result<Self> {
        use FieldType::*;
        use Normalizer as N;

        let amount = |label: &str| format!(r"(?i){label}\s*:?\s*(?:USD\s*)?\$?\s*({AMOUNT})");
        let date = |label: &str| format!(r"(?i){label}\s*:?\s*({DATE})");

        let rules = vec![
            // -- invoice number --
            ExtractionRule::new(
                InvoiceNumber,
                r"(?i)\binvoice\s*(?:number|num|no\.?|#)\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]*)",
                N::Identifier,
            )?,
            ExtractionRule::new(
                InvoiceNumber,
                r"(?i)\binv(?:oice)?\s*[:#]\s*([A-Z0-9][A-Z0-9\-/]*)",
                N::Identifier,
            )?,
            ExtractionRule::new(
                InvoiceNumber,
                r"(?i)\bbill\s*(?:number|no\.?|#)\s*:?\s*([A-Z0-9][A-Z0-9\-/]*)",
                N::Identifier,
            )?,
            ExtractionRule::new(InvoiceNumber, r"(?i)#\s*([A-Z0-9][A-Z0-9\-/]{2,})", N::Identifier)?,
            ExtractionRule::new(
                InvoiceNumber,
                r"\b([A-Z0-9]*[A-Z][A-Z0-9]*(?:-[A-Z0-9]+)+)\b",
                N::Identifier,
            )?
            .min_len(4),
            // -- date --
            ExtractionRule::new(
                Date,
                &date(r"\b(?:invoice\s+|issue\s+|bill(?:ing)?\s+)?date(?:\s+issued)?"),
                N::Date,
            )?
            .not_after(DUE_MARKERS),
            ExtractionRule::new(
                Date,
                r"\b(\d{1,2}[/.\-]\d{1,2}[/.\-](?:\d{4}|\d{2}))\b",
                N::Date,
            )?
            .not_after(DUE_MARKERS),
            ExtractionRule::new(Date, r"\b(\d{4}-\d{2}-\d{2})\b", N::Date)?.not_after(DUE_MARKERS),
            ExtractionRule::new(
                Date,
                r"(?i)\b((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4})\b",
                N::Date,
            )?
            .not_after(DUE_MARKERS),
            // -- due date --
            ExtractionRule::new(
                DueDate,
                &date(r"\b(?:due\s*date|payment\s*due(?:\s*date)?|due\s*(?:on|by))"),
                N::Date,
            )?,
            ExtractionRule::new(DueDate, &date(r"\bdue"), N::Date)?,
            // -- total --
            ExtractionRule::new(Total, &amount(r"\bgrand\s*total"), N::Amount)?,
            ExtractionRule::new(
                Total,
                &amount(r"\b(?:total\s*(?:due|amount)?|amount\s*due|balance\s*due)"),
                N::Amount,
            )?
            .not_after(&["sub"]),
            ExtractionRule::new(Total, &format!(r"\$\s*({AMOUNT})"), N::Amount)?
                .taking(Occurrence::LargestAmount),
            // -- subtotal --
            ExtractionRule::new(Subtotal, &amount(r"\bsub[\s\-]*total"), N::Amount)?,
            ExtractionRule::new(Subtotal, &amount(r"\bnet\s*(?:amount|total)"), N::Amount)?,
            // -- tax --
            ExtractionRule::new(
                Tax,
                &amount(r"\b(?:sales\s*)?tax(?:\s*\(?\d{1,2}(?:\.\d+)?\s*%\)?)?"),
                N::Amount,
            )?,
            ExtractionRule::new(
                Tax,
                &amount(r"\b(?:vat|gst|hst)(?:\s*\(?\d{1,2}(?:\.\d+)?\s*%\)?)?"),
                N::Amount,
            )?,
            // -- vendor --
            ExtractionRule::new(
                Vendor,
                r"(?i)\b(?:vendor|supplier|seller|sold\s*by|remit\s*to)\s*:?\s*(.+)$",
                N::Name,
            )?
            .scoped(Scope::Lines),
            ExtractionRule::new(Vendor, r"(?i)\bfrom\s*:\s*(.+)$", N::Name)?.scoped(Scope::Lines),
            ExtractionRule::new(
                Vendor,
                r"^([A-Z][A-Za-z0-9&.,' \-]{0,48}?\b(?:Inc|LLC|Corp|Corporation|Ltd|Limited|Co|Company|GmbH)\b\.?)\s*$",
                N::Name,
            )?
            .scoped(Scope::LeadingLines(5)),
            // -- customer --
            ExtractionRule::new(
                Customer,
                r"(?i)\b(?:bill(?:ed)?\s*to|sold\s*to|ship\s*to|customer(?:\s*name)?|client)\s*:?\s*(.+)$",
                N::Name,
            )?
            .scoped(Scope::Lines),
            ExtractionRule::new(
                Customer,
                r"\b([A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})\b",
                N::Email,
            )?,
        ];

        Ok(Self { rules })
    }
}

fn evaluate_rule(rank: usize, rule: &ExtractionRule, page: &OcrPage) -> Option<RuleMatch> {
    let line_limit = match rule.scope {
        Scope::FullText => None,
        Scope::Lines => Some(usize::MAX),
        Scope::LeadingLines(n) => Some(n),
    };

    let (hit, line) = match line_limit {
        Some(limit) if !page.lines.is_empty() => page
            .lines
            .iter()
            .take(limit)
            .enumerate()
            .find_map(|(idx, line)| rule.find(&line.text).map(|hit| (hit, Some(idx))))?,
        _ => (rule.find(&page.full_text)?, None),
    };

    trace!(field = %rule.field_type, rank, value = %hit.value, "rule matched");
    Some(RuleMatch {
        field_type: rule.field_type,
        rank,
        value: hit.value,
        captured: hit.captured,
        matched: hit.matched,
        line,
    })
}
