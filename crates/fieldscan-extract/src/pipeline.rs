// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction pipeline: OCR page in, ranked fields out.
//
// The extractor holds only immutable state (compiled rules and config), so a
// single instance can be shared across threads and documents.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use fieldscan_core::config::ExtractionConfig;
use fieldscan_core::error::Result;
use fieldscan_core::types::{ExtractedField, FieldCandidate, LineItem};

use crate::line_items::LineItemScanner;
use crate::ocr::OcrPage;
use crate::rank::{collect_text_candidates, rank};
use crate::resolve::CoordinateResolver;
use crate::rules::RuleSet;

/// Everything extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub fields: Vec<ExtractedField>,
    pub line_items: Vec<LineItem>,
    pub full_text: String,
}

/// Stateless field extractor.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: RuleSet,
    line_items: LineItemScanner,
    config: ExtractionConfig,
}

impl FieldExtractor {
    /// Extractor with the built-in invoice rules.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        Self::with_rules(RuleSet::invoice_defaults()?, config)
    }

    /// Extractor with a caller-supplied rule set.
    pub fn with_rules(rules: RuleSet, config: ExtractionConfig) -> Result<Self> {
        Ok(Self {
            rules,
            line_items: LineItemScanner::new()?,
            config,
        })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run the full pipeline on one page.
    ///
    /// Never fails: missing lines or words and non-matching rules just mean
    /// fewer fields.
    #[instrument(skip_all, fields(lines = page.lines.len(), words = page.words.len()))]
    pub fn extract(&self, page: &OcrPage) -> Vec<ExtractedField> {
        let structured = self.structured_candidates(page);
        let text = collect_text_candidates(&page.words, &self.config);
        debug!(
            structured = structured.len(),
            text = text.len(),
            "candidate pool collected"
        );

        let fields = rank(structured, text, &self.config);
        info!(fields = fields.len(), "extraction complete");
        fields
    }

    /// Fields plus line items and the page's full text.
    pub fn extract_report(&self, page: &OcrPage) -> ExtractionReport {
        let fields = self.extract(page);
        let line_items = if self.config.extract_line_items {
            self.line_items.scan(page)
        } else {
            Vec::new()
        };
        ExtractionReport {
            fields,
            line_items,
            full_text: page.full_text.clone(),
        }
    }

    fn structured_candidates(&self, page: &OcrPage) -> Vec<FieldCandidate> {
        let resolver = CoordinateResolver::new(page, self.config.unlocalized_confidence);
        self.rules
            .evaluate(page)
            .into_iter()
            .filter_map(|m| {
                let rule = self.rules.rule(m.rank)?;
                let resolved = resolver.resolve(&m, rule);
                Some(FieldCandidate {
                    field_type: m.field_type,
                    value: m.value,
                    raw_source_text: m.matched,
                    confidence: resolved.confidence,
                    bbox: resolved.bbox,
                    pattern_rank: m.rank,
                })
            })
            .collect()
    }
}
