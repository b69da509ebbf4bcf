// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fieldscan-extract: Invoice field extraction from OCR output.
//
// Normalizes engine output into words and lines, runs ordered extraction rules
// over the recognized text, resolves each match back to a page box, and ranks
// the candidates into the final field list.  Also finds line items and
// formats JSON/CSV payloads.

pub mod export;
pub mod line_items;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod rank;
pub mod resolve;
pub mod rules;

// Re-export the primary entry points so callers can use `fieldscan_extract::FieldExtractor` etc.
pub use export::{to_csv, to_json};
pub use line_items::LineItemScanner;
pub use ocr::{OcrEngine, OcrPage, RawOcrOutput, ReplayEngine};
pub use pipeline::{ExtractionReport, FieldExtractor};
pub use rules::{ExtractionRule, Occurrence, RuleMatch, RuleSet, Scope};
