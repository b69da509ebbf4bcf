// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR result model.
//
// Engines disagree on which collections they emit depending on the page
// segmentation mode: some return words and lines, some nest lines inside
// paragraphs, some return words only.  `OcrPage` is the uniform view the rest
// of the pipeline works on.  Missing collections are empty, never an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use fieldscan_core::error::{FieldscanError, Result};
use fieldscan_core::types::{BoundingBox, OcrLine, OcrWord};

/// Corner-form box exactly as engines emit it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBbox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl From<RawBbox> for BoundingBox {
    fn from(raw: RawBbox) -> Self {
        BoundingBox::new(raw.x0, raw.y0, raw.x1, raw.y1)
    }
}

/// One recognized element (word or line) in raw engine form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
    /// Elements without a box get the placeholder.
    #[serde(default)]
    pub bbox: Option<RawBbox>,
}

/// A paragraph, optionally carrying its own lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParagraph {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub bbox: Option<RawBbox>,
    #[serde(default)]
    pub lines: Option<Vec<RawSpan>>,
}

/// Raw output of one recognition run.  Every collection is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOcrOutput {
    #[serde(default)]
    pub words: Option<Vec<RawSpan>>,
    #[serde(default)]
    pub lines: Option<Vec<RawSpan>>,
    #[serde(default)]
    pub paragraphs: Option<Vec<RawParagraph>>,
}

impl RawOcrOutput {
    /// Parse an engine's JSON dump.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FieldscanError::OcrInput(e.to_string()))
    }
}

/// Normalized view of one recognized page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub words: Vec<OcrWord>,
    pub lines: Vec<OcrLine>,
    /// Lines joined by a single space, in emission order.
    pub full_text: String,
}

impl OcrPage {
    /// Normalize raw engine output.
    ///
    /// When the engine emitted no top-level `lines`, lines nested inside
    /// `paragraphs` are used instead.
    pub fn from_raw(raw: RawOcrOutput) -> Self {
        let words: Vec<OcrWord> = raw
            .words
            .unwrap_or_default()
            .into_iter()
            .map(|span| OcrWord::new(span.text, span.confidence, bbox_or_placeholder(span.bbox)))
            .collect();

        let raw_lines = match raw.lines {
            Some(lines) => lines,
            None => raw
                .paragraphs
                .unwrap_or_default()
                .into_iter()
                .flat_map(|p| p.lines.unwrap_or_default())
                .collect(),
        };

        let lines: Vec<OcrLine> = raw_lines
            .into_iter()
            .map(|span| {
                // Engines terminate line text with '\n'; the join below
                // supplies the separator.
                let text = span.text.trim_end_matches(['\r', '\n']).to_string();
                OcrLine::new(text, span.confidence, bbox_or_placeholder(span.bbox))
            })
            .collect();

        let full_text = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        debug!(
            words = words.len(),
            lines = lines.len(),
            chars = full_text.len(),
            "OCR output normalized"
        );

        Self {
            words,
            lines,
            full_text,
        }
    }

    /// Parse and normalize an engine's JSON dump in one step.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::from_raw(RawOcrOutput::from_json(json)?))
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.lines.is_empty()
    }
}

impl From<RawOcrOutput> for OcrPage {
    fn from(raw: RawOcrOutput) -> Self {
        Self::from_raw(raw)
    }
}

fn bbox_or_placeholder(raw: Option<RawBbox>) -> BoundingBox {
    raw.map(BoundingBox::from).unwrap_or_else(BoundingBox::placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collections_default_to_empty() {
        let page = OcrPage::from_json("{}").expect("parse");
        assert!(page.words.is_empty());
        assert!(page.lines.is_empty());
        assert_eq!(page.full_text, "");
        assert!(page.is_empty());
    }

    #[test]
    fn full_text_joins_lines_with_single_space() {
        let json = r#"{
            "lines": [
                {"text": "ACME Corp\n", "confidence": 92, "bbox": {"x0": 0, "y0": 0, "x1": 90, "y1": 12}},
                {"text": "Invoice Number: INV-7", "confidence": 88, "bbox": {"x0": 0, "y0": 20, "x1": 150, "y1": 32}}
            ]
        }"#;
        let page = OcrPage::from_json(json).expect("parse");
        assert_eq!(page.full_text, "ACME Corp Invoice Number: INV-7");
        assert_eq!(page.lines[1].bbox, BoundingBox::new(0.0, 20.0, 150.0, 32.0));
    }

    #[test]
    fn paragraph_lines_used_when_top_level_lines_missing() {
        let json = r#"{
            "paragraphs": [
                {"text": "a b", "lines": [{"text": "Total: $5.00", "confidence": 90}]},
                {"text": "c", "lines": [{"text": "Thanks", "confidence": 80}]}
            ]
        }"#;
        let page = OcrPage::from_json(json).expect("parse");
        assert_eq!(page.lines.len(), 2);
        assert_eq!(page.full_text, "Total: $5.00 Thanks");
        assert_eq!(page.lines[0].bbox, BoundingBox::placeholder());
    }

    #[test]
    fn top_level_lines_win_over_paragraphs() {
        let json = r#"{
            "lines": [{"text": "only this", "confidence": 90}],
            "paragraphs": [{"lines": [{"text": "not this", "confidence": 90}]}]
        }"#;
        let page = OcrPage::from_json(json).expect("parse");
        assert_eq!(page.full_text, "only this");
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let json = r#"{"words": [{"text": "Hi", "confidence": 140}]}"#;
        let page = OcrPage::from_json(json).expect("parse");
        assert_eq!(page.words[0].confidence, 100.0);
    }

    #[test]
    fn malformed_json_is_ocr_input_error() {
        let err = OcrPage::from_json("{not json").expect_err("should fail");
        assert!(matches!(err, FieldscanError::OcrInput(_)));
    }
}
