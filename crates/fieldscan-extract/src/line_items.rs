// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Invoice line items: lines shaped `<description> <amount>`.

use regex::Regex;

use fieldscan_core::error::{FieldscanError, Result};
use fieldscan_core::types::{FieldType, LineItem, TextSpan};

use crate::normalize::normalize_amount;
use crate::ocr::OcrPage;

const ITEM_PATTERN: &str = r"^(.+?)\s+\$?((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})$";

/// Descriptions containing any of these are summary lines, not items.
const SUMMARY_WORDS: &[&str] = &["total", "subtotal", "tax", "amount due"];

const MIN_DESCRIPTION_CHARS: usize = 4;
const MAX_DESCRIPTION_CHARS: usize = 99;

/// Finds line items on a page.
#[derive(Debug, Clone)]
pub struct LineItemScanner {
    pattern: Regex,
}

impl LineItemScanner {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(ITEM_PATTERN).map_err(|e| FieldscanError::InvalidRule {
            field: FieldType::Text,
            reason: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// Every OCR line that reads as an item, in line order.
    pub fn scan(&self, page: &OcrPage) -> Vec<LineItem> {
        page.lines
            .iter()
            .filter_map(|line| {
                let (description, amount) = self.parse(line.text())?;
                Some(LineItem {
                    description,
                    amount,
                    confidence: line.confidence(),
                    bbox: line.bbox().to_rect(),
                })
            })
            .collect()
    }

    fn parse(&self, text: &str) -> Option<(String, String)> {
        let caps = self.pattern.captures(text.trim())?;
        let description = caps.get(1)?.as_str().trim();
        let len = description.chars().count();
        if !(MIN_DESCRIPTION_CHARS..=MAX_DESCRIPTION_CHARS).contains(&len) {
            return None;
        }
        let lower = description.to_lowercase();
        if SUMMARY_WORDS.iter().any(|w| lower.contains(w)) {
            return None;
        }
        let amount = normalize_amount(caps.get(2)?.as_str())?;
        Some((description.to_string(), amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::types::{BoundingBox, OcrLine};

    fn page(lines: &[&str]) -> OcrPage {
        let lines = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let y = i as f64 * 20.0;
                OcrLine::new(*text, 88.0, BoundingBox::new(0.0, y, 300.0, y + 18.0))
            })
            .collect();
        OcrPage {
            lines,
            ..Default::default()
        }
    }

    #[test]
    fn description_and_amount_are_split() {
        let scanner = LineItemScanner::new().expect("pattern");
        let items = scanner.scan(&page(&["Consulting hours $1,200.00", "Travel 85.50"]));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Consulting hours");
        assert_eq!(items[0].amount, "1200.00");
        assert_eq!(items[1].amount, "85.50");
        assert_eq!(items[1].bbox.y, 20.0);
        assert_eq!(items[1].confidence, 88.0);
    }

    #[test]
    fn summary_lines_are_not_items() {
        let scanner = LineItemScanner::new().expect("pattern");
        let items = scanner.scan(&page(&[
            "Subtotal $90.00",
            "Sales Tax $7.20",
            "Total Amount $97.20",
            "Amount Due $97.20",
        ]));
        assert!(items.is_empty());
    }

    #[test]
    fn description_length_is_bounded() {
        let scanner = LineItemScanner::new().expect("pattern");
        let long = format!("{} 10.00", "x".repeat(120));
        let items = scanner.scan(&page(&["Pen 2.00", &long, "Invoice 2024"]));
        assert!(items.is_empty());
    }
}
