// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FieldscanError, Result};

/// Thresholds that govern which candidates survive ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Structured fields resolved below this confidence are omitted.
    pub structured_min_confidence: f64,
    /// Free words must reach this confidence to be reported as `text`.
    pub text_min_confidence: f64,
    /// Confidence given to structured matches found only in unlocalized text.
    pub unlocalized_confidence: f64,
    /// Shortest free word reported as `text`.
    pub text_min_length: usize,
    /// Whether the report includes description/amount line items.
    pub extract_line_items: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            structured_min_confidence: 70.0,
            text_min_confidence: 85.0,
            unlocalized_confidence: 95.0,
            text_min_length: 3,
            extract_line_items: true,
        }
    }
}

/// Render queue tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Pause after each task settles before the next one starts, giving the
    /// rendering surface time to release native resources.
    pub settle_interval_ms: u64,
}

impl QueueConfig {
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            settle_interval_ms: 100,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub queue: QueueConfig,
}

impl AppConfig {
    /// Load settings from a JSON file.  Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| FieldscanError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside the confidence scale.
    pub fn validate(&self) -> Result<()> {
        let ex = &self.extraction;
        for (name, value) in [
            ("structured_min_confidence", ex.structured_min_confidence),
            ("text_min_confidence", ex.text_min_confidence),
            ("unlocalized_confidence", ex.unlocalized_confidence),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(FieldscanError::Config(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = AppConfig::default();
        assert_eq!(config.extraction.structured_min_confidence, 70.0);
        assert_eq!(config.extraction.text_min_confidence, 85.0);
        assert_eq!(config.extraction.unlocalized_confidence, 95.0);
        assert_eq!(config.queue.settle_interval(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"extraction": {{"text_min_confidence": 80}}}}"#).expect("write");

        let config = AppConfig::load(file.path()).expect("load");
        assert_eq!(config.extraction.text_min_confidence, 80.0);
        assert_eq!(config.extraction.structured_min_confidence, 70.0);
        assert_eq!(config.queue.settle_interval_ms, 100);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"extraction": {{"structured_min_confidence": 140}}}}"#).expect("write");

        let err = AppConfig::load(file.path()).expect_err("should reject");
        assert!(matches!(err, FieldscanError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::load("/nonexistent/fieldscan.json").expect_err("missing");
        assert!(matches!(err, FieldscanError::Io(_)));
    }
}
