// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine seam.
//
// Recognition itself is an external service.  Anything that can turn a
// rasterized page into words/lines/paragraphs plugs in here.

use std::path::Path;

use image::RgbaImage;
use tracing::{debug, instrument};

use fieldscan_core::error::Result;

use super::model::RawOcrOutput;

/// A recognizer that turns a rasterized page into raw OCR output.
pub trait OcrEngine: Send + Sync {
    /// Recognize text on one rasterized page.
    fn recognize(&self, image: &RgbaImage) -> Result<RawOcrOutput>;

    /// Short name for logs (e.g. "tesseract", "replay").
    fn name(&self) -> &str;
}

/// Engine that replays a previously recorded OCR dump, whatever the image.
///
/// Used to run the pipeline offline from a saved recognition result, and in
/// tests.
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    recorded: RawOcrOutput,
}

impl ReplayEngine {
    pub fn new(recorded: RawOcrOutput) -> Self {
        Self { recorded }
    }

    /// Load a recorded dump from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::new(RawOcrOutput::from_json(&raw)?))
    }
}

impl OcrEngine for ReplayEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &RgbaImage) -> Result<RawOcrOutput> {
        debug!("replaying recorded OCR output");
        Ok(self.recorded.clone())
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::model::RawSpan;

    #[test]
    fn replay_returns_recording_for_any_image() {
        let recorded = RawOcrOutput {
            words: Some(vec![RawSpan {
                text: "Total".into(),
                confidence: 91.0,
                bbox: None,
            }]),
            ..Default::default()
        };
        let engine = ReplayEngine::new(recorded.clone());

        let small = RgbaImage::new(4, 4);
        let large = RgbaImage::new(64, 32);
        assert_eq!(engine.recognize(&small).expect("recognize"), recorded);
        assert_eq!(engine.recognize(&large).expect("recognize"), recorded);
        assert_eq!(engine.name(), "replay");
    }
}
