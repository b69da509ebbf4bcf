// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session: rasterize a page through the render queue, recognize it,
// and extract its fields.

use std::sync::Arc;

use tracing::{info, instrument};

use fieldscan_core::config::AppConfig;
use fieldscan_core::error::{FieldscanError, Result};
use fieldscan_extract::{ExtractionReport, FieldExtractor, OcrEngine, OcrPage};
use fieldscan_render::{RenderCoordinator, RenderSurface};

/// Rasterization scale for OCR input; higher than preview for legibility.
pub const OCR_RASTER_SCALE: f32 = 2.0;

/// One open document: its render coordinator plus the field extractor.
pub struct ScanSession<S: RenderSurface> {
    coordinator: RenderCoordinator<S>,
    extractor: FieldExtractor,
}

impl<S: RenderSurface> ScanSession<S> {
    /// Open a session over `surface`.  Must be called within a Tokio runtime.
    pub fn open(surface: S, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            coordinator: RenderCoordinator::new(surface, &config.queue)?,
            extractor: FieldExtractor::new(config.extraction.clone())?,
        })
    }

    pub fn coordinator(&self) -> &RenderCoordinator<S> {
        &self.coordinator
    }

    /// Scan one page with `engine`.
    ///
    /// Scans are meant to run one after another: rasterizations share a
    /// render kind, so starting a scan supersedes an unfinished one.
    #[instrument(skip(self, engine), fields(engine = engine.name()))]
    pub async fn scan_page(&self, page: u32, engine: Arc<dyn OcrEngine>) -> Result<ExtractionReport> {
        let image = self.coordinator.rasterize(page, OCR_RASTER_SCALE).await?;

        // Recognition is CPU-bound; keep it off the async workers.
        let raw = tokio::task::spawn_blocking(move || engine.recognize(&image))
            .await
            .map_err(|e| FieldscanError::OcrEngine(format!("recognizer task: {e}")))??;

        let report = self.extractor.extract_report(&OcrPage::from_raw(raw));
        info!(
            page,
            fields = report.fields.len(),
            line_items = report.line_items.len(),
            "page scanned"
        );
        Ok(report)
    }

    /// Let outstanding renders settle and stop the queue.
    pub async fn close(self) -> Result<()> {
        self.coordinator.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::types::FieldType;
    use fieldscan_extract::ocr::{RawBbox, RawOcrOutput, RawSpan};
    use fieldscan_extract::ReplayEngine;
    use fieldscan_render::BlankSurface;

    fn span(text: &str, y: f64) -> RawSpan {
        RawSpan {
            text: text.into(),
            confidence: 92.0,
            bbox: Some(RawBbox {
                x0: 10.0,
                y0: y,
                x1: 300.0,
                y1: y + 20.0,
            }),
        }
    }

    fn engine(lines: &[(&str, f64)]) -> Arc<dyn OcrEngine> {
        Arc::new(ReplayEngine::new(RawOcrOutput {
            lines: Some(lines.iter().map(|(t, y)| span(t, *y)).collect()),
            ..Default::default()
        }))
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.queue.settle_interval_ms = 1;
        config
    }

    #[tokio::test]
    async fn scan_page_extracts_fields() {
        let session = ScanSession::open(BlankSurface::letter(1), &config()).expect("session");
        let report = session
            .scan_page(1, engine(&[("Invoice Number: INV-77", 20.0), ("Total: $40.00", 400.0)]))
            .await
            .expect("scan");

        let invoice = report
            .fields
            .iter()
            .find(|f| f.field_type == FieldType::InvoiceNumber)
            .expect("invoice number");
        assert_eq!(invoice.value, "INV-77");
        assert_eq!(invoice.bbox.y, 20.0);
        assert!(report.fields.iter().any(|f| f.value == "40.00"));
        session.close().await.expect("close");
    }

    #[tokio::test]
    async fn pages_share_one_queue() {
        let session = ScanSession::open(BlankSurface::letter(2), &config()).expect("session");
        session
            .scan_page(1, engine(&[("Total: $1.00", 0.0)]))
            .await
            .expect("page 1");
        session
            .scan_page(2, engine(&[("Total: $2.00", 0.0)]))
            .await
            .expect("page 2");

        session.coordinator().queue().wait_idle().await;
        assert_eq!(session.coordinator().queue().pending(), 0);
        session.close().await.expect("close");
    }

    #[tokio::test]
    async fn missing_page_is_an_error() {
        let session = ScanSession::open(BlankSurface::letter(1), &config()).expect("session");
        let err = session
            .scan_page(4, engine(&[]))
            .await
            .expect_err("page 4 does not exist");
        assert!(matches!(err, FieldscanError::PageOutOfRange { page: 4, page_count: 1 }));
    }
}
