// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering surface seam.
//
// A surface is the single mutable canvas that page previews and OCR
// rasterization both draw on.  Drawing happens in two stages, load then draw,
// so a cancelled task can stop between them.

use image::{Rgba, RgbaImage};
use tracing::debug;

use fieldscan_core::error::{FieldscanError, Result};

/// Size of a loaded page at scale 1.0, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
}

/// Longest canvas side a draw may produce, in pixels.
pub const MAX_CANVAS_SIDE: u32 = 16_384;

impl PageGeometry {
    /// Pixel size at `scale`; never smaller than 1x1.
    ///
    /// # Errors
    ///
    /// [`FieldscanError::RenderFailed`] when either side would exceed
    /// [`MAX_CANVAS_SIDE`].
    pub fn scaled(&self, scale: f32) -> Result<(u32, u32)> {
        let side = |len: u32| -> Result<u32> {
            let px = (f64::from(len) * f64::from(scale)).round().max(1.0);
            if px > f64::from(MAX_CANVAS_SIDE) {
                return Err(FieldscanError::RenderFailed(format!(
                    "canvas side {px} exceeds {MAX_CANVAS_SIDE}px at scale {scale}"
                )));
            }
            Ok(px as u32)
        };
        Ok((side(self.width)?, side(self.height)?))
    }
}

/// Something that can turn document pages into pixels.
///
/// Implementations are not expected to be reentrant; the render queue
/// guarantees only one task uses the surface at a time.
pub trait RenderSurface: Send + 'static {
    /// Number of pages in the open document.
    fn page_count(&self) -> u32;

    /// Decode page `page` (1-based) and prepare it for drawing.
    fn load_page(&mut self, page: u32) -> Result<PageGeometry>;

    /// Draw the loaded page at `scale`.
    fn draw_page(&mut self, page: u32, scale: f32) -> Result<RgbaImage>;
}

/// Surface that renders every page as a blank white canvas.
///
/// Stands in for a real document renderer when the page content comes from
/// elsewhere, e.g. a recorded OCR dump.
#[derive(Debug, Clone)]
pub struct BlankSurface {
    page_count: u32,
    geometry: PageGeometry,
    loaded: Option<u32>,
}

impl BlankSurface {
    /// US Letter at 72 dpi.
    pub const LETTER: PageGeometry = PageGeometry {
        width: 612,
        height: 792,
    };

    pub fn new(page_count: u32, geometry: PageGeometry) -> Self {
        Self {
            page_count,
            geometry,
            loaded: None,
        }
    }

    pub fn letter(page_count: u32) -> Self {
        Self::new(page_count, Self::LETTER)
    }
}

impl RenderSurface for BlankSurface {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn load_page(&mut self, page: u32) -> Result<PageGeometry> {
        if page == 0 || page > self.page_count {
            return Err(FieldscanError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        self.loaded = Some(page);
        Ok(self.geometry)
    }

    fn draw_page(&mut self, page: u32, scale: f32) -> Result<RgbaImage> {
        if self.loaded != Some(page) {
            return Err(FieldscanError::RenderFailed(format!("page {page} is not loaded")));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(FieldscanError::RenderFailed(format!("invalid scale {scale}")));
        }
        let (w, h) = self.geometry.scaled(scale)?;
        debug!(page, w, h, "drawing blank page");
        Ok(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
    }
}
