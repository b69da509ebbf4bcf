// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render coordinator: one surface, one queue, every drawing call site.
//
// Page previews and OCR rasterization both go through `RenderCoordinator`, so
// neither can touch the surface while the other is drawing.  Submitting a new
// render of a kind cancels the previous outstanding render of that kind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use fieldscan_core::config::QueueConfig;
use fieldscan_core::error::{FieldscanError, Result};
use fieldscan_core::types::RenderKind;

use crate::queue::{RenderHandle, RenderQueue};
use crate::surface::RenderSurface;

/// Owns the rendering surface and the queue that serializes access to it.
pub struct RenderCoordinator<S: RenderSurface> {
    queue: RenderQueue,
    surface: Arc<tokio::sync::Mutex<S>>,
    outstanding: Mutex<HashMap<RenderKind, CancellationToken>>,
}

impl<S: RenderSurface> RenderCoordinator<S> {
    /// Take ownership of `surface` and start its queue.
    pub fn new(surface: S, config: &QueueConfig) -> Result<Self> {
        Ok(Self {
            queue: RenderQueue::new(config)?,
            surface: Arc::new(tokio::sync::Mutex::new(surface)),
            outstanding: Mutex::new(HashMap::new()),
        })
    }

    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Page count of the surface's document.
    pub async fn page_count(&self) -> u32 {
        self.surface.lock().await.page_count()
    }

    /// Render an on-screen preview of `page`.
    #[instrument(skip(self))]
    pub fn render_preview(&self, page: u32, scale: f32) -> RenderHandle<RgbaImage> {
        self.submit_render(RenderKind::Preview, page, scale)
    }

    /// Rasterize `page` for OCR.
    #[instrument(skip(self))]
    pub fn rasterize(&self, page: u32, scale: f32) -> RenderHandle<RgbaImage> {
        self.submit_render(RenderKind::Rasterize, page, scale)
    }

    fn submit_render(&self, kind: RenderKind, page: u32, scale: f32) -> RenderHandle<RgbaImage> {
        let surface = Arc::clone(&self.surface);
        let handle = self
            .queue
            .submit(format!("{kind} page {page}"), move |token| async move {
                let mut surface = surface.lock().await;
                let geometry = surface.load_page(page)?;

                // Suspension point between decode and draw.
                tokio::task::yield_now().await;
                if token.is_cancelled() {
                    debug!(%kind, page, "render abandoned after page load");
                    return Err(FieldscanError::Cancelled);
                }

                debug!(%kind, page, width = geometry.width, height = geometry.height, "drawing page");
                surface.draw_page(page, scale)
            });

        self.supersede(kind, handle.cancellation_token());
        handle
    }

    /// Record `token` as the outstanding render of `kind`, cancelling the one
    /// it replaces.
    fn supersede(&self, kind: RenderKind, token: CancellationToken) {
        let previous = match self.outstanding.lock() {
            Ok(mut outstanding) => outstanding.insert(kind, token),
            Err(poisoned) => poisoned.into_inner().insert(kind, token),
        };
        if let Some(previous) = previous.filter(|t| !t.is_cancelled()) {
            info!(%kind, "superseding outstanding render");
            previous.cancel();
        }
    }

    /// Let queued renders settle, then stop the queue.
    pub async fn shutdown(self) -> Result<()> {
        self.queue.shutdown().await
    }
}
