// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fieldscan-render: Single-flight rendering for Fieldscan.
//
// All drawing onto the shared rendering surface (page previews and OCR
// rasterization) goes through one `RenderQueue`, which runs at most one task
// at a time in submission order.  `RenderCoordinator` owns the surface and
// the queue together.

pub mod coordinator;
pub mod queue;
pub mod surface;

pub use coordinator::RenderCoordinator;
pub use queue::{QueueSnapshot, RenderHandle, RenderQueue};
pub use surface::{BlankSurface, PageGeometry, RenderSurface};
