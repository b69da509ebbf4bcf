// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: joins the render queue, an OCR engine and the extractor
// into operations the CLI can call directly.

pub mod session;
