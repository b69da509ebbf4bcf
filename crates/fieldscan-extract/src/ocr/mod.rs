// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR result model and the engine seam.

pub mod engine;
pub mod model;

pub use engine::{OcrEngine, ReplayEngine};
pub use model::{OcrPage, RawBbox, RawOcrOutput, RawParagraph, RawSpan};
