// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Fieldscan.

use thiserror::Error;

use crate::types::FieldType;

/// Top-level error type for all Fieldscan operations.
///
/// Missing OCR data and rules that simply do not match are not errors; the
/// extraction pipeline absorbs them into "field not found".
#[derive(Debug, Error)]
pub enum FieldscanError {
    // -- Extraction --
    #[error("invalid extraction rule for {field}: {reason}")]
    InvalidRule { field: FieldType, reason: String },

    #[error("malformed OCR input: {0}")]
    OcrInput(String),

    #[error("OCR engine failed: {0}")]
    OcrEngine(String),

    // -- Rendering --
    #[error("render failed: {0}")]
    RenderFailed(String),

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// The submitter superseded or withdrew the task.  An expected outcome.
    #[error("render task cancelled")]
    Cancelled,

    #[error("render queue is shut down")]
    QueueClosed,

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FieldscanError {
    /// Whether this is the expected cancellation outcome rather than a fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FieldscanError>;
