// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Fieldscan: OCR spans, field types, candidates and
// the final extracted fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest confidence any OCR span or field may carry.
pub const MIN_CONFIDENCE: f64 = 0.0;

/// Highest confidence any OCR span or field may carry.
pub const MAX_CONFIDENCE: f64 = 100.0;

/// Clamp a confidence value into `[0, 100]`.
///
/// NaN (seen from some engines on empty recognitions) becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_CONFIDENCE;
    }
    value.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Corner-form bounding box in source-image pixels.
///
/// Always well-formed: `x1 >= x0` and `y1 >= y0`.  Construct through
/// [`BoundingBox::new`] so reversed corners get swapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Width of the box used when a match cannot be located on the page.
    pub const PLACEHOLDER_WIDTH: f64 = 100.0;
    /// Height of the box used when a match cannot be located on the page.
    pub const PLACEHOLDER_HEIGHT: f64 = 20.0;

    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// The fixed-size box at the origin assigned to unresolved matches.
    pub fn placeholder() -> Self {
        Self::new(0.0, 0.0, Self::PLACEHOLDER_WIDTH, Self::PLACEHOLDER_HEIGHT)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Convert to the width/height form used in output.
    pub fn to_rect(&self) -> Rect {
        Rect {
            x: self.x0,
            y: self.y0,
            w: self.width(),
            h: self.height(),
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Width/height-form rectangle, as consumed by display and export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Scale into a viewer's coordinate space (e.g. a preview rendered at 1.5x).
    pub fn scaled(&self, zoom: f64) -> Self {
        Self {
            x: self.x * zoom,
            y: self.y * zoom,
            w: self.w * zoom,
            h: self.h * zoom,
        }
    }
}

impl From<BoundingBox> for Rect {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_rect()
    }
}

// ---------------------------------------------------------------------------
// OCR spans
// ---------------------------------------------------------------------------

/// Anything recognized on the page that carries text, a confidence and a box.
///
/// Implemented by both [`OcrWord`] and [`OcrLine`] so the coordinate
/// resolver can treat them uniformly.
pub trait TextSpan {
    fn text(&self) -> &str;
    fn confidence(&self) -> f64;
    fn bbox(&self) -> BoundingBox;
}

/// A single recognized word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    /// Engine confidence, clamped to `[0, 100]`.
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// A contiguous recognized text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    /// Engine confidence, clamped to `[0, 100]`.
    pub confidence: f64,
    pub bbox: BoundingBox,
}

macro_rules! impl_text_span {
    ($ty:ty) => {
        impl $ty {
            pub fn new(text: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
                Self {
                    text: text.into(),
                    confidence: clamp_confidence(confidence),
                    bbox,
                }
            }
        }

        impl TextSpan for $ty {
            fn text(&self) -> &str {
                &self.text
            }

            fn confidence(&self) -> f64 {
                self.confidence
            }

            fn bbox(&self) -> BoundingBox {
                self.bbox
            }
        }
    };
}

impl_text_span!(OcrWord);
impl_text_span!(OcrLine);

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Semantic type of an extracted field.
///
/// Serialized in camelCase (`invoiceNumber`, `dueDate`, ...) to match the
/// JSON consumed by display and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    InvoiceNumber,
    Date,
    DueDate,
    Total,
    Subtotal,
    Tax,
    Vendor,
    Customer,
    /// Unclassified high-confidence token.
    Text,
}

impl FieldType {
    /// Every type except [`FieldType::Text`], in declaration order.
    pub const STRUCTURED: [FieldType; 8] = [
        FieldType::InvoiceNumber,
        FieldType::Date,
        FieldType::DueDate,
        FieldType::Total,
        FieldType::Subtotal,
        FieldType::Tax,
        FieldType::Vendor,
        FieldType::Customer,
    ];

    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Text)
    }

    /// The camelCase tag used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvoiceNumber => "invoiceNumber",
            Self::Date => "date",
            Self::DueDate => "dueDate",
            Self::Total => "total",
            Self::Subtotal => "subtotal",
            Self::Tax => "tax",
            Self::Vendor => "vendor",
            Self::Customer => "customer",
            Self::Text => "text",
        }
    }

    /// Human-readable label shown next to the value.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvoiceNumber => "Invoice Number",
            Self::Date => "Date",
            Self::DueDate => "Due Date",
            Self::Total => "Total",
            Self::Subtotal => "Subtotal",
            Self::Tax => "Tax",
            Self::Vendor => "Vendor",
            Self::Customer => "Customer",
            Self::Text => "Text",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unranked hypothesis produced by one rule match (or one free word).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub field_type: FieldType,
    /// Normalized value (ISO date, plain amount, trimmed text).
    pub value: String,
    /// The text the value was matched in.
    pub raw_source_text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// Declaration index of the producing rule; lower is earlier.
    pub pattern_rank: usize,
}

impl FieldCandidate {
    /// Promote to an output field.
    pub fn into_field(self) -> ExtractedField {
        ExtractedField {
            field_type: self.field_type,
            label: self.field_type.label().to_string(),
            value: self.value,
            raw_source_text: self.raw_source_text,
            confidence: clamp_confidence(self.confidence),
            bbox: self.bbox.to_rect(),
        }
    }
}

/// Final, de-duplicated, ordered output unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub value: String,
    pub raw_source_text: String,
    pub confidence: f64,
    pub bbox: Rect,
}

/// An invoice line: a description followed by an amount on the same line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    /// Normalized amount (`"1250.00"`).
    pub amount: String,
    pub confidence: f64,
    pub bbox: Rect,
}

// ---------------------------------------------------------------------------
// Render queue
// ---------------------------------------------------------------------------

/// Unique identifier for a submitted render task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderTaskId(pub Uuid);

impl RenderTaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RenderTaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RenderTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the render queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueState {
    /// No task executing; the queue itself may or may not be empty.
    Idle,
    /// Exactly one task executing.
    Running,
}

/// Which kind of canvas work a render task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderKind {
    /// On-screen page preview.
    Preview,
    /// Page-to-image conversion feeding OCR.
    Rasterize,
}

impl std::fmt::Display for RenderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preview => f.write_str("preview"),
            Self::Rasterize => f.write_str("rasterize"),
        }
    }
}
