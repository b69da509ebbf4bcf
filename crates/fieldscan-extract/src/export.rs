// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON and CSV payloads for extracted fields.

use std::fmt::Write as _;

use fieldscan_core::error::Result;
use fieldscan_core::types::ExtractedField;

const CSV_HEADER: &str = "type,label,value,confidence,x,y,w,h";

/// Pretty-printed JSON array of fields.
pub fn to_json(fields: &[ExtractedField]) -> Result<String> {
    Ok(serde_json::to_string_pretty(fields)?)
}

/// CSV with a header row and one row per field.  Lines end in CRLF.
pub fn to_csv(fields: &[ExtractedField]) -> String {
    let mut out = String::with_capacity(64 * (fields.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for f in fields {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{},{},{},{},{},{},{},{}\r\n",
            f.field_type,
            csv_escape(&f.label),
            csv_escape(&f.value),
            f.confidence,
            f.bbox.x,
            f.bbox.y,
            f.bbox.w,
            f.bbox.h,
        );
    }
    out
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::types::{FieldType, Rect};

    fn vendor(value: &str) -> ExtractedField {
        ExtractedField {
            field_type: FieldType::Vendor,
            label: FieldType::Vendor.label().into(),
            value: value.into(),
            raw_source_text: format!("From: {value}"),
            confidence: 91.5,
            bbox: Rect {
                x: 10.0,
                y: 20.0,
                w: 190.0,
                h: 20.0,
            },
        }
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let csv = to_csv(&[vendor("Acme"), vendor("Acme, \"West\" Inc")]);
        let rows: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(rows[0], CSV_HEADER);
        assert_eq!(rows[1], "vendor,Vendor,Acme,91.5,10,20,190,20");
        assert_eq!(rows[2], "vendor,Vendor,\"Acme, \"\"West\"\" Inc\",91.5,10,20,190,20");
        assert_eq!(rows[3], "");
    }

    #[test]
    fn json_uses_wire_names() {
        let json = to_json(&[vendor("Acme")]).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");

        assert_eq!(value[0]["type"], "vendor");
        assert_eq!(value[0]["rawSourceText"], "From: Acme");
        assert_eq!(value[0]["bbox"]["w"], 190.0);
    }

    #[test]
    fn empty_list_is_header_only() {
        assert_eq!(to_csv(&[]), format!("{CSV_HEADER}\r\n"));
        assert_eq!(to_json(&[]).expect("serialize"), "[]");
    }
}
