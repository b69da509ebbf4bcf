// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Value normalization applied to a rule's captured text before it becomes a
// candidate.  A normalizer returning `None` vetoes the match.

use chrono::NaiveDate;

/// Longest vendor/customer name kept; anything longer is OCR run-on.
const MAX_NAME_LEN: usize = 80;

/// Words that make a "name" an identifier field, as in "Customer ID: 12345".
const ID_LABELS: &[&str] = &["id", "no", "num", "number", "acct", "account", "ref"];

/// How a captured value is cleaned up and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Document identifiers; must contain a digit.
    Identifier,
    /// Calendar dates, emitted as ISO `YYYY-MM-DD`.
    Date,
    /// Currency amounts, emitted as plain decimals with two places.
    Amount,
    /// Party names taken from the rest of a labeled line.
    Name,
    /// Email addresses.
    Email,
}

impl Normalizer {
    pub fn apply(&self, raw: &str) -> Option<String> {
        match self {
            Self::Identifier => normalize_identifier(raw),
            Self::Date => normalize_date(raw),
            Self::Amount => normalize_amount(raw),
            Self::Name => normalize_name(raw),
            Self::Email => normalize_email(raw),
        }
    }
}

fn normalize_identifier(raw: &str) -> Option<String> {
    let id = raw.trim().trim_end_matches(['-', '/', '.']);
    if id.len() < 2 || !id.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(id.to_string())
}

/// `"$1,250.00"` → `"1250.00"`, `"42"` → `"42.00"`, `"3.5"` → `"3.50"`.
pub fn normalize_amount(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c.is_whitespace())
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    let (int_part, frac_part) = match cleaned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (cleaned.as_str(), ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
        || frac_part.len() > 2
    {
        return None;
    }

    let int_part = int_part.trim_start_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    Some(format!("{int_part}.{frac_part:0<2}"))
}

/// Numeric value of a normalized amount, for comparisons only.
pub fn amount_value(normalized: &str) -> Option<f64> {
    normalized.parse().ok()
}

/// Parse a captured date literal into ISO form.
///
/// Numeric dates are read month-first, falling back to day-first when the
/// month-first reading is impossible (e.g. `25/12/2024`).
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let first = raw.chars().next()?;
    let date = if first.is_ascii_alphabetic() {
        parse_month_name_date(raw)?
    } else {
        parse_numeric_date(raw)?
    };
    Some(date.format("%Y-%m-%d").to_string())
}

fn parse_numeric_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split(['/', '-', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };

    if a.len() == 4 {
        let (y, m, d) = (a.parse().ok()?, b.parse().ok()?, c.parse().ok()?);
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    let first: u32 = a.parse().ok()?;
    let second: u32 = b.parse().ok()?;
    let year = expand_year(c)?;
    NaiveDate::from_ymd_opt(year, first, second)
        .or_else(|| NaiveDate::from_ymd_opt(year, second, first))
}

fn parse_month_name_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.replace([',', '.'], " ");
    let mut tokens = cleaned.split_whitespace();
    let month = month_number(tokens.next()?)?;
    let day: u32 = tokens.next()?.parse().ok()?;
    let year = expand_year(tokens.next()?)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        2 => Some(2000 + year),
        4 => Some(year),
        _ => None,
    }
}

fn month_number(token: &str) -> Option<u32> {
    let lower = token.to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn normalize_name(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let name = collapsed.trim_matches(|c: char| matches!(c, ',' | ':' | ';' | '-' | '.' | ' '));
    if name.is_empty() || name.len() > MAX_NAME_LEN || !name.chars().any(char::is_alphabetic) {
        return None;
    }
    if is_identifier_label(name) {
        return None;
    }
    Some(name.to_string())
}

/// `"ID: 12345"`, `"# 778"`, `"No. A-19"`: a label followed by a number.
fn is_identifier_label(name: &str) -> bool {
    let head = name.split(' ').next().unwrap_or(name);
    let label = head.trim_end_matches([':', '.', '#']).to_ascii_lowercase();
    let labelled = head.starts_with('#') || ID_LABELS.contains(&label.as_str());
    labelled && name.chars().any(|c| c.is_ascii_digit())
}

fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().trim_end_matches('.');
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || !domain.contains('.') {
        return None;
    }
    Some(email.to_string())
}
