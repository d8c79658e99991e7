//! Shared utilities for the type conversion pipeline.
//!
//! This module contains the token tables and number parsing/formatting
//! helpers used by the loaders, the detectors and the serializer, so that
//! every stage agrees on what counts as missing, numeric or boolean.

use half::f16;

// =============================================================================
// Token Tables
// =============================================================================

/// Field values the loaders treat as missing.
pub const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Spellings the loaders accept as boolean `true`.
pub const TRUE_TOKENS: [&str; 3] = ["True", "TRUE", "true"];

/// Spellings the loaders accept as boolean `false`.
pub const FALSE_TOKENS: [&str; 3] = ["False", "FALSE", "false"];

/// Check if a raw field is a missing-value marker.
///
/// Matching is exact: `" NA "` is a value, `"NA"` is missing.
pub fn is_missing_marker(s: &str) -> bool {
    MISSING_MARKERS.contains(&s)
}

/// Parse a load-time boolean token.
pub fn parse_bool_token(s: &str) -> Option<bool> {
    if TRUE_TOKENS.contains(&s) {
        Some(true)
    } else if FALSE_TOKENS.contains(&s) {
        Some(false)
    } else {
        None
    }
}

// =============================================================================
// Number Parsing
// =============================================================================

/// Try to parse a string as a signed 64-bit integer.
pub fn parse_integer(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

/// Try to parse a string as a float. NaN is treated as unparseable.
pub fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Whether a float holds an integral value that fits in `i64`.
pub fn is_integral(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64
}

// =============================================================================
// Number Formatting
// =============================================================================

/// Format a float the way the CSV output expects.
///
/// Integral values keep a trailing `.0`, exponents carry an explicit sign
/// and at least two digits (`1e+20`, `1e-07`).
pub fn format_float(v: f64) -> String {
    if let Some(special) = special_float(v) {
        return special.to_string();
    }
    normalize_exponent(format!("{v:?}"))
}

/// Format a float held at single precision.
pub fn format_f32(v: f32) -> String {
    if let Some(special) = special_float(v as f64) {
        return special.to_string();
    }
    normalize_exponent(format!("{v:?}"))
}

/// Format a float held at half precision using its shortest round-trip form.
pub fn format_f16(v: f16) -> String {
    let wide = v.to_f32();
    if let Some(special) = special_float(wide as f64) {
        return special.to_string();
    }

    let mut text = format!("{wide:?}");
    for precision in 0..=8 {
        let candidate = format!("{wide:.precision$}");
        if candidate.parse::<f32>().map(f16::from_f32) == Ok(v) {
            text = candidate;
            break;
        }
    }

    if !text.contains(['.', 'e']) {
        text.push_str(".0");
    }
    text
}

fn special_float(v: f64) -> Option<&'static str> {
    if v.is_nan() {
        Some("nan")
    } else if v == f64::INFINITY {
        Some("inf")
    } else if v == f64::NEG_INFINITY {
        Some("-inf")
    } else {
        None
    }
}

/// Rewrite `1e20` / `1.5e-7` as `1e+20` / `1.5e-07`.
fn normalize_exponent(text: String) -> String {
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
