//! Numeric normalization of displayed counts and ratings.

use crate::error::NormalizationError;

/// Unit words that may surround a displayed count. Longer forms first so
/// `"ratings"` is not left as `"s"` after stripping `"rating"`.
const COUNT_UNITS: &[&str] = &[
    "Downloads:",
    "Downloads",
    "Subscriptions:",
    "Subscriptions",
    "ratings",
    "rating",
];

const RATING_UNITS: &[&str] = &["star(s)", "stars", "star"];

/// `"12,345 ratings"` -> `12345`.
pub fn count(field: &'static str, raw: &str) -> Result<u64, NormalizationError> {
    let without_separators = raw.replace(',', "");
    let digits = strip_units(without_separators.trim(), COUNT_UNITS);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, raw));
    }
    digits.parse().map_err(|_| invalid(field, raw))
}

/// `"4.50"` -> `4.5`. Only finite, non-negative values are accepted.
pub fn decimal(field: &'static str, raw: &str) -> Result<f64, NormalizationError> {
    let without_separators = raw.replace(',', "");
    let number = strip_units(without_separators.trim(), RATING_UNITS);

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(invalid(field, raw)),
    }
}

fn strip_units<'a>(mut text: &'a str, units: &[&str]) -> &'a str {
    for unit in units {
        if let Some(rest) = text.strip_suffix(unit) {
            text = rest.trim_end();
        }
        if let Some(rest) = text.strip_prefix(unit) {
            text = rest.trim_start();
        }
    }
    text
}

fn invalid(field: &'static str, raw: &str) -> NormalizationError {
    NormalizationError {
        field,
        value: raw.to_string(),
    }
}
