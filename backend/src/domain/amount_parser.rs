//! Amount parsing and currency formatting.
//!
//! Users type amounts the way they are used to: Brazilian users write `1.234,56`,
//! others write `1,234.56`. Neither form requires picking a locale first; the
//! parser works out which separator is the decimal point from the input itself.
//!
//! ## Rules
//!
//! - Whitespace anywhere in the input is ignored
//! - Only digits, `,`, `.` and `-` are accepted
//! - When both `,` and `.` appear, whichever comes last is the decimal point and
//!   the other one is a thousands separator
//! - A lone `,` is the decimal point
//! - Anything else goes through standard decimal parsing
//! - Negative results are rejected with their own error variant so callers can
//!   tell "not a number" apart from "a number we don't accept"

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,
    #[error("unexpected character '{0}' in amount")]
    InvalidCharacter(char),
    #[error("'{0}' is not a valid number")]
    NotANumber(String),
    #[error("amount {0} is negative")]
    Negative(f64),
}

/// Parse a user-typed amount into a non-negative number
pub fn parse_amount(raw: &str) -> Result<f64, AmountParseError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(AmountParseError::Empty);
    }

    if let Some(invalid) = cleaned
        .chars()
        .find(|c| !(c.is_ascii_digit() || matches!(c, ',' | '.' | '-')))
    {
        return Err(AmountParseError::InvalidCharacter(invalid));
    }

    let normalized = normalize_separators(&cleaned);

    let value = normalized
        .parse::<f64>()
        .map_err(|_| AmountParseError::NotANumber(raw.trim().to_string()))?;

    if !value.is_finite() {
        return Err(AmountParseError::NotANumber(raw.trim().to_string()));
    }

    if value < 0.0 {
        return Err(AmountParseError::Negative(value));
    }

    // -0 parses fine but should never be stored as such
    Ok(value + 0.0)
}

/// Rewrite the input so that `.` is the only decimal point and no thousands
/// separators remain
fn normalize_separators(cleaned: &str) -> String {
    match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned.to_string(),
    }
}

/// Format a value as Brazilian reais, e.g. `R$ 1.234,56`
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = cents / 100;
    let fraction = cents % 100;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, fraction)
}
