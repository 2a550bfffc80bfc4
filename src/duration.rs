//! Lifetime normalization
//!
//! Runtime half of the deferred `default_lifetime` wrapper: turns `300`,
//! `"300"` or `"5 minutes"` into a number of seconds.

use std::time::Duration;

use thiserror::Error;

use crate::domain::Value;

#[derive(Debug, Error, PartialEq)]
pub enum DurationError {
    #[error("Invalid duration '{0}': {1}")]
    Invalid(String, String),

    #[error("Duration must be a number or a string, got {0}")]
    UnsupportedValue(String),

    #[error("Duration must not be negative: {0}")]
    Negative(String),
}

/// Normalizes a lifetime value to seconds
pub fn normalize(value: &Value) -> Result<u64, DurationError> {
    match value {
        Value::Int(i) => u64::try_from(*i).map_err(|_| DurationError::Negative(i.to_string())),
        Value::Float(f) if *f < 0.0 => Err(DurationError::Negative(f.to_string())),
        Value::Float(f) => Ok(f.trunc() as u64),
        Value::String(s) => normalize_str(s),
        other => Err(DurationError::UnsupportedValue(format!("{:?}", other))),
    }
}

/// Normalizes a human-readable expression such as `"1 hour 30 minutes"`
pub fn normalize_str(expr: &str) -> Result<u64, DurationError> {
    let trimmed = expr.trim();

    if let Ok(seconds) = trimmed.parse::<i64>() {
        return normalize(&Value::Int(seconds));
    }
    if let Ok(seconds) = trimmed.parse::<f64>() {
        return normalize(&Value::Float(seconds));
    }

    parse_human(trimmed).map(|d| d.as_secs())
}

fn parse_human(expr: &str) -> Result<Duration, DurationError> {
    let expr = expr.strip_prefix('+').unwrap_or(expr);

    // "5 minutes" -> "5minutes"; unit words stay separated from the next number
    let mut compact = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            let prev_digit = compact.chars().last().is_some_and(|p| p.is_ascii_digit());
            let next_alpha = chars.peek().is_some_and(|n| n.is_alphabetic());
            if prev_digit && next_alpha {
                continue;
            }
            if !compact.ends_with(' ') {
                compact.push(' ');
            }
        } else {
            compact.push(c);
        }
    }

    humantime::parse_duration(compact.trim())
        .map_err(|e| DurationError::Invalid(expr.to_string(), e.to_string()))
}
