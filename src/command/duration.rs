//! Interval strings for `agg`.
//!
//! Accepts one or more `<number><unit>` groups, e.g. `30s`, `1m`, `1h30m`,
//! `1.5s`, `250ms`. Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.

use std::time::Duration;

use crate::{GatorError, Result};

const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

fn invalid(input: &str) -> GatorError {
    GatorError::Validation(format!("invalid interval {input:?} (try 30s, 1m or 1h30m)"))
}

fn unit_nanos(unit: &str) -> Option<f64> {
    UNITS.iter().find(|(u, _)| *u == unit).map(|(_, n)| *n)
}

/// Parse an interval. Zero and negative intervals are rejected.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.starts_with('-') {
        return Err(GatorError::Validation(format!(
            "interval must be positive, got {input:?}"
        )));
    }
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest.is_empty() {
        return Err(invalid(input));
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(num_len);
        if number.is_empty() || number == "." {
            return Err(invalid(input));
        }
        let value: f64 = number.parse().map_err(|_| invalid(input))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let nanos = unit_nanos(unit).ok_or_else(|| invalid(input))?;

        total_nanos += value * nanos;
        rest = tail;
    }

    if total_nanos < 1.0 {
        return Err(GatorError::Validation(format!(
            "interval must be positive, got {input:?}"
        )));
    }
    if total_nanos > u64::MAX as f64 {
        return Err(invalid(input));
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
