//! `xsd:duration` codec for the `rate` feature.
//!
//! Only the day/time subset (`PnDTnHnMnS`) is supported; year and month
//! components have no fixed length and are rejected. Fractional values are
//! allowed on the seconds component only, with millisecond precision.

use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Error parsing an `xsd:duration` lexical form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    /// Value does not follow the `PnDTnHnMnS` shape.
    #[error("malformed duration `{0}`")]
    Malformed(String),
    /// Negative durations are meaningless as a rate.
    #[error("negative durations are not allowed")]
    Negative,
    /// Year/month components are calendar dependent.
    #[error("year and month components are not supported")]
    CalendarComponent,
    /// Value does not fit in a `Duration`.
    #[error("duration out of range")]
    Overflow,
}

/// Parse an `xsd:duration` such as `PT10S` or `P1DT2H`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let malformed = || DurationError::Malformed(input.to_string());

    if input.starts_with('-') {
        return Err(DurationError::Negative);
    }
    let body = input.strip_prefix('P').ok_or_else(malformed)?;
    if body.is_empty() {
        return Err(malformed());
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((_, "")) => return Err(malformed()),
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut total_ms: u64 = 0;

    let mut seen_days = false;
    for (number, designator) in components(date_part).ok_or_else(malformed)? {
        match designator {
            'D' if !seen_days => {
                seen_days = true;
                let days = parse_whole(number).ok_or_else(malformed)?;
                accumulate(&mut total_ms, days, SECS_PER_DAY * 1000)?;
            }
            'Y' | 'M' => return Err(DurationError::CalendarComponent),
            _ => return Err(malformed()),
        }
    }

    if let Some(time) = time_part {
        // Each of H, M and S at most once, in that order
        let mut last_rank = 0;
        for (number, designator) in components(time).ok_or_else(malformed)? {
            let (rank, value, unit_ms) = match designator {
                'H' => (1, parse_whole(number), SECS_PER_HOUR * 1000),
                'M' => (2, parse_whole(number), SECS_PER_MINUTE * 1000),
                'S' => (3, parse_seconds_ms(number), 1),
                _ => return Err(malformed()),
            };
            if rank <= last_rank {
                return Err(malformed());
            }
            last_rank = rank;
            accumulate(&mut total_ms, value.ok_or_else(malformed)?, unit_ms)?;
        }
    }

    Ok(Duration::from_millis(total_ms))
}

/// Format a duration in canonical `PnDTnHnMnS` form.
///
/// Sub-millisecond precision is truncated. Zero is `PT0S`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis() as u64;
    if total_ms == 0 {
        return "PT0S".to_string();
    }

    let mut secs = total_ms / 1000;
    let millis = total_ms % 1000;
    let days = secs / SECS_PER_DAY;
    secs %= SECS_PER_DAY;
    let hours = secs / SECS_PER_HOUR;
    secs %= SECS_PER_HOUR;
    let minutes = secs / SECS_PER_MINUTE;
    secs %= SECS_PER_MINUTE;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || secs > 0 || millis > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if millis > 0 {
            out.push_str(&format!("{secs}.{millis:03}S"));
        } else if secs > 0 {
            out.push_str(&format!("{secs}S"));
        }
    }
    out
}

fn accumulate(total_ms: &mut u64, value: u64, unit_ms: u64) -> Result<(), DurationError> {
    let ms = value.checked_mul(unit_ms).ok_or(DurationError::Overflow)?;
    *total_ms = total_ms.checked_add(ms).ok_or(DurationError::Overflow)?;
    Ok(())
}

/// Split `12H3M` into `[("12", 'H'), ("3", 'M')]`.
fn components(part: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in part.char_indices() {
        if ch.is_ascii_alphabetic() {
            if idx == start {
                return None;
            }
            out.push((&part[start..idx], ch));
            start = idx + ch.len_utf8();
        }
    }
    if start != part.len() {
        return None;
    }
    Some(out)
}

fn parse_whole(number: &str) -> Option<u64> {
    if number.bytes().all(|b| b.is_ascii_digit()) {
        number.parse().ok()
    } else {
        None
    }
}

fn parse_seconds_ms(number: &str) -> Option<u64> {
    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => (w, f),
        Some(_) => return None,
        None => (number, ""),
    };
    let whole = parse_whole(whole)?;
    let mut millis: u64 = 0;
    for (i, digit) in fraction.bytes().take(3).enumerate() {
        millis += u64::from(digit - b'0') * 10u64.pow(2 - i as u32);
    }
    whole.checked_mul(1000)?.checked_add(millis)
}
