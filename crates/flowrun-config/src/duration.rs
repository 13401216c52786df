//! Poll-frequency parsing.
//!
//! Accepts compact durations (`500ms`, `5s`, `2m`, `1h`, bare seconds) and
//! ISO-8601 time durations (`PT10S`, `PT1M30S`, `PT0.5S`).

use std::time::Duration;

use crate::{ConfigError, Result};

/// Parse a duration string.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration {
        value: s.to_string(),
    };

    if s.is_empty() {
        return Err(invalid());
    }

    if let Some(rest) = s.strip_prefix("PT").or_else(|| s.strip_prefix("pt")) {
        return parse_iso(rest).ok_or_else(invalid);
    }

    // Find where the number ends and unit begins
    let num_end = s
        .chars()
        .position(|c| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());

    let (num_str, unit) = s.split_at(num_end);
    let num: f64 = num_str.parse().map_err(|_| invalid())?;

    let seconds = match unit.trim() {
        "ms" => num / 1000.0,
        "" | "s" => num,
        "m" => num * 60.0,
        "h" => num * 3600.0,
        _ => return Err(invalid()),
    };

    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

/// Parse a poll frequency: any duration accepted by [`parse_duration`]
/// except zero.
pub fn parse_poll_frequency(s: &str) -> Result<Duration> {
    let duration = parse_duration(s)?;
    if duration.is_zero() {
        return Err(ConfigError::ZeroPollFrequency {
            value: s.trim().to_string(),
        });
    }
    Ok(duration)
}

/// `1H2M3.5S` (the part after `PT`), each component optional but at least one present.
fn parse_iso(s: &str) -> Option<Duration> {
    let mut seconds = 0.0;
    let mut number = String::new();
    let mut seen_component = false;

    for c in s.chars() {
        match c.to_ascii_uppercase() {
            d if d.is_ascii_digit() || d == '.' => number.push(d),
            unit @ ('H' | 'M' | 'S') => {
                let value: f64 = number.parse().ok()?;
                seconds += match unit {
                    'H' => value * 3600.0,
                    'M' => value * 60.0,
                    _ => value,
                };
                number.clear();
                seen_component = true;
            }
            _ => return None,
        }
    }

    if !number.is_empty() || !seen_component {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(" 10 ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_iso8601() {
        assert_eq!(parse_duration("PT5S").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("PT10S").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("PT1M30S").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("PT1H").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("pt0.5s").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_poll_frequency_rejects_zero() {
        assert_eq!(parse_poll_frequency("PT10S").unwrap(), Duration::from_secs(10));
        for input in ["0s", "0", "PT0S", "0ms"] {
            assert!(
                matches!(parse_poll_frequency(input), Err(ConfigError::ZeroPollFrequency { .. })),
                "{input}"
            );
        }
        assert!(matches!(
            parse_poll_frequency("soon"),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_invalid() {
        for input in [
            "", "abc", "5x", "PT", "PT5", "PTS", "P1D", "-5s", "1..2s", "99999999999999999999999h",
        ] {
            assert!(
                matches!(parse_duration(input), Err(ConfigError::InvalidDuration { .. })),
                "{input}"
            );
        }
    }
}
