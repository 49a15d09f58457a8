//! Game-clock parsing.
//!
//! Providers report the period clock as seconds remaining, as `MM:SS` /
//! `MM:SS.ff`, or as an ISO-8601 duration (`PT11M32.00S`). All forms are
//! normalized to seconds remaining in the period.

use serde_json::Value;

/// Parse a clock field into seconds remaining in the period.
pub fn parse_clock_value(value: &Value) -> Result<f64, String> {
    let seconds = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("Clock value {} is not representable", n))?,
        Value::String(s) => parse_clock_str(s)?,
        Value::Null => return Err("Clock value is missing".to_string()),
        other => return Err(format!("Unsupported clock value: {}", other)),
    };
    check_seconds(seconds)
}

/// Parse a textual clock into seconds remaining in the period.
pub fn parse_clock_str(raw: &str) -> Result<f64, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("Clock value is empty".to_string());
    }

    let seconds = if let Some(rest) = s.strip_prefix("PT").or_else(|| s.strip_prefix("pt")) {
        parse_iso_duration(rest).map_err(|e| format!("Invalid ISO clock '{}': {}", raw, e))?
    } else if s.contains(':') {
        parse_minutes_seconds(s).map_err(|e| format!("Invalid clock '{}': {}", raw, e))?
    } else {
        s.parse::<f64>()
            .map_err(|_| format!("Invalid clock '{}'", raw))?
    };

    check_seconds(seconds)
}

fn check_seconds(seconds: f64) -> Result<f64, String> {
    if !seconds.is_finite() {
        return Err(format!("Clock value {} is not finite", seconds));
    }
    if seconds < 0.0 {
        return Err(format!("Clock value {} is negative", seconds));
    }
    Ok(seconds)
}

fn parse_minutes_seconds(s: &str) -> Result<f64, String> {
    let mut parts = s.split(':');
    let minutes = parts.next().unwrap_or_default();
    let seconds = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err("expected MM:SS".to_string());
    }
    if minutes.trim().is_empty() {
        return Err("missing minutes before ':'".to_string());
    }
    if seconds.trim().is_empty() {
        return Err("missing seconds after ':'".to_string());
    }
    let minutes: u32 = minutes
        .trim()
        .parse()
        .map_err(|_| format!("bad minutes '{}'", minutes))?;
    let seconds: f64 = seconds
        .trim()
        .parse()
        .map_err(|_| format!("bad seconds '{}'", seconds))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(format!("seconds {} out of range", seconds));
    }
    Ok(minutes as f64 * 60.0 + seconds)
}

fn parse_iso_duration(rest: &str) -> Result<f64, String> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut seen_unit = false;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            '0'..='9' | '.' => number.push(c),
            unit @ ('H' | 'M' | 'S') => {
                let value: f64 = number
                    .parse()
                    .map_err(|_| format!("bad number before '{}'", unit))?;
                total += match unit {
                    'H' => value * 3600.0,
                    'M' => value * 60.0,
                    _ => value,
                };
                number.clear();
                seen_unit = true;
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    if !number.is_empty() || !seen_unit {
        return Err("missing unit designator".to_string());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minutes_seconds() {
        assert_eq!(parse_clock_str("11:32").unwrap(), 692.0);
        assert!((parse_clock_str("0:04.5").unwrap() - 4.5).abs() < 1e-12);
        assert_eq!(parse_clock_str("20:00").unwrap(), 1200.0);
    }

    #[test]
    fn test_parse_iso_duration() {
        assert!((parse_clock_str("PT11M32.00S").unwrap() - 692.0).abs() < 1e-9);
        assert!((parse_clock_str("PT00M04.30S").unwrap() - 4.3).abs() < 1e-9);
        assert_eq!(parse_clock_str("PT45S").unwrap(), 45.0);
    }

    #[test]
    fn test_parse_numeric_values() {
        assert_eq!(parse_clock_value(&json!(431.5)).unwrap(), 431.5);
        assert_eq!(parse_clock_value(&json!("431")).unwrap(), 431.0);
    }

    #[test]
    fn test_malformed_clocks_are_rejected() {
        assert!(parse_clock_str("").is_err());
        assert!(parse_clock_str("12:75").is_err());
        assert!(parse_clock_str("1:2:3").is_err());
        assert!(parse_clock_str("PT11X").is_err());
        assert!(parse_clock_str("PT11").is_err());
        assert!(parse_clock_str("abc").is_err());
        assert!(parse_clock_value(&json!(-3.0)).is_err());
        assert!(parse_clock_value(&Value::Null).is_err());
        assert!(parse_clock_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_half_written_clocks_name_the_missing_part() {
        let err = parse_clock_str("12:").unwrap_err();
        assert_eq!(err, "Invalid clock '12:': missing seconds after ':'");
        let err = parse_clock_str(":30").unwrap_err();
        assert!(err.ends_with("missing minutes before ':'"));
    }
}
