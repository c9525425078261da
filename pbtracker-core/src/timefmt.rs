//! Time and date string handling for best known times.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static SECONDS_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("Invalid seconds regex"));

/// Largest accepted time in hundredths; below this every value is exact in an f64.
const MAX_HUNDREDTHS: u64 = 1 << 53;

fn to_hundredths(seconds: f64) -> u64 {
    (seconds * 100.0).round() as u64
}

/// Parse `[[H:]M:]S[.ff]` into seconds rounded to hundredths.
///
/// Minutes and seconds must be below 60 whenever a larger unit precedes them.
/// A zero time is rejected.
pub fn timestr_to_seconds(timestr: &str) -> Result<f64, String> {
    let trimmed = timestr.trim();
    if trimmed.is_empty() {
        return Err("no time given".to_string());
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err("too many colons".to_string());
    }

    let (last, leading) = match parts.split_last() {
        Some(split) => split,
        None => return Err("bad format".to_string()),
    };
    if !SECONDS_COMPONENT.is_match(last) {
        return Err("bad format".to_string());
    }
    let secs: f64 = last.parse().map_err(|_| "bad format".to_string())?;
    if !leading.is_empty() && secs >= 60.0 {
        return Err("seconds must be less than 60".to_string());
    }

    let mut whole: Vec<u64> = Vec::with_capacity(leading.len());
    for part in leading {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err("bad format".to_string());
        }
        whole.push(part.parse().map_err(|_| "bad format".to_string())?);
    }

    let (hours, minutes) = match whole.as_slice() {
        [] => (0, 0),
        [m] => (0, *m),
        [h, m] => {
            if *m >= 60 {
                return Err("minutes must be less than 60".to_string());
            }
            (*h, *m)
        }
        _ => return Err("too many colons".to_string()),
    };

    let whole_secs = hours
        .checked_mul(3600)
        .zip(minutes.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m))
        .ok_or_else(|| "time too large".to_string())?;
    let total = whole_secs as f64 + secs;
    if total * 100.0 >= MAX_HUNDREDTHS as f64 {
        return Err("time too large".to_string());
    }
    let hundredths = to_hundredths(total);
    if hundredths == 0 {
        return Err("time must be greater than zero".to_string());
    }
    Ok(hundredths as f64 / 100.0)
}

/// Render seconds as `H:MM:SS` (or `M:SS` under an hour), with `.ff` only
/// when there is a fractional part.
pub fn seconds_to_timestr(seconds: f64) -> String {
    let hundredths = to_hundredths(seconds.max(0.0));
    let frac = hundredths % 100;
    let total_secs = hundredths / 100;
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let secs = total_secs % 60;

    let mut out = if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    };
    if frac > 0 {
        out.push_str(&format!(".{:02}", frac));
    }
    out
}

/// Parse an `MM/DD/YYYY` date. An empty string means no date.
pub fn datestr_to_date(datestr: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = datestr.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y")
        .map(Some)
        .map_err(|_| format!("'{}' is not a valid MM/DD/YYYY date", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!(timestr_to_seconds("59").unwrap(), 59.0);
        assert_eq!(timestr_to_seconds("1:05").unwrap(), 65.0);
        assert_eq!(timestr_to_seconds("1:02:03").unwrap(), 3723.0);
        assert_eq!(timestr_to_seconds("0:42.5").unwrap(), 42.5);
        assert_eq!(timestr_to_seconds(" 12:00.257 ").unwrap(), 720.26);
        assert_eq!(timestr_to_seconds("90").unwrap(), 90.0);
        assert_eq!(timestr_to_seconds("75:00").unwrap(), 4500.0);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(timestr_to_seconds("").is_err());
        assert!(timestr_to_seconds("abc").is_err());
        assert!(timestr_to_seconds("1:2:3:4").is_err());
        assert!(timestr_to_seconds("1:60").is_err());
        assert!(timestr_to_seconds("1:60:00").is_err());
        assert!(timestr_to_seconds(":30").is_err());
        assert!(timestr_to_seconds("-5").is_err());
        assert!(timestr_to_seconds("0:00").is_err());
        assert!(timestr_to_seconds("1.").is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_components() {
        let too_large = Err("time too large".to_string());
        assert_eq!(timestr_to_seconds("9999999999999999999:00:00"), too_large);
        assert_eq!(timestr_to_seconds("999999999999999999:00"), too_large);
        assert_eq!(timestr_to_seconds("5124095576030431:00:00"), too_large);
        assert_eq!(timestr_to_seconds("99999999999999999999999"), too_large);
        assert!(timestr_to_seconds("99999999999999999999:00").is_err());
        assert_eq!(timestr_to_seconds("1000000:00:00").unwrap(), 3_600_000_000.0);
    }

    #[test]
    fn test_render() {
        assert_eq!(seconds_to_timestr(59.0), "0:59");
        assert_eq!(seconds_to_timestr(65.0), "1:05");
        assert_eq!(seconds_to_timestr(3723.0), "1:02:03");
        assert_eq!(seconds_to_timestr(42.5), "0:42.50");
        assert_eq!(seconds_to_timestr(4500.0), "1:15:00");
    }

    #[test]
    fn test_dates() {
        assert_eq!(datestr_to_date("").unwrap(), None);
        assert_eq!(
            datestr_to_date("03/14/2014").unwrap(),
            NaiveDate::from_ymd_opt(2014, 3, 14)
        );
        assert!(datestr_to_date("2014-03-14").is_err());
        assert!(datestr_to_date("02/30/2014").is_err());
    }

    proptest! {
        /// Rendering a parsed time and parsing it again is stable.
        #[test]
        fn prop_render_parse_stable(hundredths in 1u64..(100 * 3600 * 100)) {
            let seconds = hundredths as f64 / 100.0;
            let rendered = seconds_to_timestr(seconds);
            let reparsed = timestr_to_seconds(&rendered).unwrap();
            prop_assert_eq!(seconds_to_timestr(reparsed), rendered);
            prop_assert_eq!(to_hundredths(reparsed), hundredths);
        }
    }
}
