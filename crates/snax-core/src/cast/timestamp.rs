//! Timestamp format guessing and parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::types::Value;

/// Sub-patterns recognised in a timestamp sample, most specific first
fn patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"\d{4}-\d{2}-\d{2}", "%Y-%m-%d"),
            (r"\d{4}/\d{2}/\d{2}", "%Y/%m/%d"),
            (r"\d{2}\.\d{2}\.\d{4}", "%d.%m.%Y"),
            (r"\d{2}:\d{2}:\d{2}\.\d+", "%H:%M:%S.%f"),
            (r"\d{2}:\d{2}:\d{2}", "%H:%M:%S"),
            (r"\d{2}:\d{2}", "%H:%M"),
        ]
        .into_iter()
        .filter_map(|(pattern, format)| Regex::new(pattern).ok().map(|re| (re, format)))
        .collect()
    })
}

/// Guess a strftime-style format from the first non-missing string in `series`.
///
/// Known date and time sub-patterns are substituted by their format codes;
/// everything else is kept as a literal. Returns `None` if there is no string
/// sample or digits remain after substitution.
///
/// ```
/// use snax_core::cast::guess_timestamp_format;
/// use snax_core::Value;
///
/// let series = vec![Value::Null, Value::from("01.02.2020")];
/// assert_eq!(guess_timestamp_format(&series).as_deref(), Some("%d.%m.%Y"));
/// ```
pub fn guess_timestamp_format(series: &[Value]) -> Option<String> {
    let sample = series.iter().find(|v| !v.is_null())?.as_str()?;
    guess_format(sample)
}

pub(crate) fn guess_format(sample: &str) -> Option<String> {
    let mut format = sample.trim().to_string();
    for (re, code) in patterns() {
        format = re.replace_all(&format, *code).into_owned();
    }
    if format.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format)
}

/// Parse `text` with a format produced by `guess_timestamp_format`.
///
/// Date-only formats yield midnight and time-only formats are anchored on
/// 1900-01-01.
pub fn parse_with_format(text: &str, format: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let chrono_format = format.replace(".%f", "%.f");
    let has_date = chrono_format.contains("%Y") || chrono_format.contains("%d");
    let has_time = chrono_format.contains("%H");
    match (has_date, has_time) {
        (true, true) => NaiveDateTime::parse_from_str(text, &chrono_format).ok(),
        (true, false) => NaiveDate::parse_from_str(text, &chrono_format)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN)),
        (false, true) => {
            let time = NaiveTime::parse_from_str(text, &chrono_format).ok()?;
            NaiveDate::from_ymd_opt(1900, 1, 1).map(|d| d.and_time(time))
        }
        (false, false) => None,
    }
}

/// Parse a timestamp, trying `format` first and then the usual ISO variants
pub fn parse_timestamp(text: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    if let Some(parsed) = format.and_then(|f| parse_with_format(text, f)) {
        return Some(parsed);
    }
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    const FALLBACKS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for fallback in FALLBACKS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, fallback) {
            return Some(parsed);
        }
    }
    guess_format(text).and_then(|guessed| parse_with_format(text, &guessed))
}
