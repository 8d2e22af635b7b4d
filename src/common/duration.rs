//! Human-readable durations
//!
//! Accepts plain numbers (seconds) and unit strings such as `500ms`, `10s`,
//! `1m30s`, `2h` or `1d`. Units may be chained and fractions are allowed.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

use super::{Error, Result};

/// A duration parsed from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn parse(input: &str) -> Result<Self> {
        parse_duration(input).map(Self)
    }

    /// Whole seconds, truncated
    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    /// Seconds, rounded up so a sub-second value is never zero
    pub fn whole_secs(&self) -> u64 {
        self.0.as_secs() + u64::from(self.0.subsec_nanos() > 0)
    }

    /// Whole milliseconds, truncated
    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => seconds(secs)
                .map(Self)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid duration {}", secs))),
            Raw::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

fn seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Parse a human-readable duration
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || Error::InvalidDuration(input.to_string());
    let text = input.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err(invalid());
    }

    if let Ok(secs) = text.parse::<f64>() {
        return seconds(secs).ok_or_else(invalid);
    }

    let mut total = 0.0_f64;
    let mut rest = text.as_str();
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let multiplier = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86400.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total += value * multiplier;
    }

    seconds(total).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_seconds() {
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
    }

    #[test]
    fn test_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("-5").is_err());
        assert!(parse_duration("inf").is_err());
    }

    #[test]
    fn test_out_of_range_is_error() {
        assert!(matches!(
            parse_duration("999999999999999999999d"),
            Err(Error::InvalidDuration(_))
        ));
        assert!(parse_duration("1e20").is_err());
        assert!(serde_yaml::from_str::<HumanDuration>("1e20").is_err());
    }

    #[test]
    fn test_whole_secs_rounds_up() {
        assert_eq!(parse_duration("500ms").map(HumanDuration).unwrap().whole_secs(), 1);
        assert_eq!(HumanDuration(Duration::from_secs(10)).whole_secs(), 10);
        assert_eq!(HumanDuration(Duration::ZERO).whole_secs(), 0);
    }

    #[test]
    fn test_deserialize_number_and_text() {
        let from_number: HumanDuration = serde_yaml::from_str("3").unwrap();
        let from_text: HumanDuration = serde_yaml::from_str("\"1m\"").unwrap();
        assert_eq!(from_number.as_secs(), 3);
        assert_eq!(from_text.as_secs(), 60);
    }
}
