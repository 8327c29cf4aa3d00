use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Deserialize, Deserializer};

/// Accepts RFC 3339, or a naive ISO 8601 timestamp read as UTC.
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Timestamp field that tolerates state files written without an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LenientTime(pub DateTime<Utc>);

impl<'de> Deserialize<'de> for LenientTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
            .map(LenientTime)
            .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp {raw:?}")))
    }
}
