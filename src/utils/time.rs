//! Temporal helpers shared by the rule model and the connector.
//!
//! The wire format is RFC 3339 with second precision, `Z` for UTC.

use crate::utils::error::{Result, RssError};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Offset-carrying shapes that are not RFC 3339, e.g. `2015-11-25 09:00:00 +0100`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A temporal value as supplied by a caller: either raw text or a typed instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeInput {
    Text(String),
    Instant(DateTime<FixedOffset>),
}

impl TimeInput {
    /// UTC wire rendering. Offset-less text is read in `zone`; blank text is absent.
    pub fn to_utc_wire(&self, zone: Tz) -> Result<Option<String>> {
        let instant = match self {
            Self::Instant(t) => Some(*t),
            Self::Text(text) => parse_in_zone(text, zone)?.map(|t| t.fixed_offset()),
        };
        Ok(instant.map(|t| to_wire(&t.with_timezone(&Utc))))
    }

    /// Rendering used for filters and occurrence writes: typed values keep
    /// their own offset, text passes through untouched.
    pub fn to_local_param(&self) -> String {
        match self {
            Self::Instant(t) => to_wire(t),
            Self::Text(text) => text.clone(),
        }
    }
}

impl<Z: TimeZone> From<DateTime<Z>> for TimeInput {
    fn from(value: DateTime<Z>) -> Self {
        Self::Instant(value.fixed_offset())
    }
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

pub fn to_wire<Z: TimeZone>(t: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse text the way a zone-aware parser would: explicit offsets are
/// honoured, anything without one is read as wall time in `zone`.
pub fn parse_in_zone(text: &str, zone: Tz) -> Result<Option<DateTime<Tz>>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(t.with_timezone(&zone)));
    }

    for format in OFFSET_FORMATS {
        if let Ok(t) = DateTime::parse_from_str(text, format) {
            return Ok(Some(t.with_timezone(&zone)));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return localize(naive, zone, text).map(Some);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| RssError::invalid_argument(format!("invalid date '{}'", text)))?;
        return localize(naive, zone, text).map(Some);
    }

    Err(RssError::invalid_argument(format!(
        "cannot parse '{}' as a timestamp",
        text
    )))
}

fn localize(naive: NaiveDateTime, zone: Tz, text: &str) -> Result<DateTime<Tz>> {
    // Ambiguous wall times (DST fall-back) resolve to the earlier instant.
    zone.from_local_datetime(&naive).earliest().ok_or_else(|| {
        RssError::invalid_argument(format!("'{}' does not exist in zone {}", text, zone.name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;

    #[test]
    fn test_typed_instant_is_rendered_in_utc() {
        let local = Berlin.with_ymd_and_hms(2015, 11, 25, 10, 30, 0).unwrap();
        let wire = TimeInput::from(local).to_utc_wire(Berlin).unwrap();
        assert_eq!(wire.as_deref(), Some("2015-11-25T09:30:00Z"));
    }

    #[test]
    fn test_offset_less_text_uses_zone() {
        let wire = TimeInput::from("2015-06-20 12:30:00")
            .to_utc_wire(Berlin)
            .unwrap();
        assert_eq!(wire.as_deref(), Some("2015-06-20T10:30:00Z"));
    }

    #[test]
    fn test_text_with_offset_is_honoured() {
        let wire = TimeInput::from("2010-01-01T00:59:59.000Z")
            .to_utc_wire(Berlin)
            .unwrap();
        assert_eq!(wire.as_deref(), Some("2010-01-01T00:59:59Z"));
    }

    #[test]
    fn test_space_separated_offset_is_honoured() {
        let parsed = parse_in_zone("2015-11-25 09:00:00 +0100", Berlin).unwrap();
        assert_eq!(
            parsed,
            Some(Berlin.with_ymd_and_hms(2015, 11, 25, 9, 0, 0).unwrap())
        );

        let wire = TimeInput::from("2015-11-25 09:00:00 +0100")
            .to_utc_wire(Tz::UTC)
            .unwrap();
        assert_eq!(wire.as_deref(), Some("2015-11-25T08:00:00Z"));
    }

    #[test]
    fn test_blank_text_is_absent() {
        assert_eq!(TimeInput::from("  ").to_utc_wire(Berlin).unwrap(), None);
    }

    #[test]
    fn test_garbage_text_is_rejected() {
        assert!(matches!(
            TimeInput::from("next tuesday").to_utc_wire(Berlin),
            Err(RssError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_local_param_keeps_offset() {
        let local = Berlin.with_ymd_and_hms(2015, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(
            TimeInput::from(local).to_local_param(),
            "2015-01-01T10:00:00+01:00"
        );
        assert_eq!(
            TimeInput::from(Utc.with_ymd_and_hms(2015, 1, 1, 10, 0, 0).unwrap()).to_local_param(),
            "2015-01-01T10:00:00Z"
        );
        assert_eq!(TimeInput::from("tomorrow").to_local_param(), "tomorrow");
    }

    #[test]
    fn test_parse_in_zone_returns_zone_aware_value() {
        let parsed = parse_in_zone("2010-01-01T00:00:00.000Z", Berlin)
            .unwrap()
            .unwrap();
        assert_eq!(parsed, Berlin.with_ymd_and_hms(2010, 1, 1, 1, 0, 0).unwrap());
        assert_eq!(parsed.timezone(), Berlin);
    }
}
