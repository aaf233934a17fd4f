use crate::utils::error::Result;
use crate::utils::time::{parse_in_zone, to_wire};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// A materialised event instance as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_time"
    )]
    pub starts_at: Option<DateTime<Tz>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_time"
    )]
    pub ends_at: Option<DateTime<Tz>>,
    /// Any other keys of the payload, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct WireOccurrence {
    id: Option<Value>,
    series_id: Option<Value>,
    starts_at: Option<String>,
    ends_at: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Occurrence {
    /// Build from a payload object, reading the bounds into `zone`.
    pub fn from_payload(payload: Value, zone: Tz) -> Result<Self> {
        let mut wire: WireOccurrence = serde_json::from_value(payload)?;
        let id = text_or_extra("id", wire.id, &mut wire.extra);
        let series_id = text_or_extra("series_id", wire.series_id, &mut wire.extra);
        Ok(Self {
            id,
            series_id,
            starts_at: parse_bound(wire.starts_at, zone)?,
            ends_at: parse_bound(wire.ends_at, zone)?,
            extra: wire.extra,
        })
    }
}

/// String identifiers are lifted out; any other value stays in `extra` as sent.
fn text_or_extra(key: &str, value: Option<Value>, extra: &mut Map<String, Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Null) | None => None,
        Some(other) => {
            extra.insert(key.to_string(), other);
            None
        }
    }
}

fn parse_bound(value: Option<String>, zone: Tz) -> Result<Option<DateTime<Tz>>> {
    match value {
        Some(text) => parse_in_zone(&text, zone),
        None => Ok(None),
    }
}

fn serialize_time<S: Serializer>(
    value: &Option<DateTime<Tz>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(t) => serializer.serialize_str(&to_wire(t)),
        None => serializer.serialize_none(),
    }
}
