//! Attribute preparation for writes and filters, and occurrence payload
//! transformation for reads.

use crate::domain::value::{attributes_to_json, AttrValue, Attributes};
use crate::domain::{Occurrence, Rule};
use crate::utils::error::{Result, RssError};
use chrono_tz::Tz;
use serde_json::{Map, Value};

const OCCURRENCE_BOUNDS: [&str; 2] = ["starts_at", "ends_at"];
const FILTER_BOUNDS: [&str; 2] = ["interval_starts_at", "interval_ends_at"];

/// Series keys pass through; every member of `rules` is rebuilt through
/// [`prepare_rule`] with the series' `duration` and `time_zone` cascaded.
pub fn prepare_series(series: &Attributes, zone: Tz) -> Result<Map<String, Value>> {
    let mut prepared = attributes_to_json(series);

    let rules = match series.get("rules") {
        None | Some(AttrValue::Null) => Vec::new(),
        Some(AttrValue::List(items)) => items
            .iter()
            .map(|item| match item {
                AttrValue::Map(rule) => prepare_rule(rule, Some(series), zone).map(Value::Object),
                other => Err(RssError::invalid_argument(format!(
                    "series rules must be maps, received {}",
                    other.type_name()
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(RssError::invalid_argument(format!(
                "series rules must be a list, received {}",
                other.type_name()
            )))
        }
    };

    prepared.insert("rules".to_string(), Value::Array(rules));
    Ok(prepared)
}

/// Round-trip a rule mapping through [`Rule`] and keep `id` and `recurrence`.
///
/// The id is the caller's only if the mapping carries one; otherwise a fresh
/// one is generated. Ids are always created client side.
pub fn prepare_rule(
    rule_attributes: &Attributes,
    series: Option<&Attributes>,
    zone: Tz,
) -> Result<Map<String, Value>> {
    let rule = Rule::new_in(rule_attributes, zone)?;

    let mut prepared = Map::new();
    prepared.insert("id".to_string(), Value::String(rule.id().to_string()));
    prepared.insert(
        "recurrence".to_string(),
        Value::Object(rule.recurrence().to_json()),
    );

    if let Some(series) = series {
        let duration = match series.get("duration") {
            Some(value) if is_truthy(value) => value.to_json(),
            _ => rule.duration().map_or(Value::Null, Value::from),
        };
        let time_zone = series
            .get("time_zone")
            .map_or(Value::Null, AttrValue::to_json);

        prepared.insert("duration".to_string(), duration);
        prepared.insert("time_zone".to_string(), time_zone);
    }

    Ok(prepared)
}

/// Only `starts_at`/`ends_at` are sent; blank values are omitted.
pub fn prepare_occurrence(occurrence: &Attributes) -> Map<String, Value> {
    let mut prepared = Map::new();
    for key in OCCURRENCE_BOUNDS {
        if let Some(value) = occurrence.get(key).filter(|v| !v.is_blank()) {
            prepared.insert(key.to_string(), Value::String(iso8601_param(value)));
        }
    }
    prepared
}

/// All filter keys are kept; interval bounds are rendered as timestamps.
pub fn sanitize_filters(filters: &Attributes) -> Map<String, Value> {
    let mut sanitized = attributes_to_json(filters);
    for key in FILTER_BOUNDS {
        if let Some(value) = filters.get(key).filter(|v| !v.is_blank()) {
            sanitized.insert(key.to_string(), Value::String(iso8601_param(value)));
        }
    }
    sanitized
}

/// Occurrence from a payload object; `null` means no occurrence.
pub fn occurrence_payload(payload: Value, zone: Tz) -> Result<Option<Occurrence>> {
    match payload {
        Value::Null => Ok(None),
        payload => Occurrence::from_payload(payload, zone).map(Some),
    }
}

pub fn occurrence_list(payload: Value, zone: Tz) -> Result<Vec<Occurrence>> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| Occurrence::from_payload(item, zone))
            .collect(),
        other => Err(RssError::invalid_argument(format!(
            "expected a list of occurrences, received {}",
            other
        ))),
    }
}

fn iso8601_param(value: &AttrValue) -> String {
    match value.to_time_input("timestamp") {
        Ok(Some(t)) => t.to_local_param(),
        _ => value.to_text(),
    }
}

fn is_truthy(value: &AttrValue) -> bool {
    !matches!(value, AttrValue::Null | AttrValue::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use chrono::{Duration, TimeZone, Utc};
    use chrono_tz::Europe::Berlin;
    use serde_json::json;

    #[test]
    fn test_series_defaults_rules() {
        let prepared = prepare_series(&attrs! {}, Berlin).unwrap();
        assert_eq!(Value::Object(prepared), json!({"rules": []}));
    }

    #[test]
    fn test_series_cascades_duration_and_time_zone() {
        let series = attrs! {
            "duration" => 3600,
            "time_zone" => "Europe/Berlin",
            "rules" => vec![AttrValue::from(attrs! { "id" => "r1", "duration" => 60, "count" => 1 })],
        };

        let prepared = prepare_series(&series, Berlin).unwrap();
        assert_eq!(
            prepared["rules"],
            json!([{
                "id": "r1",
                "recurrence": {"count": 1},
                "duration": 3600,
                "time_zone": "Europe/Berlin"
            }])
        );
        assert_eq!(prepared["duration"], json!(3600));
    }

    #[test]
    fn test_series_falls_back_to_rule_duration() {
        let series = attrs! {
            "rules" => vec![AttrValue::from(attrs! { "id" => "r1", "duration" => 60 })],
        };

        let prepared = prepare_series(&series, Berlin).unwrap();
        assert_eq!(prepared["rules"][0]["duration"], json!(60));
        assert_eq!(prepared["rules"][0]["time_zone"], Value::Null);
    }

    #[test]
    fn test_series_nested_local_time_is_sent_as_utc() {
        let t = Berlin.from_utc_datetime(&Utc::now().naive_utc()) + Duration::weeks(1);
        let series = attrs! {
            "rules" => vec![AttrValue::from(attrs! {
                "recurrence" => attrs! { "starts_at" => t },
            })],
        };

        let prepared = prepare_series(&series, Berlin).unwrap();
        assert_eq!(
            prepared["rules"][0]["recurrence"]["starts_at"],
            json!(crate::utils::time::to_wire(&t.with_timezone(&Utc)))
        );
    }

    #[test]
    fn test_series_rejects_malformed_rules() {
        assert!(prepare_series(&attrs! { "rules" => "nope" }, Berlin).is_err());
        assert!(prepare_series(&attrs! { "rules" => vec![AttrValue::from(1)] }, Berlin).is_err());
    }

    #[test]
    fn test_rule_keeps_given_id_and_drops_duration() {
        let prepared = prepare_rule(&attrs! { "id" => "keep", "duration" => 60 }, None, Berlin)
            .unwrap();
        assert_eq!(
            Value::Object(prepared),
            json!({"id": "keep", "recurrence": {}})
        );
    }

    #[test]
    fn test_rule_without_id_gets_a_fresh_one() {
        let a = prepare_rule(&attrs! {}, None, Berlin).unwrap();
        let b = prepare_rule(&attrs! {}, None, Berlin).unwrap();
        assert_ne!(a["id"], b["id"]);
    }

    #[test]
    fn test_occurrence_bounds_keep_local_offset() {
        let t = Berlin.with_ymd_and_hms(2015, 1, 1, 10, 0, 0).unwrap();
        let prepared = prepare_occurrence(&attrs! {
            "starts_at" => t,
            "ends_at" => "2015-01-01T11:00:00+01:00",
            "state" => "cancelled",
        });
        assert_eq!(
            Value::Object(prepared),
            json!({
                "starts_at": "2015-01-01T10:00:00+01:00",
                "ends_at": "2015-01-01T11:00:00+01:00"
            })
        );
    }

    #[test]
    fn test_occurrence_blank_bounds_are_omitted() {
        let prepared = prepare_occurrence(&attrs! { "starts_at" => AttrValue::Null, "ends_at" => "" });
        assert!(prepared.is_empty());
    }

    #[test]
    fn test_filters() {
        let t = Berlin.with_ymd_and_hms(2015, 1, 1, 10, 0, 0).unwrap();
        let sanitized = sanitize_filters(&attrs! {
            "interval_starts_at" => t,
            "interval_ends_at" => "2015-02-01",
            "series_id" => "s1",
        });
        assert_eq!(
            Value::Object(sanitized),
            json!({
                "interval_starts_at": "2015-01-01T10:00:00+01:00",
                "interval_ends_at": "2015-02-01",
                "series_id": "s1"
            })
        );
    }

    #[test]
    fn test_occurrence_list() {
        let list = occurrence_list(
            json!([{"starts_at": "2010-01-01T00:00:00.000Z", "ends_at": "2010-01-01T00:59:59.000Z"}]),
            Berlin,
        )
        .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(
            list[0].starts_at,
            Some(Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap().with_timezone(&Berlin))
        );
        assert!(occurrence_list(Value::Null, Berlin).unwrap().is_empty());
        assert_eq!(occurrence_payload(Value::Null, Berlin).unwrap(), None);
    }
}
