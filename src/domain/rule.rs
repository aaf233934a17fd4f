//! Recurrence rule entity.
//!
//! A [`Rule`] is built from an attribute mapping. Only a closed set of keys is
//! recognised (see [`RuleField`]); everything else is dropped on assignment.
//! Start and end bounds are normalised to UTC wire timestamps when they are
//! assigned, so the stored recurrence never holds a typed time.

use crate::domain::value::{AttrValue, Attributes};
use crate::utils::error::{Result, RssError};
use crate::utils::time::TimeInput;
use chrono_tz::Tz;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_FREQUENCY: &str = "daily";
pub const DEFAULT_INTERVAL: i64 = 1;

/// Keys stored inside a rule's recurrence mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecurrenceField {
    Frequency,
    Interval,
    Count,
    StartsAt,
    EndsAt,
}

impl RecurrenceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frequency => "frequency",
            Self::Interval => "interval",
            Self::Count => "count",
            Self::StartsAt => "starts_at",
            Self::EndsAt => "ends_at",
        }
    }
}

impl fmt::Display for RecurrenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every key bulk assignment will act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Id,
    Count,
    Frequency,
    Interval,
    StartsAt,
    EndsAt,
    Duration,
    Recurrence,
    Attributes,
}

impl RuleField {
    pub const ALL: [RuleField; 9] = [
        Self::Id,
        Self::Count,
        Self::Frequency,
        Self::Interval,
        Self::StartsAt,
        Self::EndsAt,
        Self::Duration,
        Self::Recurrence,
        Self::Attributes,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "id" => Some(Self::Id),
            "count" => Some(Self::Count),
            "frequency" => Some(Self::Frequency),
            "interval" => Some(Self::Interval),
            "starts_at" => Some(Self::StartsAt),
            "ends_at" => Some(Self::EndsAt),
            "duration" => Some(Self::Duration),
            "recurrence" => Some(Self::Recurrence),
            "attributes" => Some(Self::Attributes),
            _ => None,
        }
    }
}

/// Recurrence mapping holding only the keys that have been assigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recurrence {
    fields: BTreeMap<RecurrenceField, Value>,
}

impl Recurrence {
    pub fn get(&self, field: RecurrenceField) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn set(&mut self, field: RecurrenceField, value: Value) {
        self.fields.insert(field, value);
    }

    fn text(&self, field: RecurrenceField) -> Option<&str> {
        self.fields.get(&field).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect()
    }
}

impl Serialize for Recurrence {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k.as_str(), v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    recurrence: Recurrence,
    duration: Option<i64>,
    zone: Tz,
}

impl Rule {
    /// Build a rule, reading offset-less timestamps as UTC.
    pub fn new(attributes: &Attributes) -> Result<Self> {
        Self::new_in(attributes, Tz::UTC)
    }

    /// Build a rule, reading offset-less timestamps as wall time in `zone`.
    ///
    /// A random id is generated first and replaced if `attributes` has an `id`.
    pub fn new_in(attributes: &Attributes, zone: Tz) -> Result<Self> {
        let mut rule = Self {
            id: Uuid::new_v4().to_string(),
            recurrence: Recurrence::default(),
            duration: None,
            zone,
        };
        rule.assign(attributes)?;
        Ok(rule)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn recurrence(&self) -> &Recurrence {
        &self.recurrence
    }

    pub fn duration(&self) -> Option<i64> {
        self.duration
    }

    pub fn frequency(&self) -> &str {
        self.recurrence
            .text(RecurrenceField::Frequency)
            .unwrap_or(DEFAULT_FREQUENCY)
    }

    pub fn interval(&self) -> i64 {
        self.recurrence
            .get(RecurrenceField::Interval)
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_INTERVAL)
    }

    pub fn count(&self) -> Option<i64> {
        self.recurrence
            .get(RecurrenceField::Count)
            .and_then(Value::as_i64)
    }

    pub fn starts_at(&self) -> Option<&str> {
        self.recurrence.text(RecurrenceField::StartsAt)
    }

    pub fn ends_at(&self) -> Option<&str> {
        self.recurrence.text(RecurrenceField::EndsAt)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Stored as given, including an explicit `null`.
    pub fn set_count(&mut self, count: impl Into<AttrValue>) {
        let count: AttrValue = count.into();
        self.recurrence.set(RecurrenceField::Count, count.to_json());
    }

    pub fn set_frequency(&mut self, frequency: impl Into<String>) {
        self.recurrence
            .set(RecurrenceField::Frequency, Value::String(frequency.into()));
    }

    pub fn set_interval(&mut self, interval: i64) {
        self.recurrence
            .set(RecurrenceField::Interval, Value::from(interval));
    }

    pub fn set_starts_at(&mut self, starts_at: Option<TimeInput>) -> Result<()> {
        self.set_bound(RecurrenceField::StartsAt, starts_at)
    }

    pub fn set_ends_at(&mut self, ends_at: Option<TimeInput>) -> Result<()> {
        self.set_bound(RecurrenceField::EndsAt, ends_at)
    }

    pub fn set_duration(&mut self, duration: i64) {
        self.duration = Some(duration);
    }

    /// Bulk-assign from a recurrence mapping. Anything other than a map is rejected.
    pub fn set_recurrence(&mut self, recurrence: &AttrValue) -> Result<()> {
        match recurrence.as_map() {
            Some(map) => self.assign(map),
            None => Err(RssError::invalid_argument(format!(
                "recurrence can only receive a map, received {}",
                recurrence.type_name()
            ))),
        }
    }

    /// Apply every recognised key of `attributes`; unknown keys are ignored.
    pub fn assign(&mut self, attributes: &Attributes) -> Result<()> {
        for (key, value) in attributes {
            if let Some(field) = RuleField::from_key(key) {
                self.assign_field(field, value)?;
            }
        }
        Ok(())
    }

    fn assign_field(&mut self, field: RuleField, value: &AttrValue) -> Result<()> {
        match field {
            RuleField::Id => self.set_id(value.to_text()),
            RuleField::Count => self.set_count(value.clone()),
            RuleField::Frequency => self.set_frequency(value.to_text()),
            RuleField::Interval => self.set_interval(value.to_integer()),
            RuleField::StartsAt => self.set_starts_at(value.to_time_input("starts_at")?)?,
            RuleField::EndsAt => self.set_ends_at(value.to_time_input("ends_at")?)?,
            RuleField::Duration => self.set_duration(value.to_integer()),
            RuleField::Recurrence => self.set_recurrence(value)?,
            RuleField::Attributes => match value.as_map() {
                Some(map) => self.assign(map)?,
                None => {
                    return Err(RssError::invalid_argument(format!(
                        "attributes can only receive a map, received {}",
                        value.type_name()
                    )))
                }
            },
        }
        Ok(())
    }

    fn set_bound(&mut self, field: RecurrenceField, input: Option<TimeInput>) -> Result<()> {
        let wire = match input {
            Some(t) => t.to_utc_wire(self.zone)?,
            None => None,
        };
        self.recurrence
            .set(field, wire.map_or(Value::Null, Value::String));
        Ok(())
    }

    /// Snapshot `{id, recurrence, duration?}`; `duration` only once it was set.
    pub fn attributes(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert(
            "recurrence".to_string(),
            Value::Object(self.recurrence.to_json()),
        );
        if let Some(duration) = self.duration {
            map.insert("duration".to_string(), Value::from(duration));
        }
        map
    }

    /// Whether the rule looks like it produces a single occurrence.
    ///
    /// `true` is reliable. `false` is not: a rule can still evaluate to one
    /// occurrence through other field combinations (e.g. an `ends_at` that
    /// falls before the second repetition). Two absent bounds compare equal.
    pub fn one_off(&self) -> bool {
        let single = self
            .recurrence
            .get(RecurrenceField::Count)
            .and_then(Value::as_f64)
            == Some(1.0);
        single || self.starts_at() == self.ends_at()
    }

    /// Parse a JSON array of rule attribute maps. Anything but an array yields no rules.
    pub fn load(serialized: &str) -> Result<Vec<Rule>> {
        Self::load_in(serialized, Tz::UTC)
    }

    pub fn load_in(serialized: &str, zone: Tz) -> Result<Vec<Rule>> {
        let parsed: Value = serde_json::from_str(serialized)?;
        let Value::Array(items) = parsed else {
            return Ok(Vec::new());
        };

        items
            .into_iter()
            .map(|item| match AttrValue::from(item) {
                AttrValue::Map(attributes) => Rule::new_in(&attributes, zone),
                other => Err(RssError::invalid_argument(format!(
                    "rule entries must be maps, received {}",
                    other.type_name()
                ))),
            })
            .collect()
    }

    pub fn dump(rules: &[Rule]) -> Result<String> {
        Ok(serde_json::to_string(rules)?)
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recurrence: Recurrence::default(),
            duration: None,
            zone: Tz::UTC,
        }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.attributes() == other.attributes()
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("recurrence", &self.recurrence)?;
        if let Some(duration) = self.duration {
            map.serialize_entry("duration", &duration)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const FAKE_TIME: &str = "2015-11-25T09:00:00Z";

    #[test]
    fn test_new_assigns_given_id() {
        let rule = Rule::new(&attrs! { "id" => "foo" }).unwrap();
        assert_eq!(rule.id(), "foo");
    }

    #[test]
    fn test_defaults() {
        let rule = Rule::new(&attrs! {}).unwrap();
        assert!(Uuid::parse_str(rule.id()).is_ok());
        assert!(rule.recurrence().is_empty());
        assert_eq!(rule.frequency(), "daily");
        assert_eq!(rule.interval(), 1);
        assert_eq!(rule.count(), None);
        assert_eq!(rule.duration(), None);
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = Rule::new(&attrs! {}).unwrap();
        let b = Rule::new(&attrs! {}).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_attributes_snapshot() {
        let mut rule = Rule::default();
        rule.assign(&attrs! { "id" => "foo" }).unwrap();
        assert_eq!(
            Value::Object(rule.attributes()),
            json!({"id": "foo", "recurrence": {}})
        );
    }

    #[test]
    fn test_recurrence_assignment_drops_unknown_keys() {
        let mut rule = Rule::default();
        rule.set_recurrence(&AttrValue::Map(
            attrs! { "starts_at" => FAKE_TIME, "bar" => "baz" },
        ))
        .unwrap();
        assert_eq!(
            Value::Object(rule.recurrence().to_json()),
            json!({"starts_at": FAKE_TIME})
        );
    }

    #[test]
    fn test_recurrence_assignment_rejects_non_map() {
        let mut rule = Rule::default();
        let err = rule
            .set_recurrence(&AttrValue::List(vec![]))
            .unwrap_err();
        assert!(matches!(err, RssError::InvalidArgument { .. }));
    }

    #[test]
    fn test_serializes_properly() {
        let mut rule = Rule::default();
        rule.set_id("foo");
        rule.set_recurrence(&AttrValue::Map(attrs! { "starts_at" => FAKE_TIME, "count" => 1 }))
            .unwrap();
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"id": "foo", "recurrence": {"count": 1, "starts_at": FAKE_TIME}})
        );
    }

    #[test]
    fn test_typed_and_text_bounds_normalise_to_utc() {
        let berlin = chrono_tz::Europe::Berlin;
        let local = berlin.with_ymd_and_hms(2015, 11, 25, 10, 0, 0).unwrap();

        let typed = Rule::new(&attrs! { "starts_at" => local }).unwrap();
        let text = Rule::new(&attrs! { "starts_at" => "2015-11-25T10:00:00+01:00" }).unwrap();
        let zoned = Rule::new_in(&attrs! { "starts_at" => "2015-11-25 10:00:00" }, berlin).unwrap();

        assert_eq!(typed.starts_at(), Some(FAKE_TIME));
        assert_eq!(text.starts_at(), Some(FAKE_TIME));
        assert_eq!(zoned.starts_at(), Some(FAKE_TIME));
    }

    #[test]
    fn test_null_bound_is_kept_as_null() {
        let rule = Rule::new(&attrs! { "recurrence" => attrs! { "ends_at" => AttrValue::Null } })
            .unwrap();
        assert_eq!(rule.ends_at(), None);
        assert_eq!(
            Value::Object(rule.recurrence().to_json()),
            json!({"ends_at": null})
        );
    }

    #[test]
    fn test_coercions() {
        let rule = Rule::new(&attrs! {
            "id" => 42,
            "interval" => "3",
            "frequency" => "weekly",
            "duration" => "3600",
        })
        .unwrap();
        assert_eq!(rule.id(), "42");
        assert_eq!(rule.interval(), 3);
        assert_eq!(rule.frequency(), "weekly");
        assert_eq!(rule.duration(), Some(3600));
    }

    #[test]
    fn test_one_off_with_count_one() {
        let starts_at = Utc.with_ymd_and_hms(2015, 11, 25, 0, 0, 0).unwrap();
        let ends_at = Utc.with_ymd_and_hms(2015, 11, 26, 0, 0, 0).unwrap();
        let rule = Rule::new(&attrs! { "count" => 1, "starts_at" => starts_at, "ends_at" => ends_at })
            .unwrap();
        assert!(rule.one_off());
    }

    #[test]
    fn test_one_off_with_fractional_count_one() {
        let rules = Rule::load(
            r#"[{"recurrence":{"count":1.0,"starts_at":"2015-11-25T00:00:00Z","ends_at":"2015-11-26T00:00:00Z"}}]"#,
        )
        .unwrap();
        assert!(rules[0].one_off());
    }

    #[test]
    fn test_one_off_with_other_count() {
        let starts_at = Utc.with_ymd_and_hms(2015, 11, 25, 0, 0, 0).unwrap();
        let ends_at = Utc.with_ymd_and_hms(2015, 11, 26, 0, 0, 0).unwrap();
        let rule = Rule::new(&attrs! { "count" => 3, "starts_at" => starts_at, "ends_at" => ends_at })
            .unwrap();
        assert!(!rule.one_off());
    }

    #[test]
    fn test_one_off_with_equal_bounds() {
        let starts_at = Utc.with_ymd_and_hms(2015, 11, 25, 0, 0, 0).unwrap();
        let rule = Rule::new(&attrs! { "count" => 2, "starts_at" => starts_at, "ends_at" => starts_at })
            .unwrap();
        assert!(rule.one_off());
    }

    #[test]
    fn test_load_keeps_recognised_subset() {
        let json = json!([
            {
                "id": "83225d3b-9e63-48ae-9c68-cfcbd902529f",
                "time_zone": "Europe/Berlin",
                "duration": 3600,
                "recurrence": {
                    "frequency": "weekly",
                    "interval": 37,
                    "count": null,
                    "starts_at": "2015-06-20T10:30:00Z",
                    "ends_at": "2015-12-31T22:59:59Z"
                }
            },
            {
                "id": "f5683120-ee33-40e8-ac1e-240b3eeec45b",
                "time_zone": "Etc/UTC",
                "duration": 3600,
                "recurrence": {
                    "frequency": "daily",
                    "interval": 1,
                    "count": 10,
                    "starts_at": "2016-03-01T23:00:00Z",
                    "ends_at": null
                }
            }
        ]);

        let rules = Rule::load(&json.to_string()).unwrap();
        assert_eq!(rules.len(), 2);
        for (rule, entry) in rules.iter().zip(json.as_array().unwrap()) {
            let mut expected = entry.as_object().unwrap().clone();
            expected.remove("time_zone");
            assert_eq!(rule.attributes(), expected);
        }
    }

    #[test]
    fn test_load_non_array_is_empty() {
        assert!(Rule::load("{}").unwrap().is_empty());
        assert!(Rule::load("null").unwrap().is_empty());
        assert!(Rule::load("not json").is_err());
        assert!(Rule::load("[1]").is_err());
    }

    #[test]
    fn test_dump_then_load() {
        let rules = vec![
            Rule::new(&attrs! { "count" => 1, "starts_at" => FAKE_TIME, "duration" => 60 }).unwrap(),
            Rule::new(&attrs! { "frequency" => "monthly", "interval" => 2 }).unwrap(),
        ];
        let dumped = Rule::dump(&rules).unwrap();
        assert_eq!(Rule::load(&dumped).unwrap(), rules);
        assert_eq!(Rule::dump(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_every_field_is_recognised() {
        for field in RuleField::ALL {
            let key = match field {
                RuleField::Id => "id",
                RuleField::Count => "count",
                RuleField::Frequency => "frequency",
                RuleField::Interval => "interval",
                RuleField::StartsAt => "starts_at",
                RuleField::EndsAt => "ends_at",
                RuleField::Duration => "duration",
                RuleField::Recurrence => "recurrence",
                RuleField::Attributes => "attributes",
            };
            assert_eq!(RuleField::from_key(key), Some(field));
        }
        assert_eq!(RuleField::from_key("time_zone"), None);
    }
}
