use crate::utils::error::{Result, RssError};
use crate::utils::time::{to_wire, TimeInput};
use chrono::{DateTime, FixedOffset, TimeZone};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Attribute mapping accepted by bulk assignment and by every write.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A JSON-like value that can also carry a typed instant.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Time(DateTime<FixedOffset>),
    List(Vec<AttrValue>),
    Map(Attributes),
}

impl AttrValue {
    /// Absent, null, blank text or an empty collection.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
            Self::Bool(b) => !b,
            Self::Number(_) | Self::Time(_) => false,
        }
    }

    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Time(_) => "time",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// String form used by identifier-like setters; `null` becomes `""`.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Time(t) => to_wire(t),
            other => other.to_json().to_string(),
        }
    }

    /// Lenient integer coercion: leading digits of text, truncated floats,
    /// zero for anything else.
    pub fn to_integer(&self) -> i64 {
        match self {
            Self::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(0),
            Self::Text(s) => leading_integer(s),
            Self::Bool(_) | Self::Null | Self::Time(_) | Self::List(_) | Self::Map(_) => 0,
        }
    }

    /// Resolve a date-like value; `null` is absent, other shapes are rejected.
    pub fn to_time_input(&self, field: &str) -> Result<Option<TimeInput>> {
        match self {
            Self::Null => Ok(None),
            Self::Text(s) => Ok(Some(TimeInput::Text(s.clone()))),
            Self::Time(t) => Ok(Some(TimeInput::Instant(*t))),
            other => Err(RssError::invalid_argument(format!(
                "{} expects a string or a time, received {}",
                field,
                other.type_name()
            ))),
        }
    }

    /// JSON rendering; typed instants keep their own offset.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
            Self::Time(t) => Value::String(to_wire(t)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(attributes_to_json(map)),
        }
    }
}

pub fn attributes_to_json(attributes: &Attributes) -> Map<String, Value> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

fn leading_integer(s: &str) -> i64 {
    let trimmed = s.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl<Z: TimeZone> From<DateTime<Z>> for AttrValue {
    fn from(value: DateTime<Z>) -> Self {
        Self::Time(value.fixed_offset())
    }
}

impl From<TimeInput> for AttrValue {
    fn from(value: TimeInput) -> Self {
        match value {
            TimeInput::Text(s) => Self::Text(s),
            TimeInput::Instant(t) => Self::Time(t),
        }
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(value: Vec<AttrValue>) -> Self {
        Self::List(value)
    }
}

impl From<Attributes> for AttrValue {
    fn from(value: Attributes) -> Self {
        Self::Map(value)
    }
}

/// Build an [`Attributes`] map from `key => value` pairs.
///
/// ```
/// use rss_client::attrs;
/// let a = attrs! { "count" => 1, "frequency" => "weekly" };
/// assert_eq!(a.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::domain::value::Attributes::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::domain::value::Attributes::new();
        $(map.insert(::std::string::String::from($key), $crate::domain::value::AttrValue::from($value));)+
        map
    }};
}
