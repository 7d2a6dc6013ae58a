//! Typed feature and entity values.
//!
//! A [`Value`] is what a cell of a source table turns into, what the online store keeps per
//! feature, and what lookups hand back as JSON.

use crate::error::DomainError;
use crate::time::parse_timestamp;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Declared type of an entity or feature.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ValueType {
    #[default]
    Invalid,
    Bytes,
    String,
    Int32,
    Int64,
    Double,
    Float,
    Bool,
    UnixTimestamp,
    BytesList,
    StringList,
    Int32List,
    Int64List,
    DoubleList,
    FloatList,
    BoolList,
    UnixTimestampList,
}

impl ValueType {
    /// Element type of a list type, `None` for scalars.
    #[must_use]
    pub const fn element(self) -> Option<Self> {
        match self {
            Self::BytesList => Some(Self::Bytes),
            Self::StringList => Some(Self::String),
            Self::Int32List => Some(Self::Int32),
            Self::Int64List => Some(Self::Int64),
            Self::DoubleList => Some(Self::Double),
            Self::FloatList => Some(Self::Float),
            Self::BoolList => Some(Self::Bool),
            Self::UnixTimestampList => Some(Self::UnixTimestamp),
            _ => None,
        }
    }
}

/// A single typed value. Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bytes(Vec<u8>),
    String(String),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Float(f32),
    Bool(bool),
    UnixTimestamp(i64),
    BytesList(Vec<Vec<u8>>),
    StringList(Vec<String>),
    Int32List(Vec<i32>),
    Int64List(Vec<i64>),
    DoubleList(Vec<f64>),
    FloatList(Vec<f32>),
    BoolList(Vec<bool>),
    UnixTimestampList(Vec<i64>),
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Invalid,
            Self::Bytes(_) => ValueType::Bytes,
            Self::String(_) => ValueType::String,
            Self::Int32(_) => ValueType::Int32,
            Self::Int64(_) => ValueType::Int64,
            Self::Double(_) => ValueType::Double,
            Self::Float(_) => ValueType::Float,
            Self::Bool(_) => ValueType::Bool,
            Self::UnixTimestamp(_) => ValueType::UnixTimestamp,
            Self::BytesList(_) => ValueType::BytesList,
            Self::StringList(_) => ValueType::StringList,
            Self::Int32List(_) => ValueType::Int32List,
            Self::Int64List(_) => ValueType::Int64List,
            Self::DoubleList(_) => ValueType::DoubleList,
            Self::FloatList(_) => ValueType::FloatList,
            Self::BoolList(_) => ValueType::BoolList,
            Self::UnixTimestampList(_) => ValueType::UnixTimestampList,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Parses a CSV cell. Empty cells are [`Value::Null`]; list items are `;`-separated.
    ///
    /// String cells and items are kept verbatim, so a whitespace-only cell is a string, not a
    /// null. Other types ignore surrounding whitespace.
    pub fn parse(raw: &str, value_type: ValueType) -> Result<Self, DomainError> {
        let raw = significant(raw, value_type.element().unwrap_or(value_type));
        if raw.is_empty() {
            return Ok(Self::Null);
        }

        if let Some(element) = value_type.element() {
            let items = raw
                .split(';')
                .map(|item| parse_scalar(significant(item, element), element))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(collect_list(value_type, items));
        }

        parse_scalar(raw, value_type)
    }

    /// Converts a JSON value supplied by a caller (e.g. an entity row) to `value_type`.
    ///
    /// Strings are accepted for every type and go through [`Value::parse`], so
    /// `"1001"` works for an `INT64` join key.
    pub fn from_json(json: &Json, value_type: ValueType) -> Result<Self, DomainError> {
        let mismatch = || DomainError::TypeMismatch { expected: value_type, value: json.to_string() };

        match (json, value_type) {
            (Json::Null, _) => Ok(Self::Null),
            (Json::String(s), _) => Self::parse(s, value_type),
            (Json::Bool(b), ValueType::Bool) => Ok(Self::Bool(*b)),
            (Json::Number(n), ValueType::Int32) => {
                n.as_i64().and_then(|v| i32::try_from(v).ok()).map(Self::Int32).ok_or_else(mismatch)
            },
            (Json::Number(n), ValueType::Int64) => n.as_i64().map(Self::Int64).ok_or_else(mismatch),
            (Json::Number(n), ValueType::UnixTimestamp) => {
                n.as_i64().map(Self::UnixTimestamp).ok_or_else(mismatch)
            },
            (Json::Number(n), ValueType::Double) => n.as_f64().map(Self::Double).ok_or_else(mismatch),
            #[allow(clippy::cast_possible_truncation)]
            (Json::Number(n), ValueType::Float) => {
                n.as_f64().map(|v| Self::Float(v as f32)).ok_or_else(mismatch)
            },
            (Json::Array(items), list) if list.element().is_some() => {
                let element = list.element().unwrap_or_default();
                let values = items
                    .iter()
                    .map(|item| Self::from_json(item, element))
                    .collect::<Result<Vec<_>, _>>()?;
                if values.iter().any(Self::is_null) {
                    return Err(mismatch());
                }
                Ok(collect_list(list, values))
            },
            _ => Err(mismatch()),
        }
    }

    /// JSON rendering used in responses and dumps. Bytes are base64.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bytes(b) => Json::String(BASE64.encode(b)),
            Self::String(s) => Json::String(s.clone()),
            Self::Int32(v) => Json::from(*v),
            Self::Int64(v) | Self::UnixTimestamp(v) => Json::from(*v),
            Self::Double(v) => Json::from(*v),
            Self::Float(v) => Json::from(f64::from(*v)),
            Self::Bool(v) => Json::Bool(*v),
            Self::BytesList(items) => items.iter().map(|b| Json::String(BASE64.encode(b))).collect(),
            Self::StringList(items) => items.iter().cloned().map(Json::String).collect(),
            Self::Int32List(items) => items.iter().copied().map(Json::from).collect(),
            Self::Int64List(items) | Self::UnixTimestampList(items) => {
                items.iter().copied().map(Json::from).collect()
            },
            Self::DoubleList(items) => items.iter().copied().map(Json::from).collect(),
            Self::FloatList(items) => items.iter().map(|v| Json::from(f64::from(*v))).collect(),
            Self::BoolList(items) => items.iter().copied().map(Json::Bool).collect(),
        }
    }

    /// Text rendering used for CSV output. Inverse of [`Value::parse`] for scalars.
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::String(s) => s.clone(),
            Self::Bytes(_) | Self::Int32(_) | Self::Int64(_) | Self::UnixTimestamp(_) => {
                json_scalar_text(&self.to_json())
            },
            Self::Double(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            _ => match self.to_json() {
                Json::Array(items) => {
                    items.iter().map(json_scalar_text).collect::<Vec<_>>().join(";")
                },
                other => json_scalar_text(&other),
            },
        }
    }
}

fn json_scalar_text(json: &Json) -> String {
    match json {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn significant(raw: &str, value_type: ValueType) -> &str {
    if value_type == ValueType::String { raw } else { raw.trim() }
}

fn parse_scalar(raw: &str, value_type: ValueType) -> Result<Value, DomainError> {
    let mismatch = || DomainError::TypeMismatch { expected: value_type, value: raw.to_owned() };

    match value_type {
        ValueType::String => Ok(Value::String(raw.to_owned())),
        ValueType::Bytes => BASE64.decode(raw).map(Value::Bytes).map_err(|_| mismatch()),
        ValueType::Int32 => raw.parse().map(Value::Int32).map_err(|_| mismatch()),
        ValueType::Int64 => raw.parse().map(Value::Int64).map_err(|_| mismatch()),
        ValueType::Double => raw.parse().map(Value::Double).map_err(|_| mismatch()),
        ValueType::Float => raw.parse().map(Value::Float).map_err(|_| mismatch()),
        ValueType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },
        ValueType::UnixTimestamp => {
            parse_timestamp(raw).map(|ts| Value::UnixTimestamp(ts.timestamp())).map_err(|_| mismatch())
        },
        _ => Err(mismatch()),
    }
}

/// Packs scalar values into the list variant of `list_type`. Items must already carry the
/// element type.
fn collect_list(list_type: ValueType, items: Vec<Value>) -> Value {
    macro_rules! pack {
        ($variant:ident, $list:ident) => {
            Value::$list(
                items
                    .into_iter()
                    .filter_map(|v| if let Value::$variant(x) = v { Some(x) } else { None })
                    .collect(),
            )
        };
    }

    match list_type {
        ValueType::BytesList => pack!(Bytes, BytesList),
        ValueType::StringList => pack!(String, StringList),
        ValueType::Int32List => pack!(Int32, Int32List),
        ValueType::Int64List => pack!(Int64, Int64List),
        ValueType::DoubleList => pack!(Double, DoubleList),
        ValueType::FloatList => pack!(Float, FloatList),
        ValueType::BoolList => pack!(Bool, BoolList),
        ValueType::UnixTimestampList => pack!(UnixTimestamp, UnixTimestampList),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn value_types_use_screaming_snake_case() {
        assert_eq!(ValueType::UnixTimestampList.to_string(), "UNIX_TIMESTAMP_LIST");
        assert_eq!("int64".parse::<ValueType>().unwrap(), ValueType::Int64);
        for vt in ValueType::iter() {
            assert_eq!(vt.to_string().parse::<ValueType>().unwrap(), vt);
        }
        assert_eq!(serde_json::to_value(ValueType::Float).unwrap(), json!("FLOAT"));
    }

    #[test]
    fn parse_csv_cells() {
        assert_eq!(Value::parse("1001", ValueType::Int64).unwrap(), Value::Int64(1001));
        assert_eq!(Value::parse(" 0.5 ", ValueType::Float).unwrap(), Value::Float(0.5));
        assert_eq!(Value::parse("", ValueType::Double).unwrap(), Value::Null);
        assert_eq!(Value::parse("TRUE", ValueType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(
            Value::parse("1;2;3", ValueType::Int32List).unwrap(),
            Value::Int32List(vec![1, 2, 3])
        );
        assert_eq!(
            Value::parse("2021-04-12T10:00:00Z", ValueType::UnixTimestamp).unwrap(),
            Value::UnixTimestamp(1_618_221_600)
        );
        assert!(matches!(
            Value::parse("abc", ValueType::Int64),
            Err(DomainError::TypeMismatch { expected: ValueType::Int64, .. })
        ));
        assert!(Value::parse("x", ValueType::Invalid).is_err());
    }

    #[test]
    fn string_cells_keep_whitespace() {
        assert_eq!(
            Value::parse("  Main St ", ValueType::String).unwrap(),
            Value::String("  Main St ".into())
        );
        assert_eq!(Value::parse(" ", ValueType::String).unwrap(), Value::String(" ".into()));
        assert_eq!(Value::parse("", ValueType::String).unwrap(), Value::Null);
        assert_eq!(
            Value::parse(" a; b ", ValueType::StringList).unwrap(),
            Value::StringList(vec![" a".into(), " b ".into()])
        );
        assert_eq!(
            Value::parse(" 1; 2 ", ValueType::Int64List).unwrap(),
            Value::Int64List(vec![1, 2])
        );
        assert_eq!(Value::parse(" true ", ValueType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(Value::parse("   ", ValueType::Int64).unwrap(), Value::Null);
    }

    #[test]
    fn from_json_accepts_numbers_and_strings() {
        assert_eq!(Value::from_json(&json!(1001), ValueType::Int64).unwrap(), Value::Int64(1001));
        assert_eq!(Value::from_json(&json!("1001"), ValueType::Int64).unwrap(), Value::Int64(1001));
        assert_eq!(
            Value::from_json(&json!(["a", "b"]), ValueType::StringList).unwrap(),
            Value::StringList(vec!["a".into(), "b".into()])
        );
        assert!(Value::from_json(&json!(1.5), ValueType::Int64).is_err());
        assert!(Value::from_json(&json!(4_294_967_296_i64), ValueType::Int32).is_err());
        assert!(Value::from_json(&json!(true), ValueType::String).is_err());
    }

    #[test]
    fn json_and_cell_rendering() {
        assert_eq!(Value::Bytes(b"hi".to_vec()).to_json(), json!("aGk="));
        assert_eq!(Value::Float(0.5).to_json(), json!(0.5));
        assert_eq!(Value::Null.to_json(), Json::Null);
        assert_eq!(Value::Int64List(vec![1, 2]).to_json(), json!([1, 2]));
        assert_eq!(Value::Int64List(vec![1, 2]).to_cell(), "1;2");
        assert_eq!(Value::String("a".into()).to_cell(), "a");
        assert_eq!(Value::Null.to_cell(), "");
        assert_eq!(Value::Null.value_type(), ValueType::Invalid);
    }
}
