//! Flat key-value codec shared by every stored record.
//!
//! Records are written to the realtime database as flat JSON objects with
//! camelCase keys. Reading is lenient: a missing or mistyped field falls
//! back to its type default. The field readers report which of the two
//! happened through [`Parsed`], so callers that care can tell an absent
//! value from a present one.

use serde_json::{Map, Value};
use thiserror::Error;

pub type RecordMap = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Unknown {kind} value: '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Outcome of reading one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// The field was present and well formed.
    Value(T),
    /// The field was absent or malformed; the type default was substituted.
    Default(T),
}

impl<T> Parsed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Parsed::Value(v) | Parsed::Default(v) => v,
        }
    }

    pub fn used_default(&self) -> bool {
        matches!(self, Parsed::Default(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            Parsed::Value(v) => Some(v),
            Parsed::Default(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        match self {
            Parsed::Value(v) => Parsed::Value(f(v)),
            Parsed::Default(v) => Parsed::Default(f(v)),
        }
    }
}

/// An enumeration stored under its symbolic name.
///
/// The first entry of `VARIANTS` is the lenient fallback.
pub trait SymbolicEnum: Sized + Copy + PartialEq + 'static {
    const KIND: &'static str;
    const VARIANTS: &'static [Self];

    fn name(&self) -> &'static str;

    /// Exact, case-sensitive decoding.
    fn from_name(name: &str) -> Result<Self, RecordError> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.name() == name)
            .ok_or_else(|| RecordError::UnknownVariant {
                kind: Self::KIND,
                value: name.to_string(),
            })
    }

    fn first_declared() -> Self {
        Self::VARIANTS[0]
    }
}

/// A record that persists as a flat key-value map.
pub trait Record: Sized {
    /// Identifier the record is stored under.
    fn key(&self) -> &str;

    fn to_map(&self) -> RecordMap;

    fn from_map(map: &RecordMap) -> Result<Self, RecordError>;

    fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    /// Decodes a raw snapshot. Anything that is not an object reads as an
    /// empty map.
    fn from_value(value: &Value) -> Result<Self, RecordError> {
        match value.as_object() {
            Some(map) => Self::from_map(map),
            None => Self::from_map(&RecordMap::new()),
        }
    }
}

pub fn read_string(map: &RecordMap, key: &str) -> Parsed<String> {
    match map.get(key) {
        Some(Value::String(s)) => Parsed::Value(s.clone()),
        Some(Value::Number(n)) => Parsed::Value(n.to_string()),
        Some(Value::Bool(b)) => Parsed::Value(b.to_string()),
        _ => Parsed::Default(String::new()),
    }
}

pub fn read_optional_string(map: &RecordMap, key: &str) -> Parsed<Option<String>> {
    match map.get(key) {
        Some(Value::String(s)) => Parsed::Value(Some(s.clone())),
        Some(Value::Null) => Parsed::Value(None),
        _ => Parsed::Default(None),
    }
}

pub fn read_i64(map: &RecordMap, key: &str) -> Parsed<i64> {
    match map.get(key) {
        Some(Value::Number(n)) => match n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)) {
            Some(v) => Parsed::Value(v),
            None => Parsed::Default(0),
        },
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(v) => Parsed::Value(v),
            Err(_) => Parsed::Default(0),
        },
        _ => Parsed::Default(0),
    }
}

pub fn read_f64(map: &RecordMap, key: &str) -> Parsed<f64> {
    match map.get(key) {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) => Parsed::Value(v),
            None => Parsed::Default(0.0),
        },
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Parsed::Value(v),
            _ => Parsed::Default(0.0),
        },
        _ => Parsed::Default(0.0),
    }
}

pub fn read_bool(map: &RecordMap, key: &str) -> Parsed<bool> {
    match map.get(key) {
        Some(Value::Bool(b)) => Parsed::Value(*b),
        Some(Value::String(s)) => match s.as_str() {
            "true" => Parsed::Value(true),
            "false" => Parsed::Value(false),
            _ => Parsed::Default(false),
        },
        _ => Parsed::Default(false),
    }
}

/// Lenient enum decoding: names match case-insensitively and anything else
/// becomes the first declared variant.
pub fn read_enum<E: SymbolicEnum>(map: &RecordMap, key: &str) -> Parsed<E> {
    let raw = match map.get(key) {
        Some(Value::String(s)) => s,
        _ => return Parsed::Default(E::first_declared()),
    };

    match E::VARIANTS
        .iter()
        .copied()
        .find(|variant| variant.name().eq_ignore_ascii_case(raw))
    {
        Some(variant) => Parsed::Value(variant),
        None => {
            tracing::debug!("Unrecognised {} '{}', using default", E::KIND, raw);
            Parsed::Default(E::first_declared())
        }
    }
}

/// Strict enum decoding; a missing field or unknown name is an error.
pub fn require_enum<E: SymbolicEnum>(map: &RecordMap, key: &'static str) -> Result<E, RecordError> {
    match map.get(key) {
        Some(Value::String(s)) => E::from_name(s),
        Some(other) => Err(RecordError::UnknownVariant {
            kind: E::KIND,
            value: other.to_string(),
        }),
        None => Err(RecordError::MissingField(key)),
    }
}

/// Decodes the children of a collection snapshot, dropping (and logging)
/// any child whose strict fields fail to decode.
pub fn decode_children<T: Record>(children: Vec<(String, Value)>) -> Vec<T> {
    children
        .into_iter()
        .filter_map(|(key, value)| match T::from_value(&value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping undecodable record {}: {}", key, e);
                None
            }
        })
        .collect()
}

pub fn optional_value(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}
