//! Purpose: Field value tagged union and record container for decoded frames.
//! Exports: `Value`, `Record`, `DATETIME_MARKER`.
//! Role: Serde boundary between the compact binary payload and typed fields.
//! Invariants: Timestamp sentinels are only expanded for top-level record fields.
//! Invariants: `Display` is the canonical textual rendering used for width estimation.
use std::fmt;

use bstr::ByteSlice;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

/// First element of the two-element payload entry that encodes an instant.
pub const DATETIME_MARKER: &str = "__datetime__";

const MAX_PREALLOC: usize = 4096;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Missing-value marker.
    Nil,
    Bool(bool),
    Int(i64),
    /// Unsigned integers that do not fit in `i64`.
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Timestamp(OffsetDateTime),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Looks up `key` in a `Map` value, comparing keys by equality.
    pub fn get_key(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(candidate, _)| candidate == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(value) => write!(f, "{value}"),
            Value::UInt(value) => write!(f, "{value}"),
            Value::Float(value) => write_float(*value, f),
            Value::Text(text) => f.write_str(text),
            Value::Bytes(bytes) => write!(f, "b'{}'", bytes.as_bstr()),
            Value::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Timestamp(ts) => write_timestamp(ts, f),
        }
    }
}

fn write_float(value: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_nan() {
        return f.write_str("nan");
    }
    if value.is_infinite() {
        return f.write_str(if value > 0.0 { "inf" } else { "-inf" });
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        return write!(f, "{value:.1}");
    }
    write!(f, "{value}")
}

fn write_timestamp(ts: &OffsetDateTime, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let layout = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let text = ts.format(layout).map_err(|_| fmt::Error)?;
    f.write_str(&text)?;
    let micros = ts.microsecond();
    if micros != 0 {
        write!(f, ".{micros:06}")?;
    }
    Ok(())
}

/// Epoch seconds for the sentinel pair: integral when whole, fractional otherwise.
pub(crate) fn epoch_seconds(ts: &OffsetDateTime) -> Value {
    if ts.nanosecond() == 0 {
        Value::Int(ts.unix_timestamp())
    } else {
        Value::Float(ts.unix_timestamp_nanos() as f64 / 1e9)
    }
}

/// Rebuilds an instant from sentinel epoch seconds, rounded to the microsecond.
pub(crate) fn timestamp_from_epoch(seconds: &Value) -> Result<OffsetDateTime, String> {
    match seconds {
        Value::Int(secs) => OffsetDateTime::from_unix_timestamp(*secs).map_err(|err| err.to_string()),
        Value::UInt(secs) => i64::try_from(*secs)
            .map_err(|err| err.to_string())
            .and_then(|secs| {
                OffsetDateTime::from_unix_timestamp(secs).map_err(|err| err.to_string())
            }),
        Value::Float(secs) if secs.is_finite() => {
            let micros = (secs * 1e6).round_ties_even();
            if micros.abs() >= i64::MAX as f64 {
                return Err("epoch seconds out of range".to_string());
            }
            let nanos = (micros as i64 as i128) * 1_000;
            OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|err| err.to_string())
        }
        other => Err(format!(
            "timestamp sentinel expects numeric epoch seconds, found {other}"
        )),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::UInt(value) => serializer.serialize_u64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Timestamp(ts) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(DATETIME_MARKER)?;
                seq.serialize_element(&epoch_seconds(ts))?;
                seq.end()
            }
        }
    }
}

struct ValueVisitor {
    expand_sentinel: bool,
}

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a compact binary value")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Int(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        Ok(i64::try_from(value)
            .map(Value::Int)
            .unwrap_or(Value::UInt(value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::Text(value))
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(value.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOC);
        let mut items = Vec::with_capacity(capacity);
        let Some(first) = seq.next_element::<Value>()? else {
            return Ok(Value::List(items));
        };
        // The sentinel decision is taken on the leading element; the pair
        // shape is confirmed once the array is exhausted.
        let sentinel = self.expand_sentinel && first.as_str() == Some(DATETIME_MARKER);
        items.push(first);
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        if sentinel && items.len() == 2 {
            return timestamp_from_epoch(&items[1])
                .map(Value::Timestamp)
                .map_err(de::Error::custom);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let capacity = map.size_hint().unwrap_or(0).min(MAX_PREALLOC);
        let mut entries = Vec::with_capacity(capacity);
        while let Some(entry) = map.next_entry::<Value, Value>()? {
            entries.push(entry);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor {
            expand_sentinel: false,
        })
    }
}

/// Deserializes one top-level record field, expanding a timestamp sentinel.
struct FieldSeed;

impl<'de> DeserializeSeed<'de> for FieldSeed {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor {
            expand_sentinel: true,
        })
    }
}

/// Ordered sequence of fields decoded from one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<Value>,
}

impl Record {
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.fields.get(idx)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<Value>> for Record {
    fn from(fields: Vec<Value>) -> Self {
        Self::new(fields)
    }
}

impl AsRef<[Value]> for Record {
    fn as_ref(&self) -> &[Value] {
        &self.fields
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.fields.len()))?;
        for field in &self.fields {
            seq.serialize_element(field)?;
        }
        seq.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of record fields")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Record, A::Error> {
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOC);
        let mut fields = Vec::with_capacity(capacity);
        while let Some(field) = seq.next_element_seed(FieldSeed)? {
            fields.push(field);
        }
        Ok(Record::new(fields))
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(RecordVisitor)
    }
}
