//! Purpose: Convert records to and from the CLI's JSON representation.
//! Exports: `value_to_json`, `record_from_json`.
//! Role: Keeps JSON shape decisions out of the library kernels.
//! Invariants: Timestamps render as `{"$timestamp": RFC 3339}` and bytes as `{"$bytes": [..]}`,
//! and both parse back to the same `Value`.
use serde_json::{Map, Number, Value as Json, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use tabwire::api::{Error, ErrorKind, Record, Value};

const TIMESTAMP_KEY: &str = "$timestamp";
const BYTES_KEY: &str = "$bytes";

pub(crate) fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Bool(value) => Json::Bool(*value),
        Value::Int(value) => json!(value),
        Value::UInt(value) => json!(value),
        Value::Float(value) => Number::from_f64(*value)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(value.to_string())),
        Value::Text(text) => Json::String(text.clone()),
        Value::Bytes(bytes) => json!({ BYTES_KEY: bytes }),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = match key {
                    Value::Text(text) => text.clone(),
                    other => other.to_string(),
                };
                map.insert(key, value_to_json(value));
            }
            Json::Object(map)
        }
        Value::Timestamp(ts) => match ts.format(&Rfc3339) {
            Ok(text) => json!({ TIMESTAMP_KEY: text }),
            Err(_) => Json::Null,
        },
    }
}

pub(crate) fn record_from_json(json: &Json) -> Result<Record, Error> {
    let Json::Array(items) = json else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("record input must be a JSON array")
            .with_hint("Wrap the fields in [...], one element per field."));
    };
    items
        .iter()
        .map(value_from_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Record::new)
}

fn value_from_json(json: &Json) -> Result<Value, Error> {
    Ok(match json {
        Json::Null => Value::Nil,
        Json::Bool(value) => Value::Bool(*value),
        Json::Number(number) => number_from_json(number),
        Json::String(text) => Value::Text(text.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(value_from_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Json::Object(map) => {
            if let Some(tagged) = tagged_from_json(map)? {
                return Ok(tagged);
            }
            let entries = map
                .iter()
                .map(|(key, value)| Ok((Value::Text(key.clone()), value_from_json(value)?)))
                .collect::<Result<Vec<_>, Error>>()?;
            Value::Map(entries)
        }
    })
}

fn number_from_json(number: &Number) -> Value {
    if let Some(value) = number.as_i64() {
        Value::Int(value)
    } else if let Some(value) = number.as_u64() {
        Value::UInt(value)
    } else {
        Value::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

fn tagged_from_json(map: &Map<String, Json>) -> Result<Option<Value>, Error> {
    if map.len() != 1 {
        return Ok(None);
    }
    if let Some(Json::String(text)) = map.get(TIMESTAMP_KEY) {
        let ts = OffsetDateTime::parse(text, &Rfc3339).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid {TIMESTAMP_KEY} value {text:?}"))
                .with_hint("Use an RFC 3339 timestamp such as 2024-01-01T00:00:00Z.")
                .with_source(err)
        })?;
        return Ok(Some(Value::Timestamp(ts)));
    }
    if let Some(Json::Array(items)) = map.get(BYTES_KEY) {
        let bytes = items
            .iter()
            .map(|item| item.as_u64().and_then(|byte| u8::try_from(byte).ok()))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("{BYTES_KEY} must be an array of integers 0-255"))
            })?;
        return Ok(Some(Value::Bytes(bytes)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::{record_from_json, value_to_json};
    use serde_json::json;
    use tabwire::api::{ErrorKind, Value};
    use time::macros::datetime;

    #[test]
    fn tagged_values_round_trip() {
        let input = json!([
            1,
            "ada",
            {"$timestamp": "2024-01-01T00:00:00Z"},
            {"$bytes": [0, 255]},
            {"k": [true, null]},
            1.5
        ]);
        let record = record_from_json(&input).expect("record");
        assert_eq!(
            record.fields()[2],
            Value::Timestamp(datetime!(2024-01-01 00:00:00 UTC))
        );
        assert_eq!(record.fields()[3], Value::Bytes(vec![0, 255]));
        let back: Vec<_> = record.fields().iter().map(value_to_json).collect();
        assert_eq!(serde_json::Value::Array(back), input);
    }

    #[test]
    fn non_array_input_is_rejected() {
        let err = record_from_json(&json!({"a": 1})).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let err = record_from_json(&json!([{"$timestamp": "yesterday"}])).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn non_finite_floats_render_as_text() {
        assert_eq!(value_to_json(&Value::Float(f64::INFINITY)), json!("inf"));
    }
}
