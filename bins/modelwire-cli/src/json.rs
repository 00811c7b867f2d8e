//! JSON view of record values, guided by the wire schema.
//!
//! Datetimes are read from RFC 3339 text or epoch seconds and written back
//! as RFC 3339 in UTC. `null` in input means "leave the field absent".

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use modelwire_api::value::{StructValue, Value};
use modelwire_engine::{Schema, TypeSpec};
use serde_json::{Map, Number, Value as Json};

use crate::error::CliError;

pub fn to_struct(schema: &Schema, json: &Json, path: &str) -> Result<StructValue, CliError> {
    let Json::Object(object) = json else {
        return Err(CliError::json(
            path,
            format!("expected object for {}, found {}", schema.name(), kind(json)),
        ));
    };

    let mut out = StructValue::new();
    for (name, item) in object {
        let field = schema
            .field_by_name(name)
            .ok_or_else(|| CliError::json(path, format!("{} has no field '{name}'", schema.name())))?;
        if item.is_null() {
            continue;
        }
        out.set(name.clone(), to_value(&field.ty, item, &format!("{path}.{name}"))?);
    }
    Ok(out)
}

pub fn to_value(spec: &TypeSpec, json: &Json, path: &str) -> Result<Value, CliError> {
    let mismatch = || CliError::json(path, format!("expected {spec}, found {}", kind(json)));

    match spec {
        TypeSpec::String | TypeSpec::Enumeration(_) => json.as_str().map(Value::from).ok_or_else(mismatch),
        TypeSpec::I32 => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::I32)
            .ok_or_else(mismatch),
        TypeSpec::I64 => json.as_i64().map(Value::I64).ok_or_else(mismatch),
        TypeSpec::Double => json.as_f64().map(Value::Double).ok_or_else(mismatch),
        TypeSpec::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
        TypeSpec::DateTime => match json {
            Json::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|t| Value::I64(t.timestamp()))
                .map_err(|e| CliError::json(path, format!("bad timestamp '{text}': {e}"))),
            _ => json.as_i64().map(Value::I64).ok_or_else(mismatch),
        },
        TypeSpec::Struct(schema) => to_struct(schema, json, path).map(Value::Struct),
        TypeSpec::List(element) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| to_value(element, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        TypeSpec::Map(value) => {
            let object = json.as_object().ok_or_else(mismatch)?;
            object
                .iter()
                .map(|(key, item)| Ok((key.clone(), to_value(value, item, &format!("{path}.{key}"))?)))
                .collect::<Result<BTreeMap<_, _>, CliError>>()
                .map(Value::Map)
        }
    }
}

/// Every schema field appears in the output; `Empty` becomes `null`.
pub fn from_struct(schema: &Schema, value: &StructValue) -> Json {
    let mut object = Map::new();
    for field in schema.fields() {
        let item = value.get(&field.name).map_or(Json::Null, |v| from_value(&field.ty, v));
        object.insert(field.name.clone(), item);
    }
    Json::Object(object)
}

pub fn from_value(spec: &TypeSpec, value: &Value) -> Json {
    match (spec, value) {
        (_, Value::Empty) => Json::Null,
        (TypeSpec::DateTime, Value::I64(secs)) => DateTime::<Utc>::from_timestamp(*secs, 0)
            .map_or(Json::from(*secs), |t| {
                Json::String(t.to_rfc3339_opts(SecondsFormat::Secs, true))
            }),
        (TypeSpec::Struct(schema), Value::Struct(inner)) => from_struct(schema, inner),
        (TypeSpec::List(element), Value::List(items)) => {
            Json::Array(items.iter().map(|item| from_value(element, item)).collect())
        }
        (TypeSpec::Map(spec), Value::Map(entries)) => Json::Object(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), from_value(spec, item)))
                .collect(),
        ),
        (_, other) => untyped(other),
    }
}

fn untyped(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(s.clone()),
        Value::I32(n) => Json::from(*n),
        Value::I64(n) => Json::from(*n),
        // NaN and infinities have no JSON form
        Value::Double(x) => Number::from_f64(*x).map_or(Json::Null, Json::Number),
        Value::Bool(b) => Json::Bool(*b),
        Value::Struct(inner) => Json::Object(inner.iter().map(|(k, v)| (k.clone(), untyped(v))).collect()),
        Value::List(items) => Json::Array(items.iter().map(untyped).collect()),
        Value::Map(entries) => Json::Object(entries.iter().map(|(k, v)| (k.clone(), untyped(v))).collect()),
        Value::Empty => Json::Null,
    }
}

fn kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
