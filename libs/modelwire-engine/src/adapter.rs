//! Value adapter: moves typed records in and out of [`StructValue`] form
//! and decides which values count as absent.
//!
//! A field is written only when its value is present. Absent values are the
//! empty string, numeric zero, `false`, empty list or map, and `Empty`.
//! Timestamps are the exception: only `Empty` is absent, so the epoch itself
//! still travels. Nested structs are always present, even when every field
//! inside them is at its default.

use modelwire_api::error::CodecError;
use modelwire_api::record::{self, Record};
use modelwire_api::value::{StructValue, Value};

use crate::schema::{Schema, TypeSpec};

/// Value a field of type `spec` holds when nothing was assigned or decoded.
pub fn absent_value(spec: &TypeSpec) -> Value {
    match spec {
        TypeSpec::String => Value::String(String::new()),
        TypeSpec::I32 => Value::I32(0),
        TypeSpec::I64 => Value::I64(0),
        TypeSpec::Double => Value::Double(0.0),
        TypeSpec::Bool => Value::Bool(false),
        TypeSpec::List(_) => Value::List(Vec::new()),
        TypeSpec::Map(_) => Value::Map(Default::default()),
        TypeSpec::DateTime | TypeSpec::Enumeration(_) | TypeSpec::Struct(_) => Value::Empty,
    }
}

/// True when `value`, held by a field of type `spec`, is omitted from the
/// wire.
pub fn is_absent(spec: &TypeSpec, value: &Value) -> bool {
    match (spec, value) {
        (_, Value::Empty) => true,
        (TypeSpec::DateTime, _) => false,
        (_, Value::String(s)) => s.is_empty(),
        (_, Value::I32(n)) => *n == 0,
        (_, Value::I64(n)) => *n == 0,
        (_, Value::Double(x)) => *x == 0.0,
        (_, Value::Bool(b)) => !*b,
        (_, Value::List(items)) => items.is_empty(),
        (_, Value::Map(entries)) => entries.is_empty(),
        (_, Value::Struct(_)) => false,
    }
}

/// Snapshot `record` into the shape `schema` describes. Fields the record
/// does not expose take their absent value.
pub fn record_to_value<R: Record>(record: &R, schema: &Schema) -> StructValue {
    schema
        .fields()
        .map(|f| {
            let value = record
                .get_field(&f.name)
                .unwrap_or_else(|| absent_value(&f.ty));
            (f.name.clone(), value)
        })
        .collect()
}

/// Rebuild a typed record from decoded field values.
pub fn value_to_record<R: Record>(value: StructValue) -> Result<R, CodecError> {
    record::from_struct_value(value)
}
