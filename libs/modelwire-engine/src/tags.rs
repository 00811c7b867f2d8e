//! Type tag table.
//!
//! Maps every resolved field type to its wire type and carries the
//! per-type payload handlers the portable backend dispatches through.
//! Struct payloads recurse into [`portable`].

use std::collections::BTreeMap;
use std::sync::Arc;

use modelwire_api::error::CodecError;
use modelwire_api::schema::{LogicalType, WireType};
use modelwire_api::value::Value;

use crate::backend::portable;
use crate::cache::SchemaCache;
use crate::schema::TypeSpec;
use crate::wire::{WireReader, WireWriter};

pub fn wire_type(spec: &TypeSpec) -> WireType {
    match spec {
        TypeSpec::String | TypeSpec::Enumeration(_) => WireType::String,
        TypeSpec::I32 => WireType::I32,
        TypeSpec::I64 | TypeSpec::DateTime => WireType::I64,
        TypeSpec::Double => WireType::Double,
        TypeSpec::Bool => WireType::Bool,
        TypeSpec::Struct(_) => WireType::Struct,
        TypeSpec::List(_) => WireType::List,
        TypeSpec::Map(_) => WireType::Map,
    }
}

/// Lower a declared field type to its wire representation.
pub fn resolve(
    type_name: &str,
    field: &str,
    logical: &LogicalType,
    cache: &SchemaCache,
) -> Result<TypeSpec, CodecError> {
    Ok(match logical {
        LogicalType::String | LogicalType::Guid => TypeSpec::String,
        LogicalType::Integer => TypeSpec::I64,
        LogicalType::Int32 => TypeSpec::I32,
        LogicalType::Boolean => TypeSpec::Bool,
        LogicalType::Float => TypeSpec::Double,
        LogicalType::DateTime => TypeSpec::DateTime,
        LogicalType::Enumeration(registry) => TypeSpec::Enumeration(Arc::clone(registry)),
        LogicalType::Object(descriptor) => TypeSpec::Struct(cache.schema_for_shared(descriptor)?),
        LogicalType::List(element) => {
            TypeSpec::List(Box::new(resolve(type_name, field, element, cache)?))
        }
        LogicalType::Map { key, value } => {
            if !key.is_string_like() {
                return Err(CodecError::UnsupportedMapKey {
                    type_name: type_name.to_owned(),
                    field: field.to_owned(),
                });
            }
            TypeSpec::Map(Box::new(resolve(type_name, field, value, cache)?))
        }
    })
}

fn invalid(field: &str, spec: &TypeSpec, found: &Value) -> CodecError {
    CodecError::invalid_value(field, spec.to_string(), found.kind())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Write the payload of `value`, which must match `spec`.
pub fn write_payload(
    spec: &TypeSpec,
    value: &Value,
    w: &mut WireWriter,
    field: &str,
) -> Result<(), CodecError> {
    match (spec, value) {
        (TypeSpec::String, Value::String(s)) => w.write_string(s)?,
        (TypeSpec::Enumeration(registry), Value::String(s)) => {
            registry.check(s)?;
            w.write_string(s)?;
        }
        (TypeSpec::I32, Value::I32(n)) => w.write_i32(*n),
        (TypeSpec::I64 | TypeSpec::DateTime, Value::I64(n)) => w.write_i64(*n),
        (TypeSpec::Double, Value::Double(x)) => w.write_double(*x),
        (TypeSpec::Bool, Value::Bool(b)) => w.write_bool(*b),
        (TypeSpec::Struct(schema), Value::Struct(fields)) => {
            portable::write_struct(schema, fields, w)?;
        }
        (TypeSpec::List(element), Value::List(items)) => {
            w.write_list_header(element.wire_type(), items.len())?;
            for item in items {
                write_payload(element, item, w, field)?;
            }
        }
        (TypeSpec::Map(element), Value::Map(entries)) => {
            w.write_map_header(WireType::String, element.wire_type(), entries.len())?;
            for (key, item) in entries {
                w.write_string(key)?;
                write_payload(element, item, w, field)?;
            }
        }
        (spec, value) => return Err(invalid(field, spec, value)),
    }
    Ok(())
}

/// Read a payload of type `spec`. `field_id` names the enclosing field in
/// mismatch errors raised for container headers.
pub fn read_payload(
    spec: &TypeSpec,
    r: &mut WireReader<'_>,
    field_id: u16,
) -> Result<Value, CodecError> {
    Ok(match spec {
        TypeSpec::String => Value::String(r.read_string()?),
        TypeSpec::Enumeration(registry) => {
            let name = r.read_string()?;
            registry.check(&name)?;
            Value::String(name)
        }
        TypeSpec::I32 => Value::I32(r.read_i32()?),
        TypeSpec::I64 | TypeSpec::DateTime => Value::I64(r.read_i64()?),
        TypeSpec::Double => Value::Double(r.read_double()?),
        TypeSpec::Bool => Value::Bool(r.read_bool()?),
        TypeSpec::Struct(schema) => Value::Struct(portable::read_struct(schema, r)?),
        TypeSpec::List(element) => {
            let (found, count) = r.read_list_header()?;
            expect_wire(field_id, element.wire_type(), found)?;
            r.enter()?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_payload(element, r, field_id)?);
            }
            r.leave();
            Value::List(items)
        }
        TypeSpec::Map(element) => {
            let (key, found, count) = r.read_map_header()?;
            expect_wire(field_id, WireType::String, key)?;
            expect_wire(field_id, element.wire_type(), found)?;
            r.enter()?;
            let mut entries = BTreeMap::new();
            for _ in 0..count {
                let key = r.read_string()?;
                let item = read_payload(element, r, field_id)?;
                entries.insert(key, item);
            }
            r.leave();
            Value::Map(entries)
        }
    })
}

fn expect_wire(field_id: u16, expected: WireType, found: WireType) -> Result<(), CodecError> {
    if expected == found {
        Ok(())
    } else {
        Err(CodecError::TypeMismatch {
            field_id,
            expected,
            found,
        })
    }
}

/// Consume a payload of any wire type without materialising it.
pub fn skip_payload(wire: WireType, r: &mut WireReader<'_>) -> Result<(), CodecError> {
    match wire {
        WireType::Bool => r.skip(1),
        WireType::I32 => r.skip(4),
        WireType::I64 | WireType::Double => r.skip(8),
        WireType::String => r.skip_string(),
        WireType::Struct => {
            r.enter()?;
            while let Some((wire, _)) = r.read_field_header()? {
                skip_payload(wire, r)?;
            }
            r.leave();
            Ok(())
        }
        WireType::List => {
            let (element, count) = r.read_list_header()?;
            r.enter()?;
            for _ in 0..count {
                skip_payload(element, r)?;
            }
            r.leave();
            Ok(())
        }
        WireType::Map => {
            let (key, value, count) = r.read_map_header()?;
            r.enter()?;
            for _ in 0..count {
                skip_payload(key, r)?;
                skip_payload(value, r)?;
            }
            r.leave();
            Ok(())
        }
    }
}
