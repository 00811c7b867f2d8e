//! Accelerated backend.
//!
//! Works from the compiled layout every schema carries: pre-encoded field
//! headers, an absent-value template and the field list in wire order.
//! Encoding runs a sizing pass first, so the output is allocated exactly
//! once. Decoding works on a plain slice cursor and expects fields in
//! ascending id order, falling back to a search when the writer used a
//! different order.

use std::collections::BTreeMap;

use modelwire_api::error::CodecError;
use modelwire_api::schema::{STOP, WireType};
use modelwire_api::value::{StructValue, Value};

use crate::adapter;
use crate::backend::{Backend, Codec};
use crate::config::Limits;
use crate::schema::{Schema, TypeSpec};
use crate::wire::{FIELD_HEADER_LEN, LIST_HEADER_LEN, MAP_HEADER_LEN, len_prefix};

#[derive(Debug, Clone, Default)]
pub struct AcceleratedCodec {
    limits: Limits,
}

impl AcceleratedCodec {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }
}

impl Codec for AcceleratedCodec {
    fn backend(&self) -> Backend {
        Backend::Accelerated
    }

    fn encode(&self, schema: &Schema, value: &StructValue) -> Result<Vec<u8>, CodecError> {
        let len = struct_len(schema, value)?;
        let mut out = Vec::with_capacity(len);
        write_struct(schema, value, &mut out);
        debug_assert_eq!(out.len(), len);
        Ok(out)
    }

    fn decode(&self, schema: &Schema, data: &[u8]) -> Result<StructValue, CodecError> {
        let mut cursor = Cursor {
            buf: data,
            pos: 0,
            limits: self.limits,
            depth: 0,
        };
        cursor.read_struct(schema)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Encode
// ═══════════════════════════════════════════════════════════════

/// Exact encoded size of a struct. Also performs every check the write pass
/// relies on, in the same order the reference path raises them.
fn struct_len(schema: &Schema, value: &StructValue) -> Result<usize, CodecError> {
    let mut len = 1;
    for field in &schema.layout().fields {
        let Some(v) = value.get(&field.name) else {
            continue;
        };
        if adapter::is_absent(&field.ty, v) {
            continue;
        }
        len += FIELD_HEADER_LEN + payload_len(&field.ty, v, &field.name)?;
    }
    Ok(len)
}

fn payload_len(spec: &TypeSpec, value: &Value, field: &str) -> Result<usize, CodecError> {
    Ok(match (spec, value) {
        (TypeSpec::String, Value::String(s)) => {
            len_prefix(s.len())?;
            4 + s.len()
        }
        (TypeSpec::Enumeration(registry), Value::String(s)) => {
            registry.check(s)?;
            len_prefix(s.len())?;
            4 + s.len()
        }
        (TypeSpec::I32, Value::I32(_)) => 4,
        (TypeSpec::I64 | TypeSpec::DateTime, Value::I64(_)) | (TypeSpec::Double, Value::Double(_)) => 8,
        (TypeSpec::Bool, Value::Bool(_)) => 1,
        (TypeSpec::Struct(schema), Value::Struct(fields)) => struct_len(schema, fields)?,
        (TypeSpec::List(element), Value::List(items)) => {
            len_prefix(items.len())?;
            let mut len = LIST_HEADER_LEN;
            for item in items {
                len += payload_len(element, item, field)?;
            }
            len
        }
        (TypeSpec::Map(element), Value::Map(entries)) => {
            len_prefix(entries.len())?;
            let mut len = MAP_HEADER_LEN;
            for (key, item) in entries {
                len_prefix(key.len())?;
                len += 4 + key.len() + payload_len(element, item, field)?;
            }
            len
        }
        (spec, value) => {
            return Err(CodecError::invalid_value(field, spec.to_string(), value.kind()));
        }
    })
}

// Lengths and shapes below were validated by the sizing pass.

fn write_struct(schema: &Schema, value: &StructValue, out: &mut Vec<u8>) {
    for field in &schema.layout().fields {
        let Some(v) = value.get(&field.name) else {
            continue;
        };
        if adapter::is_absent(&field.ty, v) {
            continue;
        }
        out.extend_from_slice(&field.header);
        write_payload(&field.ty, v, out);
    }
    out.push(STOP);
}

fn write_len(len: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(&(len as i32).to_be_bytes());
}

fn write_str(s: &str, out: &mut Vec<u8>) {
    write_len(s.len(), out);
    out.extend_from_slice(s.as_bytes());
}

fn write_payload(spec: &TypeSpec, value: &Value, out: &mut Vec<u8>) {
    match (spec, value) {
        (_, Value::String(s)) => write_str(s, out),
        (_, Value::I32(n)) => out.extend_from_slice(&n.to_be_bytes()),
        (_, Value::I64(n)) => out.extend_from_slice(&n.to_be_bytes()),
        (_, Value::Double(x)) => out.extend_from_slice(&x.to_be_bytes()),
        (_, Value::Bool(b)) => out.push(u8::from(*b)),
        (TypeSpec::Struct(schema), Value::Struct(fields)) => write_struct(schema, fields, out),
        (TypeSpec::List(element), Value::List(items)) => {
            out.push(element.wire_type().tag());
            write_len(items.len(), out);
            for item in items {
                write_payload(element, item, out);
            }
        }
        (TypeSpec::Map(element), Value::Map(entries)) => {
            out.push(WireType::String.tag());
            out.push(element.wire_type().tag());
            write_len(entries.len(), out);
            for (key, item) in entries {
                write_str(key, out);
                write_payload(element, item, out);
            }
        }
        _ => {}
    }
}

// ═══════════════════════════════════════════════════════════════
//  Decode
// ═══════════════════════════════════════════════════════════════

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    limits: Limits,
    depth: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < n {
            return Err(CodecError::TruncatedBuffer {
                needed: n,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, CodecError> {
        Ok(self.array::<1>()?[0])
    }

    fn wire_type(&mut self) -> Result<WireType, CodecError> {
        let tag = self.byte()?;
        WireType::from_tag(tag).ok_or(CodecError::UnknownWireType(tag))
    }

    fn i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn len(&mut self, min_item: usize) -> Result<usize, CodecError> {
        let raw = self.i32()?;
        let len = usize::try_from(raw).map_err(|_| CodecError::NegativeLength(raw))?;
        if len > self.limits.max_collection_len {
            return Err(CodecError::LengthLimit {
                len,
                limit: self.limits.max_collection_len,
            });
        }
        let needed = len.saturating_mul(min_item);
        let remaining = self.buf.len() - self.pos;
        if remaining < needed {
            return Err(CodecError::TruncatedBuffer { needed, remaining });
        }
        Ok(len)
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let len = self.len(1)?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn enter(&mut self) -> Result<(), CodecError> {
        if self.depth >= self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.limits.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn field_header(&mut self) -> Result<Option<(WireType, u16)>, CodecError> {
        let tag = self.byte()?;
        if tag == STOP {
            return Ok(None);
        }
        let wire = WireType::from_tag(tag).ok_or(CodecError::UnknownWireType(tag))?;
        Ok(Some((wire, u16::from_be_bytes(self.array()?))))
    }

    fn read_struct(&mut self, schema: &Schema) -> Result<StructValue, CodecError> {
        self.enter()?;
        let layout = schema.layout();
        let mut out = layout.absent.clone();
        let mut next = 0;
        while let Some((wire, id)) = self.field_header()? {
            let Some(index) = layout.position(id, next) else {
                tracing::debug!(schema = %schema.name(), field_id = id, wire_type = %wire, "skipping unknown field");
                self.skip(wire)?;
                continue;
            };
            next = index + 1;
            let field = &layout.fields[index];
            if wire != field.wire {
                return Err(CodecError::TypeMismatch {
                    field_id: id,
                    expected: field.wire,
                    found: wire,
                });
            }
            let value = self.payload(&field.ty, id)?;
            if let Some(slot) = out.get_mut(&field.name) {
                *slot = value;
            }
        }
        self.depth -= 1;
        Ok(out)
    }

    fn expect(field_id: u16, expected: WireType, found: WireType) -> Result<(), CodecError> {
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

    fn payload(&mut self, spec: &TypeSpec, field_id: u16) -> Result<Value, CodecError> {
        Ok(match spec {
            TypeSpec::String => Value::String(self.string()?),
            TypeSpec::Enumeration(registry) => {
                let name = self.string()?;
                registry.check(&name)?;
                Value::String(name)
            }
            TypeSpec::I32 => Value::I32(self.i32()?),
            TypeSpec::I64 | TypeSpec::DateTime => Value::I64(self.i64()?),
            TypeSpec::Double => Value::Double(f64::from_be_bytes(self.array()?)),
            TypeSpec::Bool => Value::Bool(self.byte()? != 0),
            TypeSpec::Struct(schema) => Value::Struct(self.read_struct(schema)?),
            TypeSpec::List(element) => {
                let found = self.wire_type()?;
                let count = self.len(found.min_payload_len())?;
                Self::expect(field_id, element.wire_type(), found)?;
                self.enter()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.payload(element, field_id)?);
                }
                self.depth -= 1;
                Value::List(items)
            }
            TypeSpec::Map(element) => {
                let key = self.wire_type()?;
                let found = self.wire_type()?;
                let count = self.len(key.min_payload_len() + found.min_payload_len())?;
                Self::expect(field_id, WireType::String, key)?;
                Self::expect(field_id, element.wire_type(), found)?;
                self.enter()?;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    let key = self.string()?;
                    let item = self.payload(element, field_id)?;
                    entries.insert(key, item);
                }
                self.depth -= 1;
                Value::Map(entries)
            }
        })
    }

    fn skip(&mut self, wire: WireType) -> Result<(), CodecError> {
        match wire {
            WireType::Bool => self.take(1).map(drop),
            WireType::I32 => self.take(4).map(drop),
            WireType::I64 | WireType::Double => self.take(8).map(drop),
            WireType::String => {
                let len = self.len(1)?;
                self.take(len).map(drop)
            }
            WireType::Struct => {
                self.enter()?;
                while let Some((wire, _)) = self.field_header()? {
                    self.skip(wire)?;
                }
                self.depth -= 1;
                Ok(())
            }
            WireType::List => {
                let element = self.wire_type()?;
                let count = self.len(element.min_payload_len())?;
                self.enter()?;
                for _ in 0..count {
                    self.skip(element)?;
                }
                self.depth -= 1;
                Ok(())
            }
            WireType::Map => {
                let key = self.wire_type()?;
                let value = self.wire_type()?;
                let count = self.len(key.min_payload_len() + value.min_payload_len())?;
                self.enter()?;
                for _ in 0..count {
                    self.skip(key)?;
                    self.skip(value)?;
                }
                self.depth -= 1;
                Ok(())
            }
        }
    }
}
