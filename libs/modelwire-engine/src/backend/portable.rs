//! Reference backend. Walks the schema field by field and dispatches every
//! payload through the type tag table.

use modelwire_api::error::CodecError;
use modelwire_api::value::{StructValue, Value};

use crate::adapter;
use crate::backend::{Backend, Codec};
use crate::config::Limits;
use crate::schema::Schema;
use crate::tags;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, Default)]
pub struct PortableCodec {
    limits: Limits,
}

impl PortableCodec {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }
}

impl Codec for PortableCodec {
    fn backend(&self) -> Backend {
        Backend::Portable
    }

    fn encode(&self, schema: &Schema, value: &StructValue) -> Result<Vec<u8>, CodecError> {
        let mut w = WireWriter::new();
        write_struct(schema, value, &mut w)?;
        Ok(w.into_vec())
    }

    fn decode(&self, schema: &Schema, data: &[u8]) -> Result<StructValue, CodecError> {
        let mut r = WireReader::new(data, self.limits);
        read_struct(schema, &mut r)
    }
}

/// Write every present field of `value` in ascending id order, then STOP.
pub(crate) fn write_struct(
    schema: &Schema,
    value: &StructValue,
    w: &mut WireWriter,
) -> Result<(), CodecError> {
    for field in schema.fields() {
        let Some(field_value) = value.get(&field.name) else {
            continue;
        };
        if adapter::is_absent(&field.ty, field_value) {
            continue;
        }
        w.write_field_header(field.ty.wire_type(), field.id);
        tags::write_payload(&field.ty, field_value, w, &field.name)?;
    }
    w.write_stop();
    Ok(())
}

/// Read one struct. Fields missing from the buffer hold their absent value;
/// fields the schema does not know are skipped.
pub(crate) fn read_struct(schema: &Schema, r: &mut WireReader<'_>) -> Result<StructValue, CodecError> {
    r.enter()?;
    let mut out = schema.absent_value();
    while let Some((wire, id)) = r.read_field_header()? {
        let Some(field) = schema.field(id) else {
            tracing::debug!(schema = %schema.name(), field_id = id, wire_type = %wire, "skipping unknown field");
            tags::skip_payload(wire, r)?;
            continue;
        };
        let expected = field.ty.wire_type();
        if wire != expected {
            return Err(CodecError::TypeMismatch {
                field_id: id,
                expected,
                found: wire,
            });
        }
        let value: Value = tags::read_payload(&field.ty, r, id)?;
        out.set(field.name.as_str(), value);
    }
    r.leave();
    Ok(out)
}
