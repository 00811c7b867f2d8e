//! Wire schema derived from a [`TypeDescriptor`].
//!
//! A schema is a sparse table indexed by wire id. Ids 1 to 4 hold the
//! identity fields, declared fields sit at their declared id plus
//! [`ID_OFFSET`]. Slot 0 is always empty.
//!
//! Each schema also carries its compiled layout, built on first use and read
//! by both backends.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use modelwire_api::enumeration::EnumRegistry;
use modelwire_api::error::CodecError;
use modelwire_api::schema::{ID_OFFSET, IDENTITY_FIELDS, LogicalType, TypeDescriptor, WireType};
use modelwire_api::value::StructValue;

use crate::adapter;
use crate::cache::SchemaCache;
use crate::tags;
use crate::wire::FIELD_HEADER_LEN;

/// Resolved type of a schema slot.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    String,
    I32,
    I64,
    Double,
    Bool,
    /// Epoch seconds on the wire; absent value is `Empty`.
    DateTime,
    /// Member name on the wire, checked against the registry.
    Enumeration(Arc<EnumRegistry>),
    Struct(Arc<Schema>),
    List(Box<TypeSpec>),
    /// String-keyed map.
    Map(Box<TypeSpec>),
}

impl TypeSpec {
    pub fn wire_type(&self) -> WireType {
        tags::wire_type(self)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime => f.write_str("datetime"),
            Self::Enumeration(registry) => write!(f, "enum:{}", registry.name()),
            Self::Struct(schema) => write!(f, "struct:{}", schema.name()),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Map(value) => write!(f, "map<string,{value}>"),
            scalar => f.write_str(scalar.wire_type().name()),
        }
    }
}

/// One slot of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Wire id, offset already applied.
    pub id: u16,
    pub name: String,
    pub ty: TypeSpec,
}

pub struct Schema {
    name: String,
    slots: Vec<Option<FieldSpec>>,
    layout: OnceLock<Layout>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field at a wire id.
    pub fn field(&self, id: u16) -> Option<&FieldSpec> {
        self.slots.get(usize::from(id)).and_then(Option::as_ref)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().find(|f| f.name == name)
    }

    /// Fields in ascending id order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.slots.iter().flatten()
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.fields().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest wire id in use.
    pub fn max_id(&self) -> u16 {
        u16::try_from(self.slots.len().saturating_sub(1)).unwrap_or(u16::MAX)
    }

    /// Struct holding every field's absent value. Decoding starts here, so
    /// a field missing from the buffer reads back as absent, never as a
    /// declared default.
    pub fn absent_value(&self) -> StructValue {
        self.layout().absent.clone()
    }

    pub(crate) fn layout(&self) -> &Layout {
        self.layout.get_or_init(|| Layout::compile(self))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.slots == other.slots
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish()
    }
}

/// Compiled form of a schema: fields in wire order with pre-encoded headers,
/// and the absent-value template decoding starts from.
#[derive(Debug)]
pub(crate) struct Layout {
    pub(crate) fields: Vec<FieldLayout>,
    pub(crate) absent: StructValue,
}

#[derive(Debug)]
pub(crate) struct FieldLayout {
    pub(crate) header: [u8; FIELD_HEADER_LEN],
    pub(crate) id: u16,
    pub(crate) wire: WireType,
    pub(crate) name: String,
    pub(crate) ty: TypeSpec,
}

impl Layout {
    fn compile(schema: &Schema) -> Self {
        let fields = schema
            .fields()
            .map(|f| {
                let wire = f.ty.wire_type();
                let [hi, lo] = f.id.to_be_bytes();
                FieldLayout {
                    header: [wire.tag(), hi, lo],
                    id: f.id,
                    wire,
                    name: f.name.clone(),
                    ty: f.ty.clone(),
                }
            })
            .collect();
        let absent = schema
            .fields()
            .map(|f| (f.name.clone(), adapter::absent_value(&f.ty)))
            .collect();
        Self { fields, absent }
    }

    /// Index of the field with wire id `id`, trying `hint` first.
    pub(crate) fn position(&self, id: u16, hint: usize) -> Option<usize> {
        match self.fields.get(hint) {
            Some(f) if f.id == id => Some(hint),
            _ => self.fields.binary_search_by_key(&id, |f| f.id).ok(),
        }
    }
}

/// Derive the schema of `descriptor`. Nested object types are resolved
/// through `cache`, so each of them is derived at most once.
pub fn build(descriptor: &TypeDescriptor, cache: &SchemaCache) -> Result<Schema, CodecError> {
    let type_name = descriptor.name.as_str();

    let guid = LogicalType::Guid;
    let text = LogicalType::String;

    let mut declared: Vec<(u16, &str, &LogicalType)> = Vec::new();
    for (id, name) in (1u16..).zip(IDENTITY_FIELDS) {
        let ty = if name == "creationdate" { &text } else { &guid };
        declared.push((id, name, ty));
    }

    let mut names: HashSet<&str> = HashSet::new();
    for field in &descriptor.fields {
        if IDENTITY_FIELDS.contains(&field.name.as_str()) {
            return Err(CodecError::conflict(
                type_name,
                format!("field '{}' shadows a reserved identity field", field.name),
            ));
        }
        if !names.insert(field.name.as_str()) {
            return Err(CodecError::conflict(
                type_name,
                format!("field '{}' declared twice", field.name),
            ));
        }
        if field.id == 0 {
            return Err(CodecError::conflict(
                type_name,
                format!("field '{}': ids start at 1", field.name),
            ));
        }
        let id = field.id.checked_add(ID_OFFSET).ok_or_else(|| {
            CodecError::conflict(
                type_name,
                format!("field '{}': id {} is out of range", field.name, field.id),
            )
        })?;
        declared.push((id, field.name.as_str(), &field.logical_type));
    }

    declared.sort_by_key(|(id, ..)| *id);

    let mut slots: Vec<Option<FieldSpec>> = vec![None];
    for (id, name, logical) in declared {
        let index = usize::from(id);
        if index < slots.len() {
            let previous = slots
                .get(index)
                .and_then(Option::as_ref)
                .map(|f| f.name.as_str())
                .unwrap_or_default();
            return Err(CodecError::conflict(
                type_name,
                format!(
                    "field id {} used by both '{previous}' and '{name}'",
                    id - ID_OFFSET
                ),
            ));
        }
        slots.resize(index, None);
        let ty = tags::resolve(type_name, name, logical, cache)?;
        slots.push(Some(FieldSpec {
            id,
            name: name.to_owned(),
            ty,
        }));
    }

    tracing::info!(type_name = %descriptor.name, fields = slots.iter().flatten().count(), "generated schema");

    Ok(Schema {
        name: descriptor.name.clone(),
        slots,
        layout: OnceLock::new(),
    })
}
