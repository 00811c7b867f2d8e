use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::enumeration::Enumeration;
use crate::error::CodecError;
use crate::schema::{IDENTITY_FIELDS, LogicalType, TypeDescriptor};
use crate::value::{StructValue, Value};

// ═══════════════════════════════════════════════════════════════
//  Record
// ═══════════════════════════════════════════════════════════════

/// A typed record the codec can encode and decode.
///
/// Implemented by `#[derive(Model)]`. Field access goes by name so the
/// engine can walk any record through its schema.
pub trait Record: Default + 'static {
    /// Declared shape of this type. Built once and shared.
    fn descriptor() -> Arc<TypeDescriptor>;

    /// Current value of a declared or identity field.
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Assign a declared or identity field. Unknown names are ignored.
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), CodecError>;

    fn identity(&self) -> Option<&Identity> {
        None
    }
}

/// Identity fields shared by every record type (wire ids 1 to 4).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identity {
    pub guid: String,
    pub version: String,
    pub creation_date: String,
    pub base_version: String,
}

impl Identity {
    pub fn new(guid: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Look up an identity field by its wire name.
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "guid" => Some(&self.guid),
            "version" => Some(&self.version),
            "creationdate" => Some(&self.creation_date),
            "_baseversion" => Some(&self.base_version),
            _ => None,
        }
    }

    /// Assign an identity field by wire name. Returns false for any other name.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "guid" => &mut self.guid,
            "version" => &mut self.version,
            "creationdate" => &mut self.creation_date,
            "_baseversion" => &mut self.base_version,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Two identities denote the same version of the same object when both
    /// carry a guid and a version and the pairs match.
    pub fn same_version(&self, other: &Identity) -> bool {
        !self.guid.is_empty()
            && !self.version.is_empty()
            && self.guid == other.guid
            && self.version == other.version
    }

    #[doc(hidden)]
    pub fn get_value(&self, field: &str) -> Option<Value> {
        self.get(field).map(|s| Value::String(s.to_owned()))
    }

    #[doc(hidden)]
    pub fn set_value(&mut self, field: &str, value: Value) -> Result<(), CodecError> {
        let value = String::from_value(value).map_err(|e| e.with_context(field))?;
        self.set(field, value);
        Ok(())
    }
}

/// Snapshot a record's identity and declared fields into a [`StructValue`].
pub fn to_struct_value<R: Record>(record: &R) -> StructValue {
    let descriptor = R::descriptor();
    IDENTITY_FIELDS
        .iter()
        .copied()
        .chain(descriptor.fields.iter().map(|f| f.name.as_str()))
        .filter_map(|name| record.get_field(name).map(|v| (name.to_owned(), v)))
        .collect()
}

/// Build a record from field values. `Empty` placeholders leave the
/// field at its default.
pub fn from_struct_value<R: Record>(value: StructValue) -> Result<R, CodecError> {
    let mut record = R::default();
    for (name, field) in value {
        if field.is_empty_placeholder() {
            continue;
        }
        record.set_field(&name, field)?;
    }
    Ok(record)
}

/// Compare two records by their declared fields only, ignoring identity.
pub fn content_eq<R: Record>(a: &R, b: &R) -> bool {
    R::descriptor()
        .fields
        .iter()
        .all(|f| a.get_field(&f.name) == b.get_field(&f.name))
}

fn mismatch(expected: &str, found: &Value) -> CodecError {
    CodecError::invalid_value("value", expected, found.kind())
}

// ═══════════════════════════════════════════════════════════════
//  Field types
// ═══════════════════════════════════════════════════════════════

/// Rust type usable as a record field.
pub trait FieldType: Sized {
    fn logical_type() -> LogicalType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, CodecError>;
}

/// Type that may be held as `Option<T>`, where `None` travels as
/// [`Value::Empty`] and is omitted from the wire.
pub trait OptionalField: Sized {
    fn logical_type() -> LogicalType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, CodecError>;
}

impl<T: OptionalField> FieldType for Option<T> {
    fn logical_type() -> LogicalType {
        T::logical_type()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Empty,
        }
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Empty => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FieldType for String {
    fn logical_type() -> LogicalType {
        LogicalType::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Empty => Ok(String::new()),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FieldType for i64 {
    fn logical_type() -> LogicalType {
        LogicalType::Integer
    }

    fn to_value(&self) -> Value {
        Value::I64(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::I64(n) => Ok(n),
            Value::I32(n) => Ok(i64::from(n)),
            Value::Empty => Ok(0),
            other => Err(mismatch("i64", &other)),
        }
    }
}

impl FieldType for i32 {
    fn logical_type() -> LogicalType {
        LogicalType::Int32
    }

    fn to_value(&self) -> Value {
        Value::I32(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::I32(n) => Ok(n),
            Value::Empty => Ok(0),
            other => Err(mismatch("i32", &other)),
        }
    }
}

impl FieldType for f64 {
    fn logical_type() -> LogicalType {
        LogicalType::Float
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Double(x) => Ok(x),
            Value::Empty => Ok(0.0),
            other => Err(mismatch("double", &other)),
        }
    }
}

impl FieldType for bool {
    fn logical_type() -> LogicalType {
        LogicalType::Boolean
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Empty => Ok(false),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn logical_type() -> LogicalType {
        LogicalType::list(T::logical_type())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldType::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Empty => Ok(Vec::new()),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: FieldType> FieldType for BTreeMap<String, T> {
    fn logical_type() -> LogicalType {
        LogicalType::dict(T::logical_type())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, T::from_value(v)?)))
                .collect(),
            Value::Empty => Ok(BTreeMap::new()),
            other => Err(mismatch("map", &other)),
        }
    }
}

impl<T: FieldType> FieldType for HashMap<String, T> {
    fn logical_type() -> LogicalType {
        LogicalType::dict(T::logical_type())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, T::from_value(v)?)))
                .collect(),
            Value::Empty => Ok(HashMap::new()),
            other => Err(mismatch("map", &other)),
        }
    }
}

/// Timestamps travel as whole seconds since the epoch. Sub-second
/// precision is dropped (floored) on the way out.
impl OptionalField for DateTime<Utc> {
    fn logical_type() -> LogicalType {
        LogicalType::DateTime
    }

    fn to_value(&self) -> Value {
        Value::I64(self.timestamp())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::I64(secs) => DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| CodecError::invalid_value("value", "timestamp in range", secs.to_string())),
            other => Err(mismatch("i64 timestamp", &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers called from derive output
// ---------------------------------------------------------------------------

#[doc(hidden)]
pub fn model_to_value<M: Record>(model: &M) -> Value {
    Value::Struct(to_struct_value(model))
}

#[doc(hidden)]
pub fn model_from_value<M: Record>(value: Value) -> Result<M, CodecError> {
    match value {
        Value::Struct(fields) => from_struct_value(fields),
        Value::Empty => Ok(M::default()),
        other => Err(mismatch("struct", &other)),
    }
}

#[doc(hidden)]
pub fn enum_to_value<E: Enumeration>(member: &E) -> Value {
    Value::String(member.name().to_owned())
}

#[doc(hidden)]
pub fn enum_from_value<E: Enumeration>(value: Value) -> Result<E, CodecError> {
    match value {
        Value::String(name) => E::from_name(&name).ok_or_else(|| CodecError::UnknownEnumMember {
            enumeration: E::registry().name().to_owned(),
            name,
        }),
        other => Err(mismatch("enum member name", &other)),
    }
}

// ═══════════════════════════════════════════════════════════════
//  DynamicRecord
// ═══════════════════════════════════════════════════════════════

/// Record whose shape is only known at runtime, e.g. loaded from config.
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    descriptor: Arc<TypeDescriptor>,
    values: StructValue,
}

impl DynamicRecord {
    /// New instance holding the declared defaults.
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        let values = descriptor
            .fields
            .iter()
            .filter_map(|f| f.default.clone().map(|d| (f.name.clone(), d)))
            .collect();
        Self { descriptor, values }
    }

    pub fn from_parts(descriptor: Arc<TypeDescriptor>, values: StructValue) -> Self {
        Self { descriptor, values }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Assign a declared or identity field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), CodecError> {
        if !IDENTITY_FIELDS.contains(&name) && self.descriptor.get(name).is_none() {
            return Err(CodecError::invalid_value(
                name,
                format!("a field of '{}'", self.descriptor.name),
                "undeclared field",
            ));
        }
        self.values.set(name, value);
        Ok(())
    }

    pub fn values(&self) -> &StructValue {
        &self.values
    }

    pub fn into_values(self) -> StructValue {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Enumeration, Model};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Enumeration)]
    enum Size {
        #[default]
        Small,
        #[member(name = "XL")]
        ExtraLarge,
    }

    #[derive(Debug, Clone, Default, PartialEq, Model)]
    struct Address {
        #[field(id = 1)]
        city: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Model)]
    #[model(name = "Person")]
    struct Person {
        #[model(identity)]
        identity: Identity,
        #[field(id = 1)]
        name: String,
        #[field(id = 2)]
        age: i64,
        #[field(id = 3)]
        size: Size,
        #[field(id = 4)]
        home: Option<Address>,
        #[field(id = 5)]
        tags: Vec<String>,
        cache_hits: u32,
    }

    #[test]
    fn derived_descriptor_lists_declared_fields() {
        let desc = Person::descriptor();
        assert_eq!(desc.name, "Person");
        let names: Vec<_> = desc.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "age", "size", "home", "tags"]);
        assert!(Arc::ptr_eq(&desc, &Person::descriptor()));
        assert!(matches!(desc.get("home").map(|f| &f.logical_type), Some(LogicalType::Object(_))));
    }

    #[test]
    fn get_and_set_by_name() {
        let mut p = Person::default();
        p.set_field("name", Value::from("Ada")).unwrap();
        p.set_field("size", Value::from("XL")).unwrap();
        p.set_field("guid", Value::from("g-1")).unwrap();

        assert_eq!(p.name, "Ada");
        assert_eq!(p.size, Size::ExtraLarge);
        assert_eq!(p.identity.guid, "g-1");
        assert_eq!(p.get_field("home"), Some(Value::Empty));
        assert_eq!(p.get_field("cache_hits"), None);
    }

    #[test]
    fn unknown_enum_name_is_rejected() {
        let mut p = Person::default();
        let err = p.set_field("size", Value::from("huge")).unwrap_err();
        assert_eq!(
            err.root(),
            &CodecError::UnknownEnumMember {
                enumeration: "Size".into(),
                name: "huge".into(),
            }
        );
    }

    #[test]
    fn struct_value_round_trip() {
        let p = Person {
            identity: Identity::new("g", "v1"),
            name: "Ada".into(),
            age: 36,
            home: Some(Address { city: "London".into() }),
            tags: vec!["x".into()],
            ..Person::default()
        };
        let value = to_struct_value(&p);
        assert_eq!(value.get("guid"), Some(&Value::from("g")));
        assert_eq!(
            value.get("home"),
            Some(&Value::Struct(StructValue::new().with("city", "London")))
        );
        let back: Person = from_struct_value(value).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn content_eq_ignores_identity() {
        let a = Person {
            identity: Identity::new("g1", "v1"),
            name: "x".into(),
            ..Person::default()
        };
        let mut b = a.clone();
        b.identity = Identity::new("g2", "v7");
        assert!(content_eq(&a, &b));
        b.age = 1;
        assert!(!content_eq(&a, &b));
    }

    #[test]
    fn same_version_needs_guid_and_version() {
        let a = Identity::new("g", "1");
        assert!(a.same_version(&Identity::new("g", "1")));
        assert!(!a.same_version(&Identity::new("g", "2")));
        assert!(!Identity::default().same_version(&Identity::default()));
    }

    #[test]
    fn datetime_drops_sub_second_precision() {
        let t = DateTime::from_timestamp(1_700_000_000, 999_000_000).unwrap();
        let v = OptionalField::to_value(&t);
        assert_eq!(v, Value::I64(1_700_000_000));
        let back = <DateTime<Utc> as OptionalField>::from_value(v).unwrap();
        assert_eq!(back.timestamp(), t.timestamp());
        assert_ne!(back, t);
    }

    #[test]
    fn dynamic_record_rejects_undeclared_fields() {
        let desc = Arc::new(
            TypeDescriptor::new("Thing")
                .with_field(crate::FieldDescriptor::new("n", 1, LogicalType::Integer).with_default(Value::I64(5))),
        );
        let mut rec = DynamicRecord::new(desc);
        assert_eq!(rec.get("n"), Some(&Value::I64(5)));
        assert!(rec.set("guid", "abc").is_ok());
        assert!(rec.set("other", 1i64).is_err());
    }
}
