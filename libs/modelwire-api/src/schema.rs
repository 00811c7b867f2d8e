use std::fmt;
use std::sync::Arc;

use crate::enumeration::EnumRegistry;
use crate::value::Value;

/// Terminator byte closing every struct on the wire.
pub const STOP: u8 = 0;

/// Offset added to every declared field id. Ids `1..=4` stay reserved for
/// the identity fields.
pub const ID_OFFSET: u16 = 10;

/// Identity fields carried by every record type, in reserved-id order.
/// `guid` has id 1, `_baseversion` id 4. All of them travel as strings.
pub const IDENTITY_FIELDS: [&str; 4] = ["guid", "version", "creationdate", "_baseversion"];

/// Tag that tells a reader how a payload is framed.
///
/// Tag values follow the Thrift binary protocol.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireType {
    Bool = 2,
    Double = 4,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    List = 15,
}

impl WireType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            2 => Self::Bool,
            4 => Self::Double,
            8 => Self::I32,
            10 => Self::I64,
            11 => Self::String,
            12 => Self::Struct,
            13 => Self::Map,
            15 => Self::List,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Smallest number of bytes a payload of this type occupies. Used to
    /// reject element counts that cannot possibly fit the remaining buffer.
    pub fn min_payload_len(self) -> usize {
        match self {
            Self::Bool => 1,
            Self::I32 | Self::String => 4,
            Self::Double | Self::I64 => 8,
            Self::Struct => 1,
            Self::List => 5,
            Self::Map => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Double => "double",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::String => "string",
            Self::Struct => "struct",
            Self::Map => "map",
            Self::List => "list",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field type as declared by a record definition.
///
/// This is the language-level view. The engine lowers it to wire types when
/// it derives a schema.
#[derive(Debug, Clone)]
pub enum LogicalType {
    String,
    /// Opaque identifier. Travels as a string.
    Guid,
    /// 64-bit integer.
    Integer,
    Int32,
    Boolean,
    Float,
    /// Point in time, carried as whole seconds since the Unix epoch.
    DateTime,
    Enumeration(Arc<EnumRegistry>),
    Object(Arc<TypeDescriptor>),
    List(Box<LogicalType>),
    /// Keyed mapping. Only string keys can be encoded; any other key type is
    /// rejected when the schema is derived.
    Map {
        key: Box<LogicalType>,
        value: Box<LogicalType>,
    },
}

impl LogicalType {
    pub fn list(element: LogicalType) -> Self {
        Self::List(Box::new(element))
    }

    /// String-keyed mapping.
    pub fn dict(value: LogicalType) -> Self {
        Self::map(LogicalType::String, value)
    }

    pub fn map(key: LogicalType, value: LogicalType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn is_string_like(&self) -> bool {
        matches!(self, Self::String | Self::Guid)
    }

    /// True when both types lower to the same wire shape. Nested objects
    /// compare by shape, enumerations by member list.
    pub fn same_shape(&self, other: &LogicalType) -> bool {
        match (self, other) {
            (Self::Enumeration(a), Self::Enumeration(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b) || a.same_shape(b),
            (Self::List(a), Self::List(b)) => a.same_shape(b),
            (Self::Map { key: ka, value: va }, Self::Map { key: kb, value: vb }) => {
                ka.same_shape(kb) && va.same_shape(vb)
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Guid => f.write_str("guid"),
            Self::Integer => f.write_str("integer"),
            Self::Int32 => f.write_str("int32"),
            Self::Boolean => f.write_str("boolean"),
            Self::Float => f.write_str("float"),
            Self::DateTime => f.write_str("datetime"),
            Self::Enumeration(registry) => write!(f, "enum:{}", registry.name()),
            Self::Object(descriptor) => write!(f, "object:{}", descriptor.name),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Map { key, value } => write!(f, "map<{key},{value}>"),
        }
    }
}

/// A single declared field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    /// Declared id, before [`ID_OFFSET`] is applied.
    pub id: u16,
    pub logical_type: LogicalType,
    /// Value a freshly created instance holds. `None` means the type's
    /// absent value.
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, id: u16, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            id,
            logical_type,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Declared shape of a record type: its name and user fields.
///
/// Identity fields are implicit and never listed here.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(self, name: impl Into<String>, id: u16, logical_type: LogicalType) -> Self {
        self.with_field(FieldDescriptor::new(name, id, logical_type))
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True when `other` declares the same fields with the same ids and
    /// types, in the same order. Defaults are not compared.
    pub fn same_shape(&self, other: &TypeDescriptor) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| {
                a.name == b.name && a.id == b.id && a.logical_type.same_shape(&b.logical_type)
            })
    }
}
