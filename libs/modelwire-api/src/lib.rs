// Derive output names `modelwire_api::...`; this alias makes those paths
// resolve inside this crate's own tests too.
extern crate self as modelwire_api;

pub mod enumeration;
pub mod error;
pub mod record;
pub mod schema;
pub mod value;

pub use enumeration::{EnumRegistry, Enumeration};
pub use error::CodecError;
pub use record::{DynamicRecord, FieldType, Identity, OptionalField, Record};
pub use schema::{FieldDescriptor, LogicalType, TypeDescriptor, WireType};
pub use value::{StructValue, Value};

pub use modelwire_derive::{Enumeration, Model};
