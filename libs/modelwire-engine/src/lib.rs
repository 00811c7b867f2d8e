pub mod adapter;
pub mod backend;
pub mod cache;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod schema;
pub mod tags;
pub mod wire;

pub use backend::{Backend, Codec};
pub use cache::SchemaCache;
pub use catalog::TypeCatalog;
pub use codec::{ModelCodec, decode, encode};
pub use config::{CodecConfig, Limits, ModelwireConfig};
pub use error::EngineError;
pub use schema::{FieldSpec, Schema, TypeSpec};
