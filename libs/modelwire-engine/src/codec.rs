use std::sync::{Arc, OnceLock};

use modelwire_api::error::CodecError;
use modelwire_api::record::{DynamicRecord, Record};
use modelwire_api::schema::TypeDescriptor;
use modelwire_api::value::StructValue;

use crate::adapter;
use crate::backend::{Backend, Codec};
use crate::cache::SchemaCache;
use crate::config::{CodecConfig, Limits};
use crate::schema::Schema;

/// Entry point for encoding and decoding records.
///
/// Wraps one backend and a schema cache. Codecs are cheap to build and
/// share the global cache unless given their own.
pub struct ModelCodec {
    codec: Box<dyn Codec>,
    limits: Limits,
    cache: Arc<SchemaCache>,
}

impl ModelCodec {
    pub fn new(config: &CodecConfig) -> Self {
        Self::with_backend(config.backend, config.limits())
    }

    pub fn with_backend(backend: Backend, limits: Limits) -> Self {
        tracing::debug!(backend = %backend, "selected codec backend");
        Self {
            codec: backend.codec(limits),
            limits,
            cache: SchemaCache::global(),
        }
    }

    /// Force the reference backend, e.g. to compare output against the
    /// accelerated one.
    pub fn force_portable(self) -> Self {
        Self {
            codec: Backend::Portable.codec(self.limits),
            ..self
        }
    }

    pub fn with_cache(self, cache: Arc<SchemaCache>) -> Self {
        Self { cache, ..self }
    }

    pub fn backend(&self) -> Backend {
        self.codec.backend()
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Derive and cache the schema of `R` ahead of first use, surfacing
    /// any schema error early.
    pub fn register<R: Record>(&self) -> Result<Arc<Schema>, CodecError> {
        self.cache.schema_for_shared(&R::descriptor())
    }

    pub fn schema_of_descriptor(&self, descriptor: &TypeDescriptor) -> Result<Arc<Schema>, CodecError> {
        self.cache.schema_for(descriptor)
    }

    pub fn encode<R: Record>(&self, record: &R) -> Result<Vec<u8>, CodecError> {
        let schema = self.register::<R>()?;
        let value = adapter::record_to_value(record, &schema);
        self.codec.encode(&schema, &value)
    }

    pub fn decode<R: Record>(&self, data: &[u8]) -> Result<R, CodecError> {
        let schema = self.register::<R>()?;
        let value = self.codec.decode(&schema, data)?;
        adapter::value_to_record(value)
    }

    pub fn encode_value(
        &self,
        descriptor: &TypeDescriptor,
        value: &StructValue,
    ) -> Result<Vec<u8>, CodecError> {
        let schema = self.schema_of_descriptor(descriptor)?;
        self.codec.encode(&schema, value)
    }

    pub fn decode_value(
        &self,
        descriptor: &TypeDescriptor,
        data: &[u8],
    ) -> Result<StructValue, CodecError> {
        let schema = self.schema_of_descriptor(descriptor)?;
        self.codec.decode(&schema, data)
    }

    pub fn encode_dynamic(&self, record: &DynamicRecord) -> Result<Vec<u8>, CodecError> {
        self.encode_value(record.descriptor(), record.values())
    }

    pub fn decode_dynamic(
        &self,
        descriptor: Arc<TypeDescriptor>,
        data: &[u8],
    ) -> Result<DynamicRecord, CodecError> {
        let values = self.decode_value(&descriptor, data)?;
        Ok(DynamicRecord::from_parts(descriptor, values))
    }
}

impl Default for ModelCodec {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl std::fmt::Debug for ModelCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCodec")
            .field("backend", &self.backend())
            .field("limits", &self.limits)
            .finish()
    }
}

fn default_codec() -> &'static ModelCodec {
    static DEFAULT: OnceLock<ModelCodec> = OnceLock::new();
    DEFAULT.get_or_init(ModelCodec::default)
}

/// Encode with the default codec.
pub fn encode<R: Record>(record: &R) -> Result<Vec<u8>, CodecError> {
    default_codec().encode(record)
}

/// Decode with the default codec.
pub fn decode<R: Record>(data: &[u8]) -> Result<R, CodecError> {
    default_codec().decode(data)
}
