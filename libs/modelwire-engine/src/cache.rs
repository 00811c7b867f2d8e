use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use modelwire_api::error::CodecError;
use modelwire_api::schema::TypeDescriptor;

use crate::schema::{self, Schema};

/// One derived schema and the descriptor it was derived from.
#[derive(Debug)]
struct Entry {
    descriptor: Arc<TypeDescriptor>,
    schema: Arc<Schema>,
}

impl Entry {
    /// The entry keeps its descriptor alive, so a pointer match cannot be a
    /// reused allocation.
    fn matches(&self, descriptor: &TypeDescriptor) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.descriptor), descriptor) || self.descriptor.same_shape(descriptor)
    }
}

type Entries = HashMap<String, Vec<Entry>>;

/// Process-wide memo of derived schemas, keyed by type identity.
///
/// Entries are grouped by type name. Two distinct types that share a name
/// (say `a::Address` and `b::Address`) get one entry each; a descriptor
/// matches an entry when it is the same allocation or declares the same
/// shape.
///
/// Schemas are derived outside the lock. When two threads race on the first
/// use of a type, both may derive it but only the first insert wins, so every
/// caller ends up sharing the same `Arc<Schema>`.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: RwLock<Entries>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache shared by codecs that are not given one explicitly.
    pub fn global() -> Arc<SchemaCache> {
        static GLOBAL: OnceLock<Arc<SchemaCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SchemaCache::new())))
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        match self.schemas.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("schema cache read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        match self.schemas.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("schema cache write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Schema of `descriptor`, derived on first use.
    ///
    /// Derivation errors are not cached; every later call reports them again.
    pub fn schema_for(&self, descriptor: &TypeDescriptor) -> Result<Arc<Schema>, CodecError> {
        self.lookup_or_build(descriptor, || Arc::new(descriptor.clone()))
    }

    /// Like [`schema_for`](Self::schema_for), but keeps `descriptor` itself,
    /// so later calls with the same `Arc` skip the shape comparison.
    pub fn schema_for_shared(&self, descriptor: &Arc<TypeDescriptor>) -> Result<Arc<Schema>, CodecError> {
        self.lookup_or_build(descriptor, || Arc::clone(descriptor))
    }

    fn lookup_or_build(
        &self,
        descriptor: &TypeDescriptor,
        keep: impl FnOnce() -> Arc<TypeDescriptor>,
    ) -> Result<Arc<Schema>, CodecError> {
        if let Some(schema) = self.find(descriptor) {
            return Ok(schema);
        }
        let built = Arc::new(schema::build(descriptor, self)?);

        let mut guard = self.write();
        let entries = guard.entry(descriptor.name.clone()).or_default();
        if let Some(existing) = entries.iter().find(|e| e.matches(descriptor)) {
            return Ok(Arc::clone(&existing.schema));
        }
        if !entries.is_empty() {
            tracing::debug!(type_name = %descriptor.name, "another type with this name is already cached");
        }
        entries.push(Entry {
            descriptor: keep(),
            schema: Arc::clone(&built),
        });
        Ok(built)
    }

    fn find(&self, descriptor: &TypeDescriptor) -> Option<Arc<Schema>> {
        self.read()
            .get(&descriptor.name)?
            .iter()
            .find(|e| e.matches(descriptor))
            .map(|e| Arc::clone(&e.schema))
    }

    /// First schema cached under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.read()
            .get(name)
            .and_then(|entries| entries.first())
            .map(|e| Arc::clone(&e.schema))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().get(name).is_some_and(|entries| !entries.is_empty())
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
