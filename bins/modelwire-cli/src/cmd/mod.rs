pub mod check;
pub mod decode;
pub mod encode;
pub mod schema;

use std::io::{Read, Write};
use std::sync::Arc;

use modelwire_api::schema::TypeDescriptor;
use modelwire_engine::{ModelCodec, ModelwireConfig, Schema, TypeCatalog};

use crate::config::GlobalArgs;
use crate::error::CliError;

/// Loaded configuration shared by every subcommand.
pub struct Session {
    pub catalog: TypeCatalog,
    pub codec: ModelCodec,
}

impl Session {
    pub fn open(global: &GlobalArgs) -> Result<Self, CliError> {
        let config = ModelwireConfig::load(&global.config)?;
        let mut codec_config = config.codec.clone();
        if let Some(backend) = global.backend {
            codec_config.backend = backend;
        }
        let catalog = TypeCatalog::from_config(&config)?;
        tracing::info!(
            config = %global.config,
            types = catalog.len(),
            backend = %codec_config.backend,
            "session ready"
        );
        Ok(Self {
            catalog,
            codec: ModelCodec::new(&codec_config),
        })
    }

    pub fn resolve(&self, type_name: &str) -> Result<(Arc<TypeDescriptor>, Arc<Schema>), CliError> {
        let descriptor = self.catalog.get(type_name)?;
        let schema = self.codec.schema_of_descriptor(&descriptor)?;
        Ok((descriptor, schema))
    }
}

pub fn read_input(path: Option<&str>) -> Result<Vec<u8>, CliError> {
    match path {
        Some(path) => std::fs::read(path).map_err(|e| CliError::io(path, e)),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| CliError::io("stdin", e))?;
            Ok(buf)
        }
    }
}

pub fn write_output(path: Option<&str>, data: &[u8]) -> Result<(), CliError> {
    match path {
        Some(path) => std::fs::write(path, data).map_err(|e| CliError::io(path, e)),
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(data)
                .and_then(|()| out.flush())
                .map_err(|e| CliError::io("stdout", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use modelwire_engine::Backend;

    use super::*;

    fn sample() -> GlobalArgs {
        GlobalArgs {
            config: concat!(env!("CARGO_MANIFEST_DIR"), "/../../modelwire.toml").to_owned(),
            backend: Some(Backend::Portable),
        }
    }

    #[test]
    fn sample_catalog_loads() {
        let session = Session::open(&sample()).unwrap();
        assert_eq!(session.codec.backend(), Backend::Portable);
        assert_eq!(session.catalog.type_names(), ["Address", "Person"]);

        let (_, schema) = session.resolve("Person").unwrap();
        assert_eq!(schema.field_by_name("role").map(|f| f.id), Some(14));
        assert_eq!(schema.field(1).map(|f| f.name.as_str()), Some("guid"));
    }

    #[test]
    fn unknown_type_is_reported() {
        let session = Session::open(&sample()).unwrap();
        let err = session.resolve("Ghost").unwrap_err();
        assert!(err.to_string().contains("Ghost"), "{err}");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let global = GlobalArgs {
            config: "/nonexistent/modelwire.toml".into(),
            backend: None,
        };
        assert!(matches!(
            Session::open(&global),
            Err(CliError::Engine(modelwire_engine::EngineError::Io { .. }))
        ));
    }
}
