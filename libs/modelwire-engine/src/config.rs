use serde::Deserialize;

use crate::backend::Backend;
use crate::error::EngineError;

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelwireConfig {
    /// Codec settings.
    #[serde(default)]
    pub codec: CodecConfig,

    /// Enumeration definitions.
    #[serde(default)]
    pub enums: Vec<EnumConfig>,

    /// Record type definitions.
    #[serde(default)]
    pub types: Vec<TypeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodecConfig {
    /// Backend used when none is forced.
    #[serde(default)]
    pub backend: Backend,

    /// Deepest struct/list/map nesting a decoder accepts.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Largest string length or element count a decoder accepts.
    #[serde(default = "default_max_collection_len")]
    pub max_collection_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            max_depth: default_max_depth(),
            max_collection_len: default_max_collection_len(),
        }
    }
}

impl CodecConfig {
    pub fn limits(&self) -> Limits {
        Limits {
            max_depth: self.max_depth,
            max_collection_len: self.max_collection_len,
        }
    }
}

fn default_max_depth() -> usize {
    64
}

fn default_max_collection_len() -> usize {
    64 * 1024 * 1024
}

/// Decoder resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_collection_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        CodecConfig::default().limits()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumConfig {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    pub id: u16,
    /// Type expression, e.g. `string`, `list<object:Address>`, `dict<integer>`.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<toml::Value>,
}

impl ModelwireConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_file_is_an_io_error() {
        let err = ModelwireConfig::load("/nonexistent/modelwire.toml").unwrap_err();
        assert!(
            matches!(err, EngineError::Io { ref path, ref source }
                if path == "/nonexistent/modelwire.toml" && source.kind() == std::io::ErrorKind::NotFound),
            "{err}"
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = ModelwireConfig::parse("").unwrap();
        assert_eq!(cfg.codec.backend, Backend::Accelerated);
        assert_eq!(cfg.codec.limits(), Limits::default());
        assert_eq!(cfg.codec.max_depth, 64);
        assert!(cfg.types.is_empty());
    }

    #[test]
    fn parses_codec_and_types() {
        let cfg = ModelwireConfig::parse(
            r#"
            [codec]
            backend = "portable"
            max_depth = 8

            [[enums]]
            name = "Color"
            members = ["red", "green"]

            [[types]]
            name = "Person"
            fields = [
                { name = "name", id = 1, type = "string" },
                { name = "age", id = 2, type = "integer", default = 18 },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.codec.backend, Backend::Portable);
        assert_eq!(cfg.codec.max_depth, 8);
        assert_eq!(cfg.codec.max_collection_len, default_max_collection_len());
        assert_eq!(cfg.enums[0].members, ["red", "green"]);
        let person = &cfg.types[0];
        assert_eq!(person.fields[1].ty, "integer");
        assert_eq!(person.fields[1].default, Some(toml::Value::Integer(18)));
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let err = ModelwireConfig::parse("[codec]\nbackend = \"turbo\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ModelwireConfig::load("/nonexistent/modelwire.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/modelwire.toml"));
    }
}
