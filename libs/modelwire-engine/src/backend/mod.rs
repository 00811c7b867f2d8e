//! Codec backends.
//!
//! Both backends implement the same wire format and must produce identical
//! bytes and identical errors for every input. `Portable` is the reference
//! path; `Accelerated` runs a per-schema plan compiled on first use.

pub mod accelerated;
pub mod portable;

use std::fmt;
use std::str::FromStr;

use modelwire_api::error::CodecError;
use modelwire_api::value::StructValue;

use crate::config::Limits;
use crate::error::EngineError;
use crate::schema::Schema;

pub use accelerated::AcceleratedCodec;
pub use portable::PortableCodec;

/// Encoder/decoder for records of a given schema.
pub trait Codec: Send + Sync {
    fn backend(&self) -> Backend;

    /// Encode `value` as a struct of `schema`.
    fn encode(&self, schema: &Schema, value: &StructValue) -> Result<Vec<u8>, CodecError>;

    /// Decode one struct of `schema` from the start of `data`. Bytes after
    /// the struct's STOP are ignored.
    fn decode(&self, schema: &Schema, data: &[u8]) -> Result<StructValue, CodecError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Accelerated,
    Portable,
}

impl Backend {
    pub fn all() -> [Backend; 2] {
        [Backend::Accelerated, Backend::Portable]
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Accelerated => "accelerated",
            Backend::Portable => "portable",
        }
    }

    pub fn codec(self, limits: Limits) -> Box<dyn Codec> {
        match self {
            Backend::Accelerated => Box::new(AcceleratedCodec::new(limits)),
            Backend::Portable => Box::new(PortableCodec::new(limits)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::all()
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or_else(|| EngineError::UnknownBackend(s.to_owned()))
    }
}
