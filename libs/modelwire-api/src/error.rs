use std::fmt;

use crate::schema::WireType;

/// Error returned by schema construction, encoding and decoding.
///
/// Construction errors (`SchemaConflict`, `UnsupportedMapKey`) surface the
/// first time a type is used and are fatal for that type. Everything else is
/// raised per call and leaves the codec usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("schema conflict in '{type_name}': {reason}")]
    SchemaConflict { type_name: String, reason: String },

    #[error("'{type_name}.{field}': map keys must be strings")]
    UnsupportedMapKey { type_name: String, field: String },

    #[error("field {field_id}: expected wire type {expected}, found {found}")]
    TypeMismatch {
        field_id: u16,
        expected: WireType,
        found: WireType,
    },

    #[error("buffer truncated: need {needed} bytes, {remaining} remaining")]
    TruncatedBuffer { needed: usize, remaining: usize },

    #[error("'{name}' is not a member of enumeration '{enumeration}'")]
    UnknownEnumMember { enumeration: String, name: String },

    #[error("unknown wire type tag {0}")]
    UnknownWireType(u8),

    #[error("negative length prefix {0}")]
    NegativeLength(i32),

    #[error("length {len} exceeds the configured limit of {limit}")]
    LengthLimit { len: usize, limit: usize },

    #[error("length {0} does not fit a 32-bit length prefix")]
    LengthOverflow(usize),

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("field '{field}': expected {expected}, got {found}")]
    InvalidValue {
        field: String,
        expected: String,
        found: String,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<CodecError>,
    },
}

impl CodecError {
    pub fn conflict(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaConflict {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Add context to the error.
    ///
    /// Produces: `"context: original message"`. The original error stays
    /// reachable through [`CodecError::root`].
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self::Context {
            context: ctx.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context layer stripped.
    pub fn root(&self) -> &CodecError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for errors raised while deriving a schema rather than while
    /// processing a buffer.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self.root(),
            Self::SchemaConflict { .. } | Self::UnsupportedMapKey { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_message_and_keeps_root() {
        let err = CodecError::NegativeLength(-3).with_context("decoding Person");
        assert_eq!(err.to_string(), "decoding Person: negative length prefix -3");
        assert_eq!(err.root(), &CodecError::NegativeLength(-3));
    }

    #[test]
    fn schema_errors_are_recognised_through_context() {
        let err = CodecError::conflict("Person", "duplicate field id 3").with_context("registering");
        assert!(err.is_schema_error());
        assert!(!CodecError::InvalidUtf8.is_schema_error());
    }

    #[test]
    fn type_mismatch_names_wire_types() {
        let err = CodecError::TypeMismatch {
            field_id: 12,
            expected: WireType::I64,
            found: WireType::String,
        };
        assert_eq!(err.to_string(), "field 12: expected wire type i64, found string");
    }
}
