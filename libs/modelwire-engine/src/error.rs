use modelwire_api::error::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("io error ({path}): {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Codec` variant, context is added to the inner `CodecError`.
    /// For other variants, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Codec(e) => EngineError::Codec(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::UnknownType(msg) => EngineError::UnknownType(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
