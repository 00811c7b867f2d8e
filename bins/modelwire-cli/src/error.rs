use modelwire_api::error::CodecError;
use modelwire_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("json ({context}): {detail}")]
    Json { context: String, detail: String },

    #[error("io ({context}): {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("{failed} of {total} types failed schema derivation")]
    Check { failed: usize, total: usize },
}

impl CliError {
    pub fn json(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Json {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
