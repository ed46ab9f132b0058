/// Top-level error type for the accountability layer.
///
/// Missing records are never errors: lookups return `None`, `false` or an
/// empty collection. Everything here is either a programmer error (bad enum
/// value, invalid input, invalid configuration) or an infrastructure fault.
#[derive(Debug, thiserror::Error)]
pub enum PcalError {
    #[error("invalid {kind}: {value}")]
    InvalidEnum { kind: &'static str, value: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("concurrency error: {0}")]
    Concurrency(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience type alias.
pub type PcalResult<T> = Result<T, PcalError>;
