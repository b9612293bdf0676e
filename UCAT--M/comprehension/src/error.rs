use thiserror::Error;

/// Errors raised while setting up the drill engine or loading its data.
///
/// The drill algorithms themselves never fail; they report "nothing to build"
/// through empty collections or `None`.
#[derive(Debug, Error)]
pub enum ComprehensionError {
    /// A built-in rule pattern failed to compile.
    #[error("invalid rule pattern: {0}")]
    Regex(#[from] regex::Error),
    /// Filesystem failure reading config or catalogs.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON catalog.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed TOML config.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Config values out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A span in authored data violates `0 <= start < end <= len`.
    #[error("invalid span {start}..{end} for text of length {len}")]
    InvalidSpan {
        /// Start offset.
        start: usize,
        /// End offset.
        end: usize,
        /// Text length in UTF-16 units.
        len: usize,
    },
}
