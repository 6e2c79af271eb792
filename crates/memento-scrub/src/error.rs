/// Errors raised while building a scrub pipeline.
///
/// Applying a built pipeline never fails: malformed records are skipped,
/// not rejected.
#[derive(Debug, thiserror::Error)]
pub enum ScrubError {
    /// A configured pattern is not a valid regular expression.
    #[error("invalid pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// The configuration is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type ScrubResult<T> = Result<T, ScrubError>;
