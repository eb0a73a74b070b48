use std::fmt::Debug;
use thiserror::Error;

/// An error occurred while parsing or resolving a URI.
#[derive(Debug, Error)]
pub enum UriError {
    /// The input could not be parsed as an absolute URI.
    #[error("failed to parse URI \"{input}\": {source}")]
    Parse {
        /// The offending input.
        input: String,
        /// The underlying parser error.
        source: url::ParseError,
    },

    /// A reference was resolved against a base that is not absolute.
    #[error("cannot resolve \"{reference}\" against a relative base")]
    RelativeBase {
        /// The reference that was being resolved.
        reference: String,
    },
}
