//! Errors surfaced by schema analysis.

use kiln_uri::UriError;
use thiserror::Error;

/// A reference could not be resolved to a schema during analysis.
#[derive(Debug, Error)]
#[error("failed to resolve schema \"{identifier}\"")]
pub struct SchemaResolutionError {
    /// The identifier that could not be resolved.
    pub identifier: String,
}

/// Any failure that can occur while analysing or transforming a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A URI inside the schema was malformed.
    #[error(transparent)]
    Uri(#[from] UriError),

    /// A reference had no resolvable target.
    #[error(transparent)]
    Resolution(#[from] SchemaResolutionError),

    /// The underlying resolver failed while fetching a schema.
    #[error("failed to resolve \"{identifier}\": {message}")]
    Resolver {
        /// The identifier being resolved.
        identifier: String,
        /// The resolver's complaint.
        message: String,
    },

    /// The dialect of a schema could not be determined.
    #[error("could not determine the dialect of schema \"{identifier}\"")]
    UnknownDialect {
        /// The identifier of the schema in question.
        identifier: String,
    },

    /// A schema had no identifier and no default was supplied.
    #[error("the schema does not declare an identifier")]
    MissingIdentifier,

    /// A frame location pointed at a node that does not exist. Indicates a
    /// walker bug rather than bad user input.
    #[error("no value at pointer \"{pointer}\"")]
    DanglingPointer {
        /// The pointer that failed to resolve.
        pointer: String,
    },

    /// A document could not be scanned for source positions.
    #[error("malformed JSON at line {line}, column {column}")]
    Scan {
        /// 1-based line of the offending byte.
        line: u64,
        /// 1-based column of the offending byte.
        column: u64,
    },
}
