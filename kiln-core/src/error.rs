//! Logical errors which can occur while indexing a registry.

use std::path::PathBuf;

use kiln_json_schema::SchemaError;
use kiln_uri::UriError;
use thiserror::Error;

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                         ConfigurationValidationError                         ║
║                        ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                         ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// A configuration document violated the expected shape.
#[derive(Debug, Error)]
#[error("invalid configuration at \"{}\" ({pointer}): {message}", file.display())]
pub struct ConfigurationValidationError {
    /// The configuration file in question.
    pub file: PathBuf,
    /// JSON Pointer of the offending property.
    pub pointer: String,
    /// What is wrong with it.
    pub message: String,
}

impl ConfigurationValidationError {
    /// Convenience constructor.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                resolver errors                               ║
║                               ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                               ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// A schema's canonical identifier fell outside its collection base.
#[derive(Debug, Error)]
#[error("the schema identifier \"{identifier}\" is not relative to the collection base \"{base}\"")]
pub struct ResolverOutsideBaseError {
    /// The identifier that escaped.
    pub identifier: String,
    /// The collection base it was expected under.
    pub base: String,
}

/// Two source files produced the same final identifier.
#[derive(Debug, Error)]
#[error(
    "cannot register the same identifier twice: \"{identifier}\" ({} and {})",
    existing.display(),
    duplicate.display()
)]
pub struct DuplicateIdentifierError {
    /// The contested identifier.
    pub identifier: String,
    /// The file that registered it first.
    pub existing: PathBuf,
    /// The file that tried to register it again.
    pub duplicate: PathBuf,
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                MetaPackError                                 ║
║                               ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                                ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// An artifact's header is missing, truncated or violates the format.
#[derive(Debug, Error)]
#[error("malformed artifact at \"{}\": {reason}", path.display())]
pub struct MetaPackFormatError {
    /// The artifact in question.
    pub path: PathBuf,
    /// What is wrong with it.
    pub reason: String,
}

/// Any failure while reading or writing an artifact.
#[derive(Debug, Error)]
pub enum MetaPackError {
    /// The artifact violates the format.
    #[error(transparent)]
    Format(#[from] MetaPackFormatError),

    /// The artifact could not be read or written.
    #[error("I/O error on \"{}\": {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                  IndexError                                  ║
║                                 ¯¯¯¯¯¯¯¯¯¯¯¯                                 ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// The run-level error: everything the indexer can fail with.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The configuration is invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationValidationError),

    /// A schema identifier escaped its collection base.
    #[error(transparent)]
    OutsideBase(#[from] ResolverOutsideBaseError),

    /// Two files claimed one identifier.
    #[error(transparent)]
    DuplicateIdentifier(#[from] DuplicateIdentifierError),

    /// Schema analysis failed (including unresolvable references).
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An artifact could not be read or written.
    #[error(transparent)]
    MetaPack(#[from] MetaPackError),

    /// A URI was malformed.
    #[error(transparent)]
    Uri(#[from] UriError),

    /// A source document could not be parsed.
    #[error("failed to parse \"{}\": {message}", path.display())]
    Deserialize {
        /// The document in question.
        path: PathBuf,
        /// The parser's complaint.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error on \"{}\": {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A build handler returned without producing its destination.
    #[error("the build handler did not produce \"{}\"", path.display())]
    MissingArtifact {
        /// The destination that should exist.
        path: PathBuf,
    },

    /// The worker pool could not be brought up.
    #[error("failed to initialise the worker pool: {message}")]
    WorkerPool {
        /// The pool builder's complaint.
        message: String,
    },
}

impl IndexError {
    /// Wraps an I/O error with the path it happened on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
