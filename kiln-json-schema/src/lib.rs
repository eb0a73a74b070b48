//! JSON Schema analysis for the kiln schema registry.
//!
//! This crate carries everything dialect-shaped the registry needs:
//!
//! - the official dialect tables and the [`dialect::OfficialResolver`];
//! - keyword classification per release ([`walker`]);
//! - static frame analysis of a document ([`frame::Frame`]);
//! - bundling, unidentification and dependency enumeration ([`bundle`]);
//! - quality linting with a health score ([`lint`]);
//! - source position scanning ([`positions`]);
//! - compilation of schemas into flat validation templates ([`compiler`]).
//!
//! Nothing here touches the filesystem; documents come in as
//! [`serde_json::Value`]s and schema lookups go through the
//! [`dialect::SchemaResolver`] trait, which the registry's resolver
//! implements on the other side of the crate boundary.

#![deny(clippy::all)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation
)]

pub mod bundle;
pub mod compiler;
pub mod dialect;
pub mod error;
pub mod format;
pub mod frame;
pub mod lint;
pub mod positions;
pub mod walker;

pub use bundle::{bundle, dependencies, unidentify, DependencyTrace};
pub use compiler::{compile, evaluate, Evaluation, Template};
pub use dialect::{
    base_dialect_for, dialect_of, identify_loose, is_official_dialect, official_metaschema,
    reidentify, BaseDialect, OfficialResolver, SchemaResolver,
};
pub use error::{SchemaError, SchemaResolutionError};
pub use format::schema_format;
pub use frame::{Frame, Location, LocationKind, Reference};
pub use lint::{health, HealthError, HealthReport};
pub use positions::positions;
