//! The kiln schema registry indexer.
//!
//! Ties the core machinery together: the artifact [`generators`], the
//! [`explorer`] (navigation documents, search index and HTML), the [`html`]
//! building blocks, and the [`driver`] that walks collections and schedules
//! everything on the worker pool.

#![deny(clippy::all)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod driver;
pub mod explorer;
pub mod generators;
pub mod html;

pub use driver::{run, Options};
