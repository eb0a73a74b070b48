//! The per-schema artifact handlers.
//!
//! Every handler has the build-engine shape: it receives the destination,
//! the declared dependencies and a callback for dependencies it discovers
//! along the way, and leaves a MetaPack file at the destination. Handlers
//! are pure functions of their inputs plus the resolver in the context.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::Value;

use kiln_core::output::DependencyCallback;
use kiln_core::{metapack, Adapter, Encoding, IndexError, Resolver};
use kiln_json_schema::{
    bundle, compile, dependencies, dialect_of, health, positions, schema_format, unidentify,
    Frame, SchemaError, SchemaResolutionError,
};

/// What a schema handler needs to know about its subject.
pub struct SchemaContext<'r, 'a> {
    /// The registry resolver.
    pub resolver: &'r Resolver<'a>,
    /// The schema's final identifier.
    pub identifier: String,
    /// The schema's effective dialect; boolean schemas carry no `$schema`
    /// member of their own.
    pub dialect: String,
    /// The original on-disk file.
    pub source: PathBuf,
}

const SCHEMA_MIME: &str = "application/schema+json";
const JSON_MIME: &str = "application/json";

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn dialect_extension(schema: &Value, context: &SchemaContext) -> Result<Value, IndexError> {
    let dialect = dialect_of(schema, Some(&context.dialect)).ok_or_else(|| {
        IndexError::Schema(SchemaError::UnknownDialect {
            identifier: context.identifier.clone(),
        })
    })?;
    Ok(Value::String(dialect))
}

// Runs `operation` with a resolver adapter that records every file the
// resolver reads, forwarding those paths to the build engine afterwards.
fn with_tracked_resolver<T>(
    context: &SchemaContext,
    add: DependencyCallback,
    operation: impl FnOnce(&Adapter) -> Result<T, IndexError>,
) -> Result<T, IndexError> {
    let discovered: RefCell<Vec<PathBuf>> = RefCell::new(Vec::new());
    let callback = |path: &Path| discovered.borrow_mut().push(path.to_path_buf());
    let adapter = Adapter {
        resolver: context.resolver,
        callback: Some(&callback),
    };
    let outcome = operation(&adapter)?;
    for path in discovered.into_inner() {
        add(path);
    }
    Ok(outcome)
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   handlers                                   ║
║                                  ¯¯¯¯¯¯¯¯¯¯                                  ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// The rewritten schema, pretty-printed.
pub fn materialised(
    destination: &Path,
    _dependencies: &[PathBuf],
    add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let schema = with_tracked_resolver(context, add, |adapter| {
        adapter
            .resolver
            .resolve(&context.identifier, adapter.callback)?
            .ok_or_else(|| {
                IndexError::Schema(
                    SchemaResolutionError {
                        identifier: context.identifier.clone(),
                    }
                    .into(),
                )
            })
    })?;
    let extension = dialect_extension(&schema, context)?;
    metapack::write_pretty_json(
        destination,
        &schema_format(&schema),
        SCHEMA_MIME,
        Encoding::Gzip,
        Some(extension),
        elapsed_ms(started),
    )
    .map_err(Into::into)
}

/// The materialised schema with every external reference inlined.
pub fn bundled(
    destination: &Path,
    dependencies: &[PathBuf],
    add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let mut schema = metapack::read_json(&dependencies[0])?;
    with_tracked_resolver(context, add, |adapter| {
        bundle(&mut schema, adapter, Some(&context.dialect)).map_err(IndexError::Schema)
    })?;
    let extension = dialect_extension(&schema, context)?;
    metapack::write_pretty_json(
        destination,
        &schema_format(&schema),
        SCHEMA_MIME,
        Encoding::Gzip,
        Some(extension),
        elapsed_ms(started),
    )
    .map_err(Into::into)
}

/// The bundle with every identifier below the root stripped.
pub fn unidentified(
    destination: &Path,
    dependencies: &[PathBuf],
    add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let mut schema = metapack::read_json(&dependencies[0])?;
    with_tracked_resolver(context, add, |adapter| {
        unidentify(&mut schema, adapter, Some(&context.dialect)).map_err(IndexError::Schema)
    })?;
    let extension = dialect_extension(&schema, context)?;
    metapack::write_pretty_json(
        destination,
        &schema_format(&schema),
        SCHEMA_MIME,
        Encoding::Gzip,
        Some(extension),
        elapsed_ms(started),
    )
    .map_err(Into::into)
}

/// The transitive reference edges, one `{from, to, at}` entry each.
pub fn dependency_graph(
    destination: &Path,
    dependencies: &[PathBuf],
    add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let schema = metapack::read_json(&dependencies[0])?;
    let edges = with_tracked_resolver(context, add, |adapter| {
        dependencies_to_value(&schema, adapter, &context.dialect)
    })?;
    metapack::write_json(
        destination,
        &edges,
        JSON_MIME,
        Encoding::Gzip,
        None,
        elapsed_ms(started),
    )
    .map_err(Into::into)
}

fn dependencies_to_value(
    schema: &Value,
    adapter: &Adapter,
    dialect: &str,
) -> Result<Value, IndexError> {
    let edges = dependencies(schema, adapter, Some(dialect)).map_err(IndexError::Schema)?;
    serde_json::to_value(edges).map_err(|error| IndexError::Deserialize {
        path: PathBuf::new(),
        message: error.to_string(),
    })
}

/// The lint report with its 0–100 score.
pub fn health_report(
    destination: &Path,
    dependencies: &[PathBuf],
    add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let schema = metapack::read_json(&dependencies[0])?;
    let report = with_tracked_resolver(context, add, |adapter| {
        health(&schema, adapter, Some(&context.dialect), Some(&context.identifier))
            .map_err(IndexError::Schema)
    })?;
    let report = serde_json::to_value(report).map_err(|error| IndexError::Deserialize {
        path: destination.to_path_buf(),
        message: error.to_string(),
    })?;
    metapack::write_json(
        destination,
        &report,
        JSON_MIME,
        Encoding::Gzip,
        None,
        elapsed_ms(started),
    )
    .map_err(Into::into)
}

/// JSON Pointer to source line/column, from the original file when it is
/// JSON, from the materialised payload otherwise.
pub fn pointer_positions(
    destination: &Path,
    dependencies: &[PathBuf],
    _add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let contents = if kiln_core::reader::is_yaml(&context.source) {
        let pack = metapack::read_bytes_with_meta(&dependencies[1])?;
        String::from_utf8_lossy(&pack.data).into_owned()
    } else {
        fs::read_to_string(&context.source)
            .map_err(|source| IndexError::io(&context.source, source))?
    };
    let map = positions(&contents).map_err(IndexError::Schema)?;
    metapack::write_json(
        destination,
        &map,
        JSON_MIME,
        Encoding::Gzip,
        None,
        elapsed_ms(started),
    )
    .map_err(Into::into)
}

/// Every static location of the schema with its base, dialect and pointer.
pub fn frame_locations(
    destination: &Path,
    dependencies: &[PathBuf],
    add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let schema = metapack::read_json(&dependencies[0])?;
    let locations = with_tracked_resolver(context, add, |adapter| {
        Frame::analyse(&schema, adapter, Some(&context.dialect), Some(&context.identifier))
            .map(|frame| frame.to_json())
            .map_err(IndexError::Schema)
    })?;
    metapack::write_json(
        destination,
        &locations,
        JSON_MIME,
        Encoding::Gzip,
        None,
        elapsed_ms(started),
    )
    .map_err(Into::into)
}

/// The precompiled validation template. Stored uncompressed: the server
/// reads it straight off disk on every cold evaluation.
pub fn compiled_template(
    destination: &Path,
    dependencies: &[PathBuf],
    add: DependencyCallback,
    context: &SchemaContext,
) -> Result<(), IndexError> {
    let started = Instant::now();
    let schema = metapack::read_json(&dependencies[0])?;
    let template = with_tracked_resolver(context, add, |adapter| {
        compile(&schema, adapter, Some(&context.identifier)).map_err(IndexError::Schema)
    })?;
    let template = serde_json::to_value(template).map_err(|error| IndexError::Deserialize {
        path: destination.to_path_buf(),
        message: error.to_string(),
    })?;
    metapack::write_json(
        destination,
        &template,
        JSON_MIME,
        Encoding::Identity,
        None,
        elapsed_ms(started),
    )
    .map_err(Into::into)
}
