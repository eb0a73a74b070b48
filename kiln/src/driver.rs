//! The indexer driver: registration, artifact builds, navigation, HTML,
//! search and garbage collection, phase by phase.
//!
//! Phases are separated by barriers because each one consumes the previous
//! one's outputs; inside a phase everything runs on the worker pool with no
//! ordering guarantees. The first error wins and surfaces after the join.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::{json, Value};
use tracing::info;

use kiln_core::{
    configuration, metapack, ConfigurationValidationError, Configuration, Encoding, Entry,
    IndexError, Output, Resolver,
};
use kiln_json_schema::{compile, evaluate, OfficialResolver};

use crate::explorer;
use crate::generators::{self, SchemaContext};

// The schema walker and the template compiler recurse deeply on large
// schemas; default stacks are not enough.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// What a run needs to know.
#[derive(Debug, Clone)]
pub struct Options {
    /// The configuration file.
    pub configuration: PathBuf,
    /// The output directory.
    pub output: PathBuf,
    /// The directory holding `@name` collection presets.
    pub collections: PathBuf,
}

/// Runs the full indexing pipeline.
///
/// # Errors
/// Returns the first failure of any phase; nothing is swallowed.
pub fn run(options: &Options) -> Result<(), IndexError> {
    let configuration_path = fs::canonicalize(&options.configuration)
        .map_err(|source| IndexError::io(&options.configuration, source))?;

    validate_configuration(&configuration_path, &options.collections)?;
    let configuration = configuration::parse(&configuration_path, &options.collections)?;
    info!(url = %configuration.url_string(), "indexing registry");

    let output = Output::new(&options.output)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
        )
        .stack_size(WORKER_STACK_SIZE)
        .build()
        .map_err(|error| IndexError::WorkerPool {
            message: error.to_string(),
        })?;

    let resolver = Resolver::new(&configuration);

    // Phase 1: walk every collection and register its schemas.
    for (name, entry) in &configuration.entries {
        let Entry::Collection(key) = entry else {
            continue;
        };
        let collection = &configuration.collections[*key];
        info!(collection = %name, path = %collection.absolute_path.display(), "processing collection");
        let files = collect_schema_files(&collection.absolute_path)?;
        pool.install(|| {
            files
                .par_iter()
                .try_for_each(|path| resolver.add(*key, path).map(|_| ()))
        })?;
    }
    info!(schemas = resolver.len(), "registered");

    // The trimmed configuration the server boots from.
    let summary_destination = output.resolve(Path::new("configuration.json"));
    output.build(
        &summary_destination,
        &[configuration_path.clone()],
        &configuration,
        |destination, _, _, configuration| {
            metapack::write_json(
                destination,
                &configuration.summary(),
                "application/json",
                Encoding::Identity,
                None,
                0,
            )
            .map_err(Into::into)
        },
    )?;

    // Phase 2: the per-schema artifact set.
    let snapshot = resolver.snapshot();
    pool.install(|| {
        snapshot.par_iter().try_for_each(|(identifier, entry)| {
            build_schema_artifacts(&output, &resolver, identifier, entry)
        })
    })?;

    // Phase 3: per-schema navigation documents.
    pool.install(|| {
        snapshot.par_iter().try_for_each(|(_, entry)| {
            let paths = ArtifactPaths::of(&output, &entry.relative_path);
            output.build(
                &paths.nav,
                &[
                    paths.materialised.clone(),
                    paths.health.clone(),
                    configuration_path.clone(),
                ],
                &(&configuration, &resolver),
                |destination, dependencies, _, (configuration, resolver)| {
                    let nav = explorer::schema_nav(
                        configuration,
                        resolver,
                        &dependencies[0],
                        &dependencies[1],
                        &entry.relative_path,
                    )?;
                    metapack::write_json(
                        destination,
                        &nav,
                        "application/json",
                        Encoding::Gzip,
                        None,
                        0,
                    )
                    .map_err(Into::into)
                },
            )?;
            Ok::<(), IndexError>(())
        })
    })?;

    // Phase 4: directory navigation, children before parents.
    let tree = directory_tree(&snapshot);
    let mut depths: Vec<usize> = tree.keys().map(|directory| depth(directory)).collect();
    depths.sort_unstable();
    depths.dedup();
    for current in depths.into_iter().rev() {
        let level: Vec<(&String, &DirectoryNode)> = tree
            .iter()
            .filter(|(directory, _)| depth(directory) == current)
            .collect();
        pool.install(|| {
            level.par_iter().try_for_each(|(directory, node)| {
                build_directory_nav(
                    &output,
                    &configuration,
                    &configuration_path,
                    directory,
                    node,
                )
            })
        })?;
    }

    // Phase 5: HTML.
    pool.install(|| {
        snapshot.par_iter().try_for_each(|(_, entry)| {
            build_schema_page(&output, &configuration, &configuration_path, &entry.relative_path)
        })
    })?;
    let directories: Vec<&String> = tree.keys().collect();
    pool.install(|| {
        directories.par_iter().try_for_each(|directory| {
            build_directory_page(&output, &configuration, &configuration_path, directory)
        })
    })?;
    build_not_found_page(&output, &configuration, &configuration_path)?;

    // Phase 6: the flat search index.
    build_search_index(&output, &snapshot, &configuration_path)?;

    // Whatever this run did not produce is stale.
    let removed = output.collect_garbage()?;
    if !removed.is_empty() {
        info!(count = removed.len(), "collected stale artifacts");
    }
    Ok(())
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                            configuration checking                            ║
║                           ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                           ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

// The shape the merged configuration document must satisfy, checked with the
// same compiler the registry uses for everything else.
fn registry_schema() -> Value {
    json!({
        "type": "object",
        "required": ["url", "port"],
        "properties": {
            "url": { "type": "string", "minLength": 1 },
            "port": { "type": "integer", "minimum": 1 },
            "title": { "type": "string" },
            "description": { "type": "string" },
            "head": { "type": "string" },
            "hero": { "type": "string" },
            "extends": { "type": "array", "items": { "type": "string" } },
            "action": {
                "type": "object",
                "required": ["url", "icon", "title"],
                "properties": {
                    "url": { "type": "string" },
                    "icon": { "type": "string" },
                    "title": { "type": "string" }
                }
            },
            "schemas": { "type": "object" },
            "pages": { "type": "object" }
        }
    })
}

fn validate_configuration(path: &Path, collections: &Path) -> Result<(), IndexError> {
    let document = configuration::read(path, collections)?;
    let template =
        compile(&registry_schema(), &OfficialResolver, None).map_err(IndexError::Schema)?;
    let outcome = evaluate(&template, &document);
    if outcome.valid {
        return Ok(());
    }
    let first = outcome.errors.into_iter().next();
    let (pointer, message) = first.map_or_else(
        || (String::new(), "invalid configuration".to_owned()),
        |error| (error.instance_location, error.message),
    );
    Err(ConfigurationValidationError::new(path, pointer, message).into())
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                               per-schema builds                              ║
║                              ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                              ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

struct ArtifactPaths {
    materialised: PathBuf,
    bundle: PathBuf,
    unidentified: PathBuf,
    dependencies: PathBuf,
    health: PathBuf,
    positions: PathBuf,
    locations: PathBuf,
    template: PathBuf,
    nav: PathBuf,
    page: PathBuf,
}

impl ArtifactPaths {
    fn of(output: &Output, relative_path: &str) -> Self {
        let base = relative_path
            .strip_suffix(".json")
            .unwrap_or(relative_path)
            .to_owned();
        let schemas = |suffix: &str| output.resolve(Path::new(&format!("schemas/{base}.{suffix}")));
        Self {
            materialised: output.resolve(Path::new(&format!("schemas/{relative_path}"))),
            bundle: schemas("bundle"),
            unidentified: schemas("unidentified"),
            dependencies: schemas("deps"),
            health: schemas("health"),
            positions: schemas("positions"),
            locations: schemas("locations"),
            template: schemas("template"),
            nav: output.resolve(Path::new(&format!("explorer/{base}.nav"))),
            page: output.resolve(Path::new(&format!("explorer/{base}.html"))),
        }
    }
}

fn build_schema_artifacts(
    output: &Output,
    resolver: &Resolver,
    identifier: &str,
    entry: &kiln_core::resolver::Entry,
) -> Result<(), IndexError> {
    let paths = ArtifactPaths::of(output, &entry.relative_path);
    let context = SchemaContext {
        resolver,
        identifier: identifier.to_owned(),
        dialect: entry.dialect.clone(),
        source: entry.path.clone(),
    };

    // The materialised artifact first: every other generator reads it, and
    // the resolver short-circuits to it from now on.
    output.build(
        &paths.materialised,
        &[entry.path.clone()],
        &context,
        generators::materialised,
    )?;
    resolver.materialise(identifier, &paths.materialised);

    output.build(
        &paths.bundle,
        &[paths.materialised.clone()],
        &context,
        generators::bundled,
    )?;
    output.build(
        &paths.unidentified,
        &[paths.bundle.clone()],
        &context,
        generators::unidentified,
    )?;
    output.build(
        &paths.dependencies,
        &[paths.materialised.clone()],
        &context,
        generators::dependency_graph,
    )?;
    output.build(
        &paths.health,
        &[paths.materialised.clone()],
        &context,
        generators::health_report,
    )?;
    let position_dependencies = if kiln_core::reader::is_yaml(&entry.path) {
        vec![entry.path.clone(), paths.materialised.clone()]
    } else {
        vec![entry.path.clone()]
    };
    output.build(
        &paths.positions,
        &position_dependencies,
        &context,
        generators::pointer_positions,
    )?;
    output.build(
        &paths.locations,
        &[paths.materialised.clone()],
        &context,
        generators::frame_locations,
    )?;
    output.build(
        &paths.template,
        &[paths.materialised.clone()],
        &context,
        generators::compiled_template,
    )?;
    Ok(())
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                             navigation  &  pages                             ║
║                            ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                            ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

#[derive(Debug, Default)]
struct DirectoryNode {
    subdirectories: BTreeSet<String>,
    schemas: BTreeSet<String>,
}

fn depth(directory: &str) -> usize {
    if directory.is_empty() {
        0
    } else {
        directory.split('/').count()
    }
}

fn directory_tree(snapshot: &[(String, kiln_core::resolver::Entry)]) -> BTreeMap<String, DirectoryNode> {
    let mut tree: BTreeMap<String, DirectoryNode> = BTreeMap::new();
    tree.entry(String::new()).or_default();

    for (_, entry) in snapshot {
        let relative = &entry.relative_path;
        let parts: Vec<&str> = relative.split('/').collect();
        let parent = parts[..parts.len() - 1].join("/");
        tree.entry(parent.clone())
            .or_default()
            .schemas
            .insert(relative.clone());

        // Every ancestor knows its child directory.
        for index in 0..parts.len().saturating_sub(1) {
            let ancestor = parts[..index].join("/");
            let child = parts[index].to_owned();
            tree.entry(parts[..=index].join("/")).or_default();
            tree.entry(ancestor).or_default().subdirectories.insert(child);
        }
    }
    tree
}

fn nav_path(output: &Output, directory: &str) -> PathBuf {
    if directory.is_empty() {
        output.resolve(Path::new("explorer/index.nav"))
    } else {
        output.resolve(Path::new(&format!("explorer/{directory}/index.nav")))
    }
}

fn page_path(output: &Output, directory: &str) -> PathBuf {
    if directory.is_empty() {
        output.resolve(Path::new("explorer/index.html"))
    } else {
        output.resolve(Path::new(&format!("explorer/{directory}/index.html")))
    }
}

fn build_directory_nav(
    output: &Output,
    configuration: &Configuration,
    configuration_path: &Path,
    directory: &str,
    node: &DirectoryNode,
) -> Result<(), IndexError> {
    let mut dependencies: Vec<PathBuf> = vec![configuration_path.to_path_buf()];
    for schema in &node.schemas {
        dependencies.push(ArtifactPaths::of(output, schema).nav);
    }
    for subdirectory in &node.subdirectories {
        let child = if directory.is_empty() {
            subdirectory.clone()
        } else {
            format!("{directory}/{subdirectory}")
        };
        dependencies.push(nav_path(output, &child));
    }

    output.build(
        &nav_path(output, directory),
        &dependencies,
        &(configuration, node),
        |destination, _, _, (configuration, node)| {
            let subdirectories: Vec<String> = node.subdirectories.iter().cloned().collect();
            let mut schemas = Vec::new();
            for relative in &node.schemas {
                let name = relative
                    .rsplit('/')
                    .next()
                    .unwrap_or(relative)
                    .trim_end_matches(".json")
                    .to_owned();
                let nav = metapack::read_json(&ArtifactPaths::of(output, relative).nav)?;
                schemas.push((name, nav));
            }
            let nav =
                explorer::directory_nav(configuration, directory, &subdirectories, &schemas);
            metapack::write_json(
                destination,
                &nav,
                "application/json",
                Encoding::Gzip,
                None,
                0,
            )
            .map_err(Into::into)
        },
    )?;
    Ok(())
}

fn build_schema_page(
    output: &Output,
    configuration: &Configuration,
    configuration_path: &Path,
    relative_path: &str,
) -> Result<(), IndexError> {
    let paths = ArtifactPaths::of(output, relative_path);
    output.build(
        &paths.page,
        &[
            paths.nav.clone(),
            paths.dependencies.clone(),
            paths.materialised.clone(),
            configuration_path.to_path_buf(),
        ],
        &configuration,
        |destination, dependencies, _, configuration| {
            let nav = metapack::read_json(&dependencies[0])?;
            let edges = metapack::read_json(&dependencies[1])?;
            let preview = preview_of(&dependencies[2])?;
            let page = explorer::schema_page(configuration, &nav, &edges, &preview);
            metapack::write_text(destination, &page, "text/html", Encoding::Gzip, None, 0)
                .map_err(Into::into)
        },
    )?;
    Ok(())
}

// The first lines of the pretty-printed schema, elided when long.
fn preview_of(materialised: &Path) -> Result<String, IndexError> {
    let pack = metapack::read_bytes_with_meta(materialised)?;
    let contents = String::from_utf8_lossy(&pack.data);
    let mut lines: Vec<&str> = contents.lines().take(21).collect();
    let elided = lines.len() > 20;
    lines.truncate(20);
    let mut preview = lines.join("\n");
    preview.push('\n');
    if elided {
        preview.push_str("...\n");
    }
    Ok(preview)
}

fn build_directory_page(
    output: &Output,
    configuration: &Configuration,
    configuration_path: &Path,
    directory: &str,
) -> Result<(), IndexError> {
    output.build(
        &page_path(output, directory),
        &[nav_path(output, directory), configuration_path.to_path_buf()],
        &configuration,
        |destination, dependencies, _, configuration| {
            let nav = metapack::read_json(&dependencies[0])?;
            let page = if directory.is_empty() {
                explorer::index_page(configuration, &nav)
            } else {
                explorer::directory_page(configuration, &nav)
            };
            metapack::write_text(destination, &page, "text/html", Encoding::Gzip, None, 0)
                .map_err(Into::into)
        },
    )?;
    Ok(())
}

fn build_not_found_page(
    output: &Output,
    configuration: &Configuration,
    configuration_path: &Path,
) -> Result<(), IndexError> {
    output.build(
        &output.resolve(Path::new("explorer/404.html")),
        &[configuration_path.to_path_buf()],
        &configuration,
        |destination, _, _, configuration| {
            let page = explorer::not_found_page(configuration);
            metapack::write_text(destination, &page, "text/html", Encoding::Gzip, None, 0)
                .map_err(Into::into)
        },
    )?;
    Ok(())
}

fn build_search_index(
    output: &Output,
    snapshot: &[(String, kiln_core::resolver::Entry)],
    configuration_path: &Path,
) -> Result<(), IndexError> {
    let mut dependencies: Vec<PathBuf> = vec![configuration_path.to_path_buf()];
    let mut nav_paths = Vec::new();
    for (_, entry) in snapshot {
        let nav = ArtifactPaths::of(output, &entry.relative_path).nav;
        dependencies.push(nav.clone());
        nav_paths.push(nav);
    }

    output.build(
        &output.resolve(Path::new("search.jsonl")),
        &dependencies,
        &nav_paths,
        |destination, _, _, nav_paths| {
            let mut navs = Vec::with_capacity(nav_paths.len());
            for path in nav_paths {
                navs.push(metapack::read_json(path)?);
            }
            let index = explorer::search_index(&navs);
            metapack::write_jsonl(
                destination,
                &index,
                "application/jsonl",
                Encoding::Gzip,
                None,
                0,
            )
            .map_err(Into::into)
        },
    )?;
    Ok(())
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                collection walk                               ║
║                               ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                               ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

fn collect_schema_files(root: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(|error| IndexError::Io {
            path: root.to_path_buf(),
            source: error.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let has_schema_extension = matches!(
            entry.path().extension().and_then(std::ffi::OsStr::to_str),
            Some("json" | "yaml" | "yml")
        );
        if has_schema_extension {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
