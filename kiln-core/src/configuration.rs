//! The registry configuration: hierarchical reading and typed parsing.
//!
//! Reading inlines the transitive `extends` chain into one JSON document;
//! parsing turns that document into the typed model the rest of the indexer
//! works with. Collections live in a slotmap arena so resolver entries can
//! hold stable keys back to their owning collection for the whole run.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use slotmap::{new_key_type, SlotMap};

use kiln_uri::Uri;

use crate::error::{ConfigurationValidationError, IndexError};
use crate::reader::read_document;

const DEFAULT_TITLE: &str = "Kiln";
const DEFAULT_DESCRIPTION: &str = "A JSON Schema registry";

new_key_type! {
    /// Stable key of a [`Collection`] within its [`Configuration`].
    pub struct CollectionKey;
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                    model                                     ║
║                                   ¯¯¯¯¯¯¯                                    ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Page metadata attached to directories of the explorer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Display title.
    pub title: Option<String>,
    /// Display description.
    pub description: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// GitHub account or repository.
    pub github: Option<String>,
    /// Website URL.
    pub website: Option<String>,
}

/// A directory of schemas mounted under a path in the registry.
#[derive(Debug, Clone)]
pub struct Collection {
    /// The relative path the collection is mounted at.
    pub name: String,
    /// Page metadata of the collection's directory.
    pub page: Page,
    /// On-disk root of the collection; canonical, exists.
    pub absolute_path: PathBuf,
    /// Canonical base URI the collection's schemas identify under.
    pub base: Uri,
    /// Dialect assumed for schemas that do not declare one.
    pub default_dialect: Option<String>,
    /// Reference-for-reference substitutions, the per-collection escape
    /// hatch for references the rebasing rules cannot reach.
    pub resolve: BTreeMap<String, String>,
    /// `x-…` flags set to `true` on the collection entry.
    pub extra: BTreeSet<String>,
}

/// One entry of the registry: a collection of schemas or a plain page.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A schema collection, stored in the arena.
    Collection(CollectionKey),
    /// A plain page.
    Page(Page),
}

/// The "action" button of the explorer header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Link target.
    pub url: String,
    /// Icon name.
    pub icon: String,
    /// Button label.
    pub title: String,
}

/// The effective registry configuration.
#[derive(Debug)]
pub struct Configuration {
    /// Canonical base URL of the registry.
    pub url: Uri,
    /// Port the server is expected to listen on.
    pub port: u16,
    /// Registry title.
    pub title: String,
    /// Registry description.
    pub description: String,
    /// Raw HTML injected into every page head.
    pub head: Option<String>,
    /// Raw HTML hero fragment of the index page.
    pub hero: Option<String>,
    /// The header action button.
    pub action: Option<Action>,
    /// The collection arena.
    pub collections: SlotMap<CollectionKey, Collection>,
    /// Entries by relative path.
    pub entries: BTreeMap<String, Entry>,
}

impl Configuration {
    /// The registry URL without a trailing slash, for prefixing paths.
    #[must_use]
    pub fn url_string(&self) -> String {
        self.url.recompose().trim_end_matches('/').to_owned()
    }

    /// Page metadata for a relative directory path, whatever kind of entry
    /// covers it.
    #[must_use]
    pub fn page(&self, relative_path: &str) -> Option<&Page> {
        match self.entries.get(relative_path)? {
            Entry::Page(page) => Some(page),
            Entry::Collection(key) => Some(&self.collections[*key].page),
        }
    }

    /// The trimmed form served as the `configuration.json` artifact.
    #[must_use]
    pub fn summary(&self) -> Value {
        let mut summary = Map::new();
        summary.insert("url".to_owned(), Value::String(self.url_string()));
        summary.insert("port".to_owned(), Value::from(self.port));
        summary.insert("title".to_owned(), Value::String(self.title.clone()));
        summary.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        if let Some(head) = &self.head {
            summary.insert("head".to_owned(), Value::String(head.clone()));
        }
        if let Some(hero) = &self.hero {
            summary.insert("hero".to_owned(), Value::String(hero.clone()));
        }
        if let Some(action) = &self.action {
            summary.insert(
                "action".to_owned(),
                json!({
                    "url": action.url,
                    "icon": action.icon,
                    "title": action.title,
                }),
            );
        }
        Value::Object(summary)
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   reading                                    ║
║                                  ¯¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Reads a configuration file and inlines its transitive `extends` chain
/// into a single normalised JSON document.
///
/// # Errors
/// Fails on unreadable files, malformed documents, or an `extends` cycle.
pub fn read(path: &Path, collections_directory: &Path) -> Result<Value, IndexError> {
    let canonical = fs::canonicalize(path).map_err(|source| IndexError::io(path, source))?;
    let mut data = read_document(&canonical)?;
    let directory = canonical
        .parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
    let mut stack = vec![canonical];
    preprocess(collections_directory, &directory, &mut data, &mut stack)?;

    if let Some(object) = data.as_object_mut() {
        object
            .entry("title".to_owned())
            .or_insert_with(|| Value::String(DEFAULT_TITLE.to_owned()));
        object
            .entry("description".to_owned())
            .or_insert_with(|| Value::String(DEFAULT_DESCRIPTION.to_owned()));
    }
    Ok(data)
}

fn preprocess(
    collections_directory: &Path,
    directory: &Path,
    configuration: &mut Value,
    stack: &mut Vec<PathBuf>,
) -> Result<(), IndexError> {
    let Some(object) = configuration.as_object() else {
        return Ok(());
    };
    let mut result = Map::new();

    if let Some(extends) = object.get("extends").and_then(Value::as_array) {
        for extension in extends {
            let Some(name) = extension.as_str() else {
                continue;
            };
            let extension_path = match name.strip_prefix('@') {
                Some(preset) => collections_directory.join(preset).join("registry.json"),
                None => directory.join(name).join("registry.json"),
            };
            let extension_path = fs::canonicalize(&extension_path)
                .map_err(|source| IndexError::io(&extension_path, source))?;
            if stack.contains(&extension_path) {
                return Err(ConfigurationValidationError::new(
                    extension_path,
                    "/extends",
                    "the extends chain forms a cycle",
                )
                .into());
            }
            let extension_directory = extension_path
                .parent()
                .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);

            let mut extension_json = read_document(&extension_path)?;
            stack.push(extension_path);
            preprocess(
                collections_directory,
                &extension_directory,
                &mut extension_json,
                stack,
            )?;
            stack.pop();

            fix_paths(&extension_directory, &mut extension_json);
            if let Some(extension_object) = extension_json.as_object() {
                for (key, value) in extension_object {
                    result.insert(key.clone(), value.clone());
                }
            }
        }
    }

    if let Some(object) = configuration.as_object() {
        for (key, value) in object {
            result.insert(key.clone(), value.clone());
        }
    }
    *configuration = Value::Object(result);
    Ok(())
}

// Relative collection paths inside an extension are relative to that
// extension's own directory, not to the file being extended.
fn fix_paths(extension_directory: &Path, extension_json: &mut Value) {
    let Some(schemas) = extension_json
        .get_mut("schemas")
        .and_then(Value::as_object_mut)
    else {
        return;
    };
    for entry in schemas.values_mut() {
        let Some(path) = entry.get("path").and_then(Value::as_str) else {
            continue;
        };
        if Path::new(path).is_relative() {
            let absolute = extension_directory.join(path);
            if let Some(entry) = entry.as_object_mut() {
                entry.insert(
                    "path".to_owned(),
                    Value::String(absolute.to_string_lossy().into_owned()),
                );
            }
        }
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   parsing                                    ║
║                                  ¯¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Parses the normalised configuration document into the typed model.
///
/// # Errors
/// Every shape violation maps to a [`ConfigurationValidationError`] naming
/// the file, the JSON Pointer and the problem.
pub fn parse(path: &Path, collections_directory: &Path) -> Result<Configuration, IndexError> {
    let data = read(path, collections_directory)?;
    let invalid = |pointer: &str, message: &str| -> IndexError {
        ConfigurationValidationError::new(path, pointer, message).into()
    };

    let object = data
        .as_object()
        .ok_or_else(|| invalid("", "the configuration must be an object"))?;

    let url = object
        .get("url")
        .ok_or_else(|| invalid("", "missing 'url' required property"))?
        .as_str()
        .ok_or_else(|| invalid("/url", "the 'url' property must be a string"))?;
    let url = Uri::parse(url)
        .map_err(|error| invalid("/url", &error.to_string()))?
        .canonicalize();
    if url.is_relative() {
        return Err(invalid("/url", "the 'url' property must be absolute"));
    }

    let port = object
        .get("port")
        .ok_or_else(|| invalid("", "missing 'port' required property"))?
        .as_u64()
        .filter(|port| (1..=u64::from(u16::MAX)).contains(port))
        .ok_or_else(|| invalid("/port", "the 'port' property must be a positive integer"))? as u16;

    let title = string_property(object, "title", path)?.unwrap_or_else(|| DEFAULT_TITLE.to_owned());
    let description = string_property(object, "description", path)?
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_owned());
    let hero = string_property(object, "hero", path)?;
    let head = string_property(object, "head", path)?;

    let action = match object.get("action") {
        None => None,
        Some(Value::Object(action)) => {
            let field = |name: &str| -> Result<String, IndexError> {
                action
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        ConfigurationValidationError::new(
                            path,
                            format!("/action/{name}"),
                            format!("the 'action/{name}' property must be a string"),
                        )
                        .into()
                    })
            };
            Some(Action {
                url: field("url")?,
                icon: field("icon")?,
                title: field("title")?,
            })
        }
        Some(_) => return Err(invalid("/action", "the 'action' property must be an object")),
    };

    let mut collections = SlotMap::with_key();
    let mut entries = BTreeMap::new();

    let schemas = object
        .get("schemas")
        .ok_or_else(|| invalid("", "missing 'schemas' required property"))?
        .as_object()
        .ok_or_else(|| invalid("/schemas", "the 'schemas' property must be an object"))?;
    let directory = fs::canonicalize(path)
        .map_err(|source| IndexError::io(path, source))?
        .parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);

    for (name, entry) in schemas {
        let pointer = |suffix: &str| format!("/schemas/{name}{suffix}");
        let entry_object = entry
            .as_object()
            .ok_or_else(|| invalid(&pointer(""), "each schemas entry must be an object"))?;
        let page = parse_page(entry_object, path, &pointer(""))?;

        if let Some(collection_path) = entry_object.get("path") {
            let collection_path = collection_path.as_str().ok_or_else(|| {
                invalid(&pointer("/path"), "the 'path' property must be a string")
            })?;
            let absolute_path = directory.join(collection_path);
            let absolute_path = fs::canonicalize(&absolute_path).map_err(|_| {
                ConfigurationValidationError::new(
                    path,
                    pointer("/path"),
                    "the collection path does not exist",
                )
            })?;

            let base = entry_object
                .get("base")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    invalid(&pointer(""), "collections require a 'base' string property")
                })?;
            let base = Uri::parse(base)
                .map_err(|error| invalid(&pointer("/base"), &error.to_string()))?
                .canonicalize();
            if base.is_relative() {
                return Err(invalid(&pointer("/base"), "the 'base' URI must be absolute"));
            }

            let default_dialect = entry_object
                .get("defaultDialect")
                .and_then(Value::as_str)
                .map(str::to_owned);

            let mut resolve = BTreeMap::new();
            if let Some(map) = entry_object.get("resolve").and_then(Value::as_object) {
                for (from, to) in map {
                    let to = to.as_str().ok_or_else(|| {
                        invalid(&pointer("/resolve"), "resolve values must be strings")
                    })?;
                    let to = Uri::parse(&to.to_lowercase())
                        .map_err(|error| invalid(&pointer("/resolve"), &error.to_string()))?
                        .canonicalize();
                    resolve.insert(from.clone(), to.recompose());
                }
            }

            let mut extra = BTreeSet::new();
            for (key, value) in entry_object {
                if key.starts_with("x-") && value == &Value::Bool(true) {
                    extra.insert(key.clone());
                }
            }

            let key = collections.insert(Collection {
                name: name.clone(),
                page,
                absolute_path,
                base,
                default_dialect,
                resolve,
                extra,
            });
            entries.insert(name.clone(), Entry::Collection(key));
        } else {
            entries.insert(name.clone(), Entry::Page(page));
        }
    }

    // The flat `pages` mapping is an alias for page entries; `schemas` wins.
    if let Some(pages) = object.get("pages").and_then(Value::as_object) {
        for (name, entry) in pages {
            let entry_object = entry.as_object().ok_or_else(|| {
                invalid(&format!("/pages/{name}"), "each pages entry must be an object")
            })?;
            let page = parse_page(entry_object, path, &format!("/pages/{name}"))?;
            entries
                .entry(name.clone())
                .or_insert(Entry::Page(page));
        }
    }

    Ok(Configuration {
        url,
        port,
        title,
        description,
        head,
        hero,
        action,
        collections,
        entries,
    })
}

fn parse_page(
    object: &Map<String, Value>,
    file: &Path,
    pointer_prefix: &str,
) -> Result<Page, IndexError> {
    let mut page = Page::default();
    for (field, slot) in [
        ("title", &mut page.title),
        ("description", &mut page.description),
        ("email", &mut page.email),
        ("github", &mut page.github),
        ("website", &mut page.website),
    ] {
        match object.get(field) {
            None => {}
            Some(Value::String(value)) => *slot = Some(value.clone()),
            Some(_) => {
                return Err(ConfigurationValidationError::new(
                    file,
                    format!("{pointer_prefix}/{field}"),
                    format!("the '{field}' property must be a string"),
                )
                .into())
            }
        }
    }
    Ok(page)
}

fn string_property(
    object: &Map<String, Value>,
    name: &str,
    file: &Path,
) -> Result<Option<String>, IndexError> {
    match object.get(name) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ConfigurationValidationError::new(
            file,
            format!("/{name}"),
            format!("the '{name}' property must be a string"),
        )
        .into()),
    }
}
