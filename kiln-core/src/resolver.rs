//! The registry resolver.
//!
//! Registration assigns every schema file a canonical identifier under the
//! server base URL; resolution serves schemas by identifier with every
//! reference rewritten into the registry's identifier space. Identifiers are
//! kept lowercase internally to avoid tricky cases with case-insensitive
//! operating systems.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use ahash::AHashMap;
use jsonptr::ResolveMut;
use serde_json::Value;
use tracing::debug;

use kiln_json_schema::{
    dialect_of, identify_loose, is_official_dialect, reidentify, Frame, OfficialResolver,
    SchemaError, SchemaResolver,
};
use kiln_uri::Uri;

use crate::configuration::{Collection, CollectionKey, Configuration};
use crate::error::{DuplicateIdentifierError, IndexError, ResolverOutsideBaseError};
use crate::metapack;
use crate::reader::read_document;

const LOCK_ERR: &str = "resolver lock poisoned; a worker panicked";

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                    Entry                                     ║
║                                   ¯¯¯¯¯¯¯                                    ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Everything the resolver records about one registered schema.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Path of the materialised artifact, once it exists; resolution then
    /// short-circuits to reading it.
    pub cache_path: Option<PathBuf>,
    /// The original on-disk file, YAML or JSON.
    pub path: PathBuf,
    /// The effective dialect, rebased under the registry when custom.
    pub dialect: String,
    /// The final identifier relative to the server base URL.
    pub relative_path: String,
    /// The identifier the schema carried before rewriting.
    pub original_identifier: String,
    /// The owning collection.
    pub collection: CollectionKey,
}

/// The resolver: a mapping from lowercased final identifier to [`Entry`].
#[derive(Debug)]
pub struct Resolver<'a> {
    configuration: &'a Configuration,
    entries: RwLock<AHashMap<String, Entry>>,
}

impl<'a> Resolver<'a> {
    /// Creates an empty resolver over the given configuration.
    #[must_use]
    pub fn new(configuration: &'a Configuration) -> Self {
        Self {
            configuration,
            entries: RwLock::new(AHashMap::new()),
        }
    }

    /// The number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect(LOCK_ERR).len()
    }

    /// Whether no schema has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of the registered entries, keyed by final
    /// identifier.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Entry)> {
        let entries = self.entries.read().expect(LOCK_ERR);
        let mut snapshot: Vec<(String, Entry)> = entries
            .iter()
            .map(|(identifier, entry)| (identifier.clone(), entry.clone()))
            .collect();
        snapshot.sort_by(|left, right| left.0.cmp(&right.0));
        snapshot
    }

    /*
    ───────────────────────────────── add ─────────────────────────────────
    */

    /// Registers a schema file under its collection, returning the pair of
    /// (original identifier, final identifier).
    ///
    /// # Errors
    /// Fails when the file cannot be read, the declared identifier escapes
    /// the collection base, or the final identifier is already taken by a
    /// different file.
    pub fn add(&self, collection_key: CollectionKey, path: &Path) -> Result<(String, String), IndexError> {
        debug_assert!(path.is_absolute());
        let collection = &self.configuration.collections[collection_key];
        let schema = read_document(path)?;

        // The file-system-based identifier this schema gets when it does not
        // declare a usable one.
        let relative = path
            .strip_prefix(&collection.absolute_path)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let default_identifier = collection
            .base
            .clone()
            .append_path(&relative)
            .canonicalize()
            .recompose();

        // Try our best to determine the declared identifier, loosely.
        let base_dialect = dialect_of(&schema, collection.default_dialect.as_deref())
            .as_deref()
            .and_then(kiln_json_schema::base_dialect_for);
        let declared = identify_loose(&schema, base_dialect)
            .unwrap_or(&default_identifier)
            .to_lowercase();
        let declared = Uri::parse(&declared)?.canonicalize();
        let mut identifier = if declared.is_relative() {
            format!("{}/{}", collection.base.recompose(), declared.recompose())
        } else {
            declared.recompose()
        };

        // The collection base itself is not a usable identifier; fall back
        // to the file-system-based one. Trailing slashes are equal enough
        // in this context, whatever canonicalisation thinks.
        let base_string = collection.base.recompose();
        if identifier == base_string || identifier == format!("{base_string}/") {
            identifier = default_identifier.clone();
        }
        if !identifier.starts_with(&base_string) {
            return Err(ResolverOutsideBaseError {
                identifier,
                base: base_string,
            }
            .into());
        }

        let Some(final_identifier) = rebase_into_registry(
            &self.configuration.url,
            collection,
            &Uri::parse(&identifier)?,
        )?
        else {
            // A bare string-prefix match (e.g. `…/schemas-evil` under
            // `…/schemas`) is not containment.
            return Err(ResolverOutsideBaseError {
                identifier,
                base: base_string,
            }
            .into());
        };
        if final_identifier.contains("..") {
            return Err(ResolverOutsideBaseError {
                identifier: final_identifier,
                base: base_string,
            }
            .into());
        }

        // The dialect: official meta-schemas stay verbatim, anything else
        // lives under the registry too.
        let raw_dialect = dialect_of(&schema, collection.default_dialect.as_deref())
            .ok_or_else(|| SchemaError::UnknownDialect {
                identifier: final_identifier.clone(),
            })?;
        let dialect = if is_official_dialect(&raw_dialect) {
            raw_dialect
        } else {
            let lowered = Uri::parse(&raw_dialect.to_lowercase())?;
            rebase_into_registry(&self.configuration.url, collection, &lowered)?
                .unwrap_or(raw_dialect.to_lowercase())
        };

        let relative_path = Uri::parse(&final_identifier)?
            .relative_to(&self.configuration.url)
            .recompose();

        let key = final_identifier.to_lowercase();
        let entry = Entry {
            cache_path: None,
            path: path.to_path_buf(),
            dialect,
            relative_path,
            original_identifier: identifier.clone(),
            collection: collection_key,
        };

        let mut entries = self.entries.write().expect(LOCK_ERR);
        if let Some(existing) = entries.get(&key) {
            if existing.path != path {
                return Err(DuplicateIdentifierError {
                    identifier: key,
                    existing: existing.path.clone(),
                    duplicate: path.to_path_buf(),
                }
                .into());
            }
            return Ok((existing.original_identifier.clone(), key));
        }
        debug!(identifier = %key, file = %path.display(), "registered");
        entries.insert(key.clone(), entry);
        Ok((identifier, key))
    }

    /*
    ─────────────────────────────── resolve ───────────────────────────────
    */

    /// Resolves an identifier to its rewritten schema, falling back to the
    /// official meta-schemas. `callback` is invoked with every file read on
    /// behalf of this resolution, so builds can record dynamic dependencies.
    ///
    /// # Errors
    /// Fails when the schema or one of its references cannot be processed.
    pub fn resolve(
        &self,
        identifier: &str,
        callback: Option<&dyn Fn(&Path)>,
    ) -> Result<Option<Value>, IndexError> {
        let key = identifier.to_lowercase();
        let found = {
            let entries = self.entries.read().expect(LOCK_ERR);
            let entry = entries.get(&key).or_else(|| {
                // We add a `.json` extension when a schema doesn't carry it
                // by default, so try that before giving up.
                if key.ends_with(".json") {
                    None
                } else {
                    entries.get(&format!("{key}.json"))
                }
            });
            entry.cloned()
        };

        let Some(entry) = found else {
            return Ok(OfficialResolver
                .resolve_schema(identifier)
                .map_err(IndexError::Schema)?);
        };

        // Avoid rebasing on the fly if possible: the materialised artifact
        // is guaranteed to be the rewritten JSON.
        if let Some(cache_path) = &entry.cache_path {
            let schema = metapack::read_json(cache_path)?;
            if let Some(callback) = callback {
                callback(cache_path);
            }
            return Ok(Some(schema));
        }

        let mut schema = read_document(&entry.path)?;
        if let Some(callback) = callback {
            callback(&entry.path);
        }
        if !schema.is_object() {
            return Ok(Some(schema));
        }

        // Declare the intended dialect explicitly before analysing, so any
        // custom meta-schema resolves through the registry rather than
        // chicken-and-egg against the original identifiers.
        if let Some(object) = schema.as_object_mut() {
            object.insert(
                "$schema".to_owned(),
                Value::String(entry.dialect.clone()),
            );
        }

        let final_key = self.final_key(&key);
        // A meta-schema declaring itself as its own dialect never bottoms
        // out; refuse it instead of recursing into it.
        if entry.dialect.to_lowercase() == final_key {
            return Err(IndexError::Schema(SchemaError::UnknownDialect {
                identifier: final_key,
            }));
        }
        self.normalise_references(&mut schema, &entry, &final_key, callback)?;

        let adapter = Adapter {
            resolver: self,
            callback,
        };
        let base_dialect = kiln_json_schema::base_dialect_for(&entry.dialect)
            .map_or_else(
                || kiln_json_schema::dialect::base_dialect_of_dialect(&entry.dialect, &adapter),
                Ok,
            )
            .map_err(IndexError::Schema)?;
        reidentify(&mut schema, &final_key, base_dialect);
        Ok(Some(schema))
    }

    // The key the entry is actually registered under, accounting for the
    // `.json` fallback.
    fn final_key(&self, key: &str) -> String {
        let entries = self.entries.read().expect(LOCK_ERR);
        if entries.contains_key(key) {
            key.to_owned()
        } else {
            format!("{key}.json")
        }
    }

    fn normalise_references(
        &self,
        schema: &mut Value,
        entry: &Entry,
        final_key: &str,
        callback: Option<&dyn Fn(&Path)>,
    ) -> Result<(), IndexError> {
        let collection = &self.configuration.collections[entry.collection];
        let adapter = Adapter {
            resolver: self,
            callback,
        };
        let frame = Frame::analyse(
            schema,
            &adapter,
            Some(&entry.dialect),
            Some(&entry.original_identifier),
        )
        .map_err(IndexError::Schema)?;
        let final_uri = Uri::parse(final_key)?;

        for reference in &frame.references {
            // In 2019-09, `$recursiveRef` can only be `#`, so there is
            // nothing we could possibly rewrite.
            if reference.keyword == "$recursiveRef" {
                continue;
            }
            // We never want to mess with internal references; we assume
            // those are always well formed.
            if reference.value.starts_with('#') {
                continue;
            }

            let rewritten = if let Some(substitute) = collection.resolve.get(&reference.value) {
                // A match in the configuration resolver is trusted as-is.
                Some(substitute.clone())
            } else {
                let parsed = Uri::parse(&reference.value)?;
                if parsed.is_relative() {
                    None
                } else {
                    // Lowercase only the path component: the fragment may
                    // carry a JSON Pointer whose case is meaningful.
                    let lowered = parsed.lowercase_path();
                    // References relativise against their own location's
                    // base, carried into the registry's identifier space.
                    let location_base = rebase_into_registry(
                        &self.configuration.url,
                        collection,
                        &reference.base.clone().lowercase_path(),
                    )?
                    .map(|rebased| Uri::parse(&rebased))
                    .transpose()?
                    .unwrap_or_else(|| final_uri.clone());
                    self.rewrite_absolute_reference(
                        collection,
                        &lowered,
                        &reference.base,
                        &location_base,
                    )?
                }
            };

            let Some(rewritten) = rewritten else {
                continue;
            };
            if rewritten == reference.value {
                continue;
            }
            let node = schema
                .resolve_mut(&reference.node)
                .ok()
                .and_then(Value::as_object_mut)
                .ok_or_else(|| {
                    IndexError::Schema(SchemaError::DanglingPointer {
                        pointer: reference.node.to_string(),
                    })
                })?;
            node.insert(reference.keyword.clone(), Value::String(rewritten));
        }
        Ok(())
    }

    // Rewrites one absolute reference into the registry's identifier space:
    // targets under the collection base move to their final identifiers and
    // are expressed relative to this schema's final identifier whenever the
    // result needs no `..` escape; same-server targets elsewhere still become
    // relative, with parent segments.
    fn rewrite_absolute_reference(
        &self,
        collection: &Collection,
        reference: &Uri,
        original_base: &Uri,
        final_uri: &Uri,
    ) -> Result<Option<String>, IndexError> {
        let Some(rebased) =
            rebase_into_registry(&self.configuration.url, collection, reference)?
        else {
            // Outside the collection base: relativise against the original
            // base and leave whatever that yields.
            let relativised = reference.clone().relative_to(original_base);
            return Ok(Some(relativised.recompose()));
        };

        let rebased_uri = Uri::parse(&rebased)?;
        let fragment = rebased_uri.fragment().map(str::to_owned);
        let relative = rebased_uri.clone().relative_to(final_uri);
        if relative.is_relative() && !relative.path().is_empty() {
            return Ok(Some(relative.recompose()));
        }

        // Same server, different subtree: express with parent segments so
        // the materialised form never hard-codes the server origin.
        if let Some(relative) = make_relative(final_uri, &rebased_uri) {
            let mut rewritten = relative;
            if let Some(fragment) = fragment {
                rewritten.push('#');
                rewritten.push_str(&fragment);
            }
            return Ok(Some(rewritten));
        }
        Ok(Some(rebased))
    }

    /*
    ───────────────────────────── materialise ─────────────────────────────
    */

    /// Records the materialised artifact for an identifier so subsequent
    /// resolutions short-circuit to reading it.
    pub fn materialise(&self, identifier: &str, path: &Path) {
        debug_assert!(path.exists());
        let key = identifier.to_lowercase();
        let mut entries = self.entries.write().expect(LOCK_ERR);
        if let Some(entry) = entries.get_mut(&key) {
            entry.cache_path = Some(path.to_path_buf());
        }
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   helpers                                    ║
║                                  ¯¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// An adapter exposing the resolver (plus dependency callback) through the
/// analysis-side trait.
pub struct Adapter<'r, 'a> {
    /// The resolver to delegate to.
    pub resolver: &'r Resolver<'a>,
    /// Invoked with every file read on behalf of a resolution.
    pub callback: Option<&'r dyn Fn(&Path)>,
}

impl SchemaResolver for Adapter<'_, '_> {
    fn resolve_schema(&self, identifier: &str) -> Result<Option<Value>, SchemaError> {
        self.resolver
            .resolve(identifier, self.callback)
            .map_err(|error| match error {
                IndexError::Schema(inner) => inner,
                other => SchemaError::Resolver {
                    identifier: identifier.to_owned(),
                    message: other.to_string(),
                },
            })
    }
}

// Maps a URI under the collection base to its final registry identifier:
// `<server>/<collection>/<suffix>`, canonical, with a forced `.json`
// extension. Returns `None` when the URI is not under the collection base.
fn rebase_into_registry(
    server_url: &Uri,
    collection: &Collection,
    uri: &Uri,
) -> Result<Option<String>, IndexError> {
    let relative = uri.clone().relative_to(&collection.base);
    if !relative.is_relative() || relative.path().is_empty() {
        return Ok(None);
    }
    let fragment = relative.fragment().map(str::to_owned);
    let rebased = server_url
        .clone()
        .append_path(&collection.name)
        .append_path(relative.path())
        .canonicalize()
        .extension("json");
    let rebased = match fragment {
        Some(fragment) => rebased.with_fragment(Some(&fragment)),
        None => rebased,
    };
    Ok(Some(rebased.recompose()))
}

// RFC 3986-style relativisation with parent segments, for same-origin URIs
// the prefix-based operation cannot express.
fn make_relative(base: &Uri, target: &Uri) -> Option<String> {
    let (Uri::Absolute(base_url), Uri::Absolute(target_url)) = (base, target) else {
        return None;
    };
    base_url.make_relative(target_url)
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                    tests                                     ║
║                                   ¯¯¯¯¯¯¯                                    ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration;
    use serde_json::json;
    use std::fs;

    struct Fixture {
        _directory: tempfile::TempDir,
        configuration: Configuration,
        schemas: PathBuf,
    }

    fn fixture(files: &[(&str, Value)]) -> Fixture {
        let directory = tempfile::tempdir().unwrap();
        let schemas = directory.path().join("schemas");
        fs::create_dir_all(&schemas).unwrap();
        for (name, contents) in files {
            let path = schemas.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, serde_json::to_string_pretty(contents).unwrap()).unwrap();
        }
        let config_path = directory.path().join("config.json");
        fs::write(
            &config_path,
            serde_json::to_string(&json!({
                "url": "http://localhost:8000",
                "port": 8000,
                "schemas": {
                    "example": { "path": "schemas", "base": "https://example.com/schemas" }
                }
            }))
            .unwrap(),
        )
        .unwrap();
        let configuration = configuration::parse(&config_path, directory.path()).unwrap();
        let schemas = schemas.canonicalize().unwrap();
        Fixture {
            _directory: directory,
            configuration,
            schemas,
        }
    }

    fn collection_key(configuration: &Configuration) -> CollectionKey {
        match configuration.entries["example"] {
            configuration::Entry::Collection(key) => key,
            configuration::Entry::Page(_) => unreachable!(),
        }
    }

    #[test]
    fn registration_assigns_the_final_identifier() {
        let fixture = fixture(&[(
            "a.json",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/schemas/a"
            }),
        )]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        let (original, finalised) = resolver.add(key, &fixture.schemas.join("a.json")).unwrap();
        assert_eq!(original, "https://example.com/schemas/a");
        assert_eq!(finalised, "http://localhost:8000/example/a.json");
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn resolution_rewrites_the_identifier() {
        let fixture = fixture(&[(
            "a.json",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/schemas/a"
            }),
        )]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        resolver.add(key, &fixture.schemas.join("a.json")).unwrap();

        let schema = resolver
            .resolve("http://localhost:8000/example/a.json", None)
            .unwrap()
            .unwrap();
        assert_eq!(
            schema.get("$id").and_then(Value::as_str),
            Some("http://localhost:8000/example/a.json")
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let fixture = fixture(&[(
            "a.json",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/schemas/a"
            }),
        )]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        resolver.add(key, &fixture.schemas.join("a.json")).unwrap();

        let lower = resolver
            .resolve("http://localhost:8000/example/a.json", None)
            .unwrap();
        let upper = resolver
            .resolve("HTTP://LOCALHOST:8000/EXAMPLE/A.JSON", None)
            .unwrap();
        assert_eq!(lower, upper);
        assert!(lower.is_some());
    }

    #[test]
    fn missing_extension_falls_back_to_json() {
        let fixture = fixture(&[(
            "a.json",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/schemas/a"
            }),
        )]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        resolver.add(key, &fixture.schemas.join("a.json")).unwrap();
        assert!(resolver
            .resolve("http://localhost:8000/example/a", None)
            .unwrap()
            .is_some());
    }

    #[test]
    fn absolute_references_become_relative() {
        let fixture = fixture(&[
            (
                "a.json",
                json!({
                    "$schema": "https://json-schema.org/draft/2020-12/schema",
                    "$id": "https://example.com/schemas/a"
                }),
            ),
            (
                "b.json",
                json!({
                    "$schema": "https://json-schema.org/draft/2020-12/schema",
                    "$id": "https://example.com/schemas/b",
                    "$ref": "https://example.com/schemas/a"
                }),
            ),
        ]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        resolver.add(key, &fixture.schemas.join("a.json")).unwrap();
        resolver.add(key, &fixture.schemas.join("b.json")).unwrap();

        let schema = resolver
            .resolve("http://localhost:8000/example/b.json", None)
            .unwrap()
            .unwrap();
        assert_eq!(schema.get("$ref").and_then(Value::as_str), Some("a.json"));
    }

    #[test]
    fn duplicate_identifiers_are_fatal() {
        let fixture = fixture(&[
            (
                "x1.json",
                json!({
                    "$schema": "https://json-schema.org/draft/2020-12/schema",
                    "$id": "https://example.com/schemas/x"
                }),
            ),
            (
                "x2.json",
                json!({
                    "$schema": "https://json-schema.org/draft/2020-12/schema",
                    "$id": "https://example.com/schemas/x"
                }),
            ),
        ]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        resolver.add(key, &fixture.schemas.join("x1.json")).unwrap();
        let error = resolver
            .add(key, &fixture.schemas.join("x2.json"))
            .unwrap_err();
        assert!(matches!(error, IndexError::DuplicateIdentifier(_)));
    }

    #[test]
    fn identifiers_outside_the_base_are_fatal() {
        let fixture = fixture(&[(
            "evil.json",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://elsewhere.com/schemas/evil"
            }),
        )]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        let error = resolver
            .add(key, &fixture.schemas.join("evil.json"))
            .unwrap_err();
        assert!(matches!(error, IndexError::OutsideBase(_)));
    }

    #[test]
    fn undeclared_identifiers_default_to_the_file_path() {
        let fixture = fixture(&[(
            "nested/plain.json",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "type": "object"
            }),
        )]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        let (original, finalised) = resolver
            .add(key, &fixture.schemas.join("nested/plain.json"))
            .unwrap();
        assert_eq!(original, "https://example.com/schemas/nested/plain.json");
        assert_eq!(finalised, "http://localhost:8000/example/nested/plain.json");
    }

    #[test]
    fn unknown_identifiers_fall_back_to_official_metaschemas() {
        let fixture = fixture(&[]);
        let resolver = Resolver::new(&fixture.configuration);
        assert!(resolver
            .resolve("https://json-schema.org/draft/2020-12/schema", None)
            .unwrap()
            .is_some());
        assert!(resolver
            .resolve("https://nowhere.example.com/x", None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn registration_is_idempotent_per_path() {
        let fixture = fixture(&[(
            "a.json",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/schemas/a"
            }),
        )]);
        let resolver = Resolver::new(&fixture.configuration);
        let key = collection_key(&fixture.configuration);
        let first = resolver.add(key, &fixture.schemas.join("a.json")).unwrap();
        let second = resolver.add(key, &fixture.schemas.join("a.json")).unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.len(), 1);
    }
}
