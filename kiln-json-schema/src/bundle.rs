//! Bundling, unidentification and dependency enumeration.

use std::collections::HashSet;

use jsonptr::ResolveMut;
use kiln_uri::decode_lossy;
use serde::Serialize;
use serde_json::Value;

use crate::dialect::{
    base_dialect_of_dialect, dialect_of, reidentify, BaseDialect, SchemaResolver,
};
use crate::error::{SchemaError, SchemaResolutionError};
use crate::frame::{Frame, LocationKind};

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                    bundle                                    ║
║                                   ¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Inlines every external reference target under the dialect's definitions
/// container until the schema is self-contained. Embedded targets keep (or
/// are assigned) their identifier, so references resolve without rewriting.
/// Idempotent: a second pass finds nothing external.
///
/// # Errors
/// Fails when a reference target cannot be resolved.
pub fn bundle(
    schema: &mut Value,
    resolver: &dyn SchemaResolver,
    default_dialect: Option<&str>,
) -> Result<(), SchemaError> {
    let mut inserted: HashSet<String> = HashSet::new();
    loop {
        let frame = Frame::analyse(schema, resolver, default_dialect, None)?;
        let known = frame.uri_pointers();
        let root_base_dialect = root_base_dialect(&frame);

        let mut pending: Vec<String> = Vec::new();
        for reference in &frame.references {
            if reference.keyword == "$recursiveRef" {
                continue;
            }
            let document = reference
                .target
                .clone()
                .with_fragment(None)
                .canonicalize()
                .recompose();
            if known.contains_key(&document) || pending.contains(&document) {
                continue;
            }
            pending.push(document);
        }

        if pending.is_empty() {
            return Ok(());
        }

        let Some(container) = schema.as_object_mut() else {
            // A non-object schema cannot hold references in the first place.
            return Ok(());
        };

        let definitions_keyword = root_base_dialect.definitions_keyword();
        for document in pending {
            if !inserted.insert(document.clone()) {
                // Inserting it did not make it resolvable; a third attempt
                // will not either.
                return Err(SchemaResolutionError {
                    identifier: document,
                }
                .into());
            }
            let mut resolved = resolver
                .resolve_schema(&document)?
                .ok_or_else(|| SchemaResolutionError {
                    identifier: document.clone(),
                })?;
            let target_dialect = dialect_of(&resolved, default_dialect);
            let target_base_dialect = match &target_dialect {
                Some(dialect) => base_dialect_of_dialect(dialect, resolver)?,
                None => root_base_dialect,
            };
            reidentify(&mut resolved, &document, target_base_dialect);

            let definitions = container
                .entry(definitions_keyword.to_owned())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Some(definitions) = definitions.as_object_mut() {
                definitions.entry(document).or_insert(resolved);
            }
        }
    }
}

fn root_base_dialect(frame: &Frame) -> BaseDialect {
    frame
        .locations
        .first()
        .map_or(BaseDialect::Draft2020_12, |location| location.base_dialect)
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                  unidentify                                  ║
║                                 ¯¯¯¯¯¯¯¯¯¯¯¯                                 ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Bundles the schema, rewrites every reference into `#/…` pointer form, and
/// strips every identifier below the root so the document has exactly one.
///
/// # Errors
/// Fails when bundling fails.
pub fn unidentify(
    schema: &mut Value,
    resolver: &dyn SchemaResolver,
    default_dialect: Option<&str>,
) -> Result<(), SchemaError> {
    bundle(schema, resolver, default_dialect)?;
    let frame = Frame::analyse(schema, resolver, default_dialect, None)?;
    let pointers = frame.uri_pointers();

    for reference in &frame.references {
        if reference.keyword == "$recursiveRef" {
            continue;
        }
        let document = reference
            .target
            .clone()
            .with_fragment(None)
            .canonicalize()
            .recompose();
        let fragment = reference
            .target
            .fragment()
            .map(|fragment| decode_lossy(fragment).into_owned());
        let Some(resource_pointer) = pointers.get(&document) else {
            continue;
        };

        let rewritten = match fragment.as_deref() {
            None | Some("") => format!("#{resource_pointer}"),
            Some(pointer) if pointer.starts_with('/') => {
                format!("#{resource_pointer}{pointer}")
            }
            Some(anchor) => match pointers.get(&format!("{document}#{anchor}")) {
                Some(anchor_pointer) => format!("#{anchor_pointer}"),
                None => format!("#{resource_pointer}"),
            },
        };
        if rewritten == reference.value {
            continue;
        }
        let node = schema
            .resolve_mut(&reference.node)
            .ok()
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SchemaError::DanglingPointer {
                pointer: reference.node.to_string(),
            })?;
        node.insert(reference.keyword.clone(), Value::String(rewritten));
    }

    // Strip every identifier below the root.
    for location in &frame.locations {
        if location.kind != LocationKind::Resource || location.pointer.to_string().is_empty() {
            continue;
        }
        if let Some(node) = schema
            .resolve_mut(&location.pointer)
            .ok()
            .and_then(Value::as_object_mut)
        {
            node.remove("$id");
            node.remove("id");
        }
    }

    Ok(())
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                 dependencies                                 ║
║                                ¯¯¯¯¯¯¯¯¯¯¯¯¯¯                                ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// One reference edge, as recorded in the dependencies artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyTrace {
    /// The identifier of the resource holding the reference.
    pub from: String,
    /// The identifier of the referenced document.
    pub to: String,
    /// JSON Pointer of the reference keyword.
    pub at: String,
}

/// Enumerates every external reference edge of `schema`, transitively
/// following targets through `resolver`.
///
/// # Errors
/// Fails when a target cannot be resolved.
pub fn dependencies(
    schema: &Value,
    resolver: &dyn SchemaResolver,
    default_dialect: Option<&str>,
) -> Result<Vec<DependencyTrace>, SchemaError> {
    let mut edges = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: Vec<Value> = vec![schema.clone()];

    while let Some(document) = queue.pop() {
        let frame = Frame::analyse(&document, resolver, default_dialect, None)?;
        let local = frame.resource_uris();
        visited.extend(local.iter().cloned());

        for reference in &frame.references {
            if reference.keyword == "$recursiveRef" {
                continue;
            }
            let origin = reference.base.recompose();
            let target = reference
                .target
                .clone()
                .with_fragment(None)
                .canonicalize()
                .recompose();
            if target == origin {
                continue;
            }
            edges.push(DependencyTrace {
                from: origin,
                to: target.clone(),
                at: reference.at.to_string(),
            });
            if visited.contains(&target) || local.contains(&target) {
                continue;
            }
            visited.insert(target.clone());
            let resolved =
                resolver
                    .resolve_schema(&target)?
                    .ok_or_else(|| SchemaResolutionError {
                        identifier: target.clone(),
                    })?;
            queue.push(resolved);
        }
    }

    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, Value>);

    impl SchemaResolver for MapResolver {
        fn resolve_schema(&self, identifier: &str) -> Result<Option<Value>, SchemaError> {
            if let Some(found) = self.0.get(identifier) {
                return Ok(Some(found.clone()));
            }
            Ok(crate::dialect::official_metaschema(identifier).cloned())
        }
    }

    fn resolver() -> MapResolver {
        let mut map = HashMap::new();
        map.insert(
            "https://example.com/schemas/a".to_owned(),
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/schemas/a",
                "type": "string"
            }),
        );
        map.insert(
            "https://example.com/schemas/c".to_owned(),
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/schemas/c",
                "$ref": "a"
            }),
        );
        MapResolver(map)
    }

    #[test]
    fn bundle_inlines_external_targets() {
        let mut schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/schemas/b",
            "$ref": "https://example.com/schemas/a"
        });
        bundle(&mut schema, &resolver(), None).unwrap();
        let definitions = schema.get("$defs").and_then(Value::as_object).unwrap();
        assert!(definitions.contains_key("https://example.com/schemas/a"));
    }

    #[test]
    fn bundle_is_idempotent() {
        let mut schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/schemas/b",
            "$ref": "https://example.com/schemas/a"
        });
        bundle(&mut schema, &resolver(), None).unwrap();
        let once = schema.clone();
        bundle(&mut schema, &resolver(), None).unwrap();
        assert_eq!(once, schema);
    }

    #[test]
    fn bundle_pulls_transitive_targets() {
        let mut schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/schemas/b",
            "$ref": "https://example.com/schemas/c"
        });
        bundle(&mut schema, &resolver(), None).unwrap();
        let definitions = schema.get("$defs").and_then(Value::as_object).unwrap();
        assert!(definitions.contains_key("https://example.com/schemas/c"));
        assert!(definitions.contains_key("https://example.com/schemas/a"));
    }

    #[test]
    fn bundle_fails_on_unknown_targets() {
        let mut schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/schemas/b",
            "$ref": "https://example.com/schemas/missing"
        });
        assert!(matches!(
            bundle(&mut schema, &resolver(), None),
            Err(SchemaError::Resolution(_))
        ));
    }

    #[test]
    fn unidentify_leaves_a_single_identifier() {
        let mut schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/schemas/b",
            "$ref": "https://example.com/schemas/a"
        });
        unidentify(&mut schema, &resolver(), None).unwrap();
        assert_eq!(
            schema.get("$id").and_then(Value::as_str),
            Some("https://example.com/schemas/b")
        );
        let definitions = schema.get("$defs").and_then(Value::as_object).unwrap();
        let inlined = definitions.get("https://example.com/schemas/a").unwrap();
        assert!(inlined.get("$id").is_none());
        let reference = schema.get("$ref").and_then(Value::as_str).unwrap();
        assert!(reference.starts_with("#/"), "got {reference}");
    }

    #[test]
    fn dependencies_are_transitive() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/schemas/b",
            "$ref": "https://example.com/schemas/c"
        });
        let edges = dependencies(&schema, &resolver(), None).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from, "https://example.com/schemas/b");
        assert_eq!(edges[0].to, "https://example.com/schemas/c");
        assert_eq!(edges[1].from, "https://example.com/schemas/c");
        assert_eq!(edges[1].to, "https://example.com/schemas/a");
    }

    #[test]
    fn internal_references_are_not_dependencies() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/schemas/b",
            "$ref": "#/$defs/x",
            "$defs": { "x": { "type": "string" } }
        });
        let edges = dependencies(&schema, &resolver(), None).unwrap();
        assert!(edges.is_empty());
    }
}
