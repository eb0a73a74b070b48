//! The official JSON Schema dialects and their identifying metadata.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::error::{SchemaError, SchemaResolutionError};

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                 BaseDialect                                  ║
║                                ¯¯¯¯¯¯¯¯¯¯¯¯¯                                 ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// One of the official JSON Schema specification releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseDialect {
    /// Draft 2020-12.
    Draft2020_12,
    /// Draft 2019-09.
    Draft2019_09,
    /// Draft 7.
    Draft7,
    /// Draft 6.
    Draft6,
    /// Draft 4.
    Draft4,
}

impl BaseDialect {
    /// The short form used in navigation documents and badge URLs, e.g.
    /// `2020-12` or `draft7`.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Draft2020_12 => "2020-12",
            Self::Draft2019_09 => "2019-09",
            Self::Draft7 => "draft7",
            Self::Draft6 => "draft6",
            Self::Draft4 => "draft4",
        }
    }

    /// The keyword that carries a schema's identifier in this dialect.
    #[must_use]
    pub fn identifier_keyword(self) -> &'static str {
        match self {
            Self::Draft4 => "id",
            _ => "$id",
        }
    }

    /// The spelling of the identifier keyword this dialect does *not* use.
    #[must_use]
    pub fn foreign_identifier_keyword(self) -> &'static str {
        match self {
            Self::Draft4 => "$id",
            _ => "id",
        }
    }

    /// The container keyword under which bundled schemas are inlined.
    #[must_use]
    pub fn definitions_keyword(self) -> &'static str {
        match self {
            Self::Draft2020_12 | Self::Draft2019_09 => "$defs",
            _ => "definitions",
        }
    }

    /// The canonical meta-schema URI of this dialect.
    #[must_use]
    pub fn metaschema(self) -> &'static str {
        match self {
            Self::Draft2020_12 => "https://json-schema.org/draft/2020-12/schema",
            Self::Draft2019_09 => "https://json-schema.org/draft/2019-09/schema",
            Self::Draft7 => "http://json-schema.org/draft-07/schema#",
            Self::Draft6 => "http://json-schema.org/draft-06/schema#",
            Self::Draft4 => "http://json-schema.org/draft-04/schema#",
        }
    }

    /// The core vocabulary URI, for the dialects that have vocabularies.
    #[must_use]
    pub fn core_vocabulary(self) -> Option<&'static str> {
        match self {
            Self::Draft2020_12 => Some("https://json-schema.org/draft/2020-12/vocab/core"),
            Self::Draft2019_09 => Some("https://json-schema.org/draft/2019-09/vocab/core"),
            _ => None,
        }
    }
}

/// Maps a dialect URI to its official release, accepting `http`/`https`
/// spellings and an optional empty fragment.
#[must_use]
pub fn base_dialect_for(dialect: &str) -> Option<BaseDialect> {
    let trimmed = dialect.trim_end_matches('#');
    let trimmed = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))?;
    match trimmed {
        "json-schema.org/draft/2020-12/schema" => Some(BaseDialect::Draft2020_12),
        "json-schema.org/draft/2019-09/schema" => Some(BaseDialect::Draft2019_09),
        "json-schema.org/draft-07/schema" => Some(BaseDialect::Draft7),
        "json-schema.org/draft-06/schema" => Some(BaseDialect::Draft6),
        "json-schema.org/draft-04/schema" => Some(BaseDialect::Draft4),
        _ => None,
    }
}

/// Whether the given URI names an official meta-schema.
#[must_use]
pub fn is_official_dialect(dialect: &str) -> bool {
    base_dialect_for(dialect).is_some()
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                               OfficialResolver                               ║
║                              ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                               ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// A source of schema documents, keyed by absolute identifier.
pub trait SchemaResolver {
    /// Returns the schema identified by `identifier`, or `None` when this
    /// resolver does not know it.
    ///
    /// # Errors
    /// Implementations may fail while reading or rewriting the schema.
    fn resolve_schema(&self, identifier: &str) -> Result<Option<Value>, SchemaError>;
}

impl<T: SchemaResolver + ?Sized> SchemaResolver for &T {
    fn resolve_schema(&self, identifier: &str) -> Result<Option<Value>, SchemaError> {
        (**self).resolve_schema(identifier)
    }
}

// The registry never serves meta-schema bodies; these trimmed documents are
// enough for dialect detection, rebasing decisions and fallback resolution.
static METASCHEMAS: Lazy<HashMap<&'static str, Value>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        "https://json-schema.org/draft/2020-12/schema",
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://json-schema.org/draft/2020-12/schema",
            "$vocabulary": {
                "https://json-schema.org/draft/2020-12/vocab/core": true,
                "https://json-schema.org/draft/2020-12/vocab/applicator": true,
                "https://json-schema.org/draft/2020-12/vocab/unevaluated": true,
                "https://json-schema.org/draft/2020-12/vocab/validation": true,
                "https://json-schema.org/draft/2020-12/vocab/meta-data": true,
                "https://json-schema.org/draft/2020-12/vocab/format-annotation": true,
                "https://json-schema.org/draft/2020-12/vocab/content": true
            },
            "$dynamicAnchor": "meta"
        }),
    );
    table.insert(
        "https://json-schema.org/draft/2019-09/schema",
        json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://json-schema.org/draft/2019-09/schema",
            "$vocabulary": {
                "https://json-schema.org/draft/2019-09/vocab/core": true,
                "https://json-schema.org/draft/2019-09/vocab/applicator": true,
                "https://json-schema.org/draft/2019-09/vocab/validation": true,
                "https://json-schema.org/draft/2019-09/vocab/meta-data": true,
                "https://json-schema.org/draft/2019-09/vocab/format": false,
                "https://json-schema.org/draft/2019-09/vocab/content": true
            },
            "$recursiveAnchor": true
        }),
    );
    table.insert(
        "http://json-schema.org/draft-07/schema",
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": "http://json-schema.org/draft-07/schema#"
        }),
    );
    table.insert(
        "http://json-schema.org/draft-06/schema",
        json!({
            "$schema": "http://json-schema.org/draft-06/schema#",
            "$id": "http://json-schema.org/draft-06/schema#"
        }),
    );
    table.insert(
        "http://json-schema.org/draft-04/schema",
        json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "id": "http://json-schema.org/draft-04/schema#"
        }),
    );
    table
});

/// Returns the official meta-schema identified by `identifier`, if any.
#[must_use]
pub fn official_metaschema(identifier: &str) -> Option<&'static Value> {
    let key = identifier.trim_end_matches('#');
    if let Some(value) = METASCHEMAS.get(key) {
        return Some(value);
    }
    // The legacy drafts are registered under their `http` spelling.
    let downgraded = key.strip_prefix("https://").map(|rest| format!("http://{rest}"))?;
    METASCHEMAS.get(downgraded.as_str())
}

/// The resolver that knows the official meta-schemas and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfficialResolver;

impl SchemaResolver for OfficialResolver {
    fn resolve_schema(&self, identifier: &str) -> Result<Option<Value>, SchemaError> {
        Ok(official_metaschema(identifier).cloned())
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                        identification & reidentifying                        ║
║                       ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                        ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// The `$schema` value of a schema document, or the supplied default.
#[must_use]
pub fn dialect_of(schema: &Value, default_dialect: Option<&str>) -> Option<String> {
    schema
        .get("$schema")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| default_dialect.map(str::to_owned))
}

/// Follows the `$schema` chain of a (possibly custom) dialect until it
/// reaches an official release.
///
/// # Errors
/// Fails when a custom meta-schema cannot be resolved, or when the chain
/// never reaches an official dialect.
pub fn base_dialect_of_dialect(
    dialect: &str,
    resolver: &dyn SchemaResolver,
) -> Result<BaseDialect, SchemaError> {
    let mut current = dialect.to_owned();
    let mut seen: Vec<String> = Vec::new();
    loop {
        if let Some(base) = base_dialect_for(&current) {
            return Ok(base);
        }
        if seen.contains(&current) {
            return Err(SchemaError::UnknownDialect {
                identifier: dialect.to_owned(),
            });
        }
        seen.push(current.clone());
        let meta = resolver
            .resolve_schema(&current)?
            .ok_or_else(|| SchemaResolutionError {
                identifier: current.clone(),
            })?;
        match meta.get("$schema").and_then(Value::as_str) {
            // A meta-schema declaring itself is its own base.
            Some(next) if next == current => {
                return Err(SchemaError::UnknownDialect {
                    identifier: dialect.to_owned(),
                })
            }
            Some(next) => current = next.to_owned(),
            None => {
                return Err(SchemaError::UnknownDialect {
                    identifier: dialect.to_owned(),
                })
            }
        }
    }
}

/// Loosely extracts the declared identifier of a schema: the dialect's
/// identifier keyword when the dialect is known, either spelling otherwise.
#[must_use]
pub fn identify_loose(schema: &Value, base_dialect: Option<BaseDialect>) -> Option<&str> {
    let object = schema.as_object()?;
    match base_dialect {
        Some(dialect) => object
            .get(dialect.identifier_keyword())
            .and_then(Value::as_str),
        None => object
            .get("$id")
            .and_then(Value::as_str)
            .or_else(|| object.get("id").and_then(Value::as_str)),
    }
}

/// Assigns `identifier` as the schema's identity, using the dialect's
/// keyword and dropping the foreign spelling.
pub fn reidentify(schema: &mut Value, identifier: &str, base_dialect: BaseDialect) {
    if let Some(object) = schema.as_object_mut() {
        object.remove(base_dialect.foreign_identifier_keyword());
        object.insert(
            base_dialect.identifier_keyword().to_owned(),
            Value::String(identifier.to_owned()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_dialects_are_recognised() {
        assert_eq!(
            base_dialect_for("https://json-schema.org/draft/2020-12/schema"),
            Some(BaseDialect::Draft2020_12)
        );
        assert_eq!(
            base_dialect_for("http://json-schema.org/draft-07/schema#"),
            Some(BaseDialect::Draft7)
        );
        assert_eq!(
            base_dialect_for("https://json-schema.org/draft-04/schema#"),
            Some(BaseDialect::Draft4)
        );
        assert_eq!(base_dialect_for("https://example.com/meta"), None);
    }

    #[test]
    fn official_metaschemas_resolve_under_both_spellings() {
        assert!(official_metaschema("http://json-schema.org/draft-07/schema#").is_some());
        assert!(official_metaschema("https://json-schema.org/draft-07/schema#").is_some());
        assert!(official_metaschema("https://json-schema.org/draft/2020-12/schema").is_some());
        assert!(official_metaschema("https://example.com/meta").is_none());
    }

    #[test]
    fn identify_respects_the_dialect_keyword() {
        let draft4 = json!({"id": "https://example.com/a", "$id": "ignored"});
        assert_eq!(
            identify_loose(&draft4, Some(BaseDialect::Draft4)),
            Some("https://example.com/a")
        );
        let modern = json!({"$id": "https://example.com/b"});
        assert_eq!(
            identify_loose(&modern, Some(BaseDialect::Draft2020_12)),
            Some("https://example.com/b")
        );
        assert_eq!(identify_loose(&modern, None), Some("https://example.com/b"));
    }

    #[test]
    fn reidentify_swaps_spellings() {
        let mut schema = json!({"id": "https://example.com/a"});
        reidentify(&mut schema, "https://example.com/b", BaseDialect::Draft7);
        assert_eq!(schema, json!({"$id": "https://example.com/b"}));
    }

    #[test]
    fn custom_dialect_chain_reaches_official() {
        struct Custom;
        impl SchemaResolver for Custom {
            fn resolve_schema(&self, identifier: &str) -> Result<Option<Value>, SchemaError> {
                if identifier == "https://example.com/meta" {
                    Ok(Some(json!({
                        "$schema": "https://json-schema.org/draft/2020-12/schema",
                        "$id": "https://example.com/meta"
                    })))
                } else {
                    Ok(official_metaschema(identifier).cloned())
                }
            }
        }
        assert_eq!(
            base_dialect_of_dialect("https://example.com/meta", &Custom).unwrap(),
            BaseDialect::Draft2020_12
        );
    }
}
