//! Static analysis of a schema document.
//!
//! A frame enumerates every subschema of a document together with the base
//! URI, dialect and base dialect in effect at that location, plus every
//! reference edge. The resolver, the bundler, the dependency enumerator and
//! the location artifact generator are all built on top of it.

use std::collections::{HashMap, HashSet};

use jsonptr::PointerBuf;
use kiln_uri::Uri;
use serde_json::{Map, Value};

use crate::dialect::{
    base_dialect_for, base_dialect_of_dialect, dialect_of, identify_loose, BaseDialect,
    SchemaResolver,
};
use crate::error::SchemaError;
use crate::walker::{classify, KeywordKind};

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                    Frame                                     ║
║                                   ¯¯¯¯¯¯¯                                    ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// What a frame location points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    /// A schema resource: a subschema that declares its own identifier.
    Resource,
    /// A plain subschema, addressed by a JSON Pointer from its resource.
    Subschema,
    /// A named anchor within a resource.
    Anchor,
}

impl LocationKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Subschema => "subschema",
            Self::Anchor => "anchor",
        }
    }
}

/// One addressable location inside a schema document.
#[derive(Debug, Clone)]
pub struct Location {
    /// The static location URI.
    pub uri: String,
    /// The kind of location.
    pub kind: LocationKind,
    /// JSON Pointer from the document root.
    pub pointer: PointerBuf,
    /// JSON Pointer from the enclosing resource.
    pub relative_pointer: PointerBuf,
    /// The base URI in effect.
    pub base: Uri,
    /// The dialect in effect.
    pub dialect: String,
    /// The official release the dialect bottoms out at.
    pub base_dialect: BaseDialect,
}

/// One `$ref`-like edge found in a schema document.
#[derive(Debug, Clone)]
pub struct Reference {
    /// JSON Pointer of the subschema object holding the keyword.
    pub node: PointerBuf,
    /// JSON Pointer of the keyword value itself.
    pub at: PointerBuf,
    /// The reference keyword (`$ref`, `$dynamicRef`, `$recursiveRef`).
    pub keyword: String,
    /// The vocabulary defining the keyword, when the dialect has
    /// vocabularies.
    pub vocabulary: Option<&'static str>,
    /// The base URI in effect at the node.
    pub base: Uri,
    /// The raw reference value.
    pub value: String,
    /// The reference resolved against the base.
    pub target: Uri,
    /// The base dialect in effect at the node.
    pub base_dialect: BaseDialect,
}

/// The full static analysis of one schema document.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Every addressable location, in document order.
    pub locations: Vec<Location>,
    /// Every reference edge, in document order.
    pub references: Vec<Reference>,
}

impl Frame {
    /// Analyses `schema`, using `resolver` to chase custom meta-schemas.
    ///
    /// `default_identifier` is the base URI assumed when the document does
    /// not declare one; it must be absolute.
    ///
    /// # Errors
    /// Fails when the dialect cannot be determined, when the document has
    /// neither an identifier nor a default, or when an embedded URI is
    /// malformed.
    pub fn analyse(
        schema: &Value,
        resolver: &dyn SchemaResolver,
        default_dialect: Option<&str>,
        default_identifier: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let dialect = dialect_of(schema, default_dialect).ok_or_else(|| {
            SchemaError::UnknownDialect {
                identifier: default_identifier.unwrap_or_default().to_owned(),
            }
        })?;

        let mut analyser = Analyser {
            resolver,
            dialect_cache: HashMap::new(),
            frame: Frame::default(),
        };
        let base_dialect = analyser.base_dialect(&dialect)?;

        // Establish the root base. The walk resolves a declared identifier
        // against this itself, so the default wins when supplied; a relative
        // declared identifier with no default has nothing to resolve against.
        let declared = identify_loose(schema, Some(base_dialect));
        let base = match (declared, default_identifier) {
            (_, Some(default)) => Uri::parse(default)?.canonicalize(),
            (Some(id), None) => {
                let parsed = Uri::parse(id)?;
                if parsed.is_relative() {
                    return Err(SchemaError::MissingIdentifier);
                }
                parsed.canonicalize()
            }
            (None, None) => return Err(SchemaError::MissingIdentifier),
        };

        analyser.walk(
            schema,
            PointerBuf::new(),
            PointerBuf::new(),
            &base,
            &dialect,
            base_dialect,
            true,
        )?;
        Ok(analyser.frame)
    }

    /// The resource locations of the document.
    pub fn resources(&self) -> impl Iterator<Item = &Location> {
        self.locations
            .iter()
            .filter(|location| location.kind == LocationKind::Resource)
    }

    /// The set of resource URIs declared by the document.
    #[must_use]
    pub fn resource_uris(&self) -> HashSet<String> {
        self.resources()
            .map(|location| location.uri.clone())
            .collect()
    }

    /// Maps every resource and anchor URI to its document pointer.
    #[must_use]
    pub fn uri_pointers(&self) -> HashMap<String, PointerBuf> {
        self.locations
            .iter()
            .filter(|location| location.kind != LocationKind::Subschema)
            .map(|location| (location.uri.clone(), location.pointer.clone()))
            .collect()
    }

    /// The locations artifact form: static location URI to its metadata.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut output = Map::new();
        for location in &self.locations {
            let mut entry = Map::new();
            entry.insert(
                "type".to_owned(),
                Value::String(location.kind.as_str().to_owned()),
            );
            entry.insert(
                "pointer".to_owned(),
                Value::String(location.pointer.to_string()),
            );
            entry.insert("base".to_owned(), Value::String(location.base.recompose()));
            entry.insert(
                "dialect".to_owned(),
                Value::String(location.dialect.clone()),
            );
            entry.insert(
                "baseDialect".to_owned(),
                Value::String(location.base_dialect.short_name().to_owned()),
            );
            output.insert(location.uri.clone(), Value::Object(entry));
        }
        Value::Object(output)
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   Analyser                                   ║
║                                  ¯¯¯¯¯¯¯¯¯¯                                  ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

struct Analyser<'a> {
    resolver: &'a dyn SchemaResolver,
    dialect_cache: HashMap<String, BaseDialect>,
    frame: Frame,
}

impl Analyser<'_> {
    fn base_dialect(&mut self, dialect: &str) -> Result<BaseDialect, SchemaError> {
        if let Some(base) = base_dialect_for(dialect) {
            return Ok(base);
        }
        if let Some(base) = self.dialect_cache.get(dialect) {
            return Ok(*base);
        }
        let base = base_dialect_of_dialect(dialect, self.resolver)?;
        self.dialect_cache.insert(dialect.to_owned(), base);
        Ok(base)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &mut self,
        value: &Value,
        pointer: PointerBuf,
        relative_pointer: PointerBuf,
        base: &Uri,
        dialect: &str,
        base_dialect: BaseDialect,
        document_root: bool,
    ) -> Result<(), SchemaError> {
        let object = match value {
            Value::Object(object) => object,
            Value::Bool(_) => {
                let kind = if document_root {
                    LocationKind::Resource
                } else {
                    LocationKind::Subschema
                };
                self.push_location(
                    kind,
                    pointer,
                    relative_pointer,
                    base,
                    dialect,
                    base_dialect,
                );
                return Ok(());
            }
            _ => return Ok(()),
        };

        // A `$schema` switch is honoured at resource roots only.
        let mut dialect = dialect.to_owned();
        let mut base_dialect = base_dialect;
        if let Some(declared) = object.get("$schema").and_then(Value::as_str) {
            let candidate = self.base_dialect(declared)?;
            if document_root
                || object
                    .get(candidate.identifier_keyword())
                    .and_then(Value::as_str)
                    .is_some()
            {
                dialect = declared.to_owned();
                base_dialect = candidate;
            }
        }

        // Identity: establishes a new resource, unless the identifier is a
        // legacy `#anchor` form.
        let mut base = base.clone();
        let mut relative_pointer = relative_pointer;
        let declared_identifier = object
            .get(base_dialect.identifier_keyword())
            .and_then(Value::as_str);
        match declared_identifier {
            Some(id) if id.starts_with('#') => {
                let uri = format!("{}#{}", base.recompose(), &id[1..]);
                self.push_anchor(uri, pointer.clone(), &base, &dialect, base_dialect);
                if document_root {
                    self.push_location(
                        LocationKind::Resource,
                        pointer.clone(),
                        relative_pointer.clone(),
                        &base,
                        &dialect,
                        base_dialect,
                    );
                }
            }
            Some(id) => {
                base = base.resolve(id)?.with_fragment(None).canonicalize();
                relative_pointer = PointerBuf::new();
                self.push_location(
                    LocationKind::Resource,
                    pointer.clone(),
                    relative_pointer.clone(),
                    &base,
                    &dialect,
                    base_dialect,
                );
            }
            None if document_root => {
                self.push_location(
                    LocationKind::Resource,
                    pointer.clone(),
                    relative_pointer.clone(),
                    &base,
                    &dialect,
                    base_dialect,
                );
            }
            None => {
                self.push_location(
                    LocationKind::Subschema,
                    pointer.clone(),
                    relative_pointer.clone(),
                    &base,
                    &dialect,
                    base_dialect,
                );
            }
        }

        for (keyword, entry) in object {
            let info = classify(base_dialect, keyword);
            match info.kind {
                KeywordKind::Anchor => {
                    if let Some(name) = entry.as_str() {
                        let uri = format!("{}#{name}", base.recompose());
                        let mut at = pointer.clone();
                        at.push_back(keyword.as_str());
                        self.push_anchor(uri, at, &base, &dialect, base_dialect);
                    }
                }
                KeywordKind::Reference => {
                    if let Some(reference) = entry.as_str() {
                        let target = if reference.starts_with('#') {
                            base.clone().with_fragment(Some(&reference[1..]))
                        } else {
                            base.resolve(reference)?
                        };
                        let mut at = pointer.clone();
                        at.push_back(keyword.as_str());
                        self.frame.references.push(Reference {
                            node: pointer.clone(),
                            at,
                            keyword: keyword.clone(),
                            vocabulary: info.vocabulary,
                            base: base.clone(),
                            value: reference.to_owned(),
                            target,
                            base_dialect,
                        });
                    }
                }
                KeywordKind::Schema => {
                    if entry.is_object() || entry.is_boolean() {
                        self.recurse(
                            entry,
                            &pointer,
                            &relative_pointer,
                            keyword,
                            &base,
                            &dialect,
                            base_dialect,
                        )?;
                    }
                }
                KeywordKind::SchemaArray => {
                    if let Some(items) = entry.as_array() {
                        for (index, item) in items.iter().enumerate() {
                            if item.is_object() || item.is_boolean() {
                                let mut child = pointer.clone();
                                child.push_back(keyword.as_str());
                                child.push_back(index.to_string());
                                let mut relative = relative_pointer.clone();
                                relative.push_back(keyword.as_str());
                                relative.push_back(index.to_string());
                                self.walk(
                                    item,
                                    child,
                                    relative,
                                    &base,
                                    &dialect,
                                    base_dialect,
                                    false,
                                )?;
                            }
                        }
                    }
                }
                KeywordKind::SchemaMap => {
                    if let Some(entries) = entry.as_object() {
                        for (name, subschema) in entries {
                            if subschema.is_object() || subschema.is_boolean() {
                                let mut child = pointer.clone();
                                child.push_back(keyword.as_str());
                                child.push_back(name.as_str());
                                let mut relative = relative_pointer.clone();
                                relative.push_back(keyword.as_str());
                                relative.push_back(name.as_str());
                                self.walk(
                                    subschema,
                                    child,
                                    relative,
                                    &base,
                                    &dialect,
                                    base_dialect,
                                    false,
                                )?;
                            }
                        }
                    }
                }
                KeywordKind::SchemaOrSchemaArray => match entry {
                    Value::Object(_) | Value::Bool(_) => {
                        self.recurse(
                            entry,
                            &pointer,
                            &relative_pointer,
                            keyword,
                            &base,
                            &dialect,
                            base_dialect,
                        )?;
                    }
                    Value::Array(items) => {
                        for (index, item) in items.iter().enumerate() {
                            if item.is_object() || item.is_boolean() {
                                let mut child = pointer.clone();
                                child.push_back(keyword.as_str());
                                child.push_back(index.to_string());
                                let mut relative = relative_pointer.clone();
                                relative.push_back(keyword.as_str());
                                relative.push_back(index.to_string());
                                self.walk(
                                    item,
                                    child,
                                    relative,
                                    &base,
                                    &dialect,
                                    base_dialect,
                                    false,
                                )?;
                            }
                        }
                    }
                    _ => {}
                },
                KeywordKind::Identifier | KeywordKind::Other => {}
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn recurse(
        &mut self,
        entry: &Value,
        pointer: &PointerBuf,
        relative_pointer: &PointerBuf,
        keyword: &str,
        base: &Uri,
        dialect: &str,
        base_dialect: BaseDialect,
    ) -> Result<(), SchemaError> {
        let mut child = pointer.clone();
        child.push_back(keyword);
        let mut relative = relative_pointer.clone();
        relative.push_back(keyword);
        self.walk(entry, child, relative, base, dialect, base_dialect, false)
    }

    fn push_location(
        &mut self,
        kind: LocationKind,
        pointer: PointerBuf,
        relative_pointer: PointerBuf,
        base: &Uri,
        dialect: &str,
        base_dialect: BaseDialect,
    ) {
        let uri = match kind {
            LocationKind::Resource => base.recompose(),
            _ => format!("{}#{}", base.recompose(), relative_pointer),
        };
        self.frame.locations.push(Location {
            uri,
            kind,
            pointer,
            relative_pointer,
            base: base.clone(),
            dialect: dialect.to_owned(),
            base_dialect,
        });
    }

    fn push_anchor(
        &mut self,
        uri: String,
        pointer: PointerBuf,
        base: &Uri,
        dialect: &str,
        base_dialect: BaseDialect,
    ) {
        self.frame.locations.push(Location {
            uri,
            kind: LocationKind::Anchor,
            pointer,
            relative_pointer: PointerBuf::new(),
            base: base.clone(),
            dialect: dialect.to_owned(),
            base_dialect,
        });
    }
}
