//! Keyword classification tables, per dialect.
//!
//! The frame analyser, the bundler and the lint rules all need to know which
//! keywords carry subschemas, which carry references and which carry
//! identity. The shapes are stable per specification release, so this is a
//! plain lookup rather than anything data-driven.

use crate::dialect::BaseDialect;

/// How a keyword's value participates in the schema structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    /// A string reference to another schema (`$ref` and friends).
    Reference,
    /// The schema's identity (`$id`, `id`).
    Identifier,
    /// A location anchor (`$anchor`, `$dynamicAnchor`, `$recursiveAnchor`).
    Anchor,
    /// A single subschema value.
    Schema,
    /// An array of subschemas.
    SchemaArray,
    /// An object mapping arbitrary names to subschemas.
    SchemaMap,
    /// Either a single subschema or an array of them (legacy `items`).
    SchemaOrSchemaArray,
    /// Anything else: assertions, annotations, unknown keywords.
    Other,
}

/// The classification of a keyword, with the vocabulary that defines it when
/// the dialect has vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordInfo {
    /// The structural kind of the keyword.
    pub kind: KeywordKind,
    /// The defining vocabulary, for reference keywords of the vocabulary
    /// dialects.
    pub vocabulary: Option<&'static str>,
}

impl KeywordInfo {
    const fn plain(kind: KeywordKind) -> Self {
        Self {
            kind,
            vocabulary: None,
        }
    }
}

/// Classifies `keyword` under the given dialect.
#[must_use]
pub fn classify(base_dialect: BaseDialect, keyword: &str) -> KeywordInfo {
    use KeywordKind::{
        Anchor, Identifier, Other, Reference, Schema, SchemaArray, SchemaMap, SchemaOrSchemaArray,
    };

    // Identity and anchors first; they differ the most across releases.
    if keyword == base_dialect.identifier_keyword() {
        return KeywordInfo::plain(Identifier);
    }
    match (base_dialect, keyword) {
        (BaseDialect::Draft2020_12 | BaseDialect::Draft2019_09, "$anchor")
        | (BaseDialect::Draft2020_12, "$dynamicAnchor")
        | (BaseDialect::Draft2019_09, "$recursiveAnchor") => {
            return KeywordInfo::plain(Anchor)
        }
        _ => {}
    }

    // References.
    match (base_dialect, keyword) {
        (_, "$ref") => {
            return KeywordInfo {
                kind: Reference,
                vocabulary: base_dialect.core_vocabulary(),
            }
        }
        (BaseDialect::Draft2020_12, "$dynamicRef")
        | (BaseDialect::Draft2019_09, "$recursiveRef") => {
            return KeywordInfo {
                kind: Reference,
                vocabulary: base_dialect.core_vocabulary(),
            }
        }
        _ => {}
    }

    // Applicators common to every release the registry accepts. Walking a
    // keyword a release does not define is harmless: the walk only follows
    // values that are themselves schemas.
    let kind = match keyword {
        "allOf" | "anyOf" | "oneOf" => SchemaArray,
        "not" | "additionalProperties" | "propertyNames" | "contains" | "if" | "then" | "else"
        | "additionalItems" | "unevaluatedItems" | "unevaluatedProperties" | "contentSchema" => {
            Schema
        }
        "properties" | "patternProperties" | "$defs" | "definitions" | "dependentSchemas"
        | "dependencies" => SchemaMap,
        "prefixItems" => SchemaArray,
        "items" => match base_dialect {
            BaseDialect::Draft2020_12 => Schema,
            _ => SchemaOrSchemaArray,
        },
        _ => Other,
    };
    KeywordInfo::plain(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_keyword_tracks_the_dialect() {
        assert_eq!(
            classify(BaseDialect::Draft4, "id").kind,
            KeywordKind::Identifier
        );
        assert_eq!(classify(BaseDialect::Draft4, "$id").kind, KeywordKind::Other);
        assert_eq!(
            classify(BaseDialect::Draft2020_12, "$id").kind,
            KeywordKind::Identifier
        );
        assert_eq!(
            classify(BaseDialect::Draft2020_12, "id").kind,
            KeywordKind::Other
        );
    }

    #[test]
    fn dynamic_ref_only_exists_in_2020_12() {
        assert_eq!(
            classify(BaseDialect::Draft2020_12, "$dynamicRef").kind,
            KeywordKind::Reference
        );
        assert_eq!(
            classify(BaseDialect::Draft2019_09, "$dynamicRef").kind,
            KeywordKind::Other
        );
        assert_eq!(
            classify(BaseDialect::Draft2019_09, "$recursiveRef").kind,
            KeywordKind::Reference
        );
    }

    #[test]
    fn items_changed_shape_in_2020_12() {
        assert_eq!(
            classify(BaseDialect::Draft2020_12, "items").kind,
            KeywordKind::Schema
        );
        assert_eq!(
            classify(BaseDialect::Draft7, "items").kind,
            KeywordKind::SchemaOrSchemaArray
        );
    }

    #[test]
    fn reference_keywords_carry_their_vocabulary() {
        assert_eq!(
            classify(BaseDialect::Draft2019_09, "$recursiveRef").vocabulary,
            Some("https://json-schema.org/draft/2019-09/vocab/core")
        );
        assert_eq!(classify(BaseDialect::Draft7, "$ref").vocabulary, None);
    }
}
