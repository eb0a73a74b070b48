//! Canonical key ordering for pretty-printed schemas.
//!
//! Schema documents read better with their structural keywords first:
//! `$schema` and the identifier lead, metadata follows, assertions and
//! applicators after that, and anything unrecognised trails alphabetically.

use serde_json::{Map, Value};

// Lower ranks print first; unknown keywords share the sentinel rank and are
// ordered among themselves alphabetically.
fn rank(keyword: &str) -> usize {
    const ORDER: &[&str] = &[
        "$schema",
        "$id",
        "id",
        "$vocabulary",
        "$anchor",
        "$dynamicAnchor",
        "$recursiveAnchor",
        "title",
        "description",
        "$comment",
        "deprecated",
        "readOnly",
        "writeOnly",
        "examples",
        "default",
        "type",
        "enum",
        "const",
        "$ref",
        "$dynamicRef",
        "$recursiveRef",
        "required",
        "properties",
        "patternProperties",
        "additionalProperties",
        "unevaluatedProperties",
        "propertyNames",
        "minProperties",
        "maxProperties",
        "dependentRequired",
        "dependentSchemas",
        "dependencies",
        "prefixItems",
        "items",
        "additionalItems",
        "unevaluatedItems",
        "contains",
        "minContains",
        "maxContains",
        "minItems",
        "maxItems",
        "uniqueItems",
        "minimum",
        "exclusiveMinimum",
        "maximum",
        "exclusiveMaximum",
        "multipleOf",
        "minLength",
        "maxLength",
        "pattern",
        "format",
        "contentEncoding",
        "contentMediaType",
        "contentSchema",
        "if",
        "then",
        "else",
        "allOf",
        "anyOf",
        "oneOf",
        "not",
        "$defs",
        "definitions",
    ];
    ORDER
        .iter()
        .position(|known| *known == keyword)
        .unwrap_or(ORDER.len())
}

/// Recursively reorders every object so schema keywords print in canonical
/// order. Values are untouched.
#[must_use]
pub fn schema_format(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort_by(|left, right| {
                rank(left)
                    .cmp(&rank(right))
                    .then_with(|| left.cmp(right))
            });
            let mut ordered = Map::with_capacity(object.len());
            for key in keys {
                ordered.insert(key.clone(), schema_format(&object[key.as_str()]));
            }
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(schema_format).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structural_keywords_lead() {
        let formatted = schema_format(&json!({
            "type": "object",
            "$id": "https://example.com/a",
            "custom": true,
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "another": 1
        }));
        let keys: Vec<&String> = formatted.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["$schema", "$id", "type", "another", "custom"]);
    }

    #[test]
    fn nesting_is_reordered_too() {
        let formatted = schema_format(&json!({
            "properties": {
                "a": { "type": "string", "$ref": "x" }
            }
        }));
        let keys: Vec<&String> = formatted["properties"]["a"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, ["type", "$ref"]);
    }
}
