//! Schema quality linting.
//!
//! The health report applies a bundle of schema-quality rules to every
//! subschema, checks that declared `examples` and `default` values actually
//! validate, and condenses the outcome into a 0–100 score.

use jsonptr::Resolve;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::compiler::{compile, evaluate};
use crate::dialect::SchemaResolver;
use crate::error::SchemaError;
use crate::frame::{Frame, LocationKind};

/// One lint finding.
#[derive(Debug, Clone, Serialize)]
pub struct HealthError {
    /// JSON Pointer of the offending subschema.
    pub pointer: String,
    /// The rule that fired.
    pub name: String,
    /// What is wrong.
    pub message: String,
    /// Optional elaboration.
    pub description: Option<String>,
}

/// The health report artifact.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// 0–100; 100 when nothing fired.
    pub score: u64,
    /// Every finding, in document order.
    pub errors: Vec<HealthError>,
}

enum Outcome {
    Skip,
    Pass,
    Fail(String),
}

struct Rule {
    name: &'static str,
    description: Option<&'static str>,
    check: fn(&Map<String, Value>) -> Outcome,
}

static RULES: &[Rule] = &[
    Rule {
        name: "enum_with_single_value",
        description: Some("An enumeration with a single value is better expressed as a constant"),
        check: |object| match object.get("enum").and_then(Value::as_array) {
            Some(values) if values.len() == 1 => {
                Outcome::Fail("the enum declares a single value; prefer const".to_owned())
            }
            Some(_) => Outcome::Pass,
            None => Outcome::Skip,
        },
    },
    Rule {
        name: "duplicate_enum_values",
        description: None,
        check: |object| match object.get("enum").and_then(Value::as_array) {
            Some(values) => {
                for (index, left) in values.iter().enumerate() {
                    if values.iter().skip(index + 1).any(|right| left == right) {
                        return Outcome::Fail(format!(
                            "the enum value {left} is declared more than once"
                        ));
                    }
                }
                Outcome::Pass
            }
            None => Outcome::Skip,
        },
    },
    Rule {
        name: "const_with_type",
        description: Some("A constant already implies its type"),
        check: |object| {
            if object.contains_key("const") {
                if object.contains_key("type") {
                    Outcome::Fail("the type keyword is redundant next to const".to_owned())
                } else {
                    Outcome::Pass
                }
            } else {
                Outcome::Skip
            }
        },
    },
    Rule {
        name: "exclusive_minimum_with_minimum",
        description: None,
        check: |object| {
            match (
                object.get("minimum").and_then(Value::as_f64),
                object.get("exclusiveMinimum").and_then(Value::as_f64),
            ) {
                (Some(_), Some(_)) => Outcome::Fail(
                    "minimum and exclusiveMinimum are both set; only one can win".to_owned(),
                ),
                (Some(_), None) | (None, Some(_)) => Outcome::Pass,
                (None, None) => Outcome::Skip,
            }
        },
    },
    Rule {
        name: "exclusive_maximum_with_maximum",
        description: None,
        check: |object| {
            match (
                object.get("maximum").and_then(Value::as_f64),
                object.get("exclusiveMaximum").and_then(Value::as_f64),
            ) {
                (Some(_), Some(_)) => Outcome::Fail(
                    "maximum and exclusiveMaximum are both set; only one can win".to_owned(),
                ),
                (Some(_), None) | (None, Some(_)) => Outcome::Pass,
                (None, None) => Outcome::Skip,
            }
        },
    },
    Rule {
        name: "single_type_array",
        description: Some("A single-element type array can be a plain string"),
        check: |object| match object.get("type") {
            Some(Value::Array(types)) if types.len() == 1 => {
                Outcome::Fail("the type array declares a single type".to_owned())
            }
            Some(_) => Outcome::Pass,
            None => Outcome::Skip,
        },
    },
    Rule {
        name: "empty_required",
        description: None,
        check: |object| match object.get("required").and_then(Value::as_array) {
            Some(values) if values.is_empty() => {
                Outcome::Fail("an empty required array asserts nothing".to_owned())
            }
            Some(_) => Outcome::Pass,
            None => Outcome::Skip,
        },
    },
];

/// Lints `schema` and produces its health report.
///
/// # Errors
/// Fails when the schema cannot be framed.
pub fn health(
    schema: &Value,
    resolver: &dyn SchemaResolver,
    default_dialect: Option<&str>,
    default_identifier: Option<&str>,
) -> Result<HealthReport, SchemaError> {
    let frame = Frame::analyse(schema, resolver, default_dialect, default_identifier)?;
    let mut considered = 0u64;
    let mut errors = Vec::new();

    // The root carries the document's public face.
    if let Some(root) = schema.as_object() {
        considered += 1;
        if !root.get("description").is_some_and(Value::is_string) {
            errors.push(HealthError {
                pointer: String::new(),
                name: "missing_description".to_owned(),
                message: "the schema has no top-level description".to_owned(),
                description: Some(
                    "Descriptions drive documentation, tooling hints and search".to_owned(),
                ),
            });
        }
    }

    for location in &frame.locations {
        if !matches!(
            location.kind,
            LocationKind::Resource | LocationKind::Subschema
        ) {
            continue;
        }
        let Ok(node) = schema.resolve(&location.pointer) else {
            continue;
        };
        let Some(object) = node.as_object() else {
            continue;
        };

        for rule in RULES {
            match (rule.check)(object) {
                Outcome::Skip => {}
                Outcome::Pass => considered += 1,
                Outcome::Fail(message) => {
                    considered += 1;
                    errors.push(HealthError {
                        pointer: location.pointer.to_string(),
                        name: rule.name.to_owned(),
                        message,
                        description: rule.description.map(str::to_owned),
                    });
                }
            }
        }

        // Instances the author vouched for must actually validate.
        let examples = object.get("examples").and_then(Value::as_array);
        let default = object.get("default");
        if examples.is_some() || default.is_some() {
            let template = compile(node, resolver, Some(&location.base.recompose()))?;
            if let Some(examples) = examples {
                for (index, example) in examples.iter().enumerate() {
                    considered += 1;
                    if !evaluate(&template, example).valid {
                        errors.push(HealthError {
                            pointer: location.pointer.to_string(),
                            name: "valid_examples".to_owned(),
                            message: format!(
                                "example #{index} does not validate against the schema"
                            ),
                            description: None,
                        });
                    }
                }
            }
            if let Some(default) = default {
                considered += 1;
                if !evaluate(&template, default).valid {
                    errors.push(HealthError {
                        pointer: location.pointer.to_string(),
                        name: "valid_default".to_owned(),
                        message: "the default value does not validate against the schema"
                            .to_owned(),
                        description: None,
                    });
                }
            }
        }
    }

    let failed = errors.len() as u64;
    let score = if considered == 0 {
        100
    } else {
        ((considered.saturating_sub(failed)) * 100 + considered / 2) / considered
    };
    Ok(HealthReport { score, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::OfficialResolver;
    use serde_json::json;

    fn report(schema: Value) -> HealthReport {
        health(&schema, &OfficialResolver, None, Some("https://example.com/x")).unwrap()
    }

    #[test]
    fn clean_schemas_score_high() {
        let outcome = report(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/clean",
            "description": "A clean schema",
            "type": "string"
        }));
        assert_eq!(outcome.score, 100);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn single_value_enums_are_flagged() {
        let outcome = report(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/x",
            "description": "d",
            "properties": {
                "kind": { "enum": ["only"] }
            }
        }));
        assert!(outcome
            .errors
            .iter()
            .any(|error| error.name == "enum_with_single_value"
                && error.pointer == "/properties/kind"));
        assert!(outcome.score < 100);
    }

    #[test]
    fn invalid_examples_are_flagged() {
        let outcome = report(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/x",
            "description": "d",
            "type": "string",
            "examples": ["fine", 42]
        }));
        let findings: Vec<_> = outcome
            .errors
            .iter()
            .filter(|error| error.name == "valid_examples")
            .collect();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("#1"));
    }

    #[test]
    fn missing_description_is_flagged_at_the_root_only() {
        let outcome = report(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/x",
            "properties": { "a": { "type": "string" } }
        }));
        let findings: Vec<_> = outcome
            .errors
            .iter()
            .filter(|error| error.name == "missing_description")
            .collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pointer, "");
    }

    #[test]
    fn scores_are_bounded() {
        let outcome = report(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/x",
            "enum": ["only"],
            "type": ["string"]
        }));
        assert!(outcome.score <= 100);
    }
}
