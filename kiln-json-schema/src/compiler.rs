//! Compilation of schemas into flat validation templates.
//!
//! The registry precompiles every schema into a serialisable instruction
//! program so the serving side can evaluate instances without touching the
//! compiler. The same machinery powers the configuration self-check and the
//! `examples`/`default` lint rules. The instruction set covers the assertion
//! keywords the registry cares about; anything it does not understand
//! compiles to nothing, and a reference that cannot be resolved compiles to
//! an inert always-valid program so compilation is total.

use jsonptr::{Pointer, PointerBuf, Resolve};
use kiln_uri::{decode_lossy, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dialect::{identify_loose, SchemaResolver};
use crate::error::SchemaError;

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   Template                                   ║
║                                  ¯¯¯¯¯¯¯¯¯¯                                  ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// A compiled validation program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// The instructions, all of which must hold for an instance to be valid.
    pub instructions: Vec<Instruction>,
}

/// One validation instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Instruction {
    /// Always fails: the `false` schema.
    Never,
    /// The instance must be one of the named primitive types.
    Type { types: Vec<String> },
    /// The instance must equal one of the values.
    Enum { values: Vec<Value> },
    /// The instance must equal the value.
    Const { value: Value },
    /// Object instances must define the named properties.
    Required { properties: Vec<String> },
    /// Object property values must match their templates.
    Properties { entries: Vec<(String, Template)> },
    /// Object properties not named in `except` must not exist (`allowed` is
    /// false) or must match the template.
    AdditionalProperties {
        allowed: bool,
        except: Vec<String>,
        template: Option<Box<Template>>,
    },
    /// Array items from `start` onwards must match the template.
    Items { start: usize, template: Box<Template> },
    /// The first items of an array must match the templates position-wise.
    PrefixItems { templates: Vec<Template> },
    /// At least one array item must match the template.
    Contains { template: Box<Template> },
    /// Every template must hold.
    AllOf { templates: Vec<Template> },
    /// At least one template must hold.
    AnyOf { templates: Vec<Template> },
    /// Exactly one template must hold.
    OneOf { templates: Vec<Template> },
    /// The template must not hold.
    Not { template: Box<Template> },
    /// Numeric lower bound, inclusive.
    Minimum { bound: f64 },
    /// Numeric upper bound, inclusive.
    Maximum { bound: f64 },
    /// Numeric lower bound, exclusive.
    ExclusiveMinimum { bound: f64 },
    /// Numeric upper bound, exclusive.
    ExclusiveMaximum { bound: f64 },
    /// The number must be a multiple of the divisor.
    MultipleOf { divisor: f64 },
    /// String length lower bound, in characters.
    MinLength { bound: usize },
    /// String length upper bound, in characters.
    MaxLength { bound: usize },
    /// The string must match the pattern (unanchored).
    Pattern { pattern: String },
    /// Array length lower bound.
    MinItems { bound: usize },
    /// Array length upper bound.
    MaxItems { bound: usize },
    /// Array items must be pairwise distinct.
    UniqueItems,
    /// Object size lower bound.
    MinProperties { bound: usize },
    /// Object size upper bound.
    MaxProperties { bound: usize },
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   compile                                    ║
║                                  ¯¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Compiles `schema` into a [`Template`], following references through
/// `resolver`.
///
/// # Errors
/// Fails only on malformed URIs; unresolvable references compile to inert
/// instructions.
pub fn compile(
    schema: &Value,
    resolver: &dyn SchemaResolver,
    default_identifier: Option<&str>,
) -> Result<Template, SchemaError> {
    let mut compiler = Compiler {
        resolver,
        seen: Vec::new(),
    };
    let base = document_base(schema, default_identifier)?;
    compiler.compile_node(schema, schema, base.as_ref())
}

fn document_base(schema: &Value, default_identifier: Option<&str>) -> Result<Option<Uri>, SchemaError> {
    let declared = identify_loose(schema, None).or(default_identifier);
    match declared {
        Some(id) => {
            let parsed = Uri::parse(id)?;
            Ok(parsed.is_absolute().then_some(parsed.canonicalize()))
        }
        None => Ok(None),
    }
}

struct Compiler<'a> {
    resolver: &'a dyn SchemaResolver,
    seen: Vec<String>,
}

impl Compiler<'_> {
    fn compile_node(
        &mut self,
        root: &Value,
        node: &Value,
        base: Option<&Uri>,
    ) -> Result<Template, SchemaError> {
        let mut template = Template::default();
        let object = match node {
            Value::Bool(true) => return Ok(template),
            Value::Bool(false) => {
                template.instructions.push(Instruction::Never);
                return Ok(template);
            }
            Value::Object(object) => object,
            _ => return Ok(template),
        };

        if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
            if let Some(inner) = self.compile_reference(root, reference, base)? {
                template.instructions.push(Instruction::AllOf {
                    templates: vec![inner],
                });
            }
        }

        match object.get("type") {
            Some(Value::String(name)) => template.instructions.push(Instruction::Type {
                types: vec![name.clone()],
            }),
            Some(Value::Array(names)) => {
                let types: Vec<String> = names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect();
                if !types.is_empty() {
                    template.instructions.push(Instruction::Type { types });
                }
            }
            _ => {}
        }

        if let Some(values) = object.get("enum").and_then(Value::as_array) {
            template.instructions.push(Instruction::Enum {
                values: values.clone(),
            });
        }
        if let Some(value) = object.get("const") {
            template.instructions.push(Instruction::Const {
                value: value.clone(),
            });
        }
        if let Some(required) = object.get("required").and_then(Value::as_array) {
            let properties: Vec<String> = required
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
            template
                .instructions
                .push(Instruction::Required { properties });
        }

        let declared_properties: Vec<String> = object
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| properties.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(properties) = object.get("properties").and_then(Value::as_object) {
            let mut entries = Vec::with_capacity(properties.len());
            for (name, subschema) in properties {
                entries.push((name.clone(), self.compile_node(root, subschema, base)?));
            }
            template.instructions.push(Instruction::Properties { entries });
        }
        match object.get("additionalProperties") {
            Some(Value::Bool(allowed)) => {
                template.instructions.push(Instruction::AdditionalProperties {
                    allowed: *allowed,
                    except: declared_properties.clone(),
                    template: None,
                });
            }
            Some(subschema @ Value::Object(_)) => {
                template.instructions.push(Instruction::AdditionalProperties {
                    allowed: true,
                    except: declared_properties.clone(),
                    template: Some(Box::new(self.compile_node(root, subschema, base)?)),
                });
            }
            _ => {}
        }

        // `items` changed shape in 2020-12; both forms are accepted here.
        let mut prefix_length = 0usize;
        if let Some(templates) = object.get("prefixItems").and_then(Value::as_array) {
            prefix_length = templates.len();
            let compiled: Result<Vec<_>, _> = templates
                .iter()
                .map(|subschema| self.compile_node(root, subschema, base))
                .collect();
            template.instructions.push(Instruction::PrefixItems {
                templates: compiled?,
            });
        }
        match object.get("items") {
            Some(Value::Array(templates)) => {
                prefix_length = templates.len();
                let compiled: Result<Vec<_>, _> = templates
                    .iter()
                    .map(|subschema| self.compile_node(root, subschema, base))
                    .collect();
                template.instructions.push(Instruction::PrefixItems {
                    templates: compiled?,
                });
                if let Some(additional) = object.get("additionalItems") {
                    if additional.is_object() || additional.is_boolean() {
                        template.instructions.push(Instruction::Items {
                            start: prefix_length,
                            template: Box::new(self.compile_node(root, additional, base)?),
                        });
                    }
                }
            }
            Some(subschema) if subschema.is_object() || subschema.is_boolean() => {
                template.instructions.push(Instruction::Items {
                    start: prefix_length,
                    template: Box::new(self.compile_node(root, subschema, base)?),
                });
            }
            _ => {}
        }
        if let Some(contains) = object.get("contains") {
            if contains.is_object() || contains.is_boolean() {
                template.instructions.push(Instruction::Contains {
                    template: Box::new(self.compile_node(root, contains, base)?),
                });
            }
        }

        for (keyword, build) in [
            ("allOf", Combinator::All),
            ("anyOf", Combinator::Any),
            ("oneOf", Combinator::One),
        ] {
            if let Some(branches) = object.get(keyword).and_then(Value::as_array) {
                let compiled: Result<Vec<_>, _> = branches
                    .iter()
                    .map(|subschema| self.compile_node(root, subschema, base))
                    .collect();
                let templates = compiled?;
                template.instructions.push(match build {
                    Combinator::All => Instruction::AllOf { templates },
                    Combinator::Any => Instruction::AnyOf { templates },
                    Combinator::One => Instruction::OneOf { templates },
                });
            }
        }
        if let Some(negated) = object.get("not") {
            if negated.is_object() || negated.is_boolean() {
                template.instructions.push(Instruction::Not {
                    template: Box::new(self.compile_node(root, negated, base)?),
                });
            }
        }

        self.compile_bounds(object, &mut template);
        Ok(template)
    }

    fn compile_bounds(&self, object: &serde_json::Map<String, Value>, template: &mut Template) {
        let number = |keyword: &str| object.get(keyword).and_then(Value::as_f64);
        let size = |keyword: &str| {
            object
                .get(keyword)
                .and_then(Value::as_u64)
                .map(|bound| bound as usize)
        };

        if let Some(bound) = number("minimum") {
            // Draft 4 spelled exclusivity as a boolean modifier.
            if object.get("exclusiveMinimum") == Some(&Value::Bool(true)) {
                template
                    .instructions
                    .push(Instruction::ExclusiveMinimum { bound });
            } else {
                template.instructions.push(Instruction::Minimum { bound });
            }
        }
        if let Some(bound) = number("maximum") {
            if object.get("exclusiveMaximum") == Some(&Value::Bool(true)) {
                template
                    .instructions
                    .push(Instruction::ExclusiveMaximum { bound });
            } else {
                template.instructions.push(Instruction::Maximum { bound });
            }
        }
        if let Some(bound) = object
            .get("exclusiveMinimum")
            .and_then(Value::as_f64)
        {
            template
                .instructions
                .push(Instruction::ExclusiveMinimum { bound });
        }
        if let Some(bound) = object
            .get("exclusiveMaximum")
            .and_then(Value::as_f64)
        {
            template
                .instructions
                .push(Instruction::ExclusiveMaximum { bound });
        }
        if let Some(divisor) = number("multipleOf") {
            if divisor > 0.0 {
                template.instructions.push(Instruction::MultipleOf { divisor });
            }
        }
        if let Some(bound) = size("minLength") {
            template.instructions.push(Instruction::MinLength { bound });
        }
        if let Some(bound) = size("maxLength") {
            template.instructions.push(Instruction::MaxLength { bound });
        }
        if let Some(pattern) = object.get("pattern").and_then(Value::as_str) {
            // An uncompilable pattern asserts nothing.
            if regex::Regex::new(pattern).is_ok() {
                template.instructions.push(Instruction::Pattern {
                    pattern: pattern.to_owned(),
                });
            }
        }
        if let Some(bound) = size("minItems") {
            template.instructions.push(Instruction::MinItems { bound });
        }
        if let Some(bound) = size("maxItems") {
            template.instructions.push(Instruction::MaxItems { bound });
        }
        if object.get("uniqueItems") == Some(&Value::Bool(true)) {
            template.instructions.push(Instruction::UniqueItems);
        }
        if let Some(bound) = size("minProperties") {
            template.instructions.push(Instruction::MinProperties { bound });
        }
        if let Some(bound) = size("maxProperties") {
            template.instructions.push(Instruction::MaxProperties { bound });
        }
    }

    fn compile_reference(
        &mut self,
        root: &Value,
        reference: &str,
        base: Option<&Uri>,
    ) -> Result<Option<Template>, SchemaError> {
        // Internal pointer references stay within the current document.
        if let Some(fragment) = reference.strip_prefix('#') {
            let decoded = decode_lossy(fragment);
            if decoded.is_empty() {
                return Ok(None);
            }
            if !decoded.starts_with('/') {
                return Ok(None);
            }
            let Ok(pointer) = Pointer::parse(decoded.as_ref()) else {
                return Ok(None);
            };
            let Ok(target) = root.resolve(pointer) else {
                return Ok(None);
            };
            let key = format!("#{decoded}");
            if self.seen.contains(&key) {
                return Ok(None);
            }
            self.seen.push(key);
            let compiled = self.compile_node(root, target, base);
            self.seen.pop();
            return compiled.map(Some);
        }

        let Some(base) = base else {
            return Ok(None);
        };
        let target = base.resolve(reference)?;
        let fragment = target.fragment().map(str::to_owned);
        let document_uri = target.with_fragment(None).canonicalize();
        let key = document_uri.recompose();
        if self.seen.contains(&key) {
            return Ok(None);
        }
        let Some(document) = self.resolver.resolve_schema(&key)? else {
            return Ok(None);
        };
        self.seen.push(key);
        let node = match fragment.as_deref() {
            Some(fragment) if fragment.starts_with('/') => {
                let decoded = decode_lossy(fragment).into_owned();
                match Pointer::parse(&decoded)
                    .ok()
                    .and_then(|pointer| document.resolve(pointer).ok())
                {
                    Some(node) => node.clone(),
                    None => {
                        self.seen.pop();
                        return Ok(None);
                    }
                }
            }
            _ => document.clone(),
        };
        let compiled = self.compile_node(&node, &node, Some(&document_uri));
        self.seen.pop();
        compiled.map(Some)
    }
}

enum Combinator {
    All,
    Any,
    One,
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   evaluate                                   ║
║                                  ¯¯¯¯¯¯¯¯¯¯                                  ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// One failed assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError {
    /// JSON Pointer of the instance location that failed.
    pub instance_location: String,
    /// Human-readable description of the failure.
    pub message: String,
}

/// The outcome of evaluating a template against an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the instance is valid.
    pub valid: bool,
    /// Every failed assertion, outermost first.
    pub errors: Vec<EvaluationError>,
}

/// Evaluates a compiled template against an instance.
#[must_use]
pub fn evaluate(template: &Template, instance: &Value) -> Evaluation {
    let mut errors = Vec::new();
    let valid = eval(template, instance, &PointerBuf::new(), &mut errors);
    Evaluation { valid, errors }
}

fn eval(
    template: &Template,
    instance: &Value,
    location: &PointerBuf,
    errors: &mut Vec<EvaluationError>,
) -> bool {
    let mut valid = true;
    for instruction in &template.instructions {
        if !eval_instruction(instruction, instance, location, errors) {
            valid = false;
        }
    }
    valid
}

fn silent(template: &Template, instance: &Value, location: &PointerBuf) -> bool {
    let mut scratch = Vec::new();
    eval(template, instance, location, &mut scratch)
}

#[allow(clippy::too_many_lines)]
fn eval_instruction(
    instruction: &Instruction,
    instance: &Value,
    location: &PointerBuf,
    errors: &mut Vec<EvaluationError>,
) -> bool {
    let fail = |errors: &mut Vec<EvaluationError>, message: String| {
        errors.push(EvaluationError {
            instance_location: location.to_string(),
            message,
        });
        false
    };

    match instruction {
        Instruction::Never => fail(errors, "no value satisfies this schema".to_owned()),
        Instruction::Type { types } => {
            if types.iter().any(|name| type_matches(name, instance)) {
                true
            } else {
                fail(errors, format!("expected type {}", types.join(" or ")))
            }
        }
        Instruction::Enum { values } => {
            if values.contains(instance) {
                true
            } else {
                fail(errors, "value is not one of the enumerated values".to_owned())
            }
        }
        Instruction::Const { value } => {
            if instance == value {
                true
            } else {
                fail(errors, "value does not equal the expected constant".to_owned())
            }
        }
        Instruction::Required { properties } => {
            let Some(object) = instance.as_object() else {
                return true;
            };
            let mut valid = true;
            for property in properties {
                if !object.contains_key(property) {
                    valid = fail(errors, format!("missing required property \"{property}\""));
                }
            }
            valid
        }
        Instruction::Properties { entries } => {
            let Some(object) = instance.as_object() else {
                return true;
            };
            let mut valid = true;
            for (name, template) in entries {
                if let Some(value) = object.get(name) {
                    let mut child = location.clone();
                    child.push_back(name.as_str());
                    if !eval(template, value, &child, errors) {
                        valid = false;
                    }
                }
            }
            valid
        }
        Instruction::AdditionalProperties {
            allowed,
            except,
            template,
        } => {
            let Some(object) = instance.as_object() else {
                return true;
            };
            let mut valid = true;
            for (name, value) in object {
                if except.contains(name) {
                    continue;
                }
                if !allowed {
                    valid = fail(errors, format!("unexpected property \"{name}\""));
                    continue;
                }
                if let Some(template) = template {
                    let mut child = location.clone();
                    child.push_back(name.as_str());
                    if !eval(template, value, &child, errors) {
                        valid = false;
                    }
                }
            }
            valid
        }
        Instruction::Items { start, template } => {
            let Some(items) = instance.as_array() else {
                return true;
            };
            let mut valid = true;
            for (index, item) in items.iter().enumerate().skip(*start) {
                let mut child = location.clone();
                child.push_back(index.to_string());
                if !eval(template, item, &child, errors) {
                    valid = false;
                }
            }
            valid
        }
        Instruction::PrefixItems { templates } => {
            let Some(items) = instance.as_array() else {
                return true;
            };
            let mut valid = true;
            for (index, (item, template)) in items.iter().zip(templates).enumerate() {
                let mut child = location.clone();
                child.push_back(index.to_string());
                if !eval(template, item, &child, errors) {
                    valid = false;
                }
            }
            valid
        }
        Instruction::Contains { template } => {
            let Some(items) = instance.as_array() else {
                return true;
            };
            if items.iter().any(|item| silent(template, item, location)) {
                true
            } else {
                fail(errors, "no array item matches the contained schema".to_owned())
            }
        }
        Instruction::AllOf { templates } => {
            let mut valid = true;
            for template in templates {
                if !eval(template, instance, location, errors) {
                    valid = false;
                }
            }
            valid
        }
        Instruction::AnyOf { templates } => {
            if templates
                .iter()
                .any(|template| silent(template, instance, location))
            {
                true
            } else {
                fail(errors, "value matches none of the expected schemas".to_owned())
            }
        }
        Instruction::OneOf { templates } => {
            let matches = templates
                .iter()
                .filter(|template| silent(template, instance, location))
                .count();
            if matches == 1 {
                true
            } else {
                fail(
                    errors,
                    format!("value matches {matches} schemas instead of exactly one"),
                )
            }
        }
        Instruction::Not { template } => {
            if silent(template, instance, location) {
                fail(errors, "value matches a forbidden schema".to_owned())
            } else {
                true
            }
        }
        Instruction::Minimum { bound } => check_number(instance, errors, location, |number| {
            (number >= *bound, format!("value is below the minimum of {bound}"))
        }),
        Instruction::Maximum { bound } => check_number(instance, errors, location, |number| {
            (number <= *bound, format!("value is above the maximum of {bound}"))
        }),
        Instruction::ExclusiveMinimum { bound } => {
            check_number(instance, errors, location, |number| {
                (
                    number > *bound,
                    format!("value is not above the exclusive minimum of {bound}"),
                )
            })
        }
        Instruction::ExclusiveMaximum { bound } => {
            check_number(instance, errors, location, |number| {
                (
                    number < *bound,
                    format!("value is not below the exclusive maximum of {bound}"),
                )
            })
        }
        Instruction::MultipleOf { divisor } => {
            check_number(instance, errors, location, |number| {
                let quotient = number / divisor;
                (
                    (quotient - quotient.round()).abs() < f64::EPSILON,
                    format!("value is not a multiple of {divisor}"),
                )
            })
        }
        Instruction::MinLength { bound } => {
            let Some(string) = instance.as_str() else {
                return true;
            };
            if string.chars().count() >= *bound {
                true
            } else {
                fail(errors, format!("string is shorter than {bound} characters"))
            }
        }
        Instruction::MaxLength { bound } => {
            let Some(string) = instance.as_str() else {
                return true;
            };
            if string.chars().count() <= *bound {
                true
            } else {
                fail(errors, format!("string is longer than {bound} characters"))
            }
        }
        Instruction::Pattern { pattern } => {
            let Some(string) = instance.as_str() else {
                return true;
            };
            match regex::Regex::new(pattern) {
                Ok(matcher) if matcher.is_match(string) => true,
                Ok(_) => fail(errors, format!("string does not match \"{pattern}\"")),
                Err(_) => true,
            }
        }
        Instruction::MinItems { bound } => {
            let Some(items) = instance.as_array() else {
                return true;
            };
            if items.len() >= *bound {
                true
            } else {
                fail(errors, format!("array has fewer than {bound} items"))
            }
        }
        Instruction::MaxItems { bound } => {
            let Some(items) = instance.as_array() else {
                return true;
            };
            if items.len() <= *bound {
                true
            } else {
                fail(errors, format!("array has more than {bound} items"))
            }
        }
        Instruction::UniqueItems => {
            let Some(items) = instance.as_array() else {
                return true;
            };
            for (index, left) in items.iter().enumerate() {
                if items.iter().skip(index + 1).any(|right| left == right) {
                    return fail(errors, "array items are not unique".to_owned());
                }
            }
            true
        }
        Instruction::MinProperties { bound } => {
            let Some(object) = instance.as_object() else {
                return true;
            };
            if object.len() >= *bound {
                true
            } else {
                fail(errors, format!("object has fewer than {bound} properties"))
            }
        }
        Instruction::MaxProperties { bound } => {
            let Some(object) = instance.as_object() else {
                return true;
            };
            if object.len() <= *bound {
                true
            } else {
                fail(errors, format!("object has more than {bound} properties"))
            }
        }
    }
}

fn check_number(
    instance: &Value,
    errors: &mut Vec<EvaluationError>,
    location: &PointerBuf,
    assertion: impl Fn(f64) -> (bool, String),
) -> bool {
    let Some(number) = instance.as_f64() else {
        return true;
    };
    let (holds, message) = assertion(number);
    if holds {
        true
    } else {
        errors.push(EvaluationError {
            instance_location: location.to_string(),
            message,
        });
        false
    }
}

fn type_matches(name: &str, instance: &Value) -> bool {
    match name {
        "null" => instance.is_null(),
        "boolean" => instance.is_boolean(),
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => {
            instance.is_i64()
                || instance.is_u64()
                || instance.as_f64().is_some_and(|number| number.fract() == 0.0)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::OfficialResolver;
    use serde_json::json;

    fn check(schema: Value, instance: Value) -> bool {
        let template = compile(&schema, &OfficialResolver, None).unwrap();
        evaluate(&template, &instance).valid
    }

    #[test]
    fn primitive_assertions() {
        assert!(check(json!({"type": "string"}), json!("hello")));
        assert!(!check(json!({"type": "string"}), json!(42)));
        assert!(check(json!({"type": ["string", "null"]}), json!(null)));
        assert!(check(json!({"type": "integer"}), json!(3)));
        assert!(!check(json!({"type": "integer"}), json!(3.5)));
    }

    #[test]
    fn object_assertions() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string", "minLength": 1 }
            },
            "additionalProperties": false
        });
        assert!(check(schema.clone(), json!({"name": "a"})));
        assert!(!check(schema.clone(), json!({})));
        assert!(!check(schema.clone(), json!({"name": ""})));
        assert!(!check(schema, json!({"name": "a", "extra": 1})));
    }

    #[test]
    fn combinators() {
        let schema = json!({"oneOf": [{"type": "string"}, {"type": "integer"}]});
        assert!(check(schema.clone(), json!("x")));
        assert!(check(schema.clone(), json!(1)));
        assert!(!check(schema, json!(1.5)));
        assert!(!check(json!({"not": {"type": "string"}}), json!("x")));
    }

    #[test]
    fn internal_references_are_followed() {
        let schema = json!({
            "$ref": "#/$defs/name",
            "$defs": { "name": { "type": "string" } }
        });
        assert!(check(schema.clone(), json!("x")));
        assert!(!check(schema, json!(1)));
    }

    #[test]
    fn recursive_references_terminate() {
        let schema = json!({
            "$id": "https://example.com/recursive",
            "type": "object",
            "properties": {
                "next": { "$ref": "#" }
            }
        });
        // `#` compiles to an inert reference; the point is that compilation
        // terminates and the rest still asserts.
        assert!(check(schema.clone(), json!({"next": {}})));
        assert!(!check(schema, json!("nope")));
    }

    #[test]
    fn unresolvable_references_are_inert() {
        let schema = json!({
            "$id": "https://example.com/a",
            "$ref": "https://example.com/not-there",
            "type": "integer"
        });
        assert!(check(schema.clone(), json!(1)));
        assert!(!check(schema, json!("x")));
    }

    #[test]
    fn errors_carry_instance_locations() {
        let schema = json!({
            "properties": { "a": { "type": "string" } }
        });
        let template = compile(&schema, &OfficialResolver, None).unwrap();
        let outcome = evaluate(&template, &json!({"a": 42}));
        assert!(!outcome.valid);
        assert_eq!(outcome.errors[0].instance_location, "/a");
    }

    #[test]
    fn templates_round_trip_through_serde() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "enum": [1, 2] } }
        });
        let template = compile(&schema, &OfficialResolver, None).unwrap();
        let serialised = serde_json::to_string(&template).unwrap();
        let deserialised: Template = serde_json::from_str(&serialised).unwrap();
        assert_eq!(template, deserialised);
    }
}
