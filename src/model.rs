//! Compiled validation models and their document instances.
//!
//! A [`CompiledModel`] is built once from a [`DocSchema`] and reused for every
//! payload. [`CompiledModel::instantiate`] casts a payload into a [`Document`]:
//! undeclared fields are dropped, `null` counts as absent, scalars are coerced
//! to their declared type where that loses nothing, and defaults fill absent
//! fields. The document can then be validated and projected.
//!
//! Presence rules treat an empty string on a string field as missing, and
//! check the nested rules of an absent sub-document against an empty one.

use std::fmt;

use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::error::{CompileError, FieldError, ValidationError};
use crate::schema::{DocSchema, Field, Shape};
use crate::types::Direction;

/// Generate a process-wide unique model name.
pub fn model_name(direction: Direction, status: Option<u16>) -> String {
    match status {
        Some(status) => format!("{}-{}-{}", direction.model_prefix(), status, Uuid::new_v4()),
        None => format!("{}-{}", direction.model_prefix(), Uuid::new_v4()),
    }
}

/// Immutable validator/filterer for one [`DocSchema`].
pub struct CompiledModel {
    name: String,
    schema: DocSchema,
    validator: jsonschema::Validator,
}

impl CompiledModel {
    /// Compile `schema` under `name`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidSchema` if the validation engine rejects
    /// the field constraints (unknown type names, invalid regex, ...).
    pub fn compile(name: impl Into<String>, schema: &DocSchema) -> Result<Self, CompileError> {
        let name = name.into();
        let json_schema = schema.json_schema();
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(&json_schema)
            .map_err(|e| CompileError::InvalidSchema {
                model: name.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(model = %name, fields = schema.len(), "compiled model");

        Ok(Self {
            name,
            schema: schema.clone(),
            validator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &DocSchema {
        &self.schema
    }

    /// Cast a payload into a document of this model.
    ///
    /// Non-object payloads produce an empty document.
    pub fn instantiate(&self, payload: &Value) -> Document<'_> {
        self.cast(payload.as_object())
    }

    /// Cast a field map (e.g. parsed query parameters) into a document.
    pub fn instantiate_fields(&self, fields: &Map<String, Value>) -> Document<'_> {
        self.cast(Some(fields))
    }

    fn cast(&self, input: Option<&Map<String, Value>>) -> Document<'_> {
        Document {
            model: self,
            data: Value::Object(cast_document(&self.schema, input)),
        }
    }
}

impl fmt::Debug for CompiledModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModel")
            .field("name", &self.name)
            .field("fields", &self.schema.len())
            .finish_non_exhaustive()
    }
}

/// A payload cast into the shape of a [`CompiledModel`].
#[derive(Debug)]
pub struct Document<'m> {
    model: &'m CompiledModel,
    data: Value,
}

impl Document<'_> {
    /// Check the document against every declared constraint.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing every failed field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors: Vec<FieldError> = self
            .model
            .validator
            .iter_errors(&self.data)
            .map(|e| FieldError {
                path: pointer_to_path(&e.instance_path.to_string()),
                message: e.to_string(),
            })
            .collect();

        if let Value::Object(map) = &self.data {
            check_document(&self.model.schema, map, "", &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }

    /// The canonical projection: declared fields only, defaults applied.
    pub fn to_canonical(&self) -> Value {
        self.data.clone()
    }

    pub fn into_canonical(self) -> Value {
        self.data
    }
}

/// Convert a JSON Pointer (`/address/city`) to a dotted path (`address.city`).
fn pointer_to_path(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

// --- Casting ---

fn cast_document(schema: &DocSchema, input: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, field) in schema.fields() {
        let value = input
            .and_then(|map| map.get(name))
            .filter(|value| !value.is_null());

        if let Some(value) = value.or(field.default_value()) {
            out.insert(name.to_string(), cast_value(field, value));
        }
    }
    out
}

fn cast_value(field: &Field, value: &Value) -> Value {
    match field.shape() {
        Shape::Document(doc) => match value {
            Value::Object(map) => Value::Object(cast_document(doc, Some(map))),
            // Type mismatch is left for the validation engine to report
            other => other.clone(),
        },
        Shape::List(item) => {
            let elements = match value {
                Value::Array(elements) => elements.iter().map(|e| cast_value(item, e)).collect(),
                scalar => vec![cast_value(item, scalar)],
            };
            Value::Array(elements)
        }
        Shape::Leaf => coerce(field.declared_type(), value),
    }
}

/// Coerce a scalar to the declared type when the conversion is lossless.
fn coerce(declared: Option<&str>, value: &Value) -> Value {
    match (declared, value) {
        (Some("number"), Value::String(s)) => parse_integer(s)
            .or_else(|| parse_float(s))
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (Some("integer"), Value::String(s)) => parse_integer(s)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (Some("boolean"), Value::String(s)) => match s.trim() {
            "true" | "1" | "yes" => Value::Bool(true),
            "false" | "0" | "no" => Value::Bool(false),
            _ => value.clone(),
        },
        (Some("boolean"), Value::Number(n)) => match n.as_i64() {
            Some(1) => Value::Bool(true),
            Some(0) => Value::Bool(false),
            _ => value.clone(),
        },
        (Some("string"), Value::Number(n)) => Value::String(n.to_string()),
        (Some("string"), Value::Bool(b)) => Value::String(b.to_string()),
        (Some("array"), Value::Array(_)) => value.clone(),
        (Some("array"), scalar) => Value::Array(vec![scalar.clone()]),
        _ => value.clone(),
    }
}

/// Integer literal that fits `i64` or `u64`.
fn parse_integer(s: &str) -> Option<Number> {
    let s = s.trim();
    s.parse::<i64>()
        .map(Number::from)
        .or_else(|_| s.parse::<u64>().map(Number::from))
        .ok()
}

/// Decimal or exponent literal. Integer literals out of integer range are
/// rejected rather than rounded.
fn parse_float(s: &str) -> Option<Number> {
    let s = s.trim();
    if !s.contains(|c| matches!(c, '.' | 'e' | 'E')) {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

// --- Native checks: presence rules and custom validators ---

fn check_document(
    schema: &DocSchema,
    doc: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<FieldError>,
) {
    for (name, field) in schema.fields() {
        let path = join_path(prefix, name);
        match doc.get(name) {
            Some(value) if !is_blank(field, value) => check_value(field, value, &path, errors),
            _ if field.requirement().applies(doc) => {
                errors.push(FieldError {
                    message: format!("Path `{}` is required.", path),
                    path,
                });
            }
            Some(value) => check_value(field, value, &path, errors),
            // An absent sub-document still has its own required fields
            None => {
                if let Shape::Document(nested) = field.shape() {
                    check_document(nested, &Map::new(), &path, errors);
                }
            }
        }
    }
}

/// An empty string does not satisfy presence on a string field.
fn is_blank(field: &Field, value: &Value) -> bool {
    field.declared_type() == Some("string") && value.as_str() == Some("")
}

fn check_value(field: &Field, value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    for validator in field.validators() {
        if !validator.check(value) {
            errors.push(FieldError {
                path: path.to_string(),
                message: validator.message().to_string(),
            });
        }
    }

    match (field.shape(), value) {
        (Shape::Document(doc), Value::Object(map)) => check_document(doc, map, path, errors),
        (Shape::List(item), Value::Array(elements)) => {
            for (i, element) in elements.iter().enumerate() {
                check_value(item, element, &join_path(path, &i.to_string()), errors);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(schema: DocSchema) -> CompiledModel {
        CompiledModel::compile(model_name(Direction::Request, None), &schema).unwrap()
    }

    #[test]
    fn model_names_are_unique() {
        let a = model_name(Direction::Response, Some(201));
        let b = model_name(Direction::Response, Some(201));
        assert!(a.starts_with("response-201-"));
        assert_ne!(a, b);
    }

    #[test]
    fn instantiate_drops_undeclared_fields() {
        let model = compile(DocSchema::new().field("name", Field::string()));
        let doc = model.instantiate(&json!({ "name": "x", "extra": 1 }));
        assert_eq!(doc.to_canonical(), json!({ "name": "x" }));
    }

    #[test]
    fn instantiate_applies_defaults_and_drops_nulls() {
        let model = compile(
            DocSchema::new()
                .field("language", Field::string().with_default("en"))
                .field("nickname", Field::string()),
        );
        let doc = model.instantiate(&json!({ "nickname": null }));
        assert_eq!(doc.to_canonical(), json!({ "language": "en" }));
    }

    #[test]
    fn instantiate_non_object_is_empty() {
        let model = compile(DocSchema::new().field("name", Field::string()));
        assert_eq!(model.instantiate(&json!(42)).to_canonical(), json!({}));
    }

    #[test]
    fn coerces_query_strings() {
        let model = compile(
            DocSchema::new()
                .field("page", Field::integer())
                .field("ratio", Field::number())
                .field("active", Field::boolean())
                .field("tags", Field::array(Field::string())),
        );
        let doc = model.instantiate(&json!({
            "page": "2", "ratio": "0.5", "active": "true", "tags": "a"
        }));
        assert_eq!(
            doc.to_canonical(),
            json!({ "page": 2, "ratio": 0.5, "active": true, "tags": ["a"] })
        );
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn failed_coercion_is_reported() {
        let model = compile(DocSchema::new().field("page", Field::integer()));
        let err = model
            .instantiate(&json!({ "page": "two" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["page"]);
    }

    #[test]
    fn out_of_range_numbers_are_not_rounded() {
        let model = compile(
            DocSchema::new()
                .field("n", Field::number())
                .field("big", Field::integer())
                .field("exp", Field::number()),
        );
        let doc = model.instantiate(&json!({
            "n": "18446744073709551617",
            "big": "18446744073709551615",
            "exp": "1e3"
        }));
        assert_eq!(
            doc.to_canonical(),
            json!({ "n": "18446744073709551617", "big": 18446744073709551615u64, "exp": 1000.0 })
        );
        assert_eq!(doc.validate().unwrap_err().fields(), vec!["n"]);
    }

    #[test]
    fn format_is_enforced() {
        let model = compile(
            DocSchema::new().field("email", Field::string().constraint("format", json!("email"))),
        );
        assert!(model
            .instantiate(&json!({ "email": "ada@example.com" }))
            .validate()
            .is_ok());
        let err = model
            .instantiate(&json!({ "email": "not-an-email" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["email"]);
    }

    #[test]
    fn empty_string_does_not_satisfy_required() {
        let model = compile(
            DocSchema::new()
                .field("name", Field::string().required())
                .field("nickname", Field::string()),
        );
        let err = model
            .instantiate(&json!({ "name": "", "nickname": "" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["name"]);
    }

    #[test]
    fn absent_sub_document_reports_nested_requirements() {
        let model = compile(
            DocSchema::new()
                .field(
                    "address",
                    Field::object(DocSchema::new().field("city", Field::string().required())),
                )
                .field(
                    "billing",
                    Field::object(DocSchema::new().field("iban", Field::string().required()))
                        .required(),
                ),
        );
        let doc = model.instantiate(&json!({}));
        assert_eq!(doc.to_canonical(), json!({}));
        assert_eq!(doc.validate().unwrap_err().fields(), vec!["address.city", "billing"]);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let model = compile(
            DocSchema::new()
                .field("name", Field::string().required())
                .field("surname", Field::string().required()),
        );
        let err = model
            .instantiate(&json!({ "surname": "y" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["name"]);
        assert_eq!(err.errors[0].message, "Path `name` is required.");
    }

    #[test]
    fn required_default_satisfies_presence() {
        let model = compile(
            DocSchema::new().field("photo", Field::string().required().with_default("/p.png")),
        );
        assert!(model.instantiate(&json!({})).validate().is_ok());
    }

    #[test]
    fn conditional_requirement() {
        let model = compile(
            DocSchema::new()
                .field(
                    "username",
                    Field::string().required_when(|doc| !doc.contains_key("email")),
                )
                .field(
                    "email",
                    Field::string().required_when(|doc| !doc.contains_key("username")),
                ),
        );

        assert!(model
            .instantiate(&json!({ "email": "a@b.c" }))
            .validate()
            .is_ok());

        let err = model.instantiate(&json!({})).validate().unwrap_err();
        assert_eq!(err.fields(), vec!["username", "email"]);
    }

    #[test]
    fn custom_validator_message() {
        let model = compile(DocSchema::new().field(
            "email",
            Field::string().validate(|v| v.as_str().is_some_and(|s| s.contains('@')), "email"),
        ));

        let err = model
            .instantiate(&json!({ "email": "nope" }))
            .validate()
            .unwrap_err();
        assert_eq!(
            err.errors,
            vec![FieldError {
                path: "email".into(),
                message: "email".into()
            }]
        );

        // Validators are skipped for absent fields
        assert!(model.instantiate(&json!({})).validate().is_ok());
    }

    #[test]
    fn enum_constraint() {
        let model = compile(DocSchema::new().field("language", Field::string().one_of(["en", "tr"])));
        assert!(model
            .instantiate(&json!({ "language": "tr" }))
            .validate()
            .is_ok());
        let err = model
            .instantiate(&json!({ "language": "de" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["language"]);
    }

    #[test]
    fn nested_documents_are_projected_and_checked() {
        let address = DocSchema::new().field("city", Field::string().required());
        let model = compile(
            DocSchema::new()
                .field("address", Field::object(address.clone()))
                .field("history", Field::array(Field::object(address))),
        );

        let doc = model.instantiate(&json!({
            "address": { "city": "Ankara", "zip": "06000" },
            "history": [{ "city": "Izmir", "x": 1 }, {}]
        }));
        assert_eq!(
            doc.to_canonical(),
            json!({
                "address": { "city": "Ankara" },
                "history": [{ "city": "Izmir" }, {}]
            })
        );

        let err = doc.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["history.1.city"]);
    }

    #[test]
    fn nested_type_error_path() {
        let model = compile(DocSchema::new().field(
            "address",
            Field::object(DocSchema::new().field("zip", Field::integer())),
        ));
        let err = model
            .instantiate(&json!({ "address": { "zip": [1] } }))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["address.zip"]);
    }

    #[test]
    fn opaque_fields_pass_through() {
        let model = compile(DocSchema::new().field("meta", Field::any()));
        let payload = json!({ "meta": { "anything": [1, { "deep": true }] } });
        assert_eq!(model.instantiate(&payload).to_canonical(), payload);
    }

    #[test]
    fn projection_is_idempotent() {
        let model = compile(
            DocSchema::new()
                .field("id", Field::string())
                .field("count", Field::integer().with_default(0)),
        );
        let once = model
            .instantiate(&json!({ "id": 7, "secret": "x" }))
            .into_canonical();
        let twice = model.instantiate(&once).into_canonical();
        assert_eq!(once, json!({ "id": "7", "count": 0 }));
        assert_eq!(once, twice);
    }

    #[test]
    fn invalid_constraint_fails_compilation() {
        let schema = DocSchema::new().field("name", Field::of_type("strng"));
        let result = CompiledModel::compile("bad", &schema);
        assert!(matches!(result, Err(CompileError::InvalidSchema { model, .. }) if model == "bad"));
    }

    #[test]
    fn pointer_conversion() {
        assert_eq!(pointer_to_path(""), "");
        assert_eq!(pointer_to_path("/a/b/0"), "a.b.0");
        assert_eq!(pointer_to_path("/a~1b"), "a/b");
    }
}
