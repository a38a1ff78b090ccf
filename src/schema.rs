//! Declarative document schemas.
//!
//! A [`DocSchema`] maps field names to [`Field`] constraints. Leaf constraints
//! (`type`, `enum`, `pattern`, `minimum`, `format`, ...) are plain JSON Schema
//! keywords and are enforced by the validation engine. Presence rules, defaults
//! and custom validators are handled natively, which is what lets a field be
//! required only when its siblings say so.
//!
//! # JSON form
//!
//! ```json
//! {
//!   "name":     { "type": "string", "required": true },
//!   "language": { "type": "string", "enum": ["en", "tr"], "default": "en" },
//!   "address":  { "type": "object", "properties": { "city": "string" } },
//!   "tags":     { "type": "array", "items": { "type": "string" } },
//!   "meta":     {}
//! }
//! ```
//!
//! A bare string is shorthand for `{ "type": <string> }`. An object field
//! without `properties` (and the empty spec `{}`) is passed through untouched.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::CompileError;
use crate::types::json_type_name;

/// Predicate over the sibling fields of the document being validated.
pub type RequiredFn = Arc<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>;

/// Custom check over a present field value.
pub type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Keys of a field spec that are not passed to the validation engine.
const NATIVE_KEYS: &[&str] = &["required", "default", "properties", "items"];

/// Presence rule for a field.
#[derive(Clone, Default)]
pub enum Requirement {
    #[default]
    Optional,
    Always,
    /// Required when the predicate holds for the sibling map.
    When(RequiredFn),
}

impl Requirement {
    /// Whether the field must be present in `doc`.
    pub fn applies(&self, doc: &Map<String, Value>) -> bool {
        match self {
            Requirement::Optional => false,
            Requirement::Always => true,
            Requirement::When(predicate) => predicate(doc),
        }
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Optional => write!(f, "Optional"),
            Requirement::Always => write!(f, "Always"),
            Requirement::When(_) => write!(f, "When(<predicate>)"),
        }
    }
}

/// A custom validator with the message reported when it rejects a value.
#[derive(Clone)]
pub struct CustomValidator {
    check: CheckFn,
    message: String,
}

impl CustomValidator {
    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Structure below a field.
#[derive(Debug, Clone, Default)]
pub enum Shape {
    /// Constraints only; nested content (if any) passes through.
    #[default]
    Leaf,
    /// Sub-document with its own declared fields.
    Document(DocSchema),
    /// Array whose elements follow the item field.
    List(Box<Field>),
}

/// Constraints for a single field.
#[derive(Debug, Clone, Default)]
pub struct Field {
    constraints: Map<String, Value>,
    shape: Shape,
    requirement: Requirement,
    default: Option<Value>,
    validators: Vec<CustomValidator>,
}

impl Field {
    /// A field without constraints. Any value is accepted and kept as-is.
    pub fn any() -> Self {
        Self::default()
    }

    /// A field of the given JSON type name.
    pub fn of_type(type_name: &str) -> Self {
        Self::any().constraint("type", Value::String(type_name.to_string()))
    }

    pub fn string() -> Self {
        Self::of_type("string")
    }

    pub fn number() -> Self {
        Self::of_type("number")
    }

    pub fn integer() -> Self {
        Self::of_type("integer")
    }

    pub fn boolean() -> Self {
        Self::of_type("boolean")
    }

    /// An array whose elements follow `item`.
    pub fn array(item: Field) -> Self {
        let mut field = Self::of_type("array");
        field.shape = Shape::List(Box::new(item));
        field
    }

    /// A sub-document with its own declared fields.
    pub fn object(schema: DocSchema) -> Self {
        let mut field = Self::of_type("object");
        field.shape = Shape::Document(schema);
        field
    }

    /// Mark the field as always required.
    pub fn required(mut self) -> Self {
        self.requirement = Requirement::Always;
        self
    }

    /// Require the field only when `predicate` holds for the sibling fields.
    pub fn required_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        self.requirement = Requirement::When(Arc::new(predicate));
        self
    }

    /// Value used when the field is absent.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict the field to a fixed set of values.
    pub fn one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.constraint("enum", Value::Array(values))
    }

    /// Require string values to match a regular expression.
    pub fn pattern(self, regex: &str) -> Self {
        self.constraint("pattern", Value::String(regex.to_string()))
    }

    /// Add an arbitrary JSON Schema keyword (`minimum`, `maxLength`, `format`, ...).
    pub fn constraint(mut self, keyword: &str, value: Value) -> Self {
        self.constraints.insert(keyword.to_string(), value);
        self
    }

    /// Attach a custom validator; `message` is reported when it returns false.
    pub fn validate<F>(mut self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validators.push(CustomValidator {
            check: Arc::new(check),
            message: message.into(),
        });
        self
    }

    /// The declared JSON type, when it is a single type name.
    pub fn declared_type(&self) -> Option<&str> {
        self.constraints.get("type").and_then(Value::as_str)
    }

    pub fn constraints(&self) -> &Map<String, Value> {
        &self.constraints
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn validators(&self) -> &[CustomValidator] {
        &self.validators
    }

    /// Parse a field spec from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidField` when the spec is neither a string
    /// nor an object, or when a native key has the wrong type.
    pub fn from_json(spec: &Value, path: &str) -> Result<Self, CompileError> {
        let map = match spec {
            Value::String(type_name) => return Ok(Self::of_type(type_name)),
            Value::Object(map) => map,
            other => {
                return Err(CompileError::InvalidField {
                    path: path.to_string(),
                    message: format!("expected string or object, got {}", json_type_name(other)),
                })
            }
        };

        let mut field = Field::any();

        match map.get("required") {
            None | Some(Value::Bool(false)) => {}
            Some(Value::Bool(true)) => field.requirement = Requirement::Always,
            Some(other) => {
                return Err(CompileError::InvalidField {
                    path: format!("{}/required", path),
                    message: format!("expected boolean, got {}", json_type_name(other)),
                })
            }
        }

        field.default = map.get("default").cloned();

        if let Some(properties) = map.get("properties") {
            let schema = DocSchema::from_json_at(properties, &format!("{}/properties", path))?;
            field.shape = Shape::Document(schema);
        } else if let Some(items) = map.get("items") {
            let item = Field::from_json(items, &format!("{}/items", path))?;
            field.shape = Shape::List(Box::new(item));
        }

        for (key, value) in map {
            if !NATIVE_KEYS.contains(&key.as_str()) {
                field.constraints.insert(key.clone(), value.clone());
            }
        }

        Ok(field)
    }

    /// JSON Schema for this field's value, without presence rules.
    pub fn json_schema(&self) -> Value {
        let mut schema = self.constraints.clone();
        match &self.shape {
            Shape::Leaf => {}
            Shape::Document(doc) => {
                schema.insert("properties".to_string(), doc.properties_schema());
            }
            Shape::List(item) => {
                schema.insert("items".to_string(), item.json_schema());
            }
        }
        Value::Object(schema)
    }
}

/// Ordered field-name to field-constraint mapping.
#[derive(Debug, Clone, Default)]
pub struct DocSchema {
    fields: Vec<(String, Field)>,
}

impl DocSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field, replacing any earlier declaration with the same name.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, field)| field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a schema from its JSON field map.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` if the value is not an object or a field spec is invalid.
    pub fn from_json(value: &Value) -> Result<Self, CompileError> {
        Self::from_json_at(value, "")
    }

    pub(crate) fn from_json_at(value: &Value, path: &str) -> Result<Self, CompileError> {
        let map = value
            .as_object()
            .ok_or_else(|| CompileError::InvalidDescription {
                path: if path.is_empty() { "/".to_string() } else { path.to_string() },
                message: format!("expected field map object, got {}", json_type_name(value)),
            })?;

        let mut schema = DocSchema::new();
        for (name, spec) in map {
            let field = Field::from_json(spec, &format!("{}/{}", path, name))?;
            schema = schema.field(name.clone(), field);
        }
        Ok(schema)
    }

    /// JSON Schema for a document of this shape, without presence rules.
    pub fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), self.properties_schema());
        Value::Object(schema)
    }

    fn properties_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.json_schema()))
            .collect();
        Value::Object(properties)
    }
}
