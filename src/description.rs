//! Schema descriptions: the request schema plus response schemas per status.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::CompileError;
use crate::schema::DocSchema;
use crate::types::json_type_name;

/// Response schema for one status code.
#[derive(Debug, Clone)]
pub enum ResponseSchema {
    Single(DocSchema),
    /// Ordered alternatives for statuses produced by distinct payload shapes.
    Alternatives(Vec<DocSchema>),
}

/// Shape of a request and of every response it may produce.
#[derive(Debug, Clone, Default)]
pub struct SchemaDescription {
    pub title: Option<String>,
    pub description: Option<String>,
    pub request: DocSchema,
    pub responses: BTreeMap<u16, ResponseSchema>,
}

impl SchemaDescription {
    pub fn new(request: DocSchema) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }

    /// Declare the response schema for `status`.
    pub fn response(mut self, status: u16, schema: DocSchema) -> Self {
        self.responses.insert(status, ResponseSchema::Single(schema));
        self
    }

    /// Declare ordered alternative response schemas for `status`.
    pub fn alternatives(mut self, status: u16, schemas: Vec<DocSchema>) -> Self {
        self.responses
            .insert(status, ResponseSchema::Alternatives(schemas));
        self
    }

    /// Parse a description from its JSON form.
    ///
    /// ```json
    /// {
    ///   "title": "Register",
    ///   "request": { "name": { "type": "string", "required": true } },
    ///   "response": {
    ///     "201": { "id": "string" },
    ///     "409": [{ "code": "string" }, { "username": "string" }]
    ///   }
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `CompileError` if the request schema is missing, a status key
    /// is not a valid HTTP status, or any field spec is malformed.
    pub fn from_json(value: &Value) -> Result<Self, CompileError> {
        let map = value
            .as_object()
            .ok_or_else(|| CompileError::InvalidDescription {
                path: "/".to_string(),
                message: format!("expected object, got {}", json_type_name(value)),
            })?;

        let request = map
            .get("request")
            .ok_or_else(|| CompileError::InvalidDescription {
                path: "/request".to_string(),
                message: "missing request schema".to_string(),
            })?;
        let request = DocSchema::from_json_at(request, "/request")?;

        let mut responses = BTreeMap::new();
        match map.get("response") {
            None | Some(Value::Null) => {}
            Some(Value::Object(statuses)) => {
                for (key, schema) in statuses {
                    let status = parse_status(key)?;
                    let path = format!("/response/{}", key);
                    let schema = match schema {
                        Value::Array(items) => {
                            let alternatives = items
                                .iter()
                                .enumerate()
                                .map(|(i, item)| {
                                    DocSchema::from_json_at(item, &format!("{}/{}", path, i))
                                })
                                .collect::<Result<Vec<_>, _>>()?;
                            ResponseSchema::Alternatives(alternatives)
                        }
                        other => ResponseSchema::Single(DocSchema::from_json_at(other, &path)?),
                    };
                    responses.insert(status, schema);
                }
            }
            Some(other) => {
                return Err(CompileError::InvalidDescription {
                    path: "/response".to_string(),
                    message: format!("expected object, got {}", json_type_name(other)),
                })
            }
        }

        Ok(Self {
            title: map.get("title").and_then(Value::as_str).map(String::from),
            description: map
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            request,
            responses,
        })
    }
}

/// Parse a status-code key (`"201"`) into a number in 100..=599.
pub fn parse_status(key: &str) -> Result<u16, CompileError> {
    key.trim()
        .parse::<u16>()
        .ok()
        .filter(|status| (100..=599).contains(status))
        .ok_or_else(|| CompileError::InvalidStatus {
            key: key.to_string(),
        })
}
