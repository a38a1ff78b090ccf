//! Payload Contract
//!
//! Declarative request/response contracts for HTTP handlers.
//!
//! A [`SchemaDescription`] declares the shape of a request payload and of
//! each response payload by status code. A [`Contract`] compiled from it runs
//! in front of application code: it authorizes the request, validates and
//! filters the inbound payload, and validates and filters whatever the
//! handler later sends.
//!
//! # Example
//!
//! ```
//! use payload_contract::{Contract, DocSchema, Field, Options, SchemaDescription};
//! use http::Method;
//! use serde_json::json;
//!
//! let description = SchemaDescription::new(
//!     DocSchema::new()
//!         .field("name", Field::string().required())
//!         .field("role", Field::string().one_of(["user", "admin"]).with_default("user")),
//! )
//! .response(201, DocSchema::new().field("id", Field::string()));
//!
//! let contract = Contract::new(&description, Options::new()).unwrap();
//!
//! // Undeclared fields are dropped and defaults applied
//! let inbound = contract
//!     .check_request(&Method::POST, &json!({ "name": "ada", "admin": true }))
//!     .unwrap();
//! assert_eq!(inbound, json!({ "name": "ada", "role": "user" }));
//!
//! // Missing required fields fail with REQx001
//! let failure = contract.check_request(&Method::POST, &json!({})).unwrap_err();
//! assert_eq!(failure.code.as_str(), "REQx001");
//! assert_eq!(failure.fields, Some(vec!["name".to_string()]));
//! ```
//!
//! # Options
//!
//! | Option | Default | Effect |
//! |--------|---------|--------|
//! | `payload_key` | `"$key"` | wrapper key for non-object response bodies |
//! | `filter.request` | `true` | replace the inbound payload with its projection |
//! | `filter.response` | `true` | send the projection of single-model responses |
//! | `validate.request` | `true` | reject invalid inbound payloads (`REQx001`) |
//! | `validate.response` | `false` | reject invalid outbound payloads (`RESx001`) |
//! | `auth` / `permissions` | none | access control (`ACLx001`, `ACLx002`) |
//!
//! Process-wide defaults are installed once with [`set_defaults`].
//!
//! # Description Format
//!
//! ```json
//! {
//!   "request": { "name": { "type": "string", "required": true } },
//!   "response": {
//!     "201": { "id": "string" },
//!     "409": [{ "code": "string" }, { "username": "string" }]
//!   }
//! }
//! ```
//!
//! A list under a status declares alternatives: a body passes if any of them
//! validates, and it is sent unfiltered.

mod access;
mod compiler;
mod contract;
mod description;
mod error;
mod exchange;
mod failure;
mod linter;
mod loader;
mod model;
mod options;
mod request;
mod response;
mod schema;
mod types;

pub use access::{AuthDecision, AuthFn, Authorizer, Grants, Permissions};
pub use compiler::{compile, compile_responses, CompiledModels, ResponseModels};
pub use contract::{Contract, ContractFactory};
pub use description::{parse_status, ResponseSchema, SchemaDescription};
pub use error::{CompileError, DefaultsError, FieldError, LoadError, ValidationError};
pub use exchange::{Exchange, Next, Request, Response};
pub use failure::{Cause, Failure, FailureCode};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    is_url, load_description, load_description_auto, load_description_str, load_json,
    load_options,
};
pub use model::{model_name, CompiledModel, Document};
pub use options::{
    defaults, set_defaults, Auth, Hook, Options, PartialToggles, ResolvedOptions, Toggles,
};
pub use schema::{CheckFn, CustomValidator, DocSchema, Field, RequiredFn, Requirement, Shape};
pub use types::{json_type_name, Direction, PayloadSource, DEFAULT_PAYLOAD_KEY};

#[cfg(feature = "remote")]
pub use loader::{load_description_url, load_json_url};
