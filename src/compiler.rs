//! Compiles a schema description into the models a contract runs with.
//!
//! Only enabled directions are compiled: the request model when request
//! filtering or validation is on, the response models when either response
//! switch is on. Any failure aborts construction.

use std::collections::BTreeMap;

use crate::description::{ResponseSchema, SchemaDescription};
use crate::error::CompileError;
use crate::model::{model_name, CompiledModel};
use crate::options::ResolvedOptions;
use crate::types::Direction;

/// Compiled model(s) for one response status.
#[derive(Debug)]
pub enum ResponseModels {
    Single(CompiledModel),
    Alternatives(Vec<CompiledModel>),
}

/// Every model of one contract.
#[derive(Debug, Default)]
pub struct CompiledModels {
    pub request: Option<CompiledModel>,
    /// `None` when the response direction is disabled.
    pub responses: Option<BTreeMap<u16, ResponseModels>>,
}

impl CompiledModels {
    /// Model(s) for `status`, if the response direction is enabled and declares it.
    pub fn response(&self, status: u16) -> Option<&ResponseModels> {
        self.responses.as_ref().and_then(|models| models.get(&status))
    }
}

/// Compile the enabled directions of `description`.
///
/// # Errors
///
/// Returns `CompileError` if any schema is rejected or a status declares an
/// empty list of alternatives.
pub fn compile(
    description: &SchemaDescription,
    options: &ResolvedOptions,
) -> Result<CompiledModels, CompileError> {
    let request = if options.request_enabled() {
        Some(CompiledModel::compile(
            model_name(Direction::Request, None),
            &description.request,
        )?)
    } else {
        None
    };

    let responses = if options.response_enabled() {
        Some(compile_responses(&description.responses)?)
    } else {
        None
    };

    tracing::debug!(
        title = description.title.as_deref().unwrap_or(""),
        request = request.is_some(),
        responses = responses.as_ref().map_or(0, BTreeMap::len),
        "compiled contract"
    );

    Ok(CompiledModels { request, responses })
}

/// Compile every declared response status.
pub fn compile_responses(
    schemas: &BTreeMap<u16, ResponseSchema>,
) -> Result<BTreeMap<u16, ResponseModels>, CompileError> {
    let mut models = BTreeMap::new();
    for (&status, schema) in schemas {
        let compiled = match schema {
            ResponseSchema::Single(doc) => ResponseModels::Single(CompiledModel::compile(
                model_name(Direction::Response, Some(status)),
                doc,
            )?),
            ResponseSchema::Alternatives(docs) => {
                if docs.is_empty() {
                    return Err(CompileError::EmptyAlternatives { status });
                }
                let alternatives = docs
                    .iter()
                    .map(|doc| {
                        CompiledModel::compile(model_name(Direction::Response, Some(status)), doc)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                ResponseModels::Alternatives(alternatives)
            }
        };
        models.insert(status, compiled);
    }
    Ok(models)
}
