//! The contract: one middleware entry point per schema description.
//!
//! ```ignore
//! let contract = Contract::new(&description, Options::new().validate_response(true))?;
//!
//! // in the host's request handler
//! contract.handle(&mut exchange, next).await;
//! ```
//!
//! Per request, [`Contract::handle`] runs access control, installs the
//! response pipeline on the exchange and runs the request pipeline, which
//! hands control to application code through [`Next::run`]. Every failure is
//! terminal: it goes to the matching hook if one is configured, otherwise to
//! [`Next::fail`], and the remaining stages are skipped.

use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::access;
use crate::compiler::{self, CompiledModels};
use crate::description::SchemaDescription;
use crate::error::CompileError;
use crate::exchange::{Exchange, Next};
use crate::failure::{report, Failure};
use crate::options::{self, Options, ResolvedOptions};
use crate::request;
use crate::response::{self, Interceptor};
use crate::types::PayloadSource;

/// State shared by every request a contract handles.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) options: ResolvedOptions,
    pub(crate) models: CompiledModels,
}

/// Compiled request/response contract. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Contract {
    shared: Arc<Shared>,
}

impl Contract {
    /// Build a contract over the process-wide defaults.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` if any enabled model fails to compile.
    pub fn new(description: &SchemaDescription, options: Options) -> Result<Self, CompileError> {
        ContractFactory::global().build(description, options)
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.shared.options
    }

    pub fn models(&self) -> &CompiledModels {
        &self.shared.models
    }

    /// Run the contract for one exchange.
    pub async fn handle(&self, exchange: &mut Exchange, next: Arc<dyn Next>) {
        let options = &self.shared.options;

        if let Err(failure) = access::authorize(options, &exchange.request).await {
            report(
                options.on_access_error.as_ref(),
                exchange,
                next.as_ref(),
                failure,
            )
            .await;
            return;
        }

        if self.shared.models.responses.is_some() {
            exchange.install(Interceptor::new(self.shared.clone(), next.clone()));
        }

        request::run(&self.shared, exchange, next.as_ref()).await;
    }

    /// Run the request stage on a bare payload, outside any exchange.
    ///
    /// Returns the payload the application would see.
    ///
    /// # Errors
    ///
    /// Returns `REQx002` for methods without payload handling and `REQx001`
    /// when validation fails.
    pub fn check_request(&self, method: &Method, payload: &Value) -> Result<Value, Failure> {
        let Some(model) = &self.shared.models.request else {
            return Ok(payload.clone());
        };
        if PayloadSource::for_method(method).is_none() {
            return Err(Failure::method_unsupported());
        }
        let projected = request::check(model.instantiate(payload), &self.shared.options)?;
        Ok(projected.unwrap_or_else(|| payload.clone()))
    }

    /// Run the response stage on a bare body sent with `status`.
    ///
    /// Returns the body the client would receive.
    ///
    /// # Errors
    ///
    /// Returns `SCHEMAx001` when no model covers `status` and `RESx001` when
    /// validation fails.
    pub async fn check_response(&self, status: u16, body: Value) -> Result<Value, Failure> {
        if self.shared.models.responses.is_none() {
            return Ok(body);
        }
        response::outbound(&self.shared, status, body).await
    }
}

/// Builds contracts over a fixed set of defaults.
///
/// [`ContractFactory::global`] snapshots the process-wide defaults; use
/// [`ContractFactory::new`] to scope defaults to one part of an application.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    defaults: ResolvedOptions,
}

impl ContractFactory {
    pub fn new(defaults: Options) -> Self {
        Self {
            defaults: ResolvedOptions::default().merge(defaults),
        }
    }

    pub fn global() -> Self {
        Self {
            defaults: options::defaults().clone(),
        }
    }

    pub fn defaults(&self) -> &ResolvedOptions {
        &self.defaults
    }

    /// Resolve `options` over the factory defaults and compile `description`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` if any enabled model fails to compile.
    pub fn build(
        &self,
        description: &SchemaDescription,
        options: Options,
    ) -> Result<Contract, CompileError> {
        let options = self.defaults.merge(options);
        let models = compiler::compile(description, &options)?;
        Ok(Contract {
            shared: Arc::new(Shared { options, models }),
        })
    }
}
