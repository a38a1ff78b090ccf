//! Outbound pipeline, run when application code sends a response.
//!
//! The model is looked up by the status set at send time. A non-object body
//! is wrapped under the payload key before casting and unwrapped again after
//! projection, so bare values can be described as `{ "$key": ... }`.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value};

use crate::compiler::ResponseModels;
use crate::contract::Shared;
use crate::exchange::{Exchange, Next};
use crate::failure::{report, Failure, FailureCode};
use crate::model::CompiledModel;
use crate::options::ResolvedOptions;

/// Response pipeline installed on an [`Exchange`] by a contract.
#[derive(Clone)]
pub(crate) struct Interceptor {
    shared: Arc<Shared>,
    next: Arc<dyn Next>,
}

impl Interceptor {
    pub(crate) fn new(shared: Arc<Shared>, next: Arc<dyn Next>) -> Self {
        Self { shared, next }
    }

    pub(crate) async fn intercept(&self, exchange: &mut Exchange, body: Value) {
        let status = exchange.response.status().as_u16();
        match outbound(&self.shared, status, body).await {
            Ok(body) => exchange.response.dispatch(body),
            Err(failure) => {
                let options = &self.shared.options;
                let hook = match failure.code {
                    FailureCode::SchemaNotFound => options.on_request_error.as_ref(),
                    _ => options.on_response_error.as_ref(),
                };
                report(hook, exchange, self.next.as_ref(), failure).await;
            }
        }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

/// The body to dispatch for `status`, or the failure to report.
pub(crate) async fn outbound(shared: &Shared, status: u16, body: Value) -> Result<Value, Failure> {
    match shared.models.response(status) {
        Some(ResponseModels::Single(model)) => single(model, &shared.options, body),
        Some(ResponseModels::Alternatives(models)) => {
            alternatives(models, &shared.options, body).await
        }
        None => {
            tracing::debug!(status, "no response model for status");
            Err(Failure::schema_not_found(status))
        }
    }
}

fn single(model: &CompiledModel, options: &ResolvedOptions, body: Value) -> Result<Value, Failure> {
    let key = options.payload_key.as_str();
    let payload = Payload::prepare(&body, key);
    let document = model.instantiate(payload.value());

    if options.validate.response {
        document.validate().map_err(Failure::response_invalid)?;
    }

    if options.filter.response {
        Ok(payload.unwrap(document.into_canonical(), key))
    } else {
        Ok(body)
    }
}

/// Alternatives are only checked, never filtered; the first passing one wins.
async fn alternatives(
    models: &[CompiledModel],
    options: &ResolvedOptions,
    body: Value,
) -> Result<Value, Failure> {
    if !options.validate.response {
        return Ok(body);
    }

    let payload = Payload::prepare(&body, &options.payload_key);
    // Validation never suspends, so the joined futures complete one after another
    let outcomes = join_all(models.iter().map(|model| {
        let payload = payload.value();
        async move { model.instantiate(payload).validate() }
    }))
    .await;

    if outcomes.iter().any(Result::is_ok) {
        return Ok(body);
    }

    // Reported detail is the first alternative's.
    match outcomes.into_iter().next() {
        Some(Err(error)) => Err(Failure::response_invalid(error)),
        _ => Ok(body),
    }
}

/// Outbound body as presented to the model.
enum Payload {
    Document(Value),
    Wrapped(Value),
}

impl Payload {
    /// Objects, and strings holding a JSON object, are used as-is; anything
    /// else is wrapped under `key`.
    fn prepare(body: &Value, key: &str) -> Self {
        match body {
            Value::Object(_) => Payload::Document(body.clone()),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(parsed @ Value::Object(_)) => Payload::Document(parsed),
                _ => Payload::wrap(body, key),
            },
            _ => Payload::wrap(body, key),
        }
    }

    fn wrap(body: &Value, key: &str) -> Self {
        let mut map = Map::new();
        map.insert(key.to_string(), body.clone());
        Payload::Wrapped(Value::Object(map))
    }

    fn value(&self) -> &Value {
        match self {
            Payload::Document(value) | Payload::Wrapped(value) => value,
        }
    }

    /// Take the wrapped value back out of a projection.
    fn unwrap(&self, projected: Value, key: &str) -> Value {
        match (self, projected) {
            (Payload::Wrapped(_), Value::Object(mut map)) => map.remove(key).unwrap_or(Value::Null),
            (_, projected) => projected,
        }
    }
}
