//! Inbound pipeline, run before application code.

use serde_json::Value;

use crate::contract::Shared;
use crate::exchange::{Exchange, Next};
use crate::failure::{report, Failure};
use crate::model::Document;
use crate::options::ResolvedOptions;
use crate::types::PayloadSource;

/// Validate and/or filter the inbound payload, then continue.
///
/// Body methods read the body, query methods the query parameters. Other
/// methods pass through untouched unless a request hook is configured, in
/// which case they are reported as `REQx002`.
pub(crate) async fn run(shared: &Shared, exchange: &mut Exchange, next: &dyn Next) {
    let options = &shared.options;
    let Some(model) = &shared.models.request else {
        return next.run(exchange).await;
    };

    let Some(source) = PayloadSource::for_method(&exchange.request.method) else {
        match &options.on_request_error {
            Some(hook) => {
                tracing::debug!(method = %exchange.request.method, "unsupported request method");
                exchange.uninstall();
                hook(exchange, Failure::method_unsupported());
            }
            None => next.run(exchange).await,
        }
        return;
    };

    let document = match source {
        PayloadSource::Body => model.instantiate(&exchange.request.body),
        PayloadSource::Query => model.instantiate_fields(&exchange.request.query),
    };

    match check(document, options) {
        Err(failure) => {
            exchange.uninstall();
            report(options.on_request_error.as_ref(), exchange, next, failure).await;
            return;
        }
        Ok(Some(projected)) => match source {
            PayloadSource::Body => exchange.request.body = projected,
            PayloadSource::Query => {
                if let Value::Object(map) = projected {
                    exchange.request.query = map;
                }
            }
        },
        Ok(None) => {}
    }

    next.run(exchange).await
}

/// Validate `document` if enabled; return its projection if filtering is on.
pub(crate) fn check(document: Document<'_>, options: &ResolvedOptions) -> Result<Option<Value>, Failure> {
    if options.validate.request {
        document.validate().map_err(Failure::request_invalid)?;
    }
    Ok(options.filter.request.then(|| document.into_canonical()))
}
