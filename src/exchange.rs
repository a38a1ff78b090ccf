//! Boundary with the host HTTP framework.
//!
//! The host parses the HTTP request into a [`Request`], wraps it in an
//! [`Exchange`] and calls [`Contract::handle`](crate::Contract::handle) with its
//! [`Next`] continuation. Application code answers through
//! [`Exchange::send`], which runs the response pipeline when one is installed.
//! Whatever reached [`Response::dispatch`] is what the host writes to the wire.

use futures::future::BoxFuture;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Extensions, HeaderMap, Method, StatusCode, Uri};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::failure::Failure;
use crate::response::Interceptor;

/// Inbound side of an exchange.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Typed per-request state set by earlier middleware (sessions, principals, ...).
    pub extensions: Extensions,
    pub body: Value,
    pub query: Map<String, Value>,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            uri: Uri::default(),
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            body: Value::Null,
            query: Map::new(),
        }
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Outbound side of an exchange.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    pub headers: HeaderMap,
    body: Option<Value>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The underlying send primitive. Bypasses every contract check.
    ///
    /// Only the first body is kept; later calls are logged and dropped.
    pub fn dispatch(&mut self, body: Value) {
        if self.body.is_some() {
            tracing::warn!(status = %self.status, "response already sent, dropping body");
            return;
        }
        self.body = Some(body);
    }

    pub fn is_sent(&self) -> bool {
        self.body.is_some()
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> Option<Value> {
        self.body.take()
    }
}

/// Request and response of one in-flight call.
#[derive(Debug)]
pub struct Exchange {
    pub request: Request,
    pub response: Response,
    interceptor: Option<Interceptor>,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
            interceptor: None,
        }
    }

    /// Set the response status; chainable before [`send`](Self::send).
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.response.set_status(status);
        self
    }

    /// Send `body`, running the response pipeline if one is installed.
    ///
    /// The pipeline runs for the first send only, so failure handlers that
    /// send their own error body reach the client unchecked.
    pub async fn send(&mut self, body: impl Into<Value>) {
        let body = body.into();
        match self.interceptor.take() {
            Some(interceptor) => interceptor.intercept(self, body).await,
            None => self.response.dispatch(body),
        }
    }

    /// Serialize `value` and send it as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serialization error; nothing is sent in that case.
    pub async fn send_json<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_value(value)?;
        if !self.response.headers.contains_key(CONTENT_TYPE) {
            self.response
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        self.send(body).await;
        Ok(())
    }

    pub(crate) fn install(&mut self, interceptor: Interceptor) {
        self.interceptor = Some(interceptor);
    }

    /// Drop the response pipeline so an error body is sent unchecked.
    pub(crate) fn uninstall(&mut self) {
        self.interceptor = None;
    }
}

/// Continuation supplied by the host framework.
pub trait Next: Send + Sync {
    /// Hand the exchange to the application stage.
    fn run<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, ()>;

    /// Forward a failure to the host's generic error handling.
    ///
    /// The response pipeline is already removed when this runs, so an error
    /// body written with [`Exchange::send`] reaches the client unchecked.
    fn fail<'a>(&'a self, exchange: &'a mut Exchange, failure: Failure) -> BoxFuture<'a, ()>;
}
