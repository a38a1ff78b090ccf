//! Access control evaluated once per request, before any payload work.
//!
//! The configured authorizer inspects the [`Request`] and returns an
//! [`AuthDecision`]. A plain allow/deny is final. A [`Grants`] map is checked
//! against the required [`Permissions`] when some are configured and accepted
//! as-is otherwise.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exchange::Request;
use crate::failure::Failure;
use crate::options::{Auth, ResolvedOptions};
use crate::types::json_type_name;

/// Required actions per resource, e.g. `{"users": ["read", "write"]}`.
pub type Permissions = BTreeMap<String, Vec<String>>;

/// Actions granted per resource, as returned by an authorizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants(BTreeMap<String, BTreeMap<String, bool>>);

impl Grants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `action` on `resource`.
    pub fn grant(mut self, resource: impl Into<String>, action: impl Into<String>) -> Self {
        self.0
            .entry(resource.into())
            .or_default()
            .insert(action.into(), true);
        self
    }

    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.0
            .get(resource)
            .and_then(|actions| actions.get(action))
            .copied()
            .unwrap_or(false)
    }

    /// Whether every required action on every required resource is granted.
    pub fn satisfies(&self, required: &Permissions) -> bool {
        required.iter().all(|(resource, actions)| {
            actions.iter().all(|action| self.allows(resource, action))
        })
    }

    /// Read grants from a JSON object. Only literal `true` grants an action.
    fn from_json(map: &serde_json::Map<String, Value>) -> Self {
        let grants = map
            .iter()
            .map(|(resource, actions)| {
                let actions = actions
                    .as_object()
                    .map(|actions| {
                        actions
                            .iter()
                            .map(|(action, granted)| (action.clone(), granted == &Value::Bool(true)))
                            .collect()
                    })
                    .unwrap_or_default();
                (resource.clone(), actions)
            })
            .collect();
        Self(grants)
    }
}

/// Result of an authorization callback.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    Allow,
    Deny,
    Grants(Grants),
    /// Anything that is neither a boolean nor a grant map.
    Invalid(Value),
}

impl From<bool> for AuthDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            AuthDecision::Allow
        } else {
            AuthDecision::Deny
        }
    }
}

impl From<Grants> for AuthDecision {
    fn from(grants: Grants) -> Self {
        AuthDecision::Grants(grants)
    }
}

impl From<Value> for AuthDecision {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(allowed) => allowed.into(),
            Value::Object(map) => AuthDecision::Grants(Grants::from_json(&map)),
            other => AuthDecision::Invalid(other),
        }
    }
}

/// Authorization callback.
///
/// The returned future must not borrow the request; copy out what it needs first.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, request: &Request) -> BoxFuture<'static, AuthDecision>;
}

/// Adapts a closure returning a future into an [`Authorizer`].
pub struct AuthFn<F>(pub F);

impl<F, Fut, D> Authorizer for AuthFn<F>
where
    F: Fn(&Request) -> Fut + Send + Sync,
    Fut: Future<Output = D> + Send + 'static,
    D: Into<AuthDecision>,
{
    fn authorize(&self, request: &Request) -> BoxFuture<'static, AuthDecision> {
        let decision = (self.0)(request);
        Box::pin(async move { decision.await.into() })
    }
}

impl<F> fmt::Debug for AuthFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthFn(<callback>)")
    }
}

/// Evaluate the configured authorizer for `request`.
///
/// # Errors
///
/// Returns the failure to report: `ACLx001` when access is denied, `ACLx002`
/// when the authorizer is not callable or returned an invalid shape.
pub async fn authorize(options: &ResolvedOptions, request: &Request) -> Result<(), Failure> {
    let authorizer = match &options.auth {
        None => return Ok(()),
        Some(Auth::Callback(authorizer)) => authorizer,
        Some(Auth::Unresolved(value)) => {
            tracing::debug!(kind = json_type_name(value), "auth option is not callable");
            return Err(Failure::auth_not_callable());
        }
    };

    match authorizer.authorize(request).await {
        AuthDecision::Allow => Ok(()),
        AuthDecision::Deny => Err(Failure::access_denied()),
        AuthDecision::Grants(grants) => match &options.permissions {
            Some(required) if !grants.satisfies(required) => Err(Failure::access_denied()),
            _ => Ok(()),
        },
        AuthDecision::Invalid(value) => {
            tracing::debug!(kind = json_type_name(&value), "authorizer returned invalid result");
            Err(Failure::auth_invalid_result())
        }
    }
}
