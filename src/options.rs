//! Contract options and their resolution against defaults.
//!
//! [`Options`] is the partial, call-site form; every field may be left unset.
//! [`ResolvedOptions`] is the complete form a contract runs with. Resolution
//! is shallow per key, except `filter` and `validate` whose request and
//! response switches merge independently.
//!
//! # Process-wide defaults
//!
//! [`set_defaults`] installs the defaults every later contract starts from. It
//! is meant to run once at startup: it fails after defaults were installed or
//! first read, so no contract ever observes them changing.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::access::{AuthDecision, AuthFn, Authorizer, Permissions};
use crate::error::DefaultsError;
use crate::exchange::{Exchange, Request};
use crate::failure::Failure;
use crate::types::DEFAULT_PAYLOAD_KEY;

/// Failure hook. A hook owns termination of the exchange.
pub type Hook = Arc<dyn Fn(&mut Exchange, Failure) + Send + Sync>;

/// Configured authorization.
#[derive(Clone)]
pub enum Auth {
    Callback(Arc<dyn Authorizer>),
    /// An `auth` entry that cannot be invoked, e.g. one read from a config file.
    Unresolved(Value),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Callback(_) => f.write_str("Callback(<authorizer>)"),
            Auth::Unresolved(value) => f.debug_tuple("Unresolved").field(value).finish(),
        }
    }
}

impl<'de> Deserialize<'de> for Auth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Auth::Unresolved)
    }
}

/// Request/response switches with either side possibly unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialToggles {
    pub request: Option<bool>,
    pub response: Option<bool>,
}

/// Request/response switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub request: bool,
    pub response: bool,
}

impl Toggles {
    fn merge(self, partial: PartialToggles) -> Self {
        Self {
            request: partial.request.unwrap_or(self.request),
            response: partial.response.unwrap_or(self.response),
        }
    }
}

/// Call-site options. Unset fields fall back to the defaults.
///
/// Deserializes from JSON configuration (`permissions`, `payloadKey`,
/// `filter`, `validate`, `auth`); hooks and callbacks are attached in code.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Options {
    pub auth: Option<Auth>,
    pub permissions: Option<Permissions>,
    pub payload_key: Option<String>,
    pub filter: PartialToggles,
    pub validate: PartialToggles,
    #[serde(skip)]
    pub on_request_error: Option<Hook>,
    #[serde(skip)]
    pub on_response_error: Option<Hook>,
    #[serde(skip)]
    pub on_access_error: Option<Hook>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize requests with a closure returning a future.
    ///
    /// The future must not borrow the request; copy out what it needs first.
    pub fn auth<F, Fut, D>(self, callback: F) -> Self
    where
        F: Fn(&Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = D> + Send + 'static,
        D: Into<AuthDecision> + 'static,
    {
        self.authorizer(AuthFn(callback))
    }

    /// Authorize requests with an [`Authorizer`] implementation.
    pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.auth = Some(Auth::Callback(Arc::new(authorizer)));
        self
    }

    /// Require `actions` on `resource`; adds to earlier requirements.
    pub fn require<I, A>(mut self, resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.permissions
            .get_or_insert_with(Permissions::new)
            .entry(resource.into())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn payload_key(mut self, key: impl Into<String>) -> Self {
        self.payload_key = Some(key.into());
        self
    }

    pub fn filter_request(mut self, enabled: bool) -> Self {
        self.filter.request = Some(enabled);
        self
    }

    pub fn filter_response(mut self, enabled: bool) -> Self {
        self.filter.response = Some(enabled);
        self
    }

    pub fn validate_request(mut self, enabled: bool) -> Self {
        self.validate.request = Some(enabled);
        self
    }

    pub fn validate_response(mut self, enabled: bool) -> Self {
        self.validate.response = Some(enabled);
        self
    }

    /// Hook for `REQx001`, `REQx002` and `SCHEMAx001`.
    pub fn on_request_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Exchange, Failure) + Send + Sync + 'static,
    {
        self.on_request_error = Some(Arc::new(hook));
        self
    }

    /// Hook for `RESx001`.
    pub fn on_response_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Exchange, Failure) + Send + Sync + 'static,
    {
        self.on_response_error = Some(Arc::new(hook));
        self
    }

    /// Hook for `ACLx001` and `ACLx002`.
    pub fn on_access_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Exchange, Failure) + Send + Sync + 'static,
    {
        self.on_access_error = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("auth", &self.auth)
            .field("permissions", &self.permissions)
            .field("payload_key", &self.payload_key)
            .field("filter", &self.filter)
            .field("validate", &self.validate)
            .field("on_request_error", &self.on_request_error.is_some())
            .field("on_response_error", &self.on_response_error.is_some())
            .field("on_access_error", &self.on_access_error.is_some())
            .finish()
    }
}

/// Fully resolved options; immutable once a contract is built.
#[derive(Clone)]
pub struct ResolvedOptions {
    pub auth: Option<Auth>,
    pub permissions: Option<Permissions>,
    pub payload_key: String,
    pub filter: Toggles,
    pub validate: Toggles,
    pub on_request_error: Option<Hook>,
    pub on_response_error: Option<Hook>,
    pub on_access_error: Option<Hook>,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            auth: None,
            permissions: None,
            payload_key: DEFAULT_PAYLOAD_KEY.to_string(),
            filter: Toggles {
                request: true,
                response: true,
            },
            validate: Toggles {
                request: true,
                response: false,
            },
            on_request_error: None,
            on_response_error: None,
            on_access_error: None,
        }
    }
}

impl ResolvedOptions {
    /// Overlay `options` on these options.
    pub fn merge(&self, options: Options) -> Self {
        Self {
            auth: options.auth.or_else(|| self.auth.clone()),
            permissions: options.permissions.or_else(|| self.permissions.clone()),
            payload_key: options
                .payload_key
                .unwrap_or_else(|| self.payload_key.clone()),
            filter: self.filter.merge(options.filter),
            validate: self.validate.merge(options.validate),
            on_request_error: options
                .on_request_error
                .or_else(|| self.on_request_error.clone()),
            on_response_error: options
                .on_response_error
                .or_else(|| self.on_response_error.clone()),
            on_access_error: options
                .on_access_error
                .or_else(|| self.on_access_error.clone()),
        }
    }

    /// Whether the request direction needs a compiled model.
    pub fn request_enabled(&self) -> bool {
        self.filter.request || self.validate.request
    }

    /// Whether the response direction needs compiled models.
    pub fn response_enabled(&self) -> bool {
        self.filter.response || self.validate.response
    }
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("auth", &self.auth)
            .field("permissions", &self.permissions)
            .field("payload_key", &self.payload_key)
            .field("filter", &self.filter)
            .field("validate", &self.validate)
            .field("on_request_error", &self.on_request_error.is_some())
            .field("on_response_error", &self.on_response_error.is_some())
            .field("on_access_error", &self.on_access_error.is_some())
            .finish()
    }
}

static DEFAULTS: OnceLock<ResolvedOptions> = OnceLock::new();

/// Install the process-wide defaults, merged over the built-in ones.
///
/// # Errors
///
/// Returns `DefaultsError::AlreadyInitialized` if defaults were already
/// installed or already read by a contract construction.
pub fn set_defaults(options: Options) -> Result<(), DefaultsError> {
    let resolved = ResolvedOptions::default().merge(options);
    DEFAULTS
        .set(resolved)
        .map_err(|_| DefaultsError::AlreadyInitialized)?;
    tracing::debug!("installed process-wide contract defaults");
    Ok(())
}

/// The process-wide defaults. The first read freezes them.
pub fn defaults() -> &'static ResolvedOptions {
    DEFAULTS.get_or_init(ResolvedOptions::default)
}
