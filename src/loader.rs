//! Contract description loading from files, strings, and HTTP URLs.

use std::path::Path;

use serde_json::Value;

use crate::description::SchemaDescription;
use crate::error::LoadError;
use crate::options::Options;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Read and parse a JSON file.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a contract description from a file path.
///
/// # Errors
///
/// Returns the I/O or JSON error, or `LoadError::Compile` if the document is
/// not a valid description.
pub fn load_description(path: &Path) -> Result<SchemaDescription, LoadError> {
    let value = load_json(path)?;
    tracing::debug!(path = %path.display(), "loaded contract description");
    Ok(SchemaDescription::from_json(&value)?)
}

/// Load a contract description from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::Compile`.
pub fn load_description_str(content: &str) -> Result<SchemaDescription, LoadError> {
    let value: Value =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    Ok(SchemaDescription::from_json(&value)?)
}

/// Fetch a JSON document over HTTP/HTTPS.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, the server answers
/// with an error status, or the body isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let response = client.get(url).send().map_err(network)?;

    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network)?;

    response.json().map_err(network)
}

/// Load a contract description from an HTTP/HTTPS URL.
///
/// # Errors
///
/// Returns `LoadError::NetworkError` or `LoadError::Compile`.
#[cfg(feature = "remote")]
pub fn load_description_url(url: &str) -> Result<SchemaDescription, LoadError> {
    let value = load_json_url(url)?;
    tracing::debug!(url, "fetched contract description");
    Ok(SchemaDescription::from_json(&value)?)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a contract description from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_description_auto(source: &str) -> Result<SchemaDescription, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_description_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_description(Path::new(source))
    }
}

/// Load contract options from a JSON file.
///
/// Hooks and authorization callbacks cannot be expressed in JSON; attach them
/// to the returned [`Options`] in code. An `auth` entry is kept as an
/// unresolved value and rejected as `ACLx002` at request time.
///
/// # Errors
///
/// Returns the I/O error, or `LoadError::InvalidJson` for malformed JSON or
/// unknown keys.
pub fn load_options(path: &Path) -> Result<Options, LoadError> {
    let value = load_json(path)?;
    serde_json::from_value(value).map_err(|source| LoadError::InvalidJson { source })
}
