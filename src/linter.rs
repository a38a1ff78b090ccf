//! Contract linting - static analysis of description files.
//!
//! | Code | Severity | Issue |
//! |------|----------|-------|
//! | `E001` | error | file unreadable or not JSON |
//! | `E002` | error | malformed description or field spec |
//! | `E003` | error | status key is not an integer in 100..=599 |
//! | `E004` | error | field constraints rejected by the validation engine |
//! | `E005` | error | empty alternatives list |
//! | `W001` | warning | `default` is not one of the field's `enum` values |
//! | `W002` | warning | alternatives list with a single entry |
//! | `W003` | warning | no response schemas declared |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::compiler::compile_responses;
use crate::description::{ResponseSchema, SchemaDescription};
use crate::error::CompileError;
use crate::loader::load_json;
use crate::model::{model_name, CompiledModel};
use crate::types::Direction;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/response/201/id")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_description_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, path)).collect();

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    tracing::debug!(path = %path.display(), files = files.len(), errors, warnings, "lint finished");

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single description file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut sink = Sink {
        file,
        diagnostics: Vec::new(),
    };
    check_file(file, &mut sink);

    let has_errors = sink.diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = sink
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics: sink.diagnostics,
    }
}

struct Sink<'a> {
    file: &'a Path,
    diagnostics: Vec<Diagnostic>,
}

impl Sink<'_> {
    fn push(&mut self, severity: Severity, code: &str, path: String, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.to_path_buf(),
            path,
            message,
        });
    }

    fn error(&mut self, code: &str, path: String, message: String) {
        self.push(Severity::Error, code, path, message);
    }

    fn warning(&mut self, code: &str, path: String, message: String) {
        self.push(Severity::Warning, code, path, message);
    }

    fn compile_error(&mut self, path: &str, error: CompileError) {
        match &error {
            CompileError::InvalidDescription { path, .. } | CompileError::InvalidField { path, .. } => {
                self.error("E002", path.clone(), error.to_string())
            }
            CompileError::InvalidStatus { key } => {
                self.error("E003", format!("/response/{}", key), error.to_string())
            }
            CompileError::EmptyAlternatives { status } => {
                self.error("E005", format!("/response/{}", status), error.to_string())
            }
            CompileError::InvalidSchema { .. } => {
                self.error("E004", path.to_string(), error.to_string())
            }
        }
    }
}

fn check_file(file: &Path, sink: &mut Sink<'_>) {
    let value = match load_json(file) {
        Ok(value) => value,
        Err(e) => {
            sink.error("E001", "/".to_string(), format!("syntax error: {}", e));
            return;
        }
    };

    let description = match SchemaDescription::from_json(&value) {
        Ok(description) => description,
        Err(e) => {
            sink.compile_error("/", e);
            return;
        }
    };

    if let Err(e) = CompiledModel::compile(model_name(Direction::Request, None), &description.request)
    {
        sink.compile_error("/request", e);
    }
    for (status, schema) in &description.responses {
        let single = BTreeMap::from([(*status, schema.clone())]);
        if let Err(e) = compile_responses(&single) {
            sink.compile_error(&format!("/response/{}", status), e);
        }
        if let ResponseSchema::Alternatives(list) = schema {
            if list.len() == 1 {
                sink.warning(
                    "W002",
                    format!("/response/{}", status),
                    "alternatives list has a single entry; declare it as a plain schema".to_string(),
                );
            }
        }
    }

    if description.responses.is_empty() {
        sink.warning(
            "W003",
            "/response".to_string(),
            "no response schemas declared; every send will fail with SCHEMAx001".to_string(),
        );
    }

    if let Some(request) = value.get("request").and_then(Value::as_object) {
        check_defaults(request, "/request", sink);
    }
    if let Some(responses) = value.get("response").and_then(Value::as_object) {
        for (key, schema) in responses {
            let path = format!("/response/{}", key);
            match schema {
                Value::Object(fields) => check_defaults(fields, &path, sink),
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(fields) = item.as_object() {
                            check_defaults(fields, &format!("{}/{}", path, i), sink);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Walk a field map and flag defaults outside the field's `enum`.
fn check_defaults(fields: &Map<String, Value>, path: &str, sink: &mut Sink<'_>) {
    for (name, spec) in fields {
        check_field(spec, &format!("{}/{}", path, name), sink);
    }
}

fn check_field(spec: &Value, path: &str, sink: &mut Sink<'_>) {
    let Some(spec) = spec.as_object() else {
        return;
    };

    if let (Some(default), Some(Value::Array(allowed))) = (spec.get("default"), spec.get("enum")) {
        if !allowed.contains(default) {
            sink.warning(
                "W001",
                format!("{}/default", path),
                format!("default {} is not one of the enum values", default),
            );
        }
    }

    if let Some(Value::Object(properties)) = spec.get("properties") {
        check_defaults(properties, &format!("{}/properties", path), sink);
    }
    if let Some(items) = spec.get("items") {
        check_field(items, &format!("{}/items", path), sink);
    }
}

fn collect_description_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lint_str(content: &str) -> FileResult {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contract.json");
        std::fs::write(&path, content).unwrap();
        lint_file(&path, dir.path())
    }

    fn codes(result: &FileResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn lint_valid_description() {
        let result = lint_str(
            r#"{
                "request": { "name": { "type": "string", "required": true } },
                "response": {
                    "201": { "id": "string" },
                    "409": [{ "code": "string" }, { "username": "string" }]
                }
            }"#,
        );
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.file, PathBuf::from("contract.json"));
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let result = lint_str("{ not valid json }");
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(codes(&result), ["E001"]);
    }

    #[test]
    fn lint_missing_request() {
        let result = lint_str(r#"{"response": {"200": {}}}"#);
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(codes(&result), ["E002"]);
        assert_eq!(result.diagnostics[0].path, "/request");
    }

    #[test]
    fn lint_malformed_field_spec() {
        let result = lint_str(r#"{"request": {"name": 42}, "response": {"200": {}}}"#);
        assert_eq!(codes(&result), ["E002"]);
        assert_eq!(result.diagnostics[0].path, "/request/name");
    }

    #[test]
    fn lint_invalid_status_key() {
        let result = lint_str(r#"{"request": {}, "response": {"abc": {}}}"#);
        assert_eq!(codes(&result), ["E003"]);
        assert_eq!(result.diagnostics[0].path, "/response/abc");
    }

    #[test]
    fn lint_engine_rejects_constraints() {
        let result = lint_str(
            r#"{"request": {"name": {"type": "string", "pattern": "(["}}, "response": {"200": {}}}"#,
        );
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(codes(&result), ["E004"]);
        assert_eq!(result.diagnostics[0].path, "/request");
    }

    #[test]
    fn lint_empty_alternatives() {
        let result = lint_str(r#"{"request": {}, "response": {"409": []}}"#);
        assert_eq!(codes(&result), ["E005"]);
        assert_eq!(result.diagnostics[0].path, "/response/409");
    }

    #[test]
    fn lint_default_outside_enum() {
        let result = lint_str(
            r#"{
                "request": {
                    "role": { "type": "string", "enum": ["user", "admin"], "default": "root" }
                },
                "response": { "200": {} }
            }"#,
        );
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(codes(&result), ["W001"]);
        assert_eq!(result.diagnostics[0].path, "/request/role/default");
    }

    #[test]
    fn lint_nested_default_outside_enum() {
        let result = lint_str(
            r#"{
                "request": {},
                "response": { "200": {
                    "user": { "properties": {
                        "tier": { "enum": [1, 2], "default": 3 }
                    } }
                } }
            }"#,
        );
        assert_eq!(codes(&result), ["W001"]);
        assert_eq!(
            result.diagnostics[0].path,
            "/response/200/user/properties/tier/default"
        );
    }

    #[test]
    fn lint_single_alternative() {
        let result = lint_str(r#"{"request": {}, "response": {"409": [{"code": "string"}]}}"#);
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(codes(&result), ["W002"]);
    }

    #[test]
    fn lint_no_responses() {
        let result = lint_str(r#"{"request": {}}"#);
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(codes(&result), ["W003"]);
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("valid.json"),
            r#"{"request": {}, "response": {"200": {}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("invalid.json"), "{ not json }").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_strict_mode() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.json");
        // Warning only (no responses)
        std::fs::write(&file_path, r#"{"request": {}}"#).unwrap();

        let result = lint(&file_path, false);
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 0);

        let result = lint(&file_path, true);
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
        assert!(result.is_ok());
    }
}
