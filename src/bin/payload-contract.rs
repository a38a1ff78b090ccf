//! Payload Contract CLI
//!
//! Command-line interface for linting contract descriptions and checking
//! payloads against them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use http::Method;
use payload_contract::{
    lint, load_description_auto, load_json, load_options, Contract, Direction, Failure,
    FailureCode, FileStatus, Options, Severity,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "payload-contract")]
#[command(about = "Lint request/response contracts and check payloads against them")]
#[command(version)]
struct Cli {
    /// Enable verbose logging on stderr. Repeat for more (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint contract description files
    Check {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Check a payload against a contract
    Validate {
        /// Payload file to check
        payload: PathBuf,

        /// Contract description: file path or URL (http:// or https://)
        #[arg(long)]
        contract: String,

        /// Options file (JSON) applied over the defaults
        #[arg(long)]
        options: Option<PathBuf>,

        /// Check as an inbound request payload
        #[arg(
            long,
            conflicts_with = "response",
            required_unless_present = "response"
        )]
        request: bool,

        /// Check as an outbound response body
        #[arg(long, conflicts_with = "request", required_unless_present = "request")]
        response: bool,

        /// Request method; decides body vs. query handling
        #[arg(long, default_value = "POST")]
        method: String,

        /// Response status the body is sent with
        #[arg(long, requires = "response")]
        status: Option<u16>,

        /// Print the payload as the receiving side would see it
        #[arg(long)]
        filter: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            path,
            format,
            strict,
            quiet,
        } => run_check(&path, &format, strict, quiet),

        Commands::Validate {
            payload,
            contract,
            options,
            request,
            response: _,
            method,
            status,
            filter,
            json,
        } => run_validate(ValidateArgs {
            payload,
            contract,
            options,
            request,
            method,
            status,
            filter,
            json_output: json,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct ValidateArgs {
    payload: PathBuf,
    contract: String,
    options: Option<PathBuf>,
    request: bool,
    method: String,
    status: Option<u16>,
    filter: bool,
    json_output: bool,
}

fn run_validate(args: ValidateArgs) -> Result<(), u8> {
    let json_output = args.json_output;

    let payload = load_json(&args.payload).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let description = load_description_auto(&args.contract).map_err(|e| {
        report_error(json_output, &format!("loading contract: {}", e));
        e.exit_code() as u8
    })?;

    let options = match &args.options {
        Some(path) => load_options(path).map_err(|e| {
            report_error(json_output, &format!("loading options: {}", e));
            e.exit_code() as u8
        })?,
        None => Options::new(),
    };

    // The checked direction always validates; --filter decides the output
    let direction = Direction::from_request_flag(args.request);
    let options = match direction {
        Direction::Request => options.validate_request(true).filter_request(args.filter),
        Direction::Response => options.validate_response(true).filter_response(args.filter),
    };

    let contract = Contract::new(&description, options).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    let outcome = match direction {
        Direction::Request => {
            let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
                .map_err(|_| {
                    report_error(json_output, &format!("invalid method: {}", args.method));
                    2u8
                })?;
            contract.check_request(&method, &payload)
        }
        Direction::Response => {
            let Some(status) = args.status else {
                report_error(json_output, "--response requires --status");
                return Err(2);
            };
            futures::executor::block_on(contract.check_response(status, payload))
        }
    };

    match outcome {
        Ok(checked) => {
            report_valid(json_output, args.filter.then_some(&checked));
            Ok(())
        }
        Err(failure) => {
            report_failure(json_output, &failure);
            match failure.code {
                FailureCode::MethodUnsupported => Err(2),
                _ => Err(1),
            }
        }
    }
}

fn report_valid(json_output: bool, payload: Option<&Value>) {
    if json_output {
        let mut output = json!({ "valid": true });
        if let Some(payload) = payload {
            output["payload"] = payload.clone();
        }
        println!("{}", output);
        return;
    }

    println!("Valid");
    if let Some(payload) = payload {
        match serde_json::to_string_pretty(payload) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error serializing output: {}", e),
        }
    }
}

fn report_failure(json_output: bool, failure: &Failure) {
    if json_output {
        println!("{}", json!({ "valid": false, "failure": failure }));
        return;
    }

    eprintln!("Validation failed: {}", failure);
    if let Some(status) = failure.status_code {
        eprintln!("  status: {}", status);
    }
    for field in failure.fields.iter().flatten() {
        eprintln!("  field: {}", field);
    }
    if let Some(cause) = &failure.error {
        eprintln!("  {}", cause);
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_check(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        if !quiet {
            println!("Checking {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
