// SPDX-License-Identifier: PMPL-1.0-or-later

//! siggen: generate crash signatures from processed crash data
//!
//! Reads crash reports as JSON, runs the signature pipeline over them and
//! prints the result. Also exposes the Java trace helpers and the function
//! normalizer for poking at single inputs.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde_json::Value;
use siggen::config::ToolConfig;
use siggen::javautil;
use siggen::report::{self, OutputFormat, SignatureReport};
use siggen::signatures::{CSignatureTool, SignatureGenerator};
use siggen::types::CrashData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "siggen")]
#[command(version)]
#[command(about = "Crash signature generation")]
#[command(long_about = None)]
struct Cli {
    /// Log every rule and signature change to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate signatures for crash data files
    Signature {
        /// Crash data JSON files, or directories to search for them
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Siglists YAML file to use instead of the built-in lists
        #[arg(long, value_name = "FILE")]
        siglists: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include the debug log of every rule
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a raw Java stack trace
    JavaTrace {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format; text prints the trace without the exception message
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a JavaException document and print it redacted
    JavaException {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Normalize a single function name
    Normalize {
        #[arg(value_name = "FUNCTION")]
        function: String,

        /// Treat the function as a Rust symbol
        #[arg(long)]
        rust: bool,

        /// Source line number of the frame
        #[arg(long, value_name = "N")]
        line: Option<u32>,

        /// Siglists YAML file to use instead of the built-in lists
        #[arg(long, value_name = "FILE")]
        siglists: Option<PathBuf>,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(siglists: Option<&Path>) -> Result<Arc<ToolConfig>> {
    let config = match siglists {
        Some(path) => {
            let config = ToolConfig::from_file(path)
                .with_context(|| format!("loading siglists from {}", path.display()))?;
            tracing::info!(path = %path.display(), "loaded siglists");
            config
        }
        None => ToolConfig::builtin().context("loading built-in siglists")?,
    };
    Ok(Arc::new(config))
}

/// Expand directories into the JSON files below them, sorted by path
fn collect_crash_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path) {
                let entry =
                    entry.with_context(|| format!("walking {}", path.display()))?;
                let is_json = entry.path().extension().and_then(|e| e.to_str()) == Some("json");
                if entry.file_type().is_file() && is_json {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn run_signature(
    paths: &[PathBuf],
    siglists: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let generator = SignatureGenerator::new(load_config(siglists)?);
    let files = collect_crash_files(paths)?;
    tracing::debug!(count = files.len(), "generating signatures");

    let outcomes: Vec<(PathBuf, Result<SignatureReport>)> = files
        .par_iter()
        .map(|path| {
            let outcome = read_json(path).map(|value| {
                let result = generator.generate(&CrashData::from_value(value));
                SignatureReport::new(path.display().to_string(), result, verbose)
            });
            (path.clone(), outcome)
        })
        .collect();

    let mut reports = Vec::with_capacity(outcomes.len());
    let mut failures = 0usize;
    for (path, outcome) in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(err) => {
                tracing::warn!(path = %path.display(), "{:#}", err);
                failures += 1;
            }
        }
    }

    report::print_reports(&reports, format)?;
    if failures > 0 {
        bail!("{} crash file(s) could not be read", failures);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Commands::Signature {
            paths,
            siglists,
            format,
            verbose,
        } => run_signature(&paths, siglists.as_deref(), format, verbose)?,

        Commands::JavaTrace { file, format } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let trace = javautil::parse_java_stack_trace(text.as_str())
                .with_context(|| format!("parsing {}", file.display()))?;
            match format {
                OutputFormat::Text => println!("{}", trace.to_public_string()),
                _ => println!("{}", format.serialize(&trace)?),
            }
        }

        Commands::JavaException { file } => {
            let data = read_json(&file)?;
            javautil::validate_java_exception(&data)
                .with_context(|| format!("validating {}", file.display()))?;
            let sanitized = javautil::sanitize_java_exception(&data);
            println!("{}", serde_json::to_string_pretty(&sanitized)?);
        }

        Commands::Normalize {
            function,
            rust,
            line,
            siglists,
        } => {
            let tool = CSignatureTool::new(load_config(siglists.as_deref())?);
            let line = line.map(|n| n.to_string());
            let normalized = if rust {
                tool.normalize_rust_function(&function, line.as_deref())
            } else {
                tool.normalize_cpp_function(&function, line.as_deref())
            };
            println!("{}", normalized);
        }
    }

    Ok(())
}
