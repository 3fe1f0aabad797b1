// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report generation for signature runs

pub mod formatter;
pub mod output;

use crate::types::SignatureResult;
use serde::Serialize;

pub use formatter::ReportFormatter;
pub use output::OutputFormat;

/// The signature generated for one crash file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureReport {
    pub source: String,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto_signature: Option<String>,
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub debug_log: Vec<String>,
}

impl SignatureReport {
    /// Build a report entry; the debug log is kept only when `verbose`
    pub fn new(source: impl Into<String>, result: SignatureResult, verbose: bool) -> Self {
        let proto_signature = result.proto_signature().map(str::to_string);
        Self {
            source: source.into(),
            signature: result.signature,
            proto_signature,
            notes: result.notes,
            debug_log: if verbose { result.debug_log } else { Vec::new() },
        }
    }
}

/// Print signature reports to stdout in the given format
pub fn print_reports(reports: &[SignatureReport], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => ReportFormatter::new().print(reports),
        _ => println!("{}", format.serialize(reports)?),
    }
    Ok(())
}
