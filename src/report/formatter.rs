// SPDX-License-Identifier: PMPL-1.0-or-later

//! Human-readable report output

use crate::report::SignatureReport;
use colored::*;

pub struct ReportFormatter;

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn print(&self, reports: &[SignatureReport]) {
        print!("{}", self.render(reports));
    }

    pub fn render(&self, reports: &[SignatureReport]) -> String {
        let mut out = String::new();
        for report in reports {
            out.push_str(&format!("{}\n", report.source.bold()));
            out.push_str(&format!("  {} {}\n", "signature:".cyan(), report.signature.green()));
            if let Some(proto) = &report.proto_signature {
                out.push_str(&format!("  {} {}\n", "proto:".cyan(), proto));
            }
            for note in &report.notes {
                out.push_str(&format!("  {} {}\n", "note:".yellow(), note));
            }
            for line in &report.debug_log {
                out.push_str(&format!("  {} {}\n", "debug:".dimmed(), line.dimmed()));
            }
        }
        out
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}
