// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signatures for Java crashes
//!
//! Only the first two lines of the trace matter: the exception line and the
//! innermost `at ...` frame.

use crate::config::ToolConfig;
use crate::signatures::normalize::{join_ignore_empty, split_lines};
use crate::signatures::ToolOutput;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};

static HEX_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[0-9a-f]{8}").expect("address pattern is valid"));
static JAVA_LINE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\d+\)$").expect("line number pattern is valid"));
static JAVA_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^at [^\s(]+\([^()]*\)$").expect("frame pattern is valid"));

pub const JAVA_DELIMITER: &str = ": ";

pub struct JavaSignatureTool {
    config: Arc<ToolConfig>,
}

impl JavaSignatureTool {
    pub fn new(config: Arc<ToolConfig>) -> Self {
        Self { config }
    }

    fn not_expected_format() -> ToolOutput {
        ToolOutput {
            signature: "EMPTY: Java stack trace not in expected format".to_string(),
            notes: vec!["JavaSignatureTool: stack trace not in expected format".to_string()],
            ..ToolOutput::default()
        }
    }

    /// Build a signature from a raw Java stack trace
    pub fn generate(&self, source: &Value, delimiter: &str) -> ToolOutput {
        let Some(text) = source.as_str() else {
            return Self::not_expected_format();
        };
        let lines: Vec<&str> = split_lines(text).into_iter().map(str::trim).collect();
        let Some(first) = lines.first() else {
            return Self::not_expected_format();
        };

        let mut output = ToolOutput::default();

        let (class, description) = match first.split_once(':') {
            Some((class, description)) => (
                class.trim().to_string(),
                HEX_ADDRESS
                    .replace_all(description, "@<addr>")
                    .trim()
                    .to_string(),
            ),
            None => {
                output
                    .notes
                    .push("JavaSignatureTool: stack trace line 1 is not in the expected format".to_string());
                (first.to_string(), String::new())
            }
        };

        let method = match lines.get(1) {
            Some(line) => {
                let method = JAVA_LINE_NUMBER.replace(line, ")").into_owned();
                if method.is_empty() {
                    output
                        .notes
                        .push("JavaSignatureTool: stack trace line 2 is empty".to_string());
                } else if !JAVA_FRAME.is_match(line) {
                    output.notes.push(
                        "JavaSignatureTool: stack trace line 2 is not in the expected format"
                            .to_string(),
                    );
                }
                method
            }
            None => {
                output
                    .notes
                    .push("JavaSignatureTool: stack trace line 2 is missing".to_string());
                String::new()
            }
        };

        // Descriptions ending in an address keep the delimiter before the
        // method; all others are joined to it with a plain space
        let mut signature = if description.ends_with("<addr>") {
            join_ignore_empty(delimiter, &[class.as_str(), description.as_str(), method.as_str()])
        } else {
            let phrase = join_ignore_empty(" ", &[description.as_str(), method.as_str()]);
            join_ignore_empty(delimiter, &[class.as_str(), phrase.as_str()])
        };

        if signature.chars().count() > self.config.limits().java_description {
            signature = [class.as_str(), method.as_str()].join(delimiter);
            output.notes.push(
                "JavaSignatureTool: dropped Java exception description due to length".to_string(),
            );
        }

        output.signature = signature;
        output
    }
}
