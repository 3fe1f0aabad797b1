// SPDX-License-Identifier: PMPL-1.0-or-later

//! Java crash helpers
//!
//! Parsing of raw Java stack traces, plus validation and redaction of the
//! structured `JavaException` annotation.

use crate::error::{ErrorKind, Result};
use crate::signatures::normalize::split_lines;
use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

/// A Java stack trace split into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JavaStackTrace {
    pub exception_class: String,
    pub exception_message: String,
    /// Frames of the outermost exception, without the leading tab
    pub stack: Vec<String>,
    /// "Caused by" and "Suppressed" sections, verbatim
    pub additional: Vec<String>,
}

impl JavaStackTrace {
    /// The trace without the exception message, which may carry user data
    pub fn to_public_string(&self) -> String {
        let mut text = self.exception_class.clone();
        for line in &self.stack {
            text.push_str("\n\t");
            text.push_str(line);
        }
        text
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Stage {
    ClassMessage,
    Stack,
    Additional,
}

fn starts_additional(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("Suppressed:") || line.starts_with("Caused by:")
}

/// Parse a raw Java stack trace
///
/// The first line is `Class: message`. The message continues over any lines
/// up to the first `\tat ` frame. Frames follow, each indented with a tab,
/// until a `Caused by:` or `Suppressed:` line starts the additional sections.
pub fn parse_java_stack_trace<'a>(text: impl Into<Option<&'a str>>) -> Result<JavaStackTrace> {
    let text = text
        .into()
        .ok_or_else(|| ErrorKind::malformed_trace("no text"))?;
    if text.trim().is_empty() {
        return Err(ErrorKind::malformed_trace("no text"));
    }

    let mut trace = JavaStackTrace::default();
    let mut stage = Stage::ClassMessage;
    let mut seen_first = false;

    for line in split_lines(text) {
        match stage {
            Stage::ClassMessage => {
                if !seen_first {
                    if line.trim().is_empty() {
                        continue;
                    }
                    seen_first = true;
                    match line.split_once(':') {
                        Some((class, message)) => {
                            trace.exception_class = class.to_string();
                            trace.exception_message = message.to_string();
                        }
                        None => trace.exception_class = line.to_string(),
                    }
                    continue;
                }

                if line.starts_with("\tat ") {
                    stage = Stage::Stack;
                    trace.stack.push(line.trim().to_string());
                } else {
                    trace.exception_message.push('\n');
                    trace.exception_message.push_str(line);
                }
            }
            Stage::Stack => {
                if line.trim().is_empty() {
                    continue;
                }
                if starts_additional(line) {
                    stage = Stage::Additional;
                    trace.additional.push(line.to_string());
                    continue;
                }
                if !line.starts_with('\t') {
                    return Err(ErrorKind::malformed_trace(format!(
                        "stack line without a tab: {:?}",
                        line
                    )));
                }
                trace.stack.push(line.trim().to_string());
            }
            Stage::Additional => {
                if line.trim().is_empty() {
                    continue;
                }
                if !starts_additional(line) && !line.starts_with('\t') {
                    return Err(ErrorKind::malformed_trace(format!(
                        "additional line without a tab: {:?}",
                        line
                    )));
                }
                trace.additional.push(line.to_string());
            }
        }
    }

    trace.exception_class = trace.exception_class.trim().to_string();
    trace.exception_message = trace.exception_message.trim().to_string();
    Ok(trace)
}

fn java_exception_schema() -> Value {
    json!({
        "type": "object",
        "required": ["exception"],
        "properties": {
            "exception": {
                "type": "object",
                "required": ["values"],
                "properties": {
                    "values": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["stacktrace"],
                            "properties": {
                                "stacktrace": {
                                    "type": "object",
                                    "required": ["frames", "type", "module"],
                                    "properties": {
                                        "frames": {
                                            "type": "array",
                                            "items": {
                                                "type": "object",
                                                "required": ["module", "function", "in_app", "lineno"],
                                                "properties": {
                                                    "module": {"type": "string"},
                                                    "function": {"type": "string"},
                                                    "in_app": {"type": "boolean"},
                                                    "lineno": {"type": "integer"},
                                                    "filename": {"type": "string"}
                                                }
                                            }
                                        },
                                        "type": {"type": "string"},
                                        "module": {"type": "string"},
                                        "value": {"type": "string"}
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

static JAVA_EXCEPTION_VALIDATOR: LazyLock<JSONSchema> = LazyLock::new(|| {
    let schema = java_exception_schema();
    JSONSchema::compile(&schema).expect("JavaException schema is valid")
});

/// Check a `JavaException` annotation against its expected structure
pub fn validate_java_exception(data: &Value) -> Result<()> {
    if let Err(errors) = JAVA_EXCEPTION_VALIDATOR.validate(data) {
        let detail = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ErrorKind::malformed_exception(detail));
    }
    Ok(())
}

/// Copy of a `JavaException` annotation with exception values redacted
///
/// Only values that are present are replaced; everything else is left as is,
/// including structure that would not validate.
pub fn sanitize_java_exception(data: &Value) -> Value {
    let mut sanitized = data.clone();
    let values = sanitized
        .get_mut("exception")
        .and_then(|e| e.get_mut("values"))
        .and_then(Value::as_array_mut);

    for value in values.into_iter().flatten() {
        if let Some(stacktrace) = value.get_mut("stacktrace").and_then(Value::as_object_mut) {
            if stacktrace.contains_key("value") {
                stacktrace.insert("value".to_string(), Value::from("REDACTED"));
            }
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXC: &str = "Exception: msg\n\
                       \tat org.File.function(File.java:100)\n\
                       \tat org.File.function2(File.java:200)\n";

    #[test]
    fn test_parse_basic() {
        let trace = parse_java_stack_trace(EXC).unwrap();
        assert_eq!(trace.exception_class, "Exception");
        assert_eq!(trace.exception_message, "msg");
        assert_eq!(
            trace.stack,
            vec![
                "at org.File.function(File.java:100)",
                "at org.File.function2(File.java:200)"
            ]
        );
        assert!(trace.additional.is_empty());
    }

    #[test]
    fn test_public_string_drops_message() {
        let trace = parse_java_stack_trace(EXC).unwrap();
        assert_eq!(
            trace.to_public_string(),
            "Exception\n\tat org.File.function(File.java:100)\n\tat org.File.function2(File.java:200)"
        );
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            parse_java_stack_trace(None::<&str>),
            Err(ErrorKind::MalformedJavaStackTrace { .. })
        ));
        assert!(parse_java_stack_trace("").is_err());
        assert!(parse_java_stack_trace("  \n  ").is_err());
        assert!(parse_java_stack_trace(
            "Exception: msg\n\tat org.File.function(File.java:100)\nbadline"
        )
        .is_err());
    }

    #[test]
    fn test_sanitize_without_value() {
        let data = json!({"exception": {"values": [{"stacktrace": {"frames": [], "type": "", "module": ""}}]}});
        assert_eq!(sanitize_java_exception(&data), data);
        assert_eq!(sanitize_java_exception(&json!({})), json!({}));
    }

    #[test]
    fn test_validate_minimal() {
        assert!(validate_java_exception(&json!({"exception": {"values": []}})).is_ok());
        assert!(matches!(
            validate_java_exception(&json!({})),
            Err(ErrorKind::MalformedJavaException { .. })
        ));
    }
}
