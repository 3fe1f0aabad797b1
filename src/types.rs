// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions for siggen
//!
//! Crash data arrives as loosely-typed JSON from the stackwalker, so
//! [`CrashData`] keeps the raw mapping and exposes forgiving accessors instead
//! of a strict schema. A wrong type in one field must never stop signature
//! generation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Read-only crash report fields consumed by the signature pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrashData {
    fields: Map<String, Value>,
}

impl CrashData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build crash data from any JSON value; non-objects yield empty crash data
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    /// Builder-style setter, mostly useful in tests and tooling
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether a field holds a "truthy" value: present, not null, not false,
    /// not zero and not an empty string/array/object
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).map(is_truthy).unwrap_or(false)
    }

    /// A field rendered as text when it is a non-empty string or a number
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Index of the crashing thread; anything unusable falls back to 0
    pub fn crashing_thread(&self) -> usize {
        self.get("crashing_thread")
            .and_then(as_integer)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }

    /// Hang marker: -1 for a plugin hang, 1 for a chrome hang, 0 otherwise
    pub fn hang_type(&self) -> i64 {
        self.get("hang_type").and_then(as_integer).unwrap_or(0)
    }

    /// Frames of the thread at `index`
    ///
    /// Reads `threads[index].frames`, and falls back to the legacy `thread`
    /// key which holds bare frame lists. Returns `None` when no such thread
    /// exists.
    pub fn thread(&self, index: usize) -> Option<Thread> {
        let threads = self
            .get("threads")
            .and_then(Value::as_array)
            .or_else(|| self.get("thread").and_then(Value::as_array))?;
        threads.get(index).map(Thread::from_value)
    }
}

impl From<Value> for CrashData {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// Whether a JSON value counts as set: not null, false, zero or empty
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Integer view of a JSON number or numeric string
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// One thread of a crash: an ordered sequence of frames, innermost first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Thread {
    pub frames: Vec<Frame>,
}

impl Thread {
    /// Accepts `{"frames": [...]}` objects and bare frame arrays
    pub fn from_value(value: &Value) -> Self {
        let frames = match value {
            Value::Object(obj) => obj.get("frames").and_then(Value::as_array),
            Value::Array(arr) => Some(arr),
            _ => None,
        };
        Self {
            frames: frames
                .map(|frames| frames.iter().map(Frame::from_value).collect())
                .unwrap_or_default(),
        }
    }
}

/// A single resolved stack frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<String>,
    pub module: Option<String>,
    pub module_offset: Option<String>,
    pub offset: Option<String>,
    /// How the stackwalker found this frame; not used for signatures
    pub trust: Option<String>,
}

impl Frame {
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| -> Option<String> {
            match value.get(key)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };
        Self {
            function: field("function"),
            file: field("file"),
            line: field("line"),
            module: field("module"),
            module_offset: field("module_offset"),
            offset: field("offset"),
            trust: field("trust"),
        }
    }

    pub fn with_function(function: &str) -> Self {
        Self {
            function: Some(function.to_string()),
            ..Self::default()
        }
    }
}

/// Mutable accumulator threaded through one run of the rule pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureResult {
    pub signature: String,
    /// Diagnostics stored alongside the crash, each `"<RuleName>: <message>"`
    pub notes: Vec<String>,
    pub debug_log: Vec<String>,
    /// Additional outputs such as `proto_signature`
    pub extra: BTreeMap<String, String>,
}

impl SignatureResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the signature, recording the change in the debug log
    pub fn set_signature(&mut self, rule: &str, signature: impl Into<String>) {
        let signature = signature.into();
        tracing::trace!(rule, old = %self.signature, new = %signature, "signature changed");
        self.debug(rule, format!("change: \"{}\" -> \"{}\"", self.signature, signature));
        self.signature = signature;
    }

    pub fn info(&mut self, rule: &str, message: impl AsRef<str>) {
        self.notes.push(format!("{}: {}", rule, message.as_ref()));
    }

    pub fn debug(&mut self, rule: &str, message: impl AsRef<str>) {
        self.debug_log.push(format!("{}: {}", rule, message.as_ref()));
    }

    pub fn proto_signature(&self) -> Option<&str> {
        self.extra.get("proto_signature").map(String::as_str)
    }
}
