// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signatures for native (C, C++ and Rust) stacks
//!
//! Frames are first normalized into short, build-independent strings. The
//! signature is then picked from that list using the siglists: irrelevant
//! frames are skipped, prefix frames pull in their caller, and sentinels move
//! the starting point.

use crate::config::ToolConfig;
use crate::signatures::normalize::{
    collapse, drop_prefix_and_return_type, fix_missing_module, fixup_comma, fixup_space,
    parse_source_file, strip_rust_hash, truncate_chars,
};
use crate::signatures::ToolOutput;
use crate::types::Frame;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static LAMBDA_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$_\d+").expect("lambda pattern is valid"));

const CPP_TEMPLATE_EXCEPTIONS: &[&str] = &["name omitted", "IPC::ParamTraits", " in "];
const CPP_ARGUMENT_EXCEPTIONS: &[&str] = &["anonymous namespace", "operator"];
const RUST_TEMPLATE_EXCEPTIONS: &[&str] = &[" as "];

pub const DEFAULT_DELIMITER: &str = " | ";

pub struct CSignatureTool {
    config: Arc<ToolConfig>,
}

impl CSignatureTool {
    pub fn new(config: Arc<ToolConfig>) -> Self {
        Self { config }
    }

    fn with_line_number(&self, function: String, line: Option<&str>) -> String {
        match line {
            Some(line) if self.config.line_numbers().is_match(&function) => {
                format!("{}:{}", function, line)
            }
            _ => function,
        }
    }

    /// Normalize a C or C++ symbol
    pub fn normalize_cpp_function(&self, function: &str, line: Option<&str>) -> String {
        let mut function = strip_qualifiers(function);

        // Operator overloads have no return type to drop and confuse the tokenizer
        if !function.contains("::operator") {
            function = drop_prefix_and_return_type(&function);
        }

        function = function.replace("`anonymous namespace'", "(anonymous namespace)");
        function = LAMBDA_NUMBER.replace_all(&function, "$$").into_owned();

        function = collapse(&function, '<', '>', "<T>", CPP_TEMPLATE_EXCEPTIONS);
        function = collapse(&function, '(', ')', "", CPP_ARGUMENT_EXCEPTIONS);

        // PGO cold block labels, e.g. "[clone .cold.222]"
        if function.contains("clone .cold") {
            function = collapse(&function, '[', ']', "", &[]).trim().to_string();
        }

        let function = self.with_line_number(function, line);
        fixup_comma(&fixup_space(&function))
    }

    /// Normalize a Rust symbol
    pub fn normalize_rust_function(&self, function: &str, line: Option<&str>) -> String {
        let function = drop_prefix_and_return_type(function);
        let function = collapse(&function, '<', '>', "<T>", RUST_TEMPLATE_EXCEPTIONS);
        let function = collapse(&function, '(', ')', "", &[]);
        let function = self.with_line_number(function, line);
        let function = fixup_comma(&fixup_space(&function));
        strip_rust_hash(&function).to_string()
    }

    /// Signature fragment for a single frame
    ///
    /// Preference order: function name, `file#line`, `module@offset`,
    /// `@offset`. A frame with none of these yields an empty string.
    pub fn normalize_frame(&self, frame: &Frame) -> String {
        let file = frame.file.as_deref();
        let line = frame.line.as_deref();

        if let Some(function) = frame.function.as_deref() {
            let is_rust = file
                .map(|f| parse_source_file(f).ends_with(".rs"))
                .unwrap_or(false);
            return if is_rust {
                self.normalize_rust_function(function, line)
            } else {
                self.normalize_cpp_function(function, line)
            };
        }

        if let (Some(file), Some(line)) = (file, line) {
            let trimmed = file.trim_end_matches(|c| c == '/' || c == '\\');
            let separator = if trimmed.contains('\\') { '\\' } else { '/' };
            let basename = trimmed.rsplit(separator).next().unwrap_or(trimmed);
            return format!("{}#{}", basename, line);
        }

        let module = frame.module.as_deref();
        let module_offset = frame.module_offset.as_deref();
        let offset = frame.offset.as_deref();

        if module.is_none() && module_offset.is_none() {
            return offset.map(|o| format!("@{}", o)).unwrap_or_default();
        }

        match module_offset.or(offset) {
            Some(off) => format!("{}@{}", module.unwrap_or("").to_lowercase(), off),
            None => String::new(),
        }
    }

    /// Normalized signatures for the first `max_frames` frames of a thread
    pub fn frame_signatures(&self, frames: &[Frame]) -> Vec<String> {
        frames
            .iter()
            .take(self.config.limits().max_frames)
            .map(|frame| {
                let repaired = match (frame.file.as_deref(), frame.function.as_deref()) {
                    (Some(file), Some(function)) => fix_missing_module(file, function),
                    _ => None,
                };
                match repaired {
                    Some(function) => self.normalize_frame(&Frame {
                        function: Some(function.to_string()),
                        ..frame.clone()
                    }),
                    None => self.normalize_frame(frame),
                }
            })
            .collect()
    }

    fn find_sentinel(&self, frames: &[String], debug_notes: &mut Vec<String>) -> Option<usize> {
        let index = self
            .config
            .sentinels()
            .iter()
            .filter_map(|sentinel| {
                let index = frames.iter().position(|f| f == sentinel.frame())?;
                sentinel.applies(&frames[index..]).then_some(index)
            })
            .min()?;

        debug_notes.push(format!(
            "sentinel; starting at \"{}\" index {}",
            frames[index], index
        ));
        Some(index)
    }

    /// Build a signature from normalized frame signatures
    pub fn generate(&self, frames: &[String], hang_type: i64, delimiter: &str) -> ToolOutput {
        let mut output = ToolOutput::default();

        if frames.is_empty() {
            output.notes.push(
                "CSignatureTool: No signature could be created because we do not know which \
                 thread crashed"
                    .to_string(),
            );
            output.signature = "EMPTY: no crashing thread identified".to_string();
            return output;
        }

        output.proto_signature = Some(frames.join(delimiter));

        let start = self.find_sentinel(frames, &mut output.debug_notes).unwrap_or(0);
        let candidates = &frames[start..];

        let mut selected: Vec<String> = Vec::new();
        for frame in candidates {
            if self.config.irrelevant().is_match(frame) {
                output
                    .debug_notes
                    .push(format!("irrelevant; ignoring: \"{}\"", frame));
                continue;
            }

            // Driver modules lose their offset, merge with a repeat of
            // themselves and never end the signature
            if self.config.trim_dll().is_match(frame) {
                let trimmed = frame.split('@').next().unwrap_or(frame).to_string();
                if selected.last() != Some(&trimmed) {
                    output
                        .debug_notes
                        .push(format!("trim dll; continue iterating: \"{}\"", trimmed));
                    selected.push(trimmed);
                }
                continue;
            }

            selected.push(frame.clone());

            if !self.config.prefix().is_match(frame) {
                output
                    .debug_notes
                    .push(format!("not a prefix; stop: \"{}\"", frame));
                break;
            }
            output
                .debug_notes
                .push(format!("prefix; continue iterating: \"{}\"", frame));
        }

        if selected.is_empty() {
            output.notes.push(
                "CSignatureTool: No proper signature could be created because no good data \
                 for the crashing thread was found"
                    .to_string(),
            );
            selected.push(
                candidates
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "EMPTY: no frame data available".to_string()),
            );
        }

        let max_fragment = self.config.limits().frame_fragment;
        let mut parts: Vec<&str> = selected
            .iter()
            .map(|s| truncate_chars(s, max_fragment))
            .collect();

        if let Some(prefix) = hang_prefix(hang_type) {
            output
                .debug_notes
                .push(format!("hang_type {}: prepending {}", hang_type, prefix));
            parts.insert(0, prefix);
        }

        output.signature = parts.join(delimiter);
        output
    }
}

fn hang_prefix(hang_type: i64) -> Option<&'static str> {
    match hang_type {
        -1 => Some("hang"),
        1 => Some("chromehang"),
        _ => None,
    }
}

/// Drop trailing member-function qualifiers
///
/// `const` goes everywhere; `const&`, `&&` and `&` stay on operator
/// overloads, where they are part of the operator name.
fn strip_qualifiers(function: &str) -> String {
    let is_operator = function.contains("operator");
    let mut function = function.to_string();

    for qualifier in ["const", "const&", "&&", "&"] {
        let Some(rest) = function.strip_suffix(qualifier) else {
            continue;
        };
        let strip = if qualifier == "const" {
            rest.ends_with(' ') || rest.ends_with(')')
        } else {
            !is_operator
        };
        if strip {
            function = rest.trim().to_string();
        }
    }

    function
}
