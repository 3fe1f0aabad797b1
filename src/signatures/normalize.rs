// SPDX-License-Identifier: PMPL-1.0-or-later

//! Text helpers for turning raw symbol names into stable frame signatures

/// Collapse every top-level `open ... close` group into `replacement`
///
/// Nested groups collapse together with their parent. A group is kept
/// verbatim when the text right before it ends with one of `exceptions`, or
/// when the group itself contains one. A group that never closes collapses to
/// the end of the string.
pub fn collapse(
    function: &str,
    open: char,
    close: char,
    replacement: &str,
    exceptions: &[&str],
) -> String {
    let mut out = String::with_capacity(function.len());
    let mut group = String::new();
    let mut depth = 0usize;

    for (i, c) in function.char_indices() {
        if depth == 0 {
            let guarded = exceptions.iter().any(|e| function[..i].ends_with(e));
            if c == open && !guarded {
                depth = 1;
                group.push(c);
            } else {
                out.push(c);
            }
            continue;
        }

        group.push(c);
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                flush_group(&mut out, &group, replacement, exceptions);
                group.clear();
            }
        }
    }

    if depth > 0 {
        flush_group(&mut out, &group, replacement, exceptions);
    }

    out
}

fn flush_group(out: &mut String, group: &str, replacement: &str, exceptions: &[&str]) {
    if exceptions.iter().any(|e| group.contains(e)) {
        out.push_str(group);
    } else {
        out.push_str(replacement);
    }
}

/// Drop storage-class keywords and return types in front of a symbol
///
/// The symbol is split on spaces that sit outside any `()`, `<>`, `[]`, `{}`
/// or `` `...' `` pair and only the last piece is kept. A trailing argument
/// list or `[clone ...]` label that was separated by a space is glued back on.
/// An `operator` keyword stays joined to the operator that follows it, so
/// `void* operator new(unsigned long)` keeps `operator new(unsigned long)`.
pub fn drop_prefix_and_return_type(function: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in function.chars() {
        match c {
            '(' | '<' | '[' | '{' | '`' => depth += 1,
            ')' | '>' | ']' | '}' | '\'' => depth = depth.saturating_sub(1),
            ' ' if depth == 0 => {
                if is_operator_keyword(&current) {
                    current.push(c);
                } else if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    while tokens.len() > 1 {
        let glue = tokens
            .last()
            .map(|t| t.starts_with('(') || t.starts_with("[clone"))
            .unwrap_or(false);
        if !glue {
            break;
        }
        let last = tokens.pop().unwrap_or_default();
        let before = tokens.pop().unwrap_or_default();
        tokens.push(format!("{} {}", before, last));
    }

    tokens.pop().unwrap_or_default()
}

fn is_operator_keyword(token: &str) -> bool {
    token == "operator" || token.ends_with("::operator")
}

/// Split text into lines on `\n`, `\r\n` or a bare `\r`
///
/// Like `str::lines`, a trailing line ending does not produce an empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\n', '\r']) {
            Some(i) => {
                lines.push(&rest[..i]);
                let ending = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[i + ending..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Pull the path out of a VCS-annotated or drive-letter source file name
///
/// `hg:repo:path:rev` and `git:repo:path:rev` yield `path`, `c:\dir\file`
/// yields `\dir\file`, anything else comes back unchanged.
pub fn parse_source_file(source_file: &str) -> &str {
    let parts: Vec<&str> = source_file.split(':').collect();
    match parts.as_slice() {
        [_, _, path, _] => *path,
        [drive, path] if drive.chars().count() == 1 => *path,
        _ => source_file,
    }
}

/// Keep printable ASCII only
pub fn drop_bad_characters(text: &str) -> String {
    text.chars().filter(|c| (' '..='~').contains(c)).collect()
}

/// Remove a space sitting right before `*`, `&` or `,`
pub fn fixup_space(function: &str) -> String {
    let chars: Vec<char> = function.chars().collect();
    let mut out = String::with_capacity(function.len());
    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();
        if c == ' ' && matches!(next, Some('*') | Some('&') | Some(',')) {
            continue;
        }
        out.push(c);
    }
    out
}

/// Make sure every comma is followed by a space
pub fn fixup_comma(function: &str) -> String {
    let mut out = String::with_capacity(function.len());
    let mut chars = function.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == ',' && chars.peek() != Some(&' ') {
            out.push(' ');
        }
    }
    out
}

/// Strip a trailing `::h<16 hex digits>` symbol hash
pub fn strip_rust_hash(function: &str) -> &str {
    if let Some(pos) = function.rfind("::h") {
        let hash = &function[pos + 3..];
        if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return &function[..pos];
        }
    }
    function
}

/// Join the non-empty pieces with `delimiter`
pub fn join_ignore_empty(delimiter: &str, pieces: &[&str]) -> String {
    pieces
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// First `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// Rust 1.34 emitted these panic symbols without their module path
const MISSING_MODULE_SYMBOLS: &[(&str, &str, &str)] = &[
    ("src/liballoc/raw_vec.rs", "capacity_overflow", "alloc::raw_vec::capacity_overflow"),
    ("src/libcore/option.rs", "expect_failed", "core::option::expect_failed"),
    ("src/libcore/panicking.rs", "panic_bounds_check", "core::panicking::panic_bounds_check"),
    ("src/libcore/panicking.rs", "panic_fmt", "core::panicking::panic_fmt"),
    ("src/libcore/panicking.rs", "panic", "core::panicking::panic"),
    ("src/libcore/slice/mod.rs", "slice_index_order_fail", "core::slice::slice_index_order_fail"),
    ("src/libstd/panicking.rs", "begin_panic_fmt", "std::panicking::begin_panic_fmt"),
    ("src/libstd/panicking.rs", "continue_panic_fmt", "std::panicking::continue_panic_fmt"),
    ("src/libstd/panicking.rs", "rust_panic_with_hook", "std::panicking::rust_panic_with_hook"),
];

/// Fully qualified name for a Rust panic symbol that lost its module
pub fn fix_missing_module(file: &str, function: &str) -> Option<&'static str> {
    let path = parse_source_file(file);
    MISSING_MODULE_SYMBOLS
        .iter()
        .find(|(f, func, _)| *f == path && *func == function)
        .map(|(_, _, fixed)| *fixed)
}
