// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signature list configuration
//!
//! A [`ToolConfig`] holds the compiled frame pattern lists, the signature
//! sentinels and the numeric limits used by the signature tools. It is built
//! once, then shared read-only (usually behind an `Arc`) by every generator.

use crate::error::{ErrorKind, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const BUILTIN_SIGLISTS: &str = include_str!("../siglists/default.yaml");

/// Tunable thresholds for signature generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureLimits {
    /// Longest fragment kept from a single frame
    pub frame_fragment: usize,
    pub abort_message: usize,
    pub ipc_channel_error: usize,
    pub signature_max: usize,
    /// Java signatures longer than this lose their exception description
    pub java_description: usize,
    /// OOM allocations below this many bytes are "small"
    pub oom_small_threshold: u64,
    pub max_frames: usize,
}

impl Default for SignatureLimits {
    fn default() -> Self {
        Self {
            frame_fragment: 70,
            abort_message: 80,
            ipc_channel_error: 100,
            signature_max: 255,
            java_description: 255,
            oom_small_threshold: 1_000_000,
            max_frames: 40,
        }
    }
}

/// A list of frame patterns compiled into one start-anchored alternation
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<String>,
    matcher: Option<Regex>,
}

impl PatternList {
    fn compile(list: &'static str, patterns: Vec<String>) -> Result<Self> {
        for pattern in &patterns {
            Regex::new(pattern).map_err(|source| ErrorKind::InvalidPattern {
                list,
                pattern: pattern.clone(),
                source,
            })?;
        }

        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let joined = patterns
            .iter()
            .map(|p| format!("(?:{})", p))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!("^(?:{})", joined)).map_err(|source| {
            ErrorKind::InvalidPattern {
                list,
                pattern: joined.clone(),
                source,
            }
        })?;

        Ok(Self {
            patterns,
            matcher: Some(matcher),
        })
    }

    /// True when some pattern matches at the start of `frame`
    pub fn is_match(&self, frame: &str) -> bool {
        self.matcher
            .as_ref()
            .map(|m| m.is_match(frame))
            .unwrap_or(false)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Predicate deciding whether a conditional sentinel applies, given the frame
/// list starting at the sentinel
pub type SentinelPredicate = Arc<dyn Fn(&[String]) -> bool + Send + Sync>;

/// A frame signature that, when present, becomes the start of the signature
#[derive(Clone)]
pub enum Sentinel {
    Plain(String),
    Conditional(String, SentinelPredicate),
}

impl Sentinel {
    /// A conditional sentinel that only applies when `required` also appears
    /// in the remaining frames
    pub fn requiring(frame: impl Into<String>, required: impl Into<String>) -> Self {
        let required = required.into();
        Sentinel::Conditional(
            frame.into(),
            Arc::new(move |frames: &[String]| frames.iter().any(|f| *f == required)),
        )
    }

    pub fn frame(&self) -> &str {
        match self {
            Sentinel::Plain(frame) | Sentinel::Conditional(frame, _) => frame,
        }
    }

    pub fn applies(&self, remaining: &[String]) -> bool {
        match self {
            Sentinel::Plain(_) => true,
            Sentinel::Conditional(_, predicate) => predicate(remaining),
        }
    }
}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentinel::Plain(frame) => f.debug_tuple("Plain").field(frame).finish(),
            Sentinel::Conditional(frame, _) => f
                .debug_tuple("Conditional")
                .field(frame)
                .field(&"<predicate>")
                .finish(),
        }
    }
}

impl From<&str> for Sentinel {
    fn from(frame: &str) -> Self {
        Sentinel::Plain(frame.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SentinelEntry {
    Plain(String),
    Conditional { frame: String, requires: String },
}

impl From<SentinelEntry> for Sentinel {
    fn from(entry: SentinelEntry) -> Self {
        match entry {
            SentinelEntry::Plain(frame) => Sentinel::Plain(frame),
            SentinelEntry::Conditional { frame, requires } => Sentinel::requiring(frame, requires),
        }
    }
}

/// On-disk layout of a siglists YAML file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SiglistFile {
    irrelevant_signature_re: Vec<String>,
    prefix_signature_re: Vec<String>,
    signatures_with_line_numbers_re: Vec<String>,
    trim_dll_signature_re: Vec<String>,
    signature_sentinels: Vec<SentinelEntry>,
    limits: SignatureLimits,
}

/// Immutable, compiled signature configuration
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub(crate) irrelevant: PatternList,
    pub(crate) prefix: PatternList,
    pub(crate) line_numbers: PatternList,
    pub(crate) trim_dll: PatternList,
    pub(crate) sentinels: Vec<Sentinel>,
    pub(crate) limits: SignatureLimits,
}

impl ToolConfig {
    pub fn builder() -> ToolConfigBuilder {
        ToolConfigBuilder::new()
    }

    /// The siglists shipped with siggen
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_SIGLISTS)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: SiglistFile = serde_yaml::from_str(text)?;
        ToolConfigBuilder {
            irrelevant: file.irrelevant_signature_re,
            prefix: file.prefix_signature_re,
            line_numbers: file.signatures_with_line_numbers_re,
            trim_dll: file.trim_dll_signature_re,
            sentinels: file.signature_sentinels.into_iter().map(Sentinel::from).collect(),
            limits: file.limits,
        }
        .build()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn irrelevant(&self) -> &PatternList {
        &self.irrelevant
    }

    pub fn prefix(&self) -> &PatternList {
        &self.prefix
    }

    pub fn line_numbers(&self) -> &PatternList {
        &self.line_numbers
    }

    pub fn trim_dll(&self) -> &PatternList {
        &self.trim_dll
    }

    pub fn sentinels(&self) -> &[Sentinel] {
        &self.sentinels
    }

    pub fn limits(&self) -> &SignatureLimits {
        &self.limits
    }
}

/// Collects pattern lists and sentinels before compiling a [`ToolConfig`]
#[derive(Debug, Clone, Default)]
pub struct ToolConfigBuilder {
    irrelevant: Vec<String>,
    prefix: Vec<String>,
    line_numbers: Vec<String>,
    trim_dll: Vec<String>,
    sentinels: Vec<Sentinel>,
    limits: SignatureLimits,
}

fn owned<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    patterns.into_iter().map(Into::into).collect()
}

impl ToolConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn irrelevant<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.irrelevant = owned(patterns);
        self
    }

    pub fn prefix<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix = owned(patterns);
        self
    }

    pub fn line_numbers<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.line_numbers = owned(patterns);
        self
    }

    pub fn trim_dll<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trim_dll = owned(patterns);
        self
    }

    pub fn sentinel(mut self, sentinel: impl Into<Sentinel>) -> Self {
        self.sentinels.push(sentinel.into());
        self
    }

    pub fn limits(mut self, limits: SignatureLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Compile every pattern list; fails on the first invalid pattern
    pub fn build(self) -> Result<ToolConfig> {
        let config = ToolConfig {
            irrelevant: PatternList::compile("irrelevant_signature_re", self.irrelevant)?,
            prefix: PatternList::compile("prefix_signature_re", self.prefix)?,
            line_numbers: PatternList::compile(
                "signatures_with_line_numbers_re",
                self.line_numbers,
            )?,
            trim_dll: PatternList::compile("trim_dll_signature_re", self.trim_dll)?,
            sentinels: self.sentinels,
            limits: self.limits,
        };

        tracing::debug!(
            irrelevant = config.irrelevant.patterns().len(),
            prefix = config.prefix.patterns().len(),
            sentinels = config.sentinels.len(),
            "compiled signature lists"
        );

        Ok(config)
    }
}
