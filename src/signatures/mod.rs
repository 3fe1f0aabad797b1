// SPDX-License-Identifier: PMPL-1.0-or-later

//! Crash signature generation
//!
//! Frame normalization, the native and Java signature tools, and the rule
//! pipeline that refines their output.

pub mod c_tool;
pub mod engine;
pub mod java_tool;
pub mod normalize;
pub mod rules;

use crate::error::Result;
use crate::types::{CrashData, SignatureResult};
use std::sync::OnceLock;

pub use c_tool::CSignatureTool;
pub use engine::SignatureGenerator;
pub use java_tool::JavaSignatureTool;
pub use rules::{Rule, RuleSet};

/// What a signature tool hands back to the rule that called it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub signature: String,
    pub notes: Vec<String>,
    pub debug_notes: Vec<String>,
    pub proto_signature: Option<String>,
}

static BUILTIN_GENERATOR: OnceLock<SignatureGenerator> = OnceLock::new();

/// The shared generator over the built-in siglists, compiled on first use
pub fn builtin_generator() -> Result<&'static SignatureGenerator> {
    if let Some(generator) = BUILTIN_GENERATOR.get() {
        return Ok(generator);
    }
    let generator = SignatureGenerator::with_builtin_siglists()?;
    Ok(BUILTIN_GENERATOR.get_or_init(|| generator))
}

/// Generate a signature with the built-in siglists
pub fn generate_signature(crash: &CrashData) -> Result<SignatureResult> {
    Ok(builtin_generator()?.generate(crash))
}
