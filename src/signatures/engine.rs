// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signature generation engine: runs the rule pipeline over one crash

use crate::config::ToolConfig;
use crate::error::Result;
use crate::signatures::rules::{Rule, RuleSet};
use crate::types::{CrashData, SignatureResult};
use std::sync::Arc;

const GENERATOR_NAME: &str = "SignatureGenerator";
const NO_SIGNATURE: &str = "EMPTY: no signature could be generated";

/// Applies every rule once, in order, to a fresh [`SignatureResult`]
///
/// The generator holds no per-crash state, so one instance can serve many
/// threads at once.
pub struct SignatureGenerator {
    rules: RuleSet,
}

impl SignatureGenerator {
    pub fn new(config: Arc<ToolConfig>) -> Self {
        Self {
            rules: RuleSet::new(config),
        }
    }

    /// Generator over the siglists compiled into the binary
    pub fn with_builtin_siglists() -> Result<Self> {
        Ok(Self::new(Arc::new(ToolConfig::builtin()?)))
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            rules: RuleSet::from_rules(rules),
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn generate(&self, crash: &CrashData) -> SignatureResult {
        let mut result = SignatureResult::new();

        for rule in self.rules.iter() {
            if !rule.predicate(crash, &result) {
                continue;
            }
            tracing::debug!(rule = rule.name(), "running rule");
            if !rule.action(crash, &mut result) {
                tracing::debug!(rule = rule.name(), "rule did not complete");
            }
        }

        if result.signature.trim().is_empty() {
            result.info(GENERATOR_NAME, "no signature could be generated");
            result.set_signature(GENERATOR_NAME, NO_SIGNATURE);
        }

        result
    }
}
