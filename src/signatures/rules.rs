// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signature rules
//!
//! Each rule looks at the crash data and the signature built so far, and may
//! replace or extend it. [`RuleSet`] holds them in the order they run.

use crate::config::ToolConfig;
use crate::signatures::c_tool::{CSignatureTool, DEFAULT_DELIMITER};
use crate::signatures::java_tool::{JavaSignatureTool, JAVA_DELIMITER};
use crate::signatures::normalize::{drop_bad_characters, truncate_chars};
use crate::signatures::ToolOutput;
use crate::types::{as_integer, is_truthy, CrashData, SignatureResult};
use serde_json::Value;
use std::sync::Arc;

/// A single step of the signature pipeline
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the rule applies to this crash
    fn predicate(&self, _crash: &CrashData, _result: &SignatureResult) -> bool {
        true
    }

    /// Apply the rule; returns whether it ran to completion
    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool;
}

/// Copy tool notes into the result under the rule's name
fn record_output(rule: &str, output: &ToolOutput, result: &mut SignatureResult) {
    for note in &output.notes {
        result.info(rule, note);
    }
    for note in &output.debug_notes {
        result.debug(rule, note);
    }
}

/// Native signature for the thread at `index`
fn native_signature(
    tool: &CSignatureTool,
    crash: &CrashData,
    index: usize,
    hang_type: i64,
) -> ToolOutput {
    let frames = crash
        .thread(index)
        .map(|thread| tool.frame_signatures(&thread.frames))
        .unwrap_or_default();
    tool.generate(&frames, hang_type, DEFAULT_DELIMITER)
}

/// Builds the initial signature from the Java trace or the crashing thread
pub struct SignatureGenerationRule {
    c_tool: CSignatureTool,
    java_tool: JavaSignatureTool,
}

impl SignatureGenerationRule {
    pub fn new(config: Arc<ToolConfig>) -> Self {
        Self {
            c_tool: CSignatureTool::new(config.clone()),
            java_tool: JavaSignatureTool::new(config),
        }
    }
}

impl Rule for SignatureGenerationRule {
    fn name(&self) -> &'static str {
        "SignatureGenerationRule"
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();

        if let Some(trace) = crash.get("java_stack_trace").filter(|v| is_truthy(v)) {
            result.debug(name, "using JavaSignatureTool");
            let output = self.java_tool.generate(trace, JAVA_DELIMITER);
            record_output(name, &output, result);
            result.set_signature(name, output.signature);
            return true;
        }

        result.debug(name, "using CSignatureTool");
        let hang_type = crash.hang_type();
        // A chrome hang is about the main thread, whatever crashed
        let index = if hang_type == 1 {
            0
        } else {
            crash.crashing_thread()
        };

        let output = native_signature(&self.c_tool, crash, index, hang_type);
        if let Some(proto) = &output.proto_signature {
            result
                .extra
                .insert("proto_signature".to_string(), proto.clone());
        }
        record_output(name, &output, result);
        if !output.signature.is_empty() {
            result.set_signature(name, output.signature);
        }
        true
    }
}

/// Appends the stackwalker status to empty signatures
pub struct StackwalkerErrorSignatureRule;

impl Rule for StackwalkerErrorSignatureRule {
    fn name(&self) -> &'static str {
        "StackwalkerErrorSignatureRule"
    }

    fn predicate(&self, crash: &CrashData, result: &SignatureResult) -> bool {
        result.signature.starts_with("EMPTY") && crash.is_set("mdsw_status_string")
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let status = crash.text("mdsw_status_string").unwrap_or_default();
        let signature = format!("{}; {}", result.signature, status);
        result.set_signature(self.name(), signature);
        true
    }
}

const OOM_FRAGMENTS: &[&str] = &[
    "NS_ABORT_OOM",
    "mozalloc_handle_oom",
    "CrashAtUnhandlableOOM",
    "AutoEnterOOMUnsafeRegion",
    "alloc::oom::oom",
];

/// Marks out-of-memory crashes with the allocation size class
pub struct OOMSignature {
    small_threshold: u64,
}

impl OOMSignature {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            small_threshold: config.limits().oom_small_threshold,
        }
    }

    fn allocation_size(crash: &CrashData) -> Option<i64> {
        let value = crash.get("oom_allocation_size")?;
        as_integer(value).or_else(|| {
            value
                .as_str()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|f| f.is_finite())
                .map(|f| f as i64)
        })
    }
}

impl Rule for OOMSignature {
    fn name(&self) -> &'static str {
        "OOMSignature"
    }

    fn predicate(&self, crash: &CrashData, result: &SignatureResult) -> bool {
        crash.is_set("oom_allocation_size")
            || OOM_FRAGMENTS.iter().any(|f| result.signature.contains(f))
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();
        let Some(size) = Self::allocation_size(crash) else {
            let signature = format!("OOM | unknown | {}", result.signature);
            result.set_signature(name, signature);
            return true;
        };

        let small = u64::try_from(size)
            .map(|size| size < self.small_threshold)
            .unwrap_or(true);
        if small {
            result.info(
                name,
                format!("Signature replaced with OOM | small, was: \"{}\"", result.signature),
            );
            result.set_signature(name, "OOM | small");
        } else {
            let signature = format!("OOM | large | {}", result.signature);
            result.set_signature(name, signature);
        }
        true
    }
}

/// Prepends the informative part of the abort message
pub struct AbortSignature {
    max_length: usize,
}

impl AbortSignature {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            max_length: config.limits().abort_message,
        }
    }

    /// The part of an abort message worth putting in a signature
    pub fn extract_message(&self, abort_message: &str) -> String {
        if abort_message.contains("###!!! ABORT: file ") {
            return String::new();
        }

        let mut message = abort_message;
        if let Some((_, rest)) = message.split_once("###!!! ABORT:") {
            message = rest;
        }
        if let Some((head, _)) = message.split_once(": file ") {
            message = head;
        }

        let mut message = message.to_string();
        // The parenthesized part is a localized font name
        if message.contains("unable to find a usable font") {
            if let (Some(open), Some(close)) = (message.find('('), message.rfind(')')) {
                if open < close {
                    message = format!("{}{}", &message[..open], &message[close + 1..]);
                }
            }
        }

        let message = drop_bad_characters(&message).trim().to_string();
        if message.chars().count() > self.max_length {
            let keep = self.max_length.saturating_sub(3);
            format!("{}...", truncate_chars(&message, keep))
        } else {
            message
        }
    }
}

impl Rule for AbortSignature {
    fn name(&self) -> &'static str {
        "AbortSignature"
    }

    fn predicate(&self, crash: &CrashData, _result: &SignatureResult) -> bool {
        crash.text("abort_message").is_some()
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let message = self.extract_message(&crash.text("abort_message").unwrap_or_default());
        let signature = [String::from("Abort"), message, result.signature.clone()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");
        result.set_signature(self.name(), signature);
        true
    }
}

/// Regenerates shutdown hang signatures from the main thread
pub struct SignatureRunWatchDog {
    c_tool: CSignatureTool,
}

impl SignatureRunWatchDog {
    pub fn new(config: Arc<ToolConfig>) -> Self {
        Self {
            c_tool: CSignatureTool::new(config),
        }
    }
}

impl Rule for SignatureRunWatchDog {
    fn name(&self) -> &'static str {
        "SignatureRunWatchDog"
    }

    fn predicate(&self, _crash: &CrashData, result: &SignatureResult) -> bool {
        result.signature.contains("RunWatchdog")
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();
        // Thread 0 is the one that got stuck; the crash itself is artificial
        let output = native_signature(&self.c_tool, crash, 0, crash.hang_type());
        if let Some(proto) = &output.proto_signature {
            result
                .extra
                .insert("proto_signature".to_string(), proto.clone());
        }
        result.info(
            name,
            format!(
                "Signature replaced with a shutdown hang signature, was: \"{}\"",
                result.signature
            ),
        );
        record_output(name, &output, result);
        result.set_signature(name, format!("shutdownhang | {}", output.signature));
        true
    }
}

/// Replaces the signature with the JIT crash category
pub struct SignatureJitCategory;

impl SignatureJitCategory {
    fn category(crash: &CrashData) -> Option<String> {
        crash.text("jit_category").or_else(|| {
            crash
                .get("classifications")
                .and_then(|c| c.pointer("/jit/category"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }
}

impl Rule for SignatureJitCategory {
    fn name(&self) -> &'static str {
        "SignatureJitCategory"
    }

    fn predicate(&self, crash: &CrashData, _result: &SignatureResult) -> bool {
        Self::category(crash).is_some()
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();
        let category = Self::category(crash).unwrap_or_default();
        result.info(
            name,
            format!(
                "Signature replaced with a JIT Crash Category, was: \"{}\"",
                result.signature
            ),
        );
        result.set_signature(name, format!("jit | {}", category));
        true
    }
}

/// Stomps on or prefixes the signature for IPC channel errors
pub struct SignatureIPCChannelError {
    max_length: usize,
}

impl SignatureIPCChannelError {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            max_length: config.limits().ipc_channel_error,
        }
    }
}

impl Rule for SignatureIPCChannelError {
    fn name(&self) -> &'static str {
        "SignatureIPCChannelError"
    }

    fn predicate(&self, crash: &CrashData, _result: &SignatureResult) -> bool {
        crash.text("ipc_channel_error").is_some()
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();
        let error = crash.text("ipc_channel_error").unwrap_or_default();
        let process = match crash.get("additional_minidumps").and_then(Value::as_str) {
            Some("browser") => "browser",
            _ => "content",
        };
        let mut signature = format!(
            "IPCError-{} | {}",
            process,
            truncate_chars(&error, self.max_length)
        );

        if error == "ShutDownKill" {
            result.info(name, "IPC Channel Error prepended");
            signature = format!("{} | {}", signature, result.signature);
        } else {
            result.info(
                name,
                format!(
                    "Signature replaced with an IPC Channel Error, was: \"{}\"",
                    result.signature
                ),
            );
        }

        result.set_signature(name, signature);
        true
    }
}

/// Appends the IPC message name
pub struct SignatureIPCMessageName;

impl Rule for SignatureIPCMessageName {
    fn name(&self) -> &'static str {
        "SignatureIPCMessageName"
    }

    fn predicate(&self, crash: &CrashData, _result: &SignatureResult) -> bool {
        crash.text("ipc_message_name").is_some()
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let message_name = crash.text("ipc_message_name").unwrap_or_default();
        let signature = format!("{} | IPC_Message_Name={}", result.signature, message_name);
        result.set_signature(self.name(), signature);
        true
    }
}

/// Replaces the signature with the async shutdown phase and its blockers
pub struct SignatureShutdownTimeout;

impl SignatureShutdownTimeout {
    /// `(phase, conditions)` from the annotation, or why it could not be read
    fn parse(value: &Value) -> std::result::Result<(String, String), String> {
        let data = match value {
            Value::String(text) => {
                serde_json::from_str::<Value>(text).map_err(|e| e.to_string())?
            }
            other => other.clone(),
        };

        let phase = data
            .get("phase")
            .and_then(Value::as_str)
            .ok_or_else(|| "'phase'".to_string())?
            .to_string();
        let conditions = data
            .get("conditions")
            .and_then(Value::as_array)
            .ok_or_else(|| "'conditions'".to_string())?;

        let mut names = conditions
            .iter()
            .map(|condition| match condition {
                Value::String(name) => Ok(name.clone()),
                Value::Object(obj) => obj
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| "'name'".to_string()),
                other => Err(format!("unexpected condition {}", other)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if names.is_empty() {
            return Ok((phase, "(none)".to_string()));
        }
        names.sort();
        Ok((phase, names.join(",")))
    }
}

impl Rule for SignatureShutdownTimeout {
    fn name(&self) -> &'static str {
        "SignatureShutdownTimeout"
    }

    fn predicate(&self, crash: &CrashData, _result: &SignatureResult) -> bool {
        crash.is_set("async_shutdown_timeout")
    }

    fn action(&self, crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();
        let parsed = match crash.get("async_shutdown_timeout") {
            Some(value) => Self::parse(value),
            None => Err("'async_shutdown_timeout'".to_string()),
        };

        let signature = match parsed {
            Ok((phase, conditions)) => format!("AsyncShutdownTimeout | {} | {}", phase, conditions),
            Err(err) => {
                tracing::debug!(error = %err, "unreadable async shutdown annotation");
                result.info(name, format!("Error parsing AsyncShutdownTimeout: {}", err));
                "AsyncShutdownTimeout | UNKNOWN".to_string()
            }
        };

        result.info(
            name,
            format!(
                "Signature replaced with a Shutdown Timeout signature, was: \"{}\"",
                result.signature
            ),
        );
        result.set_signature(name, signature);
        true
    }
}

const BUILD_ID_ASSERTION: &str = "MOZ_RELEASE_ASSERT(parentBuildID == childBuildID)";

/// Buckets parent/child build id mismatches together
pub struct SignatureParentIDNotEqualsChildID;

impl Rule for SignatureParentIDNotEqualsChildID {
    fn name(&self) -> &'static str {
        "SignatureParentIDNotEqualsChildID"
    }

    fn predicate(&self, crash: &CrashData, _result: &SignatureResult) -> bool {
        crash
            .text("moz_crash_reason")
            .map(|reason| reason.contains(BUILD_ID_ASSERTION))
            .unwrap_or(false)
    }

    fn action(&self, _crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();
        result.info(
            name,
            format!(
                "Signature replaced with MOZ_RELEASE_ASSERT, was: \"{}\"",
                result.signature
            ),
        );
        result.set_signature(name, "parentBuildID != childBuildID");
        true
    }
}

/// Collapses whitespace runs into single spaces and trims the ends
pub struct SigFixWhitespace;

impl Rule for SigFixWhitespace {
    fn name(&self) -> &'static str {
        "SigFixWhitespace"
    }

    fn action(&self, _crash: &CrashData, result: &mut SignatureResult) -> bool {
        let fixed = result.signature.split_whitespace().collect::<Vec<_>>().join(" ");
        if fixed != result.signature {
            result.set_signature(self.name(), fixed);
        }
        true
    }
}

/// Caps the signature length, marking the cut with "..."
pub struct SigTruncate {
    max_length: usize,
}

impl SigTruncate {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            max_length: config.limits().signature_max,
        }
    }
}

impl Rule for SigTruncate {
    fn name(&self) -> &'static str {
        "SigTruncate"
    }

    fn predicate(&self, _crash: &CrashData, result: &SignatureResult) -> bool {
        result.signature.chars().count() > self.max_length
    }

    fn action(&self, _crash: &CrashData, result: &mut SignatureResult) -> bool {
        let name = self.name();
        let keep = self.max_length.saturating_sub(3);
        let signature = format!("{}...", truncate_chars(&result.signature, keep));
        result.set_signature(name, signature);
        result.info(name, "SigTrunc: signature truncated due to length");
        true
    }
}

/// The ordered rule pipeline
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new(config: Arc<ToolConfig>) -> Self {
        Self {
            rules: Self::build_rules(config),
        }
    }

    /// A pipeline with a custom rule list
    pub fn from_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    fn build_rules(config: Arc<ToolConfig>) -> Vec<Box<dyn Rule>> {
        vec![
            Box::new(SignatureGenerationRule::new(config.clone())),
            Box::new(StackwalkerErrorSignatureRule),
            Box::new(OOMSignature::new(&config)),
            Box::new(AbortSignature::new(&config)),
            Box::new(SignatureRunWatchDog::new(config.clone())),
            Box::new(SignatureJitCategory),
            Box::new(SignatureIPCChannelError::new(&config)),
            Box::new(SignatureIPCMessageName),
            Box::new(SignatureShutdownTimeout),
            Box::new(SignatureParentIDNotEqualsChildID),
            Box::new(SigFixWhitespace),
            Box::new(SigTruncate::new(&config)),
        ]
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Arc<ToolConfig> {
        Arc::new(ToolConfig::builtin().unwrap())
    }

    fn result_with(signature: &str) -> SignatureResult {
        SignatureResult {
            signature: signature.to_string(),
            ..SignatureResult::default()
        }
    }

    fn windows_frames() -> Value {
        json!({
            "frames": [
                {"function": "NtWaitForMultipleObjects", "module": "ntdll.dll"},
                {"function": "WaitForMultipleObjectsEx", "module": "KERNELBASE.dll"},
                {"function": "WaitForMultipleObjectsExImplementation", "module": "kernel32.dll"},
                {"function": "RealMsgWaitForMultipleObjectsEx", "module": "user32.dll"},
                {"function": "MsgWaitForMultipleObjects", "module": "user32.dll"},
                {"function": "F_1152915508__________________________________", "module": "NPSWF32.dll"},
                {"function": "F2166389______________________________________", "module": "NPSWF32.dll"}
            ]
        })
    }

    #[test]
    fn test_generation_from_native_stack() {
        let rule = SignatureGenerationRule::new(config());
        let crash = CrashData::from_value(json!({"os": "Windows NT", "threads": [windows_frames()]}));
        let mut result = SignatureResult::new();
        assert!(rule.action(&crash, &mut result));
        assert_eq!(
            result.signature,
            "MsgWaitForMultipleObjects | F_1152915508__________________________________"
        );
        assert_eq!(
            result.proto_signature(),
            Some(
                "NtWaitForMultipleObjects | WaitForMultipleObjectsEx | \
                 WaitForMultipleObjectsExImplementation | RealMsgWaitForMultipleObjectsEx | \
                 MsgWaitForMultipleObjects | F_1152915508__________________________________ | \
                 F2166389______________________________________"
            )
        );
        assert!(result.notes.is_empty());
    }

    #[test]
    fn test_generation_from_java_trace() {
        let rule = SignatureGenerationRule::new(config());
        let crash = CrashData::new().with(
            "java_stack_trace",
            format!(
                "   SomeJavaException: {}  \nat org.mozilla.lars.myInvention(larsFile.java)",
                "t".repeat(1000)
            ),
        );
        let mut result = SignatureResult::new();
        assert!(rule.action(&crash, &mut result));
        assert_eq!(
            result.signature,
            "SomeJavaException: at org.mozilla.lars.myInvention(larsFile.java)"
        );
        assert!(result.proto_signature().is_none());
        assert_eq!(
            result.notes,
            vec![
                "SignatureGenerationRule: JavaSignatureTool: dropped Java exception description \
                 due to length"
            ]
        );
    }

    #[test]
    fn test_generation_without_frames() {
        let rule = SignatureGenerationRule::new(config());
        let crash = CrashData::from_value(json!({"thread": [[]]}));
        let mut result = SignatureResult::new();
        assert!(rule.action(&crash, &mut result));
        assert_eq!(result.signature, "EMPTY: no crashing thread identified");
        assert!(result.proto_signature().is_none());
        assert_eq!(
            result.notes,
            vec![
                "SignatureGenerationRule: CSignatureTool: No signature could be created because \
                 we do not know which thread crashed"
            ]
        );
    }

    #[test]
    fn test_generation_lowercases_modules() {
        let rule = SignatureGenerationRule::new(config());
        let crash = CrashData::from_value(json!({
            "threads": [{"frames": [
                {"offset": "0x5e39bf21", "trust": "cfi"},
                {"offset": "0x5e39bf21", "trust": "cfi"},
                {"module": "USER2.dll", "module_offset": "0x20869", "offset": "0x77370869"}
            ]}]
        }));
        let mut result = SignatureResult::new();
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "user2.dll@0x20869");
        assert_eq!(
            result.proto_signature(),
            Some("@0x5e39bf21 | @0x5e39bf21 | user2.dll@0x20869")
        );
    }

    #[test]
    fn test_chrome_hang_uses_thread_zero() {
        let rule = SignatureGenerationRule::new(config());
        let crash = CrashData::from_value(json!({
            "hang_type": 1,
            "crashing_thread": 1,
            "threads": [
                {"frames": [{"function": "MainLoop"}]},
                {"frames": [{"function": "Worker"}]}
            ]
        }));
        let mut result = SignatureResult::new();
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "chromehang | MainLoop");
    }

    #[test]
    fn test_stackwalker_error() {
        let rule = StackwalkerErrorSignatureRule;
        let crash = CrashData::new().with("mdsw_status_string", "catastrophic stackwalker failure");
        assert!(!rule.predicate(&crash, &result_with("fooo::baar")));
        assert!(!rule.predicate(&CrashData::new(), &result_with("EMPTY: like my soul")));

        let mut result = result_with("EMPTY: like my soul");
        assert!(rule.predicate(&crash, &result));
        rule.action(&crash, &mut result);
        assert_eq!(
            result.signature,
            "EMPTY: like my soul; catastrophic stackwalker failure"
        );
    }

    #[test]
    fn test_oom_predicate() {
        let rule = OOMSignature::new(&config());
        assert!(!rule.predicate(&CrashData::new(), &result_with("hello")));
        assert!(rule.predicate(&CrashData::new().with("oom_allocation_size", 17), &result_with("")));
        for fragment in ["NS_ABORT_OOM | foo", "foo | mozalloc_handle_oom", "CrashAtUnhandlableOOM"] {
            assert!(rule.predicate(&CrashData::new(), &result_with(fragment)));
        }
    }

    #[test]
    fn test_oom_action() {
        let rule = OOMSignature::new(&config());

        let mut result = result_with("hello");
        rule.action(&CrashData::new(), &mut result);
        assert_eq!(result.signature, "OOM | unknown | hello");

        let mut result = result_with("hello");
        rule.action(&CrashData::new().with("oom_allocation_size", 17), &mut result);
        assert_eq!(result.signature, "OOM | small");
        assert_eq!(
            result.notes,
            vec!["OOMSignature: Signature replaced with OOM | small, was: \"hello\""]
        );

        let mut result = result_with("hello");
        rule.action(&CrashData::new().with("oom_allocation_size", "17000000"), &mut result);
        assert_eq!(result.signature, "OOM | large | hello");
    }

    #[test]
    fn test_abort_messages() {
        let rule = AbortSignature::new(&config());
        let cases = [
            ("unknown", "Abort | unknown | hello"),
            ("[5392] ###!!! ABORT: foo bar line 42", "Abort | foo bar line 42 | hello"),
            (
                "[7616] ###!!! ABORT: unsafe destruction: file c:/builds/moz2_slave/src/dom/plugins/ipc/PluginModuleParent.cpp, line 777",
                "Abort | unsafe destruction | hello",
            ),
            ("[204] ###!!! ABORT: file ?, ", "Abort | hello"),
            (
                "[4648] ###!!! ABORT: file resource:///modules/sessionstore/SessionStore.jsm, line 1459",
                "Abort | hello",
            ),
            (
                "unable to find a usable font (\u{5fae}\u{8f6f}\u{96c5}\u{9ed1})",
                "Abort | unable to find a usable font | hello",
            ),
            ("\u{018a} unknown", "Abort | unknown | hello"),
        ];
        for (message, expected) in cases {
            let crash = CrashData::new().with("abort_message", message);
            let mut result = result_with("hello");
            assert!(rule.predicate(&crash, &result));
            rule.action(&crash, &mut result);
            assert_eq!(result.signature, expected, "{message}");
        }

        assert!(!rule.predicate(&CrashData::new().with("abort_message", ""), &result_with("x")));
    }

    #[test]
    fn test_abort_long_message() {
        let rule = AbortSignature::new(&config());
        let crash = CrashData::new().with("abort_message", "a".repeat(81));
        let mut result = result_with("hello");
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, format!("Abort | {}... | hello", "a".repeat(77)));
    }

    #[test]
    fn test_run_watchdog() {
        let rule = SignatureRunWatchDog::new(config());
        assert!(!rule.predicate(&CrashData::new(), &result_with("all good")));
        assert!(rule.predicate(
            &CrashData::new(),
            &result_with("mozilla::(anonymous namespace)::RunWatchdog")
        ));
        assert!(rule.predicate(&CrashData::new(), &result_with("mozilla::`anonymous namespace'::RunWatchdog")));

        let crash = CrashData::from_value(json!({
            "os": "Windows NT",
            "crashing_thread": 1,
            "threads": [windows_frames(), {"frames": [{"function": "RunWatchdog"}]}]
        }));
        let mut result = result_with("foo::bar");
        rule.action(&crash, &mut result);
        assert_eq!(
            result.signature,
            "shutdownhang | MsgWaitForMultipleObjects | F_1152915508__________________________________"
        );
        assert_eq!(
            result.notes,
            vec!["SignatureRunWatchDog: Signature replaced with a shutdown hang signature, was: \"foo::bar\""]
        );
    }

    #[test]
    fn test_jit_category() {
        let rule = SignatureJitCategory;
        assert!(!rule.predicate(&CrashData::new().with("jit_category", ""), &result_with("x")));

        let crash = CrashData::new().with("jit_category", "JIT Crash");
        let mut result = result_with("foo::bar");
        assert!(rule.predicate(&crash, &result));
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "jit | JIT Crash");
        assert_eq!(
            result.notes,
            vec!["SignatureJitCategory: Signature replaced with a JIT Crash Category, was: \"foo::bar\""]
        );

        let legacy = CrashData::from_value(json!({"classifications": {"jit": {"category": "Old"}}}));
        let mut result = result_with("foo::bar");
        assert!(rule.predicate(&legacy, &result));
        rule.action(&legacy, &mut result);
        assert_eq!(result.signature, "jit | Old");
    }

    #[test]
    fn test_ipc_channel_error() {
        let rule = SignatureIPCChannelError::new(&config());

        let crash = CrashData::new()
            .with("ipc_channel_error", "ShutDownKill")
            .with("additional_minidumps", "browser");
        let mut result = result_with("foo::bar");
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "IPCError-browser | ShutDownKill | foo::bar");
        assert_eq!(result.notes, vec!["SignatureIPCChannelError: IPC Channel Error prepended"]);

        let crash = CrashData::new().with("ipc_channel_error", "ipc".repeat(50));
        let mut result = result_with("foo::bar");
        rule.action(&crash, &mut result);
        assert_eq!(
            result.signature,
            format!("IPCError-content | {}", &"ipc".repeat(50)[..100])
        );
        assert_eq!(
            result.notes,
            vec!["SignatureIPCChannelError: Signature replaced with an IPC Channel Error, was: \"foo::bar\""]
        );
    }

    #[test]
    fn test_ipc_message_name() {
        let rule = SignatureIPCMessageName;
        assert!(!rule.predicate(&CrashData::new(), &result_with("fooo::baar")));

        let crash = CrashData::new().with("ipc_message_name", "foo, bar");
        let mut result = result_with("fooo::baar");
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "fooo::baar | IPC_Message_Name=foo, bar");
    }

    #[test]
    fn test_shutdown_timeout() {
        let rule = SignatureShutdownTimeout;
        let annotation = json!({
            "phase": "beginning",
            "conditions": [{"name": "A"}, "C", {"name": "B"}]
        })
        .to_string();
        let crash = CrashData::new().with("async_shutdown_timeout", annotation);
        let mut result = result_with("foo");
        assert!(rule.predicate(&crash, &result));
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "AsyncShutdownTimeout | beginning | A,B,C");
        assert_eq!(
            result.notes,
            vec!["SignatureShutdownTimeout: Signature replaced with a Shutdown Timeout signature, was: \"foo\""]
        );
    }

    #[test]
    fn test_shutdown_timeout_variants() {
        let rule = SignatureShutdownTimeout;

        let crash = CrashData::new().with(
            "async_shutdown_timeout",
            json!({"phase": "beginning", "conditions": []}),
        );
        let mut result = result_with("foo");
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "AsyncShutdownTimeout | beginning | (none)");

        let crash = CrashData::new().with(
            "async_shutdown_timeout",
            json!({"conditions": ["A"]}).to_string(),
        );
        let mut result = result_with("foo");
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "AsyncShutdownTimeout | UNKNOWN");
        assert_eq!(result.notes[0], "SignatureShutdownTimeout: Error parsing AsyncShutdownTimeout: 'phase'");

        let crash = CrashData::new().with("async_shutdown_timeout", "{{{{");
        let mut result = result_with("foo");
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "AsyncShutdownTimeout | UNKNOWN");
        assert_eq!(result.notes.len(), 2);
    }

    #[test]
    fn test_parent_id_not_equals_child_id() {
        let rule = SignatureParentIDNotEqualsChildID;
        assert!(!rule.predicate(&CrashData::new().with("moz_crash_reason", "FOO"), &result_with("x")));

        let crash = CrashData::new().with("moz_crash_reason", BUILD_ID_ASSERTION);
        let mut result = result_with("fooo::baar");
        assert!(rule.predicate(&crash, &result));
        rule.action(&crash, &mut result);
        assert_eq!(result.signature, "parentBuildID != childBuildID");
        assert_eq!(
            result.notes,
            vec!["SignatureParentIDNotEqualsChildID: Signature replaced with MOZ_RELEASE_ASSERT, was: \"fooo::baar\""]
        );
    }

    #[test]
    fn test_whitespace_fixing() {
        let rule = SigFixWhitespace;
        let cases = [
            ("all   good", "all good"),
            ("all   good     ", "all good"),
            ("    all   good  ", "all good"),
            ("all\tgood", "all good"),
            ("all\n\ngood", "all good"),
            ("all  |  good", "all | good"),
        ];
        for (signature, expected) in cases {
            let mut result = result_with(signature);
            rule.action(&CrashData::new(), &mut result);
            assert_eq!(result.signature, expected);
        }

        let mut result = result_with("clean");
        rule.action(&CrashData::new(), &mut result);
        assert!(result.debug_log.is_empty());
    }

    #[test]
    fn test_truncate() {
        let rule = SigTruncate::new(&config());
        assert!(!rule.predicate(&CrashData::new(), &result_with(&"0".repeat(255))));

        let mut result = result_with(&"0123456789".repeat(26));
        assert!(rule.predicate(&CrashData::new(), &result));
        rule.action(&CrashData::new(), &mut result);
        assert_eq!(result.signature.len(), 255);
        assert!(result.signature.ends_with("9..."));
        assert_eq!(result.notes, vec!["SigTruncate: SigTrunc: signature truncated due to length"]);
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<&str> = RuleSet::new(config()).iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "SignatureGenerationRule",
                "StackwalkerErrorSignatureRule",
                "OOMSignature",
                "AbortSignature",
                "SignatureRunWatchDog",
                "SignatureJitCategory",
                "SignatureIPCChannelError",
                "SignatureIPCMessageName",
                "SignatureShutdownTimeout",
                "SignatureParentIDNotEqualsChildID",
                "SigFixWhitespace",
                "SigTruncate",
            ]
        );
    }
}
