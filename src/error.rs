// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for signature generation
//!
//! Only the Java helpers fail on bad crash data. Every other problem with a
//! crash report degrades into a fallback signature plus a note; the remaining
//! variants cover building a [`crate::config::ToolConfig`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("malformed Java stack trace: {reason}")]
    MalformedJavaStackTrace { reason: String },

    #[error("malformed Java exception: {detail}")]
    MalformedJavaException { detail: String },

    #[error("invalid pattern {pattern:?} in {list}: {source}")]
    InvalidPattern {
        list: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse siglists: {0}")]
    SiglistParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorKind {
    pub(crate) fn malformed_trace(reason: impl Into<String>) -> Self {
        ErrorKind::MalformedJavaStackTrace {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_exception(detail: impl Into<String>) -> Self {
        ErrorKind::MalformedJavaException {
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ErrorKind>;
