// SPDX-License-Identifier: PMPL-1.0-or-later

//! siggen: crash signature generation.
//!
//! Turns a processed crash report into a short, stable signature string used
//! to bucket similar crashes together. Frames of the crashing thread are
//! normalized and trimmed against configurable siglists, then a fixed
//! pipeline of rules refines the result for special cases such as
//! out-of-memory crashes, aborts, hangs and IPC errors.
//!
//! ```no_run
//! use siggen::signatures::SignatureGenerator;
//! use siggen::types::CrashData;
//!
//! let generator = SignatureGenerator::with_builtin_siglists()?;
//! let crash = CrashData::from_value(serde_json::json!({"threads": []}));
//! println!("{}", generator.generate(&crash).signature);
//! # Ok::<(), siggen::error::ErrorKind>(())
//! ```

pub mod config;
pub mod error;
pub mod javautil;
pub mod report;
pub mod signatures;
pub mod types;
