// SPDX-License-Identifier: PMPL-1.0-or-later

//! Serialization helpers for printed reports

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Serialize a value for machine consumption; text falls back to JSON
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Json | OutputFormat::Text => Ok(serde_json::to_string_pretty(value)?),
        }
    }
}
