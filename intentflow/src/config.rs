// Intentflow: Intent Compilation and Flow Batch Execution
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Controller Configuration
//!
//! All tunables of the pipeline, loadable from a JSON file. Every field is optional in the file;
//! missing fields take their default value.
//!
//! ```
//! use intentflow::config::{ControllerConfig, ExecutionMode};
//! use intentflow::flowmanager::ConflictDetectionPolicy;
//!
//! let config = ControllerConfig::from_json_str(
//!     r#"{ "conflict_detection_policy": "strict", "execution": "inline" }"#,
//! ).unwrap();
//! assert_eq!(config.conflict_detection_policy, ConflictDetectionPolicy::Strict);
//! assert_eq!(config.execution, ExecutionMode::Inline);
//! assert_eq!(config.intent_log_size, 20);
//! ```

use crate::flowmanager::ConflictDetectionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Where accepted flow batches are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Each batch runs on its own worker thread, and submission returns immediately.
    Background,
    /// The batch runs to completion on the submitting thread.
    Inline,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Background
    }
}

/// Configuration of the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Policy used to reject overlapping flows
    pub conflict_detection_policy: ConflictDetectionPolicy,
    /// Time to wait for a flow to be installed or removed. `None` waits forever.
    pub install_timeout_ms: Option<u64>,
    /// Number of transitions kept in the log of every intent
    pub intent_log_size: usize,
    /// Number of worker threads for parallel intent compilation. `None` uses all cpus.
    pub compile_threads: Option<usize>,
    /// Size of the id blocks requested from the allocator
    pub id_block_size: u64,
    /// Where flow batches are executed
    pub execution: ExecutionMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            conflict_detection_policy: ConflictDetectionPolicy::default(),
            install_timeout_ms: Some(30_000),
            intent_log_size: 20,
            compile_threads: None,
            id_block_size: 1000,
            execution: ExecutionMode::default(),
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a configuration from a JSON string
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check that all values are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intent_log_size == 0 {
            return Err(ConfigError::Invalid("intent_log_size must be positive".to_string()));
        }
        if self.id_block_size == 0 {
            return Err(ConfigError::Invalid("id_block_size must be positive".to_string()));
        }
        if self.compile_threads == Some(0) {
            return Err(ConfigError::Invalid("compile_threads must be positive".to_string()));
        }
        Ok(())
    }

    /// Installation timeout as a duration
    pub fn install_timeout(&self) -> Option<Duration> {
        self.install_timeout_ms.map(Duration::from_millis)
    }

    /// Number of compile threads to use
    pub fn num_compile_threads(&self) -> usize {
        self.compile_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Error while loading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file cannot be read
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// The content is not valid JSON, or does not describe a configuration
    #[error("Parse Error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
