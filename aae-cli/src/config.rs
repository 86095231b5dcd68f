// Copyright 2026 Assessment Aggregation Engine Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! CLI configuration. The engine itself takes no environment variables or
//! config files; this small TOML-backed struct only configures the demo
//! binary wrapped around it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Concurrency bound handed to [`aae_core::EngineContext::new`] as the
/// per-call fan-out semaphore width.
fn default_max_fanout() -> usize {
    16
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// TTL for the demo's result cache (`aae_core::ResultCache`).
fn default_cache_ttl_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_max_fanout")]
    pub max_fanout: usize,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            max_fanout: default_max_fanout(),
            log_filter: default_log_filter(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))
            }
        }
    }
}
