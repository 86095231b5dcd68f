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

//! Crate-wide error currency.
//!
//! Library crates use typed `thiserror` errors; `anyhow` is reserved for
//! the binary crate's edges.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AaeError>;

#[derive(Debug, Error)]
pub enum AaeError {
    /// Absent or malformed metric: `level == component` passed to `compute`,
    /// a metric with no rule, or a cache mutation on an inconsistent input.
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    /// `rule[0]` is not registered in the catalog.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// Transient failure from the underlying persistence layer. Never
    /// retried inside the engine.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A compute call was cancelled before it could commit a result.
    #[error("computation cancelled")]
    Cancelled,

    /// A runtime assertion failed (a bug in the engine, not the caller).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl AaeError {
    pub fn invalid_metric(msg: impl Into<String>) -> Self {
        Self::InvalidMetric(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
