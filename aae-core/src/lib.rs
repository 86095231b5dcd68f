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

//! Assessment Aggregation Engine: a hierarchical, tag-weighted,
//! rule-driven scoring engine that reduces per-user, per-component
//! assessment events into composite scores at higher levels of an
//! educational entity tree (component → lesson → namespace → program →
//! optional global).
//!
//! The crate is a library consumed by a host process that supplies
//! persistence ([`contracts::EntityStore`], [`contracts::RawEventStore`],
//! [`contracts::UserStore`]) and, optionally, additional rules for the
//! [`rules::RuleCatalog`]. [`orchestrator::compute`] is the single entry
//! point for on-demand aggregation; [`cache::DependencyCache`] drives
//! incremental propagation when component-level events arrive.

pub mod branch_loader;
pub mod cache;
pub mod component_loader;
pub mod contracts;
pub mod coverage;
pub mod error;
pub mod event;
pub mod ids;
pub mod instance;
pub mod metric;
pub mod orchestrator;
pub mod policy;
pub mod reducer;
pub mod result_cache;
pub mod rules;
pub mod weighter;

pub use cache::{DependencyCache, Plan};
pub use contracts::{completions_key, EntityStore, RawEventStore, UserCompletions, UserStore};
pub use error::{AaeError, Result};
pub use event::{AssessmentEvent, EventFilter, SortDirection};
pub use ids::{default_tag, EntityId, MetricName, TagId, UserId, DEFAULT_TAG};
pub use instance::{
    is_missing_score, join_provenances, make_instance, missing_instance, Instance, Level, Score,
    MISSING,
};
pub use metric::{Coverage, Entity, Metric, MissingMode, Multiples, RuleArg, RuleSpec};
pub use orchestrator::{compute, EngineContext};
pub use policy::{make_policy, ComputeOptions, Policy};
pub use result_cache::{ResultCache, ResultCacheStats, ResultKey};
pub use rules::{Rule, RuleCatalog, RuleInfo};

#[cfg(any(test, feature = "test-support"))]
pub use contracts::memory;
