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

//! Raw assessment events as produced by the surrounding system. The engine
//! only reads the fields listed here.

use crate::ids::{EntityId, MetricName, TagId, UserId};
use crate::instance::Score;

/// One raw assessment event. `sequence` is the store's insertion ordinal,
/// not part of the source data model, but required to break ties
/// deterministically when two events share a `time` (§5 ordering
/// guarantee: the raw query does not promise a stable order on its own).
#[derive(Debug, Clone)]
pub struct AssessmentEvent {
    pub user: UserId,
    pub lesson: EntityId,
    pub component: EntityId,
    pub component_type: Option<String>,
    pub metric_name: MetricName,
    pub score: Score,
    pub time: u64,
    pub tag: Option<TagId>,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Filter accepted by `RawEventStore::query_events`.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub lesson: EntityId,
    pub components: Vec<EntityId>,
    pub users: Vec<UserId>,
    pub time_range: (u64, u64),
    pub metric_name: MetricName,
}
