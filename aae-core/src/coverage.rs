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

//! Coverage resolution: turns a metric's `all`/`include`/`exclude` filter
//! into a concrete list of child ids, and carries the lesson-id side
//! channel the component loader needs (§9 design note: a typed field, not
//! a hidden/non-enumerable property).

use crate::ids::EntityId;
use crate::metric::Coverage;

/// The resolved child set for one branch-loader step. `lesson_id` is
/// `Some` only when the children are components (i.e. this branch is
/// descending from the lesson level).
#[derive(Debug, Clone)]
pub struct ResolvedChildren {
    pub ids: Vec<EntityId>,
    pub lesson_id: Option<EntityId>,
}

/// Applies `coverage` to `candidates`, preserving candidate order.
pub fn resolve_coverage(coverage: &Coverage, candidates: &[EntityId]) -> Vec<EntityId> {
    match coverage {
        Coverage::All => candidates.to_vec(),
        Coverage::Include(ids) => candidates
            .iter()
            .filter(|id| ids.contains(id))
            .cloned()
            .collect(),
        Coverage::Exclude(ids) => candidates
            .iter()
            .filter(|id| !ids.contains(id))
            .cloned()
            .collect(),
    }
}
