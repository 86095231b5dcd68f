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

//! Instance model: the value object produced at every level of a compute,
//! carrying its own provenance so an aggregate can be audited after the
//! fact.

use crate::ids::{EntityId, TagId};
use serde::{Deserialize, Serialize};

/// Score domain is `[0,100] ∪ {MISSING}`. Never treat `MISSING` as zero
/// unless a rule explicitly imputes it.
pub type Score = f64;

pub const MISSING: Score = -999.0;

/// The four owned levels of the entity tree, plus the optional top.
/// `Component` is a leaf: instances never recurse below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Component,
    Lesson,
    Namespace,
    Program,
    Global,
}

impl Level {
    /// Number of levels between `self` and `Component` (used to check
    /// provenance depth against the level a metric was asked to compute at).
    pub fn distance_to_component(self) -> u8 {
        match self {
            Level::Component => 0,
            Level::Lesson => 1,
            Level::Namespace => 2,
            Level::Program => 3,
            Level::Global => 4,
        }
    }

    /// The level immediately below `self` in the tree, or `None` for
    /// `Component` (which has no owned child list; see the component
    /// loader).
    pub fn child_level(self) -> Option<Level> {
        match self {
            Level::Component => None,
            Level::Lesson => Some(Level::Component),
            Level::Namespace => Some(Level::Lesson),
            Level::Program => Some(Level::Namespace),
            Level::Global => Some(Level::Program),
        }
    }
}

pub fn is_missing_score(score: Score) -> bool {
    score == MISSING
}

/// `{level, entity, score, time, provenance, tag?}`. `tag` serializes only
/// when present and non-default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub level: Level,
    pub entity: EntityId,
    pub score: Score,
    /// Maximum event time in the subtree, or `None` if there is none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    /// `None` only at the component (leaf) level; a missing instance at a
    /// non-leaf level carries `Some(vec![])`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Vec<Instance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagId>,
}

impl Instance {
    pub fn is_missing(&self) -> bool {
        is_missing_score(self.score)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn make_instance(
    level: Level,
    entity: EntityId,
    score: Score,
    time: Option<u64>,
    provenance: Option<Vec<Instance>>,
    tag: Option<TagId>,
) -> Instance {
    Instance {
        level,
        entity,
        score,
        time,
        provenance,
        tag,
    }
}

pub fn missing_instance(level: Level, entity: EntityId, tag: Option<TagId>) -> Instance {
    let provenance = match level {
        Level::Component => None,
        _ => Some(Vec::new()),
    };
    Instance {
        level,
        entity,
        score: MISSING,
        time: None,
        provenance,
        tag,
    }
}

/// Concatenates `sibling`'s provenance children into `base`'s. Both must
/// share level and entity id; this is how per-tag instances at the same
/// node are folded into one provenance tree during weighting.
pub fn join_provenances(mut base: Instance, sibling: &Instance) -> crate::error::Result<Instance> {
    if base.level != sibling.level || base.entity != sibling.entity {
        return Err(crate::error::AaeError::invariant(format!(
            "join_provenances: level/entity mismatch ({:?}/{} vs {:?}/{})",
            base.level, base.entity, sibling.level, sibling.entity
        )));
    }
    let sibling_children = sibling.provenance.clone().ok_or_else(|| {
        crate::error::AaeError::invariant("join_provenances: sibling has leaf (null) provenance")
    })?;
    match base.provenance.as_mut() {
        Some(children) => children.extend(sibling_children),
        None => {
            return Err(crate::error::AaeError::invariant(
                "join_provenances: base has leaf (null) provenance",
            ))
        }
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_instance_leaf_has_null_provenance() {
        let inst = missing_instance(Level::Component, EntityId::new("c1"), None);
        assert!(inst.provenance.is_none());
        assert!(inst.is_missing());
    }

    #[test]
    fn missing_instance_branch_has_empty_provenance() {
        let inst = missing_instance(Level::Lesson, EntityId::new("l1"), None);
        assert_eq!(inst.provenance, Some(Vec::new()));
    }

    #[test]
    fn join_provenances_concatenates_children() {
        let base = make_instance(
            Level::Lesson,
            EntityId::new("l1"),
            80.0,
            Some(1000),
            Some(vec![make_instance(
                Level::Component,
                EntityId::new("c1"),
                80.0,
                Some(1000),
                None,
                None,
            )]),
            Some(TagId::new("hw")),
        );
        let sibling = make_instance(
            Level::Lesson,
            EntityId::new("l1"),
            60.0,
            Some(1500),
            Some(vec![make_instance(
                Level::Component,
                EntityId::new("c2"),
                60.0,
                Some(1500),
                None,
                None,
            )]),
            Some(TagId::new("exam")),
        );
        let joined = join_provenances(base, &sibling).unwrap();
        assert_eq!(joined.provenance.unwrap().len(), 2);
    }

    #[test]
    fn join_provenances_rejects_entity_mismatch() {
        let base = missing_instance(Level::Lesson, EntityId::new("l1"), None);
        let sibling = missing_instance(Level::Lesson, EntityId::new("l2"), None);
        assert!(join_provenances(base, &sibling).is_err());
    }
}
