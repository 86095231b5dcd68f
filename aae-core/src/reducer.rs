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

//! Reducer (§4.5): applies the metric's rule per (tag, user), turning a
//! tagged-user map of raw instances into one instance per (tag, user).

use crate::component_loader::TaggedUserMap;
use crate::error::Result;
use crate::ids::{default_tag, EntityId, TagId, UserId};
use crate::instance::{make_instance, missing_instance, Instance, Level};
use crate::metric::Metric;
use crate::rules::RuleCatalog;
use std::collections::HashMap;

pub type TagUserInstances = HashMap<TagId, HashMap<UserId, Instance>>;

pub fn reduce(
    tagged: &TaggedUserMap,
    metric: &Metric,
    level: Level,
    entity: &EntityId,
    users: &[UserId],
    catalog: &RuleCatalog,
) -> Result<TagUserInstances> {
    let rule = catalog.dispatch(&metric.rule.name)?;
    let mut out: TagUserInstances = HashMap::new();

    for (tag, per_user) in tagged {
        let mut reduced_users = HashMap::new();
        for user in users {
            let inputs = per_user.get(user).cloned().unwrap_or_default();
            let score = rule.apply(&inputs, &metric.rule.args)?;

            let instance = if crate::rules::is_missing(score) {
                let mut inst = missing_instance(level, entity.clone(), tag_field(tag));
                inst.tag = tag_field(tag);
                inst
            } else {
                let time = inputs.iter().filter_map(|i| i.time).max();
                make_instance(level, entity.clone(), score, time, Some(inputs), tag_field(tag))
            };
            reduced_users.insert(user.clone(), instance);
        }
        out.insert(tag.clone(), reduced_users);
    }

    Ok(out)
}

fn tag_field(tag: &TagId) -> Option<TagId> {
    if *tag == default_tag() {
        None
    } else {
        Some(tag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::make_instance as mk;
    use crate::metric::RuleSpec;

    fn catalog() -> RuleCatalog {
        RuleCatalog::with_builtins()
    }

    #[test]
    fn missing_when_all_inputs_missing() {
        let mut tagged: TaggedUserMap = HashMap::new();
        let mut per_user = HashMap::new();
        per_user.insert(
            UserId::new("u1"),
            vec![crate::instance::missing_instance(
                Level::Component,
                EntityId::new("c1"),
                None,
            )],
        );
        tagged.insert(default_tag(), per_user);

        let metric = Metric::new(
            "m",
            Level::Lesson,
            RuleSpec::new("average", vec![crate::metric::RuleArg::Text("zero".into())]),
        );
        let result = reduce(
            &tagged,
            &metric,
            Level::Lesson,
            &EntityId::new("L"),
            &[UserId::new("u1")],
            &catalog(),
        )
        .unwrap();
        assert!(result[&default_tag()][&UserId::new("u1")].is_missing());
    }

    #[test]
    fn scored_instance_carries_max_time_and_provenance() {
        let mut tagged: TaggedUserMap = HashMap::new();
        let mut per_user = HashMap::new();
        per_user.insert(
            UserId::new("u1"),
            vec![
                mk(Level::Component, EntityId::new("c1"), 80.0, Some(1000), None, None),
                mk(Level::Component, EntityId::new("c2"), 60.0, Some(2000), None, None),
            ],
        );
        tagged.insert(default_tag(), per_user);

        let metric = Metric::new(
            "m",
            Level::Lesson,
            RuleSpec::new("average", vec![crate::metric::RuleArg::Text("zero".into())]),
        );
        let result = reduce(
            &tagged,
            &metric,
            Level::Lesson,
            &EntityId::new("L"),
            &[UserId::new("u1")],
            &catalog(),
        )
        .unwrap();
        let instance = &result[&default_tag()][&UserId::new("u1")];
        assert_eq!(instance.score, 70.0);
        assert_eq!(instance.time, Some(2000));
        assert_eq!(instance.provenance.as_ref().unwrap().len(), 2);
    }
}
