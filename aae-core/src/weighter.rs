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

//! Weighter (§4.6): combines per-tag instances into one instance per user,
//! joining provenance across tags.

use crate::error::Result;
use crate::ids::{default_tag, EntityId, TagId, UserId};
use crate::instance::{join_provenances, Instance, Level, MISSING};
use crate::metric::Metric;
use crate::reducer::TagUserInstances;
use std::collections::HashMap;

fn effective_weight(tag: &TagId, metric: &Metric, has_positive_weight: bool) -> f64 {
    match &metric.tag_weights {
        Some(weights) if has_positive_weight => weights.get(tag).copied().unwrap_or_else(|| {
            weights.get(&default_tag()).copied().unwrap_or(0.0)
        }),
        _ => 1.0,
    }
}

pub fn weight(
    reduced: &TagUserInstances,
    metric: &Metric,
    level: Level,
    entity: &EntityId,
    users: &[UserId],
) -> Result<HashMap<UserId, Instance>> {
    let has_positive_weight = metric
        .tag_weights
        .as_ref()
        .map(|w| w.values().any(|v| *v > 0.0))
        .unwrap_or(false);

    let mut tags: Vec<&TagId> = reduced.keys().collect();
    tags.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    let mut out = HashMap::new();
    for user in users {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        let mut max_time: Option<u64> = None;
        let mut joined: Option<Instance> = None;

        for tag in &tags {
            let Some(per_user) = reduced.get(*tag) else {
                continue;
            };
            let Some(instance) = per_user.get(user) else {
                continue;
            };
            let tag_weight = effective_weight(tag, metric, has_positive_weight);

            if !instance.is_missing() {
                numerator += instance.score * tag_weight;
                max_time = match (max_time, instance.time) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (Some(a), None) => Some(a),
                    (None, b) => b,
                };
            }
            denominator += tag_weight;

            joined = Some(match joined {
                None => instance.clone(),
                Some(base) => join_provenances(base, instance)?,
            });
        }

        let score = if denominator == 0.0 {
            MISSING
        } else {
            numerator / denominator
        };
        let provenance = joined.and_then(|inst| inst.provenance).or_else(|| Some(Vec::new()));

        out.insert(
            user.clone(),
            Instance {
                level,
                entity: entity.clone(),
                score,
                time: max_time,
                provenance,
                tag: None,
            },
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::make_instance as mk;
    use crate::ids::TagId;

    #[test]
    fn two_tag_weighted_average() {
        let mut reduced: TagUserInstances = HashMap::new();
        let mut hw = HashMap::new();
        hw.insert(
            UserId::new("u1"),
            mk(Level::Lesson, EntityId::new("L"), 80.0, Some(1000), Some(vec![]), Some(TagId::new("hw"))),
        );
        reduced.insert(TagId::new("hw"), hw);
        let mut exam = HashMap::new();
        exam.insert(
            UserId::new("u1"),
            mk(Level::Lesson, EntityId::new("L"), 60.0, Some(1500), Some(vec![]), Some(TagId::new("exam"))),
        );
        reduced.insert(TagId::new("exam"), exam);

        let mut metric = Metric::new(
            "m",
            Level::Lesson,
            crate::metric::RuleSpec::new("average", vec![]),
        );
        let mut weights = HashMap::new();
        weights.insert(TagId::new("hw"), 1.0);
        weights.insert(TagId::new("exam"), 3.0);
        metric.tag_weights = Some(weights);

        let result = weight(
            &reduced,
            &metric,
            Level::Lesson,
            &EntityId::new("L"),
            &[UserId::new("u1")],
        )
        .unwrap();
        let instance = &result[&UserId::new("u1")];
        assert_eq!(instance.score, 65.0);
        assert_eq!(instance.time, Some(1500));
    }

    #[test]
    fn uniform_weighting_when_no_positive_weights() {
        let mut reduced: TagUserInstances = HashMap::new();
        let mut default_bucket = HashMap::new();
        default_bucket.insert(
            UserId::new("u1"),
            mk(Level::Lesson, EntityId::new("L"), 80.0, Some(1000), Some(vec![]), None),
        );
        reduced.insert(default_tag(), default_bucket);

        let metric = Metric::new(
            "m",
            Level::Lesson,
            crate::metric::RuleSpec::new("average", vec![]),
        );
        let result = weight(
            &reduced,
            &metric,
            Level::Lesson,
            &EntityId::new("L"),
            &[UserId::new("u1")],
        )
        .unwrap();
        assert_eq!(result[&UserId::new("u1")].score, 80.0);
    }
}
