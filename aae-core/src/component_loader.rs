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

//! Component loader (§4.4): the only module that reads raw assessment
//! events. Resolves multiples policy, fills missing users, and hands the
//! reducer a fully tag/user-closed map.

use crate::contracts::RawEventStore;
use crate::error::Result;
use crate::event::{EventFilter, SortDirection};
use crate::ids::{default_tag, EntityId, MetricName, TagId, UserId};
use crate::instance::{make_instance, missing_instance, Instance, Level};
use crate::metric::Multiples;
use crate::policy::Policy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

pub type TaggedUserMap = HashMap<TagId, HashMap<UserId, Vec<Instance>>>;

fn sort_direction_for(multiples: Multiples) -> SortDirection {
    match multiples {
        Multiples::Last | Multiples::Max | Multiples::PassThrough => SortDirection::Ascending,
        Multiples::First => SortDirection::Descending,
    }
}

#[tracing::instrument(skip_all, fields(component_count = components.len(), user_count = users.len()))]
pub async fn load(
    event_store: &Arc<dyn RawEventStore>,
    metric_name: &MetricName,
    components: &[EntityId],
    lesson_id: &EntityId,
    users: &[UserId],
    policy: &Policy,
) -> Result<TaggedUserMap> {
    let filter = EventFilter {
        lesson: lesson_id.clone(),
        components: components.to_vec(),
        users: users.to_vec(),
        time_range: policy.time_filter,
        metric_name: metric_name.clone(),
    };
    let sort = sort_direction_for(policy.multiples);
    let events = event_store.query_events(&filter, sort).await?;

    let observed_tags: HashSet<TagId> = events
        .iter()
        .map(|e| e.tag.clone().unwrap_or_else(default_tag))
        .collect();
    let mut tag_universe: Vec<TagId> = observed_tags.into_iter().collect();
    if let Some(weights) = &policy.tag_weights {
        for tag in weights.keys() {
            if !tag_universe.contains(tag) {
                tag_universe.push(tag.clone());
            }
        }
    }
    if !tag_universe.contains(&default_tag()) {
        tag_universe.push(default_tag());
    }

    // grid[(component, tag, user)] holds the instance list for that slot.
    let mut grid: HashMap<(EntityId, TagId, UserId), Vec<Instance>> = HashMap::new();
    for component in components {
        for tag in &tag_universe {
            for user in users {
                grid.insert((component.clone(), tag.clone(), user.clone()), Vec::new());
            }
        }
    }

    let mut component_tag_counts: HashMap<EntityId, HashMap<TagId, usize>> = HashMap::new();
    let mut component_total_events: HashMap<EntityId, usize> = HashMap::new();

    for event in &events {
        let tag = event.tag.clone().unwrap_or_else(default_tag);
        *component_tag_counts
            .entry(event.component.clone())
            .or_default()
            .entry(tag.clone())
            .or_insert(0) += 1;
        *component_total_events
            .entry(event.component.clone())
            .or_insert(0) += 1;

        let key = (event.component.clone(), tag, event.user.clone());
        let Some(slot) = grid.get_mut(&key) else {
            // event for a user/component outside the requested set; ignore.
            continue;
        };
        let instance = make_instance(
            Level::Component,
            event.component.clone(),
            event.score,
            Some(event.time),
            None,
            None,
        );
        match policy.multiples {
            Multiples::Last | Multiples::First => {
                *slot = vec![instance];
            }
            Multiples::Max => {
                if slot.is_empty() || slot[0].score < instance.score {
                    *slot = vec![instance];
                }
            }
            Multiples::PassThrough => {
                slot.push(instance);
            }
        }
    }

    for component in components {
        let total = component_total_events.get(component).copied().unwrap_or(0);
        let counts = component_tag_counts.get(component);
        for user in users {
            let has_any = tag_universe
                .iter()
                .any(|tag| {
                    grid.get(&(component.clone(), tag.clone(), user.clone()))
                        .map(|v| !v.is_empty())
                        .unwrap_or(false)
                });
            if has_any {
                continue;
            }
            let dominant_tag = if total == 0 {
                default_tag()
            } else {
                counts
                    .and_then(|counts| {
                        let mut best: Option<(&TagId, usize)> = None;
                        let mut tags: Vec<&TagId> = counts.keys().collect();
                        tags.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                        for tag in tags {
                            let count = counts[tag];
                            match best {
                                Some((_, best_count)) if best_count >= count => {}
                                _ => best = Some((tag, count)),
                            }
                        }
                        best.map(|(tag, _)| tag.clone())
                    })
                    .unwrap_or_else(default_tag)
            };
            debug!(
                component = %component,
                user = %user,
                tag = %dominant_tag,
                "component loader: no event for user, filling missing instance"
            );
            let key = (component.clone(), dominant_tag, user.clone());
            if let Some(slot) = grid.get_mut(&key) {
                slot.push(missing_instance(Level::Component, component.clone(), None));
            }
        }
    }

    let mut merged: TaggedUserMap = HashMap::new();
    for tag in &tag_universe {
        let mut per_user: HashMap<UserId, Vec<Instance>> = HashMap::new();
        for user in users {
            let mut flattened = Vec::new();
            for component in components {
                if let Some(slot) = grid.get(&(component.clone(), tag.clone(), user.clone())) {
                    flattened.extend(slot.iter().cloned());
                }
            }
            per_user.insert(user.clone(), flattened);
        }
        merged.insert(tag.clone(), per_user);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::memory::InMemoryEventStore;
    use crate::event::AssessmentEvent;

    fn event(user: &str, component: &str, score: f64, time: u64) -> AssessmentEvent {
        AssessmentEvent {
            user: UserId::new(user),
            lesson: EntityId::new("L"),
            component: EntityId::new(component),
            component_type: None,
            metric_name: MetricName::new("score"),
            score,
            time,
            tag: None,
            sequence: 0,
        }
    }

    #[tokio::test]
    async fn fills_missing_for_uncovered_user() {
        let store = InMemoryEventStore::new();
        store.push(event("u1", "compX", 80.0, 1000));
        store.push(event("u2", "compX", 100.0, 2000));
        let store: Arc<dyn RawEventStore> = Arc::new(store);

        let users = vec![UserId::new("u1"), UserId::new("u2"), UserId::new("u3")];
        let result = load(
            &store,
            &MetricName::new("score"),
            &[EntityId::new("compX")],
            &EntityId::new("L"),
            &users,
            &Policy::default(),
        )
        .await
        .unwrap();

        let default_bucket = &result[&default_tag()];
        assert_eq!(default_bucket[&UserId::new("u1")].len(), 1);
        assert_eq!(default_bucket[&UserId::new("u1")][0].score, 80.0);
        assert!(default_bucket[&UserId::new("u3")][0].is_missing());
    }

    #[tokio::test]
    async fn max_keeps_highest_scored_event() {
        let store = InMemoryEventStore::new();
        store.push(event("u1", "compX", 60.0, 100));
        store.push(event("u1", "compX", 90.0, 200));
        store.push(event("u1", "compX", 40.0, 300));
        let store: Arc<dyn RawEventStore> = Arc::new(store);

        let mut policy = Policy::default();
        policy.multiples = Multiples::Max;
        let result = load(
            &store,
            &MetricName::new("score"),
            &[EntityId::new("compX")],
            &EntityId::new("L"),
            &[UserId::new("u1")],
            &policy,
        )
        .await
        .unwrap();

        let instances = &result[&default_tag()][&UserId::new("u1")];
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].score, 90.0);
        assert_eq!(instances[0].time, Some(200));
    }

    #[tokio::test]
    async fn pass_through_appends_every_event() {
        let store = InMemoryEventStore::new();
        store.push(event("u1", "compX", 60.0, 100));
        store.push(event("u1", "compX", 90.0, 200));
        let store: Arc<dyn RawEventStore> = Arc::new(store);

        let mut policy = Policy::default();
        policy.multiples = Multiples::PassThrough;
        let result = load(
            &store,
            &MetricName::new("score"),
            &[EntityId::new("compX")],
            &EntityId::new("L"),
            &[UserId::new("u1")],
            &policy,
        )
        .await
        .unwrap();

        assert_eq!(result[&default_tag()][&UserId::new("u1")].len(), 2);
    }
}
