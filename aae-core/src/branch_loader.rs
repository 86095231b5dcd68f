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

//! Branch loader (§4.3): resolves coverage, fetches child entities and
//! their chosen sub-metric, and recurses into `compute` concurrently.

use crate::component_loader::TaggedUserMap;
use crate::coverage::{resolve_coverage, ResolvedChildren};
use crate::error::Result;
use crate::ids::{default_tag, EntityId, UserId};
use crate::instance::Level;
use crate::metric::Metric;
use crate::orchestrator::EngineContext;
use crate::policy::ComputeOptions;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Resolves a metric's children to concrete ids. When the children live at
/// the component level, delegates to the raw-event store's distinct
/// component listing (scoped to `users`) before applying coverage; the
/// lesson id side channel travels with the result rather than as a hidden
/// property (§9).
pub async fn resolve_children(
    ctx: &EngineContext,
    entity_id: &EntityId,
    parent_children: &Option<Vec<EntityId>>,
    metric: &Metric,
    users: &[UserId],
) -> Result<ResolvedChildren> {
    let child_level = metric
        .level
        .child_level()
        .ok_or_else(|| crate::error::AaeError::invalid_metric("component has no children"))?;

    if child_level == Level::Component {
        let candidates = ctx
            .events
            .list_child_components(entity_id, Some(users))
            .await?;
        let ids = resolve_coverage(&metric.coverage, &candidates);
        Ok(ResolvedChildren {
            ids,
            lesson_id: Some(entity_id.clone()),
        })
    } else {
        let candidates = parent_children.clone().unwrap_or_default();
        let ids = resolve_coverage(&metric.coverage, &candidates);
        Ok(ResolvedChildren {
            ids,
            lesson_id: None,
        })
    }
}

/// Fetches each child's chosen sub-metric aggregate concurrently (bounded
/// by the context's fan-out semaphore) and assembles a per-child tagged
/// instance map.
pub async fn load(
    ctx: &EngineContext,
    children: &[EntityId],
    child_level: Level,
    metric: &Metric,
    users: &[UserId],
    options: &ComputeOptions,
) -> Result<TaggedUserMap> {
    let mut tasks = Vec::with_capacity(children.len());
    for child_id in children {
        let child_id = child_id.clone();
        let metric = metric.clone();
        let users = users.to_vec();
        tasks.push(async move {
            if ctx.cancellation.is_cancelled() {
                return Err(crate::error::AaeError::Cancelled);
            }
            // The permit is scoped to the entity fetch only: it must not span
            // the recursive `compute` call below, since that call's own
            // branch-loader tasks draw from this same semaphore. Holding it
            // across the recursion would let a saturated level's parent
            // tasks block forever on permits their own children need.
            let child_entity = {
                let permit = ctx.fanout.clone().acquire_owned().await.map_err(|_| {
                    crate::error::AaeError::invariant("fan-out semaphore closed unexpectedly")
                })?;
                let entity = ctx.entities.get_entity(child_level, &child_id).await?;
                drop(permit);
                entity
            };
            let chosen = match &metric.submetric {
                Some(name) => child_entity.metric_named(name).cloned(),
                None => child_entity.metrics.first().cloned(),
            };
            let Some(child_metric) = chosen else {
                debug!(
                    child = %child_id,
                    submetric = ?metric.submetric,
                    "branch loader: child declares no matching sub-metric, dropping"
                );
                return Ok(None);
            };
            let tag = child_entity.tag.clone().unwrap_or_else(default_tag);
            let result = crate::orchestrator::compute(ctx, &child_id, &child_metric, &users, options)
                .await?;
            Ok(Some((tag, result)))
        });
    }

    let results = futures::future::join_all(tasks).await;

    let mut tags: HashSet<_> = HashSet::new();
    if let Some(weights) = &metric.tag_weights {
        tags.extend(weights.keys().cloned());
    }
    tags.insert(default_tag());

    let mut merged: TaggedUserMap = HashMap::new();
    for outcome in results {
        let Some((tag, per_user)) = outcome? else {
            continue;
        };
        tags.insert(tag.clone());
        let bucket = merged.entry(tag).or_insert_with(HashMap::new);
        for user in users {
            let instance = per_user.get(user).cloned().ok_or_else(|| {
                crate::error::AaeError::invariant(
                    "compute did not return every requested user",
                )
            })?;
            bucket.entry(user.clone()).or_insert_with(Vec::new).push(instance);
        }
    }

    // Tag closure: every tag in the union gets an entry, even if empty,
    // with every user present (possibly with an empty instance list).
    for tag in tags {
        let bucket = merged.entry(tag).or_insert_with(HashMap::new);
        for user in users {
            bucket.entry(user.clone()).or_insert_with(Vec::new);
        }
    }

    Ok(merged)
}
