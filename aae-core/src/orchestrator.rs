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

//! Orchestrator (§4.8): the engine's single public entry point, wiring
//! coverage resolution, the branch/component loaders, the reducer, and the
//! weighter into one recursive `compute` call.

use crate::branch_loader;
use crate::component_loader;
use crate::contracts::{EntityStore, RawEventStore, UserStore};
use crate::error::{AaeError, Result};
use crate::ids::{EntityId, UserId};
use crate::instance::{Instance, Level};
use crate::metric::Metric;
use crate::policy::{make_policy, ComputeOptions};
use crate::reducer;
use crate::rules::RuleCatalog;
use crate::weighter;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Everything a `compute` call needs from the host: persistence, the rule
/// registry, and the two knobs that bound a single call's resource use
/// (fan-out width, cancellation).
pub struct EngineContext {
    pub entities: Arc<dyn EntityStore>,
    pub events: Arc<dyn RawEventStore>,
    pub users: Arc<dyn UserStore>,
    pub rules: Arc<RuleCatalog>,
    pub fanout: Arc<Semaphore>,
    pub cancellation: CancellationToken,
}

impl EngineContext {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        events: Arc<dyn RawEventStore>,
        users: Arc<dyn UserStore>,
        rules: Arc<RuleCatalog>,
        max_fanout: usize,
    ) -> Self {
        Self {
            entities,
            events,
            users,
            rules,
            fanout: Arc::new(Semaphore::new(max_fanout.max(1))),
            cancellation: CancellationToken::new(),
        }
    }
}

/// `compute(entityId, metric, users, options)`. Recursive over the entity
/// tree; boxed because async fns cannot recurse directly.
#[instrument(skip_all, fields(entity = %entity_id, metric = %metric.name, user_count = users.len()))]
pub fn compute<'a>(
    ctx: &'a EngineContext,
    entity_id: &'a EntityId,
    metric: &'a Metric,
    users: &'a [UserId],
    options: &'a ComputeOptions,
) -> Pin<Box<dyn Future<Output = Result<HashMap<UserId, Instance>>> + Send + 'a>> {
    Box::pin(async move {
        if metric.level == Level::Component {
            return Err(AaeError::invalid_metric(
                "components are never top-level compute targets",
            ));
        }
        if ctx.cancellation.is_cancelled() {
            return Err(AaeError::Cancelled);
        }

        let entity = ctx.entities.get_entity(metric.level, entity_id).await?;
        let policy = make_policy(options, metric);
        let resolved =
            branch_loader::resolve_children(ctx, entity_id, &entity.children, metric, users)
                .await?;

        let child_level = metric
            .level
            .child_level()
            .ok_or_else(|| AaeError::invalid_metric("metric.level has no children"))?;

        if ctx.cancellation.is_cancelled() {
            return Err(AaeError::Cancelled);
        }

        let tagged = if child_level == Level::Component {
            let lesson_id = resolved.lesson_id.as_ref().ok_or_else(|| {
                AaeError::invariant("component-level branch resolved without a lesson id")
            })?;
            let component_metric = metric.submetric.as_ref().unwrap_or(&metric.name);
            component_loader::load(
                &ctx.events,
                component_metric,
                &resolved.ids,
                lesson_id,
                users,
                &policy,
            )
            .await?
        } else {
            branch_loader::load(ctx, &resolved.ids, child_level, metric, users, options).await?
        };

        let reduced = reducer::reduce(&tagged, metric, metric.level, entity_id, users, &ctx.rules)?;
        let weighted = weighter::weight(&reduced, metric, metric.level, entity_id, users)?;

        debug_assert_eq!(
            weighted.len(),
            users.len(),
            "user closure: output keys must equal the requested user set"
        );

        Ok(weighted)
    })
}
