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

//! Dependency cache (§4.9): maps `(lessonId, componentMetric)` to the list
//! of auto-compute plans a component-level event must trigger, and keeps
//! that forest in sync as metrics are edited.

use crate::contracts::{completions_key, UserCompletions};
use crate::error::Result;
use crate::ids::{EntityId, MetricName, UserId};
use crate::instance::{Instance, Level};
use crate::metric::Metric;
use crate::orchestrator::{compute, EngineContext};
use crate::policy::ComputeOptions;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub enum Plan {
    LessonOnly {
        lesson_id: EntityId,
        lesson_metric: Metric,
    },
    NamespaceOnly {
        namespace_id: EntityId,
        namespace_metric: Metric,
    },
    Dual {
        namespace_id: EntityId,
        namespace_metric: Metric,
        lesson_id: EntityId,
        lesson_metric: Metric,
    },
}

impl Plan {
    fn persisted_keys(&self) -> Vec<String> {
        match self {
            Plan::LessonOnly {
                lesson_id,
                lesson_metric,
            } => vec![completions_key(Level::Lesson, lesson_id, lesson_metric.name.as_str())],
            Plan::NamespaceOnly {
                namespace_id,
                namespace_metric,
            } => vec![completions_key(
                Level::Namespace,
                namespace_id,
                namespace_metric.name.as_str(),
            )],
            Plan::Dual {
                namespace_id,
                namespace_metric,
                lesson_id,
                lesson_metric,
            } => vec![
                completions_key(Level::Namespace, namespace_id, namespace_metric.name.as_str()),
                completions_key(Level::Lesson, lesson_id, lesson_metric.name.as_str()),
            ],
        }
    }
}

fn forest_key(lesson_id: &EntityId, component_metric: &MetricName) -> String {
    format!("{}-{}", lesson_id, component_metric)
}

/// Collects the lesson metrics that consume `component_metric`, and for
/// each one the auto-compute namespace metrics that in turn consume it
/// (§4.9 construction rules 1-3).
async fn build_plans(
    ctx: &EngineContext,
    component_metric: &MetricName,
    lesson_id: &EntityId,
    namespace_id: &EntityId,
) -> Result<Vec<Plan>> {
    let lesson_entity = ctx.entities.get_entity(Level::Lesson, lesson_id).await?;
    let namespace_entity = ctx.entities.get_entity(Level::Namespace, namespace_id).await?;

    let lesson_metrics: Vec<&Metric> = lesson_entity
        .metrics
        .iter()
        .filter(|m| m.submetric.as_ref() == Some(component_metric))
        .collect();

    let mut plans = Vec::new();
    for lesson_metric in lesson_metrics {
        let namespace_metrics: Vec<&Metric> = namespace_entity
            .metrics
            .iter()
            .filter(|m| m.submetric.as_ref() == Some(&lesson_metric.name) && m.auto_compute)
            .collect();

        if namespace_metrics.is_empty() {
            if lesson_metric.auto_compute {
                plans.push(Plan::LessonOnly {
                    lesson_id: lesson_id.clone(),
                    lesson_metric: lesson_metric.clone(),
                });
            }
            continue;
        }

        for namespace_metric in namespace_metrics {
            if lesson_metric.auto_compute {
                plans.push(Plan::Dual {
                    namespace_id: namespace_id.clone(),
                    namespace_metric: namespace_metric.clone(),
                    lesson_id: lesson_id.clone(),
                    lesson_metric: lesson_metric.clone(),
                });
            } else {
                plans.push(Plan::NamespaceOnly {
                    namespace_id: namespace_id.clone(),
                    namespace_metric: namespace_metric.clone(),
                });
            }
        }
    }
    Ok(plans)
}

/// Process-wide mutable forest of plans plus the index of persisted
/// completion keys currently backed by some plan. Per-key access is
/// serialized by `DashMap`'s own sharded locking; `index` takes a short
/// exclusive lock for the whole-cache bookkeeping it needs.
#[derive(Default)]
pub struct DependencyCache {
    forest: DashMap<String, Vec<Plan>>,
    index: RwLock<HashSet<String>>,
    reverse_index: DashMap<String, HashSet<String>>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_build_plans(
        &self,
        ctx: &EngineContext,
        component_metric: &MetricName,
        lesson_id: &EntityId,
        namespace_id: &EntityId,
    ) -> Result<Vec<Plan>> {
        let key = forest_key(lesson_id, component_metric);
        if let Some(plans) = self.forest.get(&key) {
            return Ok(plans.clone());
        }
        let plans = build_plans(ctx, component_metric, lesson_id, namespace_id).await?;
        self.forest.insert(key, plans.clone());
        Ok(plans)
    }

    /// Runs every plan affecting `(componentMetric, lesson, namespace)` for
    /// `user`, persists each result under its completions key, and saves
    /// the user's updated completions map once at the end.
    pub async fn update_auto_computes(
        &self,
        ctx: &EngineContext,
        user: &UserId,
        component_metric: &MetricName,
        lesson_id: &EntityId,
        namespace_id: &EntityId,
    ) -> Result<UserCompletions> {
        let plans = self
            .get_or_build_plans(ctx, component_metric, lesson_id, namespace_id)
            .await?;
        let fk = forest_key(lesson_id, component_metric);
        let users = [user.clone()];
        let mut completions = ctx.users.load_user(user).await?;

        for plan in &plans {
            match plan {
                Plan::LessonOnly {
                    lesson_id,
                    lesson_metric,
                } => {
                    let result = compute(
                        ctx,
                        lesson_id,
                        lesson_metric,
                        &users,
                        &ComputeOptions::default(),
                    )
                    .await?;
                    let instance = result.get(user).cloned().ok_or_else(|| {
                        crate::error::AaeError::invariant(
                            "compute did not return every requested user",
                        )
                    })?;
                    let key = completions_key(Level::Lesson, lesson_id, lesson_metric.name.as_str());
                    completions.completions.insert(key, instance);
                }
                Plan::NamespaceOnly {
                    namespace_id,
                    namespace_metric,
                } => {
                    let result = compute(
                        ctx,
                        namespace_id,
                        namespace_metric,
                        &users,
                        &ComputeOptions::default(),
                    )
                    .await?;
                    let instance = result.get(user).cloned().ok_or_else(|| {
                        crate::error::AaeError::invariant(
                            "compute did not return every requested user",
                        )
                    })?;
                    let key = completions_key(
                        Level::Namespace,
                        namespace_id,
                        namespace_metric.name.as_str(),
                    );
                    completions.completions.insert(key, instance);
                }
                Plan::Dual {
                    namespace_id,
                    namespace_metric,
                    lesson_id,
                    lesson_metric,
                } => {
                    let result = compute(
                        ctx,
                        namespace_id,
                        namespace_metric,
                        &users,
                        &ComputeOptions::default(),
                    )
                    .await?;
                    let namespace_instance = result.get(user).cloned().ok_or_else(|| {
                        crate::error::AaeError::invariant(
                            "compute did not return every requested user",
                        )
                    })?;

                    let lesson_instance = find_lesson_child(&namespace_instance, lesson_id);

                    let ns_key = completions_key(
                        Level::Namespace,
                        namespace_id,
                        namespace_metric.name.as_str(),
                    );
                    completions.completions.insert(ns_key, namespace_instance);

                    if let Some(lesson_instance) = lesson_instance {
                        let lesson_key =
                            completions_key(Level::Lesson, lesson_id, lesson_metric.name.as_str());
                        completions.completions.insert(lesson_key, lesson_instance);
                    }
                }
            }

            for persisted_key in plan.persisted_keys() {
                self.index.write().insert(persisted_key.clone());
                self.reverse_index
                    .entry(persisted_key)
                    .or_default()
                    .insert(fk.clone());
            }
        }

        ctx.users.save_user(&completions).await?;
        Ok(completions)
    }

    /// Invalidates or rebuilds the forest entries affected by a metric
    /// edit. Both outcomes reduce to evicting the stale forest entry so the
    /// next `get_or_build_plans` recomputes from current entity/metric
    /// state; invalidation additionally drops the now-stale keys from
    /// `index`.
    pub async fn update_dependency_cache(
        &self,
        ctx: &EngineContext,
        level: Level,
        entity_id: &EntityId,
        metric_name: &MetricName,
        auto_compute: Option<bool>,
        container_auto_compute: Option<bool>,
    ) -> Result<()> {
        let key = completions_key(level, entity_id, metric_name.as_str());

        if auto_compute == Some(false) && self.index.read().contains(&key) {
            if let Some((_, forest_keys)) = self.reverse_index.remove(&key) {
                for fk in &forest_keys {
                    if let Some((_, plans)) = self.forest.remove(fk) {
                        for plan in &plans {
                            for pk in plan.persisted_keys() {
                                self.index.write().remove(&pk);
                                self.reverse_index.remove(&pk);
                            }
                        }
                    }
                }
                info!(key = %key, forest_keys_removed = forest_keys.len(), "dependency cache: invalidated");
            } else {
                self.index.write().remove(&key);
            }
            return Ok(());
        }

        if auto_compute == Some(true) || container_auto_compute == Some(true) {
            match level {
                Level::Lesson => {
                    let lesson_entity = ctx.entities.get_entity(Level::Lesson, entity_id).await?;
                    if let Some(lesson_metric) = lesson_entity.metric_named(metric_name) {
                        if let Some(component_metric) = &lesson_metric.submetric {
                            let fk = forest_key(entity_id, component_metric);
                            self.forest.remove(&fk);
                            info!(key = %fk, "dependency cache: rebuilding lesson tree");
                        }
                    }
                }
                Level::Namespace => {
                    let namespace_entity =
                        ctx.entities.get_entity(Level::Namespace, entity_id).await?;
                    if let Some(namespace_metric) = namespace_entity.metric_named(metric_name) {
                        if let Some(target_name) = &namespace_metric.submetric {
                            if let Some(lesson_ids) = &namespace_entity.children {
                                for lesson_id in lesson_ids {
                                    let lesson_entity =
                                        ctx.entities.get_entity(Level::Lesson, lesson_id).await?;
                                    for lesson_metric in &lesson_entity.metrics {
                                        if &lesson_metric.name == target_name {
                                            if let Some(component_metric) = &lesson_metric.submetric
                                            {
                                                let fk = forest_key(lesson_id, component_metric);
                                                self.forest.remove(&fk);
                                                info!(key = %fk, "dependency cache: rebuilding namespace tree");
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Introspection for tests: the number of distinct forest entries
    /// currently cached.
    #[cfg(any(test, feature = "test-support"))]
    pub fn forest_len(&self) -> usize {
        self.forest.len()
    }

    /// Introspection for tests: whether a persisted completions key is
    /// currently tracked by the cache.
    #[cfg(any(test, feature = "test-support"))]
    pub fn index_contains(&self, key: &str) -> bool {
        self.index.read().contains(key)
    }
}

fn find_lesson_child(namespace_instance: &Instance, lesson_id: &EntityId) -> Option<Instance> {
    namespace_instance
        .provenance
        .as_ref()?
        .iter()
        .find(|inst| &inst.entity == lesson_id)
        .cloned()
}

pub fn arc_cache() -> Arc<DependencyCache> {
    Arc::new(DependencyCache::new())
}
