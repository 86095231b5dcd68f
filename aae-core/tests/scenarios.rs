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

//! End-to-end scenarios S2, S3, S5, S7, S8 from the testable-properties
//! catalog. S1, S4 and S6 live alongside the orchestrator itself.

use aae_core::memory::{arc_entity_store, arc_event_store, arc_user_store};
use aae_core::{
    compute, AssessmentEvent, ComputeOptions, Coverage, DependencyCache, EngineContext, Entity,
    EntityId, Level, Metric, MetricName, Multiples, RuleArg, RuleCatalog, RuleSpec, TagId, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;

fn event(user: &str, component: &str, score: f64, time: u64, tag: Option<&str>) -> AssessmentEvent {
    AssessmentEvent {
        user: UserId::new(user),
        lesson: EntityId::new("L"),
        component: EntityId::new(component),
        component_type: None,
        metric_name: MetricName::new("score"),
        score,
        time,
        tag: tag.map(TagId::new),
        sequence: 0,
    }
}

fn new_ctx(
    entities: Arc<dyn aae_core::EntityStore>,
    events: Arc<dyn aae_core::RawEventStore>,
    users: Arc<dyn aae_core::UserStore>,
) -> EngineContext {
    EngineContext::new(entities, events, users, Arc::new(RuleCatalog::with_builtins()), 8)
}

#[tokio::test]
async fn s2_pass_through_with_drop_lowest() {
    let entities = arc_entity_store();
    let events = arc_event_store();
    let users = arc_user_store();
    entities.insert(Entity {
        id: EntityId::new("L"),
        level: Level::Lesson,
        children: Some(vec![EntityId::new("compX")]),
        metrics: vec![],
        tag: None,
    });
    events.push(event("u1", "compX", 60.0, 100, None));
    events.push(event("u1", "compX", 90.0, 200, None));
    events.push(event("u1", "compX", 40.0, 300, None));

    let ctx = new_ctx(entities, events, users);
    let metric = Metric {
        submetric: Some(MetricName::new("score")),
        multiples: Some(Multiples::PassThrough),
        ..Metric::new(
            "m",
            Level::Lesson,
            RuleSpec::new("dropLowest", vec![RuleArg::Text("zero".into())]),
        )
    };
    let users = vec![UserId::new("u1")];
    let result = compute(&ctx, &EntityId::new("L"), &metric, &users, &ComputeOptions::default())
        .await
        .unwrap();
    // (60 + 90) / 2 = 75 after dropping the lowest (40).
    assert_eq!(result[&UserId::new("u1")].score, 75.0);
}

#[tokio::test]
async fn s3_two_tag_weighted_average() {
    let entities = arc_entity_store();
    let events = arc_event_store();
    let users = arc_user_store();
    entities.insert(Entity {
        id: EntityId::new("L"),
        level: Level::Lesson,
        children: Some(vec![EntityId::new("compHw"), EntityId::new("compExam")]),
        metrics: vec![],
        tag: None,
    });
    events.push(event("u1", "compHw", 80.0, 1_000, Some("hw")));
    events.push(event("u1", "compExam", 60.0, 1_500, Some("exam")));

    let ctx = new_ctx(entities, events, users);
    let mut metric = Metric {
        submetric: Some(MetricName::new("score")),
        ..Metric::new(
            "m",
            Level::Lesson,
            RuleSpec::new("average", vec![RuleArg::Text("ignore".into())]),
        )
    };
    metric.tag_weights = Some(HashMap::from([
        (TagId::new("hw"), 1.0),
        (TagId::new("exam"), 3.0),
    ]));
    let users = vec![UserId::new("u1")];
    let result = compute(&ctx, &EntityId::new("L"), &metric, &users, &ComputeOptions::default())
        .await
        .unwrap();
    assert_eq!(result[&UserId::new("u1")].score, 65.0);
}

fn s5_lesson_metric() -> Metric {
    Metric {
        submetric: Some(MetricName::new("score")),
        auto_compute: true,
        ..Metric::new(
            "M_L",
            Level::Lesson,
            RuleSpec::new("average", vec![RuleArg::Text("ignore".into())]),
        )
    }
}

fn s5_namespace_metric() -> Metric {
    Metric {
        submetric: Some(MetricName::new("M_L")),
        auto_compute: true,
        ..Metric::new(
            "M_N",
            Level::Namespace,
            RuleSpec::new("average", vec![RuleArg::Text("ignore".into())]),
        )
    }
}

fn s5_setup() -> (
    Arc<dyn aae_core::EntityStore>,
    Arc<dyn aae_core::RawEventStore>,
    Arc<dyn aae_core::UserStore>,
) {
    let entities = arc_entity_store();
    let events = arc_event_store();
    let users = arc_user_store();
    entities.insert(Entity {
        id: EntityId::new("L"),
        level: Level::Lesson,
        children: Some(vec![EntityId::new("compX")]),
        metrics: vec![s5_lesson_metric()],
        tag: None,
    });
    entities.insert(Entity {
        id: EntityId::new("N"),
        level: Level::Namespace,
        children: Some(vec![EntityId::new("L")]),
        metrics: vec![s5_namespace_metric()],
        tag: None,
    });
    events.push(event("u1", "compX", 100.0, 1_000, None));
    (entities, events, users)
}

#[tokio::test]
async fn s5_namespace_autocompute_propagation() {
    let (entities, events, users) = s5_setup();
    let ctx = new_ctx(entities, events, users);
    let cache = DependencyCache::new();

    let completions = cache
        .update_auto_computes(
            &ctx,
            &UserId::new("u1"),
            &MetricName::new("score"),
            &EntityId::new("L"),
            &EntityId::new("N"),
        )
        .await
        .unwrap();

    let lesson_key = aae_core::completions_key(Level::Lesson, &EntityId::new("L"), "M_L");
    let namespace_key = aae_core::completions_key(Level::Namespace, &EntityId::new("N"), "M_N");
    assert!(completions.completions.contains_key(&lesson_key));
    assert!(completions.completions.contains_key(&namespace_key));

    let lesson_instance = &completions.completions[&lesson_key];
    let namespace_instance = &completions.completions[&namespace_key];
    let found_in_provenance = namespace_instance
        .provenance
        .as_ref()
        .unwrap()
        .iter()
        .find(|i| i.entity == EntityId::new("L"))
        .unwrap();
    assert_eq!(found_in_provenance.score, lesson_instance.score);
}

#[tokio::test]
async fn s7_invalidation_removes_dual_plan() {
    let (entities, events, users) = s5_setup();
    let ctx = new_ctx(entities.clone(), events, users);
    let cache = DependencyCache::new();

    cache
        .update_auto_computes(
            &ctx,
            &UserId::new("u1"),
            &MetricName::new("score"),
            &EntityId::new("L"),
            &EntityId::new("N"),
        )
        .await
        .unwrap();

    let lesson_key = aae_core::completions_key(Level::Lesson, &EntityId::new("L"), "M_L");
    let namespace_key = aae_core::completions_key(Level::Namespace, &EntityId::new("N"), "M_N");
    assert!(cache.index_contains(&namespace_key));
    assert!(cache.index_contains(&lesson_key));
    assert_eq!(cache.forest_len(), 1);

    // Flip M_N.autoCompute to false on the stored entity, then invalidate.
    let mut namespace_entity = entities
        .get_entity(Level::Namespace, &EntityId::new("N"))
        .await
        .unwrap();
    namespace_entity.metrics[0].auto_compute = false;
    entities.insert(namespace_entity);

    cache
        .update_dependency_cache(
            &ctx,
            Level::Namespace,
            &EntityId::new("N"),
            &MetricName::new("M_N"),
            Some(false),
            None,
        )
        .await
        .unwrap();

    assert_eq!(cache.forest_len(), 0);
    assert!(!cache.index_contains(&namespace_key));
    assert!(!cache.index_contains(&lesson_key));
}

#[tokio::test]
async fn s8_rebuild_on_newly_autocompute_lesson_metric() {
    let entities = arc_entity_store();
    let events = arc_event_store();
    let users = arc_user_store();
    let mut lesson_metric = s5_lesson_metric();
    lesson_metric.auto_compute = false;
    entities.insert(Entity {
        id: EntityId::new("L"),
        level: Level::Lesson,
        children: Some(vec![EntityId::new("compX")]),
        metrics: vec![lesson_metric],
        tag: None,
    });
    entities.insert(Entity {
        id: EntityId::new("N"),
        level: Level::Namespace,
        children: Some(vec![EntityId::new("L")]),
        metrics: vec![],
        tag: None,
    });
    events.push(event("u1", "compX", 100.0, 1_000, None));

    let ctx = new_ctx(entities.clone(), events, users);
    let cache = DependencyCache::new();

    // Plan built with autoCompute=false yields no plans at all yet.
    let plans = cache
        .get_or_build_plans(
            &ctx,
            &MetricName::new("score"),
            &EntityId::new("L"),
            &EntityId::new("N"),
        )
        .await
        .unwrap();
    assert!(plans.is_empty());

    let mut lesson_entity = entities.get_entity(Level::Lesson, &EntityId::new("L")).await.unwrap();
    lesson_entity.metrics[0].auto_compute = true;
    entities.insert(lesson_entity);

    cache
        .update_dependency_cache(
            &ctx,
            Level::Lesson,
            &EntityId::new("L"),
            &MetricName::new("M_L"),
            Some(true),
            None,
        )
        .await
        .unwrap();

    let rebuilt = cache
        .get_or_build_plans(
            &ctx,
            &MetricName::new("score"),
            &EntityId::new("L"),
            &EntityId::new("N"),
        )
        .await
        .unwrap();
    assert_eq!(rebuilt.len(), 1);
}
