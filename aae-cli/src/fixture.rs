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

//! A small in-memory fixture the demo commands run against: one namespace
//! containing one lesson with two tagged components, wired so both the
//! lesson and namespace metrics are auto-computed.

use aae_core::memory::{arc_entity_store, arc_event_store, arc_user_store, InMemoryEntityStore, InMemoryEventStore, InMemoryUserStore};
use aae_core::{AssessmentEvent, Coverage, Entity, EntityId, Level, Metric, MetricName, RuleArg, RuleSpec, TagId, UserId};
use std::collections::HashMap;
use std::sync::Arc;

pub const LESSON_ID: &str = "lesson-1";
pub const NAMESPACE_ID: &str = "namespace-1";
pub const COMPONENT_METRIC: &str = "score";
pub const LESSON_METRIC: &str = "lessonAvg";
pub const NAMESPACE_METRIC: &str = "namespaceAvg";

pub struct Fixture {
    pub entities: Arc<InMemoryEntityStore>,
    pub events: Arc<InMemoryEventStore>,
    pub users: Arc<InMemoryUserStore>,
}

pub fn build() -> Fixture {
    let entities = arc_entity_store();
    let events = arc_event_store();
    let users = arc_user_store();

    let lesson_metric = Metric {
        submetric: Some(MetricName::new(COMPONENT_METRIC)),
        coverage: Coverage::All,
        tag_weights: Some(HashMap::from([
            (TagId::new("hw"), 1.0),
            (TagId::new("exam"), 3.0),
        ])),
        auto_compute: true,
        visible_to_students: true,
        ..Metric::new(
            LESSON_METRIC,
            Level::Lesson,
            RuleSpec::new("average", vec![RuleArg::Text("ignore".into())]),
        )
    };
    entities.insert(Entity {
        id: EntityId::new(LESSON_ID),
        level: Level::Lesson,
        children: Some(vec![EntityId::new("comp-hw"), EntityId::new("comp-exam")]),
        metrics: vec![lesson_metric],
        tag: None,
    });

    let namespace_metric = Metric {
        submetric: Some(MetricName::new(LESSON_METRIC)),
        auto_compute: true,
        visible_to_students: true,
        ..Metric::new(
            NAMESPACE_METRIC,
            Level::Namespace,
            RuleSpec::new("average", vec![RuleArg::Text("ignore".into())]),
        )
    };
    entities.insert(Entity {
        id: EntityId::new(NAMESPACE_ID),
        level: Level::Namespace,
        children: Some(vec![EntityId::new(LESSON_ID)]),
        metrics: vec![namespace_metric],
        tag: None,
    });

    events.push(AssessmentEvent {
        user: UserId::new("u1"),
        lesson: EntityId::new(LESSON_ID),
        component: EntityId::new("comp-hw"),
        component_type: Some("homework".to_string()),
        metric_name: MetricName::new(COMPONENT_METRIC),
        score: 80.0,
        time: 1_000,
        tag: Some(TagId::new("hw")),
        sequence: 0,
    });
    events.push(AssessmentEvent {
        user: UserId::new("u1"),
        lesson: EntityId::new(LESSON_ID),
        component: EntityId::new("comp-exam"),
        component_type: Some("exam".to_string()),
        metric_name: MetricName::new(COMPONENT_METRIC),
        score: 60.0,
        time: 2_000,
        tag: Some(TagId::new("exam")),
        sequence: 0,
    });

    Fixture {
        entities,
        events,
        users,
    }
}
