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

//! Persistence contracts the engine consumes. Concrete implementations
//! live outside this crate in production; `test-support` ships in-memory
//! ones so the engine's own test suite (and a host CLI) doesn't need a
//! real document store to exercise `compute`.

use crate::error::Result;
use crate::event::{AssessmentEvent, EventFilter, SortDirection};
use crate::ids::{EntityId, UserId};
use crate::instance::{Instance, Level};
use crate::metric::Entity;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_entity(&self, level: Level, id: &EntityId) -> Result<Entity>;
}

#[async_trait]
pub trait RawEventStore: Send + Sync {
    /// Distinct components appearing in events for `lesson`, optionally
    /// scoped to `users`.
    async fn list_child_components(
        &self,
        lesson: &EntityId,
        users: Option<&[UserId]>,
    ) -> Result<Vec<EntityId>>;

    async fn query_events(
        &self,
        filter: &EventFilter,
        sort: SortDirection,
    ) -> Result<Vec<AssessmentEvent>>;
}

/// A user's persisted aggregate map, keyed `"<level>-<entityId>-<metricName>"`.
#[derive(Debug, Clone, Default)]
pub struct UserCompletions {
    pub user: UserId,
    pub completions: HashMap<String, Instance>,
}

impl UserCompletions {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            completions: HashMap::new(),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load_user(&self, user: &UserId) -> Result<UserCompletions>;
    async fn save_user(&self, user: &UserCompletions) -> Result<()>;
}

pub fn completions_key(level: Level, entity: &EntityId, metric_name: &str) -> String {
    format!("{}-{}-{}", level_str(level), entity, metric_name)
}

pub fn level_str(level: Level) -> &'static str {
    match level {
        Level::Component => "component",
        Level::Lesson => "lesson",
        Level::Namespace => "namespace",
        Level::Program => "program",
        Level::Global => "global",
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod memory {
    use super::*;
    use crate::error::AaeError;
    use parking_lot::RwLock;
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// In-memory `EntityStore` backed by a plain map, keyed `(level, id)`.
    #[derive(Default)]
    pub struct InMemoryEntityStore {
        entities: RwLock<StdHashMap<(Level, EntityId), Entity>>,
    }

    impl InMemoryEntityStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, entity: Entity) {
            self.entities
                .write()
                .insert((entity.level, entity.id.clone()), entity);
        }
    }

    #[async_trait]
    impl EntityStore for InMemoryEntityStore {
        async fn get_entity(&self, level: Level, id: &EntityId) -> Result<Entity> {
            self.entities
                .read()
                .get(&(level, id.clone()))
                .cloned()
                .ok_or_else(|| {
                    AaeError::Persistence(format!("no entity {:?}/{} ", level, id))
                })
        }
    }

    /// In-memory `RawEventStore`. Events are appended in call order; the
    /// append index is used as the `sequence` tie-break.
    #[derive(Default)]
    pub struct InMemoryEventStore {
        events: RwLock<Vec<AssessmentEvent>>,
        next_sequence: AtomicU64,
    }

    impl InMemoryEventStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, mut event: AssessmentEvent) {
            event.sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            self.events.write().push(event);
        }
    }

    #[async_trait]
    impl RawEventStore for InMemoryEventStore {
        async fn list_child_components(
            &self,
            lesson: &EntityId,
            users: Option<&[UserId]>,
        ) -> Result<Vec<EntityId>> {
            let events = self.events.read();
            let mut seen = Vec::new();
            for event in events.iter() {
                if &event.lesson != lesson {
                    continue;
                }
                if let Some(users) = users {
                    if !users.contains(&event.user) {
                        continue;
                    }
                }
                if !seen.contains(&event.component) {
                    seen.push(event.component.clone());
                }
            }
            Ok(seen)
        }

        async fn query_events(
            &self,
            filter: &EventFilter,
            sort: SortDirection,
        ) -> Result<Vec<AssessmentEvent>> {
            let events = self.events.read();
            let mut matched: Vec<AssessmentEvent> = events
                .iter()
                .filter(|e| {
                    e.lesson == filter.lesson
                        && filter.components.contains(&e.component)
                        && filter.users.contains(&e.user)
                        && e.time >= filter.time_range.0
                        && e.time <= filter.time_range.1
                        && e.metric_name == filter.metric_name
                })
                .cloned()
                .collect();
            match sort {
                SortDirection::Ascending => {
                    matched.sort_by_key(|e| (e.time, e.sequence));
                }
                SortDirection::Descending => {
                    matched.sort_by_key(|e| std::cmp::Reverse((e.time, e.sequence)));
                }
            }
            Ok(matched)
        }
    }

    /// In-memory `UserStore`.
    #[derive(Default)]
    pub struct InMemoryUserStore {
        users: RwLock<StdHashMap<UserId, UserCompletions>>,
    }

    impl InMemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn snapshot(&self, user: &UserId) -> Option<UserCompletions> {
            self.users.read().get(user).cloned()
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn load_user(&self, user: &UserId) -> Result<UserCompletions> {
            Ok(self
                .users
                .read()
                .get(user)
                .cloned()
                .unwrap_or_else(|| UserCompletions::new(user.clone())))
        }

        async fn save_user(&self, completions: &UserCompletions) -> Result<()> {
            self.users
                .write()
                .insert(completions.user.clone(), completions.clone());
            Ok(())
        }
    }

    pub fn arc_entity_store() -> Arc<InMemoryEntityStore> {
        Arc::new(InMemoryEntityStore::new())
    }

    pub fn arc_event_store() -> Arc<InMemoryEventStore> {
        Arc::new(InMemoryEventStore::new())
    }

    pub fn arc_user_store() -> Arc<InMemoryUserStore> {
        Arc::new(InMemoryUserStore::new())
    }
}
