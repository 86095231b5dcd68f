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

//! Newtype identifiers for the engine's string-keyed maps.
//!
//! The source keeps users, entities, tags and metric names as bare strings in
//! dynamic maps; that invites key confusion once four different map shapes
//! share the same underlying type. We keep each identifier distinct at the
//! type level instead (§9 design note).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(UserId);
string_id!(EntityId);
string_id!(TagId);
string_id!(MetricName);

/// Reserved sentinel tag used when an event or entity carries no explicit tag.
///
/// Instances never serialize this value in their `tag` field: downstream
/// code distinguishes "explicitly tagged" from "default tag" by the
/// `Option` being `None`, never by comparing strings against this sentinel.
pub const DEFAULT_TAG: &str = "_default_tag";

pub fn default_tag() -> TagId {
    TagId::new(DEFAULT_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tag_is_stable() {
        assert_eq!(default_tag().as_str(), DEFAULT_TAG);
    }

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(UserId::new("u1"), UserId::from("u1"));
        assert_ne!(UserId::new("u1"), UserId::new("u2"));
    }
}
