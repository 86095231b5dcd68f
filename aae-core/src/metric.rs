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

//! Entity tree and metric configuration: the read-only structures the
//! surrounding CRUD surface owns and the engine only consumes.

use crate::ids::{EntityId, MetricName, TagId};
use crate::instance::Level;
use std::collections::HashMap;

/// Declarative child selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Coverage {
    All,
    Include(Vec<EntityId>),
    Exclude(Vec<EntityId>),
}

/// How to reconcile multiple events for the same (component, user, tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiples {
    Last,
    First,
    Max,
    PassThrough,
}

impl Default for Multiples {
    fn default() -> Self {
        Multiples::Last
    }
}

/// A positional argument to a rule invocation. Rules parse their own
/// argument list in the order their signature expects.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleArg {
    Number(f64),
    Text(String),
}

impl RuleArg {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuleArg::Number(n) => Some(*n),
            RuleArg::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RuleArg::Text(s) => Some(s),
            RuleArg::Number(_) => None,
        }
    }
}

/// The missing-data mode most rules accept as one of their positional
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMode {
    /// Impute `MISSING` as zero before computing.
    Zero,
    /// Drop missing instances from the input.
    Ignore,
}

impl MissingMode {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "zero" => Some(MissingMode::Zero),
            "ignore" => Some(MissingMode::Ignore),
            _ => None,
        }
    }
}

/// `[ruleName, ...args]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub name: String,
    pub args: Vec<RuleArg>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, args: Vec<RuleArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// One metric: how to aggregate at one entity level.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: MetricName,
    pub level: Level,
    pub coverage: Coverage,
    pub rule: RuleSpec,
    pub submetric: Option<MetricName>,
    pub tag_weights: Option<HashMap<TagId, f64>>,
    pub time_filter: Option<(u64, u64)>,
    pub multiples: Option<Multiples>,
    pub auto_compute: bool,
    pub visible_to_students: bool,
}

impl Metric {
    pub fn new(name: impl Into<MetricName>, level: Level, rule: RuleSpec) -> Self {
        Self {
            name: name.into(),
            level,
            coverage: Coverage::All,
            rule,
            submetric: None,
            tag_weights: None,
            time_filter: None,
            multiples: None,
            auto_compute: false,
            visible_to_students: false,
        }
    }
}

/// One node of the entity tree. `children` is `None` at the component
/// level (component membership is discovered by event query, not an owned
/// list).
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub level: Level,
    pub children: Option<Vec<EntityId>>,
    pub metrics: Vec<Metric>,
    pub tag: Option<TagId>,
}

impl Entity {
    pub fn metric_named(&self, name: &MetricName) -> Option<&Metric> {
        self.metrics.iter().find(|m| &m.name == name)
    }
}
