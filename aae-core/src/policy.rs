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

//! Aggregation options and their per-level merge with metric overrides.

use crate::ids::TagId;
use crate::metric::{Metric, Multiples};
use std::collections::HashMap;

/// The outer bound supplied by the caller of `compute`. Stays fixed across
/// an entire call tree (each recursion level merges it afresh against that
/// level's own metric; it is never itself narrowed in place, per §4.7).
#[derive(Debug, Clone, Default)]
pub struct ComputeOptions {
    pub time_filter: Option<(u64, u64)>,
    pub multiples: Option<Multiples>,
    pub tag_weights: Option<HashMap<TagId, f64>>,
}

/// A fully merged, concrete policy for one recursion level.
#[derive(Debug, Clone)]
pub struct Policy {
    pub time_filter: (u64, u64),
    pub multiples: Multiples,
    pub tag_weights: Option<HashMap<TagId, f64>>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            time_filter: (0, u64::MAX),
            multiples: Multiples::default(),
            tag_weights: None,
        }
    }
}

/// `defaults -> options -> metric`, in that order. `tagWeights` is replaced
/// wholesale at each overlay; `timeFilter` is intersected (max of starts,
/// min of ends); `multiples` is replaced when the overlay specifies one.
pub fn make_policy(options: &ComputeOptions, metric: &Metric) -> Policy {
    let mut policy = Policy::default();

    if let Some(time_filter) = options.time_filter {
        policy.time_filter = time_filter;
    }
    if let Some(multiples) = options.multiples {
        policy.multiples = multiples;
    }
    if let Some(tag_weights) = &options.tag_weights {
        policy.tag_weights = Some(tag_weights.clone());
    }

    if let Some((c, d)) = metric.time_filter {
        let (a, b) = policy.time_filter;
        policy.time_filter = (a.max(c), b.min(d));
    }
    if let Some(multiples) = metric.multiples {
        policy.multiples = multiples;
    }
    if let Some(tag_weights) = &metric.tag_weights {
        policy.tag_weights = Some(tag_weights.clone());
    }

    policy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Coverage, Metric, RuleSpec};
    use crate::instance::Level;

    fn base_metric() -> Metric {
        Metric::new("m", Level::Lesson, RuleSpec::new("average", vec![]))
    }

    #[test]
    fn defaults_when_nothing_overlaid() {
        let policy = make_policy(&ComputeOptions::default(), &base_metric());
        assert_eq!(policy.time_filter, (0, u64::MAX));
        assert_eq!(policy.multiples, Multiples::Last);
        assert!(policy.tag_weights.is_none());
    }

    #[test]
    fn time_filter_intersects() {
        let options = ComputeOptions {
            time_filter: Some((100, 1000)),
            ..Default::default()
        };
        let mut metric = base_metric();
        metric.time_filter = Some((500, 2000));
        let policy = make_policy(&options, &metric);
        assert_eq!(policy.time_filter, (500, 1000));
    }

    #[test]
    fn metric_tag_weights_replace_options_wholesale() {
        let mut options_weights = HashMap::new();
        options_weights.insert(TagId::new("hw"), 1.0);
        let options = ComputeOptions {
            tag_weights: Some(options_weights),
            ..Default::default()
        };
        let mut metric = base_metric();
        let mut metric_weights = HashMap::new();
        metric_weights.insert(TagId::new("exam"), 3.0);
        metric.tag_weights = Some(metric_weights);

        let policy = make_policy(&options, &metric);
        let weights = policy.tag_weights.unwrap();
        assert!(weights.contains_key(&TagId::new("exam")));
        assert!(!weights.contains_key(&TagId::new("hw")));
        assert_eq!(weights.len(), 1);
    }

    #[test]
    fn metric_multiples_overrides_options() {
        let options = ComputeOptions {
            multiples: Some(Multiples::First),
            ..Default::default()
        };
        let mut metric = base_metric();
        metric.multiples = Some(Multiples::Max);
        let policy = make_policy(&options, &metric);
        assert_eq!(policy.multiples, Multiples::Max);
    }
}
