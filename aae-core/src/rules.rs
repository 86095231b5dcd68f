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

//! Rule catalog: pure reducers over instance arrays, dispatched by name.
//!
//! Every rule is a pure function `(instances[], ...args) -> score`; none of
//! them raise (an empty post-filter input always yields `MISSING` rather
//! than an error, per §8 "rule emptiness").

use crate::error::{AaeError, Result};
use crate::instance::{is_missing_score, Instance, Score, MISSING};
use crate::metric::{MissingMode, RuleArg};
use std::collections::HashMap;
use std::sync::Arc;

/// Informational metadata about a registered rule (never consulted during
/// scoring, only for introspection/listing), the way `Evaluator::metadata()`
/// describes an evaluator without affecting its result.
#[derive(Debug, Clone)]
pub struct RuleInfo {
    pub name: String,
    pub description: String,
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, instances: &[Instance], args: &[RuleArg]) -> Result<Score>;

    fn info(&self) -> RuleInfo {
        RuleInfo {
            name: self.name().to_string(),
            description: String::new(),
        }
    }
}

/// Scores present (non-missing) among `instances`, imputing zero for
/// missing ones under `MissingMode::Zero` or dropping them under
/// `MissingMode::Ignore`.
fn filter_scores(instances: &[Instance], mode: MissingMode) -> Vec<Score> {
    instances
        .iter()
        .filter_map(|inst| {
            if inst.is_missing() {
                match mode {
                    MissingMode::Zero => Some(0.0),
                    MissingMode::Ignore => None,
                }
            } else {
                Some(inst.score)
            }
        })
        .collect()
}

fn parse_missing_mode(args: &[RuleArg], index: usize, rule_name: &str) -> Result<MissingMode> {
    let raw = args
        .get(index)
        .and_then(|a| a.as_text())
        .ok_or_else(|| {
            AaeError::invalid_metric(format!(
                "rule `{}` expects a missing-data mode argument at position {}",
                rule_name, index
            ))
        })?;
    MissingMode::parse(raw).ok_or_else(|| {
        AaeError::invalid_metric(format!(
            "rule `{}` got unrecognized missing-data mode `{}`",
            rule_name, raw
        ))
    })
}

pub struct AverageRule;

impl Rule for AverageRule {
    fn name(&self) -> &str {
        "average"
    }

    fn apply(&self, instances: &[Instance], args: &[RuleArg]) -> Result<Score> {
        let mode = parse_missing_mode(args, 0, self.name())?;
        let scores = filter_scores(instances, mode);
        if scores.is_empty() {
            return Ok(MISSING);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    fn info(&self) -> RuleInfo {
        RuleInfo {
            name: self.name().to_string(),
            description: "arithmetic mean of present scores".to_string(),
        }
    }
}

pub struct DropLowestRule;

impl Rule for DropLowestRule {
    fn name(&self) -> &str {
        "dropLowest"
    }

    fn apply(&self, instances: &[Instance], args: &[RuleArg]) -> Result<Score> {
        let mode = parse_missing_mode(args, 0, self.name())?;
        let mut scores = filter_scores(instances, mode);
        if scores.is_empty() {
            return Ok(MISSING);
        }
        if scores.len() == 1 {
            return Ok(scores[0]);
        }
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
        scores.remove(0);
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    fn info(&self) -> RuleInfo {
        RuleInfo {
            name: self.name().to_string(),
            description: "mean after dropping the single smallest score".to_string(),
        }
    }
}

pub struct DropNLowestRule;

impl Rule for DropNLowestRule {
    fn name(&self) -> &str {
        "dropNLowest"
    }

    fn apply(&self, instances: &[Instance], args: &[RuleArg]) -> Result<Score> {
        let n = args.first().and_then(|a| a.as_number()).ok_or_else(|| {
            AaeError::invalid_metric("rule `dropNLowest` expects a numeric N as its first arg")
        })?;
        let n = n.max(0.0) as usize;
        let mode = parse_missing_mode(args, 1, self.name())?;
        let mut scores = filter_scores(instances, mode);
        if scores.is_empty() {
            return Ok(MISSING);
        }
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
        if scores.len() <= n {
            return Ok(*scores.last().unwrap());
        }
        let kept = &scores[n..];
        Ok(kept.iter().sum::<f64>() / kept.len() as f64)
    }

    fn info(&self) -> RuleInfo {
        RuleInfo {
            name: self.name().to_string(),
            description: "mean of the top `len-N` scores".to_string(),
        }
    }
}

pub struct BinaryProportionRule;

impl Rule for BinaryProportionRule {
    fn name(&self) -> &str {
        "binaryProportion"
    }

    fn apply(&self, instances: &[Instance], args: &[RuleArg]) -> Result<Score> {
        let mode = parse_missing_mode(args, 0, self.name())?;
        let scores = filter_scores(instances, mode);
        if scores.is_empty() {
            return Ok(MISSING);
        }
        let passing = scores.iter().filter(|&&s| s >= 50.0).count();
        Ok((passing as f64 / scores.len() as f64) * 100.0)
    }

    fn info(&self) -> RuleInfo {
        RuleInfo {
            name: self.name().to_string(),
            description: "proportion of scores >= 50, as a percentage".to_string(),
        }
    }
}

/// Missing-data mode is fixed to "ignore" for this rule (decay weighting
/// on an imputed zero would be meaningless).
pub struct DecayedAverageRule;

impl Rule for DecayedAverageRule {
    fn name(&self) -> &str {
        "decayedAverage"
    }

    fn apply(&self, instances: &[Instance], args: &[RuleArg]) -> Result<Score> {
        let deadline = args.first().and_then(|a| a.as_number()).ok_or_else(|| {
            AaeError::invalid_metric("rule `decayedAverage` expects a numeric deadline")
        })?;
        let halving = args.get(1).and_then(|a| a.as_number()).ok_or_else(|| {
            AaeError::invalid_metric("rule `decayedAverage` expects a numeric halving period")
        })?;
        let cap = args.get(2).and_then(|a| a.as_number()).unwrap_or(f64::INFINITY);

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for inst in instances {
            if inst.is_missing() {
                continue;
            }
            let time = inst.time.unwrap_or(0) as f64;
            let minutes_late = ((time - deadline) / 60_000.0).max(0.0);
            let minutes_late = minutes_late.min(cap);
            let decay = 2f64.powf(-minutes_late / halving);
            weighted_sum += inst.score * decay;
            weight_total += decay;
        }
        if weight_total == 0.0 {
            return Ok(MISSING);
        }
        Ok(weighted_sum / weight_total)
    }

    fn info(&self) -> RuleInfo {
        RuleInfo {
            name: self.name().to_string(),
            description: "average weighted by exponential decay past a deadline".to_string(),
        }
    }
}

/// Registry keyed by string. Built with the five required rules; hosts can
/// `register` additional ones by name, never by subclassing.
pub struct RuleCatalog {
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl RuleCatalog {
    pub fn with_builtins() -> Self {
        let mut catalog = Self {
            rules: HashMap::new(),
        };
        catalog.register(Arc::new(AverageRule));
        catalog.register(Arc::new(DropLowestRule));
        catalog.register(Arc::new(DropNLowestRule));
        catalog.register(Arc::new(BinaryProportionRule));
        catalog.register(Arc::new(DecayedAverageRule));
        catalog
    }

    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        self.rules.insert(rule.name().to_string(), rule);
    }

    pub fn describe(&self) -> Vec<RuleInfo> {
        let mut infos: Vec<_> = self.rules.values().map(|r| r.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Look up a rule by name. An empty name falls back to `average`
    /// (§4.2); any other unrecognized name is a fatal `UnknownRule` per the
    /// error-handling contract.
    pub fn dispatch(&self, rule_name: &str) -> Result<Arc<dyn Rule>> {
        let lookup_name = if rule_name.is_empty() {
            "average"
        } else {
            rule_name
        };
        self.rules
            .get(lookup_name)
            .cloned()
            .ok_or_else(|| AaeError::UnknownRule(rule_name.to_string()))
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

pub fn missing_score() -> Score {
    MISSING
}

pub fn is_missing(score: Score) -> bool {
    is_missing_score(score)
}
