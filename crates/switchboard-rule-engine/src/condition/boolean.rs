//! `bool`: composes other conditions with `and`, `or` and `not`.

use super::{Condition, ConditionOptions};
use crate::constants::MAX_CONDITION_DEPTH;
use crate::knowledge::Knowledge;
use crate::registry::ConditionRegistry;
use crate::Result;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolOperator {
    /// Every sub-condition matches. Stops at the first failure.
    #[default]
    And,
    /// Some sub-condition matches. Only the first successful branch keeps
    /// its backreferences and results.
    Or,
    /// The conjunction of the sub-conditions fails. Output is never kept.
    Not,
}

impl BoolOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
            BoolOperator::Not => "not",
        }
    }
}

#[derive(Debug)]
pub struct BoolCondition {
    operator: BoolOperator,
    conditions: Vec<Box<dyn Condition>>,
}

impl BoolCondition {
    pub const KIND: &'static str = "bool";

    pub fn new(operator: BoolOperator, conditions: Vec<Box<dyn Condition>>) -> Self {
        Self {
            operator,
            conditions,
        }
    }

    pub fn operator(&self) -> BoolOperator {
        self.operator
    }

    pub fn conditions(&self) -> &[Box<dyn Condition>] {
        &self.conditions
    }

    /// Build from an option table, constructing sub-conditions through
    /// `registry`.
    pub fn from_options(registry: &ConditionRegistry, options: &Map<String, Value>) -> Result<Self> {
        let depth = nesting_depth(options);
        let mut opts = ConditionOptions::new(Self::KIND, options);

        if depth > MAX_CONDITION_DEPTH {
            return Err(opts.invalid(format!(
                "nested {depth} levels deep (maximum is {MAX_CONDITION_DEPTH})"
            )));
        }

        let operator = match opts.take_string("operator")?.as_deref() {
            None | Some("and") => BoolOperator::And,
            Some("or") => BoolOperator::Or,
            Some("not") => BoolOperator::Not,
            Some(other) => {
                return Err(opts.invalid(format!(
                    "unknown operator {other:?} (expected and, or or not)"
                )))
            }
        };

        let tables = match opts.take("conditions") {
            Some(Value::Array(tables)) if !tables.is_empty() => tables,
            Some(Value::Array(_)) | None => {
                return Err(opts.invalid("`conditions` must list at least one condition"))
            }
            Some(other) => {
                return Err(opts.invalid(format!("`conditions` must be an array, got {other}")))
            }
        };

        let conditions = tables
            .iter()
            .map(|table| match table {
                Value::Object(table) => registry.construct_table(table),
                other => Err(opts.invalid(format!("condition entries must be tables, got {other}"))),
            })
            .collect::<Result<Vec<_>>>()?;

        opts.finish()?;
        Ok(Self::new(operator, conditions))
    }

    fn all(&self, knowledge: &mut Knowledge) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.evaluate(knowledge)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Condition for BoolCondition {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn evaluate(&self, knowledge: &mut Knowledge) -> Result<bool> {
        match self.operator {
            BoolOperator::And => self.all(knowledge),
            BoolOperator::Or => {
                for condition in &self.conditions {
                    let savepoint = knowledge.savepoint();
                    if condition.evaluate(knowledge)? {
                        return Ok(true);
                    }
                    knowledge.rollback_to(savepoint);
                }
                Ok(false)
            }
            BoolOperator::Not => {
                let savepoint = knowledge.savepoint();
                let matched = self.all(knowledge);
                knowledge.rollback_to(savepoint);
                Ok(!matched?)
            }
        }
    }

    fn config(&self) -> Value {
        json!({
            "type": Self::KIND,
            "operator": self.operator.as_str(),
            "conditions": self.conditions.iter().map(|c| c.config()).collect::<Vec<_>>(),
        })
    }
}

/// Levels of `bool` nesting in an option table, counting the table itself.
fn nesting_depth(options: &Map<String, Value>) -> usize {
    let children = options
        .get("conditions")
        .and_then(Value::as_array)
        .map(|tables| {
            tables
                .iter()
                .filter_map(Value::as_object)
                .filter(|table| table.get("type").and_then(Value::as_str) == Some(BoolCondition::KIND))
                .map(nesting_depth)
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    children + 1
}
