//! A rule: ordered conditions guarding ordered actions.

use crate::action::{Action, RuleAction};
use crate::condition::Condition;
use crate::hooks::{Hooks, RuleEvent};
use crate::knowledge::Knowledge;
use crate::{Result, RuleError};
use serde_json::{json, Value};
use tracing::{debug, trace};

#[derive(Debug)]
pub struct Rule {
    name: String,
    description: Option<String>,
    priority: i64,
    conditions: Vec<Box<dyn Condition>>,
    actions: Vec<RuleAction>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            priority: 0,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Ordering weight used when loading rule tables (higher first).
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn condition(mut self, condition: impl Condition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    pub fn boxed_condition(mut self, condition: Box<dyn Condition>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Append a closure or other [`Action`].
    pub fn then(self, action: impl Action + 'static) -> Self {
        self.action(RuleAction::custom(action))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get_priority(&self) -> i64 {
        self.priority
    }

    pub fn conditions(&self) -> &[Box<dyn Condition>] {
        &self.conditions
    }

    pub fn actions(&self) -> &[RuleAction] {
        &self.actions
    }

    /// Attempt the rule against `knowledge`.
    ///
    /// 1. A rule without conditions never matches.
    /// 2. Conditions run in order inside a fresh transaction. The first
    ///    non-match or error rolls the transaction back.
    /// 3. Observers get `rule.process.succeeded`; then every veto must
    ///    approve, or the transaction is rolled back.
    /// 4. The transaction is committed and fact extractors run.
    /// 5. Actions run in order with this attempt's backreferences.
    /// 6. Observers get `rule.action.executed`.
    pub fn execute(&self, knowledge: &mut Knowledge, hooks: &Hooks) -> Result<bool> {
        self.attempt(knowledge, hooks, true)
    }

    pub(crate) fn attempt(
        &self,
        knowledge: &mut Knowledge,
        hooks: &Hooks,
        clear_extractors: bool,
    ) -> Result<bool> {
        if self.conditions.is_empty() {
            trace!(rule = %self.name, "rule has no conditions");
            return Ok(false);
        }

        knowledge.begin();
        for condition in &self.conditions {
            match condition.evaluate(knowledge) {
                Ok(true) => {}
                Ok(false) => {
                    trace!(rule = %self.name, condition = condition.kind(), "condition failed");
                    knowledge.rollback();
                    return Ok(false);
                }
                Err(e) => {
                    knowledge.rollback();
                    return Err(e);
                }
            }
        }

        hooks.emit(RuleEvent::ProcessSucceeded, self, knowledge);
        if !hooks.approve(self, knowledge) {
            debug!(rule = %self.name, "rule vetoed");
            knowledge.rollback();
            return Ok(false);
        }

        let backreferences = knowledge.commit();
        knowledge.extract_facts(clear_extractors);

        for action in &self.actions {
            action
                .execute(&self.name, knowledge, &backreferences)
                .map_err(|source| RuleError::Action {
                    rule: self.name.clone(),
                    source,
                })?;
        }

        hooks.emit(RuleEvent::ActionExecuted, self, knowledge);
        Ok(true)
    }

    /// Effective configuration in rule-table form.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "priority": self.priority,
            "conditions": self.conditions.iter().map(|c| c.config()).collect::<Vec<_>>(),
            "actions": self.actions.iter().map(RuleAction::describe).collect::<Vec<_>>(),
        })
    }
}
