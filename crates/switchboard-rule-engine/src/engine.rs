//! Dispatcher - attempts rules against a Knowledge
//!
//! This is the main execution engine: it holds an ordered rule list and
//! offers first-match and all-match dispatch over it, bracketing every
//! attempt with observer events.

use crate::action::ActionRegistry;
use crate::hooks::{Hooks, RuleEvent, RuleObserver};
use crate::knowledge::Knowledge;
use crate::registry::ConditionRegistry;
use crate::rule::Rule;
use crate::{Result, RuleError, TomlRule};
use parking_lot::RwLock;
use std::sync::Arc;
use switchboard_core::DispatchMode;
use tracing::{debug, warn};

/// Ordered rule list plus hooks.
///
/// Safe to share between threads. Each dispatch works on a snapshot of the
/// rule list taken under the read lock, so actions may add rules while a
/// dispatch is running; the new rules take part from the next dispatch on.
pub struct Dispatcher {
    rules: RwLock<Vec<Arc<Rule>>>,
    hooks: RwLock<Hooks>,
    mode: DispatchMode,
    clear_extractors: bool,
}

/// Outcome of [`Dispatcher::run`]
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Matched rules, in attempt order
    pub matched: Vec<Arc<Rule>>,
    /// Number of rules attempted
    pub attempted: usize,
}

impl DispatchReport {
    /// Whether any rule matched
    pub fn is_found(&self) -> bool {
        !self.matched.is_empty()
    }

    pub fn first(&self) -> Option<&Arc<Rule>> {
        self.matched.first()
    }

    pub fn names(&self) -> Vec<&str> {
        self.matched.iter().map(|rule| rule.name()).collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            hooks: RwLock::new(Hooks::new()),
            mode: DispatchMode::default(),
            clear_extractors: true,
        }
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether fact extractors are dropped once they ran after a match
    /// (default `true`).
    pub fn with_clear_extractors(mut self, clear: bool) -> Self {
        self.clear_extractors = clear;
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Create a dispatcher from rules, in order
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self> {
        let dispatcher = Self::new();
        for rule in rules {
            dispatcher.add_rule(rule)?;
        }
        Ok(dispatcher)
    }

    /// Create a dispatcher from TOML rules, in the given order
    pub fn from_toml_rules(
        toml_rules: &[TomlRule],
        conditions: &ConditionRegistry,
        actions: &ActionRegistry,
    ) -> Result<Self> {
        let rules = toml_rules
            .iter()
            .map(|toml_rule| toml_rule.compile(conditions, actions))
            .collect::<Result<Vec<_>>>()?;

        Self::from_rules(rules)
    }

    /// Append a rule. Names are unique within a dispatcher.
    pub fn add_rule(&self, rule: Rule) -> Result<()> {
        let mut rules = self.rules.write();
        if rules.iter().any(|existing| existing.name() == rule.name()) {
            return Err(RuleError::DuplicateRule(rule.name().to_string()));
        }
        rules.push(Arc::new(rule));
        Ok(())
    }

    pub fn add_observer(&self, observer: impl RuleObserver + 'static) {
        self.hooks.write().add_observer(observer);
    }

    pub fn add_veto<F>(&self, veto: F)
    where
        F: Fn(&Rule, &Knowledge) -> bool + Send + Sync + 'static,
    {
        self.hooks.write().add_veto(veto);
    }

    /// Snapshot of the rule list
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        self.rules.read().clone()
    }

    pub fn rule(&self, name: &str) -> Option<Arc<Rule>> {
        self.rules
            .read()
            .iter()
            .find(|rule| rule.name() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// First-match dispatch
    ///
    /// Rules are attempted in order; the first that matches runs its
    /// actions and no later rule is attempted. `Ok(None)` means no rule
    /// matched.
    pub fn dispatch(&self, knowledge: &mut Knowledge) -> Result<Option<Arc<Rule>>> {
        let (rules, hooks) = self.snapshot();

        for rule in rules {
            if self.attempt(&rule, knowledge, &hooks)? {
                return Ok(Some(rule));
            }
        }

        debug!("no rule matched");
        Ok(None)
    }

    /// All-match dispatch
    ///
    /// Every rule is attempted in order and every match runs its actions.
    pub fn dispatch_all(&self, knowledge: &mut Knowledge) -> Result<Vec<Arc<Rule>>> {
        Ok(self.run_all(knowledge)?.matched)
    }

    /// Dispatch in the configured [`DispatchMode`]
    pub fn run(&self, knowledge: &mut Knowledge) -> Result<DispatchReport> {
        match self.mode {
            DispatchMode::First => {
                let (rules, hooks) = self.snapshot();
                let mut report = DispatchReport::default();
                for rule in rules {
                    report.attempted += 1;
                    if self.attempt(&rule, knowledge, &hooks)? {
                        report.matched.push(rule);
                        break;
                    }
                }
                Ok(report)
            }
            DispatchMode::All => self.run_all(knowledge),
        }
    }

    fn run_all(&self, knowledge: &mut Knowledge) -> Result<DispatchReport> {
        let (rules, hooks) = self.snapshot();
        let mut report = DispatchReport::default();

        for rule in rules {
            report.attempted += 1;
            if self.attempt(&rule, knowledge, &hooks)? {
                report.matched.push(rule);
            }
        }

        Ok(report)
    }

    fn snapshot(&self) -> (Vec<Arc<Rule>>, Hooks) {
        (self.rules.read().clone(), self.hooks.read().clone())
    }

    fn attempt(&self, rule: &Rule, knowledge: &mut Knowledge, hooks: &Hooks) -> Result<bool> {
        hooks.emit(RuleEvent::ProcessBegin, rule, knowledge);

        match rule.attempt(knowledge, hooks, self.clear_extractors) {
            Ok(matched) => {
                debug!(rule = rule.name(), matched, "rule attempted");
                hooks.emit(RuleEvent::ProcessEnd { matched }, rule, knowledge);
                Ok(matched)
            }
            Err(e) => {
                warn!(rule = rule.name(), error = %e, "rule failed");
                hooks.emit(RuleEvent::ProcessEnd { matched: false }, rule, knowledge);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rules", &self.len())
            .field("mode", &self.mode)
            .field("hooks", &*self.hooks.read())
            .finish()
    }
}
