//! Observer and veto hooks around rule execution.

use crate::knowledge::Knowledge;
use crate::rule::Rule;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle events of a rule attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleEvent {
    /// The dispatcher is about to attempt the rule.
    ProcessBegin,
    /// Every condition matched; vetoes have not run yet.
    ProcessSucceeded,
    /// The attempt finished.
    ProcessEnd { matched: bool },
    /// The rule's actions ran.
    ActionExecuted,
}

impl RuleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RuleEvent::ProcessBegin => "rule.process.begin",
            RuleEvent::ProcessSucceeded => "rule.process.succeeded",
            RuleEvent::ProcessEnd { .. } => "rule.process.end",
            RuleEvent::ActionExecuted => "rule.action.executed",
        }
    }
}

impl fmt::Display for RuleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives rule lifecycle events.
pub trait RuleObserver: Send + Sync {
    fn on_event(&self, event: RuleEvent, rule: &Rule, knowledge: &Knowledge);
}

impl<F> RuleObserver for F
where
    F: Fn(RuleEvent, &Rule, &Knowledge) + Send + Sync,
{
    fn on_event(&self, event: RuleEvent, rule: &Rule, knowledge: &Knowledge) {
        self(event, rule, knowledge)
    }
}

/// Decides whether a fully matched rule may run. `false` refuses it.
pub type Veto = Arc<dyn Fn(&Rule, &Knowledge) -> bool + Send + Sync>;

/// Observers and vetoes, both run in registration order.
#[derive(Clone, Default)]
pub struct Hooks {
    observers: Vec<Arc<dyn RuleObserver>>,
    vetoes: Vec<Veto>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: impl RuleObserver + 'static) {
        self.observers.push(Arc::new(observer));
    }

    pub fn add_veto<F>(&mut self, veto: F)
    where
        F: Fn(&Rule, &Knowledge) -> bool + Send + Sync + 'static,
    {
        self.vetoes.push(Arc::new(veto));
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty() && self.vetoes.is_empty()
    }

    pub fn emit(&self, event: RuleEvent, rule: &Rule, knowledge: &Knowledge) {
        for observer in &self.observers {
            observer.on_event(event, rule, knowledge);
        }
    }

    /// Whether every veto accepts the rule. Stops at the first refusal.
    pub fn approve(&self, rule: &Rule, knowledge: &Knowledge) -> bool {
        self.vetoes.iter().all(|veto| veto(rule, knowledge))
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("observers", &self.observers.len())
            .field("vetoes", &self.vetoes.len())
            .finish()
    }
}

/// Logs every rule event at `debug` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RuleObserver for TracingObserver {
    fn on_event(&self, event: RuleEvent, rule: &Rule, knowledge: &Knowledge) {
        match event {
            RuleEvent::ProcessEnd { matched } => {
                debug!(event = event.name(), rule = rule.name(), matched, "rule event");
            }
            RuleEvent::ActionExecuted => {
                debug!(
                    event = event.name(),
                    rule = rule.name(),
                    results = knowledge.results().len(),
                    "rule event"
                );
            }
            _ => debug!(event = event.name(), rule = rule.name(), "rule event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_event_names() {
        assert_eq!(RuleEvent::ProcessBegin.name(), "rule.process.begin");
        assert_eq!(RuleEvent::ProcessSucceeded.to_string(), "rule.process.succeeded");
        assert_eq!(RuleEvent::ProcessEnd { matched: true }.name(), "rule.process.end");
        assert_eq!(RuleEvent::ActionExecuted.name(), "rule.action.executed");
    }

    #[test]
    fn test_vetoes_stop_at_first_refusal() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();

        for (label, verdict) in [("first", true), ("second", false), ("third", true)] {
            let calls = Arc::clone(&calls);
            hooks.add_veto(move |_: &Rule, _: &Knowledge| {
                calls.lock().push(label);
                verdict
            });
        }

        let rule = Rule::new("r");
        assert!(!hooks.approve(&rule, &Knowledge::new()));
        assert_eq!(*calls.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_observers_receive_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();
        let sink = Arc::clone(&seen);
        hooks.add_observer(move |event: RuleEvent, rule: &Rule, _: &Knowledge| {
            sink.lock().push(format!("{}:{}", rule.name(), event));
        });
        hooks.add_observer(TracingObserver);

        let rule = Rule::new("r");
        hooks.emit(RuleEvent::ProcessBegin, &rule, &Knowledge::new());
        assert_eq!(*seen.lock(), vec!["r:rule.process.begin"]);
        assert!(hooks.approve(&rule, &Knowledge::new()));
    }
}
