//! The fact/result store carried through one dispatch cycle.
//!
//! A [`Knowledge`] holds the immutable request facts, the collaborators
//! conditions may consult, and the committed results of rules that matched.
//! While a rule is being evaluated its conditions write into an open
//! transaction instead; the rule commits that transaction when every
//! condition passed and rolls it back otherwise.

use crate::{Result, RuleError};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use switchboard_core::value::display_value;
use switchboard_core::{IdentityProvider, ParameterSource};
use tracing::trace;

/// Fact holding the request method.
pub const FACT_METHOD: &str = "method";
/// Fact holding the raw request-line path.
pub const FACT_PATH: &str = "path";
/// Fact holding the extra path segment after the script/mount point.
pub const FACT_EXTRA_PATH: &str = "extra_path";
/// Result staged by authentication conditions with the matched identity.
pub const RESULT_IDENTITY: &str = "identity";

/// Derives additional facts from the committed results.
pub type FactExtractor = Arc<dyn Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync>;

#[derive(Default)]
struct Assumptions {
    results: Map<String, Value>,
    backreferences: Vec<Value>,
    extractors: Vec<FactExtractor>,
}

/// Marks a point inside the active layer that can be rolled back to.
#[derive(Debug, Clone)]
pub struct Savepoint {
    in_transaction: bool,
    results: Map<String, Value>,
    backreferences: usize,
    extractors: usize,
}

/// Facts, results and staged assumptions for one dispatch cycle.
#[derive(Default)]
pub struct Knowledge {
    facts: Map<String, Value>,
    derived: Map<String, Value>,
    results: Map<String, Value>,
    backreferences: Vec<Value>,
    extractors: Vec<FactExtractor>,
    assumptions: Option<Assumptions>,
    parameters: Option<Arc<dyn ParameterSource>>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl Knowledge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Knowledge for a request line.
    pub fn for_request(method: &str, path: &str) -> Self {
        Self::new()
            .with_fact(FACT_METHOD, method)
            .with_fact(FACT_PATH, path)
    }

    pub fn with_fact(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(name.into(), value.into());
        self
    }

    pub fn with_facts(mut self, facts: Map<String, Value>) -> Self {
        self.facts.extend(facts);
        self
    }

    pub fn with_parameters(mut self, parameters: Arc<dyn ParameterSource>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// A mandatory fact. Input facts shadow derived ones.
    pub fn fact(&self, name: &str) -> Result<&Value> {
        self.facts
            .get(name)
            .or_else(|| self.derived.get(name))
            .ok_or_else(|| RuleError::MissingFact(name.to_string()))
    }

    pub fn optional_fact(&self, name: &str, default: Value) -> Value {
        self.fact(name).cloned().unwrap_or(default)
    }

    /// A mandatory fact rendered as text.
    pub fn fact_text(&self, name: &str) -> Result<String> {
        let value = self.fact(name)?;
        display_value(value).ok_or_else(|| RuleError::InvalidFact {
            name: name.to_string(),
            expected: "a scalar",
        })
    }

    pub fn has_fact(&self, name: &str) -> bool {
        self.facts.contains_key(name) || self.derived.contains_key(name)
    }

    pub fn parameters(&self) -> Option<Arc<dyn ParameterSource>> {
        self.parameters.clone()
    }

    pub fn identity(&self) -> Option<Arc<dyn IdentityProvider>> {
        self.identity.clone()
    }

    /// Write a result. Speculative writes land in the open transaction, if any.
    pub fn set_result(&mut self, name: impl Into<String>, value: impl Into<Value>, speculative: bool) {
        let (name, value) = (name.into(), value.into());
        match self.assumptions.as_mut() {
            Some(assumptions) if speculative => {
                assumptions.results.insert(name, value);
            }
            _ => {
                self.results.insert(name, value);
            }
        }
    }

    /// A committed result.
    pub fn result(&self, name: &str) -> Option<&Value> {
        self.results.get(name)
    }

    pub fn results(&self) -> &Map<String, Value> {
        &self.results
    }

    /// A result staged in the open transaction, falling back to committed ones.
    pub fn staged_result(&self, name: &str) -> Option<&Value> {
        self.assumptions
            .as_ref()
            .and_then(|assumptions| assumptions.results.get(name))
            .or_else(|| self.results.get(name))
    }

    /// Append a backreference to the active layer.
    pub fn push_backreference(&mut self, value: impl Into<Value>) {
        let value = value.into();
        match self.assumptions.as_mut() {
            Some(assumptions) => assumptions.backreferences.push(value),
            None => self.backreferences.push(value),
        }
    }

    pub fn extend_backreferences(&mut self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.push_backreference(value);
        }
    }

    /// Committed backreferences, in capture order.
    pub fn backreferences(&self) -> &[Value] {
        &self.backreferences
    }

    /// Backreferences staged by the open transaction.
    pub fn staged_backreferences(&self) -> &[Value] {
        self.assumptions
            .as_ref()
            .map(|assumptions| assumptions.backreferences.as_slice())
            .unwrap_or_default()
    }

    /// Register a fact extractor.
    pub fn add_extractor(&mut self, extractor: FactExtractor, speculative: bool) {
        match self.assumptions.as_mut() {
            Some(assumptions) if speculative => assumptions.extractors.push(extractor),
            _ => self.extractors.push(extractor),
        }
    }

    /// Open a transaction. An already open one is discarded.
    pub fn begin(&mut self) {
        if self.assumptions.is_some() {
            trace!("discarding unfinished assumptions");
        }
        self.assumptions = Some(Assumptions::default());
    }

    pub fn in_transaction(&self) -> bool {
        self.assumptions.is_some()
    }

    /// Merge the open transaction into committed state.
    ///
    /// Returns the backreferences this transaction contributed. Without an
    /// open transaction nothing happens and the list is empty.
    pub fn commit(&mut self) -> Vec<Value> {
        let Some(assumptions) = self.assumptions.take() else {
            return Vec::new();
        };

        self.results.extend(assumptions.results);
        self.extractors.extend(assumptions.extractors);
        self.backreferences
            .extend(assumptions.backreferences.iter().cloned());
        assumptions.backreferences
    }

    /// Drop the open transaction.
    pub fn rollback(&mut self) {
        self.assumptions = None;
    }

    /// Same as [`Knowledge::commit`], discarding the returned list.
    pub fn validate_assumptions(&mut self) {
        self.commit();
    }

    /// Same as [`Knowledge::rollback`].
    pub fn discard_assumptions(&mut self) {
        self.rollback();
    }

    /// Mark the current state of the active layer.
    pub fn savepoint(&self) -> Savepoint {
        match self.assumptions.as_ref() {
            Some(assumptions) => Savepoint {
                in_transaction: true,
                results: assumptions.results.clone(),
                backreferences: assumptions.backreferences.len(),
                extractors: assumptions.extractors.len(),
            },
            None => Savepoint {
                in_transaction: false,
                results: self.results.clone(),
                backreferences: self.backreferences.len(),
                extractors: self.extractors.len(),
            },
        }
    }

    /// Undo everything the active layer received since `savepoint`.
    pub fn rollback_to(&mut self, savepoint: Savepoint) {
        match (self.assumptions.as_mut(), savepoint.in_transaction) {
            (Some(assumptions), true) => {
                assumptions.results = savepoint.results;
                assumptions.backreferences.truncate(savepoint.backreferences);
                assumptions.extractors.truncate(savepoint.extractors);
            }
            (None, false) => {
                self.results = savepoint.results;
                self.backreferences.truncate(savepoint.backreferences);
                self.extractors.truncate(savepoint.extractors);
            }
            // the transaction the savepoint belonged to is gone
            _ => {}
        }
    }

    /// Run the committed extractors over the results and store what they
    /// produce as derived facts.
    ///
    /// Derived facts never replace input facts. With `clear`, the extractors
    /// are dropped once they ran.
    pub fn extract_facts(&mut self, clear: bool) {
        for extractor in &self.extractors {
            for (name, value) in (extractor.as_ref())(&self.results) {
                if self.facts.contains_key(&name) {
                    trace!(fact = %name, "extractor tried to replace an input fact");
                    continue;
                }
                self.derived.insert(name, value);
            }
        }

        if clear {
            self.extractors.clear();
        }
    }
}

impl fmt::Debug for Knowledge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Knowledge")
            .field("facts", &self.facts)
            .field("derived", &self.derived)
            .field("results", &self.results)
            .field("backreferences", &self.backreferences)
            .field("extractors", &self.extractors.len())
            .field("in_transaction", &self.assumptions.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mandatory_and_optional_facts() {
        let knowledge = Knowledge::for_request("GET", "/users/1");

        assert_eq!(knowledge.fact(FACT_METHOD).unwrap(), &json!("GET"));
        assert!(matches!(
            knowledge.fact("session"),
            Err(RuleError::MissingFact(name)) if name == "session"
        ));
        assert_eq!(knowledge.optional_fact("session", json!("none")), json!("none"));
    }

    #[test]
    fn test_fact_text_rejects_structures() {
        let knowledge = Knowledge::new().with_fact("query", json!({"a": 1}));
        assert!(matches!(
            knowledge.fact_text("query"),
            Err(RuleError::InvalidFact { .. })
        ));
    }

    #[test]
    fn test_commit_merges_staged_output() {
        let mut knowledge = Knowledge::new();
        knowledge.begin();
        knowledge.set_result("id", "42", true);
        knowledge.push_backreference("42");

        assert_eq!(knowledge.result("id"), None);
        assert_eq!(knowledge.staged_result("id"), Some(&json!("42")));
        assert_eq!(knowledge.staged_backreferences(), [json!("42")]);

        let committed = knowledge.commit();
        assert_eq!(committed, vec![json!("42")]);
        assert_eq!(knowledge.result("id"), Some(&json!("42")));
        assert_eq!(knowledge.backreferences(), [json!("42")]);
        assert!(!knowledge.in_transaction());
    }

    #[test]
    fn test_rollback_discards_staged_output() {
        let mut knowledge = Knowledge::new();
        knowledge.set_result("kept", 1, false);

        knowledge.begin();
        knowledge.set_result("dropped", 2, true);
        knowledge.set_result("direct", 3, false);
        knowledge.push_backreference("x");
        knowledge.rollback();

        assert_eq!(knowledge.result("kept"), Some(&json!(1)));
        assert_eq!(knowledge.result("dropped"), None);
        // non-speculative writes bypass the transaction
        assert_eq!(knowledge.result("direct"), Some(&json!(3)));
        assert!(knowledge.backreferences().is_empty());
        assert!(knowledge.commit().is_empty());
    }

    #[test]
    fn test_savepoint_inside_transaction() {
        let mut knowledge = Knowledge::new();
        knowledge.begin();
        knowledge.push_backreference("a");
        knowledge.set_result("first", 1, true);

        let savepoint = knowledge.savepoint();
        knowledge.push_backreference("b");
        knowledge.set_result("second", 2, true);
        knowledge.rollback_to(savepoint);

        assert_eq!(knowledge.staged_backreferences(), [json!("a")]);
        assert_eq!(knowledge.staged_result("second"), None);
        assert_eq!(knowledge.staged_result("first"), Some(&json!(1)));
    }

    #[test]
    fn test_extractors_derive_facts() {
        let mut knowledge = Knowledge::new().with_fact("user", "input");
        let extractor: FactExtractor = Arc::new(|results: &Map<String, Value>| {
            let mut facts = Map::new();
            if let Some(identity) = results.get(RESULT_IDENTITY) {
                facts.insert("current_user".to_string(), identity.clone());
                facts.insert("user".to_string(), identity.clone());
            }
            facts
        });

        knowledge.begin();
        knowledge.add_extractor(extractor, true);
        knowledge.set_result(RESULT_IDENTITY, "alice", true);
        knowledge.commit();
        knowledge.extract_facts(true);

        assert_eq!(knowledge.fact("current_user").unwrap(), &json!("alice"));
        // input facts are never replaced
        assert_eq!(knowledge.fact("user").unwrap(), &json!("input"));

        knowledge.set_result(RESULT_IDENTITY, "bob", false);
        knowledge.extract_facts(false);
        // extractors were cleared after the first run
        assert_eq!(knowledge.fact("current_user").unwrap(), &json!("alice"));
    }

    #[test]
    fn test_rolled_back_extractors_never_run() {
        let mut knowledge = Knowledge::new();
        let extractor: FactExtractor = Arc::new(|_: &Map<String, Value>| {
            let mut facts = Map::new();
            facts.insert("derived".to_string(), json!(true));
            facts
        });

        knowledge.begin();
        knowledge.add_extractor(extractor, true);
        knowledge.rollback();
        knowledge.extract_facts(true);

        assert!(!knowledge.has_fact("derived"));
    }
}
