//! `authentication`: checks on the current identity.

use super::{Condition, ConditionOptions};
use crate::knowledge::{Knowledge, RESULT_IDENTITY};
use crate::Result;
use serde_json::{json, Map, Value};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOperator {
    /// The current identity is exactly this user.
    IsUser(String),
    /// There is no current identity.
    IsAnon,
    /// The current identity belongs to this group.
    InGroup(String),
}

impl AuthOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthOperator::IsUser(_) => "isuser",
            AuthOperator::IsAnon => "isanon",
            AuthOperator::InGroup(_) => "ingroup",
        }
    }
}

/// Matches on the identity reported by the Knowledge's identity provider.
///
/// A Knowledge without a provider is anonymous. A successful `isuser` or
/// `ingroup` check stages the identity as the `identity` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationCondition {
    operator: AuthOperator,
}

impl AuthenticationCondition {
    pub const KIND: &'static str = "authentication";

    pub fn new(operator: AuthOperator) -> Self {
        Self { operator }
    }

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let mut opts = ConditionOptions::new(Self::KIND, options);

        let operator = opts
            .take_string("operator")?
            .unwrap_or_else(|| "isuser".to_string());
        let operator = match operator.as_str() {
            "isuser" => AuthOperator::IsUser(opts.require_string("value")?),
            "ingroup" => AuthOperator::InGroup(opts.require_string("value")?),
            "isanon" => AuthOperator::IsAnon,
            other => {
                return Err(opts.invalid(format!(
                    "unknown operator {other:?} (expected isuser, isanon or ingroup)"
                )))
            }
        };

        opts.finish()?;
        Ok(Self { operator })
    }
}

impl Condition for AuthenticationCondition {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn evaluate(&self, knowledge: &mut Knowledge) -> Result<bool> {
        let provider = knowledge.identity();
        let identity = provider
            .as_ref()
            .and_then(|provider| provider.current_identity());

        let matched = match (&self.operator, identity) {
            (AuthOperator::IsAnon, identity) => identity.is_none(),
            (_, None) => false,
            (AuthOperator::IsUser(user), Some(identity)) => {
                let matched = *user == identity;
                if matched {
                    knowledge.set_result(RESULT_IDENTITY, identity, true);
                }
                matched
            }
            (AuthOperator::InGroup(group), Some(identity)) => {
                let matched = provider
                    .as_ref()
                    .is_some_and(|provider| provider.is_member_of(&identity, group));
                if matched {
                    knowledge.set_result(RESULT_IDENTITY, identity, true);
                }
                matched
            }
        };

        trace!(operator = self.operator.as_str(), matched, "authentication checked");
        Ok(matched)
    }

    fn config(&self) -> Value {
        match &self.operator {
            AuthOperator::IsUser(value) | AuthOperator::InGroup(value) => json!({
                "type": Self::KIND,
                "operator": self.operator.as_str(),
                "value": value,
            }),
            AuthOperator::IsAnon => json!({
                "type": Self::KIND,
                "operator": self.operator.as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use switchboard_core::StaticIdentity;

    fn condition(value: Value) -> AuthenticationCondition {
        AuthenticationCondition::from_options(value.as_object().unwrap()).unwrap()
    }

    fn as_user(name: &str) -> Knowledge {
        let identity = StaticIdentity::user(name).with_group("editors");
        Knowledge::for_request("GET", "/").with_identity(Arc::new(identity))
    }

    #[test]
    fn test_isuser_is_default_operator() {
        let condition = condition(json!({"value": "alice"}));
        assert_eq!(condition.operator, AuthOperator::IsUser("alice".to_string()));

        let mut knowledge = as_user("alice");
        knowledge.begin();
        assert!(condition.evaluate(&mut knowledge).unwrap());
        assert_eq!(knowledge.staged_result(RESULT_IDENTITY), Some(&json!("alice")));

        assert!(!condition.evaluate(&mut as_user("bob")).unwrap());
    }

    #[test]
    fn test_ingroup() {
        let condition = condition(json!({"operator": "ingroup", "value": "editors"}));
        assert!(condition.evaluate(&mut as_user("alice")).unwrap());

        let condition = AuthenticationCondition::new(AuthOperator::InGroup("admins".into()));
        assert!(!condition.evaluate(&mut as_user("alice")).unwrap());
    }

    #[test]
    fn test_missing_provider_is_anonymous() {
        let mut knowledge = Knowledge::for_request("GET", "/");
        assert!(condition(json!({"operator": "isanon"})).evaluate(&mut knowledge).unwrap());
        assert!(!condition(json!({"value": "alice"})).evaluate(&mut knowledge).unwrap());

        let mut anonymous = Knowledge::for_request("GET", "/")
            .with_identity(Arc::new(StaticIdentity::anonymous()));
        assert!(condition(json!({"operator": "isanon"})).evaluate(&mut anonymous).unwrap());
        assert!(!condition(json!({"operator": "isanon"}))
            .evaluate(&mut as_user("alice"))
            .unwrap());
    }

    #[test]
    fn test_configuration_errors() {
        for bad in [
            json!({}),
            json!({"operator": "ingroup"}),
            json!({"operator": "admin", "value": "x"}),
            json!({"operator": "isanon", "value": "x"}),
        ] {
            assert!(
                AuthenticationCondition::from_options(bad.as_object().unwrap()).is_err(),
                "expected {bad} to be rejected"
            );
        }
    }
}
