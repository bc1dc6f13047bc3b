//! Small shared enums used across the workspace.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which request parameters a lookup reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamScope {
    /// Query-string parameters only.
    Get,
    /// Body parameters only.
    Post,
    /// Union of both; body parameters shadow query parameters.
    #[default]
    Both,
}

impl ParamScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamScope::Get => "get",
            ParamScope::Post => "post",
            ParamScope::Both => "both",
        }
    }
}

impl fmt::Display for ParamScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(ParamScope::Get),
            "post" => Ok(ParamScope::Post),
            "both" => Ok(ParamScope::Both),
            _ => Err(Error::UnknownScope(s.to_string())),
        }
    }
}

/// How a dispatcher treats rules after the first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Stop at the first matching rule.
    #[default]
    First,
    /// Attempt every rule and run every match.
    All,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::First => "first",
            DispatchMode::All => "all",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(DispatchMode::First),
            "all" => Ok(DispatchMode::All),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_str_is_case_insensitive() {
        assert_eq!("GET".parse::<ParamScope>().unwrap(), ParamScope::Get);
        assert_eq!("both".parse::<ParamScope>().unwrap(), ParamScope::Both);
        assert!(matches!(
            "cookie".parse::<ParamScope>(),
            Err(Error::UnknownScope(_))
        ));
    }

    #[test]
    fn test_mode_serde_names() {
        let mode: DispatchMode = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(mode, DispatchMode::All);
        assert_eq!(DispatchMode::default(), DispatchMode::First);
    }
}
