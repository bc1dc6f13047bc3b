//! Named patterns for reverse routing.

use crate::error::{Result, UrlError};
use crate::origin::Origin;
use crate::pattern::UrlPattern;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A table of named URL patterns plus an optional origin.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    patterns: BTreeMap<String, UrlPattern>,
    origin: Option<Origin>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Add a resource. The pattern is compiled immediately.
    pub fn insert(&mut self, name: &str, pattern: &str) -> Result<()> {
        if self.patterns.contains_key(name) {
            return Err(UrlError::DuplicateResource(name.to_string()));
        }
        let compiled = UrlPattern::parse(name, pattern)?;
        self.patterns.insert(name.to_string(), compiled);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&UrlPattern> {
        self.patterns.get(name)
    }

    /// Resources in name order.
    pub fn iter(&self) -> impl Iterator<Item = &UrlPattern> {
        self.patterns.values()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Build the path of a named resource.
    pub fn url_for(&self, name: &str, params: &Value, escape: bool) -> Result<String> {
        self.lookup(name)?.build(params, escape)
    }

    pub fn url_for_serialize<T: Serialize>(&self, name: &str, params: &T, escape: bool) -> Result<String> {
        self.lookup(name)?.build_from(params, escape)
    }

    /// Build the absolute URL of a named resource.
    pub fn absolute_url_for(&self, name: &str, params: &Value, escape: bool) -> Result<String> {
        let origin = self.origin.as_ref().ok_or(UrlError::MissingOrigin)?;
        let path = self.url_for(name, params, escape)?;
        Ok(origin.absolute(&path))
    }

    fn lookup(&self, name: &str) -> Result<&UrlPattern> {
        self.patterns
            .get(name)
            .ok_or_else(|| UrlError::UnknownResource(name.to_string()))
    }
}
