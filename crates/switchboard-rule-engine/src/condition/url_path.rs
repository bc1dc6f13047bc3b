//! `url_path`: whole-path and per-chunk regex matching.

use super::{Condition, ConditionOptions};
use crate::knowledge::{Knowledge, FACT_EXTRA_PATH, FACT_PATH};
use crate::safe_regex::{capture_groups, compile_regex_safe};
use crate::Result;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

/// Which fact supplies the subject path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathSource {
    /// The raw request-line path (`path` fact, mandatory).
    #[default]
    Request,
    /// The extra path (`extra_path` fact, mandatory), trimmed of the
    /// delimiter on both ends.
    Extra,
}

impl PathSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathSource::Request => "request",
            PathSource::Extra => "extra",
        }
    }
}

/// Resolve a possibly negative chunk index against `count` chunks.
///
/// `-1` is the last chunk. Returns `None` when the index is out of range.
pub fn resolve_chunk_index(index: i64, count: usize) -> Option<usize> {
    let position = if index < 0 {
        i64::try_from(count).ok()?.checked_add(index)?
    } else {
        index
    };

    usize::try_from(position).ok().filter(|position| *position < count)
}

/// Matches the subject path, then selected delimiter-separated chunks.
///
/// Backreferences are appended in a fixed order: whole-pattern capture groups
/// first, then chunks in ascending order of their configured index (so
/// `chunk[-1]` comes before `chunk[0]`). A chunk regex with capture groups
/// contributes its groups; one without contributes the whole chunk.
#[derive(Debug, Clone)]
pub struct UrlPathCondition {
    source: PathSource,
    pattern: Option<Regex>,
    delimiter: String,
    chunks: BTreeMap<i64, Regex>,
}

impl Default for UrlPathCondition {
    fn default() -> Self {
        Self {
            source: PathSource::Request,
            pattern: None,
            delimiter: "/".to_string(),
            chunks: BTreeMap::new(),
        }
    }
}

impl UrlPathCondition {
    pub const KIND: &'static str = "url_path";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: PathSource) -> Self {
        self.source = source;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Whole-subject regex.
    pub fn pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(compile_regex_safe(pattern)?);
        Ok(self)
    }

    /// Regex for the chunk at `index` (negative counts from the end).
    pub fn chunk(mut self, index: i64, pattern: &str) -> Result<Self> {
        self.chunks.insert(index, compile_regex_safe(pattern)?);
        Ok(self)
    }

    /// Build from an option table.
    ///
    /// Keys: `source` (`request` | `extra`, default `request`), `pattern`,
    /// `delimiter` (default `/`), and any number of `chunk[N]`.
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let mut opts = ConditionOptions::new(Self::KIND, options);
        let mut condition = Self::new();

        condition.source = match opts.take_string("source")?.as_deref() {
            None | Some("request") => PathSource::Request,
            Some("extra") => PathSource::Extra,
            Some(other) => {
                return Err(opts.invalid(format!(
                    "unknown source {other:?} (expected request or extra)"
                )))
            }
        };

        if let Some(delimiter) = opts.take_string("delimiter")? {
            if delimiter.is_empty() {
                return Err(opts.invalid("`delimiter` must not be empty"));
            }
            condition.delimiter = delimiter;
        }

        if let Some(pattern) = opts.take_string("pattern")? {
            condition.pattern = Some(compile_pattern(&opts, "pattern", &pattern)?);
        }

        for (key, value) in opts.take_matching(|key| key.starts_with("chunk[")) {
            let index = parse_chunk_key(&key)
                .ok_or_else(|| opts.invalid(format!("malformed chunk key {key:?} (expected chunk[N])")))?;
            let Value::String(pattern) = value else {
                return Err(opts.invalid(format!("`{key}` must be a regex string")));
            };
            let regex = compile_pattern(&opts, &key, &pattern)?;
            condition.chunks.insert(index, regex);
        }

        if condition.pattern.is_none() && condition.chunks.is_empty() {
            return Err(opts.invalid("needs `pattern` or at least one `chunk[N]`"));
        }

        opts.finish()?;
        Ok(condition)
    }

    fn subject(&self, knowledge: &Knowledge) -> Result<String> {
        match self.source {
            PathSource::Request => knowledge.fact_text(FACT_PATH),
            PathSource::Extra => {
                let extra = knowledge.fact_text(FACT_EXTRA_PATH)?;
                Ok(extra
                    .trim_start_matches(self.delimiter.as_str())
                    .trim_end_matches(self.delimiter.as_str())
                    .to_string())
            }
        }
    }
}

impl Condition for UrlPathCondition {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn evaluate(&self, knowledge: &mut Knowledge) -> Result<bool> {
        let subject = self.subject(knowledge)?;

        if let Some(pattern) = &self.pattern {
            let Some(captures) = pattern.captures(&subject) else {
                trace!(subject = %subject, pattern = pattern.as_str(), "path pattern did not match");
                return Ok(false);
            };
            knowledge.extend_backreferences(capture_groups(&captures));
        }

        if self.chunks.is_empty() {
            return Ok(true);
        }

        let chunks: Vec<&str> = subject.split(self.delimiter.as_str()).collect();

        for (index, regex) in &self.chunks {
            let Some(position) = resolve_chunk_index(*index, chunks.len()) else {
                trace!(index, count = chunks.len(), "chunk index out of range");
                return Ok(false);
            };

            let chunk = chunks[position];
            let Some(captures) = regex.captures(chunk) else {
                trace!(index, chunk, "chunk did not match");
                return Ok(false);
            };

            if captures.len() > 1 {
                knowledge.extend_backreferences(capture_groups(&captures));
            } else {
                knowledge.push_backreference(chunk);
            }
        }

        Ok(true)
    }

    fn config(&self) -> Value {
        let mut config = json!({
            "type": Self::KIND,
            "source": self.source.as_str(),
            "delimiter": self.delimiter,
        });
        if let Some(map) = config.as_object_mut() {
            if let Some(pattern) = &self.pattern {
                map.insert("pattern".to_string(), json!(pattern.as_str()));
            }
            for (index, regex) in &self.chunks {
                map.insert(format!("chunk[{index}]"), json!(regex.as_str()));
            }
        }
        config
    }
}

fn compile_pattern(opts: &ConditionOptions, key: &str, pattern: &str) -> Result<Regex> {
    compile_regex_safe(pattern).map_err(|e| opts.invalid(format!("`{key}`: {e}")))
}

fn parse_chunk_key(key: &str) -> Option<i64> {
    let inner = key.strip_prefix("chunk[")?.strip_suffix(']')?;
    let digits = inner.strip_prefix('-').unwrap_or(inner);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}
