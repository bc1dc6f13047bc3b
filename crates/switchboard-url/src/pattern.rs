//! Placeholder URL patterns.
//!
//! A pattern such as `/users/{photo.owner.id}/edit` is compiled once, on first
//! use, into:
//!
//! - an ordered list of [`Placeholder`]s (1-based slot, property path)
//! - a printf-style format (`/users/%1$s/edit`, literal `%` doubled)
//! - a segment list the builder walks
//! - an anchored regex the matcher uses
//!
//! The compiled form is cached and only recomputed after [`UrlPattern::set_pattern`].

use crate::error::{Result, UrlError};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use switchboard_core::value::display_value;

/// Characters escaped in built URLs: everything except RFC 3986 unreserved.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Dotted access path into a parameter bag (`photo.owner.id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// One `{...}` token of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// 1-based position in the format string.
    pub slot: usize,
    pub path: PropertyPath,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    /// Index into the placeholder list.
    Slot(usize),
}

#[derive(Debug, Clone)]
struct Compiled {
    placeholders: Vec<Placeholder>,
    segments: Vec<Segment>,
    print_format: String,
    matcher: Regex,
}

/// A named URL pattern usable in both directions.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    name: String,
    pattern: String,
    compiled: OnceLock<Compiled>,
}

impl UrlPattern {
    /// Create a pattern without compiling it.
    ///
    /// Syntax errors surface on first use. Use [`UrlPattern::parse`] to
    /// reject them up front.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            compiled: OnceLock::new(),
        }
    }

    /// Create and compile a pattern, failing on syntax errors.
    pub fn parse(name: impl Into<String>, pattern: impl Into<String>) -> Result<Self> {
        let url_pattern = Self::new(name, pattern);
        url_pattern.compiled()?;
        Ok(url_pattern)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Replace the pattern text and drop the cached compilation.
    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
        self.compiled = OnceLock::new();
    }

    /// Placeholders in left-to-right order.
    pub fn placeholders(&self) -> Result<&[Placeholder]> {
        Ok(&self.compiled()?.placeholders)
    }

    /// The positional format string (`/users/%1$s`).
    pub fn print_format(&self) -> Result<&str> {
        Ok(&self.compiled()?.print_format)
    }

    /// Build a path from a parameter bag.
    ///
    /// Each placeholder's property path is resolved key by key (array
    /// elements by index). Values are percent-encoded unless `escape` is
    /// false.
    pub fn build(&self, params: &Value, escape: bool) -> Result<String> {
        let compiled = self.compiled()?;

        let values = compiled
            .placeholders
            .iter()
            .map(|placeholder| self.resolve(params, &placeholder.path))
            .collect::<Result<Vec<_>>>()?;

        let mut url = String::with_capacity(self.pattern.len());
        for segment in &compiled.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Slot(index) if escape => {
                    url.extend(utf8_percent_encode(&values[*index], COMPONENT));
                }
                Segment::Slot(index) => url.push_str(&values[*index]),
            }
        }

        Ok(url)
    }

    /// Build a path from any serializable parameter bag.
    pub fn build_from<T: Serialize>(&self, params: &T, escape: bool) -> Result<String> {
        let value = serde_json::to_value(params)?;
        self.build(&value, escape)
    }

    /// Match a path against the pattern.
    ///
    /// Each placeholder matches one non-empty segment without `/`. Captured
    /// values are percent-decoded.
    pub fn matches(&self, path: &str) -> Result<Option<PatternMatch>> {
        let compiled = self.compiled()?;

        let Some(captures) = compiled.matcher.captures(path) else {
            return Ok(None);
        };

        let values = compiled
            .placeholders
            .iter()
            .zip(captures.iter().skip(1))
            .map(|(placeholder, capture)| {
                let raw = capture.map(|m| m.as_str()).unwrap_or_default();
                (
                    placeholder.path.clone(),
                    percent_decode_str(raw).decode_utf8_lossy().into_owned(),
                )
            })
            .collect();

        Ok(Some(PatternMatch { values }))
    }

    fn resolve(&self, params: &Value, path: &PropertyPath) -> Result<String> {
        let mut current = params;

        for segment in path.segments() {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };

            current = next
                .filter(|value| !value.is_null())
                .ok_or_else(|| UrlError::MissingParameter {
                    pattern: self.pattern.clone(),
                    placeholder: path.to_string(),
                    segment: segment.clone(),
                })?;
        }

        display_value(current).ok_or_else(|| UrlError::UnprintableParameter {
            pattern: self.pattern.clone(),
            placeholder: path.to_string(),
        })
    }

    fn compiled(&self) -> Result<&Compiled> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }
        let compiled = compile(&self.pattern)?;
        Ok(self.compiled.get_or_init(|| compiled))
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.pattern == other.pattern
    }
}

/// Values extracted by [`UrlPattern::matches`], in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternMatch {
    values: Vec<(PropertyPath, String)>,
}

impl PatternMatch {
    /// Look up a value by its dotted placeholder name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(path, _)| path.to_string() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyPath, &str)> {
        self.values.iter().map(|(path, value)| (path, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn compile(pattern: &str) -> Result<Compiled> {
    let invalid = |position: usize, reason: &str| UrlError::InvalidPattern {
        pattern: pattern.to_string(),
        position,
        reason: reason.to_string(),
    };

    let mut placeholders = Vec::new();
    let mut segments = Vec::new();
    let mut print_format = String::with_capacity(pattern.len());
    let mut matcher = String::from("^");
    let mut literal = String::new();

    let mut chars = pattern.char_indices();
    while let Some((start, c)) = chars.next() {
        match c {
            '{' => {
                let mut inner = String::new();
                let mut closed = false;
                for (position, c) in chars.by_ref() {
                    match c {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(invalid(position, "nested '{' inside placeholder")),
                        _ => inner.push(c),
                    }
                }
                if !closed {
                    return Err(invalid(start, "unterminated placeholder"));
                }

                let path = parse_property_path(&inner).map_err(|reason| invalid(start, reason))?;

                if !literal.is_empty() {
                    matcher.push_str(&regex::escape(&literal));
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }

                let slot = placeholders.len() + 1;
                print_format.push_str(&format!("%{slot}$s"));
                matcher.push_str("([^/]+)");
                segments.push(Segment::Slot(placeholders.len()));
                placeholders.push(Placeholder { slot, path });
            }
            '}' => return Err(invalid(start, "unbalanced '}'")),
            '%' => {
                print_format.push_str("%%");
                literal.push(c);
            }
            _ => {
                print_format.push(c);
                literal.push(c);
            }
        }
    }

    if !literal.is_empty() {
        matcher.push_str(&regex::escape(&literal));
        segments.push(Segment::Literal(literal));
    }
    matcher.push('$');

    Ok(Compiled {
        placeholders,
        segments,
        print_format,
        matcher: Regex::new(&matcher)?,
    })
}

fn parse_property_path(inner: &str) -> std::result::Result<PropertyPath, &'static str> {
    if inner.is_empty() {
        return Err("empty placeholder");
    }

    let segments = inner
        .split('.')
        .map(|segment| {
            if segment.is_empty() {
                Err("empty property name in placeholder")
            } else if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                Err("placeholder names may only contain letters, digits, '_' and '-'")
            } else {
                Ok(segment.to_string())
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(PropertyPath(segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholders_and_format() {
        let pattern = UrlPattern::new("photo", "/users/{user}/photos/{photo.id}");
        let placeholders = pattern.placeholders().unwrap();

        assert_eq!(placeholders.len(), 2);
        assert_eq!(placeholders[0].slot, 1);
        assert_eq!(placeholders[0].path.segments(), ["user"]);
        assert_eq!(placeholders[1].slot, 2);
        assert_eq!(placeholders[1].path.segments(), ["photo", "id"]);
        assert_eq!(pattern.print_format().unwrap(), "/users/%1$s/photos/%2$s");
    }

    #[test]
    fn test_literal_percent_is_escaped_in_format() {
        let pattern = UrlPattern::new("discount", "/sale/50%/{item}");
        assert_eq!(pattern.print_format().unwrap(), "/sale/50%%/%1$s");
        assert_eq!(
            pattern.build(&json!({"item": "hat"}), true).unwrap(),
            "/sale/50%/hat"
        );
    }

    #[test]
    fn test_build_simple() {
        let pattern = UrlPattern::new("user", "/users/{id}");
        assert_eq!(pattern.build(&json!({"id": 42}), true).unwrap(), "/users/42");
    }

    #[test]
    fn test_build_escape_flag() {
        let pattern = UrlPattern::new("user", "/users/{id}");
        assert_eq!(
            pattern.build(&json!({"id": "a b"}), false).unwrap(),
            "/users/a b"
        );
        assert_eq!(
            pattern.build(&json!({"id": "a b"}), true).unwrap(),
            "/users/a%20b"
        );
        assert_eq!(
            pattern.build(&json!({"id": "a/b"}), true).unwrap(),
            "/users/a%2Fb"
        );
    }

    #[test]
    fn test_build_nested_path() {
        let pattern = UrlPattern::new("owner", "/users/{photo.owner.id}");
        let params = json!({"photo": {"owner": {"id": 7}}});
        assert_eq!(pattern.build(&params, true).unwrap(), "/users/7");
    }

    #[test]
    fn test_build_missing_segment() {
        let pattern = UrlPattern::new("owner", "/users/{photo.owner.id}");
        let err = pattern.build(&json!({"photo": {"id": 3}}), true).unwrap_err();

        match err {
            UrlError::MissingParameter {
                placeholder,
                segment,
                ..
            } => {
                assert_eq!(placeholder, "photo.owner.id");
                assert_eq!(segment, "owner");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_null_is_missing() {
        let pattern = UrlPattern::new("user", "/users/{id}");
        assert!(matches!(
            pattern.build(&json!({"id": null}), true),
            Err(UrlError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_build_array_index_and_unprintable() {
        let pattern = UrlPattern::new("tag", "/tags/{tags.1}");
        assert_eq!(
            pattern.build(&json!({"tags": ["a", "b"]}), true).unwrap(),
            "/tags/b"
        );

        let pattern = UrlPattern::new("tag", "/tags/{tags}");
        assert!(matches!(
            pattern.build(&json!({"tags": ["a"]}), true),
            Err(UrlError::UnprintableParameter { .. })
        ));
    }

    #[test]
    fn test_build_from_struct() {
        #[derive(Serialize)]
        struct Owner {
            id: u32,
        }
        #[derive(Serialize)]
        struct Photo {
            owner: Owner,
        }
        #[derive(Serialize)]
        struct Params {
            photo: Photo,
        }

        let pattern = UrlPattern::new("owner", "/users/{photo.owner.id}");
        let params = Params {
            photo: Photo {
                owner: Owner { id: 9 },
            },
        };
        assert_eq!(pattern.build_from(&params, true).unwrap(), "/users/9");
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["/users/{id", "/users/{}", "/users/{a..b}", "/users/id}", "/{a{b}}", "/{a b}"] {
            assert!(
                matches!(UrlPattern::parse("bad", bad), Err(UrlError::InvalidPattern { .. })),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_lazy_errors_surface_on_use() {
        let pattern = UrlPattern::new("bad", "/users/{id");
        assert!(pattern.build(&json!({}), true).is_err());
        assert!(pattern.matches("/users/1").is_err());
    }

    #[test]
    fn test_set_pattern_recompiles() {
        let mut pattern = UrlPattern::new("user", "/users/{id}");
        assert_eq!(pattern.print_format().unwrap(), "/users/%1$s");

        pattern.set_pattern("/people/{name}");
        assert_eq!(pattern.print_format().unwrap(), "/people/%1$s");
        assert_eq!(pattern.placeholders().unwrap()[0].path.to_string(), "name");
    }

    #[test]
    fn test_matches_extracts_values() {
        let pattern = UrlPattern::new("photo", "/users/{user}/photos/{photo.id}.jpg");
        let found = pattern.matches("/users/ann%20lee/photos/12.jpg").unwrap().unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found.get("user"), Some("ann lee"));
        assert_eq!(found.get("photo.id"), Some("12"));

        assert!(pattern.matches("/users/ann/photos/12.png").unwrap().is_none());
        assert!(pattern.matches("/users//photos/12.jpg").unwrap().is_none());
        assert!(pattern.matches("/users/a/b/photos/12.jpg").unwrap().is_none());
    }

    #[test]
    fn test_literal_regex_characters_are_not_special() {
        let pattern = UrlPattern::new("search", "/search.php?q={q}");
        assert!(pattern.matches("/search.php?q=rust").unwrap().is_some());
        assert!(pattern.matches("/searchXphp?q=rust").unwrap().is_none());
    }
}
