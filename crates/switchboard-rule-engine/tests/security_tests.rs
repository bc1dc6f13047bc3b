//! Security tests for switchboard-rule-engine
//!
//! These tests verify protection against:
//! - ReDoS (Regular Expression Denial of Service)
//! - Memory exhaustion via large files
//! - Symlink traversal out of a rule directory
//! - Malicious TOML structures (oversized regexes, runaway nesting)

use serde_json::{json, Map, Value};
use std::fs;
use std::time::{Duration, Instant};
use switchboard_rule_engine::{
    ConditionRegistry, Knowledge, RuleError, RuleLoader, MAX_CONDITION_DEPTH, MAX_REGEX_LENGTH,
    MAX_TOML_FILE_SIZE,
};
use tempfile::TempDir;

// Test helper functions
fn options(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn path_condition(pattern: &str) -> Map<String, Value> {
    options(json!({ "type": "url_path", "pattern": pattern }))
}

fn rule_file(pattern: &str) -> String {
    format!(
        "[[rules]]\nname = \"test\"\n[[rules.conditions]]\ntype = \"url_path\"\npattern = '{}'\n",
        pattern
    )
}

// ============================================================================
// ReDoS Pattern Testing
// ============================================================================

#[test]
fn test_redos_catastrophic_backtracking_nested_quantifiers() {
    // Pattern: (a+)+b - catastrophic backtracking in backtracking engines
    let registry = ConditionRegistry::with_builtins();
    let start = Instant::now();
    let condition = registry.construct_table(&path_condition("^/(a+)+b$"));
    let duration = start.elapsed();

    // Compilation should complete quickly regardless
    assert!(
        duration < Duration::from_millis(100),
        "Compilation took too long: {:?}",
        duration
    );

    if let Ok(condition) = condition {
        let path = format!("/{}", "a".repeat(4096));
        let mut knowledge = Knowledge::for_request("GET", &path);

        let match_start = Instant::now();
        let matched = condition.evaluate(&mut knowledge).unwrap();
        let match_duration = match_start.elapsed();

        assert!(!matched);
        // Matching should complete quickly (<100ms)
        assert!(
            match_duration < Duration::from_millis(100),
            "Matching took too long: {:?}",
            match_duration
        );
    }
}

#[test]
fn test_redos_in_chunk_and_parameter_patterns() {
    let registry = ConditionRegistry::with_builtins();

    let chunk = registry
        .construct_table(&options(json!({
            "type": "url_path",
            "chunk[-1]": "^(x*)*y$",
        })))
        .unwrap();
    let path = format!("/files/{}", "x".repeat(4096));
    let start = Instant::now();
    assert!(!chunk.evaluate(&mut Knowledge::for_request("GET", &path)).unwrap());
    assert!(start.elapsed() < Duration::from_millis(100));

    let param = registry
        .construct_table(&options(json!({
            "type": "url_params",
            "name": "q",
            "operator": "regexp",
            "value": "^(a|aa)+$",
        })))
        .unwrap();
    let params = switchboard_core::RequestParameters::new().with_get("q", "a".repeat(4096) + "!");
    let mut knowledge =
        Knowledge::for_request("GET", "/").with_parameters(std::sync::Arc::new(params));
    let start = Instant::now();
    assert!(!param.evaluate(&mut knowledge).unwrap());
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_redos_dfa_size_limit_enforcement() {
    // A pattern that would create a large automaton if not limited
    let pattern = "(\\w{1,100}){1,100}";
    let registry = ConditionRegistry::with_builtins();

    let start = Instant::now();
    let result = registry.construct_table(&path_condition(pattern));
    let duration = start.elapsed();

    // Should either reject with a configuration error or compile quickly
    if let Err(e) = &result {
        assert!(matches!(e, RuleError::InvalidCondition { .. }), "{e}");
    }
    assert!(
        duration < Duration::from_millis(500),
        "Compilation took too long: {:?}",
        duration
    );
}

#[test]
fn test_redos_compilation_time_bounded() {
    let patterns = [
        ".*.*.*.*.*.*.*.*.*.*.*.*.*.*.*.*.*.*.*.*",
        "(a|b|c|d|e|f|g|h|i|j|k|l|m|n|o|p|q|r|s|t|u|v|w|x|y|z)+",
        "a*b*c*d*e*f*g*h*i*j*k*l*m*n*o*p*q*r*s*t*u*v*w*x*y*z*",
    ];
    let registry = ConditionRegistry::with_builtins();

    for pattern in patterns {
        let start = Instant::now();
        let _result = registry.construct_table(&path_condition(pattern));
        let duration = start.elapsed();

        assert!(
            duration < Duration::from_millis(100),
            "Pattern '{}' compilation took too long: {:?}",
            pattern,
            duration
        );
    }
}

// ============================================================================
// Large File Handling
// ============================================================================

#[test]
fn test_oversized_rule_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let rules_dir = temp_dir.path().join("rules");
    fs::create_dir_all(&rules_dir).unwrap();

    let over_limit = rules_dir.join("over_limit.toml");
    let mut content = rule_file("^/");
    content.push('#');
    content.push_str(&"a".repeat(MAX_TOML_FILE_SIZE as usize));
    fs::write(&over_limit, content).unwrap();

    let result = RuleLoader::new().with_path(&rules_dir).load_all();
    assert!(matches!(result, Err(RuleError::LoadError { .. })));
}

#[test]
fn test_normal_rule_file_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("rules.toml");
    fs::write(&file, rule_file("^/")).unwrap();

    let rules = RuleLoader::new().with_path(&file).load_all().unwrap();
    assert_eq!(rules.len(), 1);
}

// ============================================================================
// Path Traversal Protection
// ============================================================================

#[test]
#[cfg(unix)]
fn test_symlink_not_followed() {
    use std::os::unix::fs::symlink;

    let temp_dir = TempDir::new().unwrap();
    let rules_dir = temp_dir.path().join("rules");
    fs::create_dir_all(&rules_dir).unwrap();

    // Create a symlink pointing outside the rules directory
    let outside_file = temp_dir.path().join("outside.toml");
    fs::write(&outside_file, "[[rules]]\nname = \"outside\"\n").unwrap();
    symlink(&outside_file, rules_dir.join("link.toml")).unwrap();

    let inside_file = rules_dir.join("inside.toml");
    fs::write(&inside_file, "[[rules]]\nname = \"inside\"\n").unwrap();

    let rules = RuleLoader::new().with_path(&rules_dir).load_all().unwrap();
    assert!(rules.iter().any(|r| r.name == "inside"));
    assert!(!rules.iter().any(|r| r.name == "outside"));
}

#[test]
fn test_nested_directories_are_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let subdir = temp_dir.path().join("rules/admin");
    fs::create_dir_all(&subdir).unwrap();
    fs::write(subdir.join("valid.toml"), "[[rules]]\nname = \"valid\"\n").unwrap();

    let rules = RuleLoader::new()
        .with_path(temp_dir.path().join("rules"))
        .load_all()
        .unwrap();
    assert!(rules.iter().any(|r| r.name == "valid"));
}

// ============================================================================
// Malicious TOML Edge Cases
// ============================================================================

#[test]
fn test_oversized_regex_patterns_rejected() {
    let loader = RuleLoader::new();
    let pattern = "a".repeat(MAX_REGEX_LENGTH + 1);

    let result = loader.load_str(&rule_file(&pattern), "oversized.toml");
    assert!(matches!(result, Err(RuleError::LoadError { .. })));

    let registry = ConditionRegistry::with_builtins();
    assert!(registry.construct_table(&path_condition(&pattern)).is_err());
}

#[test]
fn test_invalid_regex_syntax_rejected() {
    let loader = RuleLoader::new();
    for pattern in ["(unclosed", "[z-a]", "a{2,1}"] {
        assert!(
            loader.load_str(&rule_file(pattern), "invalid.toml").is_err(),
            "pattern {pattern:?} should be rejected"
        );
    }
}

#[test]
fn test_malformed_toml_rejected() {
    let loader = RuleLoader::new();
    let result = loader.load_str("[[rules]\nname = ", "broken.toml");
    assert!(matches!(result, Err(RuleError::LoadError { path, .. }) if path == "broken.toml"));
}

#[test]
fn test_runaway_bool_nesting_rejected() {
    let mut table = json!({ "type": "url_path", "pattern": "^/" });
    for _ in 0..(MAX_CONDITION_DEPTH * 4) {
        table = json!({ "type": "bool", "conditions": [table] });
    }

    let registry = ConditionRegistry::with_builtins();
    let start = Instant::now();
    let result = registry.construct_table(&options(table));
    assert!(matches!(result, Err(RuleError::InvalidCondition { .. })));
    assert!(start.elapsed() < Duration::from_millis(100));
}

// ============================================================================
// Regex Size Limits
// ============================================================================

#[test]
fn test_pattern_at_limit_accepted() {
    let pattern = "a".repeat(MAX_REGEX_LENGTH);
    let loader = RuleLoader::new();
    assert!(loader.load_str(&rule_file(&pattern), "at_limit.toml").is_ok());
}

#[test]
fn test_pattern_over_limit_rejected() {
    let pattern = "a".repeat(MAX_REGEX_LENGTH + 1);
    let registry = ConditionRegistry::with_builtins();
    let result = registry.construct_table(&options(json!({
        "type": "url_params",
        "name": "q",
        "operator": "regexp",
        "value": pattern,
    })));
    assert!(matches!(result, Err(RuleError::InvalidCondition { .. })));
}
