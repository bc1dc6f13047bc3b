//! Multi-source rule table loading
//!
//! Loads TOML rule tables from files and directories, validates their
//! regexes, and orders the rules by priority.

use crate::constants::{MAX_REGEX_LENGTH, MAX_TOML_FILE_SIZE};
use crate::safe_regex::compile_regex_safe;
use crate::{Result, RuleError, TomlRule, TomlRuleFile};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an extra rule table directory
pub const RULES_DIR_ENV: &str = "SWITCHBOARD_RULES_DIR";

/// A parsed rule table and where it came from
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub file: TomlRuleFile,
}

/// Loads rule tables from a list of files and directories
#[derive(Debug, Clone, Default)]
pub struct RuleLoader {
    /// Sources, in load order
    paths: Vec<PathBuf>,
}

impl RuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader that also reads `SWITCHBOARD_RULES_DIR` when it names a
    /// directory. Environment tables load before any added path.
    pub fn from_env() -> Self {
        let mut loader = Self::new();
        if let Ok(env_path) = std::env::var(RULES_DIR_ENV) {
            let path = PathBuf::from(env_path);
            if path.is_dir() {
                loader.paths.push(path);
            }
        }
        loader
    }

    /// Add a rule file or a directory of `.toml` rule files.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Load every table from every source.
    ///
    /// Directories are read in sorted path order so the result does not
    /// depend on the filesystem.
    pub fn load_tables(&self) -> Result<Vec<LoadedTable>> {
        let mut tables = Vec::new();

        for path in &self.paths {
            if path.is_dir() {
                tables.extend(self.load_from_directory(path)?);
            } else {
                let file = self.load_from_file(path)?;
                tables.push(LoadedTable {
                    path: path.clone(),
                    file,
                });
            }
        }

        Ok(tables)
    }

    /// Load every rule from every source
    ///
    /// Sorted by priority (higher first). Rules of equal priority keep
    /// their load order.
    pub fn load_all(&self) -> Result<Vec<TomlRule>> {
        let mut all_rules: Vec<TomlRule> = self
            .load_tables()?
            .into_iter()
            .flat_map(|table| table.file.rules)
            .collect();

        sort_by_priority(&mut all_rules);
        Ok(all_rules)
    }

    /// Load rules from a specific directory
    #[cfg(feature = "native-fs")]
    fn load_from_directory(&self, dir: &Path) -> Result<Vec<LoadedTable>> {
        use crate::constants::MAX_DIRECTORY_DEPTH;
        use walkdir::WalkDir;

        let mut tables = Vec::new();

        let walker = WalkDir::new(dir)
            .follow_links(false) // Security: don't follow symlinks
            .max_depth(MAX_DIRECTORY_DEPTH)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| RuleError::LoadError {
                path: dir.display().to_string(),
                source: Box::new(e),
            })?;

            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "toml") {
                continue;
            }

            let file = self.load_from_file(path)?;
            tables.push(LoadedTable {
                path: path.to_path_buf(),
                file,
            });
        }

        debug!(dir = %dir.display(), tables = tables.len(), "loaded rule directory");
        Ok(tables)
    }

    #[cfg(not(feature = "native-fs"))]
    fn load_from_directory(&self, dir: &Path) -> Result<Vec<LoadedTable>> {
        Err(RuleError::LoadError {
            path: dir.display().to_string(),
            source: "directory loading requires the native-fs feature".into(),
        })
    }

    /// Load rules from a single TOML file
    pub fn load_from_file(&self, path: &Path) -> Result<TomlRuleFile> {
        // Security: Check file size before reading
        let metadata = std::fs::metadata(path).map_err(|e| RuleError::LoadError {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        if metadata.len() > MAX_TOML_FILE_SIZE {
            return Err(RuleError::LoadError {
                path: path.display().to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "File exceeds maximum size of {}MB",
                        MAX_TOML_FILE_SIZE / 1_048_576
                    ),
                )),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|e| RuleError::LoadError {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        self.load_str(&contents, &path.display().to_string())
    }

    /// Parse and validate a rule table from a string. `origin` names the
    /// source in errors.
    pub fn load_str(&self, contents: &str, origin: &str) -> Result<TomlRuleFile> {
        let file: TomlRuleFile = toml::from_str(contents).map_err(|e| RuleError::LoadError {
            path: origin.to_string(),
            source: Box::new(e),
        })?;

        // Security: Validate regex patterns to prevent ReDoS
        for rule in &file.rules {
            for pattern in rule.regex_patterns() {
                validate_regex_pattern(pattern, origin)?;
            }
        }

        Ok(file)
    }
}

/// Stable sort, higher priority first
pub fn sort_by_priority(rules: &mut [TomlRule]) {
    rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority.unwrap_or(0)));
}

/// Validates regex patterns to prevent ReDoS attacks
///
/// Conditions compile their regexes through the same size-limited builder;
/// this surfaces the problem at load time with the table's path attached.
fn validate_regex_pattern(pattern: &str, origin: &str) -> Result<()> {
    if pattern.len() > MAX_REGEX_LENGTH {
        return Err(RuleError::LoadError {
            path: origin.to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Regex pattern exceeds {} characters: {}",
                    MAX_REGEX_LENGTH, pattern
                ),
            )),
        });
    }

    compile_regex_safe(pattern).map_err(|e| RuleError::LoadError {
        path: origin.to_string(),
        source: Box::new(e),
    })?;

    Ok(())
}
