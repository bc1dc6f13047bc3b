use std::fs;
use std::path::{Path, PathBuf};
use switchboard_url::{Origin, UrlPattern};
use thiserror::Error;

/// Longest accepted resource name
pub const MAX_RESOURCE_NAME_LENGTH: usize = 64;

/// Security-related errors
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Path does not exist: {0}")]
    PathDoesNotExist(PathBuf),

    #[error("Path is not readable: {0}")]
    NotReadable(PathBuf),

    #[error("Invalid resource name: {0:?}. Must be 1-64 characters of a-z, 0-9, '_', '.' or '-'")]
    InvalidResourceName(String),

    #[error("Invalid pattern for resource {name}: {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),
}

/// Validate and canonicalize a rule table path
///
/// The path must exist and be readable. It may be a single `.toml` file or
/// a directory of them.
///
/// # Security
/// Canonicalization resolves symlinks up front, so the stored path is the
/// location the loader will actually read.
pub fn validate_table_path(path: &Path) -> Result<PathBuf, SecurityError> {
    let canonical = path
        .canonicalize()
        .map_err(|_| SecurityError::PathDoesNotExist(path.to_path_buf()))?;

    let readable = if canonical.is_dir() {
        fs::read_dir(&canonical).is_ok()
    } else {
        fs::File::open(&canonical).is_ok()
    };
    if !readable {
        return Err(SecurityError::NotReadable(canonical));
    }

    Ok(canonical)
}

/// Validate a resource name
///
/// Resource names must:
/// - Be 1-64 characters long
/// - Contain only lowercase ASCII letters, digits, `_`, `.` and `-`
pub fn validate_resource_name(name: &str) -> Result<(), SecurityError> {
    if name.is_empty() || name.len() > MAX_RESOURCE_NAME_LENGTH {
        return Err(SecurityError::InvalidResourceName(name.to_string()));
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-".contains(c);
    if !name.chars().all(allowed) {
        return Err(SecurityError::InvalidResourceName(name.to_string()));
    }

    Ok(())
}

/// Check that a resource pattern compiles
pub fn validate_resource_pattern(name: &str, pattern: &str) -> Result<(), SecurityError> {
    UrlPattern::parse(name, pattern).map_err(|e| SecurityError::InvalidPattern {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

pub fn validate_origin(origin: &str) -> Result<(), SecurityError> {
    Origin::parse(origin).map_err(|e| SecurityError::InvalidOrigin(e.to_string()))?;
    Ok(())
}

/// Set restrictive permissions on config file (Unix only)
#[cfg(unix)]
pub fn set_config_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600); // rw------- (user read/write only)
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn set_config_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
