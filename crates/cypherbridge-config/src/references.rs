//! `{env:VAR}` and `{file:path}` references
//!
//! Any string value in a config file may be a reference that is replaced
//! before deserialization:
//!
//! ```toml
//! [connection]
//! uri = "bolt://graph.internal:7687"
//! username = "{env:GRAPH_USER}"
//! password = "{file:~/.secrets/graph.pass}"
//! ```
//!
//! - `{env:VAR}` must name a set environment variable
//! - `{file:path}` is replaced by the trimmed file content; relative paths
//!   resolve against the directory of the config file, `~` expands to home

use crate::error::ConfigError;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FILE_REF_PREFIX: &str = "{file:";
const ENV_REF_PREFIX: &str = "{env:";
const REF_SUFFIX: &str = "}";

fn extract_reference<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.strip_prefix(prefix)?.strip_suffix(REF_SUFFIX)
}

/// Resolve a referenced path relative to a base directory
///
/// - Absolute paths are kept
/// - `~` and `~/rest` expand to the home directory
/// - Anything else is joined onto `base_dir`
pub fn resolve_reference_path(reference: &str, base_dir: &Path) -> PathBuf {
    if reference.starts_with('/') {
        return PathBuf::from(reference);
    }
    if let Some(home) = dirs::home_dir() {
        if reference == "~" {
            return home;
        }
        if let Some(rest) = reference.strip_prefix("~/") {
            return home.join(rest);
        }
    }
    base_dir.join(reference)
}

/// Replace every reference in a value tree
///
/// Collects all failures instead of stopping at the first one so a broken
/// config reports everything that is missing at once.
pub fn resolve_references(value: &mut Value, base_dir: &Path) -> Result<(), Vec<ConfigError>> {
    resolve_references_with(value, base_dir, |path| std::fs::read_to_string(path))
}

/// [`resolve_references`] with a caller-supplied reader for `{file:...}`
///
/// Lets async callers read the files up front (see [`file_reference_paths`])
/// and hand the contents in without blocking.
pub fn resolve_references_with<F>(
    value: &mut Value,
    base_dir: &Path,
    mut read_file: F,
) -> Result<(), Vec<ConfigError>>
where
    F: FnMut(&Path) -> io::Result<String>,
{
    let mut errors = Vec::new();
    resolve_recursive(value, base_dir, &mut read_file, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every distinct path a `{file:...}` reference in the tree points at
pub fn file_reference_paths(value: &Value, base_dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    collect_file_paths(value, base_dir, &mut paths);
    paths
}

fn collect_file_paths(value: &Value, base_dir: &Path, paths: &mut Vec<PathBuf>) {
    match value {
        Value::String(s) => {
            if let Some(file_ref) = extract_reference(s, FILE_REF_PREFIX) {
                let path = resolve_reference_path(file_ref, base_dir);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_file_paths(item, base_dir, paths);
            }
        }
        Value::Object(map) => {
            for val in map.values() {
                collect_file_paths(val, base_dir, paths);
            }
        }
        _ => {}
    }
}

fn resolve_recursive(
    value: &mut Value,
    base_dir: &Path,
    read_file: &mut dyn FnMut(&Path) -> io::Result<String>,
    errors: &mut Vec<ConfigError>,
) {
    match value {
        Value::String(s) => {
            if let Some(var_name) = extract_reference(s, ENV_REF_PREFIX) {
                debug!("Resolving env reference: {}", var_name);
                match std::env::var(var_name) {
                    Ok(env_value) => *value = Value::String(env_value),
                    Err(_) => {
                        warn!("Environment variable not found: {}", var_name);
                        errors.push(ConfigError::EnvVarNotFound {
                            var_name: var_name.to_string(),
                        });
                    }
                }
            } else if let Some(file_ref) = extract_reference(s, FILE_REF_PREFIX) {
                let path = resolve_reference_path(file_ref, base_dir);
                debug!("Resolving file reference: {} -> {}", file_ref, path.display());
                match read_file(&path) {
                    Ok(content) => *value = Value::String(content.trim().to_string()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        warn!("Referenced file not found: {}", path.display());
                        errors.push(ConfigError::FileNotFound(path));
                    }
                    Err(e) => {
                        warn!("Failed to read referenced file {}: {}", path.display(), e);
                        errors.push(ConfigError::Io {
                            path,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_recursive(item, base_dir, read_file, errors);
            }
        }
        Value::Object(map) => {
            for (_key, val) in map.iter_mut() {
                resolve_recursive(val, base_dir, read_file, errors);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_env_reference_resolved() {
        std::env::set_var("CYPHERBRIDGE_TEST_USER", "neo");
        let mut value = json!({"connection": {"username": "{env:CYPHERBRIDGE_TEST_USER}"}});

        resolve_references(&mut value, Path::new(".")).unwrap();

        assert_eq!(value["connection"]["username"], "neo");
        std::env::remove_var("CYPHERBRIDGE_TEST_USER");
    }

    #[test]
    #[serial]
    fn test_missing_env_reference_reported() {
        std::env::remove_var("CYPHERBRIDGE_TEST_MISSING");
        let mut value = json!(["{env:CYPHERBRIDGE_TEST_MISSING}", "plain"]);

        let errors = resolve_references(&mut value, Path::new(".")).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigError::EnvVarNotFound { var_name } if var_name == "CYPHERBRIDGE_TEST_MISSING"
        ));
        assert_eq!(value[1], "plain");
    }

    #[test]
    fn test_file_reference_trimmed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "s3cret\n").unwrap();
        let mut value = json!({"password": "{file:secret.txt}"});

        resolve_references(&mut value, dir.path()).unwrap();

        assert_eq!(value["password"], "s3cret");
    }

    #[test]
    fn test_missing_file_reference_reported() {
        let dir = TempDir::new().unwrap();
        let mut value = json!({"password": "{file:nope.txt}"});

        let errors = resolve_references(&mut value, dir.path()).unwrap_err();

        assert!(matches!(&errors[0], ConfigError::FileNotFound(p) if p.ends_with("nope.txt")));
    }

    #[test]
    fn test_custom_reader_supplies_file_content() {
        let mut value = json!({
            "password": "{file:pass}",
            "nested": ["{file:/etc/denied}", "{file:pass}"]
        });
        let base = Path::new("/srv");

        let mut paths = file_reference_paths(&value, base);
        paths.sort();
        assert_eq!(
            paths,
            vec![PathBuf::from("/etc/denied"), PathBuf::from("/srv/pass")]
        );

        let mut reads = Vec::new();
        let errors = resolve_references_with(&mut value, base, |path| {
            reads.push(path.to_path_buf());
            if path.ends_with("pass") {
                Ok("hunter2\n".to_string())
            } else {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            }
        })
        .unwrap_err();

        assert_eq!(reads.len(), 3);
        assert_eq!(value["password"], "hunter2");
        assert_eq!(value["nested"][1], "hunter2");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigError::Io { path, error } if path.ends_with("denied") && error.contains("denied")
        ));
    }

    #[test]
    fn test_absolute_path_kept() {
        let resolved = resolve_reference_path("/etc/graph.pass", Path::new("/srv"));
        assert_eq!(resolved, PathBuf::from("/etc/graph.pass"));
    }

    #[test]
    fn test_relative_path_joined() {
        let resolved = resolve_reference_path("secrets/pass", Path::new("/srv"));
        assert_eq!(resolved, PathBuf::from("/srv/secrets/pass"));
    }
}
