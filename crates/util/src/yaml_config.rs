//! Read and edit instance `config.yaml` files.
//!
//! The apiserver config stores listen addresses either as a plain string or
//! as a single-element list; the getters normalize both shapes to a string.
//! Writes preserve the rest of the document and keep key order.

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Error surfaced when reading or writing an instance config file.
#[derive(Debug, Error)]
pub enum YamlConfigError {
    /// I/O failure (missing file, permissions).
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid YAML, or not a mapping at the top level.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// The document's top level is not a mapping.
    #[error("config at {path} is not a YAML mapping")]
    NotAMapping { path: String },
    /// Append was asked to extend a key that holds a non-list value.
    #[error("key '{key}' does not hold a list")]
    NotAList { key: String },
}

/// Read a key, normalizing "string or first element of a list" to a string.
///
/// Returns `Ok(None)` when the key is absent or holds an empty list.
pub fn get_value(path: &Path, key: &str) -> Result<Option<String>, YamlConfigError> {
    let document = load_mapping(path)?;
    let value = match document.get(Value::String(key.to_string())) {
        Some(value) => value,
        None => return Ok(None),
    };
    Ok(scalar_or_first(value))
}

/// Set a key to a plain string value.
pub fn set_string(path: &Path, key: &str, value: &str) -> Result<(), YamlConfigError> {
    let mut document = load_mapping(path)?;
    document.insert(Value::String(key.to_string()), Value::String(value.to_string()));
    store_mapping(path, &document)
}

/// Set a key to a single-element list, the shape the apiserver expects for
/// its address keys.
pub fn set_list(path: &Path, key: &str, value: &str) -> Result<(), YamlConfigError> {
    let mut document = load_mapping(path)?;
    document.insert(
        Value::String(key.to_string()),
        Value::Sequence(vec![Value::String(value.to_string())]),
    );
    store_mapping(path, &document)
}

/// Append a value to a list-valued key, creating the list when absent.
/// Duplicate values are left as-is. Returns the resulting list.
pub fn append_value(path: &Path, key: &str, value: &str) -> Result<Vec<String>, YamlConfigError> {
    let mut document = load_mapping(path)?;
    let entry = document
        .entry(Value::String(key.to_string()))
        .or_insert_with(|| Value::Sequence(Vec::new()));

    let items = match entry {
        Value::Sequence(items) => items,
        _ => {
            return Err(YamlConfigError::NotAList { key: key.to_string() });
        }
    };
    let exists = items.iter().any(|item| item.as_str() == Some(value));
    if !exists {
        items.push(Value::String(value.to_string()));
    }
    let result = items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect();
    store_mapping(path, &document)?;
    Ok(result)
}

fn scalar_or_first(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Sequence(items) => items.first().and_then(|item| item.as_str().map(str::to_string)),
        _ => None,
    }
}

fn load_mapping(path: &Path) -> Result<Mapping, YamlConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Mapping::new());
        }
        Err(error) => return Err(error.into()),
    };
    if raw.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let document: Value = serde_yaml::from_str(&raw)?;
    match document {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(YamlConfigError::NotAMapping {
            path: path.display().to_string(),
        }),
    }
}

fn store_mapping(path: &Path, document: &Mapping) -> Result<(), YamlConfigError> {
    let raw = serde_yaml::to_string(document)?;
    fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_with(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn get_normalizes_string_and_list() {
        let (_dir, path) = config_with("addresses:\n- 127.0.0.1:2457\ninstance: demo\n");
        assert_eq!(get_value(&path, "addresses").unwrap().as_deref(), Some("127.0.0.1:2457"));
        assert_eq!(get_value(&path, "instance").unwrap().as_deref(), Some("demo"));
        assert_eq!(get_value(&path, "missing").unwrap(), None);
    }

    #[test]
    fn set_list_rewrites_address_key() {
        let (_dir, path) = config_with("addresses:\n- 127.0.0.1:2457\nother: keep\n");
        set_list(&path, "addresses", "127.0.0.1:9000").unwrap();
        assert_eq!(get_value(&path, "addresses").unwrap().as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(get_value(&path, "other").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn set_string_on_missing_file_creates_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        set_string(&path, "instance", "demo").unwrap();
        assert_eq!(get_value(&path, "instance").unwrap().as_deref(), Some("demo"));
    }

    #[test]
    fn append_creates_deduplicates_and_extends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        assert_eq!(append_value(&path, "addresses", "a").unwrap(), vec!["a"]);
        assert_eq!(append_value(&path, "addresses", "a").unwrap(), vec!["a"]);
        assert_eq!(append_value(&path, "addresses", "b").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn append_rejects_scalar_key() {
        let (_dir, path) = config_with("instance: demo\n");
        let error = append_value(&path, "instance", "x").unwrap_err();
        assert!(matches!(error, YamlConfigError::NotAList { .. }));
    }
}
