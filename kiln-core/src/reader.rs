//! Reading source documents, dispatching YAML vs JSON on extension only.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::IndexError;

/// Whether the file's extension marks it as YAML.
#[must_use]
pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(std::ffi::OsStr::to_str),
        Some("yaml" | "yml")
    )
}

/// Reads and parses a document as YAML or JSON, selected by extension.
///
/// # Errors
/// Fails when the file cannot be read or parsed.
pub fn read_document(path: &Path) -> Result<Value, IndexError> {
    let contents = fs::read_to_string(path).map_err(|source| IndexError::io(path, source))?;
    if is_yaml(path) {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&contents).map_err(|error| IndexError::Deserialize {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;
        serde_json::to_value(parsed).map_err(|error| IndexError::Deserialize {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    } else {
        serde_json::from_str(&contents).map_err(|error| IndexError::Deserialize {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_is_by_extension_only() {
        let directory = tempfile::tempdir().unwrap();
        // JSON is valid YAML, but YAML is not valid JSON; content sniffing
        // would accept this file, extension dispatch must not.
        let path = directory.path().join("schema.json");
        fs::write(&path, "type: string\n").unwrap();
        assert!(read_document(&path).is_err());

        let path = directory.path().join("schema.yaml");
        fs::write(&path, "type: string\n").unwrap();
        let value = read_document(&path).unwrap();
        assert_eq!(value, serde_json::json!({"type": "string"}));
    }
}
