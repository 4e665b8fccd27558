//! Reading and merging configuration documents
//!
//! Documents are JSON with two relaxations: backslashes are always literal
//! (Windows paths can be written as-is) and lines starting with `//` are
//! comments.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{ConfigError, ConfigResult};

/// Parse document text into a JSON value
pub fn parse_document(text: &str) -> Result<Value, serde_json::Error> {
    let escaped = text.replace('\\', "\\\\");
    let minified: String = escaped
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .flat_map(|line| [line, "\n"])
        .collect();
    serde_json::from_str(&minified)
}

/// Read and parse one document from disk
pub async fn read_document(path: &Path) -> ConfigResult<Value> {
    debug!("Loading JSON config from {}", path.display());

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_document(&text).map_err(|e| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Recursively merge `overlay` into `base`
///
/// Nested objects merge key-wise; anything else in `overlay` replaces the
/// value in `base`.
pub fn merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        let Value::Object(nested) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = base.get_mut(&key) {
            merge(existing, nested);
            continue;
        }
        base.insert(key, Value::Object(nested));
    }
}

/// Read every document in order and merge them, later ones taking precedence
pub async fn load_merged<P: AsRef<Path>>(paths: &[P]) -> ConfigResult<Map<String, Value>> {
    if paths.is_empty() {
        return Err(ConfigError::NoDocuments);
    }

    let mut merged = Map::new();
    for path in paths {
        let path = path.as_ref();
        let document = match read_document(path).await? {
            Value::Object(map) => map,
            _ => {
                return Err(ConfigError::NotAnObject {
                    what: path.display().to_string(),
                })
            }
        };
        merge(&mut merged, document);
    }

    debug!(
        "Merged configuration:\n{}",
        serde_json::to_string_pretty(&merged).unwrap_or_default()
    );
    Ok(merged)
}
