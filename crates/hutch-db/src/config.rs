use serde::Deserialize;
use serde_json::Value;

use crate::error::DbError;

/// Construction options for a database.
///
/// - `directory` — path prefix for read-only collection files
/// - `collections` — read-only file stems relative to `directory`
/// - `writable_collections` — one collection options table per writable
///   collection (the same shape a `create` verb takes)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    pub directory: String,
    pub collections: Vec<String>,
    pub writable_collections: Vec<Value>,
}

impl DatabaseOptions {
    /// Parse an options table. Shape violations are fatal config errors.
    pub fn from_value(options: &Value) -> Result<Self, DbError> {
        serde_json::from_value(options.clone()).map_err(|e| DbError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_options_parse() {
        let options = DatabaseOptions::from_value(&json!({
            "directory": "data/",
            "collections": ["tables/weapons", "tables/armor"],
            "writable_collections": [{ "name": "progress", "indices": [{ "name": "level" }] }]
        }))
        .unwrap();
        assert_eq!(options.directory, "data/");
        assert_eq!(options.collections.len(), 2);
        assert_eq!(options.writable_collections.len(), 1);
    }

    #[test]
    fn missing_fields_default() {
        let options = DatabaseOptions::from_value(&json!({})).unwrap();
        assert!(options.directory.is_empty());
        assert!(options.collections.is_empty());
        assert!(options.writable_collections.is_empty());
    }

    #[test]
    fn non_string_collection_stems_are_fatal() {
        let err = DatabaseOptions::from_value(&json!({ "collections": [1, 2] })).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }
}
