use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one query execution: the produced value, or the combined
/// error message (including the serialized failing query).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    result: Value,
    errors: Option<String>,
}

impl QueryResult {
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            errors: None,
        }
    }

    pub fn failed(errors: String) -> Self {
        Self {
            result: Value::Null,
            errors: Some(errors),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.is_some()
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn into_result(self) -> Value {
        self.result
    }

    pub fn errors(&self) -> Option<&str> {
        self.errors.as_deref()
    }
}
