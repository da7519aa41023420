use serde_json::{Map, Value};

use crate::statement::QueryParseError;

/// A row-selection criterion evaluated against one index.
///
/// Forms are mutually exclusive and checked in this order:
/// - `{ "like": expr }` — equality run at the expression's key
/// - `{ "min": a, "max": b }` — inclusive range
/// - `{ "exists_in": expr-or-array }` — per-element key probe
///
/// An absent criteria table means a full index scan and is represented by
/// `Option<Criteria>` at the statement level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criteria<'a> {
    Like(&'a Value),
    Range { min: &'a Value, max: &'a Value },
    ExistsIn(&'a Value),
}

impl<'a> Criteria<'a> {
    pub fn from_table(table: &'a Map<String, Value>) -> Result<Criteria<'a>, QueryParseError> {
        if let Some(like) = table.get("like") {
            Ok(Criteria::Like(like))
        } else if let (Some(min), Some(max)) = (table.get("min"), table.get("max")) {
            Ok(Criteria::Range { min, max })
        } else if let Some(values) = table.get("exists_in") {
            Ok(Criteria::ExistsIn(values))
        } else {
            Err(QueryParseError(
                "criteria must be one of 'like', 'min'/'max', 'exists_in'".into(),
            ))
        }
    }
}
