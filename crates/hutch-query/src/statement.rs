use serde_json::{Map, Value};

use crate::verb::Verb;

/// Parse error for query tables.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParseError(pub String);

impl std::fmt::Display for QueryParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "query parse error: {}", self.0)
    }
}

impl std::error::Error for QueryParseError {}

/// A query table shape-parsed into a typed statement.
///
/// Borrows every field from the input value. Resolution against a database
/// (does the collection exist, is the index declared, is the collection
/// writable) happens one layer up — this is purely the wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    Find(FindStatement<'a>),
    Insert(InsertStatement<'a>),
    Update(UpdateStatement<'a>),
    Delete(DeleteStatement<'a>),
    Create(CreateStatement<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindStatement<'a> {
    pub collection: &'a str,
    /// Index to scan; empty means the default `_id` index.
    pub index: &'a str,
    /// Name the current row is bound to inside the projection.
    pub alias: &'a str,
    pub criteria: Option<&'a Map<String, Value>>,
    /// Projection expression; absent projects the row itself.
    pub result: Option<&'a Value>,
    /// `find_all` when true, `find` (first match only) when false.
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement<'a> {
    pub collection: &'a str,
    /// Item table, or array of item tables.
    pub value: &'a Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement<'a> {
    pub collection: &'a str,
    pub index: &'a str,
    pub alias: &'a str,
    pub criteria: Option<&'a Map<String, Value>>,
    /// Patch expression; evaluates to a table of new field values.
    pub set: &'a Map<String, Value>,
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement<'a> {
    pub collection: &'a str,
    pub index: &'a str,
    pub criteria: Option<&'a Map<String, Value>>,
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateStatement<'a> {
    pub collection: &'a str,
    pub indices: Option<&'a Value>,
    /// Opaque; carried through creates and persistence untouched.
    pub crypts: Option<&'a Value>,
    pub items: Option<&'a Value>,
    pub if_not_exists: bool,
}

impl<'a> Statement<'a> {
    pub fn verb(&self) -> Verb {
        match self {
            Statement::Find(f) if f.all => Verb::FindAll,
            Statement::Find(_) => Verb::Find,
            Statement::Insert(_) => Verb::Insert,
            Statement::Update(u) if u.all => Verb::UpdateAll,
            Statement::Update(_) => Verb::Update,
            Statement::Delete(d) if d.all => Verb::DeleteAll,
            Statement::Delete(_) => Verb::Delete,
            Statement::Create(c) if c.if_not_exists => Verb::CreateIfNotExists,
            Statement::Create(_) => Verb::Create,
        }
    }

    pub fn collection(&self) -> &'a str {
        match self {
            Statement::Find(f) => f.collection,
            Statement::Insert(i) => i.collection,
            Statement::Update(u) => u.collection,
            Statement::Delete(d) => d.collection,
            Statement::Create(c) => c.collection,
        }
    }
}

/// Whether a value has the shape of a query table — a table with a `query`
/// field. Used to recognize sub-queries inside projection expressions.
pub fn is_query_table(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.contains_key("query"))
}

/// Parse a query table into a typed [`Statement`].
pub fn parse_statement(query: &Value) -> Result<Statement<'_>, QueryParseError> {
    let table = match query {
        Value::Object(map) => map,
        _ => return Err(QueryParseError("a query must be a table".into())),
    };

    let verb = match table.get("query") {
        Some(Value::String(s)) => Verb::from_str(s)
            .ok_or_else(|| QueryParseError(format!("unknown query verb: {s}")))?,
        Some(_) => return Err(QueryParseError("'query' must be a string".into())),
        None => return Err(QueryParseError("missing 'query' field".into())),
    };

    let collection = required_str(table, "collection")?;

    let statement = match verb {
        Verb::Find | Verb::FindAll => Statement::Find(FindStatement {
            collection,
            index: optional_str(table, "index")?,
            alias: optional_str(table, "alias")?,
            criteria: optional_table(table, "criteria")?,
            result: table.get("result"),
            all: verb == Verb::FindAll,
        }),
        Verb::Insert => {
            let value = table
                .get("value")
                .ok_or_else(|| QueryParseError("'insert' requires a 'value' field".into()))?;
            if !value.is_object() && !value.is_array() {
                return Err(QueryParseError(
                    "'value' must be a table or an array of tables".into(),
                ));
            }
            Statement::Insert(InsertStatement { collection, value })
        }
        Verb::Update | Verb::UpdateAll => {
            let set = match table.get("set") {
                Some(Value::Object(map)) => map,
                Some(_) => return Err(QueryParseError("'set' must be a table".into())),
                None => return Err(QueryParseError("'update' requires a 'set' field".into())),
            };
            Statement::Update(UpdateStatement {
                collection,
                index: optional_str(table, "index")?,
                alias: optional_str(table, "alias")?,
                criteria: optional_table(table, "criteria")?,
                set,
                all: verb == Verb::UpdateAll,
            })
        }
        Verb::Delete | Verb::DeleteAll => Statement::Delete(DeleteStatement {
            collection,
            index: optional_str(table, "index")?,
            criteria: optional_table(table, "criteria")?,
            all: verb == Verb::DeleteAll,
        }),
        Verb::Create | Verb::CreateIfNotExists => Statement::Create(CreateStatement {
            collection,
            indices: table.get("indices"),
            crypts: table.get("crypts"),
            items: table.get("items"),
            if_not_exists: verb == Verb::CreateIfNotExists,
        }),
    };

    Ok(statement)
}

fn required_str<'a>(
    table: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str, QueryParseError> {
    match table.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(QueryParseError(format!("'{field}' must not be empty"))),
        Some(_) => Err(QueryParseError(format!("'{field}' must be a string"))),
        None => Err(QueryParseError(format!("missing '{field}' field"))),
    }
}

fn optional_str<'a>(
    table: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str, QueryParseError> {
    match table.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(QueryParseError(format!("'{field}' must be a string"))),
        None => Ok(""),
    }
}

fn optional_table<'a>(
    table: &'a Map<String, Value>,
    field: &str,
) -> Result<Option<&'a Map<String, Value>>, QueryParseError> {
    match table.get(field) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(QueryParseError(format!("'{field}' must be a table"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_all_with_criteria() {
        let query = json!({
            "query": "find_all",
            "collection": "people",
            "index": "age",
            "criteria": { "min": 15, "max": 25 },
            "result": { "n": "$name" }
        });
        let stmt = parse_statement(&query).unwrap();
        match stmt {
            Statement::Find(f) => {
                assert_eq!(f.collection, "people");
                assert_eq!(f.index, "age");
                assert!(f.all);
                assert!(f.criteria.is_some());
                assert_eq!(f.result, Some(&json!({ "n": "$name" })));
            }
            _ => panic!("expected Find"),
        }
    }

    #[test]
    fn find_defaults() {
        let query = json!({ "query": "find", "collection": "people" });
        match parse_statement(&query).unwrap() {
            Statement::Find(f) => {
                assert_eq!(f.index, "");
                assert_eq!(f.alias, "");
                assert!(f.criteria.is_none());
                assert!(!f.all);
            }
            _ => panic!("expected Find"),
        }
    }

    #[test]
    fn insert_single_table() {
        let query = json!({ "query": "insert", "collection": "people", "value": { "name": "A" } });
        assert!(matches!(
            parse_statement(&query).unwrap(),
            Statement::Insert(_)
        ));
    }

    #[test]
    fn insert_requires_value() {
        let query = json!({ "query": "insert", "collection": "people" });
        let err = parse_statement(&query).unwrap_err();
        assert!(err.0.contains("value"), "{}", err.0);
    }

    #[test]
    fn insert_scalar_value_rejected() {
        let query = json!({ "query": "insert", "collection": "people", "value": 42 });
        assert!(parse_statement(&query).is_err());
    }

    #[test]
    fn update_requires_set_table() {
        let query = json!({ "query": "update", "collection": "people", "set": 1 });
        assert!(parse_statement(&query).is_err());

        let query = json!({ "query": "update_all", "collection": "people", "set": { "a": 1 } });
        match parse_statement(&query).unwrap() {
            Statement::Update(u) => assert!(u.all),
            _ => panic!("expected Update"),
        }
    }

    #[test]
    fn create_if_not_exists_flag() {
        let query = json!({
            "query": "create_if_not_exists",
            "collection": "people",
            "indices": [{ "name": "age" }]
        });
        match parse_statement(&query).unwrap() {
            Statement::Create(c) => assert!(c.if_not_exists),
            _ => panic!("expected Create"),
        }
    }

    #[test]
    fn non_table_query_rejected() {
        assert!(parse_statement(&json!([1, 2])).is_err());
    }

    #[test]
    fn missing_verb_rejected() {
        let err = parse_statement(&json!({ "collection": "people" })).unwrap_err();
        assert!(err.0.contains("query"), "{}", err.0);
    }

    #[test]
    fn unknown_verb_rejected() {
        let err =
            parse_statement(&json!({ "query": "drop", "collection": "people" })).unwrap_err();
        assert!(err.0.contains("unknown query verb"), "{}", err.0);
    }

    #[test]
    fn missing_collection_rejected() {
        assert!(parse_statement(&json!({ "query": "find" })).is_err());
    }

    #[test]
    fn criteria_must_be_table() {
        let query = json!({ "query": "find", "collection": "people", "criteria": 5 });
        assert!(parse_statement(&query).is_err());
    }

    #[test]
    fn query_table_sniff() {
        assert!(is_query_table(&json!({ "query": "find", "collection": "c" })));
        assert!(!is_query_table(&json!({ "name": "x" })));
        assert!(!is_query_table(&json!("query")));
    }

    #[test]
    fn verb_accessor_matches_parse() {
        let query = json!({ "query": "delete_all", "collection": "people" });
        let stmt = parse_statement(&query).unwrap();
        assert_eq!(stmt.verb(), Verb::DeleteAll);
        assert_eq!(stmt.collection(), "people");
    }
}
