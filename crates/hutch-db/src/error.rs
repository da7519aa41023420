use std::fmt;

use hutch_engine::EngineError;
use hutch_query::QueryParseError;
use hutch_store::StoreError;

#[derive(Debug)]
pub enum DbError {
    Store(StoreError),
    Engine(EngineError),
    Query(String),
    Config(String),
    Serialization(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Store(e) => write!(f, "store error: {e}"),
            DbError::Engine(e) => write!(f, "engine error: {e}"),
            DbError::Query(msg) => write!(f, "query error: {msg}"),
            DbError::Config(msg) => write!(f, "config error: {msg}"),
            DbError::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<StoreError> for DbError {
    fn from(e: StoreError) -> Self {
        DbError::Store(e)
    }
}

impl From<EngineError> for DbError {
    fn from(e: EngineError) -> Self {
        DbError::Engine(e)
    }
}

impl From<QueryParseError> for DbError {
    fn from(e: QueryParseError) -> Self {
        DbError::Query(e.0)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}
