use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    ReadOnly(String),
    MergeIntoWritable(String),
    KeyNotOrderable(String),
    ItemNotFound(String),
    NotATable(String),
    InvalidOptions(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ReadOnly(name) => write!(f, "collection is read-only: {name}"),
            EngineError::MergeIntoWritable(name) => {
                write!(f, "cannot merge a read-only shard into writable collection: {name}")
            }
            EngineError::KeyNotOrderable(what) => write!(f, "value is not orderable: {what}"),
            EngineError::ItemNotFound(id) => write!(f, "item not found: {id}"),
            EngineError::NotATable(what) => write!(f, "expected a table: {what}"),
            EngineError::InvalidOptions(msg) => write!(f, "invalid collection options: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
