use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Io(String),
    ChecksumMismatch(String),
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(name) => write!(f, "blob not found: {name}"),
            StoreError::Io(msg) => write!(f, "io error: {msg}"),
            StoreError::ChecksumMismatch(path) => write!(f, "checksum mismatch: {path}"),
            StoreError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
