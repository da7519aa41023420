mod blob;
mod error;
mod files;
mod memory;

pub use blob::BlobStore;
pub use error::StoreError;
pub use files::{decode_checksummed, encode_checksummed, read_collection_file};
pub use memory::MemoryBlobStore;
