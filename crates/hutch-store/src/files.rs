use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Width of the hex CRC32 line at the head of a `.dat` file.
const CHECKSUM_WIDTH: usize = 8;

/// Wrap a payload in the checksummed `.dat` layout: eight lowercase hex
/// chars of the payload's CRC32, a newline, then the payload.
pub fn encode_checksummed(payload: &str) -> String {
    let crc = crc32fast::hash(payload.as_bytes());
    format!("{crc:08x}\n{payload}")
}

/// Strip and verify the checksum line of a `.dat` body, returning the payload.
pub fn decode_checksummed<'a>(body: &'a str, origin: &str) -> Result<&'a str, StoreError> {
    let (head, payload) = body
        .split_once('\n')
        .ok_or_else(|| StoreError::ChecksumMismatch(origin.to_string()))?;
    if head.len() != CHECKSUM_WIDTH {
        return Err(StoreError::ChecksumMismatch(origin.to_string()));
    }
    let expected = u32::from_str_radix(head, 16)
        .map_err(|_| StoreError::ChecksumMismatch(origin.to_string()))?;
    if crc32fast::hash(payload.as_bytes()) != expected {
        return Err(StoreError::ChecksumMismatch(origin.to_string()));
    }
    Ok(payload)
}

/// Read a read-only collection file by stem.
///
/// `encoded = false` reads `{stem}.json` as-is; `encoded = true` reads
/// `{stem}.dat` and verifies its checksum line. Returns the JSON payload.
pub fn read_collection_file(stem: &Path, encoded: bool) -> Result<String, StoreError> {
    // The suffix is appended, never substituted — stems may contain dots.
    let suffix = if encoded { "dat" } else { "json" };
    let path = PathBuf::from(format!("{}.{suffix}", stem.display()));
    let body = fs::read_to_string(&path)?;
    if encoded {
        Ok(decode_checksummed(&body, &path.to_string_lossy())?.to_string())
    } else {
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn checksummed_roundtrip() {
        let payload = r#"{"name":"weapons","items":[]}"#;
        let encoded = encode_checksummed(payload);
        assert_eq!(decode_checksummed(&encoded, "test").unwrap(), payload);
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut encoded = encode_checksummed(r#"{"name":"weapons"}"#);
        encoded.push('x');
        assert!(matches!(
            decode_checksummed(&encoded, "test"),
            Err(StoreError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn missing_checksum_line_fails() {
        assert!(decode_checksummed("no newline here", "test").is_err());
    }

    #[test]
    fn reads_plain_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weapons.json");
        fs::write(&path, r#"{"name":"weapons"}"#).unwrap();

        let body = read_collection_file(&dir.path().join("weapons"), false).unwrap();
        assert_eq!(body, r#"{"name":"weapons"}"#);
    }

    #[test]
    fn reads_encoded_dat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weapons.dat");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", encode_checksummed(r#"{"name":"weapons"}"#)).unwrap();

        let body = read_collection_file(&dir.path().join("weapons"), true).unwrap();
        assert_eq!(body, r#"{"name":"weapons"}"#);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_collection_file(&dir.path().join("nope"), false),
            Err(StoreError::Io(_))
        ));
    }
}
