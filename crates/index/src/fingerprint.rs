use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::path::Path;

/// Hex SHA-256 of a byte slice. Pure and deterministic; this equality is the
/// sole gate for skipping index rebuilds, so it must be collision-resistant.
///
/// Also the digest the VCS layer computes for blob content at a ref, so the
/// publisher's eligibility comparison has a single definition.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Digest a file's current content. Read failures propagate; an unreadable
/// file is never treated as "unchanged".
pub async fn digest_file(path: impl AsRef<Path>) -> Result<String> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(digest_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn identical_bytes_identical_digest() {
        assert_eq!(digest_bytes(b"hello"), digest_bytes(b"hello"));
    }

    #[test]
    fn any_byte_change_changes_digest() {
        assert_ne!(digest_bytes(b"hello"), digest_bytes(b"hello!"));
        assert_ne!(digest_bytes(b""), digest_bytes(b" "));
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            digest_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn file_digest_matches_byte_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.md");
        tokio::fs::write(&path, b"content").await.unwrap();
        assert_eq!(digest_file(&path).await.unwrap(), digest_bytes(b"content"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(digest_file(dir.path().join("absent.md")).await.is_err());
    }
}
