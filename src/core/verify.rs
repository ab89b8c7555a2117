// ─── Content Verifier ───
// Answers "is the file at this path exactly the expected content?"

use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::core::error::{LauncherError, LauncherResult};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// Manifest files and the auth bridge.
    Sha256,
    /// Vendor version descriptors (libraries, client jars, asset objects).
    Sha1,
}

/// SHA-256 check of `path` against `expected_hex`.
pub async fn verify(path: &Path, expected_hex: &str) -> LauncherResult<bool> {
    verify_with(path, expected_hex, HashAlgorithm::Sha256).await
}

/// A missing file is `Ok(false)`. Any other read failure is an error, so a
/// permission problem is never mistaken for "needs download".
pub async fn verify_with(
    path: &Path,
    expected_hex: &str,
    algorithm: HashAlgorithm,
) -> LauncherResult<bool> {
    match hash_file(path, algorithm).await {
        Ok(actual) => Ok(actual.eq_ignore_ascii_case(expected_hex.trim())),
        Err(LauncherError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Lowercase hex digest of the whole file, streamed in fixed-size chunks.
pub async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> LauncherResult<String> {
    match algorithm {
        HashAlgorithm::Sha256 => digest_file::<Sha256>(path).await,
        HashAlgorithm::Sha1 => digest_file::<Sha1>(path).await,
    }
}

async fn digest_file<D: Digest>(path: &Path) -> LauncherResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matches_written_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.jar");
        let body = b"some mod bytes".to_vec();
        std::fs::write(&path, &body).unwrap();

        assert!(verify(&path, &sha256_hex(&body)).await.unwrap());
    }

    #[tokio::test]
    async fn hex_comparison_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"abc").unwrap();

        let upper = sha256_hex(b"abc").to_uppercase();
        assert!(verify(&path, &upper).await.unwrap());
    }

    #[tokio::test]
    async fn single_changed_byte_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        let mut body = vec![7u8; 200_000];
        let expected = sha256_hex(&body);
        body[150_000] ^= 0x01;
        std::fs::write(&path, &body).unwrap();

        assert!(!verify(&path, &expected).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let result = verify(&dir.path().join("nope.jar"), "00").await.unwrap();
        assert!(!result);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory as a file fails with something other than NotFound.
        let result = verify(dir.path(), "00").await;
        assert!(matches!(result, Err(LauncherError::Io { .. })));
    }

    #[tokio::test]
    async fn sha1_descriptor_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.jar");
        std::fs::write(&path, b"abc").unwrap();
        let ok = verify_with(
            &path,
            "a9993e364706816aba3e25717850c26c9cd0d89d",
            HashAlgorithm::Sha1,
        )
        .await
        .unwrap();
        assert!(ok);
    }
}
