use std::path::PathBuf;

use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::core::downloader::{Downloader, FileFetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::verify::{self, HashAlgorithm};

/// A vendor file (library, client jar, asset object) with its SHA-1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorFile {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

/// Fetch every file that is missing or fails its SHA-1, at most
/// `concurrency` at a time. Every file is attempted; the first failure is
/// returned afterwards. Returns how many files were downloaded.
pub async fn fetch_missing(
    downloader: &Downloader,
    files: Vec<VendorFile>,
    concurrency: usize,
) -> LauncherResult<usize> {
    let results: Vec<LauncherResult<bool>> = stream::iter(files)
        .map(|file| async move { ensure_file(downloader, &file).await })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut downloaded = 0;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(true) => downloaded += 1,
            Ok(false) => {}
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(downloaded),
    }
}

async fn ensure_file(downloader: &Downloader, file: &VendorFile) -> LauncherResult<bool> {
    if is_present(file).await? {
        return Ok(false);
    }
    downloader.fetch(&file.url, &file.dest).await?;
    if let Some(expected) = &file.sha1 {
        if !verify::verify_with(&file.dest, expected, HashAlgorithm::Sha1).await? {
            let actual = verify::hash_file(&file.dest, HashAlgorithm::Sha1)
                .await
                .unwrap_or_default();
            if let Err(e) = tokio::fs::remove_file(&file.dest).await {
                debug!("Cannot remove corrupt {:?}: {}", file.dest, e);
            }
            return Err(LauncherError::IntegrityMismatch {
                path: file.dest.clone(),
                expected: expected.clone(),
                actual,
            });
        }
    }
    debug!("Fetched {:?}", file.dest);
    Ok(true)
}

async fn is_present(file: &VendorFile) -> LauncherResult<bool> {
    match &file.sha1 {
        Some(expected) => verify::verify_with(&file.dest, expected, HashAlgorithm::Sha1).await,
        None => Ok(file.dest.is_file()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::{build_http_client, DEFAULT_TIMEOUT};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn present_files_are_not_refetched_and_bad_hash_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/good.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tampered".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(build_http_client(DEFAULT_TIMEOUT).unwrap());
        let good = VendorFile {
            url: format!("{}/good.jar", server.uri()),
            dest: dir.path().join("good.jar"),
            sha1: Some("a9993e364706816aba3e25717850c26c9cd0d89d".into()),
        };

        assert_eq!(fetch_missing(&downloader, vec![good.clone()], 4).await.unwrap(), 1);
        assert_eq!(fetch_missing(&downloader, vec![good], 4).await.unwrap(), 0);

        let bad = VendorFile {
            url: format!("{}/bad.jar", server.uri()),
            dest: dir.path().join("bad.jar"),
            sha1: Some("a9993e364706816aba3e25717850c26c9cd0d89d".into()),
        };
        let err = fetch_missing(&downloader, vec![bad], 4).await.unwrap_err();
        assert!(matches!(err, LauncherError::IntegrityMismatch { .. }));
        assert!(!dir.path().join("bad.jar").exists());
    }
}
