use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::config::AuthBridgeArtifact;
use crate::core::downloader::{Downloader, FileFetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventBus;
use crate::core::retry::RetryPolicy;
use crate::core::verify::{self, HashAlgorithm};

/// `artifact/<build>.json` as served by authlib-injector and its mirrors.
#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    download_url: String,
    checksums: ReleaseChecksums,
}

#[derive(Debug, Deserialize)]
struct ReleaseChecksums {
    sha256: String,
}

/// Fill in the digest (and download url) from the release metadata when no
/// hash is pinned. An unreachable or malformed metadata endpoint leaves the
/// artifact unpinned.
pub async fn resolve_auth_bridge(
    downloader: &Downloader,
    artifact: &AuthBridgeArtifact,
    events: &EventBus,
) -> AuthBridgeArtifact {
    let pinned = artifact.sha256.as_deref().is_some_and(|h| !h.trim().is_empty());
    let Some(metadata_url) = artifact.metadata_url.as_deref().filter(|_| !pinned) else {
        return artifact.clone();
    };

    match downloader.fetch_json::<ReleaseMetadata>(metadata_url).await {
        Ok(release) if is_sha256_hex(&release.checksums.sha256) => {
            debug!("Auth bridge digest {} from {}", release.checksums.sha256, metadata_url);
            AuthBridgeArtifact {
                url: release.download_url,
                sha256: Some(release.checksums.sha256),
                ..artifact.clone()
            }
        }
        Ok(release) => {
            warn!("Ignoring malformed auth bridge digest {:?}", release.checksums.sha256);
            artifact.clone()
        }
        Err(e) => {
            warn!("Auth bridge metadata unavailable ({}): {}", metadata_url, e);
            events.log("Authlib checksum unavailable - checking presence only");
            artifact.clone()
        }
    }
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Make sure the authlib-injector agent sits at `dest`.
///
/// A pinned hash that already matches skips the download; without a pinned
/// hash an existing file is trusted as is. Downloads go through `retry`
/// only. A mismatch after download is a warning when the artifact tolerates
/// it and a hard `IntegrityMismatch` otherwise.
pub async fn ensure_auth_bridge(
    fetcher: &dyn FileFetcher,
    retry: &RetryPolicy,
    artifact: &AuthBridgeArtifact,
    dest: &Path,
    events: &EventBus,
) -> LauncherResult<()> {
    let pinned = artifact.sha256.as_deref().filter(|h| !h.trim().is_empty());

    match pinned {
        Some(expected) if verify::verify(dest, expected).await? => {
            info!("Auth bridge present and verified at {:?}", dest);
            return Ok(());
        }
        None if dest.is_file() => {
            info!("Auth bridge present at {:?} (unpinned)", dest);
            return Ok(());
        }
        _ => {}
    }

    retry
        .run("Download Authlib", || fetcher.fetch(&artifact.url, dest))
        .await?;

    let Some(expected) = pinned else {
        info!("Auth bridge downloaded (unpinned)");
        return Ok(());
    };
    if verify::verify(dest, expected).await? {
        return Ok(());
    }

    let actual = verify::hash_file(dest, HashAlgorithm::Sha256)
        .await
        .unwrap_or_default();
    if artifact.tolerates_integrity_mismatch {
        warn!("Auth bridge hash mismatch: expected {}, got {}", expected, actual);
        events.log("Authlib hash mismatch - using anyway");
        return Ok(());
    }

    if let Err(e) = tokio::fs::remove_file(dest).await {
        debug!("Cannot remove rejected auth bridge {:?}: {}", dest, e);
    }
    Err(LauncherError::IntegrityMismatch {
        path: dest.to_path_buf(),
        expected: expected.to_string(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::LauncherEvent;
    use crate::core::verify::sha256_hex;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticFetcher {
        body: &'static [u8],
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn new(body: &'static [u8]) -> Self {
            Self {
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str, dest: &Path) -> LauncherResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, self.body)
                .await
                .map_err(|e| LauncherError::io(dest, e))
        }
    }

    fn artifact(sha256: Option<String>, lenient: bool) -> AuthBridgeArtifact {
        AuthBridgeArtifact {
            url: "http://bridge.invalid/authlib-injector.jar".into(),
            sha256,
            metadata_url: None,
            file_name: "authlib-injector.jar".into(),
            tolerates_integrity_mismatch: lenient,
        }
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn pinned_and_verified_is_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("authlib-injector.jar");
        let fetcher = StaticFetcher::new(b"agent");
        let pinned = artifact(Some(sha256_hex(b"agent")), false);

        for _ in 0..2 {
            ensure_auth_bridge(&fetcher, &quick_retry(), &pinned, &dest, &EventBus::default())
                .await
                .unwrap();
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lenient_mismatch_warns_and_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("authlib-injector.jar");
        let fetcher = StaticFetcher::new(b"patched agent");
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();

        ensure_auth_bridge(
            &fetcher,
            &quick_retry(),
            &artifact(Some(sha256_hex(b"agent")), true),
            &dest,
            &bus,
        )
        .await
        .unwrap();

        assert!(dest.is_file());
        assert!(sub.drain().iter().any(
            |e| matches!(e, LauncherEvent::Log(l) if l == "Authlib hash mismatch - using anyway")
        ));
    }

    #[tokio::test]
    async fn strict_mismatch_fails_and_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("authlib-injector.jar");
        let fetcher = StaticFetcher::new(b"patched agent");

        let err = ensure_auth_bridge(
            &fetcher,
            &quick_retry(),
            &artifact(Some(sha256_hex(b"agent")), false),
            &dest,
            &EventBus::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LauncherError::IntegrityMismatch { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn unpinned_existing_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("authlib-injector.jar");
        std::fs::write(&dest, b"whatever").unwrap();
        let fetcher = StaticFetcher::new(b"agent");

        ensure_auth_bridge(&fetcher, &quick_retry(), &artifact(None, false), &dest, &EventBus::default())
            .await
            .unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unpinned_bridge_takes_the_published_digest() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let digest = sha256_hex(b"agent");
        Mock::given(method("GET"))
            .and(path("/artifact/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "build_number": 53,
                "version": "1.2.5",
                "download_url": format!("{}/authlib-injector-1.2.5.jar", server.uri()),
                "checksums": {"sha256": digest}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut unpinned = artifact(None, false);
        unpinned.metadata_url = Some(format!("{}/artifact/latest.json", server.uri()));
        let downloader = Downloader::new(reqwest::Client::new());

        let resolved = resolve_auth_bridge(&downloader, &unpinned, &EventBus::default()).await;
        assert_eq!(resolved.sha256.as_deref(), Some(digest.as_str()));
        assert_eq!(resolved.url, format!("{}/authlib-injector-1.2.5.jar", server.uri()));

        // A truncated agent on disk is now caught by the hash, not trusted.
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("authlib-injector.jar");
        std::fs::write(&dest, b"trunc").unwrap();
        let fetcher = StaticFetcher::new(b"agent");
        ensure_auth_bridge(&fetcher, &quick_retry(), &resolved, &dest, &EventBus::default())
            .await
            .unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"agent");
    }

    #[tokio::test]
    async fn unreachable_metadata_leaves_the_artifact_unpinned() {
        let mut unpinned = artifact(None, false);
        unpinned.metadata_url = Some("http://127.0.0.1:9/artifact/latest.json".into());
        let downloader = Downloader::new(reqwest::Client::new());

        let resolved = resolve_auth_bridge(&downloader, &unpinned, &EventBus::default()).await;
        assert_eq!(resolved, unpinned);
    }

    #[tokio::test]
    async fn pinned_hash_skips_the_metadata_lookup() {
        let mut pinned = artifact(Some(sha256_hex(b"agent")), false);
        pinned.metadata_url = Some("http://127.0.0.1:9/artifact/latest.json".into());
        let downloader = Downloader::new(reqwest::Client::new());

        let resolved = resolve_auth_bridge(&downloader, &pinned, &EventBus::default()).await;
        assert_eq!(resolved, pinned);
    }
}
