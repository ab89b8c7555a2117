use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Transfer capability used by the synchronizer and the install steps.
/// Implementations must leave `dest` untouched unless the whole body arrived.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> LauncherResult<()>;
}

/// Streaming HTTP downloader.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Single file download ────────────────────────────

    /// Stream `url` into `<dest>.part`, then rename it over `dest`.
    ///
    /// The file handle is dropped before the rename so Windows does not
    /// refuse to move it.
    pub async fn download_file(&self, url: &str, dest: &Path) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let part = part_path(dest);
        let written = self.write_body(response, &part).await;
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&part).await {
                debug!("Cannot remove partial download {:?}: {}", part, cleanup);
            }
            return Err(e);
        }

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }

    async fn write_body(&self, response: reqwest::Response, part: &Path) -> LauncherResult<()> {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| LauncherError::io(part, e))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(part, e))?;
        }
        file.flush().await.map_err(|e| LauncherError::io(part, e))?;
        Ok(())
    }

    // ── Metadata ────────────────────────────────────────

    pub async fn fetch_text(&self, url: &str) -> LauncherResult<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> LauncherResult<T> {
        let text = self.fetch_text(url).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl FileFetcher for Downloader {
    async fn fetch(&self, url: &str, dest: &Path) -> LauncherResult<()> {
        self.download_file(url, dest).await
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::{build_http_client, DEFAULT_TIMEOUT};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader() -> Downloader {
        Downloader::new(build_http_client(DEFAULT_TIMEOUT).unwrap())
    }

    #[tokio::test]
    async fn streams_body_into_place() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mods/a.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jar bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("mods").join("a.jar");
        downloader()
            .download_file(&format!("{}/mods/a.jar", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"jar bytes");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn http_error_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        let err = downloader()
            .download_file(&format!("{}/a.jar", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn part_file_sits_next_to_destination() {
        let p = part_path(Path::new("/tmp/x/mod.jar"));
        assert_eq!(p, PathBuf::from("/tmp/x/mod.jar.part"));
    }
}
