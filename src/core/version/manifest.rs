// ─── Version List ───
// The upstream list of every published game version (version_manifest_v2).

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::mirror::Mirror;

#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(rename = "releaseTime", default)]
    pub release_time: Option<String>,
}

impl VersionManifest {
    /// Fetch the list from a mirror's metadata host.
    pub async fn fetch(downloader: &Downloader, mirror: &Mirror) -> LauncherResult<Self> {
        let url = mirror.version_manifest_url();
        info!("Fetching version list from {}", url);
        let manifest: VersionManifest = downloader.fetch_json(&url).await?;
        info!("Loaded {} versions", manifest.versions.len());
        Ok(manifest)
    }

    /// Exact id match only; `1.20` never resolves to `1.20.1`.
    pub fn find_version(&self, id: &str) -> LauncherResult<&VersionEntry> {
        self.versions
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| LauncherError::VersionNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> VersionManifest {
        serde_json::from_value(serde_json::json!({
            "latest": {"release": "1.20.1", "snapshot": "23w31a"},
            "versions": [
                {"id": "1.20.1", "type": "release", "url": "https://piston-meta.mojang.com/v1/packages/x/1.20.1.json",
                 "sha1": "x", "releaseTime": "2023-06-12T13:25:51+00:00"},
                {"id": "1.20", "type": "release", "url": "https://piston-meta.mojang.com/v1/packages/y/1.20.json"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn exact_match() {
        let m = manifest();
        assert_eq!(m.find_version("1.20").unwrap().id, "1.20");
        assert_eq!(m.find_version("1.20.1").unwrap().version_type, "release");
    }

    #[test]
    fn no_fuzzy_match() {
        let m = manifest();
        assert!(matches!(
            m.find_version("1.20.2"),
            Err(LauncherError::VersionNotFound(id)) if id == "1.20.2"
        ));
        assert!(m.find_version("1.2").is_err());
    }
}
