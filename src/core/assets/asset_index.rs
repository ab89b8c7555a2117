use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::artifacts::VendorFile;
use crate::core::instance::GameFolder;
use crate::core::mirror::Mirror;
use crate::core::version::AssetIndexInfo;

/// Asset index JSON: logical name → content-addressed object.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

impl AssetIndex {
    /// Use the saved index when present, else fetch it through the mirror and
    /// save it under `assets/indexes/<id>.json`.
    pub async fn load_or_fetch(
        info: &AssetIndexInfo,
        folder: &GameFolder,
        downloader: &Downloader,
        mirror: &Mirror,
    ) -> LauncherResult<Self> {
        let path = folder.asset_index(&info.id);
        if let Ok(raw) = tokio::fs::read_to_string(&path).await {
            if let Ok(index) = serde_json::from_str::<AssetIndex>(&raw) {
                return Ok(index);
            }
        }

        let raw = downloader.fetch_text(&mirror.rewrite_url(&info.url)).await?;
        let index: AssetIndex = serde_json::from_str(&raw)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(&path, &raw)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        info!("Saved asset index {} ({} objects)", info.id, index.objects.len());
        Ok(index)
    }

    /// One vendor file per distinct object, served from the mirror's asset host.
    pub fn object_files(&self, folder: &GameFolder, mirror: &Mirror) -> Vec<VendorFile> {
        let mut hashes: Vec<&str> = self
            .objects
            .values()
            .map(|o| o.hash.as_str())
            .filter(|h| is_sha1_hex(h))
            .collect();
        hashes.sort_unstable();
        hashes.dedup();

        hashes
            .into_iter()
            .map(|hash| VendorFile {
                url: format!("{}/{}/{}", mirror.asset_host, &hash[..2], hash),
                dest: folder.asset_object(hash),
                sha1: Some(hash.to_string()),
            })
            .collect()
    }
}

/// Objects are addressed by their SHA-1; anything else cannot be a valid
/// path component under `assets/objects`.
fn is_sha1_hex(hash: &str) -> bool {
    hash.len() == 40 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}
