// ─── Dependency Closure ───
// Client jar, libraries, natives and asset objects of a resolved version.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::core::assets::AssetIndex;
use crate::core::downloader::Downloader;
use crate::core::error::LauncherResult;
use crate::core::events::EventBus;
use crate::core::instance::GameFolder;
use crate::core::mirror::{Mirror, MirrorFailover};
use crate::core::version::{LibraryFile, ResolvedVersion};

use super::artifacts::{fetch_missing, VendorFile};

/// Every downloadable file `version` needs on this OS, with URLs mapped onto
/// `mirror`. Installer-generated libraries without a URL are left out.
pub async fn closure_files(
    version: &ResolvedVersion,
    folder: &GameFolder,
    downloader: &Downloader,
    mirror: &Mirror,
) -> LauncherResult<Vec<VendorFile>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    if let Some(client) = &version.client_download {
        files.push(VendorFile {
            url: mirror.rewrite_url(&client.url),
            dest: folder.version_jar(&version.jar_id),
            sha1: client.sha1.clone(),
        });
    }

    for lib in version.allowed_libraries() {
        for file in [lib.artifact(), lib.native_file()].into_iter().flatten() {
            if let Some(vendor) = library_vendor_file(&file, folder, mirror) {
                if seen.insert(vendor.dest.clone()) {
                    files.push(vendor);
                }
            } else {
                debug!("No download for {} ({})", lib.name, file.path);
            }
        }
    }

    if let Some(info) = &version.asset_index {
        let index = AssetIndex::load_or_fetch(info, folder, downloader, mirror).await?;
        files.extend(index.object_files(folder, mirror));
    }

    Ok(files)
}

fn library_vendor_file(file: &LibraryFile, folder: &GameFolder, mirror: &Mirror) -> Option<VendorFile> {
    let url = file.url.as_deref().filter(|u| !u.is_empty())?;
    Some(VendorFile {
        url: mirror.rewrite_url(url),
        dest: folder.library(&file.path),
        sha1: file.sha1.clone(),
    })
}

/// Resolve `version_id` from disk and fetch whatever of its closure is
/// missing, switching mirrors on failure. Returns how many files arrived.
pub async fn install_closure(
    folder: &GameFolder,
    downloader: &Downloader,
    failover: &MirrorFailover,
    version_id: &str,
    concurrency: usize,
    events: &EventBus,
) -> LauncherResult<usize> {
    let version = ResolvedVersion::load(folder, version_id).await?;
    let version = &version;
    let fetched = failover
        .run("Install libraries", |mirror| async move {
            let files = closure_files(version, folder, downloader, &mirror).await?;
            fetch_missing(downloader, files, concurrency).await
        })
        .await?;

    if fetched > 0 {
        info!("Fetched {} files for {}", fetched, version_id);
        events.log(format!("Downloaded {} library files", fetched));
    }
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::VersionJson;

    #[tokio::test]
    async fn closure_rewrites_urls_and_skips_local_only_libraries() {
        let json: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "1.20.1-forge-47.2.0",
            "inheritsFrom": "1.20.1",
            "libraries": [
                {"name": "net.minecraftforge:forge:1.20.1-47.2.0:client",
                 "downloads": {"artifact": {"path": "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar", "url": ""}}},
                {"name": "com.mojang:logging:1.1.1",
                 "downloads": {"artifact": {
                     "path": "com/mojang/logging/1.1.1/logging-1.1.1.jar",
                     "sha1": "832b8e6674a9b325a5175a3a6267dfaf34c85139",
                     "url": "https://libraries.minecraft.net/com/mojang/logging/1.1.1/logging-1.1.1.jar"}}}
            ]
        }))
        .unwrap();
        let parent: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "1.20.1",
            "downloads": {"client": {"sha1": "abc", "url": "https://piston-data.mojang.com/v1/objects/abc/client.jar"}}
        }))
        .unwrap();
        let version = ResolvedVersion::from_chain(vec![
            ("1.20.1-forge-47.2.0".into(), json),
            ("1.20.1".into(), parent),
        ]);

        let folder = GameFolder::new("/i/pack");
        let downloader = Downloader::new(reqwest::Client::new());
        let files = closure_files(&version, &folder, &downloader, &Mirror::fast_mirror())
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].dest, folder.version_jar("1.20.1"));
        assert_eq!(files[0].url, "https://piston-meta.fastmcmirror.org/v1/objects/abc/client.jar");
        assert_eq!(
            files[1].url,
            "https://libraries.fastmcmirror.org/maven/com/mojang/logging/1.1.1/logging-1.1.1.jar"
        );
        assert_eq!(files[1].sha1.as_deref(), Some("832b8e6674a9b325a5175a3a6267dfaf34c85139"));
    }
}
