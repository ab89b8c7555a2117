use tracing::info;

use crate::core::downloader::Downloader;
use crate::core::error::LauncherResult;
use crate::core::events::EventBus;
use crate::core::instance::GameFolder;
use crate::core::mirror::MirrorFailover;
use crate::core::version::{ResolvedVersion, VersionJson, VersionManifest};

use super::artifacts::fetch_missing;
use super::dependencies::closure_files;

/// Install vanilla `minecraft_version` unless its descriptor is already on
/// disk. Returns `false` when nothing had to be done.
///
/// The descriptor is written last, so its presence means the client jar,
/// libraries and assets all arrived.
pub async fn install_base_game(
    folder: &GameFolder,
    downloader: &Downloader,
    failover: &MirrorFailover,
    minecraft_version: &str,
    concurrency: usize,
    events: &EventBus,
) -> LauncherResult<bool> {
    if folder.is_version_installed(minecraft_version) {
        info!("Minecraft {} already installed", minecraft_version);
        return Ok(false);
    }

    let operation = format!("Install Minecraft {}", minecraft_version);
    failover
        .run(&operation, |mirror| async move {
            let list = VersionManifest::fetch(downloader, &mirror).await?;
            let entry = list.find_version(minecraft_version)?;
            let raw = downloader.fetch_text(&mirror.rewrite_url(&entry.url)).await?;
            let descriptor = VersionJson::parse(&raw)?;

            let version =
                ResolvedVersion::from_chain(vec![(minecraft_version.to_string(), descriptor)]);
            let files = closure_files(&version, folder, downloader, &mirror).await?;
            let count = files.len();
            let fetched = fetch_missing(downloader, files, concurrency).await?;
            events.log(format!(
                "Minecraft {}: {} of {} files downloaded",
                minecraft_version, fetched, count
            ));

            VersionJson::save_raw(folder, minecraft_version, &raw).await?;
            Ok(true)
        })
        .await
}
