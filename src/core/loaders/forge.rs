use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use super::context::LoaderContext;
use super::installer::LoaderInstaller;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, MavenMetadata};
use crate::core::mirror::Mirror;

const FORGE_GROUP: &str = "net.minecraftforge";
const FORGE_ARTIFACT: &str = "forge";

/// Installs Forge by running the official installer jar headlessly.
pub struct ForgeInstaller;

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    fn name(&self) -> &'static str {
        "Forge"
    }

    fn version_id(&self, minecraft_version: &str, loader_version: &str) -> String {
        format!("{}-forge-{}", minecraft_version, loader_version)
    }

    async fn list_versions(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
    ) -> LauncherResult<Vec<String>> {
        let url = MavenMetadata::metadata_url(&mirror.forge_maven, FORGE_GROUP, FORGE_ARTIFACT);
        let xml = ctx.downloader.fetch_text(&url).await?;
        let metadata = MavenMetadata::parse(&xml)?;
        Ok(forge_builds_for(metadata.versions(), ctx.minecraft_version))
    }

    async fn install(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
        loader_version: &str,
    ) -> LauncherResult<String> {
        let coordinate = format!(
            "{}:{}:{}-{}:installer",
            FORGE_GROUP, FORGE_ARTIFACT, ctx.minecraft_version, loader_version
        );
        let installer = MavenArtifact::parse(&coordinate)?;
        let id = self.version_id(ctx.minecraft_version, loader_version);
        run_installer_jar(ctx, &installer.url(&mirror.forge_maven), &installer.file_name(), &id).await
    }
}

/// Maven lists `<mc>-<build>` oldest first; keep this game version's builds,
/// newest first, without the prefix.
pub fn forge_builds_for(listed: &[String], minecraft_version: &str) -> Vec<String> {
    let prefix = format!("{}-", minecraft_version);
    listed
        .iter()
        .rev()
        .filter_map(|v| v.strip_prefix(&prefix))
        // 1.7.10-era builds carry a trailing `-<mc>` branch suffix.
        .map(|build| build.split('-').next().unwrap_or(build).to_string())
        .collect()
}

// ── Installer jar ───────────────────────────────────────

/// Download an installer jar, run it with `--installClient` against the game
/// folder and check that it produced `versions/<expected_id>/`.
pub(super) async fn run_installer_jar(
    ctx: &LoaderContext<'_>,
    url: &str,
    file_name: &str,
    expected_id: &str,
) -> LauncherResult<String> {
    let root = ctx.folder.root();
    let installer_path = root.join(".installers").join(file_name);
    ctx.downloader.download_file(url, &installer_path).await?;

    ensure_launcher_profiles(&ctx.folder.launcher_profiles()).await?;

    info!("Running {} for {:?}", file_name, root);
    ctx.events.log(format!("Running installer {}...", file_name));
    let args = vec![
        "-jar".to_string(),
        path_arg(&installer_path),
        "--installClient".to_string(),
        path_arg(root),
    ];
    let output = ctx.runner.run(ctx.java, &args, Some(root)).await?;
    if let Err(e) = tokio::fs::remove_file(&installer_path).await {
        debug!("Cannot remove installer {:?}: {}", installer_path, e);
    }

    if !output.success {
        return Err(LauncherError::Loader(format!(
            "{} failed (code {:?}): {}",
            file_name,
            output.code,
            tail(&output.combined(), 20)
        )));
    }
    if !ctx.folder.is_version_installed(expected_id) {
        return Err(LauncherError::Loader(format!(
            "{} finished but {} was not created",
            file_name, expected_id
        )));
    }
    debug!("Installer created {}", expected_id);
    Ok(expected_id.to_string())
}

/// The installers refuse to run without a launcher profile store.
async fn ensure_launcher_profiles(path: &Path) -> LauncherResult<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    tokio::fs::write(path, br#"{"profiles":{},"selectedProfile":null}"#)
        .await
        .map_err(|e| LauncherError::io(path, e))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
