use async_trait::async_trait;

use super::context::LoaderContext;
use super::forge::run_installer_jar;
use super::installer::LoaderInstaller;
use crate::core::error::LauncherResult;
use crate::core::maven::{MavenArtifact, MavenMetadata};
use crate::core::mirror::Mirror;

const NEOFORGE_GROUP: &str = "net.neoforged";
const NEOFORGE_ARTIFACT: &str = "neoforge";

/// NeoForge ships the same kind of installer jar as Forge, but versions are
/// numbered after the game: Minecraft `1.20.4` → `20.4.x`, `1.21` → `21.0.x`.
pub struct NeoForgeInstaller;

#[async_trait]
impl LoaderInstaller for NeoForgeInstaller {
    fn name(&self) -> &'static str {
        "NeoForge"
    }

    fn version_id(&self, _minecraft_version: &str, loader_version: &str) -> String {
        format!("neoforge-{}", loader_version)
    }

    async fn list_versions(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
    ) -> LauncherResult<Vec<String>> {
        let url = MavenMetadata::metadata_url(&mirror.neoforge_maven, NEOFORGE_GROUP, NEOFORGE_ARTIFACT);
        let xml = ctx.downloader.fetch_text(&url).await?;
        let metadata = MavenMetadata::parse(&xml)?;
        Ok(neoforge_builds_for(metadata.versions(), ctx.minecraft_version))
    }

    async fn install(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
        loader_version: &str,
    ) -> LauncherResult<String> {
        let coordinate = format!("{}:{}:{}:installer", NEOFORGE_GROUP, NEOFORGE_ARTIFACT, loader_version);
        let installer = MavenArtifact::parse(&coordinate)?;
        let id = self.version_id(ctx.minecraft_version, loader_version);
        run_installer_jar(ctx, &installer.url(&mirror.neoforge_maven), &installer.file_name(), &id).await
    }
}

/// Prefix NeoForge uses for a game version: `1.20.4` → `20.4.`, `1.21` → `21.0.`.
pub fn neoforge_prefix(minecraft_version: &str) -> Option<String> {
    let mut parts = minecraft_version.split('.');
    if parts.next()? != "1" {
        return None;
    }
    let minor: u32 = parts.next()?.parse().ok()?;
    let patch: u32 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    Some(format!("{}.{}.", minor, patch))
}

pub fn neoforge_builds_for(listed: &[String], minecraft_version: &str) -> Vec<String> {
    let Some(prefix) = neoforge_prefix(minecraft_version) else {
        return Vec::new();
    };
    listed
        .iter()
        .rev()
        .filter(|v| v.starts_with(&prefix))
        .cloned()
        .collect()
}
