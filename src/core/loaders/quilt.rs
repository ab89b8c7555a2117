use async_trait::async_trait;

use super::context::LoaderContext;
use super::fabric::{list_meta_versions, save_meta_profile};
use super::installer::LoaderInstaller;
use crate::core::error::LauncherResult;
use crate::core::mirror::Mirror;

/// Quilt's meta server mirrors Fabric's API under `/v3`.
pub struct QuiltInstaller;

#[async_trait]
impl LoaderInstaller for QuiltInstaller {
    fn name(&self) -> &'static str {
        "Quilt"
    }

    fn version_id(&self, minecraft_version: &str, loader_version: &str) -> String {
        format!("quilt-loader-{}-{}", loader_version, minecraft_version)
    }

    async fn list_versions(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
    ) -> LauncherResult<Vec<String>> {
        let url = format!("{}/v3/versions/loader/{}", mirror.quilt_meta, ctx.minecraft_version);
        list_meta_versions(ctx, &url).await
    }

    async fn install(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
        loader_version: &str,
    ) -> LauncherResult<String> {
        let url = format!(
            "{}/v3/versions/loader/{}/{}/profile/json",
            mirror.quilt_meta, ctx.minecraft_version, loader_version
        );
        let id = self.version_id(ctx.minecraft_version, loader_version);
        save_meta_profile(ctx, &url, &id).await
    }
}
