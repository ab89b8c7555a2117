use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::context::LoaderContext;
use super::installer::LoaderInstaller;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::mirror::Mirror;
use crate::core::version::VersionJson;

/// One row of the meta server's loader listing.
#[derive(Debug, Deserialize)]
pub struct LoaderListing {
    pub loader: LoaderBuild,
}

#[derive(Debug, Deserialize)]
pub struct LoaderBuild {
    pub version: String,
    #[serde(default)]
    pub stable: Option<bool>,
}

/// Installs Fabric by saving the meta server's launcher profile as a
/// version descriptor. Libraries are fetched later with the rest of the
/// dependency closure.
pub struct FabricInstaller;

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    fn name(&self) -> &'static str {
        "Fabric"
    }

    fn version_id(&self, minecraft_version: &str, loader_version: &str) -> String {
        format!("fabric-loader-{}-{}", loader_version, minecraft_version)
    }

    async fn list_versions(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
    ) -> LauncherResult<Vec<String>> {
        let url = format!("{}/v2/versions/loader/{}", mirror.fabric_meta, ctx.minecraft_version);
        list_meta_versions(ctx, &url).await
    }

    async fn install(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
        loader_version: &str,
    ) -> LauncherResult<String> {
        let url = format!(
            "{}/v2/versions/loader/{}/{}/profile/json",
            mirror.fabric_meta, ctx.minecraft_version, loader_version
        );
        let id = self.version_id(ctx.minecraft_version, loader_version);
        save_meta_profile(ctx, &url, &id).await
    }
}

/// Meta servers list builds newest first already.
pub(super) async fn list_meta_versions(ctx: &LoaderContext<'_>, url: &str) -> LauncherResult<Vec<String>> {
    let rows: Vec<LoaderListing> = ctx.downloader.fetch_json(url).await?;
    Ok(rows.into_iter().map(|r| r.loader.version).collect())
}

/// Fetch a launcher profile and store it as `versions/<id>/<id>.json`.
pub(super) async fn save_meta_profile(
    ctx: &LoaderContext<'_>,
    url: &str,
    fallback_id: &str,
) -> LauncherResult<String> {
    let raw = ctx.downloader.fetch_text(url).await?;
    let profile = VersionJson::parse(&raw)?;
    if profile.main_class.as_deref().unwrap_or("").is_empty() {
        return Err(LauncherError::Loader(format!("profile at {} has no mainClass", url)));
    }
    if profile.inherits_from.as_deref() != Some(ctx.minecraft_version) {
        return Err(LauncherError::Loader(format!(
            "profile at {} does not inherit from {}",
            url, ctx.minecraft_version
        )));
    }

    let id = profile.id.clone().unwrap_or_else(|| fallback_id.to_string());
    VersionJson::save_raw(ctx.folder, &id, &raw).await?;
    info!("Saved loader profile {}", id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::Downloader;
    use crate::core::events::EventBus;
    use crate::core::http::{build_http_client, DEFAULT_TIMEOUT};
    use crate::core::instance::GameFolder;
    use crate::core::java::SystemCommandRunner;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_and_installs_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/versions/loader/1.20.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"loader": {"separator": ".", "build": 11, "maven": "net.fabricmc:fabric-loader:0.15.11", "version": "0.15.11", "stable": true},
                 "intermediary": {"version": "1.20.1"}},
                {"loader": {"version": "0.15.10", "stable": true}, "intermediary": {"version": "1.20.1"}}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/versions/loader/1.20.1/0.15.11/profile/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "fabric-loader-0.15.11-1.20.1",
                "inheritsFrom": "1.20.1",
                "type": "release",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "arguments": {"game": [], "jvm": []},
                "libraries": [{"name": "net.fabricmc:fabric-loader:0.15.11", "url": "https://maven.fabricmc.net/"}]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let folder = GameFolder::new(dir.path());
        let downloader = Downloader::new(build_http_client(DEFAULT_TIMEOUT).unwrap());
        let events = EventBus::default();
        let ctx = LoaderContext {
            minecraft_version: "1.20.1",
            folder: &folder,
            downloader: &downloader,
            runner: &SystemCommandRunner,
            java: Path::new("java"),
            events: &events,
        };
        let mirror = Mirror::single_host("local", &server.uri());

        let listed = FabricInstaller.list_versions(&ctx, &mirror).await.unwrap();
        assert_eq!(listed, vec!["0.15.11", "0.15.10"]);

        let id = FabricInstaller.install(&ctx, &mirror, "0.15.11").await.unwrap();
        assert_eq!(id, "fabric-loader-0.15.11-1.20.1");
        assert!(folder.is_version_installed(&id));
    }

    #[tokio::test]
    async fn profile_for_wrong_game_version_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "fabric-loader-0.15.11-1.19.2",
                "inheritsFrom": "1.19.2",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let folder = GameFolder::new(dir.path());
        let downloader = Downloader::new(build_http_client(DEFAULT_TIMEOUT).unwrap());
        let events = EventBus::default();
        let ctx = LoaderContext {
            minecraft_version: "1.20.1",
            folder: &folder,
            downloader: &downloader,
            runner: &SystemCommandRunner,
            java: Path::new("java"),
            events: &events,
        };

        let err = FabricInstaller
            .install(&ctx, &Mirror::single_host("local", &server.uri()), "0.15.11")
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Loader(_)));
    }
}
