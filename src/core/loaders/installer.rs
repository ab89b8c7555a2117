use async_trait::async_trait;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::LoaderType;
use crate::core::mirror::{Mirror, MirrorFailover};

use super::{
    context::LoaderContext, fabric::FabricInstaller, forge::ForgeInstaller,
    neoforge::NeoForgeInstaller, quilt::QuiltInstaller,
};

/// Forge build used when a manifest names none.
pub const DEFAULT_FORGE_VERSION: &str = "14.23.5.2864";

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    /// Display name used in logs and failover operation names.
    fn name(&self) -> &'static str;

    /// Id of the version directory this loader creates.
    fn version_id(&self, minecraft_version: &str, loader_version: &str) -> String;

    /// Loader builds for `ctx.minecraft_version`, newest first.
    async fn list_versions(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
    ) -> LauncherResult<Vec<String>>;

    /// Install one build; returns the installed version id.
    async fn install(
        &self,
        ctx: &LoaderContext<'_>,
        mirror: &Mirror,
        loader_version: &str,
    ) -> LauncherResult<String>;
}

/// Static dispatch over the supported loaders.
pub enum Installer {
    Fabric(FabricInstaller),
    Quilt(QuiltInstaller),
    Forge(ForgeInstaller),
    NeoForge(NeoForgeInstaller),
}

impl Installer {
    /// `None` for vanilla, which has nothing to install.
    pub fn for_loader(loader: LoaderType) -> Option<Self> {
        match loader {
            LoaderType::Vanilla => None,
            LoaderType::Fabric => Some(Self::Fabric(FabricInstaller)),
            LoaderType::Quilt => Some(Self::Quilt(QuiltInstaller)),
            LoaderType::Forge => Some(Self::Forge(ForgeInstaller)),
            LoaderType::NeoForge => Some(Self::NeoForge(NeoForgeInstaller)),
        }
    }

    fn inner(&self) -> &dyn LoaderInstaller {
        match self {
            Installer::Fabric(i) => i,
            Installer::Quilt(i) => i,
            Installer::Forge(i) => i,
            Installer::NeoForge(i) => i,
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner().name()
    }

    pub fn default_version(&self) -> Option<&'static str> {
        match self {
            Installer::Forge(_) => Some(DEFAULT_FORGE_VERSION),
            _ => None,
        }
    }

    pub fn version_id(&self, minecraft_version: &str, loader_version: &str) -> String {
        self.inner().version_id(minecraft_version, loader_version)
    }

    /// Install the requested build (or the default / newest listed one) and
    /// return the version id to launch. Skips all network work when the
    /// requested build is already present.
    pub async fn ensure_installed(
        &self,
        ctx: &LoaderContext<'_>,
        failover: &MirrorFailover,
        requested: Option<&str>,
    ) -> LauncherResult<String> {
        let wanted = requested
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.default_version());

        if let Some(version) = wanted {
            let id = self.version_id(ctx.minecraft_version, version);
            if ctx.folder.is_version_installed(&id) {
                info!("{} {} already installed", self.name(), id);
                return Ok(id);
            }
        }

        let operation = format!("Install {}", self.name());
        failover
            .run(&operation, |mirror| async move {
                let listed = self.inner().list_versions(ctx, &mirror).await?;
                let chosen = pick_version(&listed, wanted).ok_or_else(|| {
                    LauncherError::LoaderVersionNotFound {
                        loader: self.name().to_string(),
                        minecraft_version: ctx.minecraft_version.to_string(),
                    }
                })?;

                let id = self.version_id(ctx.minecraft_version, &chosen);
                if ctx.folder.is_version_installed(&id) {
                    return Ok(id);
                }
                ctx.events
                    .log(format!("Installing {} {}...", self.name(), chosen));
                self.inner().install(ctx, &mirror, &chosen).await
            })
            .await
    }
}

/// The requested build when listed, else the newest one.
pub fn pick_version(listed: &[String], wanted: Option<&str>) -> Option<String> {
    wanted
        .and_then(|w| listed.iter().find(|v| v.as_str() == w))
        .or_else(|| listed.first())
        .cloned()
}
