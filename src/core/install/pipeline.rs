// ─── Installation Pipeline ───
// Runtime → auth agent → modpack files → base game → loader → libraries →
// launch, reporting a fixed milestone per stage.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::core::auth::AuthSession;
use crate::core::config::LauncherConfig;
use crate::core::downloader::{Downloader, FileFetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventBus;
use crate::core::instance::{GameFolder, Manifest};
use crate::core::java::{CommandRunner, RuntimeResolver, RuntimeSearch};
use crate::core::launch::{GameProcess, LaunchRequest, ProcessLauncher};
use crate::core::loaders::{Installer, LoaderContext};
use crate::core::mirror::MirrorFailover;
use crate::core::retry::RetryPolicy;
use crate::core::sync::FileSynchronizer;
use crate::core::version::ResolvedVersion;

use super::auth_bridge::{ensure_auth_bridge, resolve_auth_bridge};
use super::base_game::install_base_game;
use super::dependencies::install_closure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallStage {
    Init,
    ResolveRuntime,
    EnsureAuthBridge,
    SyncFiles,
    InstallBaseGame,
    InstallLoader,
    InstallLibraries,
    Launch,
    Done,
    Failed,
}

impl InstallStage {
    /// Percent reported when the stage starts. `Failed` keeps the last one.
    pub fn milestone(self) -> u8 {
        match self {
            InstallStage::Init | InstallStage::ResolveRuntime => 0,
            InstallStage::EnsureAuthBridge => 5,
            InstallStage::SyncFiles => 10,
            InstallStage::InstallBaseGame => 50,
            InstallStage::InstallLoader => 70,
            InstallStage::InstallLibraries => 80,
            InstallStage::Launch => 90,
            InstallStage::Done => 100,
            InstallStage::Failed => 0,
        }
    }

    /// Task label shown in the UI.
    pub fn task(self) -> &'static str {
        match self {
            InstallStage::Init | InstallStage::ResolveRuntime => "Initializing",
            InstallStage::EnsureAuthBridge => "Dependencies",
            InstallStage::SyncFiles => "Syncing Files",
            InstallStage::InstallBaseGame => "Installing Minecraft",
            InstallStage::InstallLoader => "Installing Loader",
            InstallStage::InstallLibraries => "Installing Libraries",
            InstallStage::Launch => "Launching",
            InstallStage::Done => "Launch",
            InstallStage::Failed => "Failed",
        }
    }
}

/// State of one `install_and_launch` call. Dropped when the call returns.
#[derive(Debug)]
pub struct InstallationRun {
    pub stage: InstallStage,
    pub percent: u8,
    pub log_lines: Vec<String>,
    events: EventBus,
}

impl InstallationRun {
    fn new(events: EventBus) -> Self {
        Self {
            stage: InstallStage::Init,
            percent: 0,
            log_lines: Vec::new(),
            events,
        }
    }

    fn enter(&mut self, stage: InstallStage, details: impl Into<String>) {
        let details = details.into();
        self.stage = stage;
        self.percent = stage.milestone();
        info!("[{:?}] {}", stage, details);
        self.events.progress(stage.task(), details, self.percent);
    }

    fn log(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.log_lines
            .push(format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), text));
        self.events.log(text);
    }

    fn finish(&mut self) {
        self.stage = InstallStage::Done;
        self.percent = InstallStage::Done.milestone();
    }

    fn fail(&mut self, err: &LauncherError) {
        error!("Installation failed during {:?}: {}", self.stage, err);
        self.stage = InstallStage::Failed;
        self.log(format!("Launch failed: {}", err));
        self.events
            .progress(InstallStage::Failed.task(), err.to_string(), self.percent);
    }
}

/// One launch of one instance.
pub struct InstallRequest {
    pub instance_dir: PathBuf,
    pub manifest: Manifest,
    pub session: AuthSession,
    pub memory_mb: u32,
}

pub struct InstallPipeline {
    config: LauncherConfig,
    downloader: Downloader,
    fetcher: Arc<dyn FileFetcher>,
    failover: Arc<MirrorFailover>,
    resolver: RuntimeResolver,
    runner: Arc<dyn CommandRunner>,
    launcher: ProcessLauncher,
    events: EventBus,
}

impl InstallPipeline {
    pub fn new(
        config: LauncherConfig,
        downloader: Downloader,
        failover: Arc<MirrorFailover>,
        runner: Arc<dyn CommandRunner>,
        launcher: ProcessLauncher,
        events: EventBus,
    ) -> Self {
        let resolver = RuntimeResolver::new(runner.clone(), RuntimeSearch::from_env(), events.clone());
        Self {
            config,
            fetcher: Arc::new(downloader.clone()),
            downloader,
            failover,
            resolver,
            runner,
            launcher,
            events,
        }
    }

    /// Probe these locations instead of the environment's.
    pub fn with_runtime_search(mut self, search: RuntimeSearch) -> Self {
        self.resolver = RuntimeResolver::new(self.runner.clone(), search, self.events.clone());
        self
    }

    /// Route modpack and agent transfers through another fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn FileFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub async fn install_and_launch(&self, request: InstallRequest) -> LauncherResult<GameProcess> {
        self.install_and_launch_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run every stage in order and start the game. On failure a `Failed`
    /// progress event carries the percent reached so far.
    #[instrument(skip_all, fields(instance = %request.manifest.instance_id))]
    pub async fn install_and_launch_with_cancel(
        &self,
        request: InstallRequest,
        cancel: &CancellationToken,
    ) -> LauncherResult<GameProcess> {
        let mut run = InstallationRun::new(self.events.clone());
        match self.run_stages(&request, cancel, &mut run).await {
            Ok(game) => {
                run.finish();
                Ok(game)
            }
            Err(e) => {
                run.fail(&e);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        request: &InstallRequest,
        cancel: &CancellationToken,
        run: &mut InstallationRun,
    ) -> LauncherResult<GameProcess> {
        let manifest = &request.manifest;
        let mc_version = manifest.mc_version.as_str();
        let concurrency = self.config.sync.concurrency.max(1);

        run.enter(InstallStage::Init, format!("Preparing {}", manifest.instance_id));
        check_cancel(cancel)?;
        manifest.validate()?;
        tokio::fs::create_dir_all(&request.instance_dir)
            .await
            .map_err(|e| LauncherError::io(&request.instance_dir, e))?;
        let folder = GameFolder::new(&request.instance_dir);

        // ── Runtime ──
        run.enter(InstallStage::ResolveRuntime, "Checking Java...");
        let java = self.resolver.find_best_java(mc_version).await;

        // ── Auth agent ──
        check_cancel(cancel)?;
        run.enter(InstallStage::EnsureAuthBridge, "Downloading Authlib...");
        let retry = RetryPolicy::from_options(&self.config.retry).with_events(self.events.clone());
        let bridge_path = self.config.auth_bridge_path();
        let bridge =
            resolve_auth_bridge(&self.downloader, &self.config.auth_bridge, &self.events).await;
        ensure_auth_bridge(
            self.fetcher.as_ref(),
            &retry,
            &bridge,
            &bridge_path,
            &self.events,
        )
        .await?;

        // ── Modpack files ──
        check_cancel(cancel)?;
        run.enter(InstallStage::SyncFiles, "Checking local files...");
        let synchronizer = FileSynchronizer::new(
            self.fetcher.clone(),
            retry,
            self.events.clone(),
            self.config.sync.clone(),
        );
        let report = synchronizer
            .sync(&request.instance_dir, &manifest.files, cancel)
            .await?;
        run.log(format!(
            "Files synced: {} up to date, {} downloaded",
            report.verified, report.downloaded
        ));

        // ── Base game ──
        check_cancel(cancel)?;
        run.enter(InstallStage::InstallBaseGame, format!("Version {}", mc_version));
        install_base_game(
            &folder,
            &self.downloader,
            &self.failover,
            mc_version,
            concurrency,
            &self.events,
        )
        .await?;

        // ── Loader ──
        check_cancel(cancel)?;
        let version_id = match Installer::for_loader(manifest.loader_type) {
            None => {
                run.enter(InstallStage::InstallLoader, "Vanilla");
                mc_version.to_string()
            }
            Some(installer) => {
                run.enter(
                    InstallStage::InstallLoader,
                    format!("{} & Libraries", installer.name()),
                );
                let ctx = LoaderContext {
                    minecraft_version: mc_version,
                    folder: &folder,
                    downloader: &self.downloader,
                    runner: self.runner.as_ref(),
                    java: &java,
                    events: &self.events,
                };
                installer
                    .ensure_installed(&ctx, &self.failover, manifest.loader_version.as_deref())
                    .await?
            }
        };

        // ── Libraries ──
        check_cancel(cancel)?;
        run.enter(InstallStage::InstallLibraries, "Checking libraries...");
        match install_closure(
            &folder,
            &self.downloader,
            &self.failover,
            &version_id,
            concurrency,
            &self.events,
        )
        .await
        {
            Ok(_) => {}
            Err(LauncherError::Cancelled) => return Err(LauncherError::Cancelled),
            Err(e) => {
                warn!("Library installation for {} incomplete: {}", version_id, e);
                run.log(format!("Library install warning: {}", e));
            }
        }

        // ── Launch ──
        check_cancel(cancel)?;
        run.enter(InstallStage::Launch, "Starting Java Process...");
        let version = ResolvedVersion::load(&folder, &version_id).await?;
        let launch = LaunchRequest {
            folder: &folder,
            version: &version,
            java: &java,
            session: &request.session,
            memory_mb: request.memory_mb,
            auth_bridge: &bridge_path,
            api_base_url: &self.config.api_base_url,
        };
        self.launcher.launch(&launch).await
    }
}

fn check_cancel(cancel: &CancellationToken) -> LauncherResult<()> {
    if cancel.is_cancelled() {
        Err(LauncherError::Cancelled)
    } else {
        Ok(())
    }
}
