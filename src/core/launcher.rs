// ─── Launcher Facade ───
// The operations the UI calls: catalogue, login, launch, cancel, system info.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::api::BackendClient;
use crate::core::auth::{AuthSession, DevProfileStore};
use crate::core::config::LauncherConfig;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventBus, Subscription};
use crate::core::http::build_http_client;
use crate::core::install::{InstallPipeline, InstallRequest};
use crate::core::instance::{InstanceStore, InstanceSummary};
use crate::core::java::{CommandRunner, SystemCommandRunner};
use crate::core::launch::{GameProcess, ProcessLauncher, WindowControl};
use crate::core::mirror::MirrorFailover;
use crate::core::system::SystemInfo;

pub struct Launcher {
    config: LauncherConfig,
    backend: BackendClient,
    store: InstanceStore,
    profiles: DevProfileStore,
    pipeline: InstallPipeline,
    events: EventBus,
    session: RwLock<Option<AuthSession>>,
    current_launch: Mutex<Option<ActiveLaunch>>,
    launch_ids: AtomicU64,
}

/// The installation `cancel_launch` applies to.
struct ActiveLaunch {
    id: u64,
    token: CancellationToken,
}

impl Launcher {
    pub fn new(config: LauncherConfig, window: Arc<dyn WindowControl>) -> LauncherResult<Self> {
        let client = build_http_client(config.download_timeout())?;
        Ok(Self::with_parts(
            config,
            client,
            window,
            Arc::new(SystemCommandRunner),
            EventBus::default(),
        ))
    }

    pub fn with_parts(
        config: LauncherConfig,
        client: Client,
        window: Arc<dyn WindowControl>,
        runner: Arc<dyn CommandRunner>,
        events: EventBus,
    ) -> Self {
        let backend = BackendClient::new(client.clone(), &config.api_base_url);
        let failover = Arc::new(MirrorFailover::new(config.mirrors.clone(), events.clone()));
        let pipeline = InstallPipeline::new(
            config.clone(),
            Downloader::new(client),
            failover,
            runner,
            ProcessLauncher::new(window, events.clone()),
            events.clone(),
        );
        Self {
            store: InstanceStore::new(config.instances_dir()),
            profiles: DevProfileStore::new(&config.data_dir),
            backend,
            pipeline,
            events,
            config,
            session: RwLock::new(None),
            current_launch: Mutex::new(None),
            launch_ids: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo::detect()
    }

    // ── Catalogue ───────────────────────────────────────

    /// The backend's instances. Local instance folders the backend no longer
    /// lists are removed afterwards.
    pub async fn fetch_instances(&self) -> LauncherResult<Vec<InstanceSummary>> {
        let instances = self.backend.list_instances().await?;
        let active: Vec<String> = instances.iter().map(|i| i.id.clone()).collect();
        match self.store.collect_garbage(&active).await {
            Ok(removed) if !removed.is_empty() => {
                self.events
                    .log(format!("Removed {} stale instances", removed.len()));
            }
            Ok(_) => {}
            Err(e) => warn!("Instance cleanup failed: {}", e),
        }
        Ok(instances)
    }

    // ── Session ─────────────────────────────────────────

    /// Development login: register the stored (or a new) numeric id for
    /// `username`, then authenticate. The password is not checked.
    pub async fn login(&self, username: &str, _password: &str) -> LauncherResult<AuthSession> {
        self.events
            .log(format!("Attempting login for {}...", username));

        let (profile, is_new) = self.profiles.identity_for(username).await?;
        if is_new {
            self.events
                .log(format!("Generated new ID: {}", profile.telegram_id));
        } else {
            self.events
                .log(format!("Found saved profile for ID: {}", profile.telegram_id));
        }

        // An already registered user is refused here; that is fine.
        if let Err(e) = self.backend.register_user(username, profile.telegram_id).await {
            debug!("create_user for {} ignored: {}", username, e);
        }

        let session = match self.backend.authenticate(username).await {
            Ok(session) => session,
            Err(e) => {
                self.events.log(format!("Login failed: {}", e));
                return Err(e);
            }
        };
        info!("Logged in as {}", session.username);
        self.events
            .log(format!("Logged in as {}", session.username));
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    pub async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    pub async fn logout(&self) {
        *self.session.write().await = None;
    }

    // ── Launch ──────────────────────────────────────────

    /// Fetch the manifest of `instance_id`, bring the instance up to date and
    /// start the game. `memory_mb` falls back to the configured default.
    pub async fn launch_game(
        &self,
        instance_id: &str,
        memory_mb: Option<u32>,
    ) -> LauncherResult<GameProcess> {
        let Some(session) = self.session().await else {
            self.events.log("Not logged in!");
            return Err(LauncherError::NotLoggedIn);
        };
        let memory_mb = memory_mb
            .filter(|m| *m > 0)
            .unwrap_or(self.config.default_memory_mb);

        self.events
            .log(format!("Fetching manifest for {}...", instance_id));
        let manifest = self.backend.fetch_manifest(instance_id).await?;
        if manifest.instance_id != instance_id {
            return Err(LauncherError::InvalidManifest(format!(
                "requested {} but received {}",
                instance_id, manifest.instance_id
            )));
        }
        let instance_dir = self.store.ensure_instance_dir(instance_id).await?;

        let (launch_id, token) = self.begin_launch().await;
        let result = self
            .pipeline
            .install_and_launch_with_cancel(
                InstallRequest {
                    instance_dir,
                    manifest,
                    session,
                    memory_mb,
                },
                &token,
            )
            .await;
        self.end_launch(launch_id).await;

        if let Err(e) = &result {
            self.events.log(format!("Critical Error: {}", e));
        }
        result
    }

    /// The newest launch becomes the one `cancel_launch` targets.
    async fn begin_launch(&self) -> (u64, CancellationToken) {
        let id = self.launch_ids.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        *self.current_launch.lock().await = Some(ActiveLaunch {
            id,
            token: token.clone(),
        });
        (id, token)
    }

    /// Clears the slot only if a newer launch has not taken it over.
    async fn end_launch(&self, id: u64) {
        let mut current = self.current_launch.lock().await;
        if current.as_ref().is_some_and(|active| active.id == id) {
            *current = None;
        }
    }

    /// Cancel the installation in progress. `false` when nothing is running.
    pub async fn cancel_launch(&self) -> bool {
        match self.current_launch.lock().await.as_ref() {
            Some(active) => {
                active.token.cancel();
                self.events.log("Cancelling launch...");
                true
            }
            None => false,
        }
    }
}

/// Only web links may leave the launcher.
pub fn validate_external_url(url: &str) -> LauncherResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(LauncherError::Other(format!("refusing to open {:?}", url)))
    }
}
