// ─── Launch Task ───
// Spawns the game process with the auth agent attached and watches it.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::core::auth::AuthSession;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventBus;
use crate::core::instance::GameFolder;
use crate::core::version::ResolvedVersion;

use super::classpath::{build_classpath, classpath_separator, extract_natives, safe_path_str};
use super::window::WindowControl;

const LAUNCHER_NAME: &str = "faculty-launcher";

/// Everything needed to start one game session.
pub struct LaunchRequest<'a> {
    pub folder: &'a GameFolder,
    pub version: &'a ResolvedVersion,
    pub java: &'a Path,
    pub session: &'a AuthSession,
    pub memory_mb: u32,
    /// authlib-injector jar passed as `-javaagent`.
    pub auth_bridge: &'a Path,
    pub api_base_url: &'a str,
}

/// A running game. `exit` resolves with the exit code once the process ends.
pub struct GameProcess {
    pub pid: Option<u32>,
    pub exit: JoinHandle<Option<i32>>,
}

impl GameProcess {
    pub async fn wait(self) -> Option<i32> {
        self.exit.await.ok().flatten()
    }
}

pub struct ProcessLauncher {
    window: Arc<dyn WindowControl>,
    events: EventBus,
}

impl ProcessLauncher {
    pub fn new(window: Arc<dyn WindowControl>, events: EventBus) -> Self {
        Self { window, events }
    }

    /// Start the game and return immediately after the spawn.
    ///
    /// The launcher window is hidden once the process is up and restored by
    /// the exit watcher.
    pub async fn launch(&self, request: &LaunchRequest<'_>) -> LauncherResult<GameProcess> {
        let natives_dir = extract_natives(request.version, request.folder).await?;
        let classpath = build_classpath(request.version, request.folder)?;
        let args = build_launch_args(request, &classpath, &natives_dir);

        let mut cmd = Command::new(request.java);
        cmd.args(&args)
            .current_dir(request.folder.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        configure_platform_spawn(&mut cmd);

        info!("Launching {} with Java: {:?}", request.version.id, request.java);
        debug!("Arguments: {:?}", args);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to spawn {:?}: {}", request.java, e);
                self.events.log(format!("Failed to start game: {}", e));
                return Err(LauncherError::ProcessSpawn(e.to_string()));
            }
        };

        let pid = child.id();
        self.events.log(format!(
            "Process started! PID: {}",
            pid.map_or_else(|| "?".to_string(), |p| p.to_string())
        ));
        self.events.progress("Launch", "Game Started!", 100);

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, self.events.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, self.events.clone());
        }

        self.events.log("Hiding launcher window...");
        self.window.hide();

        let window = self.window.clone();
        let events = self.events.clone();
        let exit = tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    error!("Waiting for game process failed: {}", e);
                    None
                }
            };
            window.show_and_focus();
            let shown = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
            info!("Game exited (code: {})", shown);
            events.log(format!("Game exited (code: {})", shown));
            code
        });

        Ok(GameProcess { pid, exit })
    }
}

fn forward_output<R>(stream: R, events: EventBus)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "game", "{}", line);
            events.log(line);
        }
    });
}

// ── Arguments ───────────────────────────────────────────

/// `[jvm..., -cp, classpath, main class, game...]`
pub fn build_launch_args(
    request: &LaunchRequest<'_>,
    classpath: &str,
    natives_dir: &Path,
) -> Vec<String> {
    let memory = request.memory_mb.max(1);
    let natives = safe_path_str(natives_dir);
    let mut args = vec![
        format!("-Xms{}M", (memory / 2).max(1)),
        format!("-Xmx{}M", memory),
        format!(
            "-javaagent:{}={}/authserver",
            safe_path_str(request.auth_bridge),
            request.api_base_url.trim_end_matches('/')
        ),
        format!("-Djava.library.path={}", natives),
    ];

    let values = placeholder_values(request, &natives);
    args.extend(sanitize_jvm_args(&request.version.jvm_args, &values));
    args.push("-cp".to_string());
    args.push(classpath.to_string());
    args.push(request.version.main_class.clone());
    args.extend(substitute_args(&request.version.game_args, &values));
    args
}

fn placeholder_values(request: &LaunchRequest<'_>, natives: &str) -> Vec<(&'static str, String)> {
    let folder = request.folder;
    let version = request.version;
    let session = request.session;
    vec![
        ("auth_player_name", session.username.clone()),
        ("auth_uuid", session.uuid.clone()),
        ("auth_access_token", session.access_token.clone()),
        (
            "auth_session",
            format!("token:{}:{}", session.access_token, session.uuid),
        ),
        ("user_type", "mojang".to_string()),
        ("user_properties", "{}".to_string()),
        ("version_name", version.id.clone()),
        ("version_type", "release".to_string()),
        ("game_directory", safe_path_str(folder.root())),
        ("assets_root", safe_path_str(&folder.assets_dir())),
        ("game_assets", safe_path_str(&folder.assets_dir())),
        ("assets_index_name", version.asset_index_id()),
        ("natives_directory", natives.to_string()),
        ("library_directory", safe_path_str(&folder.libraries_dir())),
        ("classpath_separator", classpath_separator().to_string()),
        ("launcher_name", LAUNCHER_NAME.to_string()),
        ("launcher_version", env!("CARGO_PKG_VERSION").to_string()),
    ]
}

/// Descriptor JVM args minus the ones we always set ourselves.
fn sanitize_jvm_args(raw: &[String], values: &[(&'static str, String)]) -> Vec<String> {
    let mut kept = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let arg = raw[i].trim();
        if arg == "-cp" || arg == "-classpath" {
            i += 2;
            continue;
        }
        if arg.starts_with("-Djava.library.path=") {
            i += 1;
            continue;
        }
        kept.push(raw[i].clone());
        i += 1;
    }
    substitute_args(&kept, values)
}

/// Resolve `${name}` placeholders. Arguments left with an unknown placeholder
/// are dropped together with a dangling `--option` before them.
fn substitute_args(raw: &[String], values: &[(&'static str, String)]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for arg in raw {
        let mut resolved = arg.clone();
        for (name, value) in values {
            resolved = resolved.replace(&format!("${{{}}}", name), value);
        }
        if resolved.contains("${") {
            drop_dangling_option(&mut out);
            continue;
        }
        out.push(resolved);
    }
    out
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}
