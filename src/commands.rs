use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};
use tracing::{info, warn};

use crate::core::error::LauncherError;
use crate::core::events::{LauncherEvent, Subscription};
use crate::core::instance::InstanceSummary;
use crate::core::launch::WindowControl;
use crate::core::launcher::{validate_external_url, Launcher};
use crate::core::system::SystemInfo;

const MAIN_WINDOW: &str = "main";

/// Hides and restores the main webview window around a game session.
pub struct TauriWindow {
    app: AppHandle,
}

impl TauriWindow {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl WindowControl for TauriWindow {
    fn hide(&self) {
        if let Some(window) = self.app.get_webview_window(MAIN_WINDOW) {
            let _ = window.hide();
        }
    }

    fn show_and_focus(&self) {
        if let Some(window) = self.app.get_webview_window(MAIN_WINDOW) {
            let _ = window.show();
            let _ = window.unminimize();
            let _ = window.set_focus();
        }
    }
}

/// Relay engine events to the frontend as `log` and `progress`.
pub fn forward_events(app: AppHandle, mut events: Subscription) {
    tauri::async_runtime::spawn(async move {
        while let Some(event) = events.recv().await {
            let sent = match &event {
                LauncherEvent::Log(line) => app.emit("log", line),
                LauncherEvent::Progress(progress) => app.emit("progress", progress),
            };
            if let Err(e) = sent {
                warn!("Failed to emit event to UI: {}", e);
            }
        }
    });
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: Option<String>,
    pub error: Option<String>,
}

#[tauri::command]
pub async fn get_instances(
    launcher: tauri::State<'_, Arc<Launcher>>,
) -> Result<Vec<InstanceSummary>, LauncherError> {
    launcher.fetch_instances().await
}

#[tauri::command]
pub async fn login(
    launcher: tauri::State<'_, Arc<Launcher>>,
    username: String,
    password: String,
) -> Result<LoginResponse, LauncherError> {
    Ok(match launcher.login(&username, &password).await {
        Ok(session) => LoginResponse {
            success: true,
            username: Some(session.username),
            error: None,
        },
        Err(e) => LoginResponse {
            success: false,
            username: None,
            error: Some(e.to_string()),
        },
    })
}

#[tauri::command]
pub async fn logout(launcher: tauri::State<'_, Arc<Launcher>>) -> Result<(), LauncherError> {
    launcher.logout().await;
    Ok(())
}

/// Returns the PID once the game is running; the exit is reported through
/// the event stream.
#[tauri::command]
pub async fn launch_game(
    launcher: tauri::State<'_, Arc<Launcher>>,
    instance_id: String,
    ram: Option<u32>,
) -> Result<Option<u32>, LauncherError> {
    let game = launcher.launch_game(&instance_id, ram).await?;
    let pid = game.pid;
    tauri::async_runtime::spawn(async move {
        let code = game.wait().await;
        info!("Session of {} ended with {:?}", instance_id, code);
    });
    Ok(pid)
}

#[tauri::command]
pub async fn cancel_launch(launcher: tauri::State<'_, Arc<Launcher>>) -> Result<bool, LauncherError> {
    Ok(launcher.cancel_launch().await)
}

#[tauri::command]
pub async fn get_system_info(
    launcher: tauri::State<'_, Arc<Launcher>>,
) -> Result<SystemInfo, LauncherError> {
    Ok(launcher.system_info())
}

#[tauri::command]
pub async fn open_external(app: AppHandle, url: String) -> Result<(), LauncherError> {
    use tauri_plugin_opener::OpenerExt;

    validate_external_url(&url)?;
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| LauncherError::Other(e.to_string()))
}
