#[cfg(feature = "desktop")]
mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

/// Structured logging for the whole process; `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,faculty_launcher_lib=debug")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;
    use tauri::Manager;

    use crate::core::config::LauncherConfig;
    use crate::core::launcher::Launcher;

    init_tracing();
    tracing::info!("Faculty launcher starting...");

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let handle = app.handle().clone();
            let config = LauncherConfig::load()?;
            tracing::info!("API URL: {}", config.api_base_url);
            let window = Arc::new(commands::TauriWindow::new(handle.clone()));
            let launcher = Arc::new(Launcher::new(config, window)?);
            commands::forward_events(handle, launcher.subscribe());
            app.manage(launcher);
            if let Some(main) = app.get_webview_window("main") {
                let _ = main.show();
            }
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_instances,
            commands::login,
            commands::logout,
            commands::launch_game,
            commands::cancel_launch,
            commands::get_system_info,
            commands::open_external,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!("Tauri application exited with an error: {}", e);
    }
}
