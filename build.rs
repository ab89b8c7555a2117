fn main() {
    // The headless engine has nothing to generate; only the desktop shell
    // needs the Tauri context (tauri.conf.json, capabilities).
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
