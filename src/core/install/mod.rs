pub mod artifacts;
pub mod auth_bridge;
pub mod base_game;
pub mod dependencies;
pub mod pipeline;

pub use auth_bridge::{ensure_auth_bridge, resolve_auth_bridge};
pub use pipeline::{InstallPipeline, InstallRequest, InstallStage, InstallationRun};
