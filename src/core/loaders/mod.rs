pub mod context;
pub mod fabric;
pub mod forge;
pub mod installer;
pub mod neoforge;
pub mod quilt;

pub use context::LoaderContext;
pub use installer::{Installer, LoaderInstaller, DEFAULT_FORGE_VERSION};
