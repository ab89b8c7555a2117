use std::path::Path;

use crate::core::downloader::Downloader;
use crate::core::events::EventBus;
use crate::core::instance::GameFolder;
use crate::core::java::CommandRunner;

/// Everything a loader installer needs, borrowed from the pipeline.
pub struct LoaderContext<'a> {
    pub minecraft_version: &'a str,
    pub folder: &'a GameFolder,
    pub downloader: &'a Downloader,
    pub runner: &'a dyn CommandRunner,
    /// Runtime chosen for the game; installer jars run on it too.
    pub java: &'a Path,
    pub events: &'a EventBus,
}
