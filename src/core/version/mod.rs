pub mod manifest;
pub mod version_file;

pub use manifest::{VersionEntry, VersionManifest};
pub use version_file::{
    current_os_name, AssetIndexInfo, DownloadArtifact, LibraryEntry, LibraryFile,
    ResolvedVersion, VersionJson,
};
