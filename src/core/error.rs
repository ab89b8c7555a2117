use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launcher engine.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("All mirrors failed for {operation} ({attempts} attempts), last error: {last}")]
    AllMirrorsFailed {
        operation: String,
        attempts: usize,
        #[source]
        last: Box<LauncherError>,
    },

    #[error("Backend returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    // ── Integrity ───────────────────────────────────────
    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{failed} of {total} files failed to sync, first error: {first}")]
    SyncFailed {
        failed: usize,
        total: usize,
        #[source]
        first: Box<LauncherError>,
    },

    // ── Manifest / instance data ────────────────────────
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid instance id: {0:?}")]
    InvalidInstanceId(String),

    #[error("Minecraft version {0} not found in version list")]
    VersionNotFound(String),

    #[error("Version descriptor missing for {0}")]
    VersionDescriptorMissing(String),

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── XML ─────────────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Java / process ──────────────────────────────────
    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    #[error("Failed to start game process: {0}")]
    ProcessSpawn(String),

    // ── Loader ──────────────────────────────────────────
    #[error("Loader error: {0}")]
    Loader(String),

    #[error("No {loader} build available for Minecraft {minecraft_version}")]
    LoaderVersionNotFound {
        loader: String,
        minecraft_version: String,
    },

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Session / control flow ──────────────────────────
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Installation cancelled")]
    Cancelled,

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Data errors that another attempt or another mirror cannot fix.
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            LauncherError::Cancelled
                | LauncherError::VersionNotFound(_)
                | LauncherError::LoaderVersionNotFound { .. }
                | LauncherError::InvalidManifest(_)
                | LauncherError::InvalidInstanceId(_)
        )
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for Tauri IPC ─────────────────────────
// Tauri commands require the error type to implement `Serialize`.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
