use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

/// Mod loader of an instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    #[default]
    Vanilla,
    Forge,
    Fabric,
    NeoForge,
    Quilt,
}

impl std::fmt::Display for LoaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderType::Vanilla => write!(f, "vanilla"),
            LoaderType::Forge => write!(f, "forge"),
            LoaderType::Fabric => write!(f, "fabric"),
            LoaderType::NeoForge => write!(f, "neoforge"),
            LoaderType::Quilt => write!(f, "quilt"),
        }
    }
}

/// Which side of the game a manifest file belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileSide {
    Client,
    Server,
    #[default]
    Both,
}

impl FileSide {
    pub fn wanted_on_client(self) -> bool {
        !matches!(self, FileSide::Server)
    }
}

/// One file the instance must contain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestFile {
    /// Path relative to the instance directory, `/`-separated.
    pub path: String,
    pub filename: String,
    pub url: String,
    /// SHA-256, hex.
    pub hash: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub side: FileSide,
}

impl ManifestFile {
    /// Destination inside `instance_dir`, refusing anything that could
    /// escape it.
    pub fn local_path(&self, instance_dir: &Path) -> LauncherResult<PathBuf> {
        Ok(instance_dir.join(safe_relative_path(&self.path)?))
    }
}

/// The backend's description of one instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub instance_id: String,
    pub mc_version: String,
    #[serde(default)]
    pub loader_type: LoaderType,
    #[serde(default)]
    pub loader_version: Option<String>,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    /// Reject manifests that would write outside the instance directory or
    /// name an instance the backend itself would not accept.
    pub fn validate(&self) -> LauncherResult<()> {
        validate_instance_id(&self.instance_id)?;
        if self.mc_version.trim().is_empty() {
            return Err(LauncherError::InvalidManifest(
                "mc_version is empty".to_string(),
            ));
        }
        for file in &self.files {
            safe_relative_path(&file.path)?;
            if file.hash.trim().is_empty() {
                return Err(LauncherError::InvalidManifest(format!(
                    "{} has no hash",
                    file.path
                )));
            }
        }
        Ok(())
    }
}

/// Entry of the remote instance list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mc_version: String,
    #[serde(default)]
    pub loader_type: String,
}

/// Instance ids become directory names, so they are held to the backend's
/// own pattern `^[a-z0-9][a-z0-9-]*[a-z0-9]$`.
pub fn validate_instance_id(id: &str) -> LauncherResult<()> {
    let bytes = id.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let valid = bytes.len() >= 2
        && edge_ok(bytes[0])
        && edge_ok(bytes[bytes.len() - 1])
        && bytes.iter().all(|&b| edge_ok(b) || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(LauncherError::InvalidInstanceId(id.to_string()))
    }
}

/// Turn a manifest path into a relative path with only normal components.
pub fn safe_relative_path(raw: &str) -> LauncherResult<PathBuf> {
    let unsafe_path = || LauncherError::InvalidManifest(format!("unsafe file path {:?}", raw));
    if raw.is_empty() || raw.contains('\\') || raw.contains(':') {
        return Err(unsafe_path());
    }
    let mut out = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(unsafe_path()),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(unsafe_path());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_backend_shape() {
        let raw = r#"{
            "instance_id": "hitech-1",
            "mc_version": "1.12.2",
            "loader_type": "forge",
            "files": [
                {"filename": "jei.jar", "hash": "ab", "size": 3, "path": "mods/jei.jar", "url": "http://s/jei.jar"}
            ]
        }"#;
        let manifest: Manifest = serde_json::from_str(raw).unwrap();
        assert_eq!(manifest.loader_type, LoaderType::Forge);
        assert_eq!(manifest.loader_version, None);
        assert_eq!(manifest.files[0].side, FileSide::Both);
        manifest.validate().unwrap();
    }

    #[test]
    fn loader_type_is_lowercase_on_the_wire() {
        let t: LoaderType = serde_json::from_str("\"neoforge\"").unwrap();
        assert_eq!(t, LoaderType::NeoForge);
        assert_eq!(LoaderType::Quilt.to_string(), "quilt");
    }

    #[test]
    fn instance_id_pattern() {
        for ok in ["hitech", "a1", "tech-2024", "0-0"] {
            validate_instance_id(ok).unwrap();
        }
        for bad in ["", "a", "-abc", "abc-", "ABC", "a_b", "../x", "a/b"] {
            assert!(validate_instance_id(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn unsafe_paths_are_rejected() {
        for bad in ["../evil.jar", "mods/../../x", "/etc/passwd", "C:/x", "mods\\x.jar", "", "."] {
            assert!(safe_relative_path(bad).is_err(), "{bad}");
        }
        assert_eq!(
            safe_relative_path("./config/a.cfg").unwrap(),
            PathBuf::from("config").join("a.cfg")
        );
    }

    #[test]
    fn manifest_with_traversal_fails_validation() {
        let manifest = Manifest {
            instance_id: "pack".into(),
            mc_version: "1.20.1".into(),
            loader_type: LoaderType::Fabric,
            loader_version: None,
            files: vec![ManifestFile {
                path: "../../x.jar".into(),
                filename: "x.jar".into(),
                url: "http://s/x".into(),
                hash: "00".into(),
                size: 0,
                side: FileSide::Both,
            }],
        };
        assert!(matches!(
            manifest.validate(),
            Err(LauncherError::InvalidManifest(_))
        ));
    }
}
