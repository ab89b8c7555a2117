// ─── Version Descriptor ───
// Parses a version JSON, evaluates OS rules and resolves `inheritsFrom` chains.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::GameFolder;
use crate::core::maven::MavenArtifact;
use crate::core::mirror::OFFICIAL_LIBRARY_HOST;

const MAX_INHERITANCE_DEPTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    /// Which version's jar this one runs on, when not its own.
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Pre-1.13 space-separated game arguments.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<serde_json::Value>,
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    /// Maven repository base for descriptors that only list coordinates
    /// (Fabric/Quilt profiles).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub rules: Option<Vec<LibraryRule>>,
    #[serde(default)]
    pub natives: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
}

/// A concrete file to place under `libraries/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    /// `/`-separated path relative to `libraries/`.
    pub path: String,
    /// Absent for files that installers generate locally.
    pub url: Option<String>,
    pub sha1: Option<String>,
}

impl LibraryEntry {
    /// Mojang rule semantics: no rules → allowed; otherwise start disallowed
    /// and let each matching rule set the state, last match wins.
    pub fn is_allowed_for_current_os(&self) -> bool {
        match &self.rules {
            None => true,
            Some(rules) => {
                let mut allowed = false;
                for rule in rules {
                    let os_matches = rule
                        .os
                        .as_ref()
                        .and_then(|os| os.name.as_deref())
                        .map_or(true, |name| name == current_os_name());
                    if os_matches {
                        allowed = rule.action == RuleAction::Allow;
                    }
                }
                allowed
            }
        }
    }

    /// The main jar, from explicit download info or derived from the
    /// coordinate and the optional repository URL.
    pub fn artifact(&self) -> Option<LibraryFile> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            let path = match &artifact.path {
                Some(p) => p.clone(),
                None => MavenArtifact::parse(&self.name).ok()?.relative_path(),
            };
            return Some(LibraryFile {
                path,
                url: artifact.url.clone().filter(|u| !u.is_empty()),
                sha1: artifact.sha1.clone(),
            });
        }

        // Natives-only legacy entries carry classifiers but no artifact.
        if self.downloads.is_some() && self.natives.is_some() {
            return None;
        }

        // Bare coordinates without a repository live on the vanilla host.
        let coord = MavenArtifact::parse(&self.name).ok()?;
        let repo = self.url.as_deref().unwrap_or(OFFICIAL_LIBRARY_HOST);
        Some(LibraryFile {
            url: Some(coord.url(repo)),
            path: coord.relative_path(),
            sha1: self.sha1.clone(),
        })
    }

    /// Classifier name (`natives-linux`, `natives-windows-64`) for this OS.
    pub fn native_classifier_for_current_os(&self) -> Option<String> {
        let natives = self.natives.as_ref()?;
        let pattern = natives.get(current_os_name())?.as_str()?;
        let arch = if cfg!(target_pointer_width = "64") { "64" } else { "32" };
        Some(pattern.replace("${arch}", arch))
    }

    /// The native jar for this OS, if the library ships one.
    pub fn native_file(&self) -> Option<LibraryFile> {
        let classifier = self.native_classifier_for_current_os()?;
        let entry = self
            .downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .and_then(|c| c.get(&classifier));

        match entry {
            Some(info) => Some(LibraryFile {
                path: info.get("path")?.as_str()?.to_string(),
                url: info.get("url").and_then(|v| v.as_str()).map(str::to_string),
                sha1: info.get("sha1").and_then(|v| v.as_str()).map(str::to_string),
            }),
            None => {
                let mut coord = MavenArtifact::parse(&self.name).ok()?;
                coord.classifier = Some(classifier);
                let repo = self.url.as_deref().unwrap_or(OFFICIAL_LIBRARY_HOST);
                Some(LibraryFile {
                    url: Some(coord.url(repo)),
                    path: coord.relative_path(),
                    sha1: None,
                })
            }
        }
    }

    fn dedupe_key(&self) -> String {
        MavenArtifact::parse(&self.name)
            .map(|a| a.unversioned_key())
            .unwrap_or_else(|_| self.name.clone())
    }
}

/// Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl VersionJson {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub async fn load(folder: &GameFolder, id: &str) -> LauncherResult<Self> {
        let path = folder.version_json(id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LauncherError::VersionDescriptorMissing(id.to_string()))
            }
            Err(e) => return Err(LauncherError::io(&path, e)),
        };
        Self::parse(&raw)
    }

    pub async fn save_raw(folder: &GameFolder, id: &str, raw: &str) -> LauncherResult<()> {
        let dir = folder.version_dir(id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| LauncherError::io(&dir, e))?;
        let path = folder.version_json(id);
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| LauncherError::io(&path, e))
    }

    fn game_args(&self) -> Vec<String> {
        self.arguments
            .as_ref()
            .map(|a| a.game.iter().flat_map(extract_argument_values).collect())
            .unwrap_or_default()
    }

    fn jvm_args(&self) -> Vec<String> {
        self.arguments
            .as_ref()
            .map(|a| a.jvm.iter().flat_map(extract_argument_values).collect())
            .unwrap_or_default()
    }
}

// ─── Inheritance resolution ───

/// A version with its whole `inheritsFrom` chain folded in.
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub id: String,
    /// `[id, parent, grandparent, ...]`
    pub chain: Vec<String>,
    pub main_class: String,
    /// Version whose jar goes on the classpath.
    pub jar_id: String,
    pub client_download: Option<DownloadArtifact>,
    /// Child libraries first; a child's copy replaces the parent's.
    pub libraries: Vec<LibraryEntry>,
    pub asset_index: Option<AssetIndexInfo>,
    pub assets: Option<String>,
    pub game_args: Vec<String>,
    pub jvm_args: Vec<String>,
}

impl ResolvedVersion {
    /// Read `versions/<id>/<id>.json` and every ancestor from disk.
    pub async fn load(folder: &GameFolder, id: &str) -> LauncherResult<Self> {
        let mut chain = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(version_id) = current {
            if chain.len() >= MAX_INHERITANCE_DEPTH
                || chain.iter().any(|(v, _): &(String, VersionJson)| *v == version_id)
            {
                return Err(LauncherError::Other(format!(
                    "inheritance chain of {} is cyclic or too deep",
                    id
                )));
            }
            let json = VersionJson::load(folder, &version_id).await?;
            current = json.inherits_from.clone();
            chain.push((version_id, json));
        }
        Ok(Self::from_chain(chain))
    }

    /// Fold `[(id, child), (id, parent), ...]`, nearest descriptor first.
    pub fn from_chain(chain: Vec<(String, VersionJson)>) -> Self {
        let ids: Vec<String> = chain.iter().map(|(id, _)| id.clone()).collect();
        let id = ids.first().cloned().unwrap_or_default();

        let main_class = chain
            .iter()
            .find_map(|(_, v)| v.main_class.clone())
            .unwrap_or_default();
        let jar_id = chain
            .iter()
            .find_map(|(_, v)| v.jar.clone())
            .or_else(|| {
                chain
                    .iter()
                    .find(|(_, v)| v.downloads.as_ref().and_then(|d| d.client.as_ref()).is_some())
                    .map(|(id, _)| id.clone())
            })
            .or_else(|| ids.last().cloned())
            .unwrap_or_default();
        let client_download = chain
            .iter()
            .find_map(|(_, v)| v.downloads.as_ref().and_then(|d| d.client.clone()));
        let asset_index = chain.iter().find_map(|(_, v)| v.asset_index.clone());
        let assets = chain.iter().find_map(|(_, v)| v.assets.clone());

        let mut seen = HashSet::new();
        let mut libraries = Vec::new();
        for (_, version) in &chain {
            for lib in &version.libraries {
                if seen.insert(lib.dedupe_key()) {
                    libraries.push(lib.clone());
                }
            }
        }

        // Legacy argument strings are complete per descriptor: the nearest
        // one wins. Modern argument lists accumulate root first.
        let game_args = match chain.iter().find_map(|(_, v)| v.minecraft_arguments.clone()) {
            Some(legacy) => legacy.split_whitespace().map(str::to_string).collect(),
            None => chain.iter().rev().flat_map(|(_, v)| v.game_args()).collect(),
        };
        let jvm_args = chain.iter().rev().flat_map(|(_, v)| v.jvm_args()).collect();

        debug!("Resolved {} through {:?}", id, ids);
        Self {
            id,
            chain: ids,
            main_class,
            jar_id,
            client_download,
            libraries,
            asset_index,
            assets,
            game_args,
            jvm_args,
        }
    }

    /// Libraries applicable to this OS.
    pub fn allowed_libraries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.libraries.iter().filter(|l| l.is_allowed_for_current_os())
    }

    pub fn asset_index_id(&self) -> String {
        self.asset_index
            .as_ref()
            .map(|a| a.id.clone())
            .or_else(|| self.assets.clone())
            .unwrap_or_else(|| "legacy".to_string())
    }
}

fn extract_argument_values(value: &serde_json::Value) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules").and_then(|r| r.as_array()) {
        if !rules_allow(rules) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

/// Argument rules. Feature-gated rules (demo mode, custom resolution,
/// quick play) never apply since none of those features are enabled.
fn rules_allow(rules: &[serde_json::Value]) -> bool {
    let mut allowed = false;
    for rule in rules {
        if rule.get("features").is_some() {
            return false;
        }
        let action = rule
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("disallow");
        let os_matches = rule
            .get("os")
            .and_then(|os| os.get("name"))
            .and_then(|name| name.as_str())
            .map_or(true, |name| name == current_os_name());
        if os_matches {
            allowed = action == "allow";
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(value: serde_json::Value) -> LibraryEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn no_rules_means_allowed() {
        assert!(lib(serde_json::json!({"name": "a:b:1.0"})).is_allowed_for_current_os());
    }

    #[test]
    fn disallow_current_os() {
        let entry = lib(serde_json::json!({
            "name": "a:b:1.0",
            "rules": [
                {"action": "allow"},
                {"action": "disallow", "os": {"name": current_os_name()}}
            ]
        }));
        assert!(!entry.is_allowed_for_current_os());
    }

    #[test]
    fn artifact_from_coordinate_and_repo() {
        let entry = lib(serde_json::json!({
            "name": "net.fabricmc:intermediary:1.20.1",
            "url": "https://maven.fabricmc.net/"
        }));
        assert_eq!(
            entry.artifact().unwrap(),
            LibraryFile {
                path: "net/fabricmc/intermediary/1.20.1/intermediary-1.20.1.jar".into(),
                url: Some("https://maven.fabricmc.net/net/fabricmc/intermediary/1.20.1/intermediary-1.20.1.jar".into()),
                sha1: None,
            }
        );
    }

    #[test]
    fn empty_download_url_means_generated_locally() {
        let entry = lib(serde_json::json!({
            "name": "net.minecraftforge:forge:1.20.1-47.2.0:client",
            "downloads": {"artifact": {"path": "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar", "url": "", "sha1": "aa"}}
        }));
        assert_eq!(entry.artifact().unwrap().url, None);
    }

    #[test]
    fn argument_object_rules_apply_to_current_os() {
        let parsed = VersionJson::parse(
            &serde_json::json!({
                "id": "test",
                "mainClass": "net.minecraft.client.main.Main",
                "arguments": {
                    "game": [
                        "--username", "${auth_player_name}",
                        {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"},
                        {"rules": [{"action": "allow", "os": {"name": current_os_name()}}], "value": ["--here"]}
                    ]
                }
            })
            .to_string(),
        )
        .unwrap();
        let args = parsed.game_args();
        assert_eq!(args, vec!["--username", "${auth_player_name}", "--here"]);
    }

    fn vanilla() -> VersionJson {
        VersionJson::parse(
            &serde_json::json!({
                "id": "1.20.1",
                "mainClass": "net.minecraft.client.main.Main",
                "downloads": {"client": {"sha1": "c", "size": 1, "url": "https://piston-data.mojang.com/v1/objects/c/client.jar"}},
                "assetIndex": {"id": "5", "url": "https://piston-meta.mojang.com/v1/packages/a/5.json", "sha1": "a"},
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.3"},
                    {"name": "com.mojang:brigadier:1.1.8"}
                ],
                "arguments": {"game": ["--version", "${version_name}"], "jvm": ["-cp", "${classpath}"]}
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn child_overrides_main_class_and_libraries() {
        let fabric = VersionJson::parse(
            &serde_json::json!({
                "id": "fabric-loader-0.15.11-1.20.1",
                "inheritsFrom": "1.20.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.6", "url": "https://maven.fabricmc.net/"},
                    {"name": "net.fabricmc:fabric-loader:0.15.11", "url": "https://maven.fabricmc.net/"}
                ],
                "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]}
            })
            .to_string(),
        )
        .unwrap();

        let resolved = ResolvedVersion::from_chain(vec![
            ("fabric-loader-0.15.11-1.20.1".into(), fabric),
            ("1.20.1".into(), vanilla()),
        ]);

        assert_eq!(resolved.main_class, "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(resolved.jar_id, "1.20.1");
        assert_eq!(resolved.asset_index_id(), "5");
        let names: Vec<&str> = resolved.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["org.ow2.asm:asm:9.6", "net.fabricmc:fabric-loader:0.15.11", "com.mojang:brigadier:1.1.8"]
        );
        assert_eq!(resolved.jvm_args[0], "-cp");
        assert_eq!(resolved.game_args, vec!["--version", "${version_name}"]);
    }

    #[test]
    fn legacy_arguments_come_from_nearest_descriptor() {
        let parent = VersionJson::parse(
            r#"{"id":"1.12.2","mainClass":"net.minecraft.client.main.Main","minecraftArguments":"--username ${auth_player_name}"}"#,
        )
        .unwrap();
        let child = VersionJson::parse(
            r#"{"id":"1.12.2-forge-14.23.5.2864","inheritsFrom":"1.12.2","mainClass":"net.minecraft.launchwrapper.Launch","minecraftArguments":"--username ${auth_player_name} --tweakClass net.minecraftforge.fml.common.launcher.FMLTweaker"}"#,
        )
        .unwrap();
        let resolved = ResolvedVersion::from_chain(vec![
            ("1.12.2-forge-14.23.5.2864".into(), child),
            ("1.12.2".into(), parent),
        ]);
        assert_eq!(resolved.game_args.len(), 4);
        assert_eq!(resolved.main_class, "net.minecraft.launchwrapper.Launch");
    }

    #[tokio::test]
    async fn missing_parent_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let folder = GameFolder::new(dir.path());
        VersionJson::save_raw(
            &folder,
            "child",
            r#"{"id":"child","inheritsFrom":"parent","mainClass":"M"}"#,
        )
        .await
        .unwrap();
        let err = ResolvedVersion::load(&folder, "child").await.unwrap_err();
        assert!(matches!(err, LauncherError::VersionDescriptorMissing(id) if id == "parent"));
    }

    #[tokio::test]
    async fn cyclic_chain_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let folder = GameFolder::new(dir.path());
        VersionJson::save_raw(&folder, "a", r#"{"inheritsFrom":"b"}"#).await.unwrap();
        VersionJson::save_raw(&folder, "b", r#"{"inheritsFrom":"a"}"#).await.unwrap();
        assert!(ResolvedVersion::load(&folder, "a").await.is_err());
    }
}
