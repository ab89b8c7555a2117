// ─── Classpath Builder ───
// Assembles `-cp` from the resolved libraries and unpacks native jars.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::GameFolder;
use crate::core::version::ResolvedVersion;

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Every library jar present on disk, then the version jar.
///
/// Libraries that were never downloaded are skipped with a debug line; the
/// version jar is always appended.
pub fn build_classpath(version: &ResolvedVersion, folder: &GameFolder) -> LauncherResult<String> {
    let mut seen = HashSet::new();
    let mut entries: Vec<String> = Vec::new();

    for lib in version.allowed_libraries() {
        let Some(file) = lib.artifact() else {
            continue;
        };
        let jar = folder.library(&file.path);
        if !jar.is_file() {
            debug!("Library not found on disk (skipping): {}", lib.name);
            continue;
        }
        let entry = safe_path_str(&jar);
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    let client_jar = folder.version_jar(&version.jar_id);
    if !client_jar.is_file() {
        warn!("Version jar missing: {:?}", client_jar);
    }
    entries.push(safe_path_str(&client_jar));

    if entries.iter().all(|e| e.trim().is_empty()) {
        return Err(LauncherError::Other("empty classpath".into()));
    }
    Ok(entries.join(classpath_separator()))
}

fn is_native_name(name: &str) -> bool {
    name.ends_with(".dll")
        || name.ends_with(".so")
        || name.ends_with(".dylib")
        || name.ends_with(".jnilib")
}

/// Unpack `.dll`/`.so`/`.dylib` files from this OS's native jars into a
/// fresh `natives/<version>/` directory.
pub async fn extract_natives(
    version: &ResolvedVersion,
    folder: &GameFolder,
) -> LauncherResult<PathBuf> {
    let natives_dir = folder.natives_dir(&version.id);
    if natives_dir.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&natives_dir).await {
            debug!("Cannot clear natives dir {:?}: {}", natives_dir, e);
        }
    }
    tokio::fs::create_dir_all(&natives_dir)
        .await
        .map_err(|e| LauncherError::io(&natives_dir, e))?;

    let jars: Vec<PathBuf> = version
        .allowed_libraries()
        .filter_map(|lib| lib.native_file())
        .map(|file| folder.library(&file.path))
        .filter(|jar| jar.is_file())
        .collect();
    if jars.is_empty() {
        return Ok(natives_dir);
    }

    let dest_dir = natives_dir.clone();
    tokio::task::spawn_blocking(move || -> LauncherResult<()> {
        for jar in jars {
            if let Err(e) = unpack_native_jar(&jar, &dest_dir) {
                warn!("Cannot unpack native jar {:?}: {}", jar, e);
            }
        }
        Ok(())
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;

    Ok(natives_dir)
}

fn unpack_native_jar(jar: &Path, dest_dir: &Path) -> LauncherResult<()> {
    let file = std::fs::File::open(jar).map_err(|e| LauncherError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        // Only top-level files; nested paths never leave the natives dir.
        if name.contains("META-INF") || name.contains('/') || name.contains('\\') {
            continue;
        }
        if !is_native_name(&name) {
            continue;
        }
        let dest = dest_dir.join(&name);
        let mut out = std::fs::File::create(&dest).map_err(|e| LauncherError::io(&dest, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&dest, e))?;
        debug!("Extracted native: {}", name);
    }
    Ok(())
}

/// Absolute path as a string, without the `\\?\` prefix Java cannot read.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::VersionJson;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn resolved(raw: serde_json::Value) -> ResolvedVersion {
        let json: VersionJson = serde_json::from_value(raw).unwrap();
        ResolvedVersion::from_chain(vec![("1.12.2".into(), json)])
    }

    fn touch(path: &Path, bytes: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn present_libraries_then_version_jar() {
        let dir = tempfile::tempdir().unwrap();
        let folder = GameFolder::new(dir.path());
        let version = resolved(serde_json::json!({
            "id": "1.12.2",
            "mainClass": "net.minecraft.client.main.Main",
            "libraries": [
                {"name": "com.mojang:brigadier:1.0.18"},
                {"name": "org.missing:gone:1.0"},
                {"name": "com.mojang:brigadier:1.0.18"}
            ]
        }));
        touch(&folder.library("com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar"), b"x");
        touch(&folder.version_jar("1.12.2"), b"x");

        let cp = build_classpath(&version, &folder).unwrap();
        let parts: Vec<&str> = cp.split(classpath_separator()).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("brigadier-1.0.18.jar"));
        assert!(parts[1].ends_with("1.12.2.jar"));
    }

    #[tokio::test]
    async fn natives_are_unpacked_flat() {
        let dir = tempfile::tempdir().unwrap();
        let folder = GameFolder::new(dir.path());
        let version = resolved(serde_json::json!({
            "id": "1.12.2",
            "libraries": [{
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                "natives": {"linux": "natives-x", "windows": "natives-x", "osx": "natives-x"},
                "downloads": {"classifiers": {"natives-x": {
                    "path": "org/lwjgl/lwjgl-platform-natives.jar",
                    "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl-platform-natives.jar"
                }}}
            }]
        }));

        let jar = folder.library("org/lwjgl/lwjgl-platform-natives.jar");
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        let mut writer = zip::ZipWriter::new(std::fs::File::create(&jar).unwrap());
        writer.start_file("liblwjgl.so", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"elf").unwrap();
        writer.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"Manifest-Version: 1.0").unwrap();
        writer.start_file("nested/evil.so", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"no").unwrap();
        writer.finish().unwrap();

        let natives = extract_natives(&version, &folder).await.unwrap();
        assert_eq!(natives, folder.natives_dir("1.12.2"));
        assert!(natives.join("liblwjgl.so").is_file());
        assert!(!natives.join("evil.so").exists());
        assert_eq!(std::fs::read_dir(&natives).unwrap().count(), 1);
    }
}
