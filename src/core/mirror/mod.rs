// ─── Mirror Failover Client ───
// Ordered upstream mirror sets and the sticky cursor that walks them.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventBus;

// ── Official upstream hosts ─────────────────────────────

pub const OFFICIAL_METADATA_HOST: &str = "https://piston-meta.mojang.com";
pub const OFFICIAL_ASSET_HOST: &str = "https://resources.download.minecraft.net";
pub const OFFICIAL_LIBRARY_HOST: &str = "https://libraries.minecraft.net";
pub const OFFICIAL_FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
pub const OFFICIAL_NEOFORGE_MAVEN: &str = "https://maven.neoforged.net/releases";
pub const OFFICIAL_FABRIC_META: &str = "https://meta.fabricmc.net";
pub const OFFICIAL_FABRIC_MAVEN: &str = "https://maven.fabricmc.net";
pub const OFFICIAL_QUILT_META: &str = "https://meta.quiltmc.org";
pub const OFFICIAL_QUILT_MAVEN: &str = "https://maven.quiltmc.org/repository/release";

/// Hosts that descriptors embed and that a mirror may stand in for.
/// Piston data and the legacy launcher hosts serve client jars; mirrors
/// expose those under their metadata host.
const METADATA_ALIASES: &[&str] = &[
    "https://piston-meta.mojang.com",
    "https://piston-data.mojang.com",
    "https://launchermeta.mojang.com",
    "https://launcher.mojang.com",
];

/// One upstream mirror set. Every field is a base URL without trailing slash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mirror {
    pub name: String,
    /// Version list, version descriptors and client jars.
    pub metadata_host: String,
    /// Asset objects (`/<xx>/<hash>`).
    pub asset_host: String,
    /// Vanilla libraries.
    pub library_host: String,
    pub forge_maven: String,
    pub neoforge_maven: String,
    pub fabric_meta: String,
    pub fabric_maven: String,
    pub quilt_meta: String,
    pub quilt_maven: String,
}

impl Mirror {
    pub fn official() -> Self {
        Self {
            name: "Official".to_string(),
            metadata_host: OFFICIAL_METADATA_HOST.to_string(),
            asset_host: OFFICIAL_ASSET_HOST.to_string(),
            library_host: OFFICIAL_LIBRARY_HOST.to_string(),
            forge_maven: OFFICIAL_FORGE_MAVEN.to_string(),
            neoforge_maven: OFFICIAL_NEOFORGE_MAVEN.to_string(),
            fabric_meta: OFFICIAL_FABRIC_META.to_string(),
            fabric_maven: OFFICIAL_FABRIC_MAVEN.to_string(),
            quilt_meta: OFFICIAL_QUILT_META.to_string(),
            quilt_maven: OFFICIAL_QUILT_MAVEN.to_string(),
        }
    }

    pub fn fast_mirror() -> Self {
        Self {
            name: "FastMirror".to_string(),
            metadata_host: "https://piston-meta.fastmcmirror.org".to_string(),
            asset_host: "https://resources.fastmcmirror.org".to_string(),
            library_host: "https://libraries.fastmcmirror.org/maven".to_string(),
            forge_maven: "https://forge.fastmcmirror.org/maven".to_string(),
            // No NeoForge or Quilt mirror exists there; use upstream.
            neoforge_maven: OFFICIAL_NEOFORGE_MAVEN.to_string(),
            fabric_meta: "https://fabric.fastmcmirror.org".to_string(),
            fabric_maven: "https://fabric.fastmcmirror.org/maven".to_string(),
            quilt_meta: OFFICIAL_QUILT_META.to_string(),
            quilt_maven: OFFICIAL_QUILT_MAVEN.to_string(),
        }
    }

    /// Every host of this mirror pointed at one base URL. Handy for local
    /// mirrors and HTTP fixtures.
    pub fn single_host(name: &str, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            name: name.to_string(),
            metadata_host: base.clone(),
            asset_host: base.clone(),
            library_host: base.clone(),
            forge_maven: base.clone(),
            neoforge_maven: base.clone(),
            fabric_meta: base.clone(),
            fabric_maven: base.clone(),
            quilt_meta: base.clone(),
            quilt_maven: base,
        }
    }

    pub fn version_manifest_url(&self) -> String {
        format!("{}/mc/game/version_manifest_v2.json", self.metadata_host)
    }

    /// Map a URL embedded in an upstream descriptor onto this mirror.
    /// URLs on unknown hosts are returned unchanged.
    pub fn rewrite_url(&self, url: &str) -> String {
        let pairs: [(&str, &str); 8] = [
            (OFFICIAL_ASSET_HOST, &self.asset_host),
            (OFFICIAL_LIBRARY_HOST, &self.library_host),
            (OFFICIAL_FORGE_MAVEN, &self.forge_maven),
            (OFFICIAL_NEOFORGE_MAVEN, &self.neoforge_maven),
            (OFFICIAL_FABRIC_META, &self.fabric_meta),
            (OFFICIAL_FABRIC_MAVEN, &self.fabric_maven),
            (OFFICIAL_QUILT_META, &self.quilt_meta),
            (OFFICIAL_QUILT_MAVEN, &self.quilt_maven),
        ];

        if self.metadata_host != OFFICIAL_METADATA_HOST {
            for official in METADATA_ALIASES {
                if let Some(rest) = strip_host(url, official) {
                    return format!("{}{}", self.metadata_host, rest);
                }
            }
        }
        for (official, replacement) in pairs {
            if let Some(rest) = strip_host(url, official) {
                return format!("{}{}", replacement, rest);
            }
        }
        url.to_string()
    }
}

fn strip_host<'a>(url: &'a str, host: &str) -> Option<&'a str> {
    let rest = url.strip_prefix(host)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Default ordered mirror list: community mirror first, official upstream last.
pub fn default_mirrors() -> Vec<Mirror> {
    vec![Mirror::fast_mirror(), Mirror::official()]
}

// ── Failover ────────────────────────────────────────────

/// Runs an operation against the current mirror and advances to the next one
/// on failure. The cursor stays on whichever mirror last succeeded, so later
/// calls start there. When every remaining mirror fails the cursor is put back
/// where the call found it.
pub struct MirrorFailover {
    mirrors: Vec<Mirror>,
    cursor: AtomicUsize,
    events: EventBus,
}

impl MirrorFailover {
    pub fn new(mirrors: Vec<Mirror>, events: EventBus) -> Self {
        Self {
            mirrors,
            cursor: AtomicUsize::new(0),
            events,
        }
    }

    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<&Mirror> {
        self.mirrors.get(self.current_index())
    }

    /// Try `operation` on the current mirror, then each following one in
    /// order. Never runs two mirrors at once.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> LauncherResult<T>
    where
        F: FnMut(Mirror) -> Fut,
        Fut: Future<Output = LauncherResult<T>>,
    {
        let start = self.current_index();
        let mut last_error: Option<LauncherError> = None;
        let mut attempts = 0usize;

        for index in start..self.mirrors.len() {
            let mirror = self.mirrors[index].clone();
            if index != start {
                self.cursor.store(index, Ordering::SeqCst);
                self.report(format!("Switching to mirror: {}", mirror.name));
            }
            self.report(format!("Trying {} with {}...", operation_name, mirror.name));
            attempts += 1;

            let name = mirror.name.clone();
            match operation(mirror).await {
                Ok(value) => {
                    self.report(format!("{} succeeded with {}", operation_name, name));
                    return Ok(value);
                }
                Err(e) if e.is_hard_failure() => {
                    self.cursor.store(start, Ordering::SeqCst);
                    return Err(e);
                }
                Err(e) => {
                    warn!("{} failed on mirror {}: {}", operation_name, name, e);
                    self.events.log(format!("{} failed: {}", name, e));
                    last_error = Some(e);
                }
            }
        }

        self.cursor.store(start, Ordering::SeqCst);
        let last = last_error
            .unwrap_or_else(|| LauncherError::Other("no mirrors configured".to_string()));
        Err(LauncherError::AllMirrorsFailed {
            operation: operation_name.to_string(),
            attempts,
            last: Box::new(last),
        })
    }

    fn report(&self, line: String) {
        info!("{}", line);
        self.events.log(line);
    }
}
