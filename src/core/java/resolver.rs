// ─── Runtime Resolver ───
// Picks a Java executable suitable for a game version.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::command::CommandRunner;
use super::runtime::{is_acceptable_major, parse_major_version, parse_version_string, required_java_major};
use crate::core::events::EventBus;

#[cfg(target_os = "windows")]
const JAVA_BIN: &str = "java.exe";
#[cfg(not(target_os = "windows"))]
const JAVA_BIN: &str = "java";

/// A discovered executable and the major version it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCandidate {
    pub path: PathBuf,
    pub major: Option<u32>,
}

/// Where to look for Java, in priority order.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSearch {
    pub java_home: Option<PathBuf>,
    /// Vendor install roots whose subdirectories each hold a JDK/JRE.
    pub vendor_roots: Vec<PathBuf>,
}

impl RuntimeSearch {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(PathBuf::from), cfg!(windows))
    }

    /// Vendor roots are only scanned on Windows; elsewhere `java` on `PATH`
    /// is the system's choice.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<PathBuf>, windows: bool) -> Self {
        let java_home = lookup("JAVA_HOME").filter(|p| !p.as_os_str().is_empty());
        let mut vendor_roots = Vec::new();
        if windows {
            for program_files in ["ProgramFiles", "ProgramFiles(x86)"] {
                if let Some(base) = lookup(program_files) {
                    vendor_roots.push(base.join("Java"));
                    vendor_roots.push(base.join("Eclipse Adoptium"));
                }
            }
        }
        Self {
            java_home,
            vendor_roots,
        }
    }

    /// `$JAVA_HOME/bin/java`, bare `java`, then `<root>/<dir>/bin/java` for
    /// every vendor subdirectory (sorted by name).
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(home) = &self.java_home {
            out.push(home.join("bin").join(JAVA_BIN));
        }
        out.push(PathBuf::from(JAVA_BIN));

        for root in &self.vendor_roots {
            let Ok(entries) = std::fs::read_dir(root) else {
                continue;
            };
            let mut dirs: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            dirs.sort();
            out.extend(dirs.into_iter().map(|d| d.join("bin").join(JAVA_BIN)));
        }
        out
    }
}

pub struct RuntimeResolver {
    runner: Arc<dyn CommandRunner>,
    search: RuntimeSearch,
    events: EventBus,
}

impl RuntimeResolver {
    pub fn new(runner: Arc<dyn CommandRunner>, search: RuntimeSearch, events: EventBus) -> Self {
        Self {
            runner,
            search,
            events,
        }
    }

    /// Never fails: without an acceptable candidate the bare `java` command
    /// is returned and the launch may still work if it is on `PATH`.
    #[instrument(skip(self))]
    pub async fn find_best_java(&self, game_version: &str) -> PathBuf {
        let required = required_java_major(game_version);
        self.events
            .log(format!("Detecting Java for Minecraft {}...", game_version));
        debug!("Minecraft {} requires Java {}", game_version, required);

        for path in self.search.candidates() {
            let candidate = self.probe(&path).await;
            let Some(major) = candidate.major else {
                continue;
            };
            if is_acceptable_major(major, required) {
                info!("Using Java {} at {:?}", major, path);
                self.events
                    .log(format!("Using Java {} ({})", major, path.display()));
                return path;
            }
            debug!("Skipping Java {} at {:?} (need {})", major, path, required);
        }

        self.events.log(format!(
            "No Java {} found, falling back to system java",
            required
        ));
        PathBuf::from(JAVA_BIN)
    }

    /// Run `<path> -version` and read the reported major.
    pub async fn probe(&self, path: &Path) -> RuntimeCandidate {
        let major = match self
            .runner
            .run(path, &["-version".to_string()], None)
            .await
        {
            Ok(output) => parse_version_string(&output.combined())
                .as_deref()
                .and_then(parse_major_version),
            Err(e) => {
                debug!("Java probe failed for {:?}: {}", path, e);
                None
            }
        };
        RuntimeCandidate {
            path: path.to_path_buf(),
            major,
        }
    }
}
