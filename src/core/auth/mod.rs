// ─── Session & Dev Identity ───
// The backend issues Yggdrasil-style sessions; in development a numeric
// registration id stands in for the Telegram account and is remembered per
// username in `profile.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Upper bound (exclusive) for generated registration ids.
const DEV_ID_RANGE: u128 = 10_000_000;

/// The logged-in player. Lives in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevProfile {
    pub username: String,
    pub telegram_id: u64,
}

impl DevProfile {
    pub fn generate(username: &str) -> Self {
        let telegram_id = (uuid::Uuid::new_v4().as_u128() % DEV_ID_RANGE) as u64;
        Self {
            username: username.to_string(),
            telegram_id,
        }
    }
}

/// `<data_dir>/profile.json`
pub struct DevProfileStore {
    path: PathBuf,
}

impl DevProfileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("profile.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable profiles read as `None`.
    pub async fn load(&self) -> Option<DevProfile> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Ignoring corrupt {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub async fn save(&self, profile: &DevProfile) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let raw = serde_json::to_string_pretty(profile)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))
    }

    /// The saved profile when it belongs to `username`, else a freshly
    /// generated one that replaces it on disk. The flag is `true` when new.
    pub async fn identity_for(&self, username: &str) -> LauncherResult<(DevProfile, bool)> {
        if let Some(saved) = self.load().await {
            if saved.username == username {
                debug!("Reusing dev id {} for {}", saved.telegram_id, username);
                return Ok((saved, false));
            }
        }
        let fresh = DevProfile::generate(username);
        self.save(&fresh).await?;
        Ok((fresh, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_username_reuses_the_saved_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = DevProfileStore::new(dir.path());

        let (first, is_new) = store.identity_for("alice").await.unwrap();
        assert!(is_new);
        assert!(first.telegram_id < 10_000_000);

        let (again, is_new) = store.identity_for("alice").await.unwrap();
        assert!(!is_new);
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn another_username_replaces_the_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = DevProfileStore::new(dir.path());
        store
            .save(&DevProfile {
                username: "alice".into(),
                telegram_id: 42,
            })
            .await
            .unwrap();

        let (bob, is_new) = store.identity_for("bob").await.unwrap();
        assert!(is_new);
        assert_eq!(store.load().await.unwrap(), bob);
    }

    #[tokio::test]
    async fn corrupt_profile_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DevProfileStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().await.is_none());
    }
}
