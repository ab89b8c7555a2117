use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{info, warn};

use super::model::validate_instance_id;
use crate::core::error::{LauncherError, LauncherResult};

/// Local instance directories under `<data_dir>/instances/`.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    instances_dir: PathBuf,
}

impl InstanceStore {
    pub fn new(instances_dir: PathBuf) -> Self {
        Self { instances_dir }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.instances_dir
    }

    /// Directory of one instance. The id is validated before it becomes part
    /// of a path.
    pub fn instance_dir(&self, id: &str) -> LauncherResult<PathBuf> {
        validate_instance_id(id)?;
        Ok(self.instances_dir.join(id))
    }

    pub async fn ensure_instance_dir(&self, id: &str) -> LauncherResult<PathBuf> {
        let dir = self.instance_dir(id)?;
        create_dir_safe(&dir).await?;
        Ok(dir)
    }

    /// Names of every directory currently present.
    pub async fn list_local(&self) -> LauncherResult<Vec<String>> {
        let mut names = Vec::new();
        if !self.instances_dir.exists() {
            return Ok(names);
        }

        let mut entries = tokio::fs::read_dir(&self.instances_dir)
            .await
            .map_err(|e| LauncherError::io(&self.instances_dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LauncherError::io(&self.instances_dir, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete every local instance directory whose name is not in
    /// `active_ids`. A directory that cannot be removed is logged and skipped.
    /// Returns the names that were removed.
    pub async fn collect_garbage(&self, active_ids: &[String]) -> LauncherResult<Vec<String>> {
        create_dir_safe(&self.instances_dir).await?;
        let active: HashSet<&str> = active_ids.iter().map(String::as_str).collect();

        let mut removed = Vec::new();
        for name in self.list_local().await? {
            if active.contains(name.as_str()) {
                continue;
            }
            let path = self.instances_dir.join(&name);
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {
                    info!("Removed stale instance {}", name);
                    removed.push(name);
                }
                Err(e) => warn!("Could not remove stale instance {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }
}

async fn create_dir_safe(path: &std::path::Path) -> LauncherResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gc_removes_only_stale_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(dir.path().join("instances"));
        for id in ["keep-me", "old-pack", "other-old"] {
            let d = store.ensure_instance_dir(id).await.unwrap();
            std::fs::write(d.join("options.txt"), b"x").unwrap();
        }

        let removed = store
            .collect_garbage(&["keep-me".to_string(), "not-local".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, vec!["old-pack", "other-old"]);
        assert_eq!(store.list_local().await.unwrap(), vec!["keep-me"]);
        assert!(store.root().join("keep-me/options.txt").exists());
    }

    #[tokio::test]
    async fn gc_on_missing_root_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstanceStore::new(dir.path().join("instances"));
        assert!(store.collect_garbage(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn instance_dir_rejects_bad_ids() {
        let store = InstanceStore::new(PathBuf::from("/data/instances"));
        assert!(store.instance_dir("../home").is_err());
        assert_eq!(
            store.instance_dir("pack-1").unwrap(),
            PathBuf::from("/data/instances/pack-1")
        );
    }
}
