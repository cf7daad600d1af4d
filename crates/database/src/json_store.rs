use crate::error::DbError;
use crate::store::{validate_name, SaveMode, SnapshotStore};
use async_trait::async_trait;
use core_types::TraderSnapshot;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const EXTENSION: &str = "json";

/// Keeps one pretty-printed JSON document per trader under a single directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-save never leaves a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// The directory is created lazily on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save(&self, snapshot: &TraderSnapshot, mode: SaveMode) -> Result<(), DbError> {
        validate_name(&snapshot.name)?;
        let path = self.path_for(&snapshot.name);

        if mode == SaveMode::CreateNew && fs::try_exists(&path).await? {
            return Err(DbError::AlreadyExists(snapshot.name.clone()));
        }

        fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.dir.join(format!(".{}.{}.tmp", snapshot.name, Uuid::new_v4()));
        fs::write(&staging, &body).await?;

        // Linking fails if the target exists, so a concurrent CreateNew loses cleanly.
        let placed = match mode {
            SaveMode::CreateNew => fs::hard_link(&staging, &path).await,
            SaveMode::Overwrite => fs::rename(&staging, &path).await,
        };
        let _ = fs::remove_file(&staging).await;
        if let Err(e) = placed {
            if e.kind() == ErrorKind::AlreadyExists {
                return Err(DbError::AlreadyExists(snapshot.name.clone()));
            }
            return Err(e.into());
        }

        tracing::debug!(name = %snapshot.name, path = %path.display(), positions = snapshot.positions.len(), "Snapshot written.");
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<TraderSnapshot, DbError> {
        validate_name(name)?;
        let path = self.path_for(name);
        let body = match fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DbError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: TraderSnapshot = serde_json::from_slice(&body)
            .map_err(|e| DbError::Corrupt(format!("{}: {}", path.display(), e)))?;
        if snapshot.name != name {
            return Err(DbError::Corrupt(format!(
                "{} holds the snapshot of '{}'",
                path.display(),
                snapshot.name
            )));
        }
        Ok(snapshot)
    }

    async fn exists(&self, name: &str) -> Result<bool, DbError> {
        validate_name(name)?;
        Ok(fs::try_exists(self.path_for(name)).await?)
    }

    async fn list_names(&self) -> Result<Vec<String>, DbError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<(), DbError> {
        validate_name(name)?;
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DbError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
