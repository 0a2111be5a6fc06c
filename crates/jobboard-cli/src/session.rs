//! Session persistence on disk.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use async_trait::async_trait;
use directories::ProjectDirs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use jobboard_supabase::{Session, SessionPersistence, SupabaseError, SupabaseResult};

const SESSION_FILE: &str = "session.json";

/// Default session file location, overridable with `JOBBOARD_SESSION_FILE`.
pub fn default_session_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("JOBBOARD_SESSION_FILE") {
        return Ok(PathBuf::from(path));
    }
    let dirs = ProjectDirs::from("com", "jobboard", "jobboard").ok_or(anyhow!("Failed to get project dirs"))?;
    Ok(dirs.data_dir().join(SESSION_FILE))
}

/// Stores the session as JSON in a single user-only file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> SupabaseError {
    SupabaseError::storage(format!("failed to {} {}: {}", action, path.display(), err))
}

#[async_trait]
impl SessionPersistence for FileSessionStore {
    async fn load(&self) -> SupabaseResult<Option<Session>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("read", &self.path, e)),
        };

        // A corrupt file is treated as signed out
        match serde_json::from_slice(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                debug!(path = %self.path.display(), "Ignoring unreadable session file: {}", e);
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> SupabaseResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create", parent, e))?;
        }

        let body = serde_json::to_vec_pretty(session)?;
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| storage_error("open", &self.path, e))?;

        // A file that already existed keeps its old mode on open
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| storage_error("restrict", &self.path, e))?;
        }

        file.write_all(&body)
            .await
            .map_err(|e| storage_error("write", &self.path, e))?;
        file.flush()
            .await
            .map_err(|e| storage_error("write", &self.path, e))?;
        Ok(())
    }

    async fn clear(&self) -> SupabaseResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &self.path, e)),
        }
    }
}
