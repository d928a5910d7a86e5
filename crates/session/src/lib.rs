//! Session persistence (spec.md §4.7 "persist session", §6) — one JSON file
//! per session, written with the atomic write-temp-then-rename discipline so
//! a crash mid-save never corrupts the last good snapshot.

use std::path::{Path, PathBuf};

use aiq_core::{Session, SessionStore};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("session_{id}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    /// Write `session` to a `.tmp` sibling, fsync, then rename over the
    /// final path. The `.tmp` file is removed on any error along the way.
    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let final_path = self.path_for(session.id);
        let tmp_path = final_path.with_extension("json.tmp");

        let write_result: anyhow::Result<()> = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .await?;
            let encoded = serde_json::to_vec_pretty(session)?;
            file.write_all(&encoded).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;

        if let Err(err) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        tracing::debug!(session = %session.id, path = %final_path.display(), "session saved");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> anyhow::Result<Session> {
        let path = self.path_for(id);
        let raw = tokio::fs::read_to_string(&path).await?;
        let session: Session = serde_json::from_str(&raw).map_err(|err| {
            tracing::warn!(session = %id, path = %path.display(), error = %err, "session file corrupt");
            anyhow::anyhow!("corrupt session file at {}: {err}", path.display())
        })?;
        Ok(session)
    }
}
