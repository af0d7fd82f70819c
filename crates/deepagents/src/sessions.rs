//! File-backed session persistence.
//!
//! Each session is stored as pretty-printed JSON at `<dir>/<id>.json`;
//! the default directory is `~/.deepagents/sessions`.

use async_trait::async_trait;
use deepagents_core::session::{Session, SessionId, SessionStore, SessionSummary};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub use deepagents_core::session::InMemorySessionStore;

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under `~/.deepagents/sessions`.
    pub fn from_home() -> anyhow::Result<Self> {
        let home = directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(Self::new(home.join(".deepagents").join("sessions")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> anyhow::Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            anyhow::bail!("Invalid session id '{id}'");
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn read_all(&self) -> anyhow::Result<Vec<Session>> {
        let mut reader = match tokio::fs::read_dir(&self.dir).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_session(&path).await {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable session file");
                }
            }
        }
        Ok(sessions)
    }
}

async fn read_session(path: &Path) -> anyhow::Result<Session> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        let path = self.path_for(&session.id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so a crash never leaves a truncated session behind.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(session)?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(session_id = %session.id, path = %path.display(), "Saved session");
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> anyhow::Result<Option<Session>> {
        let path = self.path_for(id)?;
        match read_session(&path).await {
            Ok(session) => Ok(Some(session)),
            Err(err)
                if err
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|e| e.kind() == ErrorKind::NotFound) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn latest(&self) -> anyhow::Result<Option<Session>> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .max_by_key(|s| s.updated_at))
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let mut summaries: Vec<_> = self.read_all().await?.iter().map(Session::summary).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}
