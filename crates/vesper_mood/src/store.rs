use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use vesper_core::{MoodState, MoodStore};

/// Mood state as one flat JSON object in a single file.
///
/// Every save rewrites the whole file; there are no partial updates.
#[derive(Debug, Clone)]
pub struct FileMoodStore {
    path: PathBuf,
}

impl FileMoodStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MoodStore for FileMoodStore {
    async fn load(&self) -> Result<MoodState> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::info!("No mood file at {}, starting fresh", self.path.display());
            return Ok(MoodState::default());
        }
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read mood file: {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(MoodState::default());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse mood file: {}", self.path.display()))
    }

    async fn save(&self, state: &MoodState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("Failed to serialize mood")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write-then-rename: readers never see half a file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write mood file: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace mood file: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vesper_core::{Mode, SilenceTier};

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileMoodStore::new(dir.path().join("mood.json"));
        let state = store.load().await.unwrap();
        assert_eq!(state, MoodState::default());
    }

    #[tokio::test]
    async fn test_save_then_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileMoodStore::new(dir.path().join("nested").join("mood.json"));
        let state = MoodState {
            mode: Mode::Devotion,
            last_interaction: Some(Utc::now()),
            silence_tier: SilenceTier::Tier12,
        };
        store.save(&state).await.unwrap();

        // A new store over the same file sees the same record (restart)
        let reopened = FileMoodStore::new(store.path());
        assert_eq!(reopened.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mood.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(FileMoodStore::new(&path).load().await.is_err());
    }
}
