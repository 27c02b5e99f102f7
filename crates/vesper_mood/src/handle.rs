use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use vesper_core::{MoodState, MoodStore};

/// Process-wide owner of the mood record.
///
/// The responder and the silence monitor run as separate tasks; both go
/// through `update`, which holds the lock across modify and persist.
pub struct MoodHandle {
    state: Mutex<MoodState>,
    store: Arc<dyn MoodStore>,
}

impl MoodHandle {
    /// Load the persisted record and take ownership of it.
    pub async fn open(store: Arc<dyn MoodStore>) -> Result<Self> {
        let state = store.load().await?;
        tracing::debug!(mode = %state.mode, tier = ?state.silence_tier, "Mood loaded");
        Ok(Self {
            state: Mutex::new(state),
            store,
        })
    }

    pub async fn snapshot(&self) -> MoodState {
        self.state.lock().await.clone()
    }

    /// Apply `f` and persist the result.
    ///
    /// The change is committed in memory only once the write succeeds. On a
    /// failed write the record is left as it was, so the caller can retry
    /// the same transition later.
    pub async fn update<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut MoodState) -> T,
    {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next);
        self.store.save(&next).await?;
        *guard = next;
        Ok(out)
    }
}
