use crate::core::users::{UserCache, UserStore};
use crate::core::variables::StoreError;
use async_trait::async_trait;
use std::path::PathBuf;

pub struct JsonUserStore {
    path: PathBuf,
}

impl JsonUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UserStore for JsonUserStore {
    async fn load(&self) -> UserCache {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), "No user cache loaded: {e}");
                return UserCache::default();
            }
        };
        serde_json::from_reader(std::io::BufReader::new(file)).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), "Corrupt user cache, starting empty: {e}");
            UserCache::default()
        })
    }

    async fn flush(&self, cache: &UserCache) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, cache)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::UserInfo;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_user_cache_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let store = JsonUserStore::new(dir.path().join("user/user.json"));

        let mut cache = store.load().await;
        assert_eq!(cache.len(), 0);

        let user = UserInfo {
            id: 42,
            name: "alice".into(),
            bot: false,
        };
        cache.record_command(&user, chrono::Utc::now());
        cache.record_command(&user, chrono::Utc::now());
        store.flush(&cache).await.unwrap();

        let loaded = store.load().await;
        let record = loaded.get(42).unwrap();
        assert_eq!(record.name, "alice");
        assert_eq!(record.command_count, 2);
    }
}
