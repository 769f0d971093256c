use crate::core::users::{UserCache, UserStore};
use crate::core::variables::StoreError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryUserStore {
    flushes: AtomicUsize,
    last: Mutex<Option<UserCache>>,
}

impl InMemoryUserStore {
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn last_flushed(&self) -> Option<UserCache> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn load(&self) -> UserCache {
        UserCache::default()
    }

    async fn flush(&self, cache: &UserCache) -> Result<(), StoreError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(cache.clone());
        Ok(())
    }
}
