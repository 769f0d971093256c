// In-memory variable store for tests. Remembers every flush so tests can
// check what would have been written.

use crate::core::variables::{StoreError, VariableStore, Variables};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryVariableStore {
    initial: Variables,
    flushes: AtomicUsize,
    last: Mutex<Option<Variables>>,
}

impl InMemoryVariableStore {
    #[allow(dead_code)]
    pub fn with_initial(initial: Variables) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn last_flushed(&self) -> Option<Variables> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl VariableStore for InMemoryVariableStore {
    async fn load(&self) -> Variables {
        self.initial.clone()
    }

    async fn flush(&self, variables: &Variables) -> Result<(), StoreError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(variables.clone());
        Ok(())
    }
}
