// Per-user profile cache, rewritten to disk after every command.

use crate::core::chain::UserInfo;
use crate::core::variables::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    #[serde(default)]
    pub command_count: u64,
    #[serde(default)]
    pub last_command_at: Option<DateTime<Utc>>,
    /// Free-form data mods may attach to a user.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// All known users keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserCache {
    users: BTreeMap<u64, UserRecord>,
}

impl UserCache {
    pub fn get(&self, user_id: u64) -> Option<&UserRecord> {
        self.users.get(&user_id)
    }

    #[allow(dead_code)]
    pub fn get_mut(&mut self, user_id: u64) -> Option<&mut UserRecord> {
        self.users.get_mut(&user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Note that `user` ran a command at `at`, keeping their name current.
    pub fn record_command(&mut self, user: &UserInfo, at: DateTime<Utc>) {
        let record = self.users.entry(user.id).or_default();
        record.name = user.name.clone();
        record.command_count = record.command_count.saturating_add(1);
        record.last_command_at = Some(at);
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load(&self) -> UserCache;
    async fn flush(&self, cache: &UserCache) -> Result<(), StoreError>;
}
