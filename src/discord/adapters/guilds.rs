use crate::core::dispatch::{GuildDirectory, GuildStatus};
use async_trait::async_trait;
use dashmap::DashSet;
use poise::serenity_prelude as serenity;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Guild list backed by the serenity cache.
///
/// A guild counts as available once its full payload is in the cache.
/// Guilds from the Ready payload that have not arrived yet are reported as
/// pending.
pub struct CacheGuildDirectory {
    cache: Arc<serenity::Cache>,
    expected: Arc<DashSet<u64>>,
}

impl CacheGuildDirectory {
    pub fn new(cache: Arc<serenity::Cache>, expected: Arc<DashSet<u64>>) -> Self {
        Self { cache, expected }
    }

    fn status(&self, id: u64) -> GuildStatus {
        match self.cache.guild(serenity::GuildId::new(id)) {
            Some(guild) => GuildStatus {
                id,
                name: guild.name.clone(),
                available: true,
            },
            None => GuildStatus {
                id,
                name: String::new(),
                available: false,
            },
        }
    }
}

#[async_trait]
impl GuildDirectory for CacheGuildDirectory {
    async fn guilds(&self) -> Vec<GuildStatus> {
        let ids: BTreeSet<u64> = self
            .cache
            .guilds()
            .into_iter()
            .map(|id| id.get())
            .chain(self.expected.iter().map(|id| *id))
            .filter(|id| *id != 0)
            .collect();

        ids.into_iter().map(|id| self.status(id)).collect()
    }
}
