// Discord layer - translates serenity events into core dispatcher calls and
// implements the core's outbound ports on top of the serenity HTTP client.

#[path = "adapters/events.rs"]
pub mod events;

#[path = "adapters/gateway.rs"]
pub mod gateway;

#[path = "adapters/guilds.rs"]
pub mod guilds;

#[path = "adapters/lifecycle.rs"]
pub mod lifecycle;

use crate::core::context::BotContext;
use crate::core::dispatch::GuildInitScheduler;
use dashmap::DashSet;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Shared state handed to every poise callback.
pub struct Data {
    pub bot: Arc<BotContext>,
    /// Guild ids announced in the Ready payload, available or not.
    pub expected_guilds: Arc<DashSet<u64>>,
    /// Shared by Ready (fired again on every reconnect) and later joins.
    pub guild_init: Arc<GuildInitScheduler>,
}
