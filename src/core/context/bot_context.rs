// The shared bot context.
//
// Built once at startup and handed by reference to every dispatcher, chain
// step and mod. It owns the configuration, the mod registry and both
// variable scopes; nothing in the core reaches for global state.

use crate::core::chain::{Command, Event, MessageInfo};
use crate::core::config::{BotConfig, Settings};
use crate::core::dispatch::guild_init::LoadedGuilds;
use crate::core::mods::{Mod, ModRegistry};
use crate::core::users::{UserCache, UserStore};
use crate::core::variables::{VariableStore, Variables};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to send message to channel {channel_id}: {reason}")]
    Send { channel_id: u64, reason: String },
}

/// Outbound side of the chat platform, as far as actions need it.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<(), GatewayError>;
}

/// Anti-spam collaborator. Sees every non-automated message along with the
/// opaque rules from `Rules.json`.
#[async_trait]
pub trait SpamGuard: Send + Sync {
    async fn inspect(&self, message: &MessageInfo, rules: &serde_json::Value);
}

/// Default guard: records that a message passed through and nothing else.
pub struct TracingSpamGuard;

#[async_trait]
impl SpamGuard for TracingSpamGuard {
    async fn inspect(&self, message: &MessageInfo, _rules: &serde_json::Value) {
        tracing::trace!(
            author = message.author.id,
            channel = message.channel_id,
            "Message handed to spam guard"
        );
    }
}

/// External collaborators the context is wired with.
pub struct Ports {
    pub gateway: Arc<dyn ChatGateway>,
    pub spam_guard: Arc<dyn SpamGuard>,
    pub variables: Arc<dyn VariableStore>,
    pub users: Arc<dyn UserStore>,
}

pub struct BotContext {
    pub settings: Settings,
    pub rules: serde_json::Value,
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
    pub mods: ModRegistry,
    pub variables: Mutex<Variables>,
    pub users: Mutex<UserCache>,
    pub loaded_guilds: LoadedGuilds,
    pub gateway: Arc<dyn ChatGateway>,
    pub spam_guard: Arc<dyn SpamGuard>,
    variable_store: Arc<dyn VariableStore>,
    user_store: Arc<dyn UserStore>,
}

impl BotContext {
    /// Build the context and pull persisted state from the stores.
    pub async fn load(config: BotConfig, ports: Ports) -> Self {
        let variables = ports.variables.load().await;
        let users = ports.users.load().await;

        tracing::info!(
            commands = config.commands.len(),
            events = config.events.len(),
            server_vars = variables.server.keys().count(),
            global_vars = variables.global.keys().count(),
            "Bot context loaded"
        );

        Self {
            mods: ModRegistry::new(config.settings.duplicate_mods),
            settings: config.settings,
            rules: config.rules,
            commands: config.commands,
            events: config.events,
            variables: Mutex::new(variables),
            users: Mutex::new(users),
            loaded_guilds: LoadedGuilds::default(),
            gateway: ports.gateway,
            spam_guard: ports.spam_guard,
            variable_store: ports.variables,
            user_store: ports.users,
        }
    }

    /// Register every mod in `mods`, initializing each once. A mod that
    /// fails to register is logged and skipped. Returns how many succeeded.
    pub fn register_mods(&self, mods: Vec<Arc<dyn Mod>>) -> usize {
        let mut registered = 0;
        for module in mods {
            let name = module.name().to_string();
            match self.mods.register(self, module) {
                Ok(()) => registered += 1,
                Err(e) => tracing::error!(module = %name, "Loading mods: {e}"),
            }
        }
        tracing::info!(
            actions = self.mods.action_count(),
            listeners = self.mods.listener_count(),
            "Registered {registered} mods"
        );
        registered
    }

    /// Write the user cache and both variable scopes, then drop variable
    /// nodes nothing refers to any more. Failures are logged and otherwise
    /// ignored.
    pub async fn persist(&self) {
        {
            let users = self.users.lock().await;
            if let Err(e) = self.user_store.flush(&users).await {
                tracing::error!("Failed to write user cache: {e}");
            }
        }

        let mut variables = self.variables.lock().await;
        if let Err(e) = self.variable_store.flush(&variables).await {
            tracing::error!("Failed to write variables: {e}");
        }
        let dropped = variables.compact();
        if dropped > 0 {
            tracing::debug!(
                dropped,
                server_nodes = variables.server.node_count(),
                global_nodes = variables.global.node_count(),
                "Compacted variable graphs"
            );
        }
    }

    pub fn find_events<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |event| event.name == name)
    }
}
