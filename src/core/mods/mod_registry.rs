// Mod registry - action handlers by name plus a listener bus.
//
// A mod can listen to platform events, handle chain actions, or both. The
// registry is filled once at startup from a compile-time manifest; every
// mod's `init` runs exactly once, before the bot connects. Action handlers
// are unique per name; any number of listeners may share an event name.

use crate::core::chain::ActionHandler;
use crate::core::config::DuplicatePolicy;
use crate::core::context::BotContext;
use crate::core::dispatch::event_dispatcher::PlatformEvent;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModError {
    #[error("{0}")]
    Failed(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("A mod named '{0}' is already registered")]
    Duplicate(String),

    #[error("Mod '{name}' failed to initialize: {source}")]
    Init {
        name: String,
        #[source]
        source: ModError,
    },
}

/// Receives platform events published under the mod's name.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, ctx: &BotContext, event: &PlatformEvent) -> Result<(), ModError>;
}

/// A plugin. Capabilities are exposed through `listener` and `action`;
/// the two are independent.
pub trait Mod: Send + Sync {
    fn name(&self) -> &str;

    /// One-time setup with the shared context.
    fn init(&self, _ctx: &BotContext) -> Result<(), ModError> {
        Ok(())
    }

    fn listener(&self) -> Option<&dyn EventListener> {
        None
    }

    fn action(&self) -> Option<&dyn ActionHandler> {
        None
    }

    fn is_event(&self) -> bool {
        self.listener().is_some()
    }

    fn is_response(&self) -> bool {
        self.action().is_some()
    }
}

pub struct ModRegistry {
    /// Action handlers by name. The duplicate policy applies here only.
    actions: DashMap<String, Arc<dyn Mod>>,
    /// Listener bus: every listener registered under an event name.
    listeners: DashMap<String, Vec<Arc<dyn Mod>>>,
    policy: DuplicatePolicy,
}

impl ModRegistry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            actions: DashMap::new(),
            listeners: DashMap::new(),
            policy,
        }
    }

    /// Initialize `module` and bind each of its capabilities: the action
    /// handler by name, the listener onto the bus for that name.
    pub fn register(&self, ctx: &BotContext, module: Arc<dyn Mod>) -> Result<(), RegistryError> {
        let name = module.name().to_string();

        if module.is_response()
            && self.policy == DuplicatePolicy::Reject
            && self.actions.contains_key(&name)
        {
            return Err(RegistryError::Duplicate(name));
        }

        // No map guard may be held here: init gets the whole context.
        module.init(ctx).map_err(|source| RegistryError::Init {
            name: name.clone(),
            source,
        })?;

        tracing::debug!(
            module = %name,
            is_event = module.is_event(),
            is_response = module.is_response(),
            "Registered mod"
        );

        if module.is_event() {
            self.listeners
                .entry(name.clone())
                .or_default()
                .push(Arc::clone(&module));
        }

        if module.is_response() {
            if self.actions.insert(name.clone(), module).is_some() {
                tracing::warn!("Mod '{name}' replaced an earlier action handler with the same name");
            }
        } else if !module.is_event() {
            tracing::warn!("Mod '{name}' has neither a listener nor an action handler");
        }
        Ok(())
    }

    /// Look up a mod that can run chain actions.
    pub fn resolve_action(&self, name: &str) -> Option<Arc<dyn Mod>> {
        self.actions.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Listeners bound to `event_name`, in registration order.
    pub fn listeners(&self, event_name: &str) -> Vec<Arc<dyn Mod>> {
        self.listeners
            .get(event_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Deliver a platform event to every listener bound to its bus name.
    /// A failing listener is logged and does not stop the others.
    pub async fn emit(&self, ctx: &BotContext, event: &PlatformEvent) {
        // Cloned out so no map guard is held across the awaits below.
        for module in self.listeners(event.bus_name()) {
            let Some(listener) = module.listener() else {
                continue;
            };
            if let Err(e) = listener.on_event(ctx, event).await {
                tracing::error!(
                    module = module.name(),
                    event = event.bus_name(),
                    "Listener failed: {e:?}"
                );
            }
        }
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.iter().map(|entry| entry.value().len()).sum()
    }
}
