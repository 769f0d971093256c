// The core module contains the chain engine and everything it depends on.
// Nothing here knows about Discord; the platform is reached through the
// traits in `context`.

#[path = "chain/mod.rs"]
pub mod chain;

#[path = "config/settings.rs"]
pub mod config;

#[path = "context/bot_context.rs"]
pub mod context;

#[path = "control/control_message.rs"]
pub mod control;

#[path = "dispatch/mod.rs"]
pub mod dispatch;

#[path = "mods/mod.rs"]
pub mod mods;

#[path = "permissions/permission_gate.rs"]
pub mod permissions;

#[path = "users/user_cache.rs"]
pub mod users;

#[path = "variables/mod.rs"]
pub mod variables;

#[cfg(test)]
#[path = "test_support.rs"]
pub mod test_support;
