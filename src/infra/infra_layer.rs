// The infra module contains implementations of core traits.
// Each concern gets its own submodule.

#[path = "config/json_config.rs"]
pub mod config;

#[path = "users/mod.rs"]
pub mod users;

#[path = "variables/mod.rs"]
pub mod variables;
