// Entry points from the platform into the chain interpreter.

pub mod command_dispatcher;
pub mod event_dispatcher;
pub mod guild_init;

pub use command_dispatcher::handle_message;
pub use event_dispatcher::{dispatch, PlatformEvent};
pub use guild_init::{GuildDirectory, GuildInitScheduler, GuildStatus};
