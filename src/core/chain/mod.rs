// Chains: the configured action lists behind commands and events, and the
// interpreter that walks them.

pub mod builtin_action;
pub mod chain_models;
pub mod interpreter;
pub mod template;

pub use chain_models::{
    Action, Chain, Command, Continuation, Event, GuildInfo, MemberInfo, MessageInfo, Subject,
    UserInfo,
};
pub use interpreter::{ActionHandler, ChainError, ChainTrace, StepContext};
