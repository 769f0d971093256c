// Action interpreter - walks a chain one step at a time.
//
// Each step is resolved to a mod (when the action's `type` names a
// registered action handler) or to the built-in handler. The handler runs
// the step and returns a `Continuation`; the interpreter never advances on
// its own. An index past the end of the chain is the normal way a chain
// finishes.

use super::builtin_action::BuiltinAction;
use super::chain_models::{Action, Chain, Continuation, Subject};
use crate::core::context::{BotContext, GatewayError};
use crate::core::variables::GraphError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Mod '{name}' failed: {reason}")]
    Mod { name: String, reason: String },

    #[error("Invalid parameters for action {index}: {source}")]
    InvalidParams {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Variable error: {0}")]
    Variable(#[from] GraphError),

    #[error("Chain '{chain}' exceeded {limit} steps")]
    StepLimit { chain: String, limit: usize },
}

/// Everything a handler gets to look at for one step.
pub struct StepContext<'a> {
    pub subject: &'a Subject,
    pub action: &'a Action,
    /// Arguments shared by every step of this chain run.
    pub args: &'a mut Vec<String>,
    pub chain: &'a Chain,
    pub index: usize,
}

impl StepContext<'_> {
    /// Parse this step's parameters, tagging failures with the step index.
    pub fn params<T: serde::de::DeserializeOwned>(&self) -> Result<T, ChainError> {
        self.action
            .params_as()
            .map_err(|source| ChainError::InvalidParams {
                index: self.index,
                source,
            })
    }
}

/// Runs a single chain step and decides how the chain continues.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &BotContext,
        step: StepContext<'_>,
    ) -> Result<Continuation, ChainError>;
}

/// Position and accumulated arguments of a chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainState {
    pub index: usize,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Terminated,
}

/// What a finished chain run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainTrace {
    /// Indices in the order they were executed.
    pub executed: Vec<usize>,
    pub args: Vec<String>,
}

/// Execute the step at `state.index` and report where the chain goes next.
pub async fn advance(
    ctx: &BotContext,
    chain: &Chain,
    subject: &Subject,
    state: &mut ChainState,
) -> Result<Advance, ChainError> {
    let index = state.index;
    let Some(action) = chain.actions.get(index) else {
        return Ok(Advance::Terminated);
    };

    let step = StepContext {
        subject,
        action,
        args: &mut state.args,
        chain,
        index,
    };

    let module = action
        .kind
        .as_deref()
        .and_then(|name| ctx.mods.resolve_action(name));

    let continuation = match module.as_ref().and_then(|m| m.action()) {
        Some(handler) => {
            tracing::debug!(chain = %chain.name, index, handler = ?action.kind, "Running mod action");
            handler.handle(ctx, step).await?
        }
        None => {
            if let Some(kind) = &action.kind {
                tracing::debug!(
                    chain = %chain.name,
                    index,
                    "No mod named '{kind}', using the built-in handler"
                );
            }
            BuiltinAction.handle(ctx, step).await?
        }
    };

    Ok(match continuation {
        Continuation::Next => Advance::Next(index + 1),
        Continuation::Goto(target) => Advance::Next(target),
        Continuation::Stop => Advance::Terminated,
    })
}

/// Run `chain` from `start` until a handler stops it or it runs off the end.
pub async fn run(
    ctx: &BotContext,
    chain: &Chain,
    subject: &Subject,
    args: Vec<String>,
    start: usize,
) -> Result<ChainTrace, ChainError> {
    let limit = ctx.settings.max_chain_steps;
    let mut state = ChainState { index: start, args };
    let mut executed = Vec::new();

    while state.index < chain.actions.len() {
        if executed.len() >= limit {
            return Err(ChainError::StepLimit {
                chain: chain.name.clone(),
                limit,
            });
        }
        executed.push(state.index);

        match advance(ctx, chain, subject, &mut state).await? {
            Advance::Next(index) => state.index = index,
            Advance::Terminated => break,
        }
    }

    Ok(ChainTrace {
        executed,
        args: state.args,
    })
}
