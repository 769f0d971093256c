// The built-in handler for actions without a (resolvable) mod.
//
// Recognised parameters, applied in this order:
//   set:     { scope, key, value }  store a value (strings are templated)
//   message: "text"                 send templated text
//   channel: 123                    target channel (defaults to the subject's)
//   stop:    true                   end the chain after this step
//   goto:    N                      continue at index N instead of the next one
//
// Unknown parameters are ignored, so mod-typed actions whose mod is missing
// still run whatever built-in behavior their parameters describe.

use super::chain_models::Continuation;
use super::interpreter::{ActionHandler, ChainError, StepContext};
use super::template;
use crate::core::context::BotContext;
use crate::core::variables::Scope;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct BuiltinParams {
    #[serde(default)]
    set: Option<SetVariable>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    channel: Option<u64>,
    #[serde(default)]
    stop: bool,
    #[serde(default)]
    goto: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SetVariable {
    scope: Scope,
    key: String,
    value: serde_json::Value,
}

pub struct BuiltinAction;

#[async_trait]
impl ActionHandler for BuiltinAction {
    async fn handle(
        &self,
        ctx: &BotContext,
        step: StepContext<'_>,
    ) -> Result<Continuation, ChainError> {
        let params: BuiltinParams = step.params()?;

        if let Some(set) = &params.set {
            let mut vars = ctx.variables.lock().await;
            let value = match &set.value {
                serde_json::Value::String(text) => serde_json::Value::String(template::render(
                    text,
                    step.subject,
                    &step.args[..],
                    &vars,
                )),
                other => other.clone(),
            };
            let graph = vars.scope_mut(set.scope);
            let stored = graph.import_json(&value);
            graph.set(set.key.clone(), stored)?;
        }

        if let Some(text) = &params.message {
            let rendered = {
                let vars = ctx.variables.lock().await;
                template::render(text, step.subject, &step.args[..], &vars)
            };
            match params.channel.or_else(|| step.subject.channel_id()) {
                Some(channel_id) => ctx.gateway.send_message(channel_id, &rendered).await?,
                None => tracing::debug!(
                    chain = %step.chain.name,
                    index = step.index,
                    "Message action has no channel to send to"
                ),
            }
        }

        Ok(if params.stop {
            Continuation::Stop
        } else if let Some(target) = params.goto {
            Continuation::Goto(target)
        } else {
            Continuation::Next
        })
    }
}
