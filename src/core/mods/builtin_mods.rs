// Mods shipped with the bot.
//
// `manifest()` is the compile-time list the registry loads at startup. To
// add a mod, implement `Mod` (plus `ActionHandler` and/or `EventListener`)
// and append it here.

use super::mod_registry::{EventListener, Mod, ModError};
use crate::core::chain::{ActionHandler, ChainError, Continuation, StepContext};
use crate::core::context::BotContext;
use crate::core::dispatch::PlatformEvent;
use crate::core::variables::{Scope, VarGraph, VarValue};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub fn manifest() -> Vec<Arc<dyn Mod>> {
    vec![
        Arc::new(IfVarMod),
        Arc::new(IncrementVarMod),
        Arc::new(WaitMod),
        Arc::new(RandomPickMod),
        Arc::new(JoinLoggerMod),
    ]
}

fn mod_failure(name: &str, reason: impl Into<String>) -> ChainError {
    ChainError::Mod {
        name: name.to_string(),
        reason: reason.into(),
    }
}

// ============================================================================
// if-var: continue when a variable equals a value, otherwise branch or stop
// ============================================================================

#[derive(Debug, Deserialize)]
struct IfVarParams {
    scope: Scope,
    key: String,
    equals: serde_json::Value,
    /// Index to jump to when the comparison fails. Stops the chain if absent.
    #[serde(default, rename = "else")]
    otherwise: Option<usize>,
}

pub struct IfVarMod;

impl Mod for IfVarMod {
    fn name(&self) -> &str {
        "if-var"
    }

    fn action(&self) -> Option<&dyn ActionHandler> {
        Some(self)
    }
}

#[async_trait]
impl ActionHandler for IfVarMod {
    async fn handle(
        &self,
        ctx: &BotContext,
        step: StepContext<'_>,
    ) -> Result<Continuation, ChainError> {
        let params: IfVarParams = step.params()?;

        let matches = {
            let vars = ctx.variables.lock().await;
            let graph = vars.scope(params.scope);
            let mut scratch = VarGraph::new();
            let expected = scratch.import_json(&params.equals);
            let actual = graph.get(&params.key).cloned().unwrap_or(VarValue::Null);
            graph.to_json(&actual) == scratch.to_json(&expected)
        };

        Ok(match (matches, params.otherwise) {
            (true, _) => Continuation::Next,
            (false, Some(target)) => Continuation::Goto(target),
            (false, None) => Continuation::Stop,
        })
    }
}

// ============================================================================
// increment-var: add to a numeric variable (missing counts as zero)
// ============================================================================

#[derive(Debug, Deserialize)]
struct IncrementParams {
    scope: Scope,
    key: String,
    #[serde(default = "one")]
    by: f64,
}

fn one() -> f64 {
    1.0
}

pub struct IncrementVarMod;

impl Mod for IncrementVarMod {
    fn name(&self) -> &str {
        "increment-var"
    }

    fn action(&self) -> Option<&dyn ActionHandler> {
        Some(self)
    }
}

#[async_trait]
impl ActionHandler for IncrementVarMod {
    async fn handle(
        &self,
        ctx: &BotContext,
        step: StepContext<'_>,
    ) -> Result<Continuation, ChainError> {
        let params: IncrementParams = step.params()?;

        let mut vars = ctx.variables.lock().await;
        let graph = vars.scope_mut(params.scope);
        let current = match graph.get(&params.key) {
            None | Some(VarValue::Null) => 0.0,
            Some(VarValue::Number(n)) => *n,
            Some(other) => {
                return Err(mod_failure(
                    self.name(),
                    format!("'{}' is not a number: {other:?}", params.key),
                ))
            }
        };
        graph.set(params.key, VarValue::Number(current + params.by))?;
        Ok(Continuation::Next)
    }
}

// ============================================================================
// wait: pause the chain
// ============================================================================

#[derive(Debug, Deserialize)]
struct WaitParams {
    ms: u64,
}

pub struct WaitMod;

impl Mod for WaitMod {
    fn name(&self) -> &str {
        "wait"
    }

    fn action(&self) -> Option<&dyn ActionHandler> {
        Some(self)
    }
}

#[async_trait]
impl ActionHandler for WaitMod {
    async fn handle(
        &self,
        _ctx: &BotContext,
        step: StepContext<'_>,
    ) -> Result<Continuation, ChainError> {
        let params: WaitParams = step.params()?;
        tokio::time::sleep(Duration::from_millis(params.ms)).await;
        Ok(Continuation::Next)
    }
}

// ============================================================================
// random-pick: store one of several choices in a variable
// ============================================================================

#[derive(Debug, Deserialize)]
struct RandomPickParams {
    choices: Vec<String>,
    scope: Scope,
    key: String,
}

pub struct RandomPickMod;

impl Mod for RandomPickMod {
    fn name(&self) -> &str {
        "random-pick"
    }

    fn action(&self) -> Option<&dyn ActionHandler> {
        Some(self)
    }
}

#[async_trait]
impl ActionHandler for RandomPickMod {
    async fn handle(
        &self,
        ctx: &BotContext,
        step: StepContext<'_>,
    ) -> Result<Continuation, ChainError> {
        let params: RandomPickParams = step.params()?;

        // ThreadRng is not Send; keep it out of the await below.
        let choice = {
            let mut rng = rand::thread_rng();
            params.choices.choose(&mut rng).cloned()
        };
        let choice = choice.ok_or_else(|| mod_failure(self.name(), "no choices given"))?;

        let mut vars = ctx.variables.lock().await;
        vars.scope_mut(params.scope)
            .set(params.key, VarValue::Text(choice))?;
        Ok(Continuation::Next)
    }
}

// ============================================================================
// guildMemberAdd: log joins
// ============================================================================

pub struct JoinLoggerMod;

impl Mod for JoinLoggerMod {
    fn name(&self) -> &str {
        "guildMemberAdd"
    }

    fn listener(&self) -> Option<&dyn EventListener> {
        Some(self)
    }
}

#[async_trait]
impl EventListener for JoinLoggerMod {
    async fn on_event(&self, _ctx: &BotContext, event: &PlatformEvent) -> Result<(), ModError> {
        if let PlatformEvent::MemberJoined(member) = event {
            tracing::info!(
                guild_id = member.guild_id,
                user_id = member.user.id,
                user = %member.user.name,
                "Member joined"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::interpreter::run;
    use crate::core::chain::Chain;
    use crate::core::test_support::{message_subject, TestBot};
    use serde_json::json;

    async fn bot_with_manifest() -> TestBot {
        let bot = TestBot::new().build().await;
        assert_eq!(bot.ctx.register_mods(manifest()), 5);
        bot
    }

    fn chain(actions: serde_json::Value) -> Chain {
        serde_json::from_value(json!({ "name": "mods", "actions": actions })).unwrap()
    }

    #[tokio::test]
    async fn test_manifest_capabilities() {
        let bot = bot_with_manifest().await;
        for name in ["if-var", "increment-var", "wait", "random-pick"] {
            assert!(bot.ctx.mods.resolve_action(name).is_some(), "{name}");
        }
        let listeners = bot.ctx.mods.listeners("guildMemberAdd");
        assert_eq!(listeners.len(), 1);
        assert!(!listeners[0].is_response());
    }

    #[tokio::test]
    async fn test_increment_then_branch_on_value() {
        let bot = bot_with_manifest().await;
        let chain = chain(json!([
            { "type": "increment-var", "scope": "server", "key": "hits" },
            { "type": "increment-var", "scope": "server", "key": "hits", "by": 2 },
            { "type": "if-var", "scope": "server", "key": "hits", "equals": 3, "else": 4 },
            { "message": "three", "stop": true },
            { "message": "not three" }
        ]));

        run(&bot.ctx, &chain, &message_subject("!hit", &[]), vec![], 0)
            .await
            .unwrap();

        assert_eq!(bot.gateway.sent(), vec![(10, "three".to_string())]);
    }

    #[tokio::test]
    async fn test_if_var_without_else_stops() {
        let bot = bot_with_manifest().await;
        let chain = chain(json!([
            { "type": "if-var", "scope": "global", "key": "open", "equals": true },
            { "message": "welcome" }
        ]));

        let trace = run(&bot.ctx, &chain, &message_subject("!enter", &[]), vec![], 0)
            .await
            .unwrap();

        assert_eq!(trace.executed, vec![0]);
        assert!(bot.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_increment_rejects_text() {
        let bot = bot_with_manifest().await;
        bot.ctx
            .variables
            .lock()
            .await
            .server
            .set("hits", VarValue::Text("many".into()))
            .unwrap();

        let chain = chain(json!([{ "type": "increment-var", "scope": "server", "key": "hits" }]));
        let result = run(&bot.ctx, &chain, &message_subject("!hit", &[]), vec![], 0).await;
        assert!(matches!(result, Err(ChainError::Mod { .. })));
    }

    #[tokio::test]
    async fn test_random_pick_stores_a_choice() {
        let bot = bot_with_manifest().await;
        let chain = chain(json!([
            { "type": "random-pick", "choices": ["heads", "tails"], "scope": "global", "key": "coin" },
            { "type": "wait", "ms": 1 },
            { "message": "$global[coin]" }
        ]));

        run(&bot.ctx, &chain, &message_subject("!flip", &[]), vec![], 0)
            .await
            .unwrap();

        let sent = bot.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1 == "heads" || sent[0].1 == "tails");
    }
}
