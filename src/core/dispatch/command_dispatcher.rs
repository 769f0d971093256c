// Command dispatcher - turns chat messages into command chain runs.
//
// Every non-automated message fires "Any Message" and passes through the
// spam guard. Messages starting with the prefix are split into a command
// name and arguments, matched against the configured commands, checked
// against the permission gate and run from index 0. Only authorized
// invocations count towards the user's profile. State is flushed once per
// prefixed message, after all matching chains have finished.

use super::event_dispatcher::{self, ANY_MESSAGE};
use crate::core::chain::interpreter;
use crate::core::chain::{ChainTrace, MessageInfo, Subject};
use crate::core::context::BotContext;
use crate::core::permissions::authorize;

#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Authored by a bot; nothing ran.
    IgnoredBot,
    /// No prefix; only "Any Message" and the spam guard saw it.
    Chatter,
    /// Prefixed message. `runs` holds one trace per authorized command chain
    /// that completed; `denied` counts matches the gate refused.
    Command {
        name: String,
        runs: Vec<ChainTrace>,
        denied: usize,
    },
}

/// Split `content` into a command name and its arguments, or `None` when it
/// does not start with `prefix`.
pub fn parse_invocation(content: &str, prefix: &str) -> Option<(String, Vec<String>)> {
    let rest = content.strip_prefix(prefix)?;
    let mut parts = rest.trim().split(' ').filter(|part| !part.is_empty());
    let name = parts.next().unwrap_or_default().to_string();
    let args = parts.map(str::to_string).collect();
    Some((name, args))
}

pub async fn handle_message(ctx: &BotContext, message: &MessageInfo) -> MessageOutcome {
    if message.author.bot {
        return MessageOutcome::IgnoredBot;
    }

    let subject = Subject::Message(message.clone());
    event_dispatcher::run_event(ctx, ANY_MESSAGE, &subject).await;
    ctx.spam_guard.inspect(message, &ctx.rules).await;

    let Some((name, args)) = parse_invocation(&message.content, &ctx.settings.prefix) else {
        return MessageOutcome::Chatter;
    };

    let mut runs = Vec::new();
    let mut denied = 0;
    let mut authorized = false;

    for command in ctx.commands.iter().filter(|c| c.chain.name == name) {
        if !authorize(command, &message.role_names) {
            tracing::debug!(command = %name, user = message.author.id, "Permission denied");
            denied += 1;
            continue;
        }
        authorized = true;
        if command.chain.actions.is_empty() {
            continue;
        }

        match interpreter::run(ctx, &command.chain, &subject, args.clone(), 0).await {
            Ok(trace) => runs.push(trace),
            Err(e) => tracing::error!(
                command = %name,
                content = %message.content,
                "Check Message: [{}] {e:?}",
                message.content
            ),
        }
    }

    if authorized {
        ctx.users
            .lock()
            .await
            .record_command(&message.author, chrono::Utc::now());
    }

    ctx.persist().await;

    MessageOutcome::Command { name, runs, denied }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{message, TestBot};
    use crate::core::variables::VarValue;
    use serde_json::json;

    #[test]
    fn test_parse_invocation() {
        assert_eq!(
            parse_invocation("!ban  @user   spamming", "!"),
            Some((
                "ban".to_string(),
                vec!["@user".to_string(), "spamming".to_string()]
            ))
        );
        assert_eq!(parse_invocation("!ping", "!"), Some(("ping".to_string(), vec![])));
        assert_eq!(parse_invocation("! ping", "!"), Some(("ping".to_string(), vec![])));
        assert_eq!(parse_invocation("!", "!"), Some((String::new(), vec![])));
        assert_eq!(parse_invocation("ping", "!"), None);
    }

    #[tokio::test]
    async fn test_ping_runs_builtin_at_index_zero() {
        let bot = TestBot::new()
            .commands(json!([
                { "name": "ping", "perms": [], "actions": [ { "message": "pong" } ] }
            ]))
            .build()
            .await;

        let outcome = handle_message(&bot.ctx, &message("!ping", &[])).await;

        match outcome {
            MessageOutcome::Command { name, runs, denied } => {
                assert_eq!(name, "ping");
                assert_eq!(denied, 0);
                assert_eq!(runs.len(), 1);
                assert_eq!(runs[0].executed, vec![0]);
                assert!(runs[0].args.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(bot.gateway.sent(), vec![(10, "pong".to_string())]);
    }

    #[tokio::test]
    async fn test_unauthorized_kick_never_runs() {
        let bot = TestBot::new()
            .commands(json!([
                { "name": "kick", "perms": ["moderator"], "actions": [
                    { "set": { "scope": "server", "key": "kicked", "value": "$args[0]" } },
                    { "message": "kicked $args[0]" }
                ]}
            ]))
            .build()
            .await;

        let outcome = handle_message(&bot.ctx, &message("!kick someone", &["member"])).await;

        assert_eq!(
            outcome,
            MessageOutcome::Command {
                name: "kick".into(),
                runs: vec![],
                denied: 1,
            }
        );
        assert!(bot.gateway.sent().is_empty());
        assert!(bot.ctx.variables.lock().await.server.is_empty());

        let users = bot.users.last_flushed().unwrap();
        assert!(users.get(1).is_none());
    }

    #[tokio::test]
    async fn test_authorized_role_runs_with_args() {
        let bot = TestBot::new()
            .commands(json!([
                { "name": "kick", "perms": ["Moderator"], "actions": [
                    { "set": { "scope": "server", "key": "kicked", "value": "$args[0]" } }
                ]}
            ]))
            .build()
            .await;

        handle_message(&bot.ctx, &message("!kick someone", &["moderator"])).await;

        let vars = bot.ctx.variables.lock().await;
        assert_eq!(
            vars.server.get("kicked"),
            Some(&VarValue::Text("someone".into()))
        );
    }

    #[tokio::test]
    async fn test_bot_messages_are_ignored() {
        let bot = TestBot::new()
            .commands(json!([{ "name": "ping", "actions": [ { "message": "pong" } ] }]))
            .events(json!([{ "name": "Any Message", "actions": [ { "message": "seen" } ] }]))
            .build()
            .await;

        let mut msg = message("!ping", &[]);
        msg.author.bot = true;

        assert_eq!(handle_message(&bot.ctx, &msg).await, MessageOutcome::IgnoredBot);
        assert!(bot.gateway.sent().is_empty());
        assert_eq!(bot.spam.inspected(), 0);
        assert_eq!(bot.variables.flushes(), 0);
    }

    #[tokio::test]
    async fn test_any_message_and_spam_guard_see_plain_chatter() {
        let bot = TestBot::new()
            .events(json!([{ "name": "Any Message", "actions": [ { "message": "seen $user" } ] }]))
            .build()
            .await;

        let outcome = handle_message(&bot.ctx, &message("hello there", &[])).await;

        assert_eq!(outcome, MessageOutcome::Chatter);
        assert_eq!(bot.gateway.sent(), vec![(10, "seen tester".to_string())]);
        assert_eq!(bot.spam.inspected(), 1);
        assert_eq!(bot.variables.flushes(), 0);
    }

    #[tokio::test]
    async fn test_flush_once_per_prefixed_message() {
        let bot = TestBot::new()
            .commands(json!([
                { "name": "a", "actions": [ {} ] },
                { "name": "b", "actions": [ {} ] },
                { "name": "c", "actions": [ {} ] }
            ]))
            .build()
            .await;

        handle_message(&bot.ctx, &message("!a", &[])).await;
        assert_eq!(bot.variables.flushes(), 1);
        assert_eq!(bot.users.flushes(), 1);

        handle_message(&bot.ctx, &message("!unknown", &[])).await;
        assert_eq!(bot.variables.flushes(), 2);
    }

    #[tokio::test]
    async fn test_flushed_state_includes_chain_mutations() {
        let bot = TestBot::new()
            .commands(json!([
                { "name": "remember", "actions": [
                    { "set": { "scope": "global", "key": "note", "value": "$args" } }
                ]}
            ]))
            .build()
            .await;

        handle_message(&bot.ctx, &message("!remember buy milk", &[])).await;

        let saved = bot.variables.last_flushed().unwrap();
        assert_eq!(
            saved.global.get("note"),
            Some(&VarValue::Text("buy milk".into()))
        );
        let users = bot.users.last_flushed().unwrap();
        assert_eq!(users.get(1).map(|u| u.command_count), Some(1));
    }

    #[tokio::test]
    async fn test_command_with_no_actions_is_matched_but_idle() {
        let bot = TestBot::new()
            .commands(json!([{ "name": "empty", "actions": [] }]))
            .build()
            .await;

        let outcome = handle_message(&bot.ctx, &message("!empty", &[])).await;
        assert_eq!(
            outcome,
            MessageOutcome::Command {
                name: "empty".into(),
                runs: vec![],
                denied: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_failing_chain_does_not_block_flush() {
        let bot = TestBot::new()
            .commands(json!([{ "name": "bad", "actions": [ { "stop": "yes" } ] }]))
            .build()
            .await;

        let outcome = handle_message(&bot.ctx, &message("!bad", &[])).await;
        assert!(matches!(outcome, MessageOutcome::Command { ref runs, .. } if runs.is_empty()));
        assert_eq!(bot.variables.flushes(), 1);
    }

    #[tokio::test]
    async fn test_write_failures_do_not_abort_the_command() {
        let bot = TestBot::new()
            .commands(json!([{ "name": "ping", "actions": [ { "message": "pong" } ] }]))
            .failing_stores()
            .build()
            .await;

        let outcome = handle_message(&bot.ctx, &message("!ping", &[])).await;
        assert!(matches!(outcome, MessageOutcome::Command { ref runs, .. } if runs.len() == 1));

        handle_message(&bot.ctx, &message("!ping", &[])).await;

        assert_eq!(
            bot.gateway.sent(),
            vec![(10, "pong".to_string()), (10, "pong".to_string())]
        );
        // Users and variables were both attempted on each message.
        assert_eq!(bot.failing.attempts(), 4);
        assert_eq!(bot.ctx.users.lock().await.get(1).map(|u| u.command_count), Some(2));
    }

    #[tokio::test]
    async fn test_repeated_sets_do_not_grow_the_arena() {
        let bot = TestBot::new()
            .commands(json!([
                { "name": "profile", "actions": [
                    { "set": { "scope": "server", "key": "profile",
                               "value": { "name": "$args[0]", "tags": ["a", "b"] } } }
                ]}
            ]))
            .build()
            .await;

        for _ in 0..50 {
            handle_message(&bot.ctx, &message("!profile ada", &[])).await;
        }

        let vars = bot.ctx.variables.lock().await;
        assert_eq!(vars.server.node_count(), 2);
        assert!(vars.server.get("profile").is_some());
    }
}
