// Chain domain models - commands, events, actions and the subjects they run over.
//
// These are loaded once from configuration and never mutated afterwards.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One configured step in a chain.
///
/// `type` picks a mod by name; everything else is kept as raw parameters for
/// whichever handler ends up running the step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl Action {
    /// Deserialize the raw parameters into a handler-specific shape.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone()))
    }
}

/// An ordered list of actions under a name. Events use this shape directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

pub type Event = Chain;

/// A chain reachable by text invocation, optionally restricted to roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(flatten)]
    pub chain: Chain,
    /// Role names allowed to run the command. Empty means public.
    #[serde(default, deserialize_with = "nullable_list")]
    pub perms: Vec<String>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub id: u64,
    pub name: String,
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageInfo {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub author: UserInfo,
    pub content: String,
    /// Names of the author's roles in the guild, empty for DMs.
    pub role_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub guild_id: u64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuildInfo {
    pub id: u64,
    pub name: String,
}

/// Whatever a chain operates over: the triggering message, member or guild.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Message(MessageInfo),
    Member(MemberInfo),
    Ban { guild_id: u64, user: UserInfo },
    Guild(GuildInfo),
}

impl Subject {
    pub fn guild_id(&self) -> Option<u64> {
        match self {
            Subject::Message(msg) => msg.guild_id,
            Subject::Member(member) => Some(member.guild_id),
            Subject::Ban { guild_id, .. } => Some(*guild_id),
            Subject::Guild(guild) => Some(guild.id),
        }
    }

    /// Channel a reply goes to when the action does not name one.
    pub fn channel_id(&self) -> Option<u64> {
        match self {
            Subject::Message(msg) => Some(msg.channel_id),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&UserInfo> {
        match self {
            Subject::Message(msg) => Some(&msg.author),
            Subject::Member(member) => Some(&member.user),
            Subject::Ban { user, .. } => Some(user),
            Subject::Guild(_) => None,
        }
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            Subject::Message(msg) => format!("message [{}]", msg.content),
            Subject::Member(member) => format!(
                "member {} in guild {}",
                member.user.id, member.guild_id
            ),
            Subject::Ban { guild_id, user } => format!("ban of {} in guild {}", user.id, guild_id),
            Subject::Guild(guild) => format!("guild {} ({})", guild.name, guild.id),
        }
    }
}

/// What a handler asks the interpreter to do after its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Run the next action in order.
    Next,
    /// Jump to an arbitrary index. Out-of-range targets end the chain.
    Goto(usize),
    /// End the chain here.
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_without_type_keeps_params() {
        let action: Action = serde_json::from_value(json!({ "message": "pong" })).unwrap();
        assert_eq!(action.kind, None);
        assert_eq!(action.params["message"], json!("pong"));
    }

    #[test]
    fn test_action_type_is_not_a_param() {
        let action: Action =
            serde_json::from_value(json!({ "type": "ban-mod", "reason": "spam" })).unwrap();
        assert_eq!(action.kind.as_deref(), Some("ban-mod"));
        assert!(!action.params.contains_key("type"));
    }

    #[test]
    fn test_command_perms_accept_null_and_missing() {
        let with_null: Command =
            serde_json::from_value(json!({ "name": "ping", "perms": null, "actions": [] }))
                .unwrap();
        let missing: Command = serde_json::from_value(json!({ "name": "ping" })).unwrap();
        assert!(with_null.perms.is_empty());
        assert!(missing.perms.is_empty());
        assert_eq!(missing.chain.name, "ping");
    }
}
