// Event dispatcher - maps platform lifecycle signals onto configured events.

use crate::core::chain::interpreter;
use crate::core::chain::{GuildInfo, MemberInfo, MessageInfo, Subject, UserInfo};
use crate::core::context::BotContext;

pub const BOT_INITIALIZATION: &str = "Bot Initialization";
pub const USER_JOINS_SERVER: &str = "User Joins Server";
pub const USER_KICKED: &str = "User Kicked";
pub const USER_BANNED: &str = "User Banned";
pub const ANY_MESSAGE: &str = "Any Message";

/// Platform signals the core understands.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    MessageCreated(MessageInfo),
    MemberJoined(MemberInfo),
    MemberRemoved(MemberInfo),
    MemberBanned { guild_id: u64, user: UserInfo },
    GuildAvailable(GuildInfo),
}

impl PlatformEvent {
    /// Name listener mods subscribe under.
    pub fn bus_name(&self) -> &'static str {
        match self {
            PlatformEvent::MessageCreated(_) => "message",
            PlatformEvent::MemberJoined(_) => "guildMemberAdd",
            PlatformEvent::MemberRemoved(_) => "guildMemberRemove",
            PlatformEvent::MemberBanned { .. } => "guildBanAdd",
            PlatformEvent::GuildAvailable(_) => "guildCreate",
        }
    }

    /// Configured event fired directly for this signal. Messages and guild
    /// availability go through the command dispatcher and guild initializer.
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            PlatformEvent::MemberJoined(_) => Some(USER_JOINS_SERVER),
            PlatformEvent::MemberRemoved(_) => Some(USER_KICKED),
            PlatformEvent::MemberBanned { .. } => Some(USER_BANNED),
            PlatformEvent::MessageCreated(_) | PlatformEvent::GuildAvailable(_) => None,
        }
    }

    pub fn subject(&self) -> Subject {
        match self {
            PlatformEvent::MessageCreated(msg) => Subject::Message(msg.clone()),
            PlatformEvent::MemberJoined(member) | PlatformEvent::MemberRemoved(member) => {
                Subject::Member(member.clone())
            }
            PlatformEvent::MemberBanned { guild_id, user } => Subject::Ban {
                guild_id: *guild_id,
                user: user.clone(),
            },
            PlatformEvent::GuildAvailable(guild) => Subject::Guild(guild.clone()),
        }
    }
}

/// Hand a platform event to its listener mod, then to the configured event
/// it maps to, if any. Returns how many event chains ran to completion.
pub async fn dispatch(ctx: &BotContext, event: &PlatformEvent) -> usize {
    ctx.mods.emit(ctx, event).await;

    match event.event_name() {
        Some(name) => run_event(ctx, name, &event.subject()).await,
        None => 0,
    }
}

/// Run every configured event called `name` from index 0. Failures are
/// logged with the event name and subject; they never reach the caller.
pub async fn run_event(ctx: &BotContext, name: &str, subject: &Subject) -> usize {
    let mut completed = 0;
    for event in ctx.find_events(name) {
        if event.actions.is_empty() {
            continue;
        }
        match interpreter::run(ctx, event, subject, Vec::new(), 0).await {
            Ok(_) => completed += 1,
            Err(e) => tracing::error!(
                event = name,
                subject = %subject.describe(),
                "Event chain failed: {e:?}"
            ),
        }
    }
    completed
}
