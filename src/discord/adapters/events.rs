// Serenity event handler. Converts Discord payloads into core types and
// hands them to the dispatchers; nothing here decides behaviour.

use super::guilds::CacheGuildDirectory;
use crate::core::chain::{GuildInfo, MemberInfo, MessageInfo, UserInfo};
use crate::core::dispatch::{self, PlatformEvent};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

fn user_info(user: &serenity::User) -> UserInfo {
    UserInfo {
        id: user.id.get(),
        name: user.name.clone(),
        bot: user.bot,
    }
}

/// Names of the author's roles, looked up in the cache. Kept synchronous so
/// the cache guard is never held across an await.
fn role_names(cache: &serenity::Cache, msg: &serenity::Message) -> Vec<String> {
    let Some(guild_id) = msg.guild_id else {
        return Vec::new();
    };
    let Some(guild) = cache.guild(guild_id) else {
        return Vec::new();
    };

    let role_ids: Vec<serenity::RoleId> = match &msg.member {
        Some(member) => member.roles.clone(),
        None => guild
            .members
            .get(&msg.author.id)
            .map(|m| m.roles.clone())
            .unwrap_or_default(),
    };

    role_ids
        .iter()
        .filter_map(|id| guild.roles.get(id).map(|role| role.name.clone()))
        .collect()
}

fn message_info(cache: &serenity::Cache, msg: &serenity::Message) -> MessageInfo {
    MessageInfo {
        guild_id: msg.guild_id.map(|id| id.get()),
        channel_id: msg.channel_id.get(),
        author: user_info(&msg.author),
        content: msg.content.clone(),
        role_names: role_names(cache, msg),
    }
}

/// Ask for a guild initialization pass. When one is already polling the
/// request folds into it and the spawned task ends straight away.
fn spawn_guild_init(ctx: &serenity::Context, data: &Data) {
    tracing::trace!(
        running = data.guild_init.is_running(),
        "Guild initialization requested"
    );
    let bot = Arc::clone(&data.bot);
    let scheduler = Arc::clone(&data.guild_init);
    let directory = CacheGuildDirectory::new(ctx.cache.clone(), Arc::clone(&data.expected_guilds));
    tokio::spawn(async move {
        if let Some(report) = scheduler.run(&bot, &directory).await {
            tracing::debug!(?report, "Guild initialization pass finished");
        }
    });
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    let bot = &data.bot;

    match event {
        serenity::FullEvent::Message { new_message } => {
            let message = message_info(&ctx.cache, new_message);
            dispatch::dispatch(bot, &PlatformEvent::MessageCreated(message.clone())).await;
            let outcome = dispatch::handle_message(bot, &message).await;
            tracing::trace!(?outcome, "Message handled");
        }

        serenity::FullEvent::GuildMemberAddition { new_member } => {
            let event = PlatformEvent::MemberJoined(MemberInfo {
                guild_id: new_member.guild_id.get(),
                user: user_info(&new_member.user),
            });
            dispatch::dispatch(bot, &event).await;
        }

        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            let event = PlatformEvent::MemberRemoved(MemberInfo {
                guild_id: guild_id.get(),
                user: user_info(user),
            });
            dispatch::dispatch(bot, &event).await;
        }

        serenity::FullEvent::GuildBanAddition {
            guild_id,
            banned_user,
        } => {
            let event = PlatformEvent::MemberBanned {
                guild_id: guild_id.get(),
                user: user_info(banned_user),
            };
            dispatch::dispatch(bot, &event).await;
        }

        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!(
                user = %data_about_bot.user.name,
                guilds = data_about_bot.guilds.len(),
                "Connected to Discord"
            );
            for guild in &data_about_bot.guilds {
                data.expected_guilds.insert(guild.id.get());
            }
            spawn_guild_init(ctx, data);
        }

        serenity::FullEvent::GuildCreate { guild, .. } => {
            // Guilds listed in Ready are already being polled.
            let joined_later = data.expected_guilds.insert(guild.id.get());
            let event = PlatformEvent::GuildAvailable(GuildInfo {
                id: guild.id.get(),
                name: guild.name.clone(),
            });
            dispatch::dispatch(bot, &event).await;

            if joined_later && !bot.loaded_guilds.contains(guild.id.get()) {
                spawn_guild_init(ctx, data);
            }
        }

        _ => {}
    }

    Ok(())
}
