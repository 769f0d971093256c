// Guild initialization - fires "Bot Initialization" once per guild.
//
// Each guild is either pending (known but not yet available) or
// initialized (recorded in `LoadedGuilds`). A poll initializes every
// available guild that has not been seen before; pending guilds are
// re-polled on the configured interval until they come up or the retry
// policy runs out. `GuildInitScheduler` keeps a single polling pass alive
// no matter how often the platform asks for one.

use super::event_dispatcher::{run_event, BOT_INITIALIZATION};
use crate::core::chain::{GuildInfo, Subject};
use crate::core::config::GuildPollSettings;
use crate::core::context::BotContext;
use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Guilds "Bot Initialization" already fired for. Only ever grows.
#[derive(Debug, Default)]
pub struct LoadedGuilds {
    ids: DashSet<u64>,
}

impl LoadedGuilds {
    /// Record `guild_id`; `true` if it was not there before.
    pub fn mark(&self, guild_id: u64) -> bool {
        self.ids.insert(guild_id)
    }

    pub fn contains(&self, guild_id: u64) -> bool {
        self.ids.contains(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuildStatus {
    pub id: u64,
    pub name: String,
    pub available: bool,
}

/// Source of the current guild list.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    async fn guilds(&self) -> Vec<GuildStatus>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl From<&GuildPollSettings> for RetryPolicy {
    fn from(settings: &GuildPollSettings) -> Self {
        Self {
            interval: settings.interval(),
            max_attempts: settings.max_attempts,
        }
    }
}

/// Result of a single poll over the guild list.
#[derive(Debug, Default, PartialEq)]
pub struct PollOutcome {
    /// Guilds that became initialized during this poll.
    pub initialized: Vec<GuildInfo>,
    /// Guilds still waiting to become available.
    pub pending: Vec<u64>,
}

#[derive(Debug, PartialEq)]
pub enum InitReport {
    /// Every known guild is initialized.
    Ready { polls: u32 },
    /// The retry policy ran out with guilds still unavailable.
    GaveUp { polls: u32, pending: Vec<u64> },
}

/// Mark every available, not-yet-loaded guild and report what is left.
pub fn poll_once(loaded: &LoadedGuilds, guilds: &[GuildStatus]) -> PollOutcome {
    let mut outcome = PollOutcome::default();
    for guild in guilds {
        if loaded.contains(guild.id) {
            continue;
        }
        if !guild.available {
            outcome.pending.push(guild.id);
        } else if loaded.mark(guild.id) {
            outcome.initialized.push(GuildInfo {
                id: guild.id,
                name: guild.name.clone(),
            });
        }
    }
    outcome
}

/// Poll `directory` until every guild is initialized, running
/// "Bot Initialization" for each guild as it becomes available.
pub async fn initialize_guilds(ctx: &BotContext, directory: &dyn GuildDirectory) -> InitReport {
    let policy = RetryPolicy::from(&ctx.settings.guild_poll);
    let mut polls = 0u32;

    loop {
        let guilds = directory.guilds().await;
        let outcome = poll_once(&ctx.loaded_guilds, &guilds);
        polls += 1;

        for guild in outcome.initialized {
            tracing::info!(guild_id = guild.id, guild = %guild.name, "Initializing guild");
            run_event(ctx, BOT_INITIALIZATION, &Subject::Guild(guild)).await;
        }

        if outcome.pending.is_empty() {
            return InitReport::Ready { polls };
        }

        if policy.max_attempts.is_some_and(|max| polls >= max) {
            tracing::warn!(
                pending = ?outcome.pending,
                "Guilds never became available after {polls} polls"
            );
            return InitReport::GaveUp {
                polls,
                pending: outcome.pending,
            };
        }

        tracing::debug!(pending = outcome.pending.len(), "Waiting for guilds to become available");
        tokio::time::sleep(policy.interval).await;
    }
}

/// Runs at most one `initialize_guilds` pass at a time.
///
/// A request arriving while a pass is running is folded into it: the
/// running pass goes round once more after it finishes, so guilds that
/// became known late are still picked up.
#[derive(Debug, Default)]
pub struct GuildInitScheduler {
    running: AtomicBool,
    requested: AtomicBool,
}

impl GuildInitScheduler {
    /// Run a pass unless one is already in flight. Returns the report of
    /// the last pass this call ran, or `None` when it deferred to another.
    pub async fn run(&self, ctx: &BotContext, directory: &dyn GuildDirectory) -> Option<InitReport> {
        self.requested.store(true, Ordering::SeqCst);
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Guild initialization already running");
            return None;
        }

        loop {
            self.requested.store(false, Ordering::SeqCst);
            let report = initialize_guilds(ctx, directory).await;
            self.running.store(false, Ordering::SeqCst);

            // Go again only for a request that came in during this pass and
            // that no newer caller has taken over.
            if !self.requested.load(Ordering::SeqCst) || self.running.swap(true, Ordering::SeqCst) {
                return Some(report);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
