// Shared fixtures for core tests: a bot context wired to in-memory stores,
// a gateway that records what it was asked to send, and a scripted mod.

use crate::core::chain::{
    Action, ActionHandler, ChainError, Command, Continuation, Event, MessageInfo, StepContext,
    Subject, UserInfo,
};
use crate::core::config::{BotConfig, Settings};
use crate::core::context::{BotContext, ChatGateway, GatewayError, Ports, SpamGuard};
use crate::core::mods::Mod;
use crate::core::users::{UserCache, UserStore};
use crate::core::variables::{StoreError, VariableStore, Variables};
use crate::infra::users::in_memory::InMemoryUserStore;
use crate::infra::variables::in_memory::InMemoryVariableStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<(u64, String)>>,
}

impl RecordingGateway {
    pub fn sent(&self) -> Vec<(u64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingSpamGuard {
    inspected: AtomicUsize,
}

impl CountingSpamGuard {
    pub fn inspected(&self) -> usize {
        self.inspected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpamGuard for CountingSpamGuard {
    async fn inspect(&self, _message: &MessageInfo, _rules: &serde_json::Value) {
        self.inspected.fetch_add(1, Ordering::SeqCst);
    }
}

/// Store whose every write fails, standing in for a full or read-only disk.
#[derive(Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }
}

#[async_trait]
impl VariableStore for FailingStore {
    async fn load(&self) -> Variables {
        Variables::default()
    }

    async fn flush(&self, _variables: &Variables) -> Result<(), StoreError> {
        self.fail()
    }
}

#[async_trait]
impl UserStore for FailingStore {
    async fn load(&self) -> UserCache {
        UserCache::default()
    }

    async fn flush(&self, _cache: &UserCache) -> Result<(), StoreError> {
        self.fail()
    }
}

pub struct TestBot {
    pub ctx: Arc<BotContext>,
    pub gateway: Arc<RecordingGateway>,
    pub spam: Arc<CountingSpamGuard>,
    pub variables: Arc<InMemoryVariableStore>,
    pub users: Arc<InMemoryUserStore>,
    /// Wired in place of both stores when built with `failing_stores()`.
    pub failing: Arc<FailingStore>,
}

impl TestBot {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestBotBuilder {
        TestBotBuilder::default()
    }
}

#[derive(Default)]
pub struct TestBotBuilder {
    settings: Settings,
    commands: Vec<Command>,
    events: Vec<Event>,
    failing_stores: bool,
}

impl TestBotBuilder {
    pub fn failing_stores(mut self) -> Self {
        self.failing_stores = true;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn commands(mut self, commands: serde_json::Value) -> Self {
        self.commands = serde_json::from_value(commands).expect("invalid test commands");
        self
    }

    pub fn events(mut self, events: serde_json::Value) -> Self {
        self.events = serde_json::from_value(events).expect("invalid test events");
        self
    }

    pub async fn build(self) -> TestBot {
        let gateway = Arc::new(RecordingGateway::default());
        let spam = Arc::new(CountingSpamGuard::default());
        let variables = Arc::new(InMemoryVariableStore::default());
        let users = Arc::new(InMemoryUserStore::default());

        let config = BotConfig {
            settings: self.settings,
            rules: serde_json::Value::Null,
            commands: self.commands,
            events: self.events,
        };
        let failing = Arc::new(FailingStore::default());

        let variable_port: Arc<dyn VariableStore> = if self.failing_stores {
            failing.clone()
        } else {
            variables.clone()
        };
        let user_port: Arc<dyn UserStore> = if self.failing_stores {
            failing.clone()
        } else {
            users.clone()
        };
        let ports = Ports {
            gateway: gateway.clone(),
            spam_guard: spam.clone(),
            variables: variable_port,
            users: user_port,
        };

        TestBot {
            ctx: Arc::new(BotContext::load(config, ports).await),
            gateway,
            spam,
            variables,
            users,
            failing,
        }
    }
}

/// A message from user 1 ("tester") in guild 20, channel 10.
pub fn message(content: &str, roles: &[&str]) -> MessageInfo {
    MessageInfo {
        guild_id: Some(20),
        channel_id: 10,
        author: UserInfo {
            id: 1,
            name: "tester".into(),
            bot: false,
        },
        content: content.to_string(),
        role_names: roles.iter().map(|r| r.to_string()).collect(),
    }
}

pub fn message_subject(content: &str, roles: &[&str]) -> Subject {
    Subject::Message(message(content, roles))
}

/// An action that names a mod and carries no parameters.
pub fn typed(kind: &str) -> Action {
    Action {
        kind: Some(kind.to_string()),
        params: serde_json::Map::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub index: usize,
    pub args: Vec<String>,
    pub chain: String,
    pub subject: Subject,
}

/// Action mod that records each call and answers with a fixed continuation.
pub struct ScriptedMod {
    name: String,
    reply: Result<Continuation, String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedMod {
    pub fn new(name: &str, continuation: Continuation) -> Self {
        Self {
            name: name.to_string(),
            reply: Ok(continuation),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: Err("scripted failure".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Mod for ScriptedMod {
    fn name(&self) -> &str {
        &self.name
    }

    fn action(&self) -> Option<&dyn ActionHandler> {
        Some(self)
    }
}

#[async_trait]
impl ActionHandler for ScriptedMod {
    async fn handle(
        &self,
        _ctx: &BotContext,
        step: StepContext<'_>,
    ) -> Result<Continuation, ChainError> {
        self.calls.lock().unwrap().push(RecordedCall {
            index: step.index,
            args: step.args.clone(),
            chain: step.chain.name.clone(),
            subject: step.subject.clone(),
        });
        self.reply.clone().map_err(|reason| ChainError::Mod {
            name: self.name.clone(),
            reason,
        })
    }
}
