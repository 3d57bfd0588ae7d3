#![allow(dead_code)]

use std::{
    sync::{atomic::{AtomicBool, AtomicUsize, Ordering}, Arc, Mutex},
    time::Duration,
};

use chatdispatch::bot::{
    chat_event::chat_event::{ChannelId, ChatEvent, MessageId, UserId},
    commands::{commands::BotResult, register_defaults, registry::CommandRegistry, ArgMap, ArgumentSpec, Command, Group},
    db::settings::MemorySettings,
    dispatcher::dispatcher::Dispatcher,
    handler::handler::ChatClient,
    permissions::permissions::PermissionLevel,
    replies::StringTable,
    state::def::{AppState, BotConfig, BotError},
};
use futures::future::BoxFuture;

#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Sent { id: MessageId, channel: ChannelId, content: String },
    Edited { id: MessageId, channel: ChannelId, content: String },
    Deleted { id: MessageId, channel: ChannelId },
}

impl Outgoing {
    pub fn content(&self) -> &str {
        match self {
            Outgoing::Sent { content, .. } | Outgoing::Edited { content, .. } => content,
            Outgoing::Deleted { .. } => "",
        }
    }

    pub fn channel(&self) -> &ChannelId {
        match self {
            Outgoing::Sent { channel, .. } | Outgoing::Edited { channel, .. } | Outgoing::Deleted { channel, .. } => channel,
        }
    }
}

#[derive(Default)]
pub struct RecordingClient {
    log: Mutex<Vec<Outgoing>>,
    next: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingClient {
    pub fn outgoing(&self) -> Vec<Outgoing> {
        self.log.lock().unwrap().clone()
    }
}

impl ChatClient for RecordingClient {
    fn user_id(&self) -> UserId {
        UserId::new("bot")
    }

    fn send<'a>(&'a self, channel: &'a ChannelId, content: &'a str) -> BoxFuture<'a, BotResult<MessageId>> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BotError::Delivery("offline".into()));
            }
            let id = MessageId::new(format!("r{}", self.next.fetch_add(1, Ordering::SeqCst)));
            self.log.lock().unwrap().push(Outgoing::Sent { id: id.clone(), channel: channel.clone(), content: content.to_string() });
            Ok(id)
        })
    }

    fn edit<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId, content: &'a str) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(Outgoing::Edited { id: message.clone(), channel: channel.clone(), content: content.to_string() });
            Ok(())
        })
    }

    fn delete<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(Outgoing::Deleted { id: message.clone(), channel: channel.clone() });
            Ok(())
        })
    }
}

pub type Calls = Arc<Mutex<Vec<(String, ArgMap)>>>;

fn recording(name: &str, calls: &Calls) -> Command {
    let calls = calls.clone();
    let label = name.to_string();
    Command::new(name, "test", move |ctx, args| {
        let calls = calls.clone();
        let label = label.clone();
        Box::pin(async move {
            calls.lock().unwrap().push((label.clone(), args.clone()));
            if let Some(text) = args.text("text") {
                ctx.reply(text).await;
            } else {
                ctx.reply(&format!("ran {label}")).await;
            }
            Ok(())
        })
    })
}

fn test_commands(registry: &mut CommandRegistry, calls: &Calls) -> BotResult<()> {
    registry.register_group(Group::new("test", "Test"))?;

    registry.register_command(
        recording("add", calls)
            .arg(ArgumentSpec::new("a", "integer", "What is the first number?").label("first number"))
            .arg(ArgumentSpec::new("b", "integer", "What is the second number?").label("second number")),
    )?;
    registry.register_command(
        recording("sum", calls).arg(ArgumentSpec::new("n", "integer", "Which numbers?").label("number").infinite().max_items(3)),
    )?;
    registry.register_command(recording("echo", calls).arg(ArgumentSpec::new("text", "string", "Say what?")))?;
    registry.register_command(recording("limited", calls).throttle(1, 10))?;
    registry.register_command(recording("secret", calls).owner_only())?;
    registry.register_command(recording("serveronly", calls).guild_only())?;
    registry.register_command(recording("spicy", calls).nsfw_only())?;
    registry.register_command(recording("modonly", calls).permission(PermissionLevel::Moderator))?;
    registry.register_command(Command::new("fail", "test", |_ctx, _args| {
        Box::pin(async move { Err(BotError::Custom("database is on fire".into())) })
    }))?;
    registry.register_command(Command::new("boom", "test", |_ctx, _args| {
        Box::pin(async move {
            if true {
                panic!("kaboom");
            }
            Ok(())
        })
    }))?;
    Ok(())
}

pub fn test_config() -> BotConfig {
    BotConfig {
        owners: vec![UserId::new("owner")],
        error_channel: Some(ChannelId::new("ops")),
        ..BotConfig::default()
    }
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub client: Arc<RecordingClient>,
    pub calls: Calls,
    counter: AtomicUsize,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: BotConfig) -> Self {
        let calls: Calls = Arc::default();
        let mut registry = CommandRegistry::new();
        register_defaults(&mut registry).unwrap();
        test_commands(&mut registry, &calls).unwrap();

        let client = Arc::new(RecordingClient::default());
        let state = Arc::new(AppState::new(
            config,
            registry,
            Arc::new(MemorySettings::new()),
            Arc::new(StringTable::new()),
            client.clone(),
        ));
        let dispatcher = Dispatcher::new(state);
        dispatcher.init().await.unwrap();

        Harness { dispatcher, client, calls, counter: AtomicUsize::new(0) }
    }

    /// A guild message from `alice` in channel `c1`.
    pub fn message(&self, content: &str) -> ChatEvent {
        let id = format!("m{}", self.counter.fetch_add(1, Ordering::SeqCst));
        ChatEvent::new(id, "c1", "alice", content).in_guild("g1")
    }

    /// A guild message in channel `c1` from someone else.
    pub fn from(&self, author: &str, content: &str) -> ChatEvent {
        let id = format!("m{}", self.counter.fetch_add(1, Ordering::SeqCst));
        ChatEvent::new(id, "c1", author, content).in_guild("g1")
    }

    pub fn direct(&self, content: &str) -> ChatEvent {
        let id = format!("m{}", self.counter.fetch_add(1, Ordering::SeqCst));
        ChatEvent::new(id, "dm-alice", "alice", content)
    }

    pub async fn send(&self, event: ChatEvent) {
        self.dispatcher.handle_message(event).await.unwrap();
        settle().await;
    }

    pub async fn say(&self, content: &str) -> ChatEvent {
        let event = self.message(content);
        self.send(event.clone()).await;
        event
    }

    pub fn outgoing(&self) -> Vec<Outgoing> {
        self.client.outgoing()
    }

    pub fn texts(&self) -> Vec<String> {
        self.outgoing().iter().map(|o| o.content().to_string()).collect()
    }

    pub fn last_text(&self) -> String {
        self.texts().last().cloned().unwrap_or_default()
    }

    pub fn calls_of(&self, name: &str) -> Vec<ArgMap> {
        self.calls.lock().unwrap().iter().filter(|(n, _)| n == name).map(|(_, args)| args.clone()).collect()
    }
}

/// Lets spawned session tasks run. With a paused clock this only advances time once every
/// ready task has been polled.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
