use std::sync::Arc;

use futures::future::BoxFuture;

use crate::bot::{chat_event::chat_event::{ChatEvent, MessageId}, commands::{ArgMap, Command}, handler::handler::Responder, state::def::{AppState, BotError}};

pub type BotResult<T> = Result<T, BotError>;

/// What a command does once its arguments are collected.
pub trait CommandAction: Send + Sync {
    fn run(&self, ctx: CommandContext, args: ArgMap) -> BoxFuture<'static, BotResult<()>>;
}

pub struct FnCommand<F> {
    func: F,
}

impl<F> FnCommand<F>
where
    F: Fn(CommandContext, ArgMap) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> CommandAction for FnCommand<F>
where
    F: Fn(CommandContext, ArgMap) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
{
    fn run(&self, ctx: CommandContext, args: ArgMap) -> BoxFuture<'static, BotResult<()>> {
        (self.func)(ctx, args)
    }
}

/// Everything an action may touch: the triggering message, shared state, and a responder
/// that edits earlier responses in place when the message was edited.
#[derive(Clone)]
pub struct CommandContext {
    pub event: ChatEvent,
    pub state: Arc<AppState>,
    pub command: Arc<Command>,
    pub locale: String,
    pub prefix: String,
    responder: Arc<Responder>,
}

impl CommandContext {
    pub fn new(event: ChatEvent, state: Arc<AppState>, command: Arc<Command>, locale: String, prefix: String, responder: Arc<Responder>) -> Self {
        CommandContext { event, state, command, locale, prefix, responder }
    }

    pub async fn reply(&self, content: &str) -> Option<MessageId> {
        self.responder.reply(content).await
    }

    pub async fn reply_key(&self, key: &str, params: &[String]) -> Option<MessageId> {
        let text = self.translate(key, params);
        self.responder.reply(&text).await
    }

    pub fn translate(&self, key: &str, params: &[String]) -> String {
        self.state.translate(&self.locale, key, params)
    }

    pub fn is_owner(&self) -> bool {
        crate::bot::permissions::permissions::is_owner(&self.event, &self.state.config)
    }
}

#[macro_export]
macro_rules! cmd {
    ($command:expr, $($alias:expr),+ $(,)?) => {
        $command$(.alias($alias))+
    };
}
