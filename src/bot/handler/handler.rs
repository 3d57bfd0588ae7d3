use std::{collections::VecDeque, sync::{Arc, Mutex}};

use futures::future::BoxFuture;
use tracing::warn;

use crate::bot::{chat_event::chat_event::{ChannelId, MessageId, UserId}, commands::commands::BotResult};

/// Outbound half of the chat transport.
pub trait ChatClient: Send + Sync {
    /// Account the bot is logged in as, used to recognise mention prefixes.
    fn user_id(&self) -> UserId;

    fn send<'a>(&'a self, channel: &'a ChannelId, content: &'a str) -> BoxFuture<'a, BotResult<MessageId>>;

    fn edit<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId, content: &'a str) -> BoxFuture<'a, BotResult<()>>;

    fn delete<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId) -> BoxFuture<'a, BotResult<()>>;
}

/// Sends the replies of one command invocation. When the invocation re-runs an edited
/// message, earlier responses are edited in place, in the order they were first sent.
pub struct Responder {
    client: Arc<dyn ChatClient>,
    channel: ChannelId,
    prior: Mutex<VecDeque<MessageId>>,
    sent: Mutex<Vec<MessageId>>,
}

impl Responder {
    pub fn new(client: Arc<dyn ChatClient>, channel: ChannelId) -> Self {
        Self::with_prior(client, channel, Vec::new())
    }

    pub fn with_prior(client: Arc<dyn ChatClient>, channel: ChannelId, prior: Vec<MessageId>) -> Self {
        Responder {
            client,
            channel,
            prior: Mutex::new(prior.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Best-effort: delivery failures are logged and yield `None`.
    pub async fn reply(&self, content: &str) -> Option<MessageId> {
        let reuse = lock(&self.prior).pop_front();

        let delivered = match reuse {
            Some(id) => self.client.edit(&self.channel, &id, content).await.map(|_| id),
            None => self.client.send(&self.channel, content).await,
        };

        match delivered {
            Ok(id) => {
                lock(&self.sent).push(id.clone());
                Some(id)
            }
            Err(e) => {
                warn!("Reply to {} failed: {e}", self.channel);
                None
            }
        }
    }

    /// Message ids this invocation is now responsible for.
    pub fn responses(&self) -> Vec<MessageId> {
        lock(&self.sent).clone()
    }
}

/// Fire-and-forget message outside any invocation (prompts, operator reports).
pub async fn send_logged(client: &dyn ChatClient, channel: &ChannelId, content: &str) -> Option<MessageId> {
    match client.send(channel, content).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Send to {channel} failed: {e}");
            None
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::bot::state::def::BotError;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Outgoing {
        Sent { id: MessageId, channel: ChannelId, content: String },
        Edited { id: MessageId, channel: ChannelId, content: String },
        Deleted { id: MessageId, channel: ChannelId },
    }

    /// Records every delivery instead of talking to a platform.
    #[derive(Default)]
    pub struct RecordingClient {
        pub log: Mutex<Vec<Outgoing>>,
        next: AtomicUsize,
        pub fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingClient {
        pub fn outgoing(&self) -> Vec<Outgoing> {
            lock(&self.log).clone()
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
                lock(&self.log).push(Outgoing::Sent { id: id.clone(), channel: channel.clone(), content: content.to_string() });
                Ok(id)
            })
        }

        fn edit<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId, content: &'a str) -> BoxFuture<'a, BotResult<()>> {
            Box::pin(async move {
                lock(&self.log).push(Outgoing::Edited { id: message.clone(), channel: channel.clone(), content: content.to_string() });
                Ok(())
            })
        }

        fn delete<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId) -> BoxFuture<'a, BotResult<()>> {
            Box::pin(async move {
                lock(&self.log).push(Outgoing::Deleted { id: message.clone(), channel: channel.clone() });
                Ok(())
            })
        }
    }
}
