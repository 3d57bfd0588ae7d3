use std::{sync::Arc, time::Duration};

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::bot::{chat_event::chat_event::MessageId, handler::handler::Responder};

/// What a command message produced, kept while the message may still be edited.
#[derive(Clone)]
pub struct ResponseLink {
    pub responder: Arc<Responder>,
    /// Content the message had when it was last dispatched.
    pub content: String,
    pub created: Instant,
}

impl ResponseLink {
    pub fn responses(&self) -> Vec<MessageId> {
        self.responder.responses()
    }
}

/// Command message id to its responses. Each link is dropped by a timer when its edit
/// window closes.
#[derive(Clone, Default)]
pub struct ResponseLinks {
    links: Arc<DashMap<MessageId, ResponseLink>>,
}

impl ResponseLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// A re-dispatch of an already linked message keeps the original window.
    pub fn record(&self, message: MessageId, responder: Arc<Responder>, content: String, window: Duration) {
        if window.is_zero() {
            return;
        }

        match self.links.entry(message.clone()) {
            Entry::Occupied(mut occupied) => {
                let created = occupied.get().created;
                occupied.insert(ResponseLink { responder, content, created });
            }
            Entry::Vacant(vacant) => {
                let created = Instant::now();
                vacant.insert(ResponseLink { responder, content, created });
                self.expire(message, created, window);
            }
        }
    }

    fn expire(&self, message: MessageId, created: Instant, window: Duration) {
        let links = self.links.clone();
        tokio::spawn(async move {
            sleep_until(created + window).await;
            if links.remove_if(&message, |_, link| link.created == created).is_some() {
                debug!("Edit window for {message} closed");
            }
        });
    }

    pub fn get(&self, message: &MessageId) -> Option<ResponseLink> {
        self.links.get(message).map(|link| link.clone())
    }

    pub fn remove(&self, message: &MessageId) -> Option<ResponseLink> {
        self.links.remove(message).map(|(_, link)| link)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
