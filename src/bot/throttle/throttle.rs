use std::{sync::Arc, time::Duration};

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::{task::JoinHandle, time::{sleep_until, Instant}};
use tracing::debug;

use crate::bot::{chat_event::chat_event::UserId, commands::Throttling};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleOutcome {
    Allowed,
    Throttled { remaining: Duration },
}

type ThrottleKey = (String, UserId);

struct ThrottleEntry {
    usages: u32,
    start: Instant,
    expiry: JoinHandle<()>,
}

/// Usage windows per (command, user). Entries remove themselves when their window ends.
#[derive(Clone, Default)]
pub struct ThrottleManager {
    entries: Arc<DashMap<ThrottleKey, ThrottleEntry>>,
}

impl ThrottleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime; the expiry is a spawned task.
    pub fn check(&self, command: &str, user: &UserId, policy: &Throttling) -> ThrottleOutcome {
        let key = (command.to_lowercase(), user.clone());
        let limit = policy.usages.max(1);
        let now = Instant::now();

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) if now < occupied.get().start + policy.duration => {
                let entry = occupied.get_mut();
                if entry.usages < limit {
                    entry.usages += 1;
                    ThrottleOutcome::Allowed
                } else {
                    ThrottleOutcome::Throttled { remaining: entry.start + policy.duration - now }
                }
            }
            Entry::Occupied(mut occupied) => {
                // Window over but the expiry has not fired yet.
                occupied.get().expiry.abort();
                occupied.insert(self.fresh(key, now, policy.duration));
                ThrottleOutcome::Allowed
            }
            Entry::Vacant(vacant) => {
                vacant.insert(self.fresh(key, now, policy.duration));
                ThrottleOutcome::Allowed
            }
        }
    }

    fn fresh(&self, key: ThrottleKey, start: Instant, duration: Duration) -> ThrottleEntry {
        let entries = self.entries.clone();
        let expiry = tokio::spawn(async move {
            sleep_until(start + duration).await;
            if entries.remove_if(&key, |_, entry| entry.start == start).is_some() {
                debug!("Throttle window for {} / {} expired", key.0, key.1);
            }
        });

        ThrottleEntry { usages: 1, start, expiry }
    }

    /// Usages recorded in the live window, if any.
    pub fn usages(&self, command: &str, user: &UserId) -> Option<u32> {
        self.entries.get(&(command.to_lowercase(), user.clone())).map(|e| e.usages)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
