use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::bot::{chat_event::chat_event::ChatEvent, commands::commands::BotResult, dispatcher::dispatcher::Dispatcher};

pub mod state;
pub mod chat_event;
pub mod collector;
pub mod dispatcher;
pub mod commands;
pub mod permissions;
pub mod db;
pub mod handler;
pub mod replies;
pub mod runtime;
pub mod throttle;
pub mod types;

/// Feeds events to the dispatcher one at a time until the sender side is dropped.
pub async fn run_event_loop(dispatcher: Arc<Dispatcher>, mut rx: UnboundedReceiver<ChatEvent>) -> BotResult<()> {
    dispatcher.init().await?;
    info!("Event loop started");

    while let Some(event) = rx.recv().await {
        if let Err(e) = dispatcher.handle_message(event).await {
            tracing::error!("Event error: {e:?}");
        }
    }

    info!("Event loop stopped");
    Ok(())
}
