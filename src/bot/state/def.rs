use std::{io, sync::Arc};

use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::bot::{chat_event::chat_event::{ChannelId, GuildId, UserId}, commands::registry::CommandRegistry, db::settings::SettingsProvider, handler::handler::ChatClient, replies::Translator, throttle::throttle::ThrottleManager};

pub struct AppState {
    pub config: Arc<BotConfig>,
    pub registry: Arc<RwLock<CommandRegistry>>,
    pub throttles: ThrottleManager,
    pub settings: Arc<dyn SettingsProvider>,
    pub translator: Arc<dyn Translator>,
    pub chat_client: Arc<dyn ChatClient>,
    pub runtime: BotRuntime,
}

#[derive(Default)]
pub struct BotRuntime {
    /// Guilds whose persisted enable/disable overrides were applied to the registry.
    pub prepared_guilds: DashSet<GuildId>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct BotConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Seconds during which editing a command message re-runs it.
    #[serde(default = "default_editable_duration")]
    pub editable_duration: u64,
    #[serde(default = "default_true")]
    pub non_command_editable: bool,
    #[serde(default = "default_true")]
    pub unknown_command_response: bool,
    #[serde(default)]
    pub owners: Vec<UserId>,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Seconds to wait for an answer to an argument prompt.
    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout: u64,
    #[serde(default = "default_cancel_keyword")]
    pub cancel_keyword: String,
    #[serde(default = "default_finish_keyword")]
    pub finish_keyword: String,
    /// Invalid answers tolerated per argument, `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<usize>,
    /// Operator channel that receives command failure reports.
    #[serde(default)]
    pub error_channel: Option<ChannelId>,
}

fn default_prefix() -> String {
    "!".into()
}

fn default_editable_duration() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_lang() -> String {
    "en".into()
}

fn default_prompt_timeout() -> u64 {
    30
}

fn default_cancel_keyword() -> String {
    "cancel".into()
}

fn default_finish_keyword() -> String {
    "finish".into()
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("Name already registered: {0}")]
    DuplicateName(String),
    #[error("Unknown group: {0}")]
    UnknownGroup(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Unknown argument type `{type_id}` for argument `{key}`")]
    UnknownArgumentType { key: String, type_id: String },
    #[error("{0} is guarded and cannot be disabled")]
    Guarded(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Custom(String),
}
