use std::{env, str::FromStr, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::bot::{chat_event::chat_event::{ChannelId, GuildId, UserId}, commands::{commands::BotResult, registry::CommandRegistry}, db::settings::SettingsProvider, handler::handler::ChatClient, replies::Translator, state::def::{AppState, BotConfig, BotError, BotRuntime}, throttle::throttle::ThrottleManager};

pub const PREFIX_SETTING: &str = "prefix";
pub const LANG_SETTING: &str = "lang";

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            prefix: "!".to_string(),
            editable_duration: 30,
            non_command_editable: true,
            unknown_command_response: true,
            owners: Vec::new(),
            lang: "en".to_string(),
            prompt_timeout: 30,
            cancel_keyword: "cancel".to_string(),
            finish_keyword: "finish".to_string(),
            max_attempts: None,
            error_channel: None,
        }
    }
}

impl BotConfig {
    /// Reads `CHATDISPATCH_*` variables, loading `.env` first when present.
    pub fn from_env() -> BotResult<Self> {
        dotenvy::dotenv().ok();
        let mut config = BotConfig::default();

        if let Ok(prefix) = env::var("CHATDISPATCH_PREFIX") {
            config.prefix = prefix;
        }
        if let Ok(owners) = env::var("CHATDISPATCH_OWNERS") {
            config.owners = owners
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(UserId::new)
                .collect();
        }
        if let Ok(lang) = env::var("CHATDISPATCH_LANG") {
            config.lang = lang;
        }
        if let Ok(keyword) = env::var("CHATDISPATCH_CANCEL_KEYWORD") {
            config.cancel_keyword = keyword;
        }
        if let Ok(keyword) = env::var("CHATDISPATCH_FINISH_KEYWORD") {
            config.finish_keyword = keyword;
        }
        if let Ok(channel) = env::var("CHATDISPATCH_ERROR_CHANNEL") {
            config.error_channel = Some(ChannelId::new(channel));
        }

        config.editable_duration = parse_var("CHATDISPATCH_EDITABLE_DURATION", config.editable_duration)?;
        config.prompt_timeout = parse_var("CHATDISPATCH_PROMPT_TIMEOUT", config.prompt_timeout)?;
        config.non_command_editable = parse_var("CHATDISPATCH_NON_COMMAND_EDITABLE", config.non_command_editable)?;
        config.unknown_command_response = parse_var("CHATDISPATCH_UNKNOWN_COMMAND_RESPONSE", config.unknown_command_response)?;
        if let Ok(raw) = env::var("CHATDISPATCH_MAX_ATTEMPTS") {
            let attempts = raw
                .parse::<usize>()
                .map_err(|e| BotError::Custom(format!("CHATDISPATCH_MAX_ATTEMPTS: {e}")))?;
            config.max_attempts = Some(attempts).filter(|a| *a > 0);
        }

        Ok(config)
    }

    pub fn editable_window(&self) -> Duration {
        Duration::from_secs(self.editable_duration)
    }

    pub fn prompt_window(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout)
    }
}

fn parse_var<T>(name: &str, current: T) -> BotResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| BotError::Custom(format!("{name}: {e}"))),
        Err(_) => Ok(current),
    }
}

impl AppState {
    pub fn new(
        config: BotConfig,
        registry: CommandRegistry,
        settings: Arc<dyn SettingsProvider>,
        translator: Arc<dyn Translator>,
        chat_client: Arc<dyn ChatClient>,
    ) -> Self {
        AppState {
            config: Arc::new(config),
            registry: Arc::new(RwLock::new(registry)),
            throttles: ThrottleManager::new(),
            settings,
            translator,
            chat_client,
            runtime: BotRuntime::default(),
        }
    }

    /// Guild setting, then global setting, then the configured default. An empty prefix is
    /// a valid answer and means mention-only.
    pub async fn prefix_for(&self, guild: Option<&GuildId>) -> BotResult<String> {
        if let Some(prefix) = self.string_setting(guild, PREFIX_SETTING).await? {
            return Ok(prefix);
        }
        Ok(self.config.prefix.clone())
    }

    pub async fn locale_for(&self, guild: Option<&GuildId>) -> BotResult<String> {
        if let Some(lang) = self.string_setting(guild, LANG_SETTING).await? {
            return Ok(lang);
        }
        Ok(self.config.lang.clone())
    }

    async fn string_setting(&self, guild: Option<&GuildId>, key: &str) -> BotResult<Option<String>> {
        if guild.is_some() {
            if let Value::String(v) = self.settings.get(guild, key, Value::Null).await? {
                return Ok(Some(v));
            }
        }
        match self.settings.get(None, key, Value::Null).await? {
            Value::String(v) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn translate(&self, locale: &str, key: &str, params: &[String]) -> String {
        self.translator.translate(locale, key, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_serde_defaults() {
        let from_serde: BotConfig = serde_json::from_str("{}").unwrap();
        let default = BotConfig::default();

        assert_eq!(from_serde.prefix, default.prefix);
        assert_eq!(from_serde.editable_duration, 30);
        assert_eq!(from_serde.prompt_timeout, 30);
        assert!(from_serde.non_command_editable);
        assert!(from_serde.unknown_command_response);
        assert_eq!(from_serde.cancel_keyword, "cancel");
        assert_eq!(from_serde.finish_keyword, "finish");
        assert_eq!(from_serde.max_attempts, None);
    }

    #[test]
    fn windows_are_seconds() {
        let config = BotConfig { editable_duration: 12, prompt_timeout: 5, ..BotConfig::default() };
        assert_eq!(config.editable_window(), Duration::from_secs(12));
        assert_eq!(config.prompt_window(), Duration::from_secs(5));
    }
}
