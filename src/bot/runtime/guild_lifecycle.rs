use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bot::{chat_event::chat_event::GuildId, commands::{commands::BotResult, registry::Target}, state::def::AppState};

pub fn setting_key(target: &Target) -> String {
    match target {
        Target::Command(name) => format!("cmd-{}", name.to_lowercase()),
        Target::Group(id) => format!("grp-{}", id.to_lowercase()),
    }
}

/// Applies persisted enable/disable overrides for `guild` (or the global ones for `None`)
/// to the registry. Guilds are prepared once, the first time a message from them is seen.
/// A guild only counts as prepared once every stored override was read, so a failed read
/// is retried on its next message.
pub async fn prepare_guild(state: Arc<AppState>, guild: Option<&GuildId>) -> BotResult<()> {
    if guild.is_some_and(|g| state.runtime.prepared_guilds.contains(g)) {
        return Ok(());
    }

    let targets: Vec<Target> = {
        let registry = state.registry.read().await;
        registry
            .groups()
            .iter()
            .flat_map(|g| {
                std::iter::once(Target::Group(g.id.clone())).chain(g.commands().iter().map(|c| Target::Command(c.clone())))
            })
            .collect()
    };

    let mut applied = Vec::new();
    for target in targets {
        if let Value::Bool(enabled) = state.settings.get(guild, &setting_key(&target), Value::Null).await? {
            applied.push((target, enabled));
        }
    }

    {
        let mut registry = state.registry.write().await;
        for (target, enabled) in applied {
            if let Err(e) = registry.set_enabled(target.clone(), guild, enabled) {
                warn!("Ignoring stored override for {}: {e}", target.name());
            }
        }
    }

    match guild {
        Some(guild) => {
            state.runtime.prepared_guilds.insert(guild.clone());
            info!("Prepared guild {guild}");
        }
        None => debug!("Applied global overrides"),
    }
    Ok(())
}

/// Changes the enable state in the registry and persists it for the next start.
pub async fn persist_enabled(state: &AppState, target: Target, guild: Option<&GuildId>, enabled: bool) -> BotResult<()> {
    let key = setting_key(&target);
    state.registry.write().await.set_enabled(target, guild, enabled)?;
    state.settings.set(guild, &key, Value::Bool(enabled)).await
}

/// Forgets that a guild was prepared so its overrides are read again on the next message.
pub fn reset_guild(state: &AppState, guild: &GuildId) {
    state.runtime.prepared_guilds.remove(guild);
}
