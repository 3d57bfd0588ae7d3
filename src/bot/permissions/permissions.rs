use core::fmt;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bot::{chat_event::chat_event::ChatEvent, state::def::BotConfig};

/// Ordered from most to least privileged.
#[derive(Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum PermissionLevel {
    Administrator,
    Moderator,
    #[default]
    Everyone,
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionLevel::Administrator => "administrator",
            PermissionLevel::Moderator => "moderator",
            PermissionLevel::Everyone => "everyone",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PermissionLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "administrator" | "admin" => Ok(PermissionLevel::Administrator),
            "moderator" | "mod" => Ok(PermissionLevel::Moderator),
            "everyone" => Ok(PermissionLevel::Everyone),
            _ => Err("Invalid permission level"),
        }
    }
}

pub fn is_owner(event: &ChatEvent, config: &BotConfig) -> bool {
    config.owners.contains(&event.author)
}

pub fn has_permission(event: &ChatEvent, required: PermissionLevel, config: &BotConfig) -> bool {
    // Owners pass everything
    if is_owner(event, config) {
        return true;
    }

    event.permission <= required
}
