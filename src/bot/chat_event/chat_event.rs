use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bot::permissions::permissions::PermissionLevel;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(concat!("empty ", stringify!($name)));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type!(MessageId);
id_type!(ChannelId);
id_type!(GuildId);
id_type!(UserId);
id_type!(RoleId);

/// A message as delivered by the transport, either freshly sent or edited.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub id: MessageId,
    pub channel: ChannelId,
    /// `None` for direct messages.
    pub guild: Option<GuildId>,
    pub author: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    /// Sent by the bot account itself.
    pub own_message: bool,
    pub nsfw: bool,
    pub permission: PermissionLevel,
}

impl ChatEvent {
    pub fn new(id: impl Into<String>, channel: impl Into<String>, author: impl Into<String>, content: impl Into<String>) -> Self {
        ChatEvent {
            id: MessageId::new(id),
            channel: ChannelId::new(channel),
            guild: None,
            author: UserId::new(author),
            content: content.into(),
            timestamp: Utc::now(),
            edited_timestamp: None,
            own_message: false,
            nsfw: false,
            permission: PermissionLevel::Everyone,
        }
    }

    pub fn in_guild(mut self, guild: impl Into<String>) -> Self {
        self.guild = Some(GuildId::new(guild));
        self
    }

    pub fn with_permission(mut self, permission: PermissionLevel) -> Self {
        self.permission = permission;
        self
    }

    pub fn nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    /// Returns the same message with new content, stamped as edited now.
    pub fn edited(&self, content: impl Into<String>) -> Self {
        let mut edited = self.clone();
        edited.content = content.into();
        edited.edited_timestamp = Some(Utc::now());
        edited
    }

    pub fn is_edit(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    pub fn is_direct(&self) -> bool {
        self.guild.is_none()
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.channel.clone(), self.author.clone())
    }
}

/// Conversation slot an argument collection is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub channel: ChannelId,
    pub user: UserId,
}

impl SessionKey {
    pub fn new(channel: ChannelId, user: UserId) -> Self {
        Self { channel, user }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.user)
    }
}
