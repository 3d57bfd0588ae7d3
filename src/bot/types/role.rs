use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::bot::{chat_event::chat_event::{GuildId, RoleId}, commands::{commands::BotResult, ArgumentSpec}, replies::keys, state::def::BotError, types::types::{ArgContext, ArgValue, ArgumentType, Validation}};

static ROLE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:<@&)?([0-9]+)>?$").expect("valid regex"));

/// Longest disambiguation list shown before asking for a more specific query.
const MAX_LISTED: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// Guild role lookup provided by the transport.
pub trait RoleDirectory: Send + Sync {
    /// Roles in the guild's display order.
    fn roles(&self, guild: &GuildId) -> Vec<Role>;
}

/// Resolves a role by mention, id, or (partial) name.
pub struct RoleType {
    directory: Arc<dyn RoleDirectory>,
}

impl RoleType {
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        Self { directory }
    }

    fn candidates(&self, raw: &str, ctx: &ArgContext<'_>) -> Lookup {
        let Some(guild) = &ctx.event.guild else {
            return Lookup::None;
        };
        let roles = self.directory.roles(guild);

        if let Some(id) = ROLE_MENTION.captures(raw.trim()).and_then(|c| c.get(1)) {
            return match roles.into_iter().find(|r| r.id.as_str() == id.as_str()) {
                Some(role) => Lookup::One(role),
                None => Lookup::None,
            };
        }

        let search = raw.trim().to_lowercase();
        let mut inexact: Vec<Role> = roles.into_iter().filter(|r| r.name.to_lowercase().contains(&search)).collect();
        match inexact.len() {
            0 => return Lookup::None,
            1 => return Lookup::One(inexact.remove(0)),
            _ => {}
        }

        let mut exact: Vec<Role> = inexact.iter().filter(|r| r.name.to_lowercase() == search).cloned().collect();
        match exact.len() {
            1 => Lookup::One(exact.remove(0)),
            0 => Lookup::Many(inexact),
            _ => Lookup::Many(exact),
        }
    }
}

enum Lookup {
    None,
    One(Role),
    Many(Vec<Role>),
}

fn allowed(role: &Role, arg: &ArgumentSpec) -> bool {
    match &arg.one_of {
        Some(options) => options.iter().any(|o| o == role.id.as_str()),
        None => true,
    }
}

/// Formats matches in the order given, so the list a user sees is reproducible.
pub fn disambiguation(items: &[String], label: &str, ctx: &ArgContext<'_>) -> String {
    let listed: Vec<String> = items.iter().map(|i| format!("\"{i}\"")).collect();
    ctx.translate(keys::ARG_DISAMBIGUATION, &[label.to_string(), listed.join(", ")])
}

impl ArgumentType for RoleType {
    fn id(&self) -> &str { "role" }

    fn validate(&self, raw: &str, ctx: &ArgContext<'_>, arg: &ArgumentSpec) -> Validation {
        match self.candidates(raw, ctx) {
            Lookup::None => Validation::Invalid,
            Lookup::One(role) => allowed(&role, arg).into(),
            Lookup::Many(roles) if roles.len() <= MAX_LISTED => {
                let names: Vec<String> = roles.iter().map(|r| r.name.clone()).collect();
                Validation::Message(disambiguation(&names, "roles", ctx))
            }
            Lookup::Many(_) => Validation::Message(ctx.translate(keys::ARG_TOO_MANY_MATCHES, &["roles".to_string()])),
        }
    }

    fn parse(&self, raw: &str, ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> BotResult<ArgValue> {
        match self.candidates(raw, ctx) {
            Lookup::One(role) => Ok(ArgValue::Role(role)),
            _ => Err(BotError::InvalidArgument(format!("{raw} does not name a single role"))),
        }
    }
}
