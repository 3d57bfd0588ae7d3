use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::future::BoxFuture;

use crate::bot::{commands::{commands::{BotResult, CommandAction, CommandContext, FnCommand}, registry::CommandRegistry}, permissions::permissions::PermissionLevel, types::types::{ArgContext, ArgValue, Validation}};

pub mod commands;
pub mod registry;
pub mod util;
pub mod management;

/// Registers the `util` and `commands` groups with their built-in commands.
pub fn register_defaults(registry: &mut CommandRegistry) -> BotResult<()> {
    util::commands::register(registry)?;
    management::commands::register(registry)
}

/// Extra check run after the type accepted a raw value.
pub type ArgPredicate = Arc<dyn Fn(&str, &ArgContext<'_>) -> Validation + Send + Sync>;

/// One declared argument of a command.
#[derive(Clone)]
pub struct ArgumentSpec {
    pub key: String,
    /// Human name used in error messages.
    pub label: String,
    /// Translation key or literal text.
    pub prompt: String,
    pub type_id: String,
    pub default: Option<ArgValue>,
    /// Allowed values, compared case-insensitively with the parsed value's display form.
    pub one_of: Option<Vec<String>>,
    pub validator: Option<ArgPredicate>,
    pub infinite: bool,
    pub max_attempts: Option<usize>,
    pub max_items: Option<usize>,
    pub allow_empty: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ArgumentSpec {
    pub fn new(key: impl Into<String>, type_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let key = key.into();
        ArgumentSpec {
            label: key.clone(),
            key,
            prompt: prompt.into(),
            type_id: type_id.into(),
            default: None,
            one_of: None,
            validator: None,
            infinite: false,
            max_attempts: None,
            max_items: None,
            allow_empty: false,
            min: None,
            max: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn default(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn one_of<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = Some(options.into_iter().map(|o| o.into().to_lowercase()).collect());
        self
    }

    pub fn validator<F>(mut self, check: F) -> Self
    where
        F: Fn(&str, &ArgContext<'_>) -> Validation + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(check));
        self
    }

    pub fn infinite(mut self) -> Self {
        self.infinite = true;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn max_items(mut self, items: usize) -> Self {
        self.max_items = Some(items);
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttling {
    pub usages: u32,
    pub duration: Duration,
}

/// Immutable command definition. Enable state lives in the registry.
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub group: String,
    pub description: String,
    pub details: Option<String>,
    pub examples: Vec<String>,
    pub args: Vec<ArgumentSpec>,
    pub owner_only: bool,
    pub guild_only: bool,
    pub nsfw_only: bool,
    /// Cannot be disabled.
    pub guarded: bool,
    pub permission: PermissionLevel,
    pub throttling: Option<Throttling>,
    action: Arc<dyn CommandAction>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new<F>(name: impl Into<String>, group: impl Into<String>, func: F) -> Self
    where
        F: Fn(CommandContext, ArgMap) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
    {
        Self::with_action(name, group, Arc::new(FnCommand::new(func)))
    }

    pub fn with_action(name: impl Into<String>, group: impl Into<String>, action: Arc<dyn CommandAction>) -> Self {
        Command {
            name: name.into(),
            aliases: Vec::new(),
            group: group.into(),
            description: String::new(),
            details: None,
            examples: Vec::new(),
            args: Vec::new(),
            owner_only: false,
            guild_only: false,
            nsfw_only: false,
            guarded: false,
            permission: PermissionLevel::Everyone,
            throttling: None,
            action,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn arg(mut self, spec: ArgumentSpec) -> Self {
        self.args.push(spec);
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn nsfw_only(mut self) -> Self {
        self.nsfw_only = true;
        self
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    pub fn permission(mut self, level: PermissionLevel) -> Self {
        self.permission = level;
        self
    }

    pub fn throttle(mut self, usages: u32, seconds: u64) -> Self {
        self.throttling = Some(Throttling { usages, duration: Duration::from_secs(seconds) });
        self
    }

    pub fn action(&self) -> Arc<dyn CommandAction> {
        self.action.clone()
    }

    /// `!add <a> <b>`, optional arguments in brackets, infinite ones with an ellipsis.
    pub fn usage(&self, prefix: &str) -> String {
        let mut out = format!("{prefix}{}", self.name);
        for arg in &self.args {
            let label = if arg.infinite { format!("{}...", arg.label) } else { arg.label.clone() };
            if arg.default.is_some() || arg.allow_empty {
                out.push_str(&format!(" [{label}]"));
            } else {
                out.push_str(&format!(" <{label}>"));
            }
        }
        out
    }
}

pub struct Group {
    pub id: String,
    pub name: String,
    /// Cannot be disabled.
    pub guarded: bool,
    pub(crate) commands: Vec<String>,
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Group { id: id.into().to_lowercase(), name: name.into(), guarded: false, commands: Vec::new() }
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    /// Member command names in registration order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

/// Typed argument values of one invocation, by argument key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgMap {
    values: HashMap<String, ArgValue>,
}

impl ArgMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ArgValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ArgValue::as_str)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ArgValue::as_integer)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ArgValue::as_float)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ArgValue::as_bool)
    }

    pub fn list(&self, key: &str) -> Option<&[ArgValue]> {
        self.get(key).and_then(ArgValue::as_list)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
