use std::{collections::{HashMap, HashSet}, sync::Arc};

use tracing::{debug, info};

use crate::bot::{chat_event::chat_event::GuildId, commands::{commands::BotResult, Command, Group}, state::def::BotError, types::types::{ArgumentType, TypeRegistry}};

/// Something that can be enabled or disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Command(String),
    Group(String),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Command(name) | Target::Group(name) => name,
        }
    }
}

/// Owns every command and group definition, the argument types, and enable overrides.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<Command>>,
    /// Lowercased name or alias to lowercased command name.
    index: HashMap<String, String>,
    groups: Vec<Group>,
    types: TypeRegistry,
    overrides: HashMap<(Option<GuildId>, Target), bool>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::with_types(TypeRegistry::with_defaults())
    }

    pub fn with_types(types: TypeRegistry) -> Self {
        CommandRegistry {
            commands: HashMap::new(),
            index: HashMap::new(),
            groups: Vec::new(),
            types,
            overrides: HashMap::new(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn register_type(&mut self, ty: Arc<dyn ArgumentType>) -> BotResult<()> {
        self.types.register(ty)
    }

    pub fn register_group(&mut self, group: Group) -> BotResult<()> {
        if self.group(&group.id).is_some() {
            return Err(BotError::DuplicateName(format!("group {}", group.id)));
        }
        debug!("Registered group {}", group.id);
        self.groups.push(group);
        Ok(())
    }

    /// Fails without touching the registry when a name, alias, group, argument key or
    /// argument type is wrong.
    pub fn register_command(&mut self, command: Command) -> BotResult<Arc<Command>> {
        let group_id = command.group.to_lowercase();
        if self.group(&group_id).is_none() {
            return Err(BotError::UnknownGroup(command.group.clone()));
        }

        let mut names = Vec::with_capacity(command.aliases.len() + 1);
        for name in std::iter::once(&command.name).chain(command.aliases.iter()) {
            let name = name.to_lowercase();
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(BotError::Custom(format!("invalid command name `{name}`")));
            }
            if names.contains(&name) || self.index.contains_key(&name) {
                return Err(BotError::DuplicateName(name));
            }
            names.push(name);
        }

        let mut keys = HashSet::new();
        for (i, arg) in command.args.iter().enumerate() {
            if arg.infinite && i + 1 != command.args.len() {
                return Err(BotError::Custom(format!("infinite argument {} of {} must be the last one", arg.key, command.name)));
            }
            if !keys.insert(arg.key.as_str()) {
                return Err(BotError::DuplicateName(format!("argument {} of {}", arg.key, command.name)));
            }
            if !self.types.contains(&arg.type_id) {
                return Err(BotError::UnknownArgumentType { key: arg.key.clone(), type_id: arg.type_id.clone() });
            }
        }

        let key = names[0].clone();
        for name in names {
            self.index.insert(name, key.clone());
        }
        if let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) {
            group.commands.push(key.clone());
        }

        let command = Arc::new(command);
        self.commands.insert(key, command.clone());
        info!("Registered command {} in group {}", command.name, group_id);
        Ok(command)
    }

    /// Removes the command and every index entry pointing at it. Invocations already
    /// holding the returned `Arc` are unaffected.
    pub fn unregister_command(&mut self, name: &str) -> BotResult<Arc<Command>> {
        let key = name.to_lowercase();
        let command = self.commands.remove(&key).ok_or_else(|| BotError::UnknownCommand(name.to_string()))?;

        self.index.retain(|_, target| *target != key);
        for group in &mut self.groups {
            group.commands.retain(|c| *c != key);
        }
        self.overrides.retain(|(_, target), _| *target != Target::Command(key.clone()));

        info!("Unregistered command {}", command.name);
        Ok(command)
    }

    /// Case-insensitive exact match on name or alias.
    pub fn resolve(&self, name_or_alias: &str) -> Option<Arc<Command>> {
        let key = self.index.get(&name_or_alias.to_lowercase())?;
        self.commands.get(key).cloned()
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        let id = id.to_lowercase();
        self.groups.iter().find(|g| g.id == id)
    }

    /// Groups in registration order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn commands_in(&self, group: &str) -> Vec<Arc<Command>> {
        self.group(group)
            .map(|g| g.commands.iter().filter_map(|c| self.commands.get(c).cloned()).collect())
            .unwrap_or_default()
    }

    /// Commands take precedence over groups with the same name.
    pub fn find_target(&self, name: &str) -> Option<Target> {
        if let Some(command) = self.resolve(name) {
            return Some(Target::Command(command.name.to_lowercase()));
        }
        self.group(name).map(|g| Target::Group(g.id.clone()))
    }

    pub fn is_guarded(&self, target: &Target) -> bool {
        match target {
            Target::Command(name) => self.commands.get(name).map(|c| c.guarded).unwrap_or(false),
            Target::Group(id) => self.group(id).map(|g| g.guarded).unwrap_or(false),
        }
    }

    pub fn set_command_enabled(&mut self, name: &str, guild: Option<&GuildId>, enabled: bool) -> BotResult<()> {
        let command = self.resolve(name).ok_or_else(|| BotError::UnknownCommand(name.to_string()))?;
        self.set_enabled(Target::Command(command.name.to_lowercase()), guild, enabled)
    }

    pub fn set_group_enabled(&mut self, id: &str, guild: Option<&GuildId>, enabled: bool) -> BotResult<()> {
        let group = self.group(id).ok_or_else(|| BotError::UnknownGroup(id.to_string()))?;
        self.set_enabled(Target::Group(group.id.clone()), guild, enabled)
    }

    pub fn set_enabled(&mut self, target: Target, guild: Option<&GuildId>, enabled: bool) -> BotResult<()> {
        if !enabled && self.is_guarded(&target) {
            return Err(BotError::Guarded(target.name().to_string()));
        }
        debug!("Setting {:?} enabled={} for guild {:?}", target, enabled, guild);
        self.overrides.insert((guild.cloned(), target), enabled);
        Ok(())
    }

    /// Guild override, then global override, then enabled.
    pub fn flag(&self, target: &Target, guild: Option<&GuildId>) -> bool {
        if let Some(guild) = guild {
            if let Some(enabled) = self.overrides.get(&(Some(guild.clone()), target.clone())) {
                return *enabled;
            }
        }
        self.overrides.get(&(None, target.clone())).copied().unwrap_or(true)
    }

    /// A command is usable only when both it and its group are enabled. Guarded commands
    /// are always usable.
    pub fn is_enabled(&self, command: &Command, guild: Option<&GuildId>) -> bool {
        command.guarded
            || (self.flag(&Target::Command(command.name.to_lowercase()), guild)
                && self.flag(&Target::Group(command.group.to_lowercase()), guild))
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::commands::ArgumentSpec;

    fn command(name: &str) -> Command {
        Command::new(name, "math", |_ctx, _args| Box::pin(async move { Ok(()) }))
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register_group(Group::new("math", "Math")).unwrap();
        registry
    }

    #[test]
    fn resolves_names_and_aliases_case_insensitively() {
        let mut registry = registry();
        registry.register_command(command("add").alias("plus")).unwrap();

        assert_eq!(registry.resolve("ADD").unwrap().name, "add");
        assert_eq!(registry.resolve("Plus").unwrap().name, "add");
        assert!(registry.resolve("ad").is_none());
    }

    #[test]
    fn colliding_alias_fails_without_mutation() {
        let mut registry = registry();
        registry.register_command(command("add").alias("plus")).unwrap();

        let err = registry.register_command(command("sum").alias("PLUS")).unwrap_err();
        assert!(matches!(err, BotError::DuplicateName(name) if name == "plus"));
        assert!(registry.resolve("sum").is_none());
        assert_eq!(registry.group("math").unwrap().commands(), ["add".to_string()]);
    }

    #[test]
    fn self_colliding_aliases_are_rejected() {
        let mut registry = registry();
        let err = registry.register_command(command("add").alias("Add")).unwrap_err();
        assert!(matches!(err, BotError::DuplicateName(_)));
        assert!(registry.resolve("add").is_none());
    }

    #[test]
    fn unknown_group_and_type_are_rejected() {
        let mut registry = registry();
        let orphan = Command::new("x", "nope", |_ctx, _args| Box::pin(async move { Ok(()) }));
        assert!(matches!(registry.register_command(orphan), Err(BotError::UnknownGroup(_))));

        let bad_type = command("y").arg(ArgumentSpec::new("a", "colour", "a?"));
        assert!(matches!(registry.register_command(bad_type), Err(BotError::UnknownArgumentType { .. })));

        let dup_key = command("z").arg(ArgumentSpec::new("a", "integer", "a?")).arg(ArgumentSpec::new("a", "integer", "a?"));
        assert!(matches!(registry.register_command(dup_key), Err(BotError::DuplicateName(_))));
        assert!(registry.resolve("z").is_none());

        let early_infinite = command("w").arg(ArgumentSpec::new("a", "integer", "a?").infinite()).arg(ArgumentSpec::new("b", "integer", "b?"));
        assert!(registry.register_command(early_infinite).is_err());
    }

    #[test]
    fn duplicate_group_is_rejected() {
        let mut registry = registry();
        assert!(matches!(registry.register_group(Group::new("MATH", "Other")), Err(BotError::DuplicateName(_))));
    }

    #[test]
    fn unregister_removes_every_index_entry() {
        let mut registry = registry();
        registry.register_command(command("add").alias("plus")).unwrap();
        registry.set_command_enabled("add", None, false).unwrap();

        let removed = registry.unregister_command("add").unwrap();
        assert_eq!(removed.name, "add");
        assert!(registry.resolve("plus").is_none());
        assert!(registry.commands_in("math").is_empty());

        registry.register_command(command("add")).unwrap();
        let again = registry.resolve("add").unwrap();
        assert!(registry.is_enabled(&again, None));
    }

    #[test]
    fn guild_override_falls_back_to_global() {
        let mut registry = registry();
        let add = registry.register_command(command("add")).unwrap();
        let g1 = GuildId::new("g1");
        let g2 = GuildId::new("g2");

        registry.set_command_enabled("add", None, false).unwrap();
        registry.set_command_enabled("add", Some(&g1), true).unwrap();

        assert!(!registry.is_enabled(&add, None));
        assert!(registry.is_enabled(&add, Some(&g1)));
        assert!(!registry.is_enabled(&add, Some(&g2)));
    }

    #[test]
    fn disabled_group_disables_members() {
        let mut registry = registry();
        let add = registry.register_command(command("add")).unwrap();
        let g1 = GuildId::new("g1");

        registry.set_group_enabled("math", Some(&g1), false).unwrap();

        assert!(!registry.is_enabled(&add, Some(&g1)));
        assert!(registry.is_enabled(&add, None));
    }

    #[test]
    fn guarded_targets_cannot_be_disabled() {
        let mut registry = CommandRegistry::new();
        registry.register_group(Group::new("commands", "Commands").guarded()).unwrap();
        registry
            .register_command(Command::new("enable", "commands", |_ctx, _args| Box::pin(async move { Ok(()) })).guarded())
            .unwrap();

        assert!(matches!(registry.set_command_enabled("enable", None, false), Err(BotError::Guarded(_))));
        assert!(matches!(registry.set_group_enabled("commands", None, false), Err(BotError::Guarded(_))));
        assert!(registry.set_command_enabled("enable", None, true).is_ok());
    }

    #[test]
    fn find_target_prefers_commands() {
        let mut registry = registry();
        registry.register_command(command("add").alias("math")).unwrap();

        assert_eq!(registry.find_target("math"), Some(Target::Command("add".into())));
        assert_eq!(registry.find_target("nothing"), None);
    }
}
