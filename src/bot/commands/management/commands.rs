use crate::{
    bot::{
        commands::{commands::{BotResult, CommandContext}, registry::{CommandRegistry, Target}, ArgMap, ArgumentSpec, Command, Group},
        permissions::permissions::PermissionLevel,
        replies::keys,
        runtime::guild_lifecycle::persist_enabled,
    },
    cmd,
};

pub const GROUP: &str = "commands";

pub fn register(registry: &mut CommandRegistry) -> BotResult<()> {
    registry.register_group(Group::new(GROUP, "Commands").guarded())?;
    for command in [
        cmd!(enable_command(), "enable-command", "cmd-on"),
        cmd!(disable_command(), "disable-command", "cmd-off"),
        cmd!(groups_command(), "list-groups"),
        cmd!(unload_command(), "unload-command"),
    ] {
        registry.register_command(command)?;
    }
    Ok(())
}

fn target_arg() -> ArgumentSpec {
    ArgumentSpec::new("target", "string", keys::ARGS_PROMPT_COMMAND_OR_GROUP).label("command or group")
}

pub fn enable_command() -> Command {
    Command::new("enable", GROUP, |ctx, args| Box::pin(toggle(ctx, args, true)))
        .description("Enables a command or command group.")
        .example("enable util")
        .arg(target_arg())
        .permission(PermissionLevel::Administrator)
        .guarded()
}

pub fn disable_command() -> Command {
    Command::new("disable", GROUP, |ctx, args| Box::pin(toggle(ctx, args, false)))
        .description("Disables a command or command group.")
        .example("disable ping")
        .arg(target_arg())
        .permission(PermissionLevel::Administrator)
        .guarded()
}

async fn toggle(ctx: CommandContext, args: ArgMap, enable: bool) -> BotResult<()> {
    let name = args.text("target").unwrap_or_default().trim().to_string();
    let guild = ctx.event.guild.as_ref();

    let found = {
        let registry = ctx.state.registry.read().await;
        registry.find_target(&name).map(|target| {
            let current = registry.flag(&target, guild);
            let guarded = registry.is_guarded(&target);
            (target, current, guarded)
        })
    };
    let Some((target, current, guarded)) = found else {
        ctx.reply_key(keys::CMD_TARGET_UNKNOWN, &[name]).await;
        return Ok(());
    };
    let shown = target.name().to_string();

    if !enable && guarded {
        ctx.reply_key(keys::CMD_DISABLE_NOT_ALLOWED, &[shown]).await;
        return Ok(());
    }
    if current == enable {
        let key = if enable { keys::CMD_ENABLE_ALREADY_ENABLED } else { keys::CMD_DISABLE_ALREADY_DISABLED };
        ctx.reply_key(key, &[shown]).await;
        return Ok(());
    }

    persist_enabled(&ctx.state, target, guild, enable).await?;
    let key = if enable { keys::CMD_ENABLE_ENABLED } else { keys::CMD_DISABLE_DISABLED };
    ctx.reply_key(key, &[shown]).await;
    Ok(())
}

pub fn groups_command() -> Command {
    Command::new("groups", GROUP, |ctx, _args| {
        Box::pin(async move {
            let guild = ctx.event.guild.as_ref();
            let lines: Vec<String> = {
                let registry = ctx.state.registry.read().await;
                registry
                    .groups()
                    .iter()
                    .map(|g| {
                        let enabled = registry.flag(&Target::Group(g.id.clone()), guild);
                        format!("**{}:** {}", g.name, if enabled { "Enabled" } else { "Disabled" })
                    })
                    .collect()
            };
            ctx.reply_key(keys::CMD_GROUPS_LIST, &[lines.join("\n")]).await;
            Ok(())
        })
    })
    .description("Lists all command groups.")
    .permission(PermissionLevel::Administrator)
    .guarded()
}

pub fn unload_command() -> Command {
    Command::new("unload", GROUP, |ctx, args| Box::pin(unload(ctx, args)))
        .description("Unloads a command.")
        .example("unload ping")
        .arg(ArgumentSpec::new("command", "string", keys::ARGS_PROMPT_COMMAND))
        .owner_only()
        .guarded()
}

enum Unload {
    Unknown,
    Guarded(String),
    Done(String),
}

async fn unload(ctx: CommandContext, args: ArgMap) -> BotResult<()> {
    let name = args.text("command").unwrap_or_default().trim().to_string();

    let outcome = {
        let mut registry = ctx.state.registry.write().await;
        match registry.resolve(&name) {
            None => Unload::Unknown,
            Some(command) if command.guarded => Unload::Guarded(command.name.clone()),
            Some(command) => {
                registry.unregister_command(&command.name)?;
                Unload::Done(command.name.clone())
            }
        }
    };

    match outcome {
        Unload::Unknown => ctx.reply_key(keys::CMD_HELP_UNIDENTIFIED, &[name, ctx.prefix.clone()]).await,
        Unload::Guarded(command) => ctx.reply_key(keys::CMD_DISABLE_NOT_ALLOWED, &[command]).await,
        Unload::Done(command) => ctx.reply_key(keys::CMD_UNLOAD_UNLOADED, &[command]).await,
    };
    Ok(())
}
