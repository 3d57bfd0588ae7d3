use serde_json::Value;

use crate::{
    bot::{
        commands::{commands::{BotResult, CommandContext}, registry::CommandRegistry, ArgMap, ArgumentSpec, Command, Group},
        permissions::permissions::{has_permission, PermissionLevel},
        replies::keys,
        state::state::{LANG_SETTING, PREFIX_SETTING},
        types::types::ArgValue,
    },
    cmd,
};

pub const GROUP: &str = "util";

pub fn register(registry: &mut CommandRegistry) -> BotResult<()> {
    registry.register_group(Group::new(GROUP, "Utility"))?;
    for command in [cmd!(help_command(), "commands"), ping_command(), prefix_command(), cmd!(lang_command(), "language")] {
        registry.register_command(command)?;
    }
    Ok(())
}

fn optional_text(key: &str, prompt: &str) -> ArgumentSpec {
    ArgumentSpec::new(key, "string", prompt).default(ArgValue::Text(String::new()))
}

pub fn help_command() -> Command {
    Command::new("help", GROUP, |ctx, args| Box::pin(help(ctx, args)))
        .description("Lists the available commands, or shows details for one.")
        .example("help")
        .example("help prefix")
        .arg(optional_text("command", keys::ARGS_PROMPT_COMMAND).label("command"))
        .guarded()
}

async fn help(ctx: CommandContext, args: ArgMap) -> BotResult<()> {
    let wanted = args.text("command").unwrap_or_default().trim().to_string();
    let registry = ctx.state.registry.read().await;

    if wanted.is_empty() {
        let text = overview(&ctx, &registry);
        drop(registry);
        ctx.reply(&text).await;
        return Ok(());
    }

    let Some(command) = registry.resolve(&wanted) else {
        drop(registry);
        ctx.reply_key(keys::CMD_HELP_UNIDENTIFIED, &[wanted, ctx.prefix.clone()]).await;
        return Ok(());
    };

    let group = registry.group(&command.group).map(|g| g.name.clone()).unwrap_or_else(|| command.group.clone());
    drop(registry);

    let mut text = ctx.translate(
        keys::CMD_HELP_COMMAND,
        &[command.name.clone(), command.description.clone(), format!("`{}`", command.usage(&ctx.prefix)), group],
    );
    if !command.aliases.is_empty() {
        text.push('\n');
        text.push_str(&ctx.translate(keys::CMD_HELP_COMMAND_ALIASES, &[command.aliases.join(", ")]));
    }
    if let Some(details) = &command.details {
        text.push('\n');
        text.push_str(details);
    }
    if !command.examples.is_empty() {
        let examples: Vec<String> = command.examples.iter().map(|e| format!("`{}{e}`", ctx.prefix)).collect();
        text.push('\n');
        text.push_str(&examples.join("\n"));
    }
    ctx.reply(&text).await;
    Ok(())
}

/// Every group with the commands the caller could run here.
fn overview(ctx: &CommandContext, registry: &CommandRegistry) -> String {
    let guild = ctx.event.guild.as_ref();
    let owner = ctx.is_owner();
    let location = guild.map(|g| g.to_string()).unwrap_or_else(|| "this DM".to_string());

    let mut sections = vec![ctx.translate(keys::CMD_HELP_ALL, &[location])];
    for group in registry.groups() {
        let lines: Vec<String> = registry
            .commands_in(&group.id)
            .into_iter()
            .filter(|c| registry.is_enabled(c, guild) && (owner || !c.owner_only))
            .map(|c| format!("**{}:** {}", c.name, c.description))
            .collect();
        if !lines.is_empty() {
            sections.push(ctx.translate(keys::CMD_HELP_GROUP, &[group.name.clone(), format!("\n{}", lines.join("\n"))]));
        }
    }
    sections.join("\n\n")
}

pub fn ping_command() -> Command {
    Command::new("ping", GROUP, |ctx, _args| {
        Box::pin(async move {
            ctx.reply_key(keys::CMD_PING_RESPONSE, &[]).await;
            Ok(())
        })
    })
    .description("Checks that the bot is responding.")
    .throttle(5, 10)
}

pub fn prefix_command() -> Command {
    Command::new("prefix", GROUP, |ctx, args| Box::pin(prefix(ctx, args)))
        .description("Shows or sets the command prefix.")
        .details("Use `default` to go back to the configured prefix, or `none` to only react to mentions.")
        .example("prefix")
        .example("prefix ?")
        .arg(optional_text("prefix", keys::ARGS_PROMPT_PREFIX))
}

async fn prefix(ctx: CommandContext, args: ArgMap) -> BotResult<()> {
    let state = &ctx.state;
    let guild = ctx.event.guild.as_ref();
    let wanted = args.text("prefix").unwrap_or_default().trim().to_string();

    if wanted.is_empty() {
        let current = state.prefix_for(guild).await?;
        if current.is_empty() {
            ctx.reply_key(keys::CMD_PREFIX_MENTION_ONLY, &[]).await;
        } else {
            ctx.reply_key(keys::CMD_PREFIX_CURRENT, &[current]).await;
        }
        return Ok(());
    }

    if !has_permission(&ctx.event, PermissionLevel::Administrator, &state.config) {
        ctx.reply_key(keys::CMD_PREFIX_ADMIN_ONLY, &[]).await;
        return Ok(());
    }

    match wanted.to_lowercase().as_str() {
        "default" => {
            state.settings.remove(guild, PREFIX_SETTING).await?;
            let current = state.prefix_for(guild).await?;
            ctx.reply_key(keys::CMD_PREFIX_RESET, &[current]).await;
        }
        "none" => {
            state.settings.set(guild, PREFIX_SETTING, Value::String(String::new())).await?;
            ctx.reply_key(keys::CMD_PREFIX_MENTION_ONLY, &[]).await;
        }
        _ => {
            state.settings.set(guild, PREFIX_SETTING, Value::String(wanted.clone())).await?;
            ctx.reply_key(keys::CMD_PREFIX_SET, &[wanted]).await;
        }
    }
    Ok(())
}

pub fn lang_command() -> Command {
    Command::new("lang", GROUP, |ctx, args| Box::pin(lang(ctx, args)))
        .description("Shows or sets the language of the bot's replies.")
        .example("lang fr")
        .arg(optional_text("locale", keys::ARGS_PROMPT_LANGUAGE))
}

async fn lang(ctx: CommandContext, args: ArgMap) -> BotResult<()> {
    let state = &ctx.state;
    let guild = ctx.event.guild.as_ref();
    let wanted = args.text("locale").unwrap_or_default().trim().to_lowercase();

    if wanted.is_empty() {
        ctx.reply_key(keys::CMD_LANG_CURRENT, &[ctx.locale.clone()]).await;
        return Ok(());
    }

    if !has_permission(&ctx.event, PermissionLevel::Administrator, &state.config) {
        ctx.reply_key(keys::CMD_LANG_ADMIN_ONLY, &[]).await;
        return Ok(());
    }

    if wanted == "default" {
        state.settings.remove(guild, LANG_SETTING).await?;
        let current = state.locale_for(guild).await?;
        let text = state.translate(&current, keys::CMD_LANG_RESET, &[current.clone()]);
        ctx.reply(&text).await;
    } else if !state.translator.has_locale(&wanted) {
        let available = state.translator.locales().iter().map(|l| format!("`{l}`")).collect::<Vec<_>>().join(", ");
        ctx.reply_key(keys::CMD_LANG_UNKNOWN, &[wanted, available]).await;
    } else {
        state.settings.set(guild, LANG_SETTING, Value::String(wanted.clone())).await?;
        let text = state.translate(&wanted, keys::CMD_LANG_SET, &[wanted.clone()]);
        ctx.reply(&text).await;
    }
    Ok(())
}
