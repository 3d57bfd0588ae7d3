use std::{collections::HashMap, sync::{atomic::{AtomicUsize, Ordering}, Arc}};

use chatdispatch::{
    bot::{
        chat_event::chat_event::{ChannelId, ChatEvent, GuildId, MessageId, RoleId, UserId},
        commands::{commands::BotResult, register_defaults, registry::CommandRegistry, ArgumentSpec, Command, Group},
        db::{open_pool, settings::{MemorySettings, SettingsProvider, SqliteSettings}},
        dispatcher::dispatcher::Dispatcher,
        handler::handler::ChatClient,
        permissions::permissions::PermissionLevel,
        replies::StringTable,
        run_event_loop,
        state::def::{AppState, BotConfig},
        types::{role::{Role, RoleDirectory, RoleType}, types::ArgValue},
    },
    cmd,
};
use futures::future::BoxFuture;
use tokio::{io::{AsyncBufReadExt, BufReader}, sync::mpsc::unbounded_channel};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CONSOLE_GUILD: &str = "console";
const CONSOLE_CHANNEL: &str = "console";

/// Prints outgoing messages to stdout.
struct ConsoleClient {
    next: AtomicUsize,
}

impl ChatClient for ConsoleClient {
    fn user_id(&self) -> UserId {
        UserId::new("bot")
    }

    fn send<'a>(&'a self, channel: &'a ChannelId, content: &'a str) -> BoxFuture<'a, BotResult<MessageId>> {
        Box::pin(async move {
            let id = MessageId::new(format!("r{}", self.next.fetch_add(1, Ordering::SeqCst)));
            println!("[{channel}] <bot:{id}> {content}");
            Ok(id)
        })
    }

    fn edit<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId, content: &'a str) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(async move {
            println!("[{channel}] <bot:{message} (edited)> {content}");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, channel: &'a ChannelId, message: &'a MessageId) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(async move {
            println!("[{channel}] <bot:{message} (deleted)>");
            Ok(())
        })
    }
}

struct ConsoleRoles;

impl RoleDirectory for ConsoleRoles {
    fn roles(&self, _guild: &GuildId) -> Vec<Role> {
        [("10", "Admin"), ("11", "Moderator"), ("12", "Member")]
            .into_iter()
            .map(|(id, name)| Role { id: RoleId::new(id), name: name.to_string() })
            .collect()
    }
}

fn math_commands(registry: &mut CommandRegistry) -> BotResult<()> {
    registry.register_group(Group::new("math", "Math"))?;

    let add = Command::new("add", "math", |ctx, args| {
        Box::pin(async move {
            let a = args.integer("a").unwrap_or_default();
            let b = args.integer("b").unwrap_or_default();
            ctx.reply(&format!("{a} + {b} = {}", a.saturating_add(b))).await;
            Ok(())
        })
    })
    .description("Adds two numbers.")
    .example("add 2 3")
    .arg(ArgumentSpec::new("a", "integer", "What is the first number?").label("first number"))
    .arg(ArgumentSpec::new("b", "integer", "What is the second number?").label("second number"))
    .throttle(3, 20);

    let sum = Command::new("sum", "math", |ctx, args| {
        Box::pin(async move {
            let total: i64 = args.list("numbers").unwrap_or_default().iter().filter_map(ArgValue::as_integer).sum();
            ctx.reply(&format!("The sum is {total}.")).await;
            Ok(())
        })
    })
    .description("Adds up to ten numbers.")
    .example("sum 1 2 3")
    .arg(ArgumentSpec::new("numbers", "integer", "Which numbers? Send them one per message.").label("number").infinite().max_items(10));

    let role = Command::new("role", "math", |ctx, args| {
        Box::pin(async move {
            if let Some(ArgValue::Role(role)) = args.get("role") {
                ctx.reply(&format!("{} has id {}.", role.name, role.id)).await;
            }
            Ok(())
        })
    })
    .description("Looks up a role by name or mention.")
    .arg(ArgumentSpec::new("role", "role", "Which role?"))
    .guild_only();

    registry.register_command(cmd!(add, "plus"))?;
    registry.register_command(sum)?;
    registry.register_command(role)?;
    Ok(())
}

async fn settings_provider() -> BotResult<Arc<dyn SettingsProvider>> {
    match std::env::var("CHATDISPATCH_DATABASE_URL") {
        Ok(url) => {
            let pool = open_pool(&url).await?;
            Ok(Arc::new(SqliteSettings::init(pool).await?))
        }
        Err(_) => Ok(Arc::new(MemorySettings::new())),
    }
}

#[tokio::main]
async fn main() -> BotResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = BotConfig::from_env()?;
    let mut registry = CommandRegistry::new();
    registry.register_type(Arc::new(RoleType::new(Arc::new(ConsoleRoles))))?;
    register_defaults(&mut registry)?;
    math_commands(&mut registry)?;

    let settings = settings_provider().await?;
    let client = Arc::new(ConsoleClient { next: AtomicUsize::new(0) });
    let state = Arc::new(AppState::new(config, registry, settings, Arc::new(StringTable::new()), client));
    let dispatcher = Dispatcher::new(state);

    let (tx, rx) = unbounded_channel::<ChatEvent>();
    let event_loop = tokio::spawn(run_event_loop(dispatcher, rx));

    info!("Type messages, `:edit <id> <text>` to edit one, `:quit` to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: HashMap<MessageId, ChatEvent> = HashMap::new();
    let mut counter = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line == ":quit" {
            break;
        }

        let event = if let Some(rest) = line.strip_prefix(":edit ") {
            let (id, text) = rest.trim_start().split_once(' ').unwrap_or((rest.trim(), ""));
            let Some(original) = history.get(&MessageId::new(id)) else {
                println!("No message with id {id}");
                continue;
            };
            original.edited(text)
        } else {
            let id = format!("m{counter}");
            counter += 1;
            println!("[{CONSOLE_CHANNEL}] <you:{id}> {line}");
            ChatEvent::new(id, CONSOLE_CHANNEL, "console-user", line)
                .in_guild(CONSOLE_GUILD)
                .with_permission(PermissionLevel::Administrator)
        };

        history.insert(event.id.clone(), event.clone());
        if tx.send(event).is_err() {
            break;
        }
    }

    drop(tx);
    match event_loop.await {
        Ok(result) => result,
        Err(e) => {
            error!("Event loop task failed: {e}");
            Ok(())
        }
    }
}
