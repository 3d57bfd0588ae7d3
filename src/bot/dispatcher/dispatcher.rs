use std::{any::Any, panic::AssertUnwindSafe, sync::{atomic::{AtomicU64, Ordering}, Arc}};

use dashmap::DashMap;
use futures::FutureExt;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, error, info, warn};

use crate::bot::{
    chat_event::chat_event::{ChatEvent, SessionKey, UserId},
    collector::collector::{CancelReason, CollectionSession, CollectorConfig, Step, Turn},
    commands::{commands::{BotResult, CommandContext}, ArgMap, Command},
    dispatcher::links::{ResponseLink, ResponseLinks},
    handler::handler::{send_logged, Responder},
    permissions::permissions::{has_permission, is_owner},
    replies::keys,
    runtime::guild_lifecycle::prepare_guild,
    state::def::AppState,
    throttle::throttle::ThrottleOutcome,
};

/// Command token and the text after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub rest: String,
    /// No prefix or mention was used; only valid in direct messages.
    pub bare: bool,
}

/// Recognises `<prefix>name rest`, `<@bot> name rest` and `<@!bot> name rest`. In direct
/// messages the bare `name rest` form is returned too, flagged as such.
pub fn parse_invocation(content: &str, prefix: &str, bot: &UserId, direct: bool) -> Option<Invocation> {
    let content = content.trim_start();
    let mentions = [format!("<@{bot}>"), format!("<@!{bot}>")];

    let (body, bare) = if let Some(rest) = mentions.iter().find_map(|m| content.strip_prefix(m.as_str())) {
        (rest, false)
    } else if !prefix.is_empty() && content.get(..prefix.len()).is_some_and(|p| p.eq_ignore_ascii_case(prefix)) {
        (&content[prefix.len()..], false)
    } else if direct {
        (content, true)
    } else {
        return None;
    };

    let body = body.trim_start();
    let (name, rest) = match body.find(char::is_whitespace) {
        Some(split) => (&body[..split], body[split..].trim_start()),
        None => (body, ""),
    };
    if name.is_empty() {
        return None;
    }

    Some(Invocation { name: name.to_string(), rest: rest.to_string(), bare })
}

/// A collection waiting for its next answer. The timeout task only fires while `serial`
/// still matches the parked entry.
struct PendingSession {
    session: CollectionSession,
    ctx: CommandContext,
    serial: u64,
    timeout: JoinHandle<()>,
}

/// Turns chat messages into command runs: prefix and command resolution, guards,
/// throttling, argument collection, and re-running edited command messages.
pub struct Dispatcher {
    state: Arc<AppState>,
    collector: CollectorConfig,
    sessions: DashMap<SessionKey, PendingSession>,
    serial: AtomicU64,
    links: ResponseLinks,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>) -> Arc<Self> {
        Arc::new(Dispatcher {
            collector: CollectorConfig::from(state.config.as_ref()),
            state,
            sessions: DashMap::new(),
            serial: AtomicU64::new(0),
            links: ResponseLinks::new(),
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Applies the global enable/disable overrides before the first message.
    pub async fn init(&self) -> BotResult<()> {
        prepare_guild(self.state.clone(), None).await
    }

    pub fn pending_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn has_session(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn links(&self) -> &ResponseLinks {
        &self.links
    }

    pub async fn handle_message(self: &Arc<Self>, event: ChatEvent) -> BotResult<()> {
        if event.own_message {
            return Ok(());
        }
        if event.is_edit() {
            return self.handle_edit(event).await;
        }
        if self.route_to_session(&event).await {
            return Ok(());
        }
        self.dispatch(event, None).await
    }

    /// Feeds the message to the session parked in its slot, if any. The answer is
    /// evaluated here, before the next event is looked at, so a session never holds on to
    /// messages past the one that completes it.
    async fn route_to_session(self: &Arc<Self>, event: &ChatEvent) -> bool {
        let key = event.session_key();
        let Some((_, mut pending)) = self.sessions.remove(&key) else {
            return false;
        };
        pending.timeout.abort();

        let step = {
            let turn = Turn { event, translator: &*self.state.translator, locale: &pending.ctx.locale, config: &self.collector };
            pending.session.feed(&turn)
        };
        match step {
            Step::Prompt(text) => {
                let ctx = pending.ctx.clone();
                self.park(pending.session, pending.ctx);
                ctx.reply(&text).await;
            }
            Step::Awaiting => self.park(pending.session, pending.ctx),
            done => self.conclude(pending.ctx, done).await,
        }
        true
    }

    async fn handle_edit(self: &Arc<Self>, event: ChatEvent) -> BotResult<()> {
        if let Some(link) = self.links.get(&event.id) {
            if link.content == event.content {
                debug!("Edit of {} left the content unchanged", event.id);
                return Ok(());
            }
            if let Some((_, superseded)) = self.sessions.remove_if(&event.session_key(), |_, pending| pending.session.origin() == &event.id) {
                superseded.timeout.abort();
                debug!("Dropped the session started by {}", event.id);
            }
            debug!("Re-running edited command message {}", event.id);
            return self.dispatch(event, Some(link)).await;
        }

        if !self.state.config.non_command_editable {
            return Ok(());
        }
        let Some(edited) = event.edited_timestamp else {
            return Ok(());
        };
        // A negative age only happens with clock skew; treat it as fresh.
        let in_window = (edited - event.timestamp).to_std().map(|age| age <= self.state.config.editable_window()).unwrap_or(true);
        if in_window {
            self.dispatch(event, None).await
        } else {
            debug!("Ignoring edit of {} outside the edit window", event.id);
            Ok(())
        }
    }

    async fn dispatch(self: &Arc<Self>, event: ChatEvent, link: Option<ResponseLink>) -> BotResult<()> {
        let state = &self.state;
        let guild = event.guild.clone();
        if guild.is_some() {
            prepare_guild(state.clone(), guild.as_ref()).await?;
        }

        let prefix = state.prefix_for(guild.as_ref()).await?;
        let bot = state.chat_client.user_id();
        let Some(invocation) = parse_invocation(&event.content, &prefix, &bot, event.is_direct()) else {
            self.retract(&event, link).await;
            return Ok(());
        };

        let command = state.registry.read().await.resolve(&invocation.name);
        if invocation.bare && command.is_none() {
            self.retract(&event, link).await;
            return Ok(());
        }

        let prior = link.map(|l| l.responses()).unwrap_or_default();
        let responder = Arc::new(Responder::with_prior(state.chat_client.clone(), event.channel.clone(), prior));
        self.links.record(event.id.clone(), responder.clone(), event.content.clone(), state.config.editable_window());

        let locale = state.locale_for(guild.as_ref()).await?;
        let shown_prefix = if prefix.is_empty() { format!("<@{bot}> ") } else { prefix.clone() };

        let Some(command) = command else {
            debug!("Unknown command {} from {}", invocation.name, event.author);
            if state.config.unknown_command_response {
                responder.reply(&state.translate(&locale, keys::UNKNOWN_COMMAND, &[shown_prefix])).await;
            }
            return Ok(());
        };

        let ctx = CommandContext::new(event, state.clone(), command.clone(), locale, shown_prefix, responder);

        if let Some((key, params)) = self.check_guards(&command, &ctx.event).await {
            debug!("{} denied to {}: {}", command.name, ctx.event.author, key);
            ctx.reply_key(key, &params).await;
            return Ok(());
        }

        if let Some(policy) = &command.throttling {
            if !ctx.is_owner() {
                if let ThrottleOutcome::Throttled { remaining } = state.throttles.check(&command.name, &ctx.event.author, policy) {
                    let wait = format!("{:.1}", remaining.as_secs_f64());
                    ctx.reply_key(keys::THROTTLED, &[command.name.clone(), wait]).await;
                    return Ok(());
                }
            }
        }

        let mut session = {
            let registry = state.registry.read().await;
            CollectionSession::new(command.clone(), &registry, ctx.event.id.clone())?
        };
        let step = {
            let turn = Turn { event: &ctx.event, translator: &*state.translator, locale: &ctx.locale, config: &self.collector };
            session.start(&invocation.rest, &turn)
        };

        match step {
            Step::Prompt(text) => {
                let reply = ctx.clone();
                self.park(session, ctx);
                reply.reply(&text).await;
            }
            Step::Awaiting => self.park(session, ctx),
            done => self.conclude(ctx, done).await,
        }
        Ok(())
    }

    /// A linked message was edited into something that is no longer a command: its
    /// earlier responses are deleted and the link is dropped.
    async fn retract(&self, event: &ChatEvent, link: Option<ResponseLink>) {
        let Some(link) = link else {
            return;
        };
        self.links.remove(&event.id);
        debug!("{} is no longer a command, removing its responses", event.id);

        for response in link.responses() {
            if let Err(e) = self.state.chat_client.delete(&event.channel, &response).await {
                warn!("Could not delete response {response}: {e}");
            }
        }
    }

    /// First failing guard as a reply key with its parameters.
    async fn check_guards(&self, command: &Command, event: &ChatEvent) -> Option<(&'static str, Vec<String>)> {
        let config = &self.state.config;
        let name = command.name.clone();

        if command.owner_only && !is_owner(event, config) {
            return Some((keys::DENIED_OWNER_ONLY, vec![name]));
        }
        if command.guild_only && event.is_direct() {
            return Some((keys::DENIED_GUILD_ONLY, vec![name]));
        }
        if command.nsfw_only && !event.nsfw {
            return Some((keys::DENIED_NSFW_ONLY, vec![name]));
        }
        if !has_permission(event, command.permission, config) {
            return Some((keys::DENIED_PERMISSION, vec![name, command.permission.to_string()]));
        }
        if !self.state.registry.read().await.is_enabled(command, event.guild.as_ref()) {
            return Some((keys::DENIED_DISABLED, vec![name]));
        }
        None
    }

    /// Parks the session in its (channel, user) slot until the next message there or the
    /// prompt timeout. A session already in the slot is dropped and ends silently.
    fn park(self: &Arc<Self>, session: CollectionSession, ctx: CommandContext) {
        let key = ctx.event.session_key();
        let serial = self.serial.fetch_add(1, Ordering::Relaxed);
        debug!("Waiting for {} to answer {}", key, ctx.command.name);

        let timeout = self.arm_timeout(key.clone(), serial);
        if let Some(replaced) = self.sessions.insert(key, PendingSession { session, ctx, serial, timeout }) {
            replaced.timeout.abort();
        }
    }

    fn arm_timeout(self: &Arc<Self>, key: SessionKey, serial: u64) -> JoinHandle<()> {
        let dispatcher = self.clone();
        let wait = self.collector.prompt_timeout;
        tokio::spawn(async move {
            sleep(wait).await;
            let Some((_, mut pending)) = dispatcher.sessions.remove_if(&key, |_, pending| pending.serial == serial) else {
                return;
            };
            let step = pending.session.cancel(CancelReason::Timeout);
            dispatcher.conclude(pending.ctx, step).await;
        })
    }

    /// Runs or acknowledges a finished collection.
    async fn conclude(&self, ctx: CommandContext, step: Step) {
        match step {
            Step::Complete(args) => self.execute(ctx, args).await,
            Step::Cancelled(reason) => self.acknowledge(&ctx, &reason).await,
            Step::Prompt(_) | Step::Awaiting => {}
        }
    }

    async fn acknowledge(&self, ctx: &CommandContext, reason: &CancelReason) {
        let Some(key) = reason.reply_key() else {
            return;
        };
        let params = match reason {
            CancelReason::TooManyAttempts { key } => {
                let label = ctx.command.args.iter().find(|a| &a.key == key).map(|a| a.label.clone());
                vec![label.unwrap_or_else(|| key.clone())]
            }
            _ => Vec::new(),
        };
        ctx.reply_key(key, &params).await;
    }

    /// Runs the action. Errors and panics are contained here: the user gets a generic
    /// reply and the operator channel gets the details.
    async fn execute(&self, ctx: CommandContext, args: ArgMap) {
        let command = ctx.command.clone();
        info!("Running {} for {} in {}", command.name, ctx.event.author, ctx.event.channel);

        let outcome = AssertUnwindSafe(command.action().run(ctx.clone(), args)).catch_unwind().await;
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        error!("Command {} failed for {}: {failure}", command.name, ctx.event.author);
        ctx.reply_key(keys::COMMAND_ERROR, &[]).await;

        if let Some(channel) = &self.state.config.error_channel {
            let report = ctx.translate(
                keys::COMMAND_ERROR_REPORT,
                &[command.name.clone(), ctx.event.channel.to_string(), ctx.event.author.to_string(), failure],
            );
            send_logged(self.state.chat_client.as_ref(), channel, &report).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
