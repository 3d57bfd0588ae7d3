use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::bot::{chat_event::chat_event::{ChatEvent, MessageId}, collector::tokenizer::{remainder, tokenize}, commands::{commands::BotResult, registry::CommandRegistry, ArgMap, ArgumentSpec, Command}, replies::{keys, Translator}, state::def::{BotConfig, BotError}, types::types::{ArgContext, ArgValue, ArgumentType, Validation}};

/// Knobs shared by every collection.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub cancel_keyword: String,
    pub finish_keyword: String,
    /// Applies to arguments without their own limit; `None` retries forever.
    pub max_attempts: Option<usize>,
    pub prompt_timeout: Duration,
}

impl From<&BotConfig> for CollectorConfig {
    fn from(config: &BotConfig) -> Self {
        CollectorConfig {
            cancel_keyword: config.cancel_keyword.clone(),
            finish_keyword: config.finish_keyword.clone(),
            max_attempts: config.max_attempts,
            prompt_timeout: config.prompt_window(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig::from(&BotConfig::default())
    }
}

/// The message being looked at plus what is needed to phrase prompts.
pub struct Turn<'a> {
    pub event: &'a ChatEvent,
    pub translator: &'a dyn Translator,
    pub locale: &'a str,
    pub config: &'a CollectorConfig,
}

impl<'a> Turn<'a> {
    fn arg_context(&self) -> ArgContext<'a> {
        ArgContext { event: self.event, translator: self.translator, locale: self.locale }
    }

    fn translate(&self, key: &str, params: &[String]) -> String {
        self.translator.translate(self.locale, key, params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The cancellation keyword was sent.
    User,
    Timeout,
    TooManyAttempts { key: String },
    /// Replaced by a re-run of the edited source message.
    Superseded,
}

impl CancelReason {
    pub fn reply_key(&self) -> Option<&'static str> {
        match self {
            CancelReason::User => Some(keys::PROMPT_CANCELLED),
            CancelReason::Timeout => Some(keys::PROMPT_TIMED_OUT),
            CancelReason::TooManyAttempts { .. } => Some(keys::PROMPT_TOO_MANY_ATTEMPTS),
            CancelReason::Superseded => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Send this text and wait for the next message in the slot.
    Prompt(String),
    /// Wait for the next message without saying anything.
    Awaiting,
    Complete(ArgMap),
    Cancelled(CancelReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Collecting,
    Complete,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
enum Provided {
    #[default]
    Nothing,
    One(String),
    Many(Vec<String>),
}

/// Resolves a command's arguments one after another, possibly over several messages.
pub struct CollectionSession {
    command: Arc<Command>,
    types: Vec<Arc<dyn ArgumentType>>,
    origin: MessageId,
    provided: Vec<Provided>,
    index: usize,
    values: ArgMap,
    attempts: usize,
    items: Vec<ArgValue>,
    state: SessionState,
}

impl CollectionSession {
    pub fn new(command: Arc<Command>, registry: &CommandRegistry, origin: MessageId) -> BotResult<Self> {
        let types = command
            .args
            .iter()
            .map(|arg| {
                registry.types().get(&arg.type_id).ok_or_else(|| BotError::UnknownArgumentType {
                    key: arg.key.clone(),
                    type_id: arg.type_id.clone(),
                })
            })
            .collect::<BotResult<Vec<_>>>()?;

        Ok(CollectionSession {
            provided: vec![Provided::Nothing; command.args.len()],
            command,
            types,
            origin,
            index: 0,
            values: ArgMap::new(),
            attempts: 0,
            items: Vec::new(),
            state: SessionState::Collecting,
        })
    }

    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    pub fn origin(&self) -> &MessageId {
        &self.origin
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == SessionState::Cancelled
    }

    /// Key of the argument currently being resolved.
    pub fn current_key(&self) -> Option<&str> {
        self.command.args.get(self.index).map(|a| a.key.as_str())
    }

    /// Distributes the text after the command name over the declared arguments, then
    /// resolves as far as it can without asking.
    pub fn start(&mut self, input: &str, turn: &Turn<'_>) -> Step {
        let tokens = tokenize(input);
        let count = self.command.args.len();
        let mut pos = 0;

        for (i, arg) in self.command.args.iter().enumerate() {
            self.provided[i] = if arg.infinite {
                let rest: Vec<String> = tokens[pos.min(tokens.len())..].iter().map(|t| t.value.clone()).collect();
                pos = tokens.len();
                if rest.is_empty() { Provided::Nothing } else { Provided::Many(rest) }
            } else if i + 1 == count {
                let rest = remainder(input, &tokens, pos);
                pos = tokens.len();
                rest.map(Provided::One).unwrap_or_default()
            } else {
                let next = tokens.get(pos).map(|t| t.value.clone());
                pos += 1;
                next.map(Provided::One).unwrap_or_default()
            };
        }

        self.advance(turn)
    }

    /// Handles the next message in this session's slot.
    pub fn feed(&mut self, turn: &Turn<'_>) -> Step {
        if self.state != SessionState::Collecting {
            return Step::Cancelled(CancelReason::Superseded);
        }

        let answer = turn.event.content.trim();
        if answer.eq_ignore_ascii_case(turn.config.cancel_keyword.trim()) {
            return self.cancel(CancelReason::User);
        }

        let command = self.command.clone();
        let Some(arg) = command.args.get(self.index) else {
            return self.advance(turn);
        };

        if arg.infinite {
            if answer.is_empty() || answer.eq_ignore_ascii_case(turn.config.finish_keyword.trim()) {
                if self.items.is_empty() && !arg.allow_empty {
                    let empty = turn.translate(keys::PROMPT_INFINITE_EMPTY, &[arg.label.clone()]);
                    return Step::Prompt(format!("{empty}\n{}", infinite_hint(turn)));
                }
                self.finish_list(arg);
                return self.advance(turn);
            }

            return match self.evaluate(answer, turn) {
                Ok(value) => {
                    self.items.push(value);
                    self.attempts = 0;
                    if arg.max_items.is_some_and(|max| self.items.len() >= max) {
                        self.finish_list(arg);
                        self.advance(turn)
                    } else if matches!(self.provided[self.index], Provided::Many(_)) {
                        // a replacement for a bad inline item: carry on with the ones after it
                        self.advance(turn)
                    } else {
                        Step::Awaiting
                    }
                }
                Err(message) => self.reject(arg, answer, message, turn),
            };
        }

        if answer.is_empty() {
            return self.reject(arg, answer, None, turn);
        }
        match self.evaluate(answer, turn) {
            Ok(value) => {
                self.store(arg, value);
                self.advance(turn)
            }
            Err(message) => self.reject(arg, answer, message, turn),
        }
    }

    pub fn cancel(&mut self, reason: CancelReason) -> Step {
        debug!("Collection for {} cancelled: {:?}", self.command.name, reason);
        self.state = SessionState::Cancelled;
        Step::Cancelled(reason)
    }

    fn advance(&mut self, turn: &Turn<'_>) -> Step {
        let command = self.command.clone();

        while let Some(arg) = command.args.get(self.index) {
            let provided = std::mem::take(&mut self.provided[self.index]);

            if arg.infinite {
                let raw_items = match provided {
                    Provided::Many(items) => items,
                    Provided::One(item) => vec![item],
                    Provided::Nothing => {
                        if let Some(default) = &arg.default {
                            self.store(arg, default.clone());
                            continue;
                        }
                        return Step::Prompt(format!("{}\n{}", turn.translate(&arg.prompt, &[]), infinite_hint(turn)));
                    }
                };

                for (n, raw) in raw_items.iter().enumerate() {
                    if arg.max_items.is_some_and(|max| self.items.len() >= max) {
                        break;
                    }
                    match self.evaluate(raw, turn) {
                        Ok(value) => self.items.push(value),
                        Err(message) => {
                            self.provided[self.index] = Provided::Many(raw_items[n + 1..].to_vec());
                            return self.reject(arg, raw, message, turn);
                        }
                    }
                }
                self.finish_list(arg);
                continue;
            }

            match provided {
                Provided::One(raw) => match self.evaluate(&raw, turn) {
                    Ok(value) => self.store(arg, value),
                    Err(message) => return self.reject(arg, &raw, message, turn),
                },
                Provided::Many(_) | Provided::Nothing => {
                    if let Some(default) = &arg.default {
                        self.store(arg, default.clone());
                        continue;
                    }
                    return Step::Prompt(format!("{}\n{}", turn.translate(&arg.prompt, &[]), cancel_hint(turn)));
                }
            }
        }

        self.state = SessionState::Complete;
        Step::Complete(std::mem::take(&mut self.values))
    }

    /// validate, custom predicate, parse, allow-list.
    fn evaluate(&self, raw: &str, turn: &Turn<'_>) -> Result<ArgValue, Option<String>> {
        let arg = &self.command.args[self.index];
        let ty = &self.types[self.index];
        let ctx = turn.arg_context();

        match ty.validate(raw, &ctx, arg) {
            Validation::Valid => {}
            Validation::Invalid => return Err(None),
            Validation::Message(message) => return Err(Some(message)),
        }
        if let Some(check) = &arg.validator {
            match check(raw, &ctx) {
                Validation::Valid => {}
                Validation::Invalid => return Err(None),
                Validation::Message(message) => return Err(Some(message)),
            }
        }

        let value = ty.parse(raw, &ctx, arg).map_err(|e| {
            debug!("Parse of {} for {} failed: {e}", arg.key, self.command.name);
            None
        })?;

        if let Some(options) = &arg.one_of {
            if !options.contains(&value.to_string().to_lowercase()) {
                return Err(Some(turn.translate(keys::ARG_NOT_ALLOWED, &[options.join(", ")])));
            }
        }
        Ok(value)
    }

    fn reject(&mut self, arg: &ArgumentSpec, raw: &str, message: Option<String>, turn: &Turn<'_>) -> Step {
        self.attempts += 1;
        let limit = arg.max_attempts.or(turn.config.max_attempts);
        if limit.is_some_and(|max| self.attempts >= max) {
            return self.cancel(CancelReason::TooManyAttempts { key: arg.key.clone() });
        }

        if arg.infinite {
            let error = message.unwrap_or_else(|| turn.translate(keys::PROMPT_INFINITE_INVALID_ARG, &[arg.label.clone(), raw.to_string()]));
            Step::Prompt(format!("{error}\n{}", infinite_hint(turn)))
        } else {
            let error = message.unwrap_or_else(|| turn.translate(keys::PROMPT_INVALID_ARG, &[arg.label.clone()]));
            Step::Prompt(format!("{error}\n{}", cancel_hint(turn)))
        }
    }

    fn store(&mut self, arg: &ArgumentSpec, value: ArgValue) {
        self.values.insert(arg.key.clone(), value);
        self.index += 1;
        self.attempts = 0;
    }

    fn finish_list(&mut self, arg: &ArgumentSpec) {
        let items = std::mem::take(&mut self.items);
        self.store(arg, ArgValue::List(items));
    }
}

fn cancel_hint(turn: &Turn<'_>) -> String {
    turn.translate(
        keys::PROMPT_CANCEL,
        &[turn.config.cancel_keyword.clone(), turn.config.prompt_timeout.as_secs().to_string()],
    )
}

fn infinite_hint(turn: &Turn<'_>) -> String {
    turn.translate(
        keys::PROMPT_INFINITE_CANCEL,
        &[
            turn.config.cancel_keyword.clone(),
            turn.config.finish_keyword.clone(),
            turn.config.prompt_timeout.as_secs().to_string(),
        ],
    )
}
