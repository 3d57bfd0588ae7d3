use once_cell::sync::Lazy;
use regex::Regex;

use crate::bot::{chat_event::chat_event::UserId, commands::{commands::BotResult, ArgumentSpec}, replies::keys, state::def::BotError, types::types::{ArgContext, ArgValue, ArgumentType, Validation}};

static USER_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:<@!?)?([0-9]+)>?$").expect("valid regex"));

const TRUTHY: [&str; 9] = ["true", "t", "yes", "y", "on", "enable", "enabled", "1", "+"];
const FALSY: [&str; 9] = ["false", "f", "no", "n", "off", "disable", "disabled", "0", "-"];

fn bound(value: f64) -> String {
    if value.fract() == 0.0 { format!("{}", value as i64) } else { value.to_string() }
}

fn check_range(value: f64, ctx: &ArgContext<'_>, arg: &ArgumentSpec) -> Validation {
    if let Some(min) = arg.min {
        if value < min {
            return Validation::Message(ctx.translate(keys::ARG_TOO_SMALL, &[bound(min)]));
        }
    }
    if let Some(max) = arg.max {
        if value > max {
            return Validation::Message(ctx.translate(keys::ARG_TOO_LARGE, &[bound(max)]));
        }
    }
    Validation::Valid
}

pub struct StringType;

impl ArgumentType for StringType {
    fn id(&self) -> &str { "string" }

    fn validate(&self, raw: &str, ctx: &ArgContext<'_>, arg: &ArgumentSpec) -> Validation {
        let len = raw.chars().count() as f64;
        if let Some(min) = arg.min {
            if len < min {
                return Validation::Message(ctx.translate(keys::ARG_TOO_SHORT, &[arg.label.clone(), bound(min)]));
            }
        }
        if let Some(max) = arg.max {
            if len > max {
                return Validation::Message(ctx.translate(keys::ARG_TOO_LONG, &[arg.label.clone(), bound(max)]));
            }
        }
        Validation::Valid
    }

    fn parse(&self, raw: &str, _ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> BotResult<ArgValue> {
        Ok(ArgValue::Text(raw.to_string()))
    }
}

pub struct IntegerType;

impl ArgumentType for IntegerType {
    fn id(&self) -> &str { "integer" }

    fn validate(&self, raw: &str, ctx: &ArgContext<'_>, arg: &ArgumentSpec) -> Validation {
        match raw.trim().parse::<i64>() {
            Ok(value) => check_range(value as f64, ctx, arg),
            Err(_) => Validation::Invalid,
        }
    }

    fn parse(&self, raw: &str, _ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> BotResult<ArgValue> {
        raw.trim()
            .parse::<i64>()
            .map(ArgValue::Integer)
            .map_err(|e| BotError::InvalidArgument(format!("{raw}: {e}")))
    }
}

pub struct FloatType;

impl ArgumentType for FloatType {
    fn id(&self) -> &str { "float" }

    fn validate(&self, raw: &str, ctx: &ArgContext<'_>, arg: &ArgumentSpec) -> Validation {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => check_range(value, ctx, arg),
            _ => Validation::Invalid,
        }
    }

    fn parse(&self, raw: &str, _ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> BotResult<ArgValue> {
        raw.trim()
            .parse::<f64>()
            .map(ArgValue::Float)
            .map_err(|e| BotError::InvalidArgument(format!("{raw}: {e}")))
    }
}

pub struct BooleanType;

impl ArgumentType for BooleanType {
    fn id(&self) -> &str { "boolean" }

    fn validate(&self, raw: &str, _ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> Validation {
        let raw = raw.trim().to_lowercase();
        (TRUTHY.contains(&raw.as_str()) || FALSY.contains(&raw.as_str())).into()
    }

    fn parse(&self, raw: &str, _ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> BotResult<ArgValue> {
        let raw = raw.trim().to_lowercase();
        if TRUTHY.contains(&raw.as_str()) {
            Ok(ArgValue::Boolean(true))
        } else if FALSY.contains(&raw.as_str()) {
            Ok(ArgValue::Boolean(false))
        } else {
            Err(BotError::InvalidArgument(format!("{raw} is not a boolean")))
        }
    }
}

/// Accepts `<@id>`, `<@!id>` or a bare numeric id. No lookup is made.
pub struct UserType;

impl ArgumentType for UserType {
    fn id(&self) -> &str { "user" }

    fn validate(&self, raw: &str, _ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> Validation {
        USER_MENTION.is_match(raw.trim()).into()
    }

    fn parse(&self, raw: &str, _ctx: &ArgContext<'_>, _arg: &ArgumentSpec) -> BotResult<ArgValue> {
        USER_MENTION
            .captures(raw.trim())
            .and_then(|c| c.get(1))
            .map(|m| ArgValue::User(UserId::new(m.as_str())))
            .ok_or_else(|| BotError::InvalidArgument(format!("{raw} is not a user")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{chat_event::chat_event::ChatEvent, replies::StringTable};

    fn check(ty: &dyn ArgumentType, raw: &str, arg: &ArgumentSpec) -> (Validation, Option<ArgValue>) {
        let event = ChatEvent::new("m", "c", "u", "");
        let table = StringTable::new();
        let ctx = ArgContext { event: &event, translator: &table, locale: "en" };
        let validation = ty.validate(raw, &ctx, arg);
        let parsed = if validation == Validation::Valid { ty.parse(raw, &ctx, arg).ok() } else { None };
        (validation, parsed)
    }

    #[test]
    fn integer_bounds_report_messages() {
        let arg = ArgumentSpec::new("n", "integer", "n?").min(1.0).max(10.0);

        assert_eq!(check(&IntegerType, "5", &arg).1, Some(ArgValue::Integer(5)));
        assert_eq!(check(&IntegerType, "x", &arg).0, Validation::Invalid);
        assert_eq!(
            check(&IntegerType, "11", &arg).0,
            Validation::Message("Please enter a number below or exactly 10.".into())
        );
        assert!(matches!(check(&IntegerType, "0", &arg).0, Validation::Message(_)));
    }

    #[test]
    fn float_rejects_non_finite() {
        let arg = ArgumentSpec::new("f", "float", "f?");
        assert_eq!(check(&FloatType, "2.5", &arg).1, Some(ArgValue::Float(2.5)));
        assert_eq!(check(&FloatType, "inf", &arg).0, Validation::Invalid);
    }

    #[test]
    fn string_length_bounds() {
        let arg = ArgumentSpec::new("name", "string", "name?").label("name").max(3.0);
        assert_eq!(check(&StringType, "abc", &arg).1, Some(ArgValue::Text("abc".into())));
        assert_eq!(
            check(&StringType, "abcd", &arg).0,
            Validation::Message("Please keep the name below or exactly 3 characters.".into())
        );
    }

    #[test]
    fn boolean_words() {
        let arg = ArgumentSpec::new("b", "boolean", "b?");
        assert_eq!(check(&BooleanType, "Yes", &arg).1, Some(ArgValue::Boolean(true)));
        assert_eq!(check(&BooleanType, "off", &arg).1, Some(ArgValue::Boolean(false)));
        assert_eq!(check(&BooleanType, "maybe", &arg).0, Validation::Invalid);
    }

    #[test]
    fn user_mentions_and_ids() {
        let arg = ArgumentSpec::new("u", "user", "u?");
        assert_eq!(check(&UserType, "<@!42>", &arg).1, Some(ArgValue::User(UserId::new("42"))));
        assert_eq!(check(&UserType, "42", &arg).1, Some(ArgValue::User(UserId::new("42"))));
        assert_eq!(check(&UserType, "@someone", &arg).0, Validation::Invalid);
    }
}
