use core::fmt;
use std::{collections::HashMap, sync::Arc};

use crate::bot::{chat_event::chat_event::{ChatEvent, UserId}, commands::{commands::BotResult, ArgumentSpec}, replies::Translator, state::def::BotError, types::{builtin::{BooleanType, FloatType, IntegerType, StringType, UserType}, role::Role}};

/// Outcome of checking a raw value against an argument type.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid,
    /// Rejected; the user gets the generic invalid-argument prompt.
    Invalid,
    /// Rejected with a message shown verbatim, e.g. a disambiguation list.
    Message(String),
}

impl From<bool> for Validation {
    fn from(ok: bool) -> Self {
        if ok { Validation::Valid } else { Validation::Invalid }
    }
}

/// What a type gets to look at besides the raw value.
pub struct ArgContext<'a> {
    pub event: &'a ChatEvent,
    pub translator: &'a dyn Translator,
    pub locale: &'a str,
}

impl<'a> ArgContext<'a> {
    pub fn translate(&self, key: &str, params: &[String]) -> String {
        self.translator.translate(self.locale, key, params)
    }
}

pub trait ArgumentType: Send + Sync {
    fn id(&self) -> &str;

    fn validate(&self, raw: &str, ctx: &ArgContext<'_>, arg: &ArgumentSpec) -> Validation;

    /// Only called after `validate` returned `Valid`.
    fn parse(&self, raw: &str, ctx: &ArgContext<'_>, arg: &ArgumentSpec) -> BotResult<ArgValue>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    User(UserId),
    Role(Role),
    /// Items of an infinite argument, in the order they were given.
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => write!(f, "{s}"),
            ArgValue::Integer(i) => write!(f, "{i}"),
            ArgValue::Float(v) => write!(f, "{v}"),
            ArgValue::Boolean(b) => write!(f, "{b}"),
            ArgValue::User(id) => write!(f, "{id}"),
            ArgValue::Role(role) => write!(f, "{}", role.id),
            ArgValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

/// Argument types by id.
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<dyn ArgumentType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with `string`, `integer`, `float`, `boolean` and `user`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [Arc<dyn ArgumentType>; 5] = [
            Arc::new(StringType),
            Arc::new(IntegerType),
            Arc::new(FloatType),
            Arc::new(BooleanType),
            Arc::new(UserType),
        ];
        for ty in defaults {
            registry.types.insert(ty.id().to_string(), ty);
        }
        registry
    }

    pub fn register(&mut self, ty: Arc<dyn ArgumentType>) -> BotResult<()> {
        let id = ty.id().to_ascii_lowercase();
        if self.types.contains_key(&id) {
            return Err(BotError::DuplicateName(format!("type {id}")));
        }
        self.types.insert(id, ty);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ArgumentType>> {
        self.types.get(&id.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(&id.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_registered() {
        let registry = TypeRegistry::with_defaults();
        for id in ["string", "integer", "float", "boolean", "user"] {
            assert!(registry.contains(id), "{id} missing");
        }
        assert!(registry.get("INTEGER").is_some());
        assert!(!registry.contains("role"));
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let mut registry = TypeRegistry::with_defaults();
        let err = registry.register(Arc::new(StringType)).unwrap_err();
        assert!(matches!(err, BotError::DuplicateName(_)));
    }

    #[test]
    fn list_display_joins_items() {
        let value = ArgValue::List(vec![ArgValue::Integer(1), ArgValue::Integer(2)]);
        assert_eq!(value.to_string(), "1, 2");
        assert_eq!(ArgValue::Integer(3).as_float(), Some(3.0));
    }
}
