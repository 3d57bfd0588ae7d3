use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)"|'([^']*)'|(\S+)"#).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Value with surrounding quotes removed.
    pub value: String,
    /// Byte offset of the token (including its opening quote) in the input.
    pub start: usize,
}

/// Splits on whitespace, keeping `"double"` and `'single'` quoted runs together.
pub fn tokenize(input: &str) -> Vec<Token> {
    TOKEN
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
            Some(Token { value: value.as_str().to_string(), start: whole.start() })
        })
        .collect()
}

/// Everything from token `from` on. A single remaining token is returned unquoted, several
/// are returned as the raw text.
pub fn remainder(input: &str, tokens: &[Token], from: usize) -> Option<String> {
    match &tokens[from.min(tokens.len())..] {
        [] => None,
        [only] => Some(only.value.clone()),
        [first, ..] => Some(input[first.start..].trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(input: &str) -> Vec<String> {
        tokenize(input).into_iter().map(|t| t.value).collect()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(values("  2   3\t4 "), vec!["2", "3", "4"]);
        assert!(values("   ").is_empty());
    }

    #[test]
    fn keeps_quoted_runs() {
        assert_eq!(values(r#"say "hello there" 'general kenobi' x"#), vec!["say", "hello there", "general kenobi", "x"]);
        assert_eq!(values(r#""""#), vec![""]);
    }

    #[test]
    fn remainder_joins_raw_text() {
        let input = r#"a "b c" d"#;
        let tokens = tokenize(input);
        assert_eq!(remainder(input, &tokens, 1), Some(r#""b c" d"#.to_string()));
        assert_eq!(remainder(input, &tokens, 2), Some("d".to_string()));
        assert_eq!(remainder(input, &tokens, 3), None);

        let quoted = r#"x "only this""#;
        assert_eq!(remainder(quoted, &tokenize(quoted), 1), Some("only this".to_string()));
    }
}
