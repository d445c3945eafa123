/*!
Line tokenizer.

Rules:
  - Tokens are separated by whitespace.
  - A token starting with `'` or `"` runs to the matching quote (whitespace kept).
    An unterminated quote simply runs to end of line.
  - A backslash drops itself and copies the next character literally, inside
    or outside quotes. A backslash as the very last character is an error.
  - A closing quote (or the whitespace) ending a token is consumed with it, so
    `"ab"cd` yields `ab` then `cd`.

The input is never mutated; each token is copied into its own `String`.
*/

use crate::error::{LangError, Result};

/// Upper bound on tokens per line.
pub const MAX_ARGS: usize = 100;

/// Cursor over one input line yielding tokens on demand.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    /// Unconsumed tail of the line.
    pub fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    /// Next token, `Ok(None)` once only whitespace remains.
    pub fn next_token(&mut self) -> Result<Option<String>> {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();

        let mut chars = trimmed.char_indices().peekable();
        let Some(&(_, first)) = chars.peek() else {
            return Ok(None);
        };

        let quote = if first == '"' || first == '\'' {
            chars.next();
            Some(first)
        } else {
            None
        };

        let mut token = String::new();
        let mut consumed = trimmed.len();
        while let Some((idx, c)) = chars.next() {
            let ends = match quote {
                Some(q) => c == q,
                None => c.is_whitespace(),
            };
            if ends {
                consumed = idx + c.len_utf8();
                break;
            }
            if c == '\\' {
                match chars.next() {
                    Some((_, escaped)) => token.push(escaped),
                    None => return Err(LangError::InvalidString),
                }
            } else {
                token.push(c);
            }
        }
        self.pos += consumed;

        tracing::trace!(token = %token, "token");
        Ok(Some(token))
    }
}

/// Split a whole line into at most [`MAX_ARGS`] tokens.
///
/// Input left over once the bound is reached is `TooManyArguments`; trailing
/// whitespace alone does not count as leftover input.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokenizer = Tokenizer::new(line);
    let mut args = Vec::new();
    while args.len() < MAX_ARGS {
        match tokenizer.next_token()? {
            Some(tok) => args.push(tok),
            None => return Ok(args),
        }
    }
    if !tokenizer.rest().trim_start().is_empty() {
        return Err(LangError::TooManyArguments);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_quotes_keep_whitespace() {
        assert_eq!(
            tokenize(r#"domain info "my domain""#).unwrap(),
            vec!["domain", "info", "my domain"]
        );
    }

    #[test]
    fn single_quotes_and_escaped_quote() {
        assert_eq!(
            tokenize(r#"set 'it\'s here' x"#).unwrap(),
            vec!["set", "it's here", "x"]
        );
    }

    #[test]
    fn backslash_escapes_space() {
        assert_eq!(tokenize(r"a\ b").unwrap(), vec!["a b"]);
        assert_eq!(tokenize(r"a\\b").unwrap(), vec![r"a\b"]);
    }

    #[test]
    fn trailing_backslash_fails() {
        assert_eq!(tokenize(r"a\"), Err(LangError::InvalidString));
        assert_eq!(tokenize(r#"x "abc\"#), Err(LangError::InvalidString));
    }

    #[test]
    fn closing_quote_ends_token() {
        assert_eq!(tokenize(r#""ab"cd"#).unwrap(), vec!["ab", "cd"]);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(tokenize(r#"say "hello there"#).unwrap(), vec!["say", "hello there"]);
    }

    #[test]
    fn empty_and_blank_lines() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize(" \t  ").unwrap().is_empty());
    }

    #[test]
    fn empty_quoted_token_is_kept() {
        assert_eq!(tokenize(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
    }

    #[test]
    fn argument_bound() {
        let exact = vec!["x"; MAX_ARGS].join(" ");
        assert_eq!(tokenize(&exact).unwrap().len(), MAX_ARGS);
        assert_eq!(tokenize(&format!("{exact}   ")).unwrap().len(), MAX_ARGS);
        assert_eq!(
            tokenize(&format!("{exact} y")),
            Err(LangError::TooManyArguments)
        );
    }

    #[test]
    fn tokenizer_streams() {
        let mut t = Tokenizer::new("  one two ");
        assert_eq!(t.next_token().unwrap().as_deref(), Some("one"));
        assert_eq!(t.next_token().unwrap().as_deref(), Some("two"));
        assert_eq!(t.next_token().unwrap(), None);
    }
}
