//! # Shell-like Lexing
//!
//! Tokenizes console input with shell quoting rules. The strict splitter
//! honors single quotes, double quotes and backslash escapes and strips the
//! quote characters from the produced tokens. Because the console completes
//! text the user is still typing, an unterminated quote is an expected state,
//! not an error: the public entry point falls back to a plain whitespace
//! split so tokenization never fails mid-keystroke.

use thiserror::Error;

/// A single lexical unit of the console input line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    /// Token text with any surrounding quotes removed.
    pub text: String,
    /// True when the token came from the whitespace fallback rather than a
    /// clean quote-aware split.
    pub from_fallback: bool,
}

impl Token {
    fn exact(text: String) -> Self {
        Self {
            text,
            from_fallback: false,
        }
    }

    fn fallback(text: &str) -> Self {
        Self {
            text: text.to_string(),
            from_fallback: true,
        }
    }
}

/// Error produced by the strict splitter.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ShellLexError {
    /// The input ended inside a quoted region.
    #[error("unterminated quote in input")]
    UnterminatedQuote,
}

/// Tokenize input, tolerating partially-typed quotes.
///
/// Attempts the strict quote-aware split first; if the input ends inside an
/// open quote, every whitespace-separated word is returned as-is instead.
/// Never fails and never returns an error to the caller.
pub fn tokenize(input: &str) -> Vec<Token> {
    match try_split(input) {
        Ok(words) => words.into_iter().map(Token::exact).collect(),
        Err(ShellLexError::UnterminatedQuote) => input.split_whitespace().map(Token::fallback).collect(),
    }
}

/// Strict shell-style split: quotes group words, backslash escapes the next
/// character outside single quotes, quote characters are stripped.
pub fn try_split(input: &str) -> Result<Vec<String>, ShellLexError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut has_current = false;
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if !in_single => {
                has_current = true;
                // A trailing backslash escapes nothing; keep it literal.
                match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => current.push('\\'),
                }
            }
            '\'' if !in_double => {
                in_single = !in_single;
                has_current = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                has_current = true;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if has_current {
                    words.push(std::mem::take(&mut current));
                    has_current = false;
                }
            }
            c => {
                has_current = true;
                current.push(c);
            }
        }
    }

    if in_single || in_double {
        return Err(ShellLexError::UnterminatedQuote);
    }
    if has_current {
        words.push(current);
    }
    Ok(words)
}
