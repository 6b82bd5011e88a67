//! Shell-like splitting of chat lines.

use crate::{Error, Result};

/// Splits a line into words.
///
/// Whitespace separates words. Single quotes keep everything literally,
/// double quotes allow `\"` and `\\` escapes, and outside quotes a
/// backslash escapes the next character.
///
/// # Errors
///
/// Returns [`Error::InvalidQuery`] for an unterminated quote or a trailing
/// backslash.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            },
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(unterminated('\'')),
                    }
                }
            },
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            },
                            None => return Err(unterminated('"')),
                        },
                        Some(c) => current.push(c),
                        None => return Err(unterminated('"')),
                    }
                }
            },
            '\\' => {
                in_word = true;
                let escaped = chars.next().ok_or_else(|| {
                    Error::InvalidQuery("the line ends with a lone backslash".to_string())
                })?;
                current.push(escaped);
            },
            c => {
                in_word = true;
                current.push(c);
            },
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn unterminated(quote: char) -> Error {
    Error::InvalidQuery(format!("unterminated {quote} quote"))
}
