//! Syntax patterns: tokenized command shapes and line binding.

use std::collections::HashMap;
use std::fmt;

use crate::CommandError;

/// One token of a syntax pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word that must appear verbatim (case-insensitive).
    Literal(String),
    /// `{name}`: captures exactly one word.
    Slot(String),
    /// `{name...}`: captures the rest of the line (at least one word).
    /// Only valid as the final token.
    Rest(String),
}

/// A compiled syntax pattern belonging to one command.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The command name this pattern dispatches as.
    pub kind: String,
    pub tokens: Vec<Token>,
    pub help: Option<String>,
    /// Template rendered when the command matches but nothing reacts.
    pub no_match: String,
}

impl Pattern {
    /// The canonical verb, i.e. the leading literal.
    pub fn verb(&self) -> &str {
        match &self.tokens[0] {
            Token::Literal(v) => v,
            // Construction rejects patterns that do not start with a literal.
            _ => "",
        }
    }

    /// Try to bind `args` (the input words after the verb) against this
    /// pattern, returning captured slot values on success.
    pub fn bind(&self, args: &[&str]) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        let mut i = 0;

        for token in self.tokens.iter().skip(1) {
            match token {
                Token::Literal(lit) => {
                    if !args.get(i)?.eq_ignore_ascii_case(lit) {
                        return None;
                    }
                    i += 1;
                }
                Token::Slot(name) => {
                    params.insert(name.clone(), args.get(i)?.to_string());
                    i += 1;
                }
                Token::Rest(name) => {
                    if i >= args.len() {
                        return None;
                    }
                    params.insert(name.clone(), args[i..].join(" "));
                    i = args.len();
                }
            }
        }

        // Trailing words the pattern did not ask for mean no match.
        if i == args.len() {
            Some(params)
        } else {
            None
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match token {
                Token::Literal(w) => f.write_str(w)?,
                Token::Slot(name) => write!(f, "{{{name}}}")?,
                Token::Rest(name) => write!(f, "{{{name}...}}")?,
            }
        }
        Ok(())
    }
}

/// Parse a whitespace-separated token string like
/// `"hit {target} with {instrument}"` or `"say {message...}"`.
pub(crate) fn parse_tokens(pattern: &str) -> Result<Vec<Token>, CommandError> {
    let mut tokens = Vec::new();

    for piece in pattern.split_whitespace() {
        let token = if let Some(inner) = piece.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            let (name, rest) = match inner.strip_suffix("...") {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if name.is_empty() || name.contains(['{', '}']) {
                return Err(CommandError::BadToken {
                    pattern: pattern.to_string(),
                    token: piece.to_string(),
                });
            }
            if rest {
                Token::Rest(name.to_string())
            } else {
                Token::Slot(name.to_string())
            }
        } else {
            if piece.contains(['{', '}']) {
                return Err(CommandError::BadToken {
                    pattern: pattern.to_string(),
                    token: piece.to_string(),
                });
            }
            Token::Literal(piece.to_ascii_lowercase())
        };
        tokens.push(token);
    }

    for (i, token) in tokens.iter().enumerate() {
        if let Token::Rest(name) = token {
            if i + 1 != tokens.len() {
                return Err(CommandError::RestNotLast {
                    pattern: pattern.to_string(),
                    slot: name.clone(),
                });
            }
        }
    }

    Ok(tokens)
}
