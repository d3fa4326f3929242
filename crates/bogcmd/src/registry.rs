//! Command definitions and the line-matching registry.

use std::collections::HashMap;

use serde::Deserialize;

use crate::pattern::{parse_tokens, Pattern, Token};
use crate::CommandError;

/// Fallback no-match template for patterns that do not set one.
const DEFAULT_NO_MATCH: &str = "nothing happens.";

/// One command as declared by content: a canonical name, the verbs players
/// may type for it, and its accepted shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandDef {
    pub name: String,
    pub aliases: Vec<String>,
    pub patterns: Vec<PatternDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternDef {
    pub tokens: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub no_match: Option<String>,
}

impl CommandDef {
    pub fn new(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            patterns: Vec::new(),
        }
    }

    pub fn pattern(mut self, tokens: &str, help: &str) -> Self {
        self.patterns.push(PatternDef {
            tokens: tokens.to_string(),
            help: Some(help.to_string()),
            no_match: None,
        });
        self
    }

    pub fn pattern_no_match(mut self, tokens: &str, help: &str, no_match: &str) -> Self {
        self.patterns.push(PatternDef {
            tokens: tokens.to_string(),
            help: Some(help.to_string()),
            no_match: Some(no_match.to_string()),
        });
        self
    }
}

/// A successfully matched input line.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    /// Canonical command name, lowercased.
    pub kind: String,
    /// Captured slot values, keyed by slot name.
    pub params: HashMap<String, String>,
    /// Template to render when dispatch finds no reaction.
    pub no_match: String,
}

impl ParsedCommand {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    // The engine gives these slot names orchestration meaning; anything
    // else rides along as a plain parameter.

    pub fn target(&self) -> Option<&str> {
        self.param("target")
    }

    pub fn instrument(&self) -> Option<&str> {
        self.param("instrument")
    }

    pub fn message(&self) -> Option<&str> {
        self.param("message")
    }
}

/// The compiled command set. Verb aliases map to canonical names; patterns
/// are tried in registration order and the first full match wins.
#[derive(Debug, Default)]
pub struct Registry {
    verb_aliases: HashMap<String, String>,
    patterns: Vec<Pattern>,
}

impl Registry {
    pub fn new(defs: &[CommandDef]) -> Result<Registry, CommandError> {
        let mut verb_aliases: HashMap<String, String> = HashMap::new();

        for def in defs {
            let name = def.name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return Err(CommandError::EmptyName);
            }
            if def.aliases.is_empty() {
                return Err(CommandError::NoAliases(name));
            }
            for alias in &def.aliases {
                let alias = alias.trim().to_ascii_lowercase();
                if let Some(first) = verb_aliases.get(&alias) {
                    if first != &name {
                        return Err(CommandError::DuplicateAlias {
                            alias,
                            first: first.clone(),
                            second: name,
                        });
                    }
                    continue;
                }
                verb_aliases.insert(alias, name.clone());
            }
        }

        // Aliases are complete, so pattern verbs can be canonicalized now.
        let mut patterns = Vec::new();
        for def in defs {
            let name = def.name.trim().to_ascii_lowercase();
            for pat in &def.patterns {
                let mut tokens = parse_tokens(&pat.tokens)?;
                let Some(first) = tokens.first_mut() else {
                    return Err(CommandError::EmptyPattern(name));
                };
                match first {
                    Token::Literal(verb) => {
                        if let Some(canonical) = verb_aliases.get(verb.as_str()) {
                            *verb = canonical.clone();
                        }
                    }
                    _ => return Err(CommandError::LeadingSlot(pat.tokens.clone())),
                }
                patterns.push(Pattern {
                    kind: name.clone(),
                    tokens,
                    help: pat.help.clone(),
                    no_match: pat
                        .no_match
                        .clone()
                        .unwrap_or_else(|| DEFAULT_NO_MATCH.to_string()),
                });
            }
        }

        Ok(Registry {
            verb_aliases,
            patterns,
        })
    }

    /// Match one input line. `None` means no command claimed it.
    pub fn parse(&self, line: &str) -> Option<ParsedCommand> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let first = words.first()?.to_ascii_lowercase();
        let canonical = self.verb_aliases.get(&first)?;

        for pattern in &self.patterns {
            if pattern.verb() != canonical {
                continue;
            }
            if let Some(params) = pattern.bind(&words[1..]) {
                return Some(ParsedCommand {
                    kind: pattern.kind.clone(),
                    params,
                    no_match: pattern.no_match.clone(),
                });
            }
        }
        None
    }

    /// All compiled patterns in registration order, for help rendering.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Canonical command name for a typed verb, if any.
    pub fn canonical(&self, verb: &str) -> Option<&str> {
        self.verb_aliases
            .get(&verb.to_ascii_lowercase())
            .map(String::as_str)
    }
}
