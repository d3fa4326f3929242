//! `bogcmd`: the command grammar for bogmud.
//!
//! Commands are defined as data (so world files can ship their own verbs):
//! a [`CommandDef`] names a verb, its aliases, and one or more syntax
//! patterns like `hit {target} with {instrument}`. A [`Registry`] is built
//! once from a set of definitions and then matches raw input lines into
//! [`ParsedCommand`]s. The registry is a plain value: build as many as you
//! want, pass them by reference.

pub mod pattern;
pub mod registry;

pub use pattern::{Pattern, Token};
pub use registry::{CommandDef, ParsedCommand, PatternDef, Registry};

use thiserror::Error;

/// Errors raised while building a [`Registry`]. Matching itself never fails,
/// it just declines.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command has an empty name")]
    EmptyName,
    #[error("command '{0}' has no aliases")]
    NoAliases(String),
    #[error("alias '{alias}' is claimed by both '{first}' and '{second}'")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },
    #[error("command '{0}' has a pattern with no tokens")]
    EmptyPattern(String),
    #[error("pattern '{0}' must start with a literal verb")]
    LeadingSlot(String),
    #[error("pattern '{pattern}': slot '{{{slot}...}}' must be the last token")]
    RestNotLast { pattern: String, slot: String },
    #[error("pattern '{pattern}': malformed token '{token}'")]
    BadToken { pattern: String, token: String },
}
