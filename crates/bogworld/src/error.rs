use thiserror::Error;

use crate::ambiguity::Ambiguity;
use crate::event::EventRole;

/// Engine errors.
///
/// `Ambiguous` is not a fault: it is how an action asks the connection layer
/// for a disambiguating reply before it can finish. Everything else is a real
/// error, rendered to the player on interactive paths and logged on
/// scheduled ones.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("that could mean several things")]
    Ambiguous(Ambiguity),
    #[error("'{0}' is not an event role")]
    UnknownRole(String),
    #[error("this event has no {0}")]
    MissingRole(EventRole),
    #[error("there is no such place or thing as '{0}'")]
    UnknownEntity(String),
    #[error("'{0}' is not a usable field path")]
    InvalidFieldPath(String),
}
