//! `bogworld`: the live world behind bogmud.
//!
//! The pieces, bottom up:
//! - [`entity`] / [`children`]: the shared object graph and its alias index
//! - [`event`]: role-typed events and reaction dispatch
//! - [`ambiguity`]: suspended actions awaiting a numbered reply
//! - [`scheduler`]: one time-ordered queue of deferred jobs
//! - [`bus`]: room-scoped fan-out to per-player mailboxes
//! - [`world`] / [`player`]: the orchestrator tying a typed command to all of
//!   the above
//! - [`loader`] / [`behavior`]: YAML content in, wired entity graph out
//!
//! Everything here is runtime-agnostic except the scheduler worker and the
//! mailboxes, which want a tokio runtime.

pub mod ambiguity;
pub mod behavior;
pub mod bus;
pub mod children;
pub mod entity;
pub mod error;
pub mod event;
pub mod loader;
mod lock;
pub mod player;
pub mod scheduler;
pub mod world;

pub use ambiguity::{Ambiguity, AmbiguityOption, AmbiguitySlot, PendingAction, Progress};
pub use behavior::BehaviorRegistry;
pub use bus::{Mailbox, RoomBus};
pub use entity::{Entity, EntityDraft, EntityId, ReactionFn};
pub use error::WorldError;
pub use event::{ActionKind, Event, EventRole};
pub use loader::{load_world, LoadWarning, LoadedWorld};
pub use player::{validate_name, Player};
pub use scheduler::{Job, Scheduler};
pub use world::{builtin_commands, World};
