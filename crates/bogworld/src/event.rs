//! Events and reaction dispatch.
//!
//! One player command (or init pass, or scheduled effect) becomes one
//! [`Event`]: an action kind, up to one entity per semantic role, and the
//! handles a reaction needs to act on the world. Reactions receive the event
//! and nothing else; it is the whole capability surface content gets.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::bus::RoomBus;
use crate::entity::Entity;
use crate::error::WorldError;
use crate::scheduler::{Job, Scheduler};

/// The semantic slot an entity fills in one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventRole {
    Source,
    Instrument,
    Target,
    Room,
}

impl EventRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EventRole::Source => "source",
            EventRole::Instrument => "instrument",
            EventRole::Target => "target",
            EventRole::Room => "room",
        }
    }

    pub fn parse(s: &str) -> Result<EventRole, WorldError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" => Ok(EventRole::Source),
            "instrument" => Ok(EventRole::Instrument),
            "target" => Ok(EventRole::Target),
            "room" => Ok(EventRole::Room),
            _ => Err(WorldError::UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for EventRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verb in canonical form: lowercase, trimmed. Reaction tables key on
/// `(ActionKind, EventRole)` pairs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ActionKind(String);

impl ActionKind {
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionKind({})", self.0)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        ActionKind::new(s)
    }
}

pub struct Event {
    pub kind: ActionKind,
    pub params: HashMap<String, String>,
    pub room: Option<Arc<Entity>>,
    pub source: Option<Arc<Entity>>,
    pub instrument: Option<Arc<Entity>>,
    pub target: Option<Arc<Entity>>,
    bus: Arc<RoomBus>,
    scheduler: Arc<Scheduler>,
    entities: Arc<HashMap<String, Arc<Entity>>>,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |e: &Option<Arc<Entity>>| e.as_ref().map(|e| e.name().to_string());
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("room", &name(&self.room))
            .field("source", &name(&self.source))
            .field("instrument", &name(&self.instrument))
            .field("target", &name(&self.target))
            .finish_non_exhaustive()
    }
}

impl Event {
    pub fn new(
        kind: ActionKind,
        bus: Arc<RoomBus>,
        scheduler: Arc<Scheduler>,
        entities: Arc<HashMap<String, Arc<Entity>>>,
    ) -> Self {
        Self {
            kind,
            params: HashMap::new(),
            room: None,
            source: None,
            instrument: None,
            target: None,
            bus,
            scheduler,
            entities,
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_room(mut self, room: Arc<Entity>) -> Self {
        self.room = Some(room);
        self
    }

    pub fn with_source(mut self, source: Arc<Entity>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_instrument(mut self, instrument: Arc<Entity>) -> Self {
        self.instrument = Some(instrument);
        self
    }

    pub fn with_target(mut self, target: Arc<Entity>) -> Self {
        self.target = Some(target);
        self
    }

    // --- role access ---------------------------------------------------

    pub fn role(&self, role: EventRole) -> Option<&Arc<Entity>> {
        match role {
            EventRole::Source => self.source.as_ref(),
            EventRole::Instrument => self.instrument.as_ref(),
            EventRole::Target => self.target.as_ref(),
            EventRole::Room => self.room.as_ref(),
        }
    }

    pub fn require(&self, role: EventRole) -> Result<&Arc<Entity>, WorldError> {
        self.role(role).ok_or(WorldError::MissingRole(role))
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Top-level entity by content handle.
    pub fn entity(&self, handle: &str) -> Option<&Arc<Entity>> {
        self.entities.get(handle)
    }

    // --- dispatch ------------------------------------------------------

    /// Offer this event to the reactions of its filled roles, source first,
    /// then instrument, then target. The first reaction found runs
    /// synchronously and ends the search. The room never auto-dispatches;
    /// it is addressable, not reactive.
    ///
    /// Returns whether anything reacted.
    pub fn dispatch(&self) -> bool {
        for role in [EventRole::Source, EventRole::Instrument, EventRole::Target] {
            let Some(entity) = self.role(role) else {
                continue;
            };
            let Some(reaction) = entity.reaction(&self.kind, role) else {
                continue;
            };
            reaction(self);
            return true;
        }
        false
    }

    // --- capabilities for reactions ------------------------------------

    /// Substitute `{source}`, `{instrument}`, `{target}` and `{room}` with
    /// display names. Unfilled roles render as nothing.
    pub fn format(&self, template: &str) -> String {
        let name = |e: &Option<Arc<Entity>>| {
            e.as_ref().map(|e| e.name().to_string()).unwrap_or_default()
        };
        template
            .replace("{source}", &name(&self.source))
            .replace("{instrument}", &name(&self.instrument))
            .replace("{target}", &name(&self.target))
            .replace("{room}", &name(&self.room))
    }

    /// Narrate to everyone in the event's room.
    pub fn publish(&self, text: &str) {
        if let Some(room) = &self.room {
            self.bus.publish(room, text, &[]);
        }
    }

    /// Narrate to the room, minus some bystanders (usually the source).
    pub fn publish_excluding(&self, text: &str, exclude: &[&Arc<Entity>]) {
        if let Some(room) = &self.room {
            self.bus.publish(room, text, exclude);
        }
    }

    /// Whisper to the source entity only.
    pub fn print(&self, text: &str) {
        if let Some(source) = &self.source {
            self.bus.publish_to(source, text);
        }
    }

    /// Narrate to an arbitrary room by handle.
    pub fn publish_to_room(&self, handle: &str, text: &str) -> Result<(), WorldError> {
        let room = self
            .entity(handle)
            .ok_or_else(|| WorldError::UnknownEntity(handle.to_string()))?;
        self.bus.publish(room, text, &[]);
        Ok(())
    }

    /// Move `entity` into `group` of the room named by `dest`, updating the
    /// graph and the bus subscription in one call. Returns the destination.
    pub fn move_to_room(
        &self,
        entity: &Arc<Entity>,
        dest: &str,
        group: &str,
    ) -> Result<Arc<Entity>, WorldError> {
        let dest = self
            .entity(dest)
            .cloned()
            .ok_or_else(|| WorldError::UnknownEntity(dest.to_string()))?;
        dest.add_child(group, entity);
        self.bus.move_player(&dest, entity);
        Ok(dest)
    }

    /// Run `f` on the shared scheduler after `delay`.
    pub fn after<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.scheduler.add(Job::after(delay, f));
    }

    pub fn bus(&self) -> &Arc<RoomBus> {
        &self.bus
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}
