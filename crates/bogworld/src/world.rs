//! The orchestrator: one `World` ties the entity graph, the command
//! registry, the scheduler, and the room bus together.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use bogcmd::{CommandDef, Registry};

use crate::bus::{Mailbox, RoomBus};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::event::{ActionKind, Event};
use crate::player::Player;
use crate::scheduler::Scheduler;

/// Handle of the entity copied for each connecting player.
pub const PLAYER_TEMPLATE: &str = "player";

/// Child group players occupy within their room.
pub const OCCUPANTS_GROUP: &str = "occupants";

/// Reply for input no command pattern claims.
pub const UNKNOWN_COMMAND: &str = "What in the nine hells?";

pub struct World {
    entities: Arc<HashMap<String, Arc<Entity>>>,
    start: Arc<Entity>,
    template: Arc<Entity>,
    registry: Registry,
    scheduler: Arc<Scheduler>,
    bus: Arc<RoomBus>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Wire up a world. Fails if the start room or the player template is
    /// missing from `entities`; everything downstream assumes both exist.
    pub fn new(
        entities: HashMap<String, Arc<Entity>>,
        start_room: &str,
        registry: Registry,
        scheduler: Arc<Scheduler>,
    ) -> Result<Arc<World>, WorldError> {
        let start = entities
            .get(start_room)
            .cloned()
            .ok_or_else(|| WorldError::UnknownEntity(start_room.to_string()))?;
        let template = entities
            .get(PLAYER_TEMPLATE)
            .cloned()
            .ok_or_else(|| WorldError::UnknownEntity(PLAYER_TEMPLATE.to_string()))?;
        Ok(Arc::new(Self {
            entities: Arc::new(entities),
            start,
            template,
            registry,
            scheduler,
            bus: Arc::new(RoomBus::new()),
        }))
    }

    pub fn entity(&self, handle: &str) -> Option<&Arc<Entity>> {
        self.entities.get(handle)
    }

    pub fn start_room(&self) -> &Arc<Entity> {
        &self.start
    }

    pub fn bus(&self) -> &Arc<RoomBus> {
        &self.bus
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// A blank event of `kind`, carrying the world's shared handles.
    pub fn event(&self, kind: &str) -> Event {
        Event::new(
            ActionKind::new(kind),
            Arc::clone(&self.bus),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.entities),
        )
    }

    /// Run every entity's init reaction, parents before their children.
    /// The event's room is the entity's parent, or the entity itself at
    /// the top of the graph.
    pub fn init(&self) {
        let mut handles: Vec<&String> = self.entities.keys().collect();
        handles.sort();
        for handle in handles {
            self.init_entity(&self.entities[handle]);
        }
    }

    fn init_entity(&self, entity: &Arc<Entity>) {
        if let Some(init) = entity.init_reaction() {
            let room = entity.parent().unwrap_or_else(|| Arc::clone(entity));
            let event = self
                .event("init")
                .with_room(room)
                .with_source(Arc::clone(entity));
            init(&event);
        }
        for child in entity.children() {
            self.init_entity(&child);
        }
    }

    /// Copy the player template for `name`, place the copy in the start
    /// room, and hook its mailbox up. The room hears about the arrival;
    /// the newcomer does not.
    pub fn add_player(self: &Arc<Self>, name: &str, mailbox: Mailbox) -> Player {
        let mut draft = self.template.draft();
        draft.name = name.to_string();
        draft.description = format!("{name} the brave hero is here.");
        draft.aliases = vec![name.to_ascii_lowercase()];
        let entity = draft.build();

        self.start.add_child(OCCUPANTS_GROUP, &entity);
        self.bus.subscribe(&self.start, &entity, mailbox);
        self.bus
            .publish(&self.start, &format!("{name} enters the room."), &[&entity]);
        info!(id = %entity.id(), name, "player joined");
        Player::new(entity, Arc::clone(self))
    }

    /// Detach a departing player: mailbox first so the leaver misses the
    /// announcement, then the graph, then the room hears about it.
    pub fn remove_player(&self, player: &Player) {
        let entity = player.entity();
        if let Some(room) = entity.parent() {
            self.bus.unsubscribe(&room, entity);
            room.remove_child(entity);
            self.bus
                .publish(&room, &format!("{} leaves the room.", entity.name()), &[]);
        }
        info!(id = %entity.id(), name = entity.name(), "player left");
    }

    /// Turn one input line into a reply. Built-ins short-circuit; anything
    /// else becomes an event through the player's act paths, which may
    /// suspend on ambiguity.
    pub fn parse(&self, player: &Player, line: &str) -> Result<String, WorldError> {
        let Some(cmd) = self.registry.parse(line) else {
            return Ok(UNKNOWN_COMMAND.to_string());
        };
        match cmd.kind.as_str() {
            "help" => Ok(self.help_message(cmd.param("command"))),
            "look" => player.look(cmd.target()),
            "inventory" => Ok(player.inventory()),
            _ => player.command(&cmd),
        }
    }

    /// One line per pattern, optionally narrowed to a single verb.
    pub fn help_message(&self, verb: Option<&str>) -> String {
        let canonical = match verb {
            Some(verb) => match self.registry.canonical(verb) {
                Some(canonical) => Some(canonical.to_string()),
                None => return format!("Unrecognized command: {verb}"),
            },
            None => None,
        };
        let mut out = String::new();
        for pattern in self.registry.patterns() {
            if let Some(canonical) = &canonical {
                if &pattern.kind != canonical {
                    continue;
                }
            }
            out.push_str("- ");
            out.push_str(&pattern.to_string());
            if let Some(help) = &pattern.help {
                if !help.is_empty() {
                    out.push_str(": ");
                    out.push_str(help);
                }
            }
            out.push_str("\r\n");
        }
        out
    }
}

/// The engine's own commands, merged with content-defined ones at startup.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        CommandDef::new("help", &["help", "?"])
            .pattern("help", "List every command.")
            .pattern("help {command}", "Describe one command."),
        CommandDef::new("look", &["look", "l"])
            .pattern("look", "Take in the room around you.")
            .pattern("look {target}", "Study one thing closely."),
        CommandDef::new("inventory", &["inventory", "inv", "i"])
            .pattern("inventory", "Check what you are carrying."),
    ]
}
