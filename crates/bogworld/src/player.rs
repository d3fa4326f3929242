//! A connected player: a copied template entity plus the act paths that
//! turn a parsed command into an event.
//!
//! Alias resolution happens here. Zero matches end with a friendly line,
//! one match dispatches straight away, and several matches suspend the
//! whole action as a [`WorldError::Ambiguous`] carrying a resume closure.

use std::collections::HashMap;
use std::sync::Arc;

use bogcmd::ParsedCommand;

use crate::ambiguity::{Ambiguity, AmbiguityOption, AmbiguitySlot};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::event::{Event, EventRole};
use crate::world::World;

pub const MAX_NAME_LEN: usize = 20;

/// Gatekeeping for the login prompt. The reply is what the greeter says
/// when the name will not do.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Please, speak up! I didn't hear a name.".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err("That's much too long to remember!".to_string());
    }
    if !name.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err("I'm no good with numbers or spaces, and I only speak English!".to_string());
    }
    Ok(())
}

#[derive(Clone)]
pub struct Player {
    entity: Arc<Entity>,
    world: Arc<World>,
}

impl Player {
    pub(crate) fn new(entity: Arc<Entity>, world: Arc<World>) -> Self {
        Self { entity, world }
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    /// Fire the template's init reaction, if it has one. Runs once the
    /// player is placed and wired, so the reaction can greet them.
    pub fn init(&self) {
        let Some(init) = self.entity.init_reaction() else {
            return;
        };
        init(&self.event("init"));
    }

    /// Route a parsed command to the act path its slots call for.
    pub(crate) fn command(&self, cmd: &ParsedCommand) -> Result<String, WorldError> {
        if let Some(target) = cmd.target() {
            if let Some(instrument) = cmd.instrument() {
                return self.act_upon_with(&cmd.kind, target, instrument, &cmd.no_match);
            }
            if let Some(message) = cmd.message() {
                return self.act_upon_message(&cmd.kind, target, message, &cmd.no_match);
            }
            return self.act_upon(&cmd.kind, target, &cmd.no_match);
        }
        self.act(&cmd.kind, cmd.params.clone(), &cmd.no_match)
    }

    /// Untargeted action: the event names only the actor and their room.
    pub fn act(
        &self,
        kind: &str,
        params: HashMap<String, String>,
        no_match: &str,
    ) -> Result<String, WorldError> {
        let event = self.event(kind).with_params(params);
        Ok(finish(&event, no_match))
    }

    /// Action with a target alias to resolve.
    pub fn act_upon(
        &self,
        kind: &str,
        alias: &str,
        no_match: &str,
    ) -> Result<String, WorldError> {
        let matches = self.find(alias);
        if matches.is_empty() {
            return Ok(format!("You wish to {kind} {alias}, but that's not here."));
        }
        if let [only] = matches.as_slice() {
            let target = Arc::clone(&only.entity);
            return Ok(self.act_upon_entity(kind, &target, no_match));
        }

        let player = self.clone();
        let kind = kind.to_string();
        let no_match = no_match.to_string();
        Err(WorldError::Ambiguous(Ambiguity::new(
            vec![AmbiguitySlot {
                role: EventRole::Target,
                prompt: "Which target?".to_string(),
                options: matches,
            }],
            Box::new(move |chosen| {
                let target = chosen
                    .get(&EventRole::Target)
                    .ok_or(WorldError::MissingRole(EventRole::Target))?;
                Ok(player.act_upon_entity(&kind, target, &no_match))
            }),
        )))
    }

    /// Action with a target alias and a free-text tail, like telling
    /// someone something. The tail rides on the event as `message`.
    pub fn act_upon_message(
        &self,
        kind: &str,
        alias: &str,
        message: &str,
        no_match: &str,
    ) -> Result<String, WorldError> {
        let matches = self.find(alias);
        if matches.is_empty() {
            return Ok(format!("You can't {kind} without {alias} here"));
        }
        if let [only] = matches.as_slice() {
            let target = Arc::clone(&only.entity);
            return Ok(self.act_upon_message_entity(kind, &target, message, no_match));
        }

        let player = self.clone();
        let kind = kind.to_string();
        let message = message.to_string();
        let no_match = no_match.to_string();
        Err(WorldError::Ambiguous(Ambiguity::new(
            vec![AmbiguitySlot {
                role: EventRole::Target,
                prompt: "Which target?".to_string(),
                options: matches,
            }],
            Box::new(move |chosen| {
                let target = chosen
                    .get(&EventRole::Target)
                    .ok_or(WorldError::MissingRole(EventRole::Target))?;
                Ok(player.act_upon_message_entity(&kind, target, &message, &no_match))
            }),
        )))
    }

    /// Action with both a target and an instrument to resolve. Either
    /// side may be ambiguous; unresolved sides become slots and settled
    /// ones are captured for the resume.
    pub fn act_upon_with(
        &self,
        kind: &str,
        target_alias: &str,
        instrument_alias: &str,
        no_match: &str,
    ) -> Result<String, WorldError> {
        let mut slots = Vec::new();
        let mut target = None;
        let mut instrument = None;

        let target_matches = self.find(target_alias);
        if target_matches.is_empty() {
            return Ok(format!("There is no {target_alias} here."));
        }
        if let [only] = target_matches.as_slice() {
            target = Some(Arc::clone(&only.entity));
        } else {
            slots.push(AmbiguitySlot {
                role: EventRole::Target,
                prompt: format!("Which target to {kind}?"),
                options: target_matches,
            });
        }

        let instrument_matches = self.find(instrument_alias);
        if instrument_matches.is_empty() {
            return Ok(format!("You don't have {instrument_alias} available."));
        }
        if let [only] = instrument_matches.as_slice() {
            instrument = Some(Arc::clone(&only.entity));
        } else {
            slots.push(AmbiguitySlot {
                role: EventRole::Instrument,
                prompt: format!("Use what to {kind}?"),
                options: instrument_matches,
            });
        }

        if let (Some(target), Some(instrument)) = (&target, &instrument) {
            return Ok(self.act_upon_with_entities(kind, target, instrument, no_match));
        }

        let player = self.clone();
        let kind = kind.to_string();
        let no_match = no_match.to_string();
        Err(WorldError::Ambiguous(Ambiguity::new(
            slots,
            Box::new(move |chosen| {
                let target = target
                    .or_else(|| chosen.get(&EventRole::Target).cloned())
                    .ok_or(WorldError::MissingRole(EventRole::Target))?;
                let instrument = instrument
                    .or_else(|| chosen.get(&EventRole::Instrument).cloned())
                    .ok_or(WorldError::MissingRole(EventRole::Instrument))?;
                Ok(player.act_upon_with_entities(&kind, &target, &instrument, &no_match))
            }),
        )))
    }

    /// Bare `look` shows the room without the looker in it; with an alias
    /// it resolves like any targeted action but renders a description
    /// instead of dispatching.
    pub fn look(&self, alias: Option<&str>) -> Result<String, WorldError> {
        let Some(alias) = alias else {
            let Some(room) = self.entity.parent() else {
                return Ok(String::new());
            };
            return Ok(room.describe_as_room(Some(self.entity.id())));
        };

        let matches = self.find(alias);
        if matches.is_empty() {
            return Ok(format!("There is no {alias} for you to look upon."));
        }
        if let [only] = matches.as_slice() {
            return Ok(only.entity.describe());
        }

        Err(WorldError::Ambiguous(Ambiguity::new(
            vec![AmbiguitySlot {
                role: EventRole::Target,
                prompt: "Which target?".to_string(),
                options: matches,
            }],
            Box::new(move |chosen| {
                let target = chosen
                    .get(&EventRole::Target)
                    .ok_or(WorldError::MissingRole(EventRole::Target))?;
                Ok(target.describe())
            }),
        )))
    }

    pub fn inventory(&self) -> String {
        let names: Vec<String> = self
            .entity
            .children()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        if names.is_empty() {
            "You are carrying nothing.".to_string()
        } else {
            format!("You are carrying: {}.", names.join(", "))
        }
    }

    fn act_upon_entity(&self, kind: &str, target: &Arc<Entity>, no_match: &str) -> String {
        let event = self.event(kind).with_target(Arc::clone(target));
        finish(&event, no_match)
    }

    fn act_upon_message_entity(
        &self,
        kind: &str,
        target: &Arc<Entity>,
        message: &str,
        no_match: &str,
    ) -> String {
        let params = HashMap::from([("message".to_string(), message.to_string())]);
        let event = self
            .event(kind)
            .with_params(params)
            .with_target(Arc::clone(target));
        finish(&event, no_match)
    }

    fn act_upon_with_entities(
        &self,
        kind: &str,
        target: &Arc<Entity>,
        instrument: &Arc<Entity>,
        no_match: &str,
    ) -> String {
        let event = self
            .event(kind)
            .with_instrument(Arc::clone(instrument))
            .with_target(Arc::clone(target));
        finish(&event, no_match)
    }

    fn event(&self, kind: &str) -> Event {
        let mut event = self.world.event(kind).with_source(Arc::clone(&self.entity));
        if let Some(room) = self.entity.parent() {
            event = event.with_room(room);
        }
        event
    }

    /// Everything `alias` could mean from where this player stands: the
    /// room itself if its own aliases match, then the room's subtree.
    fn find(&self, alias: &str) -> Vec<AmbiguityOption> {
        let Some(room) = self.entity.parent() else {
            return Vec::new();
        };
        let mut matches = Vec::new();
        if room.has_alias(alias) {
            matches.push(AmbiguityOption {
                label: format!("The room: {}", room.name()),
                entity: Arc::clone(&room),
            });
        }
        matches.extend(room.children_by_alias(alias));
        matches
    }
}

fn finish(event: &Event, no_match: &str) -> String {
    if event.dispatch() {
        String::new()
    } else {
        event.format(no_match)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambiguity::{PendingAction, Progress};
    use crate::behavior::BehaviorRegistry;
    use crate::loader::load_world;
    use crate::scheduler::Scheduler;
    use crate::world::builtin_commands;
    use bogcmd::Registry;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    const WORLD: &str = r#"
start_room: cave
entities:
  player:
    description: template
  cave:
    name: The Echoing Cave
    description: Damp stone in every direction.
    aliases: [cave]
    children:
      monsters:
        entries:
          - name: troll
            description: Greenish and cross.
            aliases: [troll, monster]
            reactions:
              - on: hit
                role: target
                do: note
          - name: goblin
            description: Small, quick, rude.
            aliases: [goblin, monster]
            reactions:
              - on: hit
                role: target
                do: note
      arsenal:
        prefix: "Weapons"
        entries:
          - name: rusty sword
            aliases: [sword]
            reactions:
              - on: hit
                role: instrument
                do: ring
          - name: shiny sword
            aliases: [sword]
            reactions:
              - on: hit
                role: instrument
                do: ring
          - name: whisper stone
            aliases: [stone]
            reactions:
              - on: tell
                role: target
                do: echo
commands:
  - name: hit
    aliases: [hit]
    patterns:
      - tokens: "hit {target}"
        no_match: "You swing at {target} to no effect."
      - tokens: "hit {target} with {instrument}"
        no_match: "nothing happens."
  - name: tell
    aliases: [tell]
    patterns:
      - tokens: "tell {target} {message...}"
        no_match: "nothing happens."
  - name: ponder
    aliases: [ponder]
    patterns:
      - tokens: "ponder"
        no_match: "{source} gazes into the middle distance."
"#;

    struct Fixture {
        world: Arc<World>,
        log: Arc<Mutex<Vec<String>>>,
    }

    async fn fixture() -> Fixture {
        let log = Arc::new(Mutex::new(Vec::new()));
        let noted = Arc::clone(&log);
        let rung = Arc::clone(&log);
        let echoed = Arc::clone(&log);
        let behaviors = BehaviorRegistry::new()
            .with("note", move |event| {
                let line = format!(
                    "{}:{}",
                    event.kind,
                    event.format("{source}/{instrument}/{target}")
                );
                noted.lock().unwrap().push(line);
            })
            .with("ring", move |event| {
                rung.lock().unwrap().push(event.format("ring:{instrument}"));
            })
            .with("echo", move |event| {
                let message = event.param("message").unwrap_or_default().to_string();
                echoed.lock().unwrap().push(message);
            });
        let loaded = load_world(WORLD, &behaviors).unwrap();
        let mut commands = builtin_commands();
        commands.extend(loaded.commands);
        let registry = Registry::new(&commands).unwrap();
        let world = World::new(
            loaded.entities,
            &loaded.start_room,
            registry,
            Scheduler::start(),
        )
        .unwrap();
        Fixture { world, log }
    }

    fn join(fixture: &Fixture, name: &str) -> Player {
        let (tx, _rx) = mpsc::channel(8);
        fixture.world.add_player(name, tx)
    }

    #[tokio::test]
    async fn each_act_path_has_its_own_not_here_line() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");

        assert_eq!(
            alice.act_upon("hit", "ghost", "x").unwrap(),
            "You wish to hit ghost, but that's not here."
        );
        assert_eq!(
            alice.act_upon_with("hit", "ghost", "sword", "x").unwrap(),
            "There is no ghost here."
        );
        assert_eq!(
            alice.act_upon_with("hit", "troll", "feather", "x").unwrap(),
            "You don't have feather available."
        );
        assert_eq!(
            alice.act_upon_message("tell", "ghost", "hello", "x").unwrap(),
            "You can't tell without ghost here"
        );
        assert_eq!(
            alice.look(Some("ghost")).unwrap(),
            "There is no ghost for you to look upon."
        );
    }

    #[tokio::test]
    async fn a_single_match_dispatches_with_roles_filled() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");

        let reply = fx.world.parse(&alice, "hit troll").unwrap();

        assert_eq!(reply, "");
        assert_eq!(*fx.log.lock().unwrap(), ["hit:Alice//troll"]);
    }

    #[tokio::test]
    async fn the_message_tail_rides_on_the_event() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");

        let reply = fx.world.parse(&alice, "tell stone keep it secret").unwrap();

        assert_eq!(reply, "");
        assert_eq!(*fx.log.lock().unwrap(), ["keep it secret"]);
    }

    #[tokio::test]
    async fn two_matches_suspend_and_resume_through_the_pending_action() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");

        let err = fx.world.parse(&alice, "hit monster").unwrap_err();
        let WorldError::Ambiguous(ambiguity) = err else {
            panic!("expected an ambiguity");
        };
        let (pending, prompt) = PendingAction::start(ambiguity);
        assert_eq!(prompt, "Which target?\r\n  1) troll\r\n  2) goblin");

        match pending.advance("2") {
            Progress::Complete(reply) => assert_eq!(reply.unwrap(), ""),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(*fx.log.lock().unwrap(), ["hit:Alice//goblin"]);
    }

    #[tokio::test]
    async fn both_slots_can_be_ambiguous_at_once() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");

        let err = fx.world.parse(&alice, "hit monster with sword").unwrap_err();
        let WorldError::Ambiguous(ambiguity) = err else {
            panic!("expected an ambiguity");
        };
        let (pending, prompt) = PendingAction::start(ambiguity);
        assert_eq!(
            prompt,
            "Which target to hit?\r\n  1) troll\r\n  2) goblin"
        );

        let Progress::Await { pending, prompt } = pending.advance("1") else {
            panic!("expected the instrument slot next");
        };
        assert_eq!(
            prompt,
            "Use what to hit?\r\n  1) Weapons: rusty sword\r\n  2) Weapons: shiny sword"
        );

        match pending.advance("2") {
            Progress::Complete(reply) => assert_eq!(reply.unwrap(), ""),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(
            *fx.log.lock().unwrap(),
            ["ring:shiny sword", "hit:Alice/shiny sword/troll"],
            "instrument reacts before the target"
        );
    }

    #[tokio::test]
    async fn a_settled_slot_survives_an_ambiguous_partner() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");

        // troll is unique, sword is not: only the instrument prompts.
        let err = fx.world.parse(&alice, "hit troll with sword").unwrap_err();
        let WorldError::Ambiguous(ambiguity) = err else {
            panic!("expected an ambiguity");
        };
        let (pending, prompt) = PendingAction::start(ambiguity);
        assert!(prompt.starts_with("Use what to hit?"));

        match pending.advance("1") {
            Progress::Complete(reply) => assert_eq!(reply.unwrap(), ""),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(
            *fx.log.lock().unwrap(),
            ["ring:rusty sword", "hit:Alice/rusty sword/troll"]
        );
    }

    #[tokio::test]
    async fn the_room_answers_to_its_own_alias() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");

        let reply = alice.look(Some("cave")).unwrap();
        assert!(reply.starts_with("Damp stone in every direction."));
        assert!(!reply.starts_with("The Echoing Cave"), "no room heading on a plain look");
    }

    #[tokio::test]
    async fn bare_look_shows_the_room_without_the_looker() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");
        let _bob = join(&fx, "Bob");

        let reply = alice.look(None).unwrap();

        assert!(reply.starts_with("The Echoing Cave\r\n"));
        assert!(reply.contains("Weapons: rusty sword, shiny sword, whisper stone"));
        assert!(reply.contains("Bob"));
        assert!(!reply.contains("Alice"));
    }

    #[tokio::test]
    async fn inventory_lists_carried_children() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");
        assert_eq!(alice.inventory(), "You are carrying nothing.");

        let dagger = crate::entity::EntityDraft::new("bent dagger").build();
        alice.entity().add_child("inventory", &dagger);
        assert_eq!(alice.inventory(), "You are carrying: bent dagger.");
    }

    #[tokio::test]
    async fn untargeted_actions_format_the_no_match_with_the_source() {
        let fx = fixture().await;
        let alice = join(&fx, "Alice");
        assert_eq!(
            fx.world.parse(&alice, "ponder").unwrap(),
            "Alice gazes into the middle distance."
        );
    }

    #[test]
    fn name_validation_matches_the_greeter() {
        assert!(validate_name("Alice").is_ok());
        assert_eq!(
            validate_name("").unwrap_err(),
            "Please, speak up! I didn't hear a name."
        );
        assert_eq!(
            validate_name("Bartholomewbartholomew").unwrap_err(),
            "That's much too long to remember!"
        );
        assert_eq!(
            validate_name("Alice42").unwrap_err(),
            "I'm no good with numbers or spaces, and I only speak English!"
        );
    }
}
