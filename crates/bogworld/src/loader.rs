//! World files: YAML in, a wired entity graph out.
//!
//! Structural problems are hard errors (unparseable YAML, a start room
//! that does not exist). Content problems are warnings: the offending
//! reaction or child is skipped and the rest of the world still loads,
//! so one typo in a big file does not take the game down.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use bogcmd::CommandDef;

use crate::behavior::BehaviorRegistry;
use crate::entity::{Entity, EntityDraft};
use crate::event::{ActionKind, EventRole};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unreadable world file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("start_room '{0}' is not a defined entity")]
    MissingStartRoom(String),
}

/// A piece of content the loader refused, with where it sits in the file.
/// Paths read like `tavern.fixtures[1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    UnknownRole { path: String, role: String },
    UnknownBehavior { path: String, behavior: String },
    NamelessChild { path: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRole { path, role } => {
                write!(f, "{path}: unknown role '{role}', reaction skipped")
            }
            Self::UnknownBehavior { path, behavior } => {
                write!(f, "{path}: unknown behavior '{behavior}', skipped")
            }
            Self::NamelessChild { path } => {
                write!(f, "{path}: child entry has no name, skipped")
            }
        }
    }
}

#[derive(Debug)]
pub struct LoadedWorld {
    pub start_room: String,
    pub entities: HashMap<String, Arc<Entity>>,
    pub commands: Vec<CommandDef>,
    pub warnings: Vec<LoadWarning>,
}

#[derive(Debug, Deserialize)]
struct WorldFile {
    start_room: String,
    #[serde(default)]
    entities: BTreeMap<String, EntitySpec>,
    #[serde(default)]
    commands: Vec<CommandDef>,
}

#[derive(Debug, Default, Deserialize)]
struct EntitySpec {
    /// Display name; top-level entries default to their map key.
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    fields: Map<String, Value>,
    /// Behavior to run once during world init.
    #[serde(default)]
    init: Option<String>,
    #[serde(default)]
    reactions: Vec<ReactionSpec>,
    #[serde(default)]
    children: BTreeMap<String, GroupSpec>,
}

#[derive(Debug, Deserialize)]
struct ReactionSpec {
    on: String,
    role: String,
    #[serde(rename = "do")]
    behavior: String,
}

#[derive(Debug, Deserialize)]
struct GroupSpec {
    #[serde(default)]
    prefix: String,
    #[serde(default = "default_revealed")]
    revealed: bool,
    #[serde(default)]
    entries: Vec<EntitySpec>,
}

fn default_revealed() -> bool {
    true
}

/// Parse `text` and build every entity, resolving behavior names through
/// `behaviors`. Warnings accumulate; only structure fails the load.
pub fn load_world(text: &str, behaviors: &BehaviorRegistry) -> Result<LoadedWorld, LoadError> {
    let file: WorldFile = serde_yaml::from_str(text)?;
    let mut warnings = Vec::new();
    let mut entities = HashMap::with_capacity(file.entities.len());
    for (handle, spec) in &file.entities {
        let name = spec.name.as_deref().unwrap_or(handle);
        let entity = build_entity(spec, name, handle, behaviors, &mut warnings);
        entities.insert(handle.clone(), entity);
    }
    if !entities.contains_key(&file.start_room) {
        return Err(LoadError::MissingStartRoom(file.start_room));
    }
    Ok(LoadedWorld {
        start_room: file.start_room,
        entities,
        commands: file.commands,
        warnings,
    })
}

fn build_entity(
    spec: &EntitySpec,
    name: &str,
    path: &str,
    behaviors: &BehaviorRegistry,
    warnings: &mut Vec<LoadWarning>,
) -> Arc<Entity> {
    let mut draft = EntityDraft::new(name);
    draft.description = spec.description.clone();
    draft.aliases = spec.aliases.clone();
    draft.tags = spec.tags.clone();
    draft.fields = spec.fields.clone();

    for reaction in &spec.reactions {
        let role = match EventRole::parse(&reaction.role) {
            Ok(role) => role,
            Err(_) => {
                warnings.push(LoadWarning::UnknownRole {
                    path: path.to_string(),
                    role: reaction.role.clone(),
                });
                continue;
            }
        };
        let Some(handler) = behaviors.get(&reaction.behavior) else {
            warnings.push(LoadWarning::UnknownBehavior {
                path: path.to_string(),
                behavior: reaction.behavior.clone(),
            });
            continue;
        };
        draft
            .reactions
            .insert((ActionKind::new(&reaction.on), role), handler);
    }

    if let Some(init) = &spec.init {
        match behaviors.get(init) {
            Some(handler) => draft.init = Some(handler),
            None => warnings.push(LoadWarning::UnknownBehavior {
                path: format!("{path}.init"),
                behavior: init.clone(),
            }),
        }
    }

    let entity = draft.build();

    for (group, group_spec) in &spec.children {
        entity.configure_group(group, &group_spec.prefix, group_spec.revealed);
        for (index, child_spec) in group_spec.entries.iter().enumerate() {
            let child_path = format!("{path}.{group}[{index}]");
            let Some(child_name) = child_spec.name.as_deref() else {
                warnings.push(LoadWarning::NamelessChild { path: child_path });
                continue;
            };
            let child = build_entity(child_spec, child_name, &child_path, behaviors, warnings);
            entity.add_child(group, &child);
        }
    }

    entity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_behaviors() -> BehaviorRegistry {
        BehaviorRegistry::new()
    }

    #[test]
    fn a_minimal_world_loads() {
        let loaded = load_world(
            "start_room: tavern\nentities:\n  tavern:\n    description: A low-ceilinged room.\n",
            &no_behaviors(),
        )
        .unwrap();
        assert_eq!(loaded.start_room, "tavern");
        assert!(loaded.warnings.is_empty());
        let tavern = &loaded.entities["tavern"];
        assert_eq!(tavern.name(), "tavern");
        assert_eq!(tavern.description(), "A low-ceilinged room.");
    }

    #[test]
    fn top_level_names_default_to_the_handle_but_can_be_set() {
        let loaded = load_world(
            "start_room: tavern\nentities:\n  tavern:\n    name: The Prancing Boglin\n",
            &no_behaviors(),
        )
        .unwrap();
        assert_eq!(loaded.entities["tavern"].name(), "The Prancing Boglin");
    }

    #[test]
    fn missing_start_room_is_a_hard_error() {
        let err = load_world("start_room: void\nentities:\n  tavern: {}\n", &no_behaviors())
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingStartRoom(room) if room == "void"));
    }

    #[test]
    fn unparseable_yaml_is_a_hard_error() {
        let err = load_world("start_room: [unclosed", &no_behaviors()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn children_come_out_grouped_and_configured() {
        let text = r#"
start_room: tavern
entities:
  tavern:
    children:
      fixtures:
        prefix: "You see"
        entries:
          - name: barrel
            aliases: [barrel, keg]
      secrets:
        revealed: false
        entries:
          - name: trapdoor
            aliases: [trapdoor]
"#;
        let loaded = load_world(text, &no_behaviors()).unwrap();
        let tavern = &loaded.entities["tavern"];
        assert_eq!(tavern.children().len(), 2);
        let barrel = &tavern.group_children("fixtures")[0];
        assert!(barrel.has_alias("keg"));
        assert_eq!(
            barrel.parent().map(|p| p.id()),
            Some(tavern.id()),
            "children point back at their parent"
        );
        // Display config made it through: revealed group shows with its
        // prefix, the hidden one does not show at all.
        let described = tavern.describe();
        assert!(described.contains("You see: barrel"));
        assert!(!described.contains("trapdoor"));
    }

    #[test]
    fn nested_children_load_all_the_way_down() {
        let text = r#"
start_room: tavern
entities:
  tavern:
    children:
      fixtures:
        entries:
          - name: barrel
            children:
              contents:
                entries:
                  - name: dead rat
                    aliases: [rat]
"#;
        let loaded = load_world(text, &no_behaviors()).unwrap();
        let matches = loaded.entities["tavern"].children_by_alias("rat");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].entity.name(), "dead rat");
    }

    #[test]
    fn reactions_bind_through_the_behavior_registry() {
        let behaviors = BehaviorRegistry::new().with("tap", |_event| {});
        let text = r#"
start_room: tavern
entities:
  tavern:
    children:
      fixtures:
        entries:
          - name: barrel
            reactions:
              - on: drink
                role: target
                do: tap
"#;
        let loaded = load_world(text, &behaviors).unwrap();
        assert!(loaded.warnings.is_empty());
        let matches = loaded.entities["tavern"].children_by_alias("barrel");
        assert!(matches.is_empty(), "barrel declared no aliases");
        let barrel = &loaded.entities["tavern"].group_children("fixtures")[0];
        assert!(barrel
            .reaction(&ActionKind::new("drink"), EventRole::Target)
            .is_some());
    }

    #[test]
    fn unknown_roles_and_behaviors_warn_and_skip() {
        let behaviors = BehaviorRegistry::new().with("tap", |_event| {});
        let text = r#"
start_room: tavern
entities:
  tavern:
    init: fanfare
    reactions:
      - on: drink
        role: bystander
        do: tap
      - on: drink
        role: target
        do: pour
      - on: drink
        role: target
        do: tap
"#;
        let loaded = load_world(text, &behaviors).unwrap();
        assert_eq!(
            loaded.warnings,
            vec![
                LoadWarning::UnknownRole {
                    path: "tavern".into(),
                    role: "bystander".into(),
                },
                LoadWarning::UnknownBehavior {
                    path: "tavern".into(),
                    behavior: "pour".into(),
                },
                LoadWarning::UnknownBehavior {
                    path: "tavern.init".into(),
                    behavior: "fanfare".into(),
                },
            ]
        );
        // The one well-formed reaction still bound.
        assert!(loaded.entities["tavern"]
            .reaction(&ActionKind::new("drink"), EventRole::Target)
            .is_some());
    }

    #[test]
    fn nameless_children_warn_and_their_siblings_survive() {
        let text = r#"
start_room: tavern
entities:
  tavern:
    children:
      fixtures:
        entries:
          - aliases: [mystery]
          - name: barrel
"#;
        let loaded = load_world(text, &no_behaviors()).unwrap();
        assert_eq!(
            loaded.warnings,
            vec![LoadWarning::NamelessChild {
                path: "tavern.fixtures[0]".into(),
            }]
        );
        let fixtures = loaded.entities["tavern"].group_children("fixtures");
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].name(), "barrel");
    }

    #[test]
    fn fields_keep_their_structure() {
        let text = r#"
start_room: tavern
entities:
  tavern:
    fields:
      mood: rowdy
      kegs:
        ale: 3
"#;
        let loaded = load_world(text, &no_behaviors()).unwrap();
        let tavern = &loaded.entities["tavern"];
        assert_eq!(tavern.field_str("mood").as_deref(), Some("rowdy"));
        assert_eq!(tavern.field_u64("kegs.ale"), Some(3));
    }

    #[test]
    fn commands_ride_along() {
        let text = r#"
start_room: tavern
entities:
  tavern: {}
commands:
  - name: hit
    aliases: [hit, strike]
    patterns:
      - tokens: "hit {target}"
        help: whack something
"#;
        let loaded = load_world(text, &no_behaviors()).unwrap();
        assert_eq!(loaded.commands.len(), 1);
        assert_eq!(loaded.commands[0].name, "hit");
        assert_eq!(loaded.commands[0].aliases, ["hit", "strike"]);
        assert_eq!(loaded.commands[0].patterns[0].tokens, "hit {target}");
    }
}
