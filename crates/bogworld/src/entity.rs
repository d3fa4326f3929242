//! Entities: the nodes of the interactive object graph.
//!
//! An entity is almost everything in the world: rooms, items, characters,
//! exits, players. Shape is uniform; meaning comes from which reactions and
//! fields content attaches. Entities are shared (`Arc`) and mutated from
//! many tasks, so each mutable concern sits behind its own lock and nothing
//! here ever holds one across an await point.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde_json::{Map, Value};

use crate::ambiguity::AmbiguityOption;
use crate::children::ChildSet;
use crate::error::WorldError;
use crate::event::{ActionKind, Event, EventRole};
use crate::lock::{read, write};

/// Opaque reaction capability. The engine invokes it with the event that
/// matched; where the closure came from is not the engine's business.
pub type ReactionFn = Arc<dyn Fn(&Event) + Send + Sync>;

/// Generated unique id for one entity instance. Content never assigns these;
/// world files address top-level entities by handle instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u128);

impl EntityId {
    pub fn generate() -> Self {
        let mut b = [0u8; 16];
        getrandom::getrandom(&mut b).expect("getrandom");
        Self(u128::from_be_bytes(b))
    }

    /// Short form for logs.
    pub fn short(self) -> u64 {
        (self.0 as u64) ^ ((self.0 >> 64) as u64)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({:016x})", self.short())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.short())
    }
}

pub struct Entity {
    id: EntityId,
    name: String,
    description: String,
    tags: Vec<String>,
    aliases: RwLock<Vec<String>>,
    fields: RwLock<Map<String, Value>>,
    reactions: RwLock<HashMap<(ActionKind, EventRole), ReactionFn>>,
    init: Option<ReactionFn>,
    parent: RwLock<Weak<Entity>>,
    children: RwLock<HashMap<String, ChildSet>>,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn aliases(&self) -> Vec<String> {
        read(&self.aliases).clone()
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        let alias = alias.to_ascii_lowercase();
        read(&self.aliases).iter().any(|a| *a == alias)
    }

    /// Replace the alias list. The parent's index does not follow
    /// automatically; call [`Entity::reindex_child`] on the parent after.
    pub fn set_aliases(&self, aliases: Vec<String>) {
        *write(&self.aliases) = normalize_aliases(aliases);
    }

    // --- field store ---------------------------------------------------

    /// Read a (copy of a) field by dotted path.
    pub fn field(&self, path: &str) -> Option<Value> {
        let fields = read(&self.fields);
        let mut current: &Value = fields.get(path.split('.').next()?)?;
        for key in path.split('.').skip(1) {
            current = current.as_object()?.get(key)?;
        }
        Some(current.clone())
    }

    pub fn field_str(&self, path: &str) -> Option<String> {
        self.field(path)?.as_str().map(str::to_string)
    }

    pub fn field_u64(&self, path: &str) -> Option<u64> {
        self.field(path)?.as_u64()
    }

    pub fn field_i64(&self, path: &str) -> Option<i64> {
        self.field(path)?.as_i64()
    }

    /// Write a field by dotted path, creating intermediate maps as needed.
    /// An intermediate that exists but is not a map is replaced by a fresh
    /// map; the old value at that spot is gone.
    pub fn set_field(&self, path: &str, value: Value) -> Result<(), WorldError> {
        let keys: Vec<&str> = path.split('.').collect();
        if path.is_empty() || keys.iter().any(|k| k.is_empty()) {
            return Err(WorldError::InvalidFieldPath(path.to_string()));
        }

        let mut fields = write(&self.fields);
        let mut current: &mut Map<String, Value> = &mut fields;
        for key in &keys[..keys.len() - 1] {
            let slot = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot.as_object_mut() {
                Some(map) => map,
                None => return Err(WorldError::InvalidFieldPath(path.to_string())),
            };
        }
        current.insert(keys[keys.len() - 1].to_string(), value);
        Ok(())
    }

    // --- reactions -----------------------------------------------------

    /// Register a reaction for one `(kind, role)` pair, replacing any
    /// previous registration for that exact pair.
    pub fn add_reaction(&self, kind: &str, role: EventRole, f: ReactionFn) {
        write(&self.reactions).insert((ActionKind::new(kind), role), f);
    }

    pub fn reaction(&self, kind: &ActionKind, role: EventRole) -> Option<ReactionFn> {
        read(&self.reactions).get(&(kind.clone(), role)).cloned()
    }

    pub fn init_reaction(&self) -> Option<ReactionFn> {
        self.init.clone()
    }

    // --- graph ---------------------------------------------------------

    /// The owning parent, if it is still alive.
    pub fn parent(&self) -> Option<Arc<Entity>> {
        read(&self.parent).upgrade()
    }

    fn set_parent(&self, parent: Option<&Arc<Entity>>) {
        *write(&self.parent) = match parent {
            Some(p) => Arc::downgrade(p),
            None => Weak::new(),
        };
    }

    /// Put `child` into the named group, creating the group on first use.
    /// The child leaves its previous parent first: an entity lives in at
    /// most one group of one parent at a time.
    pub fn add_child(self: &Arc<Self>, group: &str, child: &Arc<Entity>) {
        if let Some(old) = child.parent() {
            old.remove_child(child);
        }
        write(&self.children)
            .entry(group.to_string())
            .or_insert_with(ChildSet::new)
            .add(child);
        child.set_parent(Some(self));
    }

    /// Remove `child` from whichever group holds it. Returns whether it was
    /// here at all.
    pub fn remove_child(&self, child: &Arc<Entity>) -> bool {
        let mut groups = write(&self.children);
        for set in groups.values_mut() {
            if set.remove(child.id()) {
                child.set_parent(None);
                return true;
            }
        }
        false
    }

    /// Re-derive the index entries for `child` from its current alias list.
    /// Must be called after [`Entity::set_aliases`] on an attached child;
    /// stale aliases are not repaired any other way.
    pub fn reindex_child(&self, child: &Arc<Entity>) -> bool {
        let mut groups = write(&self.children);
        for set in groups.values_mut() {
            if set.contains(child.id()) {
                set.reindex(child);
                return true;
            }
        }
        false
    }

    /// Set display config for a group, creating it if needed.
    pub fn configure_group(&self, group: &str, prefix: &str, revealed: bool) {
        write(&self.children)
            .entry(group.to_string())
            .or_insert_with(ChildSet::new)
            .set_display(prefix, revealed);
    }

    /// Direct children across all groups, insertion order within each group.
    pub fn children(&self) -> Vec<Arc<Entity>> {
        let groups = read(&self.children);
        let mut names: Vec<&String> = groups.keys().collect();
        names.sort();
        let mut out = Vec::new();
        for name in names {
            out.extend(groups[name].members());
        }
        out
    }

    /// Direct children of one group.
    pub fn group_children(&self, group: &str) -> Vec<Arc<Entity>> {
        read(&self.children)
            .get(group)
            .map(ChildSet::members)
            .unwrap_or_default()
    }

    /// Every descendant matching `alias`, shallowest first: this entity's
    /// own index, then each child's subtree. Labels carry the group prefix
    /// so a player can tell two same-alias matches apart.
    pub fn children_by_alias(&self, alias: &str) -> Vec<AmbiguityOption> {
        let alias = alias.to_ascii_lowercase();
        let (mut options, descendants) = {
            let groups = read(&self.children);
            let mut names: Vec<&String> = groups.keys().collect();
            names.sort();
            let mut options = Vec::new();
            let mut descendants = Vec::new();
            for name in names {
                let set = &groups[name];
                for child in set.find(&alias) {
                    options.push(AmbiguityOption {
                        label: option_label(set.prefix(), child.name()),
                        entity: child,
                    });
                }
                descendants.extend(set.members());
            }
            (options, descendants)
        };
        // Recurse with no lock held; the graph is a tree, but a reaction
        // fired from a match below should not find us still locked.
        for child in descendants {
            options.extend(child.children_by_alias(&alias));
        }
        options
    }

    // --- rendering -----------------------------------------------------

    /// The description a player sees when looking at this entity: its text
    /// plus the contents of each revealed group.
    pub fn describe(&self) -> String {
        self.describe_inner(None)
    }

    /// Room form: name heading first, and `exclude` (the viewer) left out
    /// of any listing.
    pub fn describe_as_room(&self, exclude: Option<EntityId>) -> String {
        format!("{}\r\n{}", self.name, self.describe_inner(exclude))
    }

    fn describe_inner(&self, exclude: Option<EntityId>) -> String {
        let mut out = self.description.clone();
        let groups = read(&self.children);
        let mut names: Vec<&String> = groups.keys().collect();
        names.sort();
        for name in names {
            let set = &groups[name];
            if !set.revealed() {
                continue;
            }
            let members: Vec<String> = set
                .members()
                .iter()
                .filter(|c| Some(c.id()) != exclude)
                .map(|c| c.name().to_string())
                .collect();
            if members.is_empty() {
                continue;
            }
            let line = if set.prefix().is_empty() {
                members.join(", ")
            } else {
                format!("{}: {}", set.prefix(), members.join(", "))
            };
            if !out.is_empty() {
                out.push_str("\r\n");
            }
            out.push_str(&line);
        }
        out
    }
}

fn option_label(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}: {name}")
    }
}

fn normalize_aliases(aliases: Vec<String>) -> Vec<String> {
    aliases
        .into_iter()
        .map(|a| a.trim().to_ascii_lowercase())
        .collect()
}

/// A not-yet-shared entity under construction: what the loader builds from a
/// spec and what a template copy starts from. Becomes an [`Entity`] (with a
/// fresh id and no children) on [`EntityDraft::build`].
#[derive(Default)]
pub struct EntityDraft {
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    pub fields: Map<String, Value>,
    pub reactions: HashMap<(ActionKind, EventRole), ReactionFn>,
    pub init: Option<ReactionFn>,
}

impl EntityDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn reaction<F>(mut self, kind: &str, role: EventRole, f: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.reactions
            .insert((ActionKind::new(kind), role), Arc::new(f));
        self
    }

    pub fn init<F>(mut self, f: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Arc<Entity> {
        Arc::new(Entity {
            id: EntityId::generate(),
            name: self.name,
            description: self.description,
            tags: self.tags,
            aliases: RwLock::new(normalize_aliases(self.aliases)),
            fields: RwLock::new(self.fields),
            reactions: RwLock::new(self.reactions),
            init: self.init,
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(HashMap::new()),
        })
    }
}

impl Entity {
    /// Start a draft copying this entity's definition: name, description,
    /// aliases, tags, fields, reactions, init. Children and parent are not
    /// copied, and the built copy gets its own id. Reaction closures are
    /// shared, field values are not.
    pub fn draft(&self) -> EntityDraft {
        EntityDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            aliases: self.aliases(),
            tags: self.tags.clone(),
            fields: read(&self.fields).clone(),
            reactions: read(&self.reactions).clone(),
            init: self.init.clone(),
        }
    }
}
