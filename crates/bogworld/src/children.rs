//! Grouped child collections with a per-group alias index.
//!
//! Each entity keeps its children in named groups (`fixtures`, `occupants`,
//! `inventory`...). A group maintains two views that must stay consistent:
//! members in insertion order, and an alias-to-members index for resolution.
//! Index entries are derived from a child's alias list at add time; if the
//! list changes later, [`ChildSet::reindex`] re-derives them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::{Entity, EntityId};

pub struct ChildSet {
    prefix: String,
    revealed: bool,
    by_alias: HashMap<String, Vec<Arc<Entity>>>,
    members: Vec<Member>,
}

struct Member {
    entity: Arc<Entity>,
    /// The aliases this child was indexed under, kept so removal can take
    /// out exactly the entries addition put in.
    indexed: Vec<String>,
}

impl ChildSet {
    pub(crate) fn new() -> Self {
        Self {
            prefix: String::new(),
            revealed: true,
            by_alias: HashMap::new(),
            members: Vec::new(),
        }
    }

    /// Display label prepended to option and description lines. Empty means
    /// bare names.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Hidden groups stay out of descriptions but are still searchable.
    pub fn revealed(&self) -> bool {
        self.revealed
    }

    pub(crate) fn set_display(&mut self, prefix: &str, revealed: bool) {
        self.prefix = prefix.to_string();
        self.revealed = revealed;
    }

    /// Add a child, indexing its non-empty aliases. A child with no usable
    /// aliases is still a member; it just cannot be referred to by word.
    pub(crate) fn add(&mut self, child: &Arc<Entity>) {
        if self.contains(child.id()) {
            return;
        }
        let indexed: Vec<String> = child
            .aliases()
            .into_iter()
            .filter(|a| !a.is_empty())
            .collect();
        for alias in &indexed {
            self.by_alias
                .entry(alias.clone())
                .or_default()
                .push(Arc::clone(child));
        }
        self.members.push(Member {
            entity: Arc::clone(child),
            indexed,
        });
    }

    /// Remove a child and every index entry pointing at it.
    pub(crate) fn remove(&mut self, id: EntityId) -> bool {
        let Some(pos) = self.members.iter().position(|m| m.entity.id() == id) else {
            return false;
        };
        let member = self.members.remove(pos);
        for alias in &member.indexed {
            if let Some(bucket) = self.by_alias.get_mut(alias) {
                bucket.retain(|e| e.id() != id);
                if bucket.is_empty() {
                    self.by_alias.remove(alias);
                }
            }
        }
        true
    }

    /// Remove and re-add, picking up the child's current alias list.
    pub(crate) fn reindex(&mut self, child: &Arc<Entity>) -> bool {
        if !self.remove(child.id()) {
            return false;
        }
        self.add(child);
        true
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.members.iter().any(|m| m.entity.id() == id)
    }

    /// Members in insertion order.
    pub fn members(&self) -> Vec<Arc<Entity>> {
        self.members.iter().map(|m| Arc::clone(&m.entity)).collect()
    }

    /// Direct members indexed under `alias` (no recursion).
    pub(crate) fn find(&self, alias: &str) -> Vec<Arc<Entity>> {
        self.by_alias.get(alias).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::entity::{Entity, EntityDraft};

    fn room_with(children: &[Arc<Entity>]) -> Arc<Entity> {
        let room = EntityDraft::new("room").build();
        for child in children {
            room.add_child("stuff", child);
        }
        room
    }

    #[test]
    fn finds_single_match_at_depth() {
        let coin = EntityDraft::new("copper coin").alias("coin").build();
        let chest = EntityDraft::new("chest").alias("chest").build();
        chest.add_child("contents", &coin);
        let room = room_with(&[chest]);

        let options = room.children_by_alias("coin");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].entity.id(), coin.id());
    }

    #[test]
    fn finds_all_same_alias_matches() {
        let s1 = EntityDraft::new("rusty sword").alias("sword").build();
        let s2 = EntityDraft::new("gleaming sword").alias("sword").build();
        let bag = EntityDraft::new("bag").alias("bag").build();
        let s3 = EntityDraft::new("toy sword").alias("sword").build();
        bag.add_child("contents", &s3);
        let room = room_with(&[s1, s2, bag]);

        let options = room.children_by_alias("sword");
        assert_eq!(options.len(), 3);
        // Shallow matches come before the one inside the bag.
        assert_eq!(options[2].label, "toy sword");
    }

    #[test]
    fn search_is_case_insensitive() {
        let sword = EntityDraft::new("rusty sword").alias("sword").build();
        let room = room_with(&[sword]);
        assert_eq!(room.children_by_alias("SWORD").len(), 1);
    }

    #[test]
    fn empty_aliases_are_not_indexed_but_child_remains() {
        let statue = EntityDraft::new("old statue").alias("").build();
        let room = room_with(&[statue.clone()]);

        assert!(room.children_by_alias("statue").is_empty());
        assert_eq!(room.children().len(), 1);
        assert_eq!(room.children()[0].id(), statue.id());
    }

    #[test]
    fn removal_clears_index_entries() {
        let sword = EntityDraft::new("rusty sword").alias("sword").build();
        let room = room_with(&[sword.clone()]);

        assert!(room.remove_child(&sword));
        assert!(room.children_by_alias("sword").is_empty());
        assert!(room.children().is_empty());
        assert!(sword.parent().is_none());
        assert!(!room.remove_child(&sword));
    }

    #[test]
    fn reindex_follows_alias_changes() {
        let mirror = EntityDraft::new("tall mirror").alias("mirror").build();
        let room = room_with(&[mirror.clone()]);

        mirror.set_aliases(vec!["glass".to_string()]);
        // Index is stale until told otherwise.
        assert_eq!(room.children_by_alias("mirror").len(), 1);

        assert!(room.reindex_child(&mirror));
        assert!(room.children_by_alias("mirror").is_empty());
        assert_eq!(room.children_by_alias("glass").len(), 1);
    }

    #[test]
    fn labels_carry_the_group_prefix() {
        let sword = EntityDraft::new("rusty sword").alias("sword").build();
        let room = EntityDraft::new("room").build();
        room.configure_group("fixtures", "Nearby", true);
        room.add_child("fixtures", &sword);

        let options = room.children_by_alias("sword");
        assert_eq!(options[0].label, "Nearby: rusty sword");
    }

    #[test]
    fn double_add_is_a_no_op() {
        let sword = EntityDraft::new("rusty sword").alias("sword").build();
        let room = EntityDraft::new("room").build();
        room.add_child("stuff", &sword);
        room.add_child("stuff", &sword);

        assert_eq!(room.children().len(), 1);
        assert_eq!(room.children_by_alias("sword").len(), 1);
    }
}
