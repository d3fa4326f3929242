//! Room-scoped fan-out to per-player mailboxes.
//!
//! Two indices under one lock: room to subscribers, player to room. They
//! move together or not at all. Delivery is fire-and-forget `try_send`: a
//! full mailbox misses narration, and no publisher ever blocks on a slow
//! reader.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use crate::entity::{Entity, EntityId};
use crate::lock::{read, write};

/// Outbound queue for one connected player, drained by that connection's
/// writer task.
pub type Mailbox = mpsc::Sender<String>;

#[derive(Debug, Default)]
struct BusState {
    subscribers: HashMap<EntityId, HashMap<EntityId, Mailbox>>,
    room_of: HashMap<EntityId, EntityId>,
}

#[derive(Debug, Default)]
pub struct RoomBus {
    state: RwLock<BusState>,
}

impl RoomBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `player`'s mailbox in `room`, leaving any previous room first.
    pub fn subscribe(&self, room: &Arc<Entity>, player: &Arc<Entity>, mailbox: Mailbox) {
        let mut state = write(&self.state);
        detach(&mut state, player.id());
        state
            .subscribers
            .entry(room.id())
            .or_default()
            .insert(player.id(), mailbox);
        state.room_of.insert(player.id(), room.id());
    }

    /// Carry an existing subscription over to `to_room`. A player with no
    /// current mailbox is not the bus's concern: no-op.
    pub fn move_player(&self, to_room: &Arc<Entity>, player: &Arc<Entity>) {
        let mut state = write(&self.state);
        let Some(mailbox) = take_mailbox(&mut state, player.id()) else {
            return;
        };
        state
            .subscribers
            .entry(to_room.id())
            .or_default()
            .insert(player.id(), mailbox);
        state.room_of.insert(player.id(), to_room.id());
    }

    /// Drop the player's subscription wherever it actually is. The bus's
    /// own player-to-room index wins over the caller's idea of the room.
    pub fn unsubscribe(&self, room: &Arc<Entity>, player: &Arc<Entity>) {
        let mut state = write(&self.state);
        detach(&mut state, player.id());
        // In case the caller's room and the index ever disagree.
        remove_subscriber(&mut state, room.id(), player.id());
    }

    /// Deliver `text` to everyone in `room` except `exclude`. Best effort.
    pub fn publish(&self, room: &Arc<Entity>, text: &str, exclude: &[&Arc<Entity>]) {
        let targets: Vec<Mailbox> = {
            let state = read(&self.state);
            let Some(subscribers) = state.subscribers.get(&room.id()) else {
                return;
            };
            subscribers
                .iter()
                .filter(|(id, _)| !exclude.iter().any(|e| e.id() == **id))
                .map(|(_, mailbox)| mailbox.clone())
                .collect()
        };
        // Send outside the lock; a full mailbox just misses this one.
        for mailbox in targets {
            let _ = mailbox.try_send(text.to_string());
        }
    }

    /// Deliver to one player's current mailbox, wherever they are.
    pub fn publish_to(&self, player: &Arc<Entity>, text: &str) {
        let mailbox = {
            let state = read(&self.state);
            let Some(room) = state.room_of.get(&player.id()) else {
                return;
            };
            state
                .subscribers
                .get(room)
                .and_then(|subs| subs.get(&player.id()))
                .cloned()
        };
        if let Some(mailbox) = mailbox {
            let _ = mailbox.try_send(text.to_string());
        }
    }
}

fn detach(state: &mut BusState, player: EntityId) {
    if let Some(room) = state.room_of.remove(&player) {
        remove_subscriber(state, room, player);
    }
}

fn remove_subscriber(state: &mut BusState, room: EntityId, player: EntityId) {
    if let Some(subscribers) = state.subscribers.get_mut(&room) {
        subscribers.remove(&player);
        if subscribers.is_empty() {
            state.subscribers.remove(&room);
        }
    }
}

fn take_mailbox(state: &mut BusState, player: EntityId) -> Option<Mailbox> {
    let room = *state.room_of.get(&player)?;
    let subscribers = state.subscribers.get_mut(&room)?;
    let mailbox = subscribers.remove(&player)?;
    if subscribers.is_empty() {
        state.subscribers.remove(&room);
    }
    state.room_of.remove(&player);
    Some(mailbox)
}
