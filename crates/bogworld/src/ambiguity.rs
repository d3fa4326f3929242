//! Multi-turn disambiguation.
//!
//! When an alias matches more than one entity, the action does not guess and
//! does not fail: it suspends. The suspended form is an [`Ambiguity`], one
//! slot per ambiguous role, carrying a closure that finishes the original
//! action once every slot has a chosen entity. [`PendingAction`] walks a
//! player through the slots one numbered reply at a time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::WorldError;
use crate::event::EventRole;

/// One selectable candidate.
#[derive(Debug, Clone)]
pub struct AmbiguityOption {
    pub label: String,
    pub entity: Arc<Entity>,
}

/// One question to put to the player.
#[derive(Debug, Clone)]
pub struct AmbiguitySlot {
    pub role: EventRole,
    pub prompt: String,
    pub options: Vec<AmbiguityOption>,
}

/// Finishes the suspended action given one chosen entity per slot role.
pub type ResumeFn =
    Box<dyn FnOnce(HashMap<EventRole, Arc<Entity>>) -> Result<String, WorldError> + Send + Sync>;

/// A suspended action: the questions still open plus how to finish.
pub struct Ambiguity {
    pub slots: Vec<AmbiguitySlot>,
    resume: ResumeFn,
}

impl Ambiguity {
    pub fn new(slots: Vec<AmbiguitySlot>, resume: ResumeFn) -> Self {
        debug_assert!(!slots.is_empty());
        Self { slots, resume }
    }
}

impl fmt::Debug for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ambiguity")
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

/// What one reply did to a pending action.
#[derive(Debug)]
pub enum Progress {
    /// Selection recorded; here is the next question.
    Await {
        pending: PendingAction,
        prompt: String,
    },
    /// Every slot filled; the action ran and this is its outcome.
    Complete(Result<String, WorldError>),
    /// The reply was not a valid selection. The whole pending action is
    /// gone, selections included, and the reply must not be reinterpreted
    /// as a command.
    Aborted,
}

/// Per-player suspended state. Owned by the connection task; replies are
/// fed in one line at a time.
pub struct PendingAction {
    ambiguity: Ambiguity,
    step: usize,
    selected: HashMap<EventRole, usize>,
}

impl fmt::Debug for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAction")
            .field("step", &self.step)
            .field("slots", &self.ambiguity.slots.len())
            .finish_non_exhaustive()
    }
}

impl PendingAction {
    /// Begin resolving, returning the prompt for the first slot.
    pub fn start(ambiguity: Ambiguity) -> (PendingAction, String) {
        let pending = PendingAction {
            ambiguity,
            step: 0,
            selected: HashMap::new(),
        };
        let prompt = pending.prompt();
        (pending, prompt)
    }

    /// The current slot's question with its options numbered from 1.
    pub fn prompt(&self) -> String {
        let slot = &self.ambiguity.slots[self.step];
        let mut out = slot.prompt.clone();
        for (i, option) in slot.options.iter().enumerate() {
            out.push_str(&format!("\r\n  {}) {}", i + 1, option.label));
        }
        out
    }

    /// Feed one reply line. Only an integer within the current slot's range
    /// advances; anything else discards the whole pending action.
    pub fn advance(mut self, line: &str) -> Progress {
        let slot = &self.ambiguity.slots[self.step];
        let Ok(n) = line.trim().parse::<usize>() else {
            return Progress::Aborted;
        };
        if n < 1 || n > slot.options.len() {
            return Progress::Aborted;
        }

        self.selected.insert(slot.role, n - 1);
        self.step += 1;

        if self.step < self.ambiguity.slots.len() {
            let prompt = self.prompt();
            return Progress::Await {
                pending: self,
                prompt,
            };
        }

        let Ambiguity { slots, resume } = self.ambiguity;
        let chosen: HashMap<EventRole, Arc<Entity>> = slots
            .iter()
            .map(|slot| {
                let index = self.selected[&slot.role];
                (slot.role, Arc::clone(&slot.options[index].entity))
            })
            .collect();
        Progress::Complete(resume(chosen))
    }
}
