//! Named reaction handlers for world files to refer to.
//!
//! Entity definitions bind `(action, role)` pairs to behaviors by name;
//! the host registers the actual closures here before loading.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::ReactionFn;
use crate::event::Event;

#[derive(Default)]
pub struct BehaviorRegistry {
    handlers: HashMap<String, ReactionFn>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Arc::new(handler));
    }

    pub fn with<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<ReactionFn> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
