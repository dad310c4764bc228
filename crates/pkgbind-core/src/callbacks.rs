//! Registry of host callbacks by event id.

use pkgbind_schema::EventId;
use std::collections::HashMap;

/// Maps each event id to the name of the host callable handling it.
///
/// Entries are only added or replaced by the host; the bindings never
/// remove one until teardown.
#[derive(Debug, Default)]
pub struct Callbacks {
    names: HashMap<EventId, String>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` for `event`, replacing a previous registration.
    pub fn set(&mut self, event: EventId, name: &str) {
        if let Some(old) = self.names.insert(event, name.to_string()) {
            tracing::debug!(%event, "Replacing callback {old} with {name}");
        }
    }

    pub fn name_of(&self, event: EventId) -> Option<&str> {
        self.names.get(&event).map(String::as_str)
    }

    pub fn is_set(&self, event: EventId) -> bool {
        self.names.contains_key(&event)
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
