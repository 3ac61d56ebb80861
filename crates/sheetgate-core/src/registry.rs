use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::{debug, trace};

/// Session ↔ stored-name ownership.
///
/// `owners` (name → session) is authoritative. `by_session` is kept in step
/// while the name's `owners` entry is held, always locking `owners` before
/// `by_session`, so the two indices never disagree for a tracked name.
#[derive(Debug, Default)]
pub struct OwnershipRegistry {
    owners: DashMap<String, String>,
    by_session: DashMap<String, DashSet<String>>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `session` as owner of `filename`. Last writer wins.
    pub fn track(&self, session: &str, filename: &str) {
        match self.owners.entry(filename.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get() == session {
                    return;
                }
                let previous = occupied.insert(session.to_string());
                if let Some(names) = self.by_session.get(&previous) {
                    names.remove(filename);
                }
                // The `get` guard is gone by now; both can land on one shard.
                self.by_session
                    .remove_if(&previous, |_, names| names.is_empty());
                self.by_session
                    .entry(session.to_string())
                    .or_default()
                    .insert(filename.to_string());
                debug!(filename, "ownership reassigned to a new session");
            }
            Entry::Vacant(vacant) => {
                self.by_session
                    .entry(session.to_string())
                    .or_default()
                    .insert(filename.to_string());
                vacant.insert(session.to_string());
                trace!(filename, "ownership recorded");
            }
        }
    }

    pub fn verify(&self, session: &str, filename: &str) -> bool {
        self.owners
            .get(filename)
            .map(|owner| owner.value() == session)
            .unwrap_or(false)
    }

    pub fn owner_of(&self, filename: &str) -> Option<String> {
        self.owners.get(filename).map(|owner| owner.value().clone())
    }

    /// Names currently owned by `session`, sorted.
    pub fn files_for(&self, session: &str) -> Vec<String> {
        // Copy out first: holding a `by_session` guard while reading `owners`
        // would invert the lock order used by `track`.
        let candidates: Vec<String> = match self.by_session.get(session) {
            Some(names) => names.iter().map(|n| n.key().clone()).collect(),
            None => return Vec::new(),
        };
        let mut owned: Vec<String> = candidates
            .into_iter()
            .filter(|name| self.verify(session, name))
            .collect();
        owned.sort();
        owned
    }

    /// Drops every association of `session`. Returns how many names it owned.
    pub fn forget(&self, session: &str) -> usize {
        let Some((_, names)) = self.by_session.remove(session) else {
            return 0;
        };
        let mut released = 0;
        for name in names.iter() {
            if self
                .owners
                .remove_if(name.key(), |_, owner| owner == session)
                .is_some()
            {
                released += 1;
            }
        }
        debug!(released, "session ownership forgotten");
        released
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
