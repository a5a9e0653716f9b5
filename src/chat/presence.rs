use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConnId;

/// Display name used when a connection has no presence record.
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub id: ConnId,
    pub username: String,
    pub online: bool,
}

/// Who is in the room right now.
///
/// Records are deleted on leave; there is no offline roster.
#[derive(Debug, Default)]
pub struct Registry {
    users: BTreeMap<ConnId, Presence>,
}

impl Registry {
    /// Inserts or overwrites the record for `id`. Names are not unique.
    pub fn join(&mut self, id: ConnId, username: String) -> &Presence {
        let presence = Presence { id, username, online: true };
        self.users.insert(id, presence);
        &self.users[&id]
    }

    /// Removes `id` and hands back its record flagged offline.
    pub fn leave(&mut self, id: ConnId) -> Option<Presence> {
        self.users.remove(&id).map(|mut presence| {
            presence.online = false;
            presence
        })
    }

    pub fn list(&self) -> Vec<Presence> {
        self.users.values().cloned().collect()
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.users.contains_key(&id)
    }

    pub fn lookup(&self, id: ConnId) -> &str {
        self.users
            .get(&id)
            .map_or(ANONYMOUS, |presence| presence.username.as_str())
    }
}
