use std::collections::BTreeMap;

use super::ConnId;

/// Connections currently composing a message, with their display names.
#[derive(Debug, Default)]
pub struct TypingTracker {
    typing: BTreeMap<ConnId, String>,
}

impl TypingTracker {
    pub fn set(&mut self, id: ConnId, username: &str, is_typing: bool) {
        if is_typing {
            self.typing.insert(id, username.to_owned());
        } else {
            self.typing.remove(&id);
        }
    }

    /// Returns whether `id` was typing.
    pub fn clear(&mut self, id: ConnId) -> bool {
        self.typing.remove(&id).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.typing.values().cloned().collect()
    }
}
