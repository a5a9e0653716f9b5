//! Single-room chat coordination.
//!
//! [`room::ChatRoom`] is the event router: a synchronous state machine that
//! owns the presence registry, the typing tracker and the bounded message
//! log, and turns every client event into an ordered list of
//! [`room::Dispatch`]es. [`hub::Hub`] wraps it behind one lock together with
//! the live connection outboxes so that applying an event and delivering its
//! output is a single atomic step.

pub mod history;
pub mod hub;
pub mod presence;
pub mod protocol;
pub mod room;
pub mod typing;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use history::{Message, MessageId, MessageLog, PrivateMessage};
pub use hub::Hub;
pub use presence::{Presence, Registry};
pub use protocol::{ClientEvent, ServerEvent};
pub use room::{ChatRoom, Dispatch, Target};
pub use typing::TypingTracker;

/// Identity of one live transport connection.
///
/// Minted once per WebSocket upgrade; a reconnect is a new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(pub Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
