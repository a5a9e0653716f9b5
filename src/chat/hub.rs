//! Shared owner of the room and of every live connection's outbox.
//!
//! Mutating events run under the write lock from state change to the last
//! outbox push. Outboxes are unbounded so a push never waits, which keeps
//! each transition atomic and gives all recipients the same broadcast order.
//! History pages and the diagnostic snapshots only take the read lock.
//!
//! Nothing limits an outbox: a client that stops reading while its socket
//! stays open keeps queueing every broadcast in memory until the socket
//! closes and the connection is released.

use std::{collections::HashMap, sync::Arc};

use tokio::{runtime::Handle, sync::{mpsc, RwLock}};
use tracing::debug;

use super::{ChatRoom, ClientEvent, ConnId, Dispatch, Message, Presence, ServerEvent, Target};

pub type Outbox = mpsc::UnboundedSender<ServerEvent>;
pub type Inbox = mpsc::UnboundedReceiver<ServerEvent>;

#[derive(Default)]
struct Inner {
    room: ChatRoom,
    peers: HashMap<ConnId, Outbox>,
}

impl Inner {
    fn deliver(&self, out: Vec<Dispatch>) {
        for Dispatch { target, event } in out {
            match target {
                Target::All => {
                    for outbox in self.peers.values() {
                        let _ = outbox.send(event.clone());
                    }
                }
                Target::Conn(id) => self.send_to(id, event),
            }
        }
    }

    fn send_to(&self, id: ConnId, event: ServerEvent) {
        // the socket may already be gone; its disconnect is on the way
        if let Some(outbox) = self.peers.get(&id) {
            let _ = outbox.send(event);
        }
    }
}

#[derive(Clone, Default)]
pub struct Hub {
    inner: Arc<RwLock<Inner>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new transport connection. The returned inbox yields
    /// [`ServerEvent::Connected`] first, then everything addressed to it.
    pub async fn connect(&self) -> (Session, Inbox) {
        let id = ConnId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ServerEvent::Connected { id });

        self.inner.write().await.peers.insert(id, tx);
        debug!(%id, "connection registered");

        (Session { hub: self.clone(), id, closed: false }, rx)
    }

    /// Applies one client event. Events from connections that are not (or
    /// no longer) registered are dropped.
    pub async fn handle(&self, from: ConnId, event: ClientEvent) {
        if let ClientEvent::GetMessages { page, ack } = event {
            let inner = self.inner.read().await;
            if inner.peers.contains_key(&from) {
                let reply = inner.room.page(page, ack);
                inner.send_to(from, reply);
            }
            return;
        }

        let mut inner = self.inner.write().await;
        if !inner.peers.contains_key(&from) {
            debug!(%from, "event from unregistered connection dropped");
            return;
        }
        let out = inner.room.handle(from, event);
        inner.deliver(out);
    }

    /// Tears a connection down and broadcasts its departure. Returns `false`
    /// if it was already gone.
    pub async fn disconnect(&self, id: ConnId) -> bool {
        let mut inner = self.inner.write().await;
        if inner.peers.remove(&id).is_none() {
            return false;
        }
        let out = inner.room.disconnect(id);
        inner.deliver(out);
        debug!(%id, "connection released");
        true
    }

    pub async fn users(&self) -> Vec<Presence> {
        self.inner.read().await.room.users()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.read().await.room.messages()
    }

    pub async fn page(&self, page: usize) -> Vec<Message> {
        self.inner.read().await.room.history(page)
    }

    pub async fn connections(&self) -> usize {
        self.inner.read().await.peers.len()
    }
}

/// A registered connection's handle on the hub.
///
/// Dropping it without [`Session::close`] still runs the disconnect, on a
/// spawned task, so cleanup happens once however the socket task ends.
pub struct Session {
    hub: Hub,
    id: ConnId,
    closed: bool,
}

impl Session {
    pub fn id(&self) -> ConnId {
        self.id
    }

    pub async fn handle(&self, event: ClientEvent) {
        self.hub.handle(self.id, event).await;
    }

    /// Runs the disconnect. If this future is dropped before it finishes,
    /// the drop guard still releases the connection.
    pub async fn close(mut self) {
        self.hub.disconnect(self.id).await;
        self.closed = true;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            return;
        };
        let hub = self.hub.clone();
        let id = self.id;
        runtime.spawn(async move {
            hub.disconnect(id).await;
        });
    }
}
