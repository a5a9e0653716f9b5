use tracing::info;

use super::{
    history::PAGE_SIZE,
    protocol::DeliveryStatus,
    ClientEvent, ConnId, Message, MessageLog, Presence, Registry, ServerEvent, TypingTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Conn(ConnId),
}

/// One outbound event and who gets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub target: Target,
    pub event: ServerEvent,
}

impl Dispatch {
    pub fn all(event: ServerEvent) -> Self {
        Self { target: Target::All, event }
    }

    pub fn to(id: ConnId, event: ServerEvent) -> Self {
        Self { target: Target::Conn(id), event }
    }
}

/// The room's state and its event transitions.
///
/// Every method applies one event to completion and returns what must be
/// delivered, in order. Nothing here fails: unknown ids and unregistered
/// senders degrade to no-ops or the anonymous name.
#[derive(Debug, Default)]
pub struct ChatRoom {
    users: Registry,
    typing: TypingTracker,
    log: MessageLog,
}

impl ChatRoom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, from: ConnId, event: ClientEvent) -> Vec<Dispatch> {
        match event {
            ClientEvent::Join { username } => self.join(from, username),
            ClientEvent::SendMessage { message, ack } => self.send(from, message, ack),
            ClientEvent::Typing(is_typing) => self.set_typing(from, is_typing),
            ClientEvent::PrivateMessage { to, message } => self.send_private(from, to, message),
            ClientEvent::ReactMessage { message_id, reaction } => {
                match self.log.react(message_id, from, reaction) {
                    Some(reactions) => vec![Dispatch::all(ServerEvent::MessageReaction {
                        message_id,
                        reactions: reactions.clone(),
                    })],
                    None => Vec::new(),
                }
            }
            ClientEvent::MarkRead(ids) => {
                self.log.mark_read(&ids, from);
                vec![Dispatch::all(ServerEvent::MessagesRead(ids))]
            }
            ClientEvent::GetMessages { page, ack } => vec![Dispatch::to(from, self.page(page, ack))],
        }
    }

    fn join(&mut self, id: ConnId, username: String) -> Vec<Dispatch> {
        info!(%id, %username, "joined the chat");
        let username = self.users.join(id, username).username.clone();

        vec![
            Dispatch::all(ServerEvent::UserList(self.users.list())),
            Dispatch::all(ServerEvent::UserJoined { username, id }),
        ]
    }

    fn send(&mut self, from: ConnId, body: String, ack: Option<u64>) -> Vec<Dispatch> {
        let message = self.log.append(from, self.users.lookup(from), body);
        let id = message.id;

        let mut out = vec![Dispatch::all(ServerEvent::ReceiveMessage(message))];
        if let Some(ack) = ack {
            out.push(Dispatch::to(from, ServerEvent::MessageAck {
                ack,
                status: DeliveryStatus::Delivered,
                id,
            }));
        }
        out
    }

    fn set_typing(&mut self, id: ConnId, is_typing: bool) -> Vec<Dispatch> {
        if !self.users.contains(id) {
            return Vec::new();
        }
        self.typing.set(id, self.users.lookup(id), is_typing);

        vec![Dispatch::all(ServerEvent::TypingUsers(self.typing.names()))]
    }

    fn send_private(&mut self, from: ConnId, to: ConnId, body: String) -> Vec<Dispatch> {
        let message = self.log.private(from, self.users.lookup(from), to, body);

        let mut out = Vec::with_capacity(2);
        if to != from {
            out.push(Dispatch::to(to, ServerEvent::PrivateMessage(message.clone())));
        }
        out.push(Dispatch::to(from, ServerEvent::PrivateMessage(message)));
        out
    }

    /// Runs the leave side effects for a closed connection. Never-joined
    /// connections produce nothing.
    pub fn disconnect(&mut self, id: ConnId) -> Vec<Dispatch> {
        let was_typing = self.typing.clear(id);
        let Some(presence) = self.users.leave(id) else {
            return Vec::new();
        };
        info!(%id, username = %presence.username, "left the chat");

        let mut out = vec![
            Dispatch::all(ServerEvent::UserLeft(presence)),
            Dispatch::all(ServerEvent::UserList(self.users.list())),
        ];
        if was_typing {
            out.push(Dispatch::all(ServerEvent::TypingUsers(self.typing.names())));
        }
        out
    }

    /// Newest-first page of history, [`PAGE_SIZE`] records per page.
    pub fn history(&self, page: usize) -> Vec<Message> {
        self.log.paginate(page, PAGE_SIZE)
    }

    pub fn page(&self, page: usize, ack: Option<u64>) -> ServerEvent {
        ServerEvent::Messages { ack, page, messages: self.history(page) }
    }

    pub fn users(&self) -> Vec<Presence> {
        self.users.list()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log.snapshot()
    }
}
